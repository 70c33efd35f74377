// src/presets.rs

use crate::constants::PRESET_LIMIT;
use crate::error::{PracticeError, Result};
use crate::models::DrillConfiguration;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub configuration: DrillConfiguration,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<Preset>,
    limit: usize,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        PresetCatalog::with_limit(PRESET_LIMIT)
    }
}

impl PresetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        PresetCatalog {
            presets: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Rebuilds a catalog from stored presets, oldest first. Nothing is
    /// dropped here; an over-full catalog is trimmed by the next `save`.
    pub fn from_presets(mut presets: Vec<Preset>) -> Self {
        presets.sort_by_key(|p| p.created_at);
        PresetCatalog {
            presets,
            limit: PRESET_LIMIT,
        }
    }

    /// Oldest first.
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.presets.len() >= self.limit
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.position(name).map(|i| &self.presets[i])
    }

    /// Saves a preset, evicting the oldest ones until the new preset fits.
    /// Returns the evicted presets, oldest first.
    pub fn save(
        &mut self,
        name: &str,
        configuration: DrillConfiguration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Preset>> {
        let name = self.checked_name(name, None)?;
        configuration.validate()?;

        let excess = (self.presets.len() + 1).saturating_sub(self.limit);
        let evicted: Vec<Preset> = self.presets.drain(..excess).collect();
        for oldest in &evicted {
            info!("Preset limit reached, evicting '{}'", oldest.name);
        }
        self.insert(name, configuration, now);
        Ok(evicted)
    }

    /// Like [`save`](Self::save) but refuses instead of evicting.
    pub fn try_save(
        &mut self,
        name: &str,
        configuration: DrillConfiguration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let name = self.checked_name(name, None)?;
        configuration.validate()?;
        if self.is_full() {
            return Err(PracticeError::PresetLimitReached { limit: self.limit });
        }
        self.insert(name, configuration, now);
        Ok(())
    }

    /// Renaming to a different casing of the same name is allowed.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let index = self
            .position(old_name)
            .ok_or_else(|| PracticeError::PresetNotFound(old_name.trim().to_string()))?;
        let new_name = self.checked_name(new_name, Some(index))?;
        info!("Renamed preset '{}' to '{}'", self.presets[index].name, new_name);
        self.presets[index].name = new_name;
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<Preset> {
        let index = self
            .position(name)
            .ok_or_else(|| PracticeError::PresetNotFound(name.trim().to_string()))?;
        let removed = self.presets.remove(index);
        info!("Deleted preset '{}'", removed.name);
        Ok(removed)
    }

    fn insert(&mut self, name: String, configuration: DrillConfiguration, now: DateTime<Utc>) {
        info!("Saved preset '{}'", name);
        self.presets.push(Preset {
            name,
            configuration,
            created_at: now,
        });
        self.presets.sort_by_key(|p| p.created_at);
    }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.presets
            .iter()
            .position(|p| p.name.to_lowercase() == wanted)
    }

    fn checked_name(&self, name: &str, renaming: Option<usize>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PracticeError::EmptyPresetName);
        }
        match self.position(name) {
            Some(i) if Some(i) != renaming => Err(PracticeError::DuplicatePresetName(name.to_string())),
            _ => Ok(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::models::KeyFilter;
    use chrono::Duration;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_800_000_000, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_save_and_lookup_ignore_case() {
        let mut catalog = PresetCatalog::new();
        catalog.save("  Shell Voicings ", DrillConfiguration::default(), at(0)).unwrap();
        assert_eq!(catalog.get("shell voicings").unwrap().name, "Shell Voicings");
        assert!(matches!(
            catalog.save("SHELL VOICINGS", DrillConfiguration::default(), at(1)),
            Err(PracticeError::DuplicatePresetName(_))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut catalog = PresetCatalog::new();
        assert!(matches!(
            catalog.save("   ", DrillConfiguration::default(), at(0)),
            Err(PracticeError::EmptyPresetName)
        ));
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let mut catalog = PresetCatalog::new();
        let config = DrillConfiguration {
            key_filter: KeyFilter::Custom(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            catalog.save("empty keys", config, at(0)),
            Err(PracticeError::InvalidConfiguration(ConfigError::EmptyCustomKeys))
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_full_catalog_evicts_oldest() {
        let mut catalog = PresetCatalog::with_limit(3);
        for i in 0..3 {
            let evicted = catalog.save(&format!("p{}", i), DrillConfiguration::default(), at(i)).unwrap();
            assert!(evicted.is_empty());
        }
        let evicted = catalog.save("p3", DrillConfiguration::default(), at(3)).unwrap();
        assert_eq!(evicted.into_iter().map(|p| p.name).collect::<Vec<_>>(), vec!["p0"]);
        assert_eq!(catalog.names(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_try_save_refuses_when_full() {
        let mut catalog = PresetCatalog::with_limit(1);
        catalog.try_save("only", DrillConfiguration::default(), at(0)).unwrap();
        assert!(matches!(
            catalog.try_save("another", DrillConfiguration::default(), at(1)),
            Err(PracticeError::PresetLimitReached { limit: 1 })
        ));
        assert_eq!(catalog.names(), vec!["only"]);
    }

    #[test]
    fn test_rename_and_delete() {
        let mut catalog = PresetCatalog::new();
        catalog.save("a", DrillConfiguration::default(), at(0)).unwrap();
        catalog.save("b", DrillConfiguration::default(), at(1)).unwrap();

        assert!(matches!(catalog.rename("a", "B"), Err(PracticeError::DuplicatePresetName(_))));
        catalog.rename("a", "A").unwrap();
        catalog.rename("A", "ii-V-I").unwrap();
        assert_eq!(catalog.names(), vec!["ii-V-I", "b"]);

        assert_eq!(catalog.delete("B").unwrap().name, "b");
        assert!(matches!(catalog.delete("b"), Err(PracticeError::PresetNotFound(_))));
        assert!(matches!(catalog.rename("zzz", "y"), Err(PracticeError::PresetNotFound(_))));
    }

    #[test]
    fn test_from_presets_keeps_everything_until_next_save() {
        let presets: Vec<Preset> = (0..PRESET_LIMIT as i64 + 2)
            .rev()
            .map(|i| Preset {
                name: format!("p{}", i),
                configuration: DrillConfiguration::default(),
                created_at: at(i),
            })
            .collect();
        let mut catalog = PresetCatalog::from_presets(presets);
        assert_eq!(catalog.len(), PRESET_LIMIT + 2);
        assert_eq!(catalog.presets()[0].name, "p0");
        assert!(catalog.is_full());
        assert!(catalog.get("p1").is_some());

        assert!(matches!(
            catalog.try_save("strict", DrillConfiguration::default(), at(100)),
            Err(PracticeError::PresetLimitReached { .. })
        ));
        assert_eq!(catalog.len(), PRESET_LIMIT + 2);

        let evicted = catalog.save("newest", DrillConfiguration::default(), at(100)).unwrap();
        assert_eq!(
            evicted.into_iter().map(|p| p.name).collect::<Vec<_>>(),
            vec!["p0", "p1", "p2"]
        );
        assert_eq!(catalog.len(), PRESET_LIMIT);
        assert_eq!(catalog.presets()[0].name, "p3");
        assert_eq!(catalog.presets()[PRESET_LIMIT - 1].name, "newest");
    }
}
