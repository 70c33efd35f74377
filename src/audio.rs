// src/audio.rs

use crate::catalog::Family;
use crate::models::Subject;
use crate::theory::Note;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStyle {
    /// All tones at once.
    Block,
    /// One tone after another, low to high.
    Ascending,
}

impl PlaybackStyle {
    /// Chords sound together; scales and intervals are played melodically.
    pub fn for_family(family: Family) -> Self {
        match family {
            Family::Chord => PlaybackStyle::Block,
            Family::Scale | Family::Interval => PlaybackStyle::Ascending,
        }
    }
}

/// Fire-and-forget audio output. Implementations must return promptly.
pub trait AudioPlayer {
    fn play_notes(&self, notes: &[Note], style: PlaybackStyle, tempo_bpm: u32);
    fn play_note(&self, note: Note);
}

/// Player that only logs, for headless use and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPlayer;

impl AudioPlayer for LoggingPlayer {
    fn play_notes(&self, notes: &[Note], style: PlaybackStyle, tempo_bpm: u32) {
        let names: Vec<String> = notes.iter().map(Note::to_string).collect();
        debug!("[Audio] {:?} at {} bpm: {}", style, tempo_bpm, names.join(" "));
    }

    fn play_note(&self, note: Note) {
        debug!("[Audio] {}", note);
    }
}

/// Sounds a subject the way an aural question presents it.
pub fn play_subject(player: &dyn AudioPlayer, subject: &Subject, tempo_bpm: u32) {
    player.play_notes(&subject.tones(), PlaybackStyle::for_family(subject.family()), tempo_bpm);
}
