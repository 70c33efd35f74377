// src/validator.rs

use crate::models::{Prompt, Question, Submission};
use crate::theory::{pitch_class_set, Note, PitchClass};
use log::debug;
use std::collections::BTreeSet;

/// Outcome of checking one submission. The pitch-class differences are for
/// feedback only; `is_correct` never depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    /// Correct pitch classes the learner left out.
    pub missed_pitch_classes: BTreeSet<PitchClass>,
    /// Submitted pitch classes that are not in the answer.
    pub extra_pitch_classes: BTreeSet<PitchClass>,
}

impl Verdict {
    fn from_sets(is_correct: bool, expected: &BTreeSet<PitchClass>, submitted: &BTreeSet<PitchClass>) -> Self {
        Verdict {
            is_correct,
            missed_pitch_classes: expected.difference(submitted).copied().collect(),
            extra_pitch_classes: submitted.difference(expected).copied().collect(),
        }
    }

    fn bare(is_correct: bool) -> Self {
        Verdict {
            is_correct,
            missed_pitch_classes: BTreeSet::new(),
            extra_pitch_classes: BTreeSet::new(),
        }
    }
}

pub fn check(question: &Question, submission: &Submission) -> bool {
    evaluate(question, submission).is_correct
}

pub fn evaluate(question: &Question, submission: &Submission) -> Verdict {
    let verdict = match question.prompt {
        Prompt::SingleTone { target } | Prompt::SingleDegree { target } => {
            let expected = BTreeSet::from([question.subject.tone(target).pitch_class()]);
            match submission {
                Submission::Notes(notes) => {
                    let submitted = pitch_class_set(notes);
                    // Exactly one note, not one pitch class: C4 + C5 is two answers.
                    let is_correct = notes.len() == 1 && submitted == expected;
                    Verdict::from_sets(is_correct, &expected, &submitted)
                }
                Submission::Formula(_) => Verdict::from_sets(false, &expected, &BTreeSet::new()),
            }
        }
        Prompt::AllTones | Prompt::AllDegrees | Prompt::AuralSpelling => {
            let expected = question.subject.pitch_classes();
            match submission {
                Submission::Notes(notes) => check_note_set(&expected, notes),
                Submission::Formula(_) => Verdict::from_sets(false, &expected, &BTreeSet::new()),
            }
        }
        Prompt::AuralQuality | Prompt::EarTraining => match submission {
            Submission::Formula(symbol) => Verdict::bare(symbol.trim() == question.subject.formula.symbol),
            Submission::Notes(_) => Verdict::bare(false),
        },
    };

    debug!(
        "[Validator] {} ({}): correct={}, missed={:?}, extra={:?}",
        question.concept_key(),
        question.kind(),
        verdict.is_correct,
        verdict.missed_pitch_classes,
        verdict.extra_pitch_classes
    );
    verdict
}

fn check_note_set(expected: &BTreeSet<PitchClass>, notes: &[Note]) -> Verdict {
    let submitted = pitch_class_set(notes);
    Verdict::from_sets(&submitted == expected, expected, &submitted)
}
