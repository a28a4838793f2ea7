//! Comparison of typed answers against the expected translation.

const APOSTROPHES: [char; 2] = ['\'', '\u{2019}'];

/// Outcome of comparing one submission with the expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerCheck {
    Correct,
    Incorrect {
        /// The answers only differ by apostrophes (`l'eau` vs `leau`).
        apostrophe_only: bool,
    },
}

impl AnswerCheck {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, AnswerCheck::Correct)
    }
}

/// Trims and lower-cases an answer for comparison.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn strip_apostrophes(s: &str) -> String {
    s.chars().filter(|c| !APOSTROPHES.contains(c)).collect()
}

/// Compares `given` with `expected`, ignoring case and surrounding whitespace.
#[must_use]
pub fn check(expected: &str, given: &str) -> AnswerCheck {
    let expected = normalize(expected);
    let given = normalize(given);
    if expected == given {
        return AnswerCheck::Correct;
    }
    AnswerCheck::Incorrect {
        apostrophe_only: strip_apostrophes(&expected) == strip_apostrophes(&given),
    }
}
