use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::UserId;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum HistoryRecordError {
    #[error("correct words ({correct}) exceed attempted words ({attempted})")]
    CorrectExceedsAttempted { attempted: u32, correct: u32 },

    #[error("perfect words ({perfect}) exceed correct words ({correct})")]
    PerfectExceedsCorrect { correct: u32, perfect: u32 },

    #[error("rating must be within 0..=100, got {0}")]
    InvalidRating(f64),

    #[error("unknown {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },
}

/// Which subset of the catalog a session drills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeMode {
    /// Words the user has never resolved.
    NewWords,
    /// Words whose latest resolution needed two tries.
    WrongWords,
}

impl PracticeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PracticeMode::NewWords => "new",
            PracticeMode::WrongWords => "wrong",
        }
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PracticeMode {
    type Err = HistoryRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(PracticeMode::NewWords),
            "wrong" => Ok(PracticeMode::WrongWords),
            other => Err(HistoryRecordError::UnknownVariant {
                field: "mode",
                value: other.to_owned(),
            }),
        }
    }
}

/// How a practice session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The queue was exhausted.
    Finished,
    /// The user quit before the queue was exhausted.
    Abandoned,
}

impl SessionEnd {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionEnd::Finished => "finished",
            SessionEnd::Abandoned => "abandoned",
        }
    }
}

impl FromStr for SessionEnd {
    type Err = HistoryRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finished" => Ok(SessionEnd::Finished),
            "abandoned" => Ok(SessionEnd::Abandoned),
            other => Err(HistoryRecordError::UnknownVariant {
                field: "end",
                value: other.to_owned(),
            }),
        }
    }
}

/// Word counts for a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionTally {
    pub attempted: u32,
    pub correct: u32,
    pub perfect: u32,
}

/// Append-only log entry written when a practice session ends.
///
/// Counts cover the words resolved in that session; `rating` is the user's
/// catalog-wide rating at the moment the session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHistoryRecord {
    user: UserId,
    recorded_at: DateTime<Utc>,
    mode: PracticeMode,
    end: SessionEnd,
    tally: SessionTally,
    rating: f64,
}

impl SessionHistoryRecord {
    /// Builds a record, checking that counts nest and the rating is a percentage.
    ///
    /// # Errors
    ///
    /// Returns `HistoryRecordError` when the counts or rating are inconsistent.
    pub fn new(
        user: UserId,
        recorded_at: DateTime<Utc>,
        mode: PracticeMode,
        end: SessionEnd,
        tally: SessionTally,
        rating: f64,
    ) -> Result<Self, HistoryRecordError> {
        if tally.correct > tally.attempted {
            return Err(HistoryRecordError::CorrectExceedsAttempted {
                attempted: tally.attempted,
                correct: tally.correct,
            });
        }
        if tally.perfect > tally.correct {
            return Err(HistoryRecordError::PerfectExceedsCorrect {
                correct: tally.correct,
                perfect: tally.perfect,
            });
        }
        if !rating.is_finite() || !(0.0..=100.0).contains(&rating) {
            return Err(HistoryRecordError::InvalidRating(rating));
        }
        Ok(Self {
            user,
            recorded_at,
            mode,
            end,
            tally,
            rating,
        })
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    #[must_use]
    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    #[must_use]
    pub fn end(&self) -> SessionEnd {
        self.end
    }

    #[must_use]
    pub fn words_attempted(&self) -> u32 {
        self.tally.attempted
    }

    #[must_use]
    pub fn words_correct(&self) -> u32 {
        self.tally.correct
    }

    #[must_use]
    pub fn perfect_words(&self) -> u32 {
        self.tally.perfect
    }

    #[must_use]
    pub fn rating(&self) -> f64 {
        self.rating
    }
}
