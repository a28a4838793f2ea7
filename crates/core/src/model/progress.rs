use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptsError {
    #[error("attempt count must be at least 1, got {0}")]
    Zero(u32),
    #[error("stored attempt count must be 1 or 2, got {0}")]
    OutOfRange(i64),
}

/// Attempts needed to resolve a word: 1 (perfect) or 2 (capped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(u8);

impl Attempts {
    /// Answered correctly on the first try.
    pub const PERFECT: Self = Self(1);
    /// Answered on the second try, or not at all after two tries.
    pub const CAPPED: Self = Self(2);

    /// Converts a raw try count, capping anything above two.
    ///
    /// # Errors
    ///
    /// Returns `AttemptsError::Zero` for a count of zero.
    pub fn from_count(count: u32) -> Result<Self, AttemptsError> {
        match count {
            0 => Err(AttemptsError::Zero(count)),
            1 => Ok(Self::PERFECT),
            _ => Ok(Self::CAPPED),
        }
    }

    /// Strict conversion for values read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptsError::OutOfRange` unless the value is 1 or 2.
    pub fn from_persisted(value: i64) -> Result<Self, AttemptsError> {
        match value {
            1 => Ok(Self::PERFECT),
            2 => Ok(Self::CAPPED),
            other => Err(AttemptsError::OutOfRange(other)),
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_perfect(self) -> bool {
        self == Self::PERFECT
    }
}

/// Latest resolution of one word for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub word: String,
    pub attempts: Attempts,
    pub last_practiced: DateTime<Utc>,
}

/// A user's progress keyed by word prompt.
///
/// Recording a word overwrites whatever was stored for it before.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressMap {
    entries: BTreeMap<String, ProgressEntry>,
}

impl ProgressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ProgressEntry>) -> Self {
        let mut map = Self::new();
        for entry in entries {
            map.entries.insert(entry.word.clone(), entry);
        }
        map
    }

    pub fn record(&mut self, word: impl Into<String>, attempts: Attempts, at: DateTime<Utc>) {
        let word = word.into();
        self.entries.insert(
            word.clone(),
            ProgressEntry {
                word,
                attempts,
                last_practiced: at,
            },
        );
    }

    #[must_use]
    pub fn get(&self, word: &str) -> Option<&ProgressEntry> {
        self.entries.get(word)
    }

    #[must_use]
    pub fn attempts(&self, word: &str) -> Option<Attempts> {
        self.entries.get(word).map(|e| e.attempts)
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProgressEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Words answered correctly on the first try.
    #[must_use]
    pub fn perfect_count(&self) -> usize {
        self.entries().filter(|e| e.attempts.is_perfect()).count()
    }

    /// Resolved words, perfect or not.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.entries()
            .filter(|e| e.attempts <= Attempts::CAPPED)
            .count()
    }

    /// Prompts whose latest resolution needed more than one try.
    pub fn wrong_words(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .filter(|e| !e.attempts.is_perfect())
            .map(|e| e.word.as_str())
    }
}
