use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WordPairError {
    #[error("prompt cannot be empty")]
    EmptyPrompt,
    #[error("answer cannot be empty")]
    EmptyAnswer,
}

//
// ─── WORD PAIR ─────────────────────────────────────────────────────────────────
//

/// A prompt in the source language and its expected translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordPair {
    prompt: String,
    answer: String,
}

impl WordPair {
    /// Builds a pair, trimming both sides.
    ///
    /// # Errors
    ///
    /// Returns `WordPairError` if either side is blank.
    pub fn new(prompt: impl AsRef<str>, answer: impl AsRef<str>) -> Result<Self, WordPairError> {
        let prompt = prompt.as_ref().trim();
        let answer = answer.as_ref().trim();
        if prompt.is_empty() {
            return Err(WordPairError::EmptyPrompt);
        }
        if answer.is_empty() {
            return Err(WordPairError::EmptyAnswer);
        }
        Ok(Self {
            prompt: prompt.to_owned(),
            answer: answer.to_owned(),
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Ordered list of word pairs available for drilling.
///
/// Order carries no meaning for scoring but is kept stable so merges and
/// rewrites of the source file are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    words: Vec<WordPair>,
}

impl Catalog {
    #[must_use]
    pub fn new(words: Vec<WordPair>) -> Self {
        Self { words }
    }

    /// Single built-in pair used when the catalog source cannot be read.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            words: vec![WordPair {
                prompt: "hola".to_owned(),
                answer: "bonjour".to_owned(),
            }],
        }
    }

    #[must_use]
    pub fn words(&self) -> &[WordPair] {
        &self.words
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[must_use]
    pub fn find(&self, prompt: &str) -> Option<&WordPair> {
        self.words.iter().find(|w| w.prompt == prompt)
    }

    /// Unions `batch` into the catalog, dropping exact `(prompt, answer)` duplicates.
    ///
    /// Existing entries keep their position; new pairs are appended in batch
    /// order. Returns the number of pairs actually added.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = WordPair>) -> usize {
        let mut seen: HashSet<WordPair> = self.words.iter().cloned().collect();
        let before = self.words.len();
        for pair in batch {
            if seen.insert(pair.clone()) {
                self.words.push(pair);
            }
        }
        self.words.len() - before
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
