use chrono::{DateTime, Utc};
use std::fmt;

use drill_core::answer::{self, AnswerCheck};
use drill_core::model::{
    Attempts, PracticeMode, ProgressMap, SessionEnd, SessionHistoryRecord, SessionTally, UserId,
    WordPair,
};
use drill_core::rating::Rating;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Waiting for an answer to the current word.
    Running,
    Finished,
    Abandoned,
}

impl SessionState {
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, SessionState::Running)
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// A word that has been scored and will not be asked again this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub word: WordPair,
    pub attempts: Attempts,
    /// False when both tries were wrong and the answer was revealed.
    pub correct: bool,
}

/// Result of submitting one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The word is resolved and the queue advanced.
    Resolved(Resolution),
    /// First try was wrong; the same word awaits a second try.
    TryAgain { apostrophe_only: bool },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Explicit per-learner drilling state.
///
/// Owned by the caller and passed by reference into `PracticeLoopService`;
/// nothing here is global. The session also carries the learner's cumulative
/// progress map so every resolution can be persisted in full.
pub struct PracticeSession {
    user: UserId,
    progress: ProgressMap,
    state: SessionState,
    mode: Option<PracticeMode>,
    queue: Vec<WordPair>,
    index: usize,
    /// Wrong tries on the current word: 0 or 1.
    misses: u8,
    tally: SessionTally,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl PracticeSession {
    /// An idle session for `user` seeded with their stored progress.
    #[must_use]
    pub fn new(user: UserId, progress: ProgressMap) -> Self {
        Self {
            user,
            progress,
            state: SessionState::Idle,
            mode: None,
            queue: Vec::new(),
            index: 0,
            misses: 0,
            tally: SessionTally::default(),
            started_at: None,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn progress_map(&self) -> &ProgressMap {
        &self.progress
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> Option<PracticeMode> {
        self.mode
    }

    #[must_use]
    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// The word awaiting an answer, if a session is running.
    #[must_use]
    pub fn current_word(&self) -> Option<&WordPair> {
        if self.state.is_running() {
            self.queue.get(self.index)
        } else {
            None
        }
    }

    /// 1 for the first try on the current word, 2 for the second.
    #[must_use]
    pub fn try_number(&self) -> u8 {
        self.misses + 1
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            state: self.state,
            total: self.queue.len(),
            resolved: self.index.min(self.queue.len()),
            remaining: self.queue.len().saturating_sub(self.index),
            try_number: self.try_number(),
        }
    }

    /// Begin drilling `queue`, already ordered by the caller.
    ///
    /// An empty queue leaves the session where it was.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyRunning` while another run is active and
    /// `SessionError::NothingToPractice` for an empty queue.
    pub fn start(
        &mut self,
        mode: PracticeMode,
        queue: Vec<WordPair>,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.state.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        if queue.is_empty() {
            return Err(SessionError::NothingToPractice { mode });
        }

        self.state = SessionState::Running;
        self.mode = Some(mode);
        self.queue = queue;
        self.index = 0;
        self.misses = 0;
        self.tally = SessionTally::default();
        self.started_at = Some(at);
        self.ended_at = None;
        Ok(())
    }

    /// Score `input` against the current word.
    ///
    /// A first-try match records 1 attempt. Anything that reaches a second try
    /// records 2, whether or not the second try matches.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` if no word is awaiting an answer.
    pub fn submit(&mut self, input: &str, at: DateTime<Utc>) -> Result<SubmitOutcome, SessionError> {
        let word = self.current_word().cloned().ok_or(SessionError::NotRunning)?;
        let check = answer::check(word.answer(), input);

        match (check, self.misses) {
            (AnswerCheck::Correct, 0) => Ok(self.resolve(word, Attempts::PERFECT, true, at)),
            (AnswerCheck::Correct, _) => Ok(self.resolve(word, Attempts::CAPPED, true, at)),
            (AnswerCheck::Incorrect { apostrophe_only }, 0) => {
                self.misses = 1;
                Ok(SubmitOutcome::TryAgain { apostrophe_only })
            }
            (AnswerCheck::Incorrect { .. }, _) => {
                Ok(self.resolve(word, Attempts::CAPPED, false, at))
            }
        }
    }

    fn resolve(
        &mut self,
        word: WordPair,
        attempts: Attempts,
        correct: bool,
        at: DateTime<Utc>,
    ) -> SubmitOutcome {
        self.progress.record(word.prompt(), attempts, at);

        self.tally.attempted += 1;
        if correct {
            self.tally.correct += 1;
        }
        if attempts.is_perfect() {
            self.tally.perfect += 1;
        }

        self.index += 1;
        self.misses = 0;
        if self.index >= self.queue.len() {
            self.state = SessionState::Finished;
            self.ended_at = Some(at);
        }

        SubmitOutcome::Resolved(Resolution {
            word,
            attempts,
            correct,
        })
    }

    /// End the run early. The current word is left unresolved.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` if nothing is running.
    pub fn quit(&mut self, at: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.state.is_running() {
            return Err(SessionError::NotRunning);
        }
        self.state = SessionState::Abandoned;
        self.ended_at = Some(at);
        self.misses = 0;
        Ok(())
    }

    /// History record for the run that just ended.
    ///
    /// Counts cover this run; the rating is the learner's catalog-wide rating.
    /// Returns `Ok(None)` if the session has not ended.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::History` if the counts are inconsistent.
    pub fn history_record(
        &self,
        catalog_size: usize,
    ) -> Result<Option<SessionHistoryRecord>, SessionError> {
        let end = match self.state {
            SessionState::Finished => SessionEnd::Finished,
            SessionState::Abandoned => SessionEnd::Abandoned,
            SessionState::Idle | SessionState::Running => return Ok(None),
        };
        let (Some(mode), Some(ended_at)) = (self.mode, self.ended_at) else {
            return Ok(None);
        };
        let rating = Rating::compute(self.progress.perfect_count(), catalog_size);
        let record = SessionHistoryRecord::new(
            self.user.clone(),
            ended_at,
            mode,
            end,
            self.tally,
            rating.percent(),
        )?;
        Ok(Some(record))
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("user", &self.user)
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("queue_len", &self.queue.len())
            .field("index", &self.index)
            .field("misses", &self.misses)
            .field("tally", &self.tally)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::time::fixed_now;

    fn pair(p: &str, a: &str) -> WordPair {
        WordPair::new(p, a).unwrap()
    }

    fn running(words: Vec<WordPair>) -> PracticeSession {
        let mut session =
            PracticeSession::new(UserId::registered("anna").unwrap(), ProgressMap::new());
        session
            .start(PracticeMode::NewWords, words, fixed_now())
            .unwrap();
        session
    }

    #[test]
    fn first_try_match_is_perfect() {
        let mut s = running(vec![pair("hola", "bonjour"), pair("gracias", "merci")]);
        let out = s.submit("Bonjour ", fixed_now()).unwrap();
        assert_eq!(
            out,
            SubmitOutcome::Resolved(Resolution {
                word: pair("hola", "bonjour"),
                attempts: Attempts::PERFECT,
                correct: true,
            })
        );
        assert_eq!(s.progress_map().attempts("hola"), Some(Attempts::PERFECT));
        assert_eq!(s.current_word().unwrap().prompt(), "gracias");
        assert_eq!(s.state(), SessionState::Running);
    }

    #[test]
    fn second_try_match_records_two() {
        let mut s = running(vec![pair("hola", "bonjour")]);
        let out = s.submit("bonjou", fixed_now()).unwrap();
        assert_eq!(out, SubmitOutcome::TryAgain { apostrophe_only: false });
        assert_eq!(s.try_number(), 2);
        assert_eq!(s.current_word().unwrap().prompt(), "hola");

        let out = s.submit("bonjour", fixed_now()).unwrap();
        assert!(matches!(
            out,
            SubmitOutcome::Resolved(Resolution { attempts: Attempts::CAPPED, correct: true, .. })
        ));
        assert_eq!(s.progress_map().perfect_count(), 0);
        assert_eq!(s.state(), SessionState::Finished);
    }

    #[test]
    fn two_misses_reveal_and_cap_at_two() {
        let mut s = running(vec![pair("hola", "bonjour")]);
        s.submit("bonjou", fixed_now()).unwrap();
        let out = s.submit("bonjou", fixed_now()).unwrap();
        let SubmitOutcome::Resolved(res) = out else {
            panic!("expected resolution");
        };
        assert_eq!(res.word.answer(), "bonjour");
        assert_eq!(res.attempts, Attempts::CAPPED);
        assert!(!res.correct);
        assert_eq!(s.progress_map().attempts("hola"), Some(Attempts::CAPPED));

        let err = s.submit("bonjour", fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NotRunning));
        assert_eq!(s.progress_map().attempts("hola"), Some(Attempts::CAPPED));
    }

    #[test]
    fn apostrophe_only_miss_is_flagged() {
        let mut s = running(vec![pair("hoy", "aujourd'hui")]);
        let out = s.submit("aujourdhui", fixed_now()).unwrap();
        assert_eq!(out, SubmitOutcome::TryAgain { apostrophe_only: true });
    }

    #[test]
    fn empty_queue_stays_idle() {
        let mut s = PracticeSession::new(UserId::registered("anna").unwrap(), ProgressMap::new());
        let err = s
            .start(PracticeMode::WrongWords, Vec::new(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::NothingToPractice { mode: PracticeMode::WrongWords }));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.history_record(1).unwrap().is_none());
    }

    #[test]
    fn cannot_start_twice() {
        let mut s = running(vec![pair("hola", "bonjour")]);
        let err = s
            .start(PracticeMode::NewWords, vec![pair("a", "b")], fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyRunning));
    }

    #[test]
    fn quit_abandons_and_builds_history() {
        let mut s = running(vec![
            pair("hola", "bonjour"),
            pair("gracias", "merci"),
            pair("perro", "chien"),
        ]);
        s.submit("bonjour", fixed_now()).unwrap();
        s.submit("x", fixed_now()).unwrap();
        s.submit("merci", fixed_now()).unwrap();
        s.quit(fixed_now()).unwrap();
        assert_eq!(s.state(), SessionState::Abandoned);
        assert!(s.current_word().is_none());

        let rec = s.history_record(4).unwrap().unwrap();
        assert_eq!(rec.end(), SessionEnd::Abandoned);
        assert_eq!(rec.words_attempted(), 2);
        assert_eq!(rec.words_correct(), 2);
        assert_eq!(rec.perfect_words(), 1);
        assert!((rec.rating() - 25.0).abs() < f64::EPSILON);

        assert!(matches!(s.quit(fixed_now()), Err(SessionError::NotRunning)));
    }

    #[test]
    fn progress_tracks_queue_position() {
        let mut s = running(vec![pair("hola", "bonjour"), pair("gracias", "merci")]);
        s.submit("bonjour", fixed_now()).unwrap();
        let p = s.progress();
        assert_eq!(p.total, 2);
        assert_eq!(p.resolved, 1);
        assert_eq!(p.remaining, 1);
        assert_eq!(p.try_number, 1);
    }
}
