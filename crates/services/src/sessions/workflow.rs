use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use drill_core::model::{Catalog, PracticeMode, UserId, WordPair};
use storage::repository::SessionHistoryRepository;

use super::progress::SessionProgress;
use super::queries::{select_new_words, select_wrong_words};
use super::service::{PracticeSession, SubmitOutcome};
use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::SessionError;
use crate::progress_service::ProgressService;
use crate::pronunciation::Pronouncer;

/// Result of submitting one answer through the loop service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub outcome: SubmitOutcome,
    pub progress: SessionProgress,
    /// Audio for the expected answer, fetched after a first wrong try.
    pub pronunciation: Option<Vec<u8>>,
    /// Row id of the history record written when the run finished.
    pub history_id: Option<i64>,
}

/// Drives a `PracticeSession` against storage and the pronunciation collaborator.
///
/// Store failures never interrupt drilling: progress writes and history
/// appends are logged and dropped.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    progress: ProgressService,
    history: Arc<dyn SessionHistoryRepository>,
    catalog: Arc<CatalogService>,
    pronouncer: Arc<dyn Pronouncer>,
    seed: Option<u64>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: ProgressService,
        history: Arc<dyn SessionHistoryRepository>,
        catalog: Arc<CatalogService>,
        pronouncer: Arc<dyn Pronouncer>,
    ) -> Self {
        Self {
            clock,
            progress,
            history,
            catalog,
            pronouncer,
            seed: None,
        }
    }

    /// Shuffle queues with a fixed seed instead of the thread RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// An idle session for `user`, seeded with their stored progress.
    pub async fn open(&self, user: &UserId) -> PracticeSession {
        let progress = self.progress.load(user).await;
        PracticeSession::new(user.clone(), progress)
    }

    /// Select and shuffle the words for `mode` and start drilling.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToPractice` when the selection is empty
    /// (the session stays idle) and `SessionError::AlreadyRunning` if a run is
    /// in progress.
    pub fn start(
        &self,
        session: &mut PracticeSession,
        mode: PracticeMode,
    ) -> Result<SessionProgress, SessionError> {
        let catalog = self.catalog.current();
        let queue = match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                select(mode, &catalog, session, &mut rng)
            }
            None => select(mode, &catalog, session, &mut rand::rng()),
        };
        session.start(mode, queue, self.clock.now())?;
        tracing::info!(user = %session.user(), %mode, words = session.progress().total, "practice started");
        Ok(session.progress())
    }

    /// Score an answer, persist the learner's progress when a word resolves,
    /// and record history when the queue runs out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` if no word is awaiting an answer.
    pub async fn submit(
        &self,
        session: &mut PracticeSession,
        answer: &str,
    ) -> Result<SubmitResult, SessionError> {
        let expected = session
            .current_word()
            .map(|pair| pair.answer().to_owned())
            .ok_or(SessionError::NotRunning)?;
        let outcome = session.submit(answer, self.clock.now())?;

        let mut pronunciation = None;
        let mut history_id = None;
        match &outcome {
            SubmitOutcome::TryAgain { .. } => {
                pronunciation = self.pronouncer.pronounce(&expected).await;
            }
            SubmitOutcome::Resolved(_) => {
                self.progress
                    .save(session.user(), session.progress_map())
                    .await;
                if !session.state().is_running() {
                    history_id = self.record_history(session).await?;
                }
            }
        }

        Ok(SubmitResult {
            outcome,
            progress: session.progress(),
            pronunciation,
            history_id,
        })
    }

    /// Audio for the current word's answer, if pronunciation is available.
    pub async fn hint(&self, session: &PracticeSession) -> Option<Vec<u8>> {
        let answer = session.current_word()?.answer().to_owned();
        self.pronouncer.pronounce(&answer).await
    }

    /// Abandon the run and record it in history.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` if nothing is running.
    pub async fn quit(&self, session: &mut PracticeSession) -> Result<Option<i64>, SessionError> {
        session.quit(self.clock.now())?;
        self.record_history(session).await
    }

    async fn record_history(&self, session: &PracticeSession) -> Result<Option<i64>, SessionError> {
        let Some(record) = session.history_record(self.catalog.current().len())? else {
            return Ok(None);
        };
        match self.history.append_record(&record).await {
            Ok(id) => {
                tracing::info!(
                    user = %record.user(),
                    end = record.end().as_str(),
                    attempted = record.words_attempted(),
                    rating = record.rating(),
                    "session recorded"
                );
                Ok(Some(id))
            }
            Err(e) => {
                tracing::warn!(error = %e, user = %record.user(), "could not record session history");
                Ok(None)
            }
        }
    }
}

fn select<R: Rng + ?Sized>(
    mode: PracticeMode,
    catalog: &Catalog,
    session: &PracticeSession,
    rng: &mut R,
) -> Vec<WordPair> {
    match mode {
        PracticeMode::NewWords => select_new_words(catalog, session.progress_map(), rng),
        PracticeMode::WrongWords => select_wrong_words(catalog, session.progress_map(), rng),
    }
}
