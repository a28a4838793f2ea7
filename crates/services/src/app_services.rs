use std::path::PathBuf;
use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::CredentialService;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::pronunciation::{HttpPronouncer, Pronouncer, PronunciationConfig, SilentPronouncer};
use crate::reporting_service::ReportingService;
use crate::sessions::PracticeLoopService;

/// Inputs needed to assemble the service graph.
#[derive(Clone, Debug)]
pub struct AppServicesConfig {
    pub db_url: String,
    pub words_path: PathBuf,
    /// Text-to-speech endpoint; pronunciation is silent when unset.
    pub pronunciation: Option<PronunciationConfig>,
    pub clock: Clock,
}

impl AppServicesConfig {
    #[must_use]
    pub fn new(db_url: impl Into<String>, words_path: impl Into<PathBuf>) -> Self {
        Self {
            db_url: db_url.into(),
            words_path: words_path.into(),
            pronunciation: None,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_pronunciation(mut self, config: PronunciationConfig) -> Self {
        self.pronunciation = Some(config);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Assembles app-facing services over one storage backend and word list.
#[derive(Clone)]
pub struct AppServices {
    credentials: Arc<CredentialService>,
    catalog: Arc<CatalogService>,
    progress: ProgressService,
    practice: Arc<PracticeLoopService>,
    reporting: Arc<ReportingService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: &AppServicesConfig) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let catalog = CatalogService::load(config.words_path.clone());
        let pronouncer: Arc<dyn Pronouncer> = match &config.pronunciation {
            Some(tts) => Arc::new(HttpPronouncer::new(tts.clone())),
            None => Arc::new(SilentPronouncer),
        };
        Ok(Self::from_parts(&storage, catalog, pronouncer, config.clock))
    }

    /// Wire services over an existing storage aggregate.
    #[must_use]
    pub fn from_parts(
        storage: &Storage,
        catalog: CatalogService,
        pronouncer: Arc<dyn Pronouncer>,
        clock: Clock,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let progress = ProgressService::new(Arc::clone(&storage.progress));
        let credentials = Arc::new(CredentialService::new(clock, Arc::clone(&storage.users)));
        let practice = Arc::new(PracticeLoopService::new(
            clock,
            progress.clone(),
            Arc::clone(&storage.history),
            Arc::clone(&catalog),
            pronouncer,
        ));
        let reporting = Arc::new(ReportingService::new(
            progress.clone(),
            Arc::clone(&storage.history),
            Arc::clone(&catalog),
        ));

        Self {
            credentials,
            catalog,
            progress,
            practice,
            reporting,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> Arc<CredentialService> {
        Arc::clone(&self.credentials)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> ProgressService {
        self.progress.clone()
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeLoopService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn reporting(&self) -> Arc<ReportingService> {
        Arc::clone(&self.reporting)
    }
}
