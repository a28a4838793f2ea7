#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod catalog_service;
pub mod error;
mod password;
pub mod progress_service;
pub mod pronunciation;
pub mod reporting_service;
pub mod sessions;

pub use drill_core::Clock;

pub use app_services::{AppServices, AppServicesConfig};
pub use auth_service::CredentialService;
pub use catalog_service::{AppendReport, CatalogService};
pub use error::{
    AppServicesError, AuthError, CatalogError, PronunciationError, SessionError,
};
pub use progress_service::ProgressService;
pub use pronunciation::{HttpPronouncer, Pronouncer, PronunciationConfig, SilentPronouncer};
pub use reporting_service::{HistoryItem, LeaderboardEntry, ReportingService};
pub use sessions::{
    PracticeLoopService, PracticeSession, Resolution, SessionProgress, SessionState,
    SubmitOutcome, SubmitResult,
};
