mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the practice subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use queries::{select_new_words, select_wrong_words};
pub use service::{PracticeSession, Resolution, SessionState, SubmitOutcome};
pub use workflow::{PracticeLoopService, SubmitResult};
