mod ids;
mod progress;
mod session;
mod user;
mod word;

pub use ids::{GUEST_PREFIX, UserId, UserIdError};
pub use progress::{Attempts, AttemptsError, ProgressEntry, ProgressMap};
pub use session::{
    HistoryRecordError, PracticeMode, SessionEnd, SessionHistoryRecord, SessionTally,
};
pub use user::{User, UserRole};
pub use word::{Catalog, WordPair, WordPairError};
