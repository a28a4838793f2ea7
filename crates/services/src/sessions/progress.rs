use super::service::SessionState;

/// Position within the current run, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub state: SessionState,
    pub total: usize,
    pub resolved: usize,
    pub remaining: usize,
    /// 1 or 2.
    pub try_number: u8,
}

impl SessionProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.remaining == 0
    }
}
