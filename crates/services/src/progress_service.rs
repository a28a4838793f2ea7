use std::sync::Arc;

use drill_core::model::{ProgressMap, UserId};
use storage::repository::{ProgressRepository, ProgressTotals};

/// Progress store access with a fail-open policy.
///
/// Reads degrade to an empty result and writes are dropped when the store is
/// unavailable, so the practice loop keeps running. Every failure is logged.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// The user's progress map, or an empty map if the store cannot be read.
    pub async fn load(&self, user: &UserId) -> ProgressMap {
        match self.progress.load_progress(user).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, %user, "could not load progress; continuing with none");
                ProgressMap::new()
            }
        }
    }

    /// Persist the full map. Returns `false` if the write was dropped.
    pub async fn save(&self, user: &UserId, progress: &ProgressMap) -> bool {
        match self.progress.save_progress(user, progress).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, %user, "could not save progress; update dropped");
                false
            }
        }
    }

    /// Per-user totals, or nothing if the store cannot be read.
    pub async fn totals(&self) -> Vec<ProgressTotals> {
        match self.progress.progress_totals().await {
            Ok(totals) => totals,
            Err(e) => {
                tracing::warn!(error = %e, "could not load progress totals");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::Attempts;
    use drill_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn round_trips_when_online() {
        let repo = InMemoryRepository::new();
        let svc = ProgressService::new(Arc::new(repo.clone()));
        let user = UserId::registered("anna").unwrap();
        let mut map = ProgressMap::new();
        map.record("hola", Attempts::PERFECT, fixed_now());

        assert!(svc.save(&user, &map).await);
        assert_eq!(svc.load(&user).await, map);
    }

    #[tokio::test]
    async fn degrades_when_offline() {
        let repo = InMemoryRepository::new();
        let svc = ProgressService::new(Arc::new(repo.clone()));
        let user = UserId::registered("anna").unwrap();
        let mut map = ProgressMap::new();
        map.record("hola", Attempts::PERFECT, fixed_now());
        svc.save(&user, &map).await;

        repo.set_offline(true);
        assert!(svc.load(&user).await.is_empty());
        assert!(!svc.save(&user, &map).await);
        assert!(svc.totals().await.is_empty());
    }
}
