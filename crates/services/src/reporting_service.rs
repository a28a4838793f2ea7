use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use drill_core::model::{PracticeMode, SessionEnd, UserId};
use drill_core::rating::{ProgressStats, Rating};
use storage::repository::{ProgressTotals, SessionHistoryRepository, SessionHistoryRow};

use crate::catalog_service::CatalogService;
use crate::progress_service::ProgressService;

/// Number of learners shown on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub user: UserId,
    pub words_practiced: u32,
    pub perfect: u32,
    pub rating: Rating,
}

/// One row of a learner's session history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub mode: PracticeMode,
    pub end: SessionEnd,
    pub words_attempted: u32,
    pub words_correct: u32,
    pub perfect_words: u32,
    pub rating: f64,
}

impl From<SessionHistoryRow> for HistoryItem {
    fn from(row: SessionHistoryRow) -> Self {
        let r = row.record;
        Self {
            id: row.id,
            recorded_at: r.recorded_at(),
            mode: r.mode(),
            end: r.end(),
            words_attempted: r.words_attempted(),
            words_correct: r.words_correct(),
            perfect_words: r.perfect_words(),
            rating: r.rating(),
        }
    }
}

/// Read-only views over progress and history. Unavailable data reads as empty.
#[derive(Clone)]
pub struct ReportingService {
    progress: ProgressService,
    history: Arc<dyn SessionHistoryRepository>,
    catalog: Arc<CatalogService>,
}

impl ReportingService {
    #[must_use]
    pub fn new(
        progress: ProgressService,
        history: Arc<dyn SessionHistoryRepository>,
        catalog: Arc<CatalogService>,
    ) -> Self {
        Self {
            progress,
            history,
            catalog,
        }
    }

    /// Completion and rating for one learner against the current catalog.
    pub async fn stats(&self, user: &UserId) -> ProgressStats {
        let progress = self.progress.load(user).await;
        ProgressStats::from_progress(&progress, self.catalog.current().len())
    }

    /// Top learners by rating. Guests never appear.
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let totals = self.progress.totals().await;
        rank(totals, self.catalog.current().len())
    }

    /// A learner's sessions, newest first.
    pub async fn history(&self, user: &UserId, limit: u32) -> Vec<HistoryItem> {
        match self.history.list_records(user, limit).await {
            Ok(rows) => rows.into_iter().map(HistoryItem::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, %user, "could not load session history");
                Vec::new()
            }
        }
    }
}

/// Order by rating descending, then username ascending, and keep the top entries.
fn rank(totals: Vec<ProgressTotals>, catalog_size: usize) -> Vec<LeaderboardEntry> {
    let mut rated: Vec<(ProgressTotals, Rating)> = totals
        .into_iter()
        .filter(|t| !t.user.is_guest())
        .map(|t| {
            let perfect = usize::try_from(t.perfect).unwrap_or(usize::MAX);
            let rating = Rating::compute(perfect, catalog_size);
            (t, rating)
        })
        .collect();

    rated.sort_by(|(a, ra), (b, rb)| {
        rb.percent()
            .partial_cmp(&ra.percent())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.user.cmp(&b.user))
    });

    rated
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(idx, (t, rating))| LeaderboardEntry {
            rank: idx + 1,
            user: t.user,
            words_practiced: t.words_practiced,
            perfect: t.perfect,
            rating,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{Catalog, WordPair};

    fn totals(name: &str, practiced: u32, perfect: u32) -> ProgressTotals {
        ProgressTotals {
            user: UserId::from_persisted(name),
            words_practiced: practiced,
            perfect,
        }
    }

    #[test]
    fn ranks_by_rating_then_name_and_skips_guests() {
        let ranked = rank(
            vec![
                totals("zoe", 3, 2),
                totals("guest_1700000000", 4, 4),
                totals("bob", 2, 2),
                totals("anna", 4, 3),
            ],
            4,
        );
        let names: Vec<_> = ranked.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(names, vec!["anna", "bob", "zoe"]);
        assert_eq!(ranked[0].rank, 1);
        assert!((ranked[0].rating.percent() - 75.0).abs() < f64::EPSILON);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn keeps_top_ten() {
        let many = (0..15).map(|i| totals(&format!("user{i:02}"), 1, 1)).collect();
        let ranked = rank(many, 10);
        assert_eq!(ranked.len(), LEADERBOARD_SIZE);
        assert_eq!(ranked[9].user.as_str(), "user09");
    }

    #[tokio::test]
    async fn stats_use_current_catalog() {
        use drill_core::model::{Attempts, ProgressMap};
        use drill_core::time::fixed_now;
        use storage::repository::{InMemoryRepository, ProgressRepository};

        let repo = InMemoryRepository::new();
        let anna = UserId::registered("anna").unwrap();
        let mut map = ProgressMap::new();
        map.record("hola", Attempts::PERFECT, fixed_now());
        repo.save_progress(&anna, &map).await.unwrap();

        let catalog = Catalog::new(vec![
            WordPair::new("hola", "bonjour").unwrap(),
            WordPair::new("gracias", "merci").unwrap(),
        ]);
        let svc = ReportingService::new(
            ProgressService::new(Arc::new(repo.clone())),
            Arc::new(repo.clone()),
            Arc::new(CatalogService::with_catalog("unused.csv", catalog)),
        );

        let stats = svc.stats(&anna).await;
        assert_eq!(stats.completed, 1);
        assert!((stats.rating.percent() - 50.0).abs() < f64::EPSILON);

        repo.set_offline(true);
        assert!(svc.leaderboard().await.is_empty());
        assert!(svc.history(&anna, 10).await.is_empty());
    }
}
