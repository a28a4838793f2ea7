use std::fmt;

use crate::model::ProgressMap;

//
// ─── RATING ────────────────────────────────────────────────────────────────────
//

/// Percentage of the full catalog answered perfectly at least once.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Rating(f64);

impl Rating {
    /// `perfect / catalog_size * 100`, or zero for an empty catalog.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(perfect: usize, catalog_size: usize) -> Self {
        if catalog_size == 0 {
            return Self(0.0);
        }
        let pct = perfect as f64 / catalog_size as f64 * 100.0;
        // Stale progress rows for words removed from the catalog can push past 100.
        Self(pct.min(100.0))
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn tier(self) -> RatingTier {
        RatingTier::for_percent(self.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

//
// ─── TIER ──────────────────────────────────────────────────────────────────────
//

/// Label shown next to a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RatingTier {
    Learning,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl RatingTier {
    #[must_use]
    pub fn for_percent(pct: f64) -> Self {
        if pct >= 90.0 {
            RatingTier::Master
        } else if pct >= 80.0 {
            RatingTier::Expert
        } else if pct >= 70.0 {
            RatingTier::Advanced
        } else if pct >= 60.0 {
            RatingTier::Intermediate
        } else {
            RatingTier::Learning
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RatingTier::Master => "Master",
            RatingTier::Expert => "Expert",
            RatingTier::Advanced => "Advanced",
            RatingTier::Intermediate => "Intermediate",
            RatingTier::Learning => "Learning",
        }
    }
}

impl fmt::Display for RatingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Aggregate progress for one user against the current catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    pub total_words: usize,
    pub completed: usize,
    pub perfect: usize,
    pub rating: Rating,
}

impl ProgressStats {
    #[must_use]
    pub fn from_progress(progress: &ProgressMap, catalog_size: usize) -> Self {
        let perfect = progress.perfect_count();
        Self {
            total_words: catalog_size,
            completed: progress.completed_count(),
            perfect,
            rating: Rating::compute(perfect, catalog_size),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
