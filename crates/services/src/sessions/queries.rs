use rand::Rng;
use rand::seq::SliceRandom;

use drill_core::model::{Catalog, ProgressMap, WordPair};

/// Catalog words the learner has never resolved, in random order.
#[must_use]
pub fn select_new_words<R: Rng + ?Sized>(
    catalog: &Catalog,
    progress: &ProgressMap,
    rng: &mut R,
) -> Vec<WordPair> {
    let mut words: Vec<WordPair> = catalog
        .words()
        .iter()
        .filter(|pair| !progress.contains(pair.prompt()))
        .cloned()
        .collect();
    words.shuffle(rng);
    words
}

/// Catalog words whose last resolution took more than one try, in random order.
///
/// Every pair sharing a wrong prompt is included. Progress rows for prompts no
/// longer in the catalog are ignored.
#[must_use]
pub fn select_wrong_words<R: Rng + ?Sized>(
    catalog: &Catalog,
    progress: &ProgressMap,
    rng: &mut R,
) -> Vec<WordPair> {
    let mut words: Vec<WordPair> = catalog
        .words()
        .iter()
        .filter(|pair| {
            progress
                .attempts(pair.prompt())
                .is_some_and(|attempts| !attempts.is_perfect())
        })
        .cloned()
        .collect();
    words.shuffle(rng);
    words
}
