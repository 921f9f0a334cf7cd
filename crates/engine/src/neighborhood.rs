//! Threshold neighborhood selection.
//!
//! The neighborhood of a user is every other user whose similarity to them is
//! defined and at least the threshold. There is no size limit.
//!
//! ## Algorithm
//! 1. For every item the target rated, count how many of its items each other
//!    rater shares with the target
//! 2. Keep users sharing at least `min_co_rated` items; the measure is
//!    undefined for everyone else, so skipping them changes nothing
//! 3. Score the remaining users and keep those at or above the threshold
//!
//! Each neighbor carries its similarity, so the predictor never recomputes it
//! within a request.

use crate::traits::UserSimilarity;
use rayon::prelude::*;
use review_loader::{Preference, RatingStore, ReviewIndex, UserIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A user in the neighborhood and their similarity to the target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub user: UserIndex,
    pub similarity: f64,
}

pub struct ThresholdNeighborhood {
    /// Shared reference to the review index (read-only, so no Mutex needed)
    index: Arc<ReviewIndex>,
    similarity: Arc<dyn UserSimilarity>,
    threshold: f64,
    parallel: bool,
}

impl ThresholdNeighborhood {
    pub fn new(index: Arc<ReviewIndex>, similarity: Arc<dyn UserSimilarity>, threshold: f64) -> Self {
        Self {
            index,
            similarity,
            threshold,
            parallel: true,
        }
    }

    /// Configure whether candidates are scored with rayon (default: true)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// All users at or above the threshold, ordered by user index
    #[instrument(skip(self), fields(similarity = self.similarity.name(), threshold = self.threshold))]
    pub fn neighbors(&self, user: UserIndex) -> Vec<Neighbor> {
        let candidates = self.candidate_users(user);

        let score = |&other: &UserIndex| {
            self.similarity
                .user_similarity(user, other)
                .filter(|&similarity| similarity >= self.threshold)
                .map(|similarity| Neighbor {
                    user: other,
                    similarity,
                })
        };

        // Both paths preserve the ascending order of `candidates`
        let neighbors: Vec<Neighbor> = if self.parallel {
            candidates.par_iter().filter_map(score).collect()
        } else {
            candidates.iter().filter_map(score).collect()
        };

        debug!(
            candidates = candidates.len(),
            neighbors = neighbors.len(),
            "Selected neighborhood"
        );
        neighbors
    }

    /// Users sharing enough items with `user` for the measure to be defined
    fn candidate_users(&self, user: UserIndex) -> Vec<UserIndex> {
        let store = self.index.store();
        let preferences = store.user_preferences(user);

        let shared_counts: HashMap<UserIndex, usize> = if self.parallel {
            preferences
                .par_iter()
                .fold(HashMap::new, |mut local_counts, pref| {
                    count_shared_raters(store, user, pref, &mut local_counts);
                    local_counts
                })
                .reduce(HashMap::new, |mut acc, local_counts| {
                    for (other, count) in local_counts {
                        *acc.entry(other).or_insert(0) += count;
                    }
                    acc
                })
        } else {
            let mut counts = HashMap::new();
            for pref in preferences {
                count_shared_raters(store, user, pref, &mut counts);
            }
            counts
        };

        let min_shared = self.similarity.min_co_rated().max(1);
        let mut candidates: Vec<UserIndex> = shared_counts
            .into_iter()
            .filter(|&(_, count)| count >= min_shared)
            .map(|(other, _)| other)
            .collect();
        candidates.sort_unstable();
        candidates
    }
}

fn count_shared_raters(
    store: &RatingStore,
    user: UserIndex,
    pref: &Preference,
    counts: &mut HashMap<UserIndex, usize>,
) {
    for &other in store.item_raters(pref.item) {
        if other != user {
            *counts.entry(other).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::PearsonSimilarity;

    /// U1 and U2 agree, U3 disagrees with U1, U4 shares only one item
    fn create_test_index() -> Arc<ReviewIndex> {
        let mut index = ReviewIndex::new();
        for (user, scores) in [
            ("U1", [5.0, 1.0, 3.0]),
            ("U2", [4.0, 2.0, 3.0]),
            ("U3", [1.0, 5.0, 3.0]),
        ] {
            for (item, score) in ["P1", "P2", "P3"].iter().zip(scores) {
                index.add_review(user, item, score);
            }
        }
        index.add_review("U4", "P1", 5.0);
        index.add_review("U4", "P4", 2.0);
        index.finalize();
        Arc::new(index)
    }

    fn neighborhood(index: &Arc<ReviewIndex>, threshold: f64) -> ThresholdNeighborhood {
        let similarity = Arc::new(PearsonSimilarity::new(Arc::clone(index)));
        ThresholdNeighborhood::new(Arc::clone(index), similarity, threshold)
    }

    #[test]
    fn test_neighbors_above_threshold() {
        let index = create_test_index();
        let neighbors = neighborhood(&index, 0.1).neighbors(0);

        // Only U2 correlates positively with U1
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].user, 1);
        assert!(neighbors[0].similarity >= 0.1);
    }

    #[test]
    fn test_negative_threshold_admits_disagreeing_users() {
        let index = create_test_index();
        let neighbors = neighborhood(&index, -1.0).neighbors(0);

        let users: Vec<UserIndex> = neighbors.iter().map(|n| n.user).collect();
        // U4 shares a single item and is never a candidate
        assert_eq!(users, vec![1, 2]);
    }

    #[test]
    fn test_excludes_target() {
        let index = create_test_index();
        let neighbors = neighborhood(&index, -1.0).neighbors(1);
        assert!(neighbors.iter().all(|n| n.user != 1));
    }

    #[test]
    fn test_empty_neighborhood() {
        let index = create_test_index();
        assert!(neighborhood(&index, 0.1).neighbors(3).is_empty());
        // A user index with no ratings at all
        assert!(neighborhood(&index, 0.1).neighbors(99).is_empty());
    }

    #[test]
    fn test_parallel_matches_serial() {
        let index = create_test_index();
        for user in 0..4 {
            let parallel = neighborhood(&index, -1.0).neighbors(user);
            let serial = neighborhood(&index, -1.0).with_parallel(false).neighbors(user);
            assert_eq!(parallel, serial);
        }
    }
}
