//! Score prediction and top-N ranking.
//!
//! ## Algorithm
//! For every item rated by at least one neighbor but not by the target user:
//!
//! ```text
//! estimate(item) = Σ sim(n) · score(n, item) / Σ |sim(n)|
//! ```
//!
//! summed over the neighbors n who rated the item. With a negative threshold
//! the neighborhood may hold disagreeing users; their weight still counts in
//! the denominator, so opposite similarities never cancel out an item. Candidates are sorted by
//! estimate (highest first), ties broken by ascending item index, and the
//! first N are returned.
//!
//! When the neighborhood produces no candidate at all, `popular_unseen` ranks
//! the user's unseen items by popularity instead (see `RecommendationSource`).

use crate::neighborhood::Neighbor;
use review_loader::{ItemIndex, ReviewIndex, UserIndex};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a recommended item's score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecommendationSource {
    /// Similarity-weighted average over the neighborhood
    Neighborhood,
    /// Cold-start fallback: item popularity
    Popularity,
}

/// An item with its estimated score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: ItemIndex,
    pub score: f64,
    pub source: RecommendationSource,
}

impl ScoredItem {
    pub fn new(item: ItemIndex, score: f64, source: RecommendationSource) -> Self {
        Self {
            item,
            score,
            source,
        }
    }
}

pub struct WeightedAveragePredictor {
    index: Arc<ReviewIndex>,
}

impl WeightedAveragePredictor {
    pub fn new(index: Arc<ReviewIndex>) -> Self {
        Self { index }
    }

    /// Estimated scores for every item the neighborhood rated and `user` did not
    pub fn candidate_scores(&self, user: UserIndex, neighbors: &[Neighbor]) -> HashMap<ItemIndex, f64> {
        let store = self.index.store();

        // item -> (Σ sim · score, Σ |sim|)
        let mut totals: HashMap<ItemIndex, (f64, f64)> = HashMap::new();
        for neighbor in neighbors {
            if neighbor.user == user {
                continue;
            }
            for pref in store.user_preferences(neighbor.user) {
                if store.has_rated(user, pref.item) {
                    continue;
                }
                let entry = totals.entry(pref.item).or_insert((0.0, 0.0));
                entry.0 += neighbor.similarity * pref.score as f64;
                entry.1 += neighbor.similarity.abs();
            }
        }

        totals
            .into_iter()
            .filter(|&(_, (_, total_similarity))| total_similarity != 0.0)
            .map(|(item, (weighted, total_similarity))| (item, weighted / total_similarity))
            .collect()
    }

    /// Estimate one item's score for `user`
    ///
    /// Returns the user's own score if they already rated the item, and
    /// `None` if no neighbor rated it.
    pub fn estimate(&self, user: UserIndex, item: ItemIndex, neighbors: &[Neighbor]) -> Option<f64> {
        let store = self.index.store();
        if let Some(score) = store.preference(user, item) {
            return Some(score as f64);
        }

        let (weighted, total_similarity) = neighbors
            .iter()
            .filter(|n| n.user != user)
            .filter_map(|n| store.preference(n.user, item).map(|score| (n.similarity, score as f64)))
            .fold((0.0, 0.0), |(w, t), (similarity, score)| {
                (w + similarity * score, t + similarity.abs())
            });

        if total_similarity == 0.0 {
            None
        } else {
            Some(weighted / total_similarity)
        }
    }

    /// The `limit` best neighborhood-based recommendations for `user`
    pub fn top_n(&self, user: UserIndex, neighbors: &[Neighbor], limit: usize) -> Vec<ScoredItem> {
        let scored = self
            .candidate_scores(user, neighbors)
            .into_iter()
            .map(|(item, score)| ScoredItem::new(item, score, RecommendationSource::Neighborhood));
        rank(scored, limit)
    }

    /// The `limit` most popular items `user` has not rated
    ///
    /// Items without any rating rows are never returned.
    pub fn popular_unseen(&self, user: UserIndex, limit: usize) -> Vec<ScoredItem> {
        let store = self.index.store();
        let scored = (0..self.index.total_products() as ItemIndex)
            .filter(|&item| !store.has_rated(user, item))
            .filter_map(|item| {
                store
                    .item_stats(item)
                    .filter(|stats| stats.rating_count > 0)
                    .map(|stats| {
                        ScoredItem::new(
                            item,
                            stats.popularity_score as f64,
                            RecommendationSource::Popularity,
                        )
                    })
            });
        rank(scored, limit)
    }
}

/// Sort by score descending, then item ascending, and keep the first `limit`
pub fn rank(scored: impl IntoIterator<Item = ScoredItem>, limit: usize) -> Vec<ScoredItem> {
    let mut ranked: Vec<ScoredItem> = scored.into_iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.item.cmp(&b.item)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Target U1 rated P1; neighbors U2 (0.5) and U3 (1.0) rated P2/P3
    fn create_test_index() -> Arc<ReviewIndex> {
        let mut index = ReviewIndex::new();
        index.add_review("U1", "P1", 4.0);
        index.add_review("U2", "P1", 3.0);
        index.add_review("U2", "P2", 2.0);
        index.add_review("U2", "P3", 5.0);
        index.add_review("U3", "P2", 4.0);
        index.add_review("U3", "P4", 1.0);
        index.finalize();
        Arc::new(index)
    }

    fn neighbors() -> Vec<Neighbor> {
        vec![
            Neighbor {
                user: 1,
                similarity: 0.5,
            },
            Neighbor {
                user: 2,
                similarity: 1.0,
            },
        ]
    }

    #[test]
    fn test_candidate_scores() {
        let predictor = WeightedAveragePredictor::new(create_test_index());
        let scores = predictor.candidate_scores(0, &neighbors());

        // P2: (0.5 * 2 + 1.0 * 4) / 1.5
        assert!((scores[&1] - 5.0 / 1.5).abs() < 1e-9);
        // P3 and P4 each have a single rater
        assert!((scores[&2] - 5.0).abs() < 1e-9);
        assert!((scores[&3] - 1.0).abs() < 1e-9);
        // P1 was already rated by U1
        assert!(!scores.contains_key(&0));
    }

    #[test]
    fn test_top_n_order_and_limit() {
        let predictor = WeightedAveragePredictor::new(create_test_index());

        let all = predictor.top_n(0, &neighbors(), 10);
        let items: Vec<ItemIndex> = all.iter().map(|s| s.item).collect();
        assert_eq!(items, vec![2, 1, 3]);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(all.iter().all(|s| s.source == RecommendationSource::Neighborhood));

        let top = predictor.top_n(0, &neighbors(), 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].item, 2);

        assert!(predictor.top_n(0, &neighbors(), 0).is_empty());
    }

    #[test]
    fn test_no_neighbors_no_candidates() {
        let predictor = WeightedAveragePredictor::new(create_test_index());
        assert!(predictor.top_n(0, &[], 3).is_empty());
    }

    #[test]
    fn test_estimate() {
        let predictor = WeightedAveragePredictor::new(create_test_index());

        let p2 = predictor.estimate(0, 1, &neighbors()).unwrap();
        assert!((p2 - 5.0 / 1.5).abs() < 1e-9);
        // Already rated: the user's own score
        assert_eq!(predictor.estimate(0, 0, &neighbors()), Some(4.0));
        // Nobody in the neighborhood rated it
        assert_eq!(predictor.estimate(0, 3, &neighbors()[..1]), None);
    }

    #[test]
    fn test_opposite_similarities_do_not_cancel() {
        let predictor = WeightedAveragePredictor::new(create_test_index());
        let opposed = vec![
            Neighbor {
                user: 1,
                similarity: 1.0,
            },
            Neighbor {
                user: 2,
                similarity: -1.0,
            },
        ];

        // P2: (1.0 * 2 - 1.0 * 4) / 2
        let scores = predictor.candidate_scores(0, &opposed);
        assert!((scores[&1] + 1.0).abs() < 1e-9);
        let p2 = predictor.estimate(0, 1, &opposed).unwrap();
        assert!((p2 + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_ties_by_item() {
        let scored = vec![
            ScoredItem::new(7, 3.0, RecommendationSource::Neighborhood),
            ScoredItem::new(2, 3.0, RecommendationSource::Neighborhood),
            ScoredItem::new(5, 4.0, RecommendationSource::Neighborhood),
        ];
        let items: Vec<ItemIndex> = rank(scored, 3).iter().map(|s| s.item).collect();
        assert_eq!(items, vec![5, 2, 7]);
    }

    #[test]
    fn test_popular_unseen() {
        let predictor = WeightedAveragePredictor::new(create_test_index());
        let popular = predictor.popular_unseen(0, 10);

        let items: Vec<ItemIndex> = popular.iter().map(|s| s.item).collect();
        assert!(!items.contains(&0));
        // 5.0 * ln 2 for P3 beats 3.0 * ln 3 for P2
        assert_eq!(items, vec![2, 1, 3]);
        assert!(popular.iter().all(|s| s.source == RecommendationSource::Popularity));
    }
}
