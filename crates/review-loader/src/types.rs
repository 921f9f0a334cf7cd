//! Core domain types for review logs.
//!
//! This module defines the data structures shared by the parser and the
//! recommendation engine:
//! - Type aliases for dense indices (UserIndex, ItemIndex)
//! - `Rating`: one (user, item, score) row extracted from the log
//! - `RatingStore`: all rows plus the derived per-user and per-item views
//! - `ReviewIndex`: the registries, the store and the counters of one load

use crate::registry::IdentifierRegistry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================

/// Dense index of a user, assigned in first-seen order
pub type UserIndex = u32;

/// Dense index of a product (item), assigned in first-seen order
pub type ItemIndex = u32;

// =============================================================================
// Rating Types
// =============================================================================

/// A single rating extracted from the log
///
/// Small and `Copy`: the store keeps millions of these in one `Vec`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: UserIndex,
    pub item: ItemIndex,
    pub score: f32,
}

/// One entry of a user's preference row: the score given to an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub item: ItemIndex,
    pub score: f32,
}

/// Aggregate statistics for one item, computed after ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub avg_score: f32,
    /// Number of rating rows, duplicates included
    pub rating_count: u32,
    /// avg_score * ln(rating_count + 1)
    pub popularity_score: f32,
}

// =============================================================================
// RatingStore
// =============================================================================

/// Every rating produced by one ingestion pass, in log order.
///
/// Conceptually a sparse matrix with users as rows and items as columns.
/// Cells that were never produced are unknown, not zero.
///
/// Duplicate (user, item) rows are kept as separate entries in `ratings`.
/// The derived `user_rows` view holds one score per (user, item): the last one
/// seen in the log. Similarity and prediction read only `user_rows`.
#[derive(Debug, Default)]
pub struct RatingStore {
    pub(crate) ratings: Vec<Rating>,
    /// Per user, preferences sorted by item index (built by `build_preference_rows`)
    pub(crate) user_rows: Vec<Vec<Preference>>,
    /// Per item, the users who rated it in ascending order
    pub(crate) item_raters: Vec<Vec<UserIndex>>,
    /// Indexed by item (built by `compute_item_stats`)
    pub(crate) item_stats: Vec<ItemStats>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rating row
    pub fn insert(&mut self, rating: Rating) {
        self.ratings.push(rating);
    }

    /// All rating rows in log order
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Preferences of a user sorted by item index
    ///
    /// Returns an empty slice for users without ratings.
    pub fn user_preferences(&self, user: UserIndex) -> &[Preference] {
        self.user_rows
            .get(user as usize)
            .map(|row| row.as_slice())
            .unwrap_or(&[])
    }

    /// The score a user gave an item, if any
    pub fn preference(&self, user: UserIndex, item: ItemIndex) -> Option<f32> {
        let row = self.user_preferences(user);
        row.binary_search_by_key(&item, |p| p.item)
            .ok()
            .map(|pos| row[pos].score)
    }

    pub fn has_rated(&self, user: UserIndex, item: ItemIndex) -> bool {
        self.preference(user, item).is_some()
    }

    /// Users who rated an item, ascending, each listed once
    pub fn item_raters(&self, item: ItemIndex) -> &[UserIndex] {
        self.item_raters
            .get(item as usize)
            .map(|raters| raters.as_slice())
            .unwrap_or(&[])
    }

    pub fn item_stats(&self, item: ItemIndex) -> Option<&ItemStats> {
        self.item_stats.get(item as usize)
    }

    /// Build the per-user preference rows and per-item rater lists
    ///
    /// Rows are sorted by item so that two users can be merge-joined on their
    /// co-rated items. When a user rated an item more than once, the last row
    /// in log order wins.
    pub fn build_preference_rows(&mut self, num_users: usize, num_items: usize) {
        let mut rows: Vec<Vec<Preference>> = vec![Vec::new(); num_users];
        for rating in &self.ratings {
            if let Some(row) = rows.get_mut(rating.user as usize) {
                row.push(Preference {
                    item: rating.item,
                    score: rating.score,
                });
            }
        }

        rows.par_iter_mut().for_each(|row| {
            // Stable sort keeps duplicates in log order
            row.sort_by_key(|p| p.item);
            let mut deduped: Vec<Preference> = Vec::with_capacity(row.len());
            for pref in row.drain(..) {
                match deduped.last_mut() {
                    Some(last) if last.item == pref.item => last.score = pref.score,
                    _ => deduped.push(pref),
                }
            }
            *row = deduped;
        });

        // Walking users in order keeps every rater list sorted
        let mut raters: Vec<Vec<UserIndex>> = vec![Vec::new(); num_items];
        for (user, row) in rows.iter().enumerate() {
            for pref in row {
                if let Some(list) = raters.get_mut(pref.item as usize) {
                    list.push(user as UserIndex);
                }
            }
        }

        self.user_rows = rows;
        self.item_raters = raters;
    }

    /// Compute aggregate statistics for every item
    ///
    /// Every rating row counts, duplicates included.
    pub fn compute_item_stats(&mut self, num_items: usize) {
        let mut totals: Vec<(f64, u32)> = vec![(0.0, 0); num_items];
        for rating in &self.ratings {
            if let Some(entry) = totals.get_mut(rating.item as usize) {
                entry.0 += rating.score as f64;
                entry.1 += 1;
            }
        }

        self.item_stats = totals
            .par_iter()
            .map(|&(total, rating_count)| {
                let avg_score = if rating_count > 0 {
                    (total / rating_count as f64) as f32
                } else {
                    0.0
                };
                ItemStats {
                    avg_score,
                    rating_count,
                    popularity_score: compute_popularity_score(avg_score, rating_count),
                }
            })
            .collect();
    }
}

/// Rewards both high scores and many ratings
pub(crate) fn compute_popularity_score(avg_score: f32, rating_count: u32) -> f32 {
    avg_score * (rating_count as f32 + 1.0).ln()
}

// =============================================================================
// ReviewIndex - everything one ingestion pass produces
// =============================================================================

/// Registries, rating store and counters built from one review log.
///
/// Owned by exactly one recommender; there is no shared global state, so two
/// indices loaded in the same process never interfere. Once loaded it is only
/// read, which is what lets the engine share it behind an `Arc`.
#[derive(Debug)]
pub struct ReviewIndex {
    pub(crate) users: IdentifierRegistry,
    pub(crate) products: IdentifierRegistry,
    pub(crate) store: RatingStore,
    /// Number of `review/userId` lines seen, whether or not a score followed
    pub(crate) total_reviews: u64,
}

impl ReviewIndex {
    /// Creates a new, empty ReviewIndex
    pub fn new() -> Self {
        Self {
            users: IdentifierRegistry::new("user"),
            products: IdentifierRegistry::new("product"),
            store: RatingStore::new(),
            total_reviews: 0,
        }
    }

    pub fn users(&self) -> &IdentifierRegistry {
        &self.users
    }

    pub fn products(&self) -> &IdentifierRegistry {
        &self.products
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn total_reviews(&self) -> u64 {
        self.total_reviews
    }

    pub fn total_users(&self) -> usize {
        self.users.len()
    }

    pub fn total_products(&self) -> usize {
        self.products.len()
    }

    /// (users, products, rating rows)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.users.len(), self.products.len(), self.store.len())
    }

    // Mutators - used while loading. They take `&mut self`, so nothing can
    // change an index once it is shared.

    pub fn register_product(&mut self, product_id: &str) -> ItemIndex {
        self.products.register(product_id)
    }

    /// Register a user and count one observed review
    pub fn register_review(&mut self, user_id: &str) -> UserIndex {
        self.total_reviews += 1;
        self.users.register(user_id)
    }

    pub fn insert_rating(&mut self, rating: Rating) {
        self.store.insert(rating);
    }

    /// Add one complete review by external identifiers
    ///
    /// Convenience for building an index by hand; `finalize` must run afterwards.
    pub fn add_review(&mut self, user_id: &str, product_id: &str, score: f32) -> Rating {
        let item = self.register_product(product_id);
        let user = self.register_review(user_id);
        let rating = Rating { user, item, score };
        self.insert_rating(rating);
        rating
    }

    /// Build the derived views (preference rows, item stats)
    ///
    /// Called once all ratings are in.
    pub fn finalize(&mut self) {
        let num_users = self.users.len();
        let num_items = self.products.len();
        self.store.build_preference_rows(num_users, num_items);
        self.store.compute_item_stats(num_items);
    }
}

impl Default for ReviewIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_rows_sorted() {
        let mut index = ReviewIndex::new();
        index.add_review("U1", "P3", 3.0);
        index.add_review("U1", "P1", 1.0);
        index.add_review("U1", "P2", 2.0);
        index.finalize();

        let items: Vec<ItemIndex> = index
            .store()
            .user_preferences(0)
            .iter()
            .map(|p| p.item)
            .collect();
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicates_kept_in_store_last_wins_in_rows() {
        let mut index = ReviewIndex::new();
        index.add_review("U1", "P1", 2.0);
        index.add_review("U1", "P1", 4.0);
        index.finalize();

        // Both rows survive in the store
        assert_eq!(index.store().len(), 2);
        assert_eq!(index.total_reviews(), 2);

        // The preference view keeps the later score
        assert_eq!(index.store().user_preferences(0).len(), 1);
        assert_eq!(index.store().preference(0, 0), Some(4.0));
    }

    #[test]
    fn test_item_raters() {
        let mut index = ReviewIndex::new();
        index.add_review("U1", "P1", 5.0);
        index.add_review("U2", "P2", 3.0);
        index.add_review("U3", "P1", 1.0);
        index.add_review("U1", "P1", 2.0);
        index.finalize();

        assert_eq!(index.store().item_raters(0), &[0, 2]);
        assert_eq!(index.store().item_raters(1), &[1]);
        assert!(index.store().item_raters(7).is_empty());
    }

    #[test]
    fn test_item_stats() {
        let mut index = ReviewIndex::new();
        index.add_review("U1", "P1", 5.0);
        index.add_review("U2", "P1", 3.0);
        index.add_review("U2", "P2", 1.0);
        index.finalize();

        let stats = index.store().item_stats(0).unwrap();
        assert_eq!(stats.rating_count, 2);
        assert!((stats.avg_score - 4.0).abs() < 1e-6);
        assert!(stats.popularity_score > index.store().item_stats(1).unwrap().popularity_score);
        assert!(index.store().item_stats(2).is_none());
    }

    #[test]
    fn test_popularity_score() {
        // High score with few ratings
        let score1 = compute_popularity_score(4.5, 10);

        // Medium score with many ratings
        let score2 = compute_popularity_score(3.5, 1000);

        assert!(score1 > 0.0);
        assert!(score2 > score1);
        assert_eq!(compute_popularity_score(5.0, 0), 0.0);
    }

    #[test]
    fn test_unknown_user_row_is_empty() {
        let index = ReviewIndex::new();
        assert!(index.store().user_preferences(42).is_empty());
        assert_eq!(index.store().preference(42, 0), None);
    }
}
