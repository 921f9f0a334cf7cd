//! # Engine Crate
//!
//! User-based collaborative filtering over a loaded review log.
//!
//! ## Components
//!
//! ### Similarity (`similarity`)
//! Pearson correlation over co-rated items, computed on demand from the
//! users' preference rows. An optional LRU cache remembers recent pairs.
//!
//! ### Neighborhood (`neighborhood`)
//! Every other user whose similarity meets a fixed threshold (default 0.1).
//!
//! ### Predictor (`predictor`)
//! Similarity-weighted average of the neighbors' scores for each unseen
//! item, ranked best first. Popularity ranking covers users whose
//! neighborhood yields nothing.
//!
//! ### Recommender (`recommender`)
//! The public facade: external ids in, ranked product ids out.
//!
//! ## Example Usage
//!
//! ```ignore
//! use engine::{RecommenderConfig, ReviewRecommender};
//! use std::path::Path;
//!
//! let recommender = ReviewRecommender::from_path(
//!     Path::new("data/movies.txt.gz"),
//!     RecommenderConfig::default(),
//! )?;
//!
//! let products = recommender.get_recommendations("A141HP4LYPWMSR", 3)?;
//! ```

// Public modules
pub mod config;
pub mod error;
pub mod traits;
pub mod similarity;
pub mod neighborhood;
pub mod predictor;
pub mod recommender;

// Re-export commonly used types
pub use config::RecommenderConfig;
pub use error::{RecommendError, Result};
pub use neighborhood::{Neighbor, ThresholdNeighborhood};
pub use predictor::{RecommendationSource, ScoredItem, WeightedAveragePredictor};
pub use recommender::{ProductRecommendation, ReviewRecommender};
pub use similarity::{CachingSimilarity, PearsonSimilarity};
pub use traits::UserSimilarity;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_recommender_is_shareable() {
        // Queries only read the index, so one instance can serve many threads
        assert_send_sync::<ReviewRecommender>();
        assert_send_sync::<CachingSimilarity<PearsonSimilarity>>();
    }

    #[test]
    fn test_scored_item_creation() {
        let scored = ScoredItem::new(1, 0.85, RecommendationSource::Neighborhood);
        assert_eq!(scored.item, 1);
        assert_eq!(scored.source, RecommendationSource::Neighborhood);
        assert_eq!(scored.score, 0.85);
    }
}
