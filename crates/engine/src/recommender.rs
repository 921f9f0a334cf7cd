//! # Review Recommender
//!
//! Ties the engine together behind external identifiers:
//! 1. Resolve the user id through the user registry
//! 2. Select the neighborhood (Pearson, threshold)
//! 3. Predict and rank unseen items
//! 4. Fall back to popularity when the neighborhood yields nothing
//! 5. Map item indices back to product ids
//!
//! The recommender owns its `ReviewIndex` (behind an `Arc`) and never mutates
//! it, so a single instance can serve concurrent requests from many threads.

use std::io::{BufRead, Read};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::RecommenderConfig;
use crate::error::{RecommendError, Result};
use crate::neighborhood::{Neighbor, ThresholdNeighborhood};
use crate::predictor::{RecommendationSource, ScoredItem, WeightedAveragePredictor};
use crate::similarity::{CachingSimilarity, PearsonSimilarity};
use crate::traits::UserSimilarity;
use review_loader::{ReviewIndex, UserIndex};

/// A recommendation expressed in external identifiers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecommendation {
    pub product_id: String,
    pub score: f64,
    pub source: RecommendationSource,
}

/// User-based collaborative filtering recommender over one review log
pub struct ReviewRecommender {
    index: Arc<ReviewIndex>,
    config: RecommenderConfig,
    similarity: Arc<dyn UserSimilarity>,
    neighborhood: ThresholdNeighborhood,
    predictor: WeightedAveragePredictor,
}

impl ReviewRecommender {
    /// Build a recommender over an already loaded index
    pub fn from_index(index: ReviewIndex, config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        let index = Arc::new(index);

        let pearson = PearsonSimilarity::new(Arc::clone(&index));
        let similarity: Arc<dyn UserSimilarity> =
            match NonZeroUsize::new(config.similarity_cache_capacity) {
                Some(capacity) => Arc::new(CachingSimilarity::new(pearson, capacity)),
                None => Arc::new(pearson),
            };

        let neighborhood = ThresholdNeighborhood::new(
            Arc::clone(&index),
            Arc::clone(&similarity),
            config.similarity_threshold,
        )
        .with_parallel(config.parallel_neighborhood);
        let predictor = WeightedAveragePredictor::new(Arc::clone(&index));

        info!(
            similarity = similarity.name(),
            threshold = config.similarity_threshold,
            users = index.total_users(),
            products = index.total_products(),
            "Recommender ready"
        );

        Ok(Self {
            index,
            config,
            similarity,
            neighborhood,
            predictor,
        })
    }

    /// Load a gzip-compressed review log from disk and build a recommender
    pub fn from_path(path: &Path, config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        let index = ReviewIndex::load_from_path(path)?;
        Self::from_index(index, config)
    }

    /// Build from any gzip-compressed stream
    pub fn from_gzip_reader<R: Read>(reader: R, config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        let index = ReviewIndex::from_gzip_reader(reader)?;
        Self::from_index(index, config)
    }

    /// Build from decompressed review text
    pub fn from_text_reader<R: BufRead>(reader: R, config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        let index = ReviewIndex::from_text_reader(reader)?;
        Self::from_index(index, config)
    }

    pub fn index(&self) -> &ReviewIndex {
        &self.index
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn total_reviews(&self) -> u64 {
        self.index.total_reviews()
    }

    pub fn total_products(&self) -> usize {
        self.index.total_products()
    }

    pub fn total_users(&self) -> usize {
        self.index.total_users()
    }

    /// Top `limit` product ids for a user, best first
    pub fn get_recommendations(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .recommend(user_id, limit)?
            .into_iter()
            .map(|rec| rec.product_id)
            .collect())
    }

    /// Top `config.default_limit` product ids for a user
    pub fn get_default_recommendations(&self, user_id: &str) -> Result<Vec<String>> {
        self.get_recommendations(user_id, self.config.default_limit)
    }

    /// Top `limit` recommendations for a user, with scores and their source
    #[instrument(skip(self))]
    pub fn recommend(&self, user_id: &str, limit: usize) -> Result<Vec<ProductRecommendation>> {
        let start_time = Instant::now();
        let user = self.user_index(user_id)?;

        if limit == 0 {
            return Ok(Vec::new());
        }

        let neighbors = self.neighborhood.neighbors(user);
        let mut ranked = self.predictor.top_n(user, &neighbors, limit);

        if ranked.is_empty() && self.config.cold_start_fallback {
            debug!(
                neighbors = neighbors.len(),
                "No neighborhood candidates, falling back to popularity"
            );
            ranked = self.predictor.popular_unseen(user, limit);
        }

        let recommendations = self.to_products(&ranked)?;
        info!(
            neighbors = neighbors.len(),
            returned = recommendations.len(),
            elapsed = ?start_time.elapsed(),
            "Recommendations ready"
        );
        Ok(recommendations)
    }

    /// Estimated score of one product for one user
    ///
    /// `None` when no neighbor rated the product. Products the user already
    /// rated return the user's own score.
    pub fn estimate_preference(&self, user_id: &str, product_id: &str) -> Result<Option<f64>> {
        let user = self.user_index(user_id)?;
        let item = self.index.products().index_of(product_id)?;
        let neighbors = self.neighborhood.neighbors(user);
        Ok(self.predictor.estimate(user, item, &neighbors))
    }

    /// The user's neighborhood as `(user_id, similarity)` pairs
    pub fn neighbors_of(&self, user_id: &str) -> Result<Vec<(String, f64)>> {
        let user = self.user_index(user_id)?;
        self.neighborhood
            .neighbors(user)
            .into_iter()
            .map(|Neighbor { user, similarity }| {
                let id = self.index.users().external_id_of(user)?;
                Ok::<_, RecommendError>((id.to_string(), similarity))
            })
            .collect()
    }

    /// Similarity between two users, `None` when undefined
    pub fn user_similarity(&self, first_id: &str, second_id: &str) -> Result<Option<f64>> {
        let first = self.user_index(first_id)?;
        let second = self.user_index(second_id)?;
        Ok(self.similarity.user_similarity(first, second))
    }

    fn user_index(&self, user_id: &str) -> Result<UserIndex> {
        self.index
            .users()
            .index_of(user_id)
            .map_err(|_| RecommendError::UnknownUser {
                user_id: user_id.to_string(),
            })
    }

    fn to_products(&self, ranked: &[ScoredItem]) -> Result<Vec<ProductRecommendation>> {
        ranked
            .iter()
            .map(|scored| {
                let product_id = self.index.products().external_id_of(scored.item)?;
                Ok::<_, RecommendError>(ProductRecommendation {
                    product_id: product_id.to_string(),
                    score: scored.score,
                    source: scored.source,
                })
            })
            .collect()
    }
}
