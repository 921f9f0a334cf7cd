//! Recommender configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "similarity_threshold": 0.3, "similarity_cache_capacity": 100000 }
//! ```

use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Minimum similarity for a user to join the neighborhood (default: 0.1)
    pub similarity_threshold: f64,

    /// Number of recommendations when the caller does not ask for a count (default: 3)
    pub default_limit: usize,

    /// Rank unseen items by popularity when the neighborhood yields nothing (default: true)
    pub cold_start_fallback: bool,

    /// Capacity of the similarity LRU cache, 0 disables it (default: 0)
    pub similarity_cache_capacity: usize,

    /// Score candidate neighbors with rayon (default: true)
    pub parallel_neighborhood: bool,
}

impl RecommenderConfig {
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_cold_start_fallback(mut self, enabled: bool) -> Self {
        self.cold_start_fallback = enabled;
        self
    }

    pub fn with_similarity_cache_capacity(mut self, capacity: usize) -> Self {
        self.similarity_cache_capacity = capacity;
        self
    }

    pub fn with_parallel_neighborhood(mut self, enabled: bool) -> Self {
        self.parallel_neighborhood = enabled;
        self
    }

    /// Reject values the engine cannot work with
    ///
    /// Pearson similarity lives in [-1, 1], so a threshold outside that range
    /// would either admit everyone or no one.
    pub fn validate(&self) -> Result<()> {
        if !self.similarity_threshold.is_finite()
            || !(-1.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(RecommendError::InvalidConfig(format!(
                "similarity_threshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.1,
            default_limit: 3,
            cold_start_fallback: true,
            similarity_cache_capacity: 0,
            parallel_neighborhood: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecommenderConfig::default();
        assert_eq!(config.similarity_threshold, 0.1);
        assert_eq!(config.default_limit, 3);
        assert!(config.cold_start_fallback);
        assert_eq!(config.similarity_cache_capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RecommenderConfig::default()
            .with_similarity_threshold(0.5)
            .with_default_limit(10)
            .with_cold_start_fallback(false)
            .with_similarity_cache_capacity(1024)
            .with_parallel_neighborhood(false);

        assert_eq!(config.similarity_threshold, 0.5);
        assert_eq!(config.default_limit, 10);
        assert!(!config.cold_start_fallback);
        assert_eq!(config.similarity_cache_capacity, 1024);
        assert!(!config.parallel_neighborhood);
    }

    #[test]
    fn test_partial_json() {
        let config: RecommenderConfig =
            serde_json::from_str(r#"{ "similarity_threshold": 0.3 }"#).unwrap();

        assert_eq!(config.similarity_threshold, 0.3);
        assert_eq!(config.default_limit, 3);
        assert!(config.cold_start_fallback);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(RecommenderConfig::default()
            .with_similarity_threshold(1.5)
            .validate()
            .is_err());
        assert!(RecommenderConfig::default()
            .with_similarity_threshold(f64::NAN)
            .validate()
            .is_err());
    }
}
