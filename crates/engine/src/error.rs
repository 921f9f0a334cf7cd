//! Errors surfaced by the recommendation engine.

use review_loader::{IngestError, LookupError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// Building the recommender failed; no instance was produced
    #[error("Failed to ingest review log: {0}")]
    Ingest(#[from] IngestError),

    /// The requested user never appeared in the log
    #[error("Unknown user: {user_id}")]
    UnknownUser { user_id: String },

    /// A registry lookup failed (unknown product, or an index with no identifier)
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
