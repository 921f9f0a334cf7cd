//! # Review Loader Crate
//!
//! This crate turns a gzip-compressed product-review log into a compact
//! numeric rating matrix with stable identifier mappings.
//!
//! ## Main Components
//!
//! - **registry**: bidirectional string id <-> dense index mapping
//! - **parser**: streaming, state-machine based record extraction
//! - **types**: Rating, RatingStore and the ReviewIndex that owns everything
//! - **index**: loading entry points (path, gzip stream, plain text)
//! - **io**: export of the row-per-rating intermediate table
//! - **error**: ingestion and lookup errors
//!
//! ## Example Usage
//!
//! ```ignore
//! use review_loader::ReviewIndex;
//! use std::path::Path;
//!
//! let index = ReviewIndex::load_from_path(Path::new("data/movies.txt.gz"))?;
//!
//! let user = index.users().index_of("A141HP4LYPWMSR")?;
//! let row = index.store().user_preferences(user);
//!
//! println!("User {} rated {} products", user, row.len());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod registry;
pub mod parser;
pub mod index;
pub mod io;

// Re-export commonly used types for convenience
pub use error::{IngestError, LookupError, Result};
pub use registry::IdentifierRegistry;
pub use types::{
    // Type aliases
    UserIndex,
    ItemIndex,
    // Core types
    Rating,
    Preference,
    ItemStats,
    RatingStore,
    ReviewIndex,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_index_creation() {
        let index = ReviewIndex::new();
        let (users, products, ratings) = index.counts();

        assert_eq!(users, 0);
        assert_eq!(products, 0);
        assert_eq!(ratings, 0);
        assert_eq!(index.total_reviews(), 0);
    }

    #[test]
    fn test_add_review() {
        let mut index = ReviewIndex::new();

        let rating = index.add_review("U1", "P1", 5.0);
        index.finalize();

        assert_eq!(rating.user, 0);
        assert_eq!(rating.item, 0);
        assert_eq!(index.users().external_id_of(0), Ok("U1"));
        assert_eq!(index.products().external_id_of(0), Ok("P1"));
        assert_eq!(index.store().preference(0, 0), Some(5.0));
    }

    #[test]
    fn test_counters_match_registries() {
        let mut index = ReviewIndex::new();
        index.add_review("U1", "P1", 5.0);
        index.add_review("U2", "P1", 4.0);
        index.add_review("U1", "P2", 1.0);

        assert_eq!(index.total_users(), index.users().len());
        assert_eq!(index.total_products(), index.products().len());
        assert_eq!(index.total_reviews(), 3);
    }
}
