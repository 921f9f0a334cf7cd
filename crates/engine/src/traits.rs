//! Core traits for the recommendation engine.

use review_loader::UserIndex;

/// A measure of how alike two users' ratings are.
///
/// ## Design Note
/// - `Send + Sync` so one measure can serve concurrent recommendation requests
/// - Returns `None` when the measure is undefined for the pair, which is
///   different from a similarity of zero
pub trait UserSimilarity: Send + Sync {
    /// Returns the name of this measure (for logging/debugging)
    fn name(&self) -> &str;

    /// Similarity between two users, or `None` if undefined
    ///
    /// Implementations must be symmetric.
    fn user_similarity(&self, a: UserIndex, b: UserIndex) -> Option<f64>;

    /// Fewest co-rated items for which the measure can be defined
    ///
    /// Lets the neighborhood skip pairs that cannot qualify.
    fn min_co_rated(&self) -> usize {
        1
    }
}
