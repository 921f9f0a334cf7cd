//! User-user similarity measures.
//!
//! ## Pearson correlation
//! For users u and v, let I be the items both rated. Using only I:
//!
//! ```text
//!                 Σ (x_i - x̄)(y_i - ȳ)
//! r(u, v) = ---------------------------------
//!           √( Σ (x_i - x̄)² · Σ (y_i - ȳ)² )
//! ```
//!
//! Undefined when |I| < 2 or when either user gave every item in I the same
//! score. Nothing is precomputed: each call merge-joins the two users'
//! preference rows, which are sorted by item.
//!
//! ## Caching
//! `CachingSimilarity` wraps any measure with a bounded LRU cache keyed by the
//! unordered user pair.

use crate::traits::UserSimilarity;
use lru::LruCache;
use review_loader::{Preference, ReviewIndex, UserIndex};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Pearson needs at least two points to define a line
const MIN_CO_RATED: usize = 2;

/// Sums of squared deviations at or below this count as zero variance
const VARIANCE_EPSILON: f64 = 1e-12;

/// Iterator over `(score_a, score_b)` for every item both rows contain
struct CoRated<'a> {
    a: &'a [Preference],
    b: &'a [Preference],
}

impl Iterator for CoRated<'_> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (a, b) = (self.a, self.b);
            let ((pa, rest_a), (pb, rest_b)) = (a.split_first()?, b.split_first()?);
            if pa.item < pb.item {
                self.a = rest_a;
            } else if pa.item > pb.item {
                self.b = rest_b;
            } else {
                self.a = rest_a;
                self.b = rest_b;
                return Some((pa.score as f64, pb.score as f64));
            }
        }
    }
}

fn co_rated<'a>(a: &'a [Preference], b: &'a [Preference]) -> CoRated<'a> {
    CoRated { a, b }
}

/// Number of items both rows contain
pub fn co_rated_count(a: &[Preference], b: &[Preference]) -> usize {
    co_rated(a, b).count()
}

/// Pearson correlation of two preference rows (sorted by item)
///
/// Two passes over the co-rated items: means first, then centered sums.
pub fn pearson_correlation(a: &[Preference], b: &[Preference]) -> Option<f64> {
    let (n, sum_a, sum_b) = co_rated(a, b).fold((0usize, 0.0, 0.0), |(n, sa, sb), (x, y)| {
        (n + 1, sa + x, sb + y)
    });
    if n < MIN_CO_RATED {
        return None;
    }
    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;

    let (mut numerator, mut ss_a, mut ss_b) = (0.0, 0.0, 0.0);
    for (x, y) in co_rated(a, b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        numerator += dx * dy;
        ss_a += dx * dx;
        ss_b += dy * dy;
    }

    if ss_a <= VARIANCE_EPSILON || ss_b <= VARIANCE_EPSILON {
        return None;
    }

    let r = numerator / (ss_a * ss_b).sqrt();
    Some(r.clamp(-1.0, 1.0))
}

/// Pearson correlation over a shared review index
pub struct PearsonSimilarity {
    index: Arc<ReviewIndex>,
}

impl PearsonSimilarity {
    pub fn new(index: Arc<ReviewIndex>) -> Self {
        Self { index }
    }
}

impl UserSimilarity for PearsonSimilarity {
    fn name(&self) -> &str {
        "PearsonSimilarity"
    }

    fn user_similarity(&self, a: UserIndex, b: UserIndex) -> Option<f64> {
        let store = self.index.store();
        pearson_correlation(store.user_preferences(a), store.user_preferences(b))
    }

    fn min_co_rated(&self) -> usize {
        MIN_CO_RATED
    }
}

/// Bounded LRU cache in front of another similarity measure
///
/// Undefined results are cached too, so repeated misses stay cheap.
pub struct CachingSimilarity<S> {
    inner: S,
    name: String,
    cache: Mutex<LruCache<(UserIndex, UserIndex), Option<f64>>>,
}

impl<S: UserSimilarity> CachingSimilarity<S> {
    pub fn new(inner: S, capacity: NonZeroUsize) -> Self {
        let name = format!("Caching({})", inner.name());
        Self {
            inner,
            name,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of pairs currently cached
    pub fn cached_pairs(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<S: UserSimilarity> UserSimilarity for CachingSimilarity<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn user_similarity(&self, a: UserIndex, b: UserIndex) -> Option<f64> {
        // Similarity is symmetric, so (a, b) and (b, a) share one entry
        let key = if a <= b { (a, b) } else { (b, a) };

        if let Some(&cached) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return cached;
        }

        // Computed without holding the lock
        let similarity = self.inner.user_similarity(key.0, key.1);
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, similarity);
        similarity
    }

    fn min_co_rated(&self) -> usize {
        self.inner.min_co_rated()
    }
}
