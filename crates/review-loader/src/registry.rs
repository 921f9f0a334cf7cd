//! Bidirectional mapping between external string identifiers and dense indices.
//!
//! Amazon-style logs identify users and products with opaque strings
//! (`A141HP4LYPWMSR`, `B003AI2VGA`). The engine works on dense `u32` indices
//! instead, so every identifier is assigned the next free index the first time
//! it is seen.
//!
//! Two coordinated structures back the registry:
//! - `forward`: `HashMap<String, u32>` for id -> index
//! - `reverse`: `Vec<String>` where position `i` holds the id of index `i`
//!
//! Both are updated together in `register`, and nothing is ever removed, so the
//! reverse vector is always the exact inverse of the forward map.

use crate::error::LookupError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct IdentifierRegistry {
    /// Human-readable name used in error messages ("user", "product")
    kind: &'static str,
    forward: HashMap<String, u32>,
    reverse: Vec<String>,
}

impl IdentifierRegistry {
    /// Create an empty registry for identifiers of the given kind
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            forward: HashMap::new(),
            reverse: Vec::new(),
        }
    }

    /// Register an identifier, returning its index
    ///
    /// Idempotent: an identifier seen before keeps the index it was first given.
    pub fn register(&mut self, external_id: &str) -> u32 {
        if let Some(&index) = self.forward.get(external_id) {
            return index;
        }
        let index = self.reverse.len() as u32;
        self.forward.insert(external_id.to_string(), index);
        self.reverse.push(external_id.to_string());
        index
    }

    /// Look up the index of a registered identifier
    pub fn index_of(&self, external_id: &str) -> Result<u32, LookupError> {
        self.forward
            .get(external_id)
            .copied()
            .ok_or_else(|| LookupError::UnknownIdentifier {
                kind: self.kind,
                id: external_id.to_string(),
            })
    }

    /// Look up the identifier that was assigned an index
    pub fn external_id_of(&self, index: u32) -> Result<&str, LookupError> {
        self.reverse
            .get(index as usize)
            .map(|s| s.as_str())
            .ok_or(LookupError::UnknownIndex {
                kind: self.kind,
                index,
            })
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.forward.contains_key(external_id)
    }

    /// Number of registered identifiers
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Iterate over `(index, identifier)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.reverse
            .iter()
            .enumerate()
            .map(|(index, id)| (index as u32, id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_indices() {
        let mut registry = IdentifierRegistry::new("user");

        assert_eq!(registry.register("A"), 0);
        assert_eq!(registry.register("B"), 1);
        assert_eq!(registry.register("C"), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = IdentifierRegistry::new("user");

        let first = registry.register("A141HP4LYPWMSR");
        registry.register("other");
        let second = registry.register("A141HP4LYPWMSR");

        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_round_trip() {
        let mut registry = IdentifierRegistry::new("product");
        for id in ["B003AI2VGA", "B00006HAXW", "B004BH1TKU"] {
            registry.register(id);
        }

        for id in ["B003AI2VGA", "B00006HAXW", "B004BH1TKU"] {
            let index = registry.index_of(id).unwrap();
            assert_eq!(registry.external_id_of(index).unwrap(), id);
        }
    }

    #[test]
    fn test_unknown_identifier() {
        let registry = IdentifierRegistry::new("user");
        let err = registry.index_of("nobody").unwrap_err();

        assert_eq!(
            err,
            LookupError::UnknownIdentifier {
                kind: "user",
                id: "nobody".to_string()
            }
        );
        assert!(!registry.contains("nobody"));
    }

    #[test]
    fn test_unknown_index() {
        let mut registry = IdentifierRegistry::new("product");
        registry.register("P1");

        assert!(registry.external_id_of(0).is_ok());
        assert!(matches!(
            registry.external_id_of(1),
            Err(LookupError::UnknownIndex { kind: "product", index: 1 })
        ));
    }

    #[test]
    fn test_iter_in_index_order() {
        let mut registry = IdentifierRegistry::new("user");
        registry.register("z");
        registry.register("a");
        registry.register("z");

        let pairs: Vec<(u32, &str)> = registry.iter().collect();
        assert_eq!(pairs, vec![(0, "z"), (1, "a")]);
    }
}
