//! Persisted entity types.
//!
//! All identifiers are opaque unique strings and all timestamps are
//! integer milliseconds since the Unix epoch. The serde shapes here are
//! also the wire shapes of the portable snapshot document, so field names
//! render as camelCase.

pub mod board;
pub mod column;
pub mod task;
pub mod template;

use uuid::Uuid;

/// Mint a fresh opaque entity id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::new_id;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_opaque() {
        let ids: HashSet<String> = (0..64).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 64);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }
}
