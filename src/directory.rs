//! Creator directory collaborator.
//!
//! The core does not own creator identity; it consumes a small surface
//! from the platform's creator service: registration checks and per-creator
//! aggregate updates. [`InMemoryCreatorDirectory`] is the reference
//! implementation used for embedding and tests.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Principal;

/// External creator service surface consumed by the core.
pub trait CreatorDirectory: Send + Sync {
    /// Whether the principal is a registered creator.
    fn is_registered(&self, creator: &Principal) -> bool;

    /// Record one more registered content item for the creator.
    fn increment_content_count(&self, creator: &Principal);

    /// Add a confirmed sale amount to the creator's aggregate earnings.
    fn add_earnings(&self, creator: &Principal, amount: u64);
}

/// Per-creator aggregates held by the directory.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CreatorStats {
    /// Number of registered content items
    pub content_count: u64,
    /// Lifetime earnings in USDC minor units
    pub total_earnings: u64,
}

/// In-memory creator directory.
pub struct InMemoryCreatorDirectory {
    creators: DashMap<Principal, CreatorStats>,
}

impl InMemoryCreatorDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            creators: DashMap::new(),
        }
    }

    /// Register a creator with zeroed aggregates.
    pub fn register(&self, creator: &Principal) {
        self.creators.entry(creator.clone()).or_default();
        debug!(creator = %creator, "creator registered");
    }

    /// Aggregates for a creator, if registered.
    pub fn stats(&self, creator: &Principal) -> Option<CreatorStats> {
        self.creators.get(creator).map(|s| *s)
    }
}

impl Default for InMemoryCreatorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl CreatorDirectory for InMemoryCreatorDirectory {
    fn is_registered(&self, creator: &Principal) -> bool {
        self.creators.contains_key(creator)
    }

    fn increment_content_count(&self, creator: &Principal) {
        if let Some(mut stats) = self.creators.get_mut(creator) {
            stats.content_count += 1;
        }
    }

    fn add_earnings(&self, creator: &Principal, amount: u64) {
        if let Some(mut stats) = self.creators.get_mut(creator) {
            stats.total_earnings += amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration() {
        let directory = InMemoryCreatorDirectory::new();
        let alice = "alice".to_string();

        assert!(!directory.is_registered(&alice));
        directory.register(&alice);
        assert!(directory.is_registered(&alice));
        assert_eq!(directory.stats(&alice).unwrap().content_count, 0);
    }

    #[test]
    fn test_aggregates() {
        let directory = InMemoryCreatorDirectory::new();
        let alice = "alice".to_string();
        directory.register(&alice);

        directory.increment_content_count(&alice);
        directory.increment_content_count(&alice);
        directory.add_earnings(&alice, 10_000_000);
        directory.add_earnings(&alice, 5_000_000);

        let stats = directory.stats(&alice).unwrap();
        assert_eq!(stats.content_count, 2);
        assert_eq!(stats.total_earnings, 15_000_000);
    }

    #[test]
    fn test_unregistered_updates_are_ignored() {
        let directory = InMemoryCreatorDirectory::new();
        let ghost = "ghost".to_string();

        directory.increment_content_count(&ghost);
        directory.add_earnings(&ghost, 1);
        assert!(directory.stats(&ghost).is_none());
    }
}
