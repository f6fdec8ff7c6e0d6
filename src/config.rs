//! Configuration for the registry and entitlement core.

use serde::{Deserialize, Serialize};

/// Seconds in one day.
const DAY_SECS: u64 = 86_400;

/// Tunables for the content registry and entitlement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Maximum rental duration in seconds
    pub max_rental_secs: u64,
    /// Minimum number of tags per content item
    pub min_tags: usize,
    /// Maximum number of tags per content item
    pub max_tags: usize,
    /// Audit log retention (entries)
    pub max_audit_entries: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_rental_secs: 30 * DAY_SECS,
            min_tags: 1,
            max_tags: 10,
            max_audit_entries: 10_000,
        }
    }
}

impl CoreConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.max_rental_secs, 2_592_000);
        assert_eq!(config.min_tags, 1);
        assert_eq!(config.max_tags, 10);
        assert_eq!(config.max_audit_entries, 10_000);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CoreConfig {
            max_rental_secs: 7 * DAY_SECS,
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        let parsed = CoreConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.max_rental_secs, 7 * DAY_SECS);
        assert_eq!(parsed.max_tags, 10);
    }
}
