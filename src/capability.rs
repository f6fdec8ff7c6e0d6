//! Capability-based access control.
//!
//! Each role is a flat set membership check, not a hierarchy: an operation
//! names the capabilities it accepts and the caller must hold one of them.
//! Grants and revocations are themselves admin-gated, with a bootstrap
//! path for the first admin.

use std::collections::HashSet;
use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::types::Principal;

/// A capability required by core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum Capability {
    /// Register content, record sales and views
    Publisher,
    /// Decide moderation transitions
    Moderator,
    /// Issue access grants
    Minter,
    /// Revoke access grants
    Burner,
    /// Administrative operations: pause, emergency paths, capability grants
    Admin,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::Publisher => "publisher",
            Capability::Moderator => "moderator",
            Capability::Minter => "minter",
            Capability::Burner => "burner",
            Capability::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

/// Registry of capability grants per principal.
pub struct CapabilityRegistry {
    grants: DashMap<Principal, HashSet<Capability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            grants: DashMap::new(),
        }
    }

    /// Grant `Admin` to a principal without an authorizing caller.
    ///
    /// Used exactly once at wiring time; every later grant goes through
    /// [`CapabilityRegistry::grant`].
    pub fn bootstrap_admin(&self, principal: &Principal) {
        self.grants
            .entry(principal.clone())
            .or_default()
            .insert(Capability::Admin);
        info!(principal = %principal, "bootstrapped admin capability");
    }

    /// Grant a capability. The granter must hold `Admin`.
    pub fn grant(&self, granter: &Principal, principal: &Principal, cap: Capability) -> Result<()> {
        self.require(granter, Capability::Admin)?;
        self.grants
            .entry(principal.clone())
            .or_default()
            .insert(cap);
        info!(granter = %granter, principal = %principal, capability = %cap, "capability granted");
        Ok(())
    }

    /// Revoke a capability. The revoker must hold `Admin`.
    pub fn revoke(&self, revoker: &Principal, principal: &Principal, cap: Capability) -> Result<()> {
        self.require(revoker, Capability::Admin)?;
        if let Some(mut set) = self.grants.get_mut(principal) {
            set.remove(&cap);
        }
        info!(revoker = %revoker, principal = %principal, capability = %cap, "capability revoked");
        Ok(())
    }

    /// Whether a principal holds a capability.
    pub fn has(&self, principal: &Principal, cap: Capability) -> bool {
        self.grants
            .get(principal)
            .map(|set| set.contains(&cap))
            .unwrap_or(false)
    }

    /// Require a single capability, failing `Unauthorized` otherwise.
    pub fn require(&self, principal: &Principal, cap: Capability) -> Result<()> {
        if self.has(principal, cap) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized {
                principal: principal.clone(),
                needed: cap.to_string(),
            })
        }
    }

    /// Require any one of the listed capabilities.
    pub fn require_any(&self, principal: &Principal, caps: &[Capability]) -> Result<()> {
        if caps.iter().any(|cap| self.has(principal, *cap)) {
            Ok(())
        } else {
            let needed = caps
                .iter()
                .map(Capability::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            Err(CoreError::Unauthorized {
                principal: principal.clone(),
                needed,
            })
        }
    }

    /// All capabilities held by a principal.
    pub fn capabilities_of(&self, principal: &Principal) -> Vec<Capability> {
        self.grants
            .get(principal)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
