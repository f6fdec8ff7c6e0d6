//! Administrative controls: global pause and emergency operations.
//!
//! The pause switch is a process-wide circuit breaker checked by every
//! mutating entry point; reads stay available while paused. The emergency
//! paths deliberately bypass both the pause guard and the normal business
//! rules, and every use is audited.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::audit::{AuditAction, AuditLog};
use crate::capability::{Capability, CapabilityRegistry};
use crate::content::ContentStore;
use crate::entitlement::EntitlementEngine;
use crate::error::{CoreError, Result};
use crate::types::{ContentId, Principal, TokenId};

/// Global pause flag with a single writer path.
pub struct PauseSwitch {
    paused: AtomicBool,
}

impl PauseSwitch {
    /// Create an unpaused switch.
    pub fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
        }
    }

    /// Fail with `Paused` if the system is paused. Checked at the top of
    /// every mutating operation, before any state is touched.
    pub fn guard(&self) -> Result<()> {
        if self.is_paused() {
            Err(CoreError::Paused)
        } else {
            Ok(())
        }
    }

    /// Whether the system is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn engage(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub(crate) fn lift(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
}

impl Default for PauseSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// Thin admin surface layered over the content store and entitlement
/// engine.
pub struct AdminControls {
    caps: Arc<CapabilityRegistry>,
    pause: Arc<PauseSwitch>,
    audit: Arc<AuditLog>,
    content: Arc<ContentStore>,
    entitlement: Arc<EntitlementEngine>,
}

impl AdminControls {
    /// Wire the controls to shared platform state.
    pub fn new(
        caps: Arc<CapabilityRegistry>,
        pause: Arc<PauseSwitch>,
        audit: Arc<AuditLog>,
        content: Arc<ContentStore>,
        entitlement: Arc<EntitlementEngine>,
    ) -> Self {
        Self {
            caps,
            pause,
            audit,
            content,
            entitlement,
        }
    }

    /// Pause all mutating operations. Admin only; idempotent.
    pub fn pause(&self, caller: &Principal) -> Result<()> {
        self.caps.require(caller, Capability::Admin)?;
        self.pause.engage();
        warn!(admin = %caller, "system paused");
        self.audit.record(caller, AuditAction::Pause, "system", None);
        Ok(())
    }

    /// Lift the pause. Admin only; idempotent.
    pub fn resume(&self, caller: &Principal) -> Result<()> {
        self.caps.require(caller, Capability::Admin)?;
        self.pause.lift();
        warn!(admin = %caller, "system resumed");
        self.audit.record(caller, AuditAction::Resume, "system", None);
        Ok(())
    }

    /// Force content into `Rejected` regardless of its current state and
    /// the transition rules. Works while paused.
    pub fn emergency_remove_content(
        &self,
        caller: &Principal,
        content_id: ContentId,
        reason: &str,
    ) -> Result<()> {
        self.caps.require(caller, Capability::Admin)?;
        self.content.force_reject(content_id)?;

        warn!(admin = %caller, content_id, reason, "emergency content takedown");
        self.audit.record(
            caller,
            AuditAction::EmergencyTakedown,
            format!("content:{content_id}"),
            Some(serde_json::json!({ "reason": reason })),
        );
        Ok(())
    }

    /// Force-burn grant quantity without ownership validation. Works while
    /// paused.
    pub fn emergency_burn(
        &self,
        caller: &Principal,
        owner: &Principal,
        token_id: TokenId,
        quantity: u64,
    ) -> Result<()> {
        self.caps.require(caller, Capability::Admin)?;
        self.entitlement.force_burn(token_id, quantity)?;

        warn!(admin = %caller, owner = %owner, token_id, quantity, "emergency burn");
        self.audit.record(
            caller,
            AuditAction::EmergencyBurn,
            format!("token:{token_id}"),
            Some(serde_json::json!({ "owner": owner, "quantity": quantity })),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_switch() {
        let switch = PauseSwitch::new();
        assert!(!switch.is_paused());
        assert!(switch.guard().is_ok());

        switch.engage();
        assert!(switch.is_paused());
        assert!(matches!(switch.guard().unwrap_err(), CoreError::Paused));

        // Idempotent
        switch.engage();
        assert!(switch.is_paused());

        switch.lift();
        assert!(switch.guard().is_ok());
    }
}
