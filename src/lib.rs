//! Turnstile - content registry and access entitlement engine.
//!
//! The authoritative core of a creator-content marketplace: creators
//! register content, moderators approve or reject it, and consumers
//! acquire time-bounded or permanent access grants. Everything here is
//! synchronous, in-memory, and safe under concurrent callers.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Platform                           │
//! │                                                           │
//! │  ┌──────────────┐        ┌───────────────────┐            │
//! │  │ ContentStore │◄───────│ EntitlementEngine │            │
//! │  └──────┬───────┘        └─────────┬─────────┘            │
//! │         │       ┌───────────────┐  │                      │
//! │         └──────►│ AdminControls │◄─┘                      │
//! │                 └───────────────┘                         │
//! │                                                           │
//! │  shared: capabilities · pause switch · audit log · clock  │
//! │          creator directory (external collaborator)        │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`content::ContentStore`] owns content records, perceptual-hash
//!   deduplication, the moderation state machine, tagging, geo checks,
//!   and sale/view bookkeeping.
//! - [`entitlement::EntitlementEngine`] issues, extends, revokes, and
//!   resolves the four grant kinds (PPV, subscription, lifetime, rental).
//! - [`admin::AdminControls`] layers pause/resume and the emergency paths
//!   over both.

pub mod admin;
pub mod audit;
pub mod capability;
pub mod clock;
pub mod config;
pub mod content;
pub mod directory;
pub mod entitlement;
pub mod error;
pub mod types;

use std::sync::Arc;

pub use admin::{AdminControls, PauseSwitch};
pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use capability::{Capability, CapabilityRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use content::{ContentDraft, ContentStore};
pub use directory::{CreatorDirectory, CreatorStats, InMemoryCreatorDirectory};
pub use entitlement::{EntitlementEngine, PlanDraft};
pub use error::{CoreError, Result};
pub use types::*;

/// The assembled core: both components plus admin controls, sharing one
/// capability registry, pause switch, audit log, clock, and creator
/// directory.
pub struct Platform {
    caps: Arc<CapabilityRegistry>,
    pause: Arc<PauseSwitch>,
    audit: Arc<AuditLog>,
    content: Arc<ContentStore>,
    entitlement: Arc<EntitlementEngine>,
    admin: AdminControls,
}

impl Platform {
    /// Assemble with the system clock and the in-memory creator directory.
    pub fn new(config: CoreConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(SystemClock),
            Arc::new(InMemoryCreatorDirectory::new()),
        )
    }

    /// Assemble with an explicit clock and creator directory, e.g. a
    /// simulated clock or a directory backed by the platform's creator
    /// service.
    pub fn with_parts(
        config: CoreConfig,
        clock: Arc<dyn Clock>,
        directory: Arc<dyn CreatorDirectory>,
    ) -> Self {
        let caps = Arc::new(CapabilityRegistry::new());
        let pause = Arc::new(PauseSwitch::new());
        let audit = Arc::new(AuditLog::new(config.max_audit_entries));

        let content = Arc::new(ContentStore::new(
            config.clone(),
            caps.clone(),
            directory.clone(),
            pause.clone(),
            audit.clone(),
            clock.clone(),
        ));
        let entitlement = Arc::new(EntitlementEngine::new(
            config,
            caps.clone(),
            directory,
            pause.clone(),
            audit.clone(),
            clock,
            content.clone(),
        ));
        let admin = AdminControls::new(
            caps.clone(),
            pause.clone(),
            audit.clone(),
            content.clone(),
            entitlement.clone(),
        );

        Self {
            caps,
            pause,
            audit,
            content,
            entitlement,
            admin,
        }
    }

    /// Capability registry shared by all components.
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.caps
    }

    /// Content registry.
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Entitlement engine.
    pub fn entitlement(&self) -> &EntitlementEngine {
        &self.entitlement
    }

    /// Administrative controls.
    pub fn admin(&self) -> &AdminControls {
        &self.admin
    }

    /// Audit trail.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Whether the system is administratively paused.
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }
}
