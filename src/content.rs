//! Content registry: records, deduplication, moderation, bookkeeping.
//!
//! Owns the authoritative content records, the perceptual-hash uniqueness
//! index, the moderation state machine, tagging, geo-restriction checks,
//! and sale/view counters. Validates registering principals against the
//! creator directory and pushes aggregate updates back to it.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::admin::PauseSwitch;
use crate::audit::{AuditAction, AuditLog};
use crate::capability::{Capability, CapabilityRegistry};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::directory::CreatorDirectory;
use crate::error::{CoreError, Result};
use crate::types::{
    Content, ContentId, ContentPage, ModerationStatus, PerceptualHash, Principal, StorageClass,
};

/// Input to content registration.
#[derive(Debug, Clone)]
pub struct ContentDraft {
    /// Registered creator the content belongs to
    pub creator: Principal,
    /// Pointer to off-core metadata; non-empty
    pub meta_uri: String,
    /// Content fingerprint; non-zero and globally unique
    pub perceptual_hash: PerceptualHash,
    /// Default pay-per-view price in USDC minor units
    pub price_usdc: u64,
    /// Media retention policy
    pub storage_class: StorageClass,
    /// Revenue-split destination; non-empty
    pub splitter: String,
    /// Region bitmask; 0 means globally available
    pub geo_mask: u64,
}

/// The content registry.
///
/// Thread-safe; per-record mutations serialize on the record's map entry,
/// aggregates live in atomics. Pagination scans take the insertion-order
/// list under a read lock so they never observe a partially-written record.
pub struct ContentStore {
    config: CoreConfig,
    caps: Arc<CapabilityRegistry>,
    directory: Arc<dyn CreatorDirectory>,
    pause: Arc<PauseSwitch>,
    audit: Arc<AuditLog>,
    clock: Arc<dyn Clock>,

    /// Content records keyed by id
    contents: DashMap<ContentId, Content>,
    /// Unique index: perceptual hash -> content id
    hash_index: DashMap<PerceptualHash, ContentId>,
    /// All ids in ascending order
    order: RwLock<Vec<ContentId>>,
    /// Secondary index: creator -> ids in ascending order
    creator_index: DashMap<Principal, Vec<ContentId>>,
    /// Secondary index: tag -> ids
    tag_index: DashMap<String, BTreeSet<ContentId>>,
    /// Next content id (ids start at 1)
    next_id: AtomicU64,

    /// Number of currently-approved contents
    total_approved: AtomicU64,
    /// Tally of flag events (moderator transitions into Flagged and reports)
    total_flagged: AtomicU64,
    /// Actions performed per moderator
    moderator_actions: DashMap<Principal, u64>,
}

impl ContentStore {
    /// Create an empty store wired to shared platform state.
    pub fn new(
        config: CoreConfig,
        caps: Arc<CapabilityRegistry>,
        directory: Arc<dyn CreatorDirectory>,
        pause: Arc<PauseSwitch>,
        audit: Arc<AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            caps,
            directory,
            pause,
            audit,
            clock,
            contents: DashMap::new(),
            hash_index: DashMap::new(),
            order: RwLock::new(Vec::new()),
            creator_index: DashMap::new(),
            tag_index: DashMap::new(),
            next_id: AtomicU64::new(1),
            total_approved: AtomicU64::new(0),
            total_flagged: AtomicU64::new(0),
            moderator_actions: DashMap::new(),
        }
    }

    /// Register a new content item and return its id.
    ///
    /// Publisher-only; the creator must be registered in the directory.
    /// Fails `DuplicateContent` on a perceptual-hash collision.
    pub fn register_content(&self, caller: &Principal, draft: ContentDraft) -> Result<ContentId> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Publisher)?;

        if !self.directory.is_registered(&draft.creator) {
            return Err(CoreError::Unauthorized {
                principal: draft.creator.clone(),
                needed: "creator registration".to_string(),
            });
        }
        if draft.meta_uri.is_empty() {
            return Err(CoreError::Validation("meta_uri must not be empty".into()));
        }
        if draft.splitter.is_empty() {
            return Err(CoreError::Validation("splitter must not be empty".into()));
        }
        if draft.perceptual_hash.is_zero() {
            return Err(CoreError::Validation(
                "perceptual hash must not be zero".into(),
            ));
        }

        // Claim the hash before allocating the id so two racing
        // registrations of the same fingerprint cannot both win.
        let id = match self.hash_index.entry(draft.perceptual_hash) {
            Entry::Occupied(_) => {
                return Err(CoreError::DuplicateContent {
                    hash: draft.perceptual_hash.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(id);
                id
            }
        };

        let content = Content {
            id,
            creator: draft.creator.clone(),
            meta_uri: draft.meta_uri,
            perceptual_hash: draft.perceptual_hash,
            price_usdc: draft.price_usdc,
            storage_class: draft.storage_class,
            splitter: draft.splitter,
            geo_mask: draft.geo_mask,
            moderation_status: ModerationStatus::Pending,
            total_sales: 0,
            view_count: 0,
            tags: Vec::new(),
            created_at: self.clock.now_secs(),
        };
        self.contents.insert(id, content);

        // Racing registrations can reach these appends in either order, so
        // insert at the id's sorted position to keep the scan lists ascending.
        {
            let mut order = self.order.write().expect("content order lock poisoned");
            let pos = order.binary_search(&id).unwrap_or_else(|p| p);
            order.insert(pos, id);
        }
        {
            let mut ids = self.creator_index.entry(draft.creator.clone()).or_default();
            let pos = ids.binary_search(&id).unwrap_or_else(|p| p);
            ids.insert(pos, id);
        }
        self.directory.increment_content_count(&draft.creator);

        info!(content_id = id, creator = %draft.creator, "content registered");
        Ok(id)
    }

    /// Apply a moderator decision to a content item's status.
    ///
    /// Moderator/admin only. Self-transitions fail `AlreadyInStatus`;
    /// transitions outside the state machine fail validation. A supplied
    /// reason additionally produces an audit entry.
    pub fn set_moderation_status(
        &self,
        caller: &Principal,
        content_id: ContentId,
        new_status: ModerationStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        self.pause.guard()?;
        self.caps
            .require_any(caller, &[Capability::Moderator, Capability::Admin])?;

        let old_status = {
            let mut content = self
                .contents
                .get_mut(&content_id)
                .ok_or_else(|| CoreError::not_found("content", content_id))?;

            let old = content.moderation_status;
            if old == new_status {
                return Err(CoreError::AlreadyInStatus {
                    content_id,
                    status: old,
                });
            }
            if !old.can_transition_to(new_status) {
                return Err(CoreError::Validation(format!(
                    "cannot transition content {content_id} from {old} to {new_status}"
                )));
            }
            content.moderation_status = new_status;
            old
        };

        self.apply_status_counters(old_status, new_status);
        *self.moderator_actions.entry(caller.clone()).or_insert(0) += 1;

        info!(
            content_id,
            moderator = %caller,
            from = %old_status,
            to = %new_status,
            "moderation status changed"
        );
        if let Some(reason) = reason {
            self.audit.record(
                caller,
                AuditAction::ModerationChange,
                format!("content:{content_id}"),
                Some(serde_json::json!({ "from": old_status, "to": new_status, "reason": reason })),
            );
        }
        Ok(())
    }

    /// User-report path: force content into `Flagged` from any state.
    ///
    /// Open to any caller and exempt from the self-transition check; a
    /// report on already-flagged content still counts.
    pub fn flag_content(&self, caller: &Principal, content_id: ContentId, reason: &str) -> Result<()> {
        self.pause.guard()?;
        if reason.is_empty() {
            return Err(CoreError::Validation("flag reason must not be empty".into()));
        }

        let old_status = {
            let mut content = self
                .contents
                .get_mut(&content_id)
                .ok_or_else(|| CoreError::not_found("content", content_id))?;
            let old = content.moderation_status;
            content.moderation_status = ModerationStatus::Flagged;
            old
        };

        if old_status == ModerationStatus::Approved {
            self.total_approved.fetch_sub(1, Ordering::SeqCst);
        }
        self.total_flagged.fetch_add(1, Ordering::SeqCst);

        info!(content_id, reporter = %caller, "content flagged");
        self.audit.record(
            caller,
            AuditAction::ContentFlag,
            format!("content:{content_id}"),
            Some(serde_json::json!({ "reason": reason, "previous": old_status })),
        );
        Ok(())
    }

    /// Record a confirmed sale against a content item.
    ///
    /// Additive; at-most-once delivery is the settlement workflow's job.
    pub fn record_sale(
        &self,
        caller: &Principal,
        content_id: ContentId,
        buyer: &Principal,
        amount: u64,
    ) -> Result<()> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Publisher)?;
        if amount == 0 {
            return Err(CoreError::Validation("sale amount must be positive".into()));
        }
        if buyer.is_empty() {
            return Err(CoreError::Validation("buyer must not be empty".into()));
        }

        let creator = {
            let mut content = self
                .contents
                .get_mut(&content_id)
                .ok_or_else(|| CoreError::not_found("content", content_id))?;
            content.total_sales += amount;
            content.creator.clone()
        };
        // Content first, then the creator aggregate: fixed order, no
        // distributed transaction across the two.
        self.directory.add_earnings(&creator, amount);

        debug!(content_id, buyer = %buyer, amount, "sale recorded");
        Ok(())
    }

    /// Increment a content item's view counter.
    pub fn increment_view_count(&self, caller: &Principal, content_id: ContentId) -> Result<()> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Publisher)?;

        let mut content = self
            .contents
            .get_mut(&content_id)
            .ok_or_else(|| CoreError::not_found("content", content_id))?;
        content.view_count += 1;
        Ok(())
    }

    /// Update metadata pointer and price. Creator or admin only; moderation
    /// state and sales are untouched.
    pub fn update_content(
        &self,
        caller: &Principal,
        content_id: ContentId,
        new_meta_uri: &str,
        new_price: u64,
    ) -> Result<()> {
        self.pause.guard()?;
        if new_meta_uri.is_empty() {
            return Err(CoreError::Validation("meta_uri must not be empty".into()));
        }

        let mut content = self
            .contents
            .get_mut(&content_id)
            .ok_or_else(|| CoreError::not_found("content", content_id))?;
        if content.creator != *caller && !self.caps.has(caller, Capability::Admin) {
            return Err(CoreError::Unauthorized {
                principal: caller.clone(),
                needed: "content creator or admin".to_string(),
            });
        }
        content.meta_uri = new_meta_uri.to_string();
        content.price_usdc = new_price;
        Ok(())
    }

    /// Replace a content item's tag set. Creator only; 1..=10 non-empty tags.
    pub fn set_content_tags(
        &self,
        caller: &Principal,
        content_id: ContentId,
        tags: Vec<String>,
    ) -> Result<()> {
        self.pause.guard()?;
        if tags.len() < self.config.min_tags || tags.len() > self.config.max_tags {
            return Err(CoreError::Validation(format!(
                "tag count must be between {} and {}",
                self.config.min_tags, self.config.max_tags
            )));
        }
        if tags.iter().any(String::is_empty) {
            return Err(CoreError::Validation("tags must not be empty".into()));
        }

        let old_tags = {
            let mut content = self
                .contents
                .get_mut(&content_id)
                .ok_or_else(|| CoreError::not_found("content", content_id))?;
            if content.creator != *caller {
                return Err(CoreError::Unauthorized {
                    principal: caller.clone(),
                    needed: "content creator".to_string(),
                });
            }
            std::mem::replace(&mut content.tags, tags.clone())
        };

        // Record guard is dropped; now reconcile the tag index.
        for tag in &old_tags {
            if let Some(mut set) = self.tag_index.get_mut(tag) {
                set.remove(&content_id);
            }
        }
        for tag in &tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(content_id);
        }

        debug!(content_id, tags = ?tags, "content tags replaced");
        Ok(())
    }

    /// Whether the content may be served in `region` (0..=63).
    pub fn is_available_in_region(&self, content_id: ContentId, region: u8) -> Result<bool> {
        let content = self
            .contents
            .get(&content_id)
            .ok_or_else(|| CoreError::not_found("content", content_id))?;
        Ok(content.is_available_in_region(region))
    }

    /// Point lookup.
    pub fn content(&self, content_id: ContentId) -> Result<Content> {
        self.contents
            .get(&content_id)
            .map(|c| c.clone())
            .ok_or_else(|| CoreError::not_found("content", content_id))
    }

    /// Page of content ids in a given moderation status, ascending id order.
    pub fn content_by_status(
        &self,
        status: ModerationStatus,
        offset: usize,
        limit: usize,
    ) -> ContentPage {
        let ids: Vec<ContentId> = {
            let order = self.order.read().expect("content order lock poisoned");
            order
                .iter()
                .copied()
                .filter(|id| {
                    self.contents
                        .get(id)
                        .map(|c| c.moderation_status == status)
                        .unwrap_or(false)
                })
                .collect()
        };
        paginate(&ids, offset, limit)
    }

    /// Page of content ids carrying a tag, ascending id order.
    pub fn content_by_tag(&self, tag: &str, offset: usize, limit: usize) -> ContentPage {
        let ids: Vec<ContentId> = self
            .tag_index
            .get(tag)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        paginate(&ids, offset, limit)
    }

    /// Page of a creator's content ids, ascending id order.
    pub fn creator_content(&self, creator: &Principal, offset: usize, limit: usize) -> ContentPage {
        let ids: Vec<ContentId> = self
            .creator_index
            .get(creator)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        paginate(&ids, offset, limit)
    }

    /// `(currently approved, flag events)` aggregates.
    pub fn moderation_totals(&self) -> (u64, u64) {
        (
            self.total_approved.load(Ordering::SeqCst),
            self.total_flagged.load(Ordering::SeqCst),
        )
    }

    /// Number of moderation actions performed by a moderator.
    pub fn moderation_actions(&self, moderator: &Principal) -> u64 {
        self.moderator_actions
            .get(moderator)
            .map(|n| *n)
            .unwrap_or(0)
    }

    /// Admin takedown: force `Rejected` regardless of the current state and
    /// the transition rules. Called by [`crate::admin::AdminControls`],
    /// which gates and audits it; deliberately skips the pause guard.
    pub(crate) fn force_reject(&self, content_id: ContentId) -> Result<()> {
        let old_status = {
            let mut content = self
                .contents
                .get_mut(&content_id)
                .ok_or_else(|| CoreError::not_found("content", content_id))?;
            std::mem::replace(&mut content.moderation_status, ModerationStatus::Rejected)
        };
        if old_status == ModerationStatus::Approved {
            self.total_approved.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn apply_status_counters(&self, from: ModerationStatus, to: ModerationStatus) {
        if from == ModerationStatus::Approved {
            self.total_approved.fetch_sub(1, Ordering::SeqCst);
        }
        if to == ModerationStatus::Approved {
            self.total_approved.fetch_add(1, Ordering::SeqCst);
        }
        if to == ModerationStatus::Flagged {
            self.total_flagged.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Clamp a page out of `ids`, never failing: offsets past the end yield an
/// empty page with the correct total.
fn paginate(ids: &[ContentId], offset: usize, limit: usize) -> ContentPage {
    let total = ids.len();
    let start = offset.min(total);
    let end = start.saturating_add(limit).min(total);
    ContentPage {
        ids: ids[start..end].to_vec(),
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::directory::InMemoryCreatorDirectory;

    struct Fixture {
        store: ContentStore,
        directory: Arc<InMemoryCreatorDirectory>,
        pause: Arc<PauseSwitch>,
    }

    const ADMIN: &str = "admin";
    const PUBLISHER: &str = "publisher-svc";
    const MODERATOR: &str = "moderator-1";
    const ALICE: &str = "alice";

    fn fixture() -> Fixture {
        let caps = Arc::new(CapabilityRegistry::new());
        caps.bootstrap_admin(&ADMIN.to_string());
        caps.grant(&ADMIN.into(), &PUBLISHER.into(), Capability::Publisher)
            .unwrap();
        caps.grant(&ADMIN.into(), &MODERATOR.into(), Capability::Moderator)
            .unwrap();

        let directory = Arc::new(InMemoryCreatorDirectory::new());
        directory.register(&ALICE.to_string());

        let pause = Arc::new(PauseSwitch::new());
        let store = ContentStore::new(
            CoreConfig::default(),
            caps,
            directory.clone(),
            pause.clone(),
            Arc::new(AuditLog::new(100)),
            Arc::new(ManualClock::new(1_000)),
        );
        Fixture {
            store,
            directory,
            pause,
        }
    }

    fn draft(hash_byte: u8) -> ContentDraft {
        ContentDraft {
            creator: ALICE.to_string(),
            meta_uri: "ipfs://meta".to_string(),
            perceptual_hash: PerceptualHash::from_bytes([hash_byte; 32]),
            price_usdc: 5_000_000,
            storage_class: StorageClass::Shreddable,
            splitter: "splitter-1".to_string(),
            geo_mask: 0,
        }
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let fx = fixture();
        let caller = PUBLISHER.to_string();

        let a = fx.store.register_content(&caller, draft(1)).unwrap();
        let b = fx.store.register_content(&caller, draft(2)).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        let content = fx.store.content(a).unwrap();
        assert_eq!(content.moderation_status, ModerationStatus::Pending);
        assert_eq!(content.created_at, 1_000);
        assert_eq!(
            fx.directory.stats(&ALICE.to_string()).unwrap().content_count,
            2
        );
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let fx = fixture();
        let caller = PUBLISHER.to_string();

        fx.store.register_content(&caller, draft(9)).unwrap();
        let err = fx.store.register_content(&caller, draft(9)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateContent { .. }));
    }

    #[test]
    fn test_register_validation() {
        let fx = fixture();
        let caller = PUBLISHER.to_string();

        let mut bad = draft(3);
        bad.meta_uri = String::new();
        assert!(matches!(
            fx.store.register_content(&caller, bad).unwrap_err(),
            CoreError::Validation(_)
        ));

        let mut bad = draft(3);
        bad.splitter = String::new();
        assert!(matches!(
            fx.store.register_content(&caller, bad).unwrap_err(),
            CoreError::Validation(_)
        ));

        let mut bad = draft(3);
        bad.perceptual_hash = PerceptualHash::from_bytes([0; 32]);
        assert!(matches!(
            fx.store.register_content(&caller, bad).unwrap_err(),
            CoreError::Validation(_)
        ));

        let mut bad = draft(3);
        bad.creator = "unknown".to_string();
        assert!(matches!(
            fx.store.register_content(&caller, bad).unwrap_err(),
            CoreError::Unauthorized { .. }
        ));
    }

    #[test]
    fn test_register_requires_publisher() {
        let fx = fixture();
        let err = fx
            .store
            .register_content(&"random".to_string(), draft(4))
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized { .. }));
    }

    #[test]
    fn test_moderation_transitions_and_counters() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let moderator = MODERATOR.to_string();
        let id = fx.store.register_content(&publisher, draft(5)).unwrap();

        fx.store
            .set_moderation_status(&moderator, id, ModerationStatus::Approved, None)
            .unwrap();
        assert_eq!(fx.store.moderation_totals(), (1, 0));

        // Self-transition rejected
        let err = fx
            .store
            .set_moderation_status(&moderator, id, ModerationStatus::Approved, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyInStatus { .. }));

        // Approved -> Pending is not in the state machine
        let err = fx
            .store
            .set_moderation_status(&moderator, id, ModerationStatus::Pending, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        fx.store
            .set_moderation_status(&moderator, id, ModerationStatus::Rejected, Some("dmca"))
            .unwrap();
        assert_eq!(fx.store.moderation_totals(), (0, 0));
        assert_eq!(fx.store.moderation_actions(&moderator), 2);
    }

    #[test]
    fn test_flag_bypasses_self_transition_check() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let reporter = "viewer-1".to_string();
        let id = fx.store.register_content(&publisher, draft(6)).unwrap();

        fx.store.flag_content(&reporter, id, "stolen").unwrap();
        assert_eq!(
            fx.store.content(id).unwrap().moderation_status,
            ModerationStatus::Flagged
        );

        // Re-flagging already-flagged content still counts
        fx.store.flag_content(&reporter, id, "stolen again").unwrap();
        assert_eq!(fx.store.moderation_totals().1, 2);
    }

    #[test]
    fn test_record_sale_accumulates() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let id = fx.store.register_content(&publisher, draft(7)).unwrap();

        fx.store
            .record_sale(&publisher, id, &"buyer1".to_string(), 10_000_000)
            .unwrap();
        fx.store
            .record_sale(&publisher, id, &"buyer2".to_string(), 5_000_000)
            .unwrap();

        assert_eq!(fx.store.content(id).unwrap().total_sales, 15_000_000);
        assert_eq!(
            fx.directory
                .stats(&ALICE.to_string())
                .unwrap()
                .total_earnings,
            15_000_000
        );

        assert!(matches!(
            fx.store
                .record_sale(&publisher, id, &"buyer".to_string(), 0)
                .unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn test_view_counter() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let id = fx.store.register_content(&publisher, draft(8)).unwrap();

        fx.store.increment_view_count(&publisher, id).unwrap();
        fx.store.increment_view_count(&publisher, id).unwrap();
        assert_eq!(fx.store.content(id).unwrap().view_count, 2);
    }

    #[test]
    fn test_update_content_authorization() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let id = fx.store.register_content(&publisher, draft(10)).unwrap();

        // Creator may update
        fx.store
            .update_content(&ALICE.to_string(), id, "ipfs://v2", 9_000_000)
            .unwrap();
        let content = fx.store.content(id).unwrap();
        assert_eq!(content.meta_uri, "ipfs://v2");
        assert_eq!(content.price_usdc, 9_000_000);

        // Admin may update
        fx.store
            .update_content(&ADMIN.to_string(), id, "ipfs://v3", 1)
            .unwrap();

        // Anyone else may not
        assert!(matches!(
            fx.store
                .update_content(&"stranger".to_string(), id, "ipfs://v4", 1)
                .unwrap_err(),
            CoreError::Unauthorized { .. }
        ));
    }

    #[test]
    fn test_tags_validation_and_query() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let alice = ALICE.to_string();
        let id = fx.store.register_content(&publisher, draft(11)).unwrap();

        assert!(matches!(
            fx.store.set_content_tags(&alice, id, vec![]).unwrap_err(),
            CoreError::Validation(_)
        ));
        let too_many: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
        assert!(matches!(
            fx.store.set_content_tags(&alice, id, too_many).unwrap_err(),
            CoreError::Validation(_)
        ));
        assert!(matches!(
            fx.store
                .set_content_tags(&alice, id, vec!["ok".into(), String::new()])
                .unwrap_err(),
            CoreError::Validation(_)
        ));

        fx.store
            .set_content_tags(&alice, id, vec!["fitness".into(), "yoga".into()])
            .unwrap();
        assert_eq!(fx.store.content_by_tag("fitness", 0, 10).ids, vec![id]);

        // Replacing the set drops stale index entries
        fx.store
            .set_content_tags(&alice, id, vec!["dance".into()])
            .unwrap();
        assert!(fx.store.content_by_tag("fitness", 0, 10).ids.is_empty());
        assert_eq!(fx.store.content_by_tag("dance", 0, 10).ids, vec![id]);
    }

    #[test]
    fn test_pagination_edges() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let alice = ALICE.to_string();
        for i in 0..5 {
            fx.store.register_content(&publisher, draft(20 + i)).unwrap();
        }

        let page = fx.store.creator_content(&alice, 5, 3);
        assert!(page.ids.is_empty());
        assert_eq!(page.total, 5);

        let page = fx.store.creator_content(&alice, 3, 5);
        assert_eq!(page.ids, vec![4, 5]);
        assert_eq!(page.total, 5);

        let page = fx.store.creator_content(&alice, 0, 2);
        assert_eq!(page.ids, vec![1, 2]);
    }

    #[test]
    fn test_status_query() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let moderator = MODERATOR.to_string();
        let a = fx.store.register_content(&publisher, draft(30)).unwrap();
        let b = fx.store.register_content(&publisher, draft(31)).unwrap();
        fx.store.register_content(&publisher, draft(32)).unwrap();

        fx.store
            .set_moderation_status(&moderator, a, ModerationStatus::Approved, None)
            .unwrap();
        fx.store
            .set_moderation_status(&moderator, b, ModerationStatus::Approved, None)
            .unwrap();

        let page = fx.store.content_by_status(ModerationStatus::Approved, 0, 10);
        assert_eq!(page.ids, vec![a, b]);
        assert_eq!(page.total, 2);

        let page = fx.store.content_by_status(ModerationStatus::Pending, 0, 10);
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_region_availability() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let mut restricted = draft(40);
        restricted.geo_mask = (1 << 1) | (1 << 2);
        let id = fx.store.register_content(&publisher, restricted).unwrap();

        assert!(fx.store.is_available_in_region(id, 1).unwrap());
        assert!(fx.store.is_available_in_region(id, 2).unwrap());
        assert!(!fx.store.is_available_in_region(id, 3).unwrap());
        assert!(matches!(
            fx.store.is_available_in_region(999, 1).unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }

    #[test]
    fn test_concurrent_registration_keeps_ascending_order() {
        let fx = fixture();
        let store = Arc::new(fx.store);

        let mut handles = Vec::new();
        for t in 0..4u8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                let caller = PUBLISHER.to_string();
                for i in 0..8u8 {
                    store.register_content(&caller, draft(t * 8 + i + 1)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let page = store.creator_content(&ALICE.to_string(), 0, 100);
        assert_eq!(page.total, 32);
        assert!(page.ids.windows(2).all(|w| w[0] < w[1]));

        let page = store.content_by_status(ModerationStatus::Pending, 0, 100);
        assert_eq!(page.total, 32);
        assert!(page.ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_pause_blocks_mutations_not_reads() {
        let fx = fixture();
        let publisher = PUBLISHER.to_string();
        let id = fx.store.register_content(&publisher, draft(50)).unwrap();

        fx.pause.engage();
        assert!(matches!(
            fx.store.register_content(&publisher, draft(51)).unwrap_err(),
            CoreError::Paused
        ));
        assert!(matches!(
            fx.store
                .record_sale(&publisher, id, &"b".to_string(), 1)
                .unwrap_err(),
            CoreError::Paused
        ));
        assert!(matches!(
            fx.store
                .flag_content(&"viewer".to_string(), id, "r")
                .unwrap_err(),
            CoreError::Paused
        ));

        // Reads still work
        assert!(fx.store.content(id).is_ok());
        assert_eq!(fx.store.creator_content(&ALICE.to_string(), 0, 10).total, 1);

        fx.pause.lift();
        assert!(fx.store.register_content(&publisher, draft(51)).is_ok());
    }
}
