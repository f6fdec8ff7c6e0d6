//! Entitlement engine: grant issuance, expiry, revocation, resolution.
//!
//! Owns access-token and subscription-plan records. Four grant kinds with
//! distinct expiry and capacity rules:
//!
//! - **PPV**: non-expiring, balance-style quantity
//! - **Subscription**: time-bounded, plan-scoped, capacity-limited; grants
//!   access to all content of the plan's creator
//! - **Lifetime**: non-expiring, content-scoped
//! - **Rental**: time-bounded with a 30-day ceiling, extensible
//!
//! Access queries resolve in the fixed priority order
//! PPV → Subscription → Lifetime → Rental.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::admin::PauseSwitch;
use crate::audit::{AuditAction, AuditLog};
use crate::capability::{Capability, CapabilityRegistry};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::content::ContentStore;
use crate::directory::CreatorDirectory;
use crate::error::{CoreError, Result};
use crate::types::{
    AccessStats, AccessToken, AccessType, ContentId, PlanId, Principal, SubscriptionPlan, TokenId,
};

/// Input to subscription plan creation.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub price_usdc: u64,
    /// Default subscription length in seconds
    pub duration_secs: u64,
    pub name: String,
    pub description: String,
    pub max_subscribers: u64,
}

/// The entitlement engine.
///
/// Holds a read-only reference to the content store for existence checks
/// and creator resolution. Plan capacity is checked and claimed under the
/// plan's map entry, so racing subscription mints cannot oversubscribe.
pub struct EntitlementEngine {
    config: CoreConfig,
    caps: Arc<CapabilityRegistry>,
    directory: Arc<dyn CreatorDirectory>,
    pause: Arc<PauseSwitch>,
    audit: Arc<AuditLog>,
    clock: Arc<dyn Clock>,
    content: Arc<ContentStore>,

    /// Plan records keyed by id
    plans: DashMap<PlanId, SubscriptionPlan>,
    /// Secondary index: creator -> plan ids
    plan_index: DashMap<Principal, Vec<PlanId>>,
    /// Token records keyed by id
    tokens: DashMap<TokenId, AccessToken>,
    /// Secondary index: owner -> token ids
    owner_index: DashMap<Principal, Vec<TokenId>>,
    next_plan_id: AtomicU64,
    next_token_id: AtomicU64,

    ppv_minted: AtomicU64,
    subscriptions_minted: AtomicU64,
    lifetimes_minted: AtomicU64,
    rentals_minted: AtomicU64,
}

impl EntitlementEngine {
    /// Create an empty engine wired to shared platform state.
    pub fn new(
        config: CoreConfig,
        caps: Arc<CapabilityRegistry>,
        directory: Arc<dyn CreatorDirectory>,
        pause: Arc<PauseSwitch>,
        audit: Arc<AuditLog>,
        clock: Arc<dyn Clock>,
        content: Arc<ContentStore>,
    ) -> Self {
        Self {
            config,
            caps,
            directory,
            pause,
            audit,
            clock,
            content,
            plans: DashMap::new(),
            plan_index: DashMap::new(),
            tokens: DashMap::new(),
            owner_index: DashMap::new(),
            next_plan_id: AtomicU64::new(1),
            next_token_id: AtomicU64::new(1),
            ppv_minted: AtomicU64::new(0),
            subscriptions_minted: AtomicU64::new(0),
            lifetimes_minted: AtomicU64::new(0),
            rentals_minted: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Subscription plans
    // ------------------------------------------------------------------

    /// Create a subscription plan. The caller must be a registered creator.
    pub fn create_subscription_plan(&self, creator: &Principal, draft: PlanDraft) -> Result<PlanId> {
        self.pause.guard()?;
        if !self.directory.is_registered(creator) {
            return Err(CoreError::Unauthorized {
                principal: creator.clone(),
                needed: "creator registration".to_string(),
            });
        }
        if draft.name.is_empty() {
            return Err(CoreError::Validation("plan name must not be empty".into()));
        }
        if draft.price_usdc == 0 {
            return Err(CoreError::Validation("plan price must be positive".into()));
        }
        if draft.duration_secs == 0 {
            return Err(CoreError::Validation(
                "plan duration must be positive".into(),
            ));
        }
        if draft.max_subscribers == 0 {
            return Err(CoreError::Validation(
                "plan capacity must be positive".into(),
            ));
        }

        let id = self.next_plan_id.fetch_add(1, Ordering::SeqCst);
        let plan = SubscriptionPlan {
            id,
            creator: creator.clone(),
            price_usdc: draft.price_usdc,
            duration_secs: draft.duration_secs,
            name: draft.name,
            description: draft.description,
            max_subscribers: draft.max_subscribers,
            current_subscribers: 0,
            active: true,
            created_at: self.clock.now_secs(),
        };
        self.plans.insert(id, plan);
        self.plan_index
            .entry(creator.clone())
            .or_default()
            .push(id);

        info!(plan_id = id, creator = %creator, "subscription plan created");
        Ok(id)
    }

    /// Update a plan's price, duration, or active flag. Creator only.
    pub fn update_plan(
        &self,
        caller: &Principal,
        plan_id: PlanId,
        price_usdc: Option<u64>,
        duration_secs: Option<u64>,
        active: Option<bool>,
    ) -> Result<()> {
        self.pause.guard()?;

        let mut plan = self
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| CoreError::not_found("plan", plan_id))?;
        if plan.creator != *caller {
            return Err(CoreError::Unauthorized {
                principal: caller.clone(),
                needed: "plan creator".to_string(),
            });
        }
        if let Some(price) = price_usdc {
            if price == 0 {
                return Err(CoreError::Validation("plan price must be positive".into()));
            }
            plan.price_usdc = price;
        }
        if let Some(duration) = duration_secs {
            if duration == 0 {
                return Err(CoreError::Validation(
                    "plan duration must be positive".into(),
                ));
            }
            plan.duration_secs = duration;
        }
        if let Some(active) = active {
            plan.active = active;
        }
        Ok(())
    }

    /// Point lookup.
    pub fn plan(&self, plan_id: PlanId) -> Result<SubscriptionPlan> {
        self.plans
            .get(&plan_id)
            .map(|p| p.clone())
            .ok_or_else(|| CoreError::not_found("plan", plan_id))
    }

    /// All plans belonging to a creator.
    pub fn creator_plans(&self, creator: &Principal) -> Vec<SubscriptionPlan> {
        let ids: Vec<PlanId> = self
            .plan_index
            .get(creator)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.plans.get(id).map(|p| p.clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Minting
    // ------------------------------------------------------------------

    /// Mint a pay-per-view grant: non-expiring, quantity-bearing.
    pub fn mint_ppv(
        &self,
        caller: &Principal,
        owner: &Principal,
        content_id: ContentId,
        quantity: u64,
    ) -> Result<TokenId> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Minter)?;
        self.content.content(content_id)?;
        if quantity == 0 {
            return Err(CoreError::Validation("quantity must be positive".into()));
        }

        let id = self.insert_token(owner, content_id, AccessType::Ppv, quantity, 0);
        self.ppv_minted.fetch_add(1, Ordering::SeqCst);
        info!(token_id = id, owner = %owner, content_id, quantity, "ppv minted");
        Ok(id)
    }

    /// Mint a subscription to a plan, claiming one capacity slot.
    ///
    /// The slot stays occupied after expiry until the token is explicitly
    /// revoked.
    pub fn mint_subscription(
        &self,
        caller: &Principal,
        owner: &Principal,
        plan_id: PlanId,
        duration_secs: u64,
    ) -> Result<TokenId> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Minter)?;
        if duration_secs == 0 {
            return Err(CoreError::Validation("duration must be positive".into()));
        }
        // Computed before the capacity claim so an overflowing duration
        // cannot leave an occupied slot behind.
        let expires_at = checked_expiry(self.clock.now_secs(), duration_secs)?;

        // Capacity check and claim under the plan's entry lock.
        {
            let mut plan = self
                .plans
                .get_mut(&plan_id)
                .ok_or_else(|| CoreError::not_found("plan", plan_id))?;
            if !plan.active {
                return Err(CoreError::Validation(format!(
                    "plan {plan_id} is not active"
                )));
            }
            if plan.is_full() {
                return Err(CoreError::AlreadyFull { plan_id });
            }
            plan.current_subscribers += 1;
        }

        let id = self.insert_token(owner, plan_id, AccessType::Subscription, 1, expires_at);
        self.subscriptions_minted.fetch_add(1, Ordering::SeqCst);
        info!(token_id = id, owner = %owner, plan_id, expires_at, "subscription minted");
        Ok(id)
    }

    /// Mint a lifetime grant: content-scoped, never expires.
    pub fn mint_lifetime(
        &self,
        caller: &Principal,
        owner: &Principal,
        content_id: ContentId,
    ) -> Result<TokenId> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Minter)?;
        self.content.content(content_id)?;

        let id = self.insert_token(owner, content_id, AccessType::Lifetime, 1, 0);
        self.lifetimes_minted.fetch_add(1, Ordering::SeqCst);
        info!(token_id = id, owner = %owner, content_id, "lifetime minted");
        Ok(id)
    }

    /// Mint a rental grant, bounded by the configured duration ceiling.
    pub fn mint_rental(
        &self,
        caller: &Principal,
        owner: &Principal,
        content_id: ContentId,
        duration_secs: u64,
    ) -> Result<TokenId> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Minter)?;
        self.content.content(content_id)?;
        if duration_secs == 0 {
            return Err(CoreError::Validation("duration must be positive".into()));
        }
        if duration_secs > self.config.max_rental_secs {
            return Err(CoreError::DurationTooLong {
                requested: duration_secs,
                max: self.config.max_rental_secs,
            });
        }

        let expires_at = checked_expiry(self.clock.now_secs(), duration_secs)?;
        let id = self.insert_token(owner, content_id, AccessType::Rental, 1, expires_at);
        self.rentals_minted.fetch_add(1, Ordering::SeqCst);
        info!(token_id = id, owner = %owner, content_id, expires_at, "rental minted");
        Ok(id)
    }

    /// Extend the owner's active rental for a content item.
    ///
    /// The extension is added to the token's `expires_at`, not to the
    /// current time, so stacking preserves remaining time.
    pub fn extend_rental(
        &self,
        caller: &Principal,
        owner: &Principal,
        content_id: ContentId,
        additional_secs: u64,
    ) -> Result<()> {
        self.pause.guard()?;
        self.caps.require(caller, Capability::Minter)?;
        if additional_secs == 0 {
            return Err(CoreError::Validation("duration must be positive".into()));
        }

        let token_ids: Vec<TokenId> = self
            .owner_index
            .get(owner)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        for token_id in token_ids {
            if let Some(mut token) = self.tokens.get_mut(&token_id) {
                if token.access_type == AccessType::Rental
                    && token.subject_id == content_id
                    && token.active
                {
                    token.expires_at = checked_expiry(token.expires_at, additional_secs)?;
                    debug!(
                        token_id,
                        owner = %owner,
                        expires_at = token.expires_at,
                        "rental extended"
                    );
                    return Ok(());
                }
            }
        }
        Err(CoreError::NotFound {
            kind: "rental",
            id: format!("{owner}/{content_id}"),
        })
    }

    // ------------------------------------------------------------------
    // Revocation
    // ------------------------------------------------------------------

    /// Revoke a grant. Burner/admin only; the token must be held by `owner`.
    ///
    /// Deactivates the token and zeroes its balance; a subscription token
    /// releases its plan capacity slot exactly once.
    pub fn revoke_access(
        &self,
        caller: &Principal,
        owner: &Principal,
        token_id: TokenId,
    ) -> Result<()> {
        self.pause.guard()?;
        self.caps
            .require_any(caller, &[Capability::Burner, Capability::Admin])?;

        let released_plan = {
            let mut token = self
                .tokens
                .get_mut(&token_id)
                .ok_or_else(|| CoreError::not_found("token", token_id))?;
            if token.owner != *owner {
                return Err(CoreError::NotOwner { token_id });
            }
            if !token.active {
                return Err(CoreError::Validation(format!(
                    "token {token_id} is already revoked"
                )));
            }
            token.active = false;
            token.quantity = 0;
            (token.access_type == AccessType::Subscription).then_some(token.subject_id)
        };

        if let Some(plan_id) = released_plan {
            self.release_plan_slot(plan_id);
        }

        info!(token_id, owner = %owner, revoker = %caller, "access revoked");
        self.audit.record(
            caller,
            AuditAction::AccessRevoke,
            format!("token:{token_id}"),
            None,
        );
        Ok(())
    }

    /// Admin force-burn: no ownership validation, no pause guard. Called by
    /// [`crate::admin::AdminControls`], which gates and audits it.
    ///
    /// Burns up to `quantity` units; the token is deactivated when its
    /// balance reaches zero.
    pub(crate) fn force_burn(&self, token_id: TokenId, quantity: u64) -> Result<()> {
        if quantity == 0 {
            return Err(CoreError::Validation("burn quantity must be positive".into()));
        }
        let released_plan = {
            let mut token = self
                .tokens
                .get_mut(&token_id)
                .ok_or_else(|| CoreError::not_found("token", token_id))?;
            token.quantity = token.quantity.saturating_sub(quantity);
            if token.quantity == 0 && token.active {
                token.active = false;
                (token.access_type == AccessType::Subscription).then_some(token.subject_id)
            } else {
                None
            }
        };

        if let Some(plan_id) = released_plan {
            self.release_plan_slot(plan_id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve the kind of access an owner holds for a content item.
    ///
    /// Examines active, unexpired tokens in the fixed priority order
    /// PPV → Subscription → Lifetime → Rental and returns the first match,
    /// not the most recent or most specific. `None` for no access or for
    /// unknown content.
    pub fn access_type(&self, owner: &Principal, content_id: ContentId) -> Option<AccessType> {
        let now = self.clock.now_secs();
        let content_creator = self.content.content(content_id).ok()?.creator;

        let token_ids: Vec<TokenId> = self
            .owner_index
            .get(owner)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        let mut held = [false; 4];
        for token_id in &token_ids {
            let Some(token) = self.tokens.get(token_id) else {
                continue;
            };
            if !token.grants_at(now) {
                continue;
            }
            let matches = match token.access_type {
                AccessType::Ppv | AccessType::Lifetime | AccessType::Rental => {
                    token.subject_id == content_id
                }
                AccessType::Subscription => self
                    .plans
                    .get(&token.subject_id)
                    .map(|plan| plan.creator == content_creator)
                    .unwrap_or(false),
            };
            if matches {
                let slot = AccessType::RESOLUTION_ORDER
                    .iter()
                    .position(|t| *t == token.access_type)
                    .unwrap_or(0);
                held[slot] = true;
            }
        }

        AccessType::RESOLUTION_ORDER
            .iter()
            .enumerate()
            .find(|(i, _)| held[*i])
            .map(|(_, t)| *t)
    }

    /// Whether the owner holds any active, unexpired grant for the content.
    pub fn has_access(&self, owner: &Principal, content_id: ContentId) -> bool {
        self.access_type(owner, content_id).is_some()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Point lookup.
    pub fn token(&self, token_id: TokenId) -> Result<AccessToken> {
        self.tokens
            .get(&token_id)
            .map(|t| t.clone())
            .ok_or_else(|| CoreError::not_found("token", token_id))
    }

    /// All token records held by a principal, including inactive ones.
    pub fn tokens_of(&self, owner: &Principal) -> Vec<AccessToken> {
        let ids: Vec<TokenId> = self
            .owner_index
            .get(owner)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        ids.iter()
            .filter_map(|id| self.tokens.get(id).map(|t| t.clone()))
            .collect()
    }

    /// Running mint counters.
    pub fn access_stats(&self) -> AccessStats {
        AccessStats {
            ppv: self.ppv_minted.load(Ordering::SeqCst),
            subscription: self.subscriptions_minted.load(Ordering::SeqCst),
            lifetime: self.lifetimes_minted.load(Ordering::SeqCst),
            rental: self.rentals_minted.load(Ordering::SeqCst),
        }
    }

    fn insert_token(
        &self,
        owner: &Principal,
        subject_id: u64,
        access_type: AccessType,
        quantity: u64,
        expires_at: u64,
    ) -> TokenId {
        let id = self.next_token_id.fetch_add(1, Ordering::SeqCst);
        let token = AccessToken {
            id,
            subject_id,
            access_type,
            owner: owner.clone(),
            quantity,
            expires_at,
            active: true,
            issued_at: self.clock.now_secs(),
        };
        self.tokens.insert(id, token);
        self.owner_index.entry(owner.clone()).or_default().push(id);
        id
    }

    fn release_plan_slot(&self, plan_id: PlanId) {
        if let Some(mut plan) = self.plans.get_mut(&plan_id) {
            plan.current_subscribers = plan.current_subscribers.saturating_sub(1);
            debug!(
                plan_id,
                current_subscribers = plan.current_subscribers,
                "plan capacity released"
            );
        }
    }
}

/// Expiry timestamp for `base + duration`, rejecting durations that would
/// overflow the epoch-second range instead of wrapping.
fn checked_expiry(base: u64, duration_secs: u64) -> Result<u64> {
    base.checked_add(duration_secs)
        .ok_or_else(|| CoreError::Validation("duration overflows the expiry timestamp".into()))
}
