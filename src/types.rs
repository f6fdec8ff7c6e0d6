//! Core types for the content registry and entitlement engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque principal identifier (wallet address, agent id, service account).
pub type Principal = String;

/// Sequential content identifier, assigned at registration and never reused.
pub type ContentId = u64;

/// Sequential subscription plan identifier.
pub type PlanId = u64;

/// Sequential access token identifier.
pub type TokenId = u64;

/// Content-derived fingerprint used to detect duplicate or leaked uploads.
///
/// Globally unique across the store: a second registration with the same
/// hash is rejected. Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash([u8; 32]);

impl PerceptualHash {
    /// Wrap a raw 32-byte fingerprint.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// An all-zero hash is invalid at registration time.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PerceptualHash({})", hex::encode(self.0))
    }
}

impl FromStr for PerceptualHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("invalid hex: {e}"))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "perceptual hash must be 32 bytes".to_string())?;
        Ok(Self(bytes))
    }
}

impl Serialize for PerceptualHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PerceptualHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Moderation lifecycle of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum ModerationStatus {
    /// Awaiting a moderator decision
    #[default]
    Pending,
    /// Cleared for sale and entitlement minting
    Approved,
    /// Soft-removed by a moderator decision
    Rejected,
    /// Reported or escalated for review
    Flagged,
}

impl ModerationStatus {
    /// Whether a moderator may move content from `self` to `to`.
    ///
    /// Self-transitions are never allowed here; `flag_content` is the one
    /// path that can re-enter `Flagged` from any state.
    pub fn can_transition_to(self, to: ModerationStatus) -> bool {
        use ModerationStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Rejected) | (Pending, Flagged) => true,
            (Approved, Rejected) | (Approved, Flagged) => true,
            (Rejected, Approved) | (Rejected, Flagged) => true,
            (Flagged, Approved) | (Flagged, Rejected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
            ModerationStatus::Flagged => "flagged",
        };
        write!(f, "{s}")
    }
}

/// Policy tag controlling whether the underlying media is deletable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum StorageClass {
    /// Media may be deleted on takedown
    Shreddable,
    /// Media is retained permanently
    Permanent,
}

impl TryFrom<u8> for StorageClass {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StorageClass::Shreddable),
            1 => Ok(StorageClass::Permanent),
            other => Err(other),
        }
    }
}

/// Kind of access grant.
///
/// The declaration order is the fixed resolution priority: when an owner
/// holds several grants for the same content, queries report the first
/// matching kind in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum AccessType {
    /// Pay-per-view: non-expiring, balance-style quantity
    Ppv,
    /// Time-bounded grant to all content of a plan's creator
    Subscription,
    /// Permanent grant to a single content item
    Lifetime,
    /// Time-bounded grant to a single content item, 30-day ceiling
    Rental,
}

impl AccessType {
    /// Resolution priority order for access queries.
    pub const RESOLUTION_ORDER: [AccessType; 4] = [
        AccessType::Ppv,
        AccessType::Subscription,
        AccessType::Lifetime,
        AccessType::Rental,
    ];
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessType::Ppv => "ppv",
            AccessType::Subscription => "subscription",
            AccessType::Lifetime => "lifetime",
            AccessType::Rental => "rental",
        };
        write!(f, "{s}")
    }
}

/// A registered content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Content {
    /// Sequential id, never reused
    pub id: ContentId,
    /// Owning creator; immutable after registration
    pub creator: Principal,
    /// Opaque pointer to off-core metadata storage
    pub meta_uri: String,
    /// Globally unique content fingerprint
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub perceptual_hash: PerceptualHash,
    /// Default pay-per-view price in USDC minor units
    pub price_usdc: u64,
    /// Media retention policy
    pub storage_class: StorageClass,
    /// Revenue-split destination identifier
    pub splitter: String,
    /// Region bitmask; 0 means globally available
    pub geo_mask: u64,
    /// Moderation lifecycle state
    pub moderation_status: ModerationStatus,
    /// Sum of all recorded sale amounts
    pub total_sales: u64,
    /// Monotonic view counter
    pub view_count: u64,
    /// 1..=10 non-empty tags once set; empty until tagged
    pub tags: Vec<String>,
    /// Registration time (epoch seconds)
    pub created_at: u64,
}

impl Content {
    /// Whether this content may be served in `region`.
    ///
    /// A zero mask means globally available; otherwise bit `region` must be
    /// set. Regions are numbered 0..=63.
    pub fn is_available_in_region(&self, region: u8) -> bool {
        if self.geo_mask == 0 {
            return true;
        }
        if region >= 64 {
            return false;
        }
        self.geo_mask & (1u64 << region) != 0
    }
}

/// A creator's subscription plan, gating access to all of their content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub creator: Principal,
    pub price_usdc: u64,
    /// Default subscription length in seconds
    pub duration_secs: u64,
    pub name: String,
    pub description: String,
    pub max_subscribers: u64,
    /// Occupied capacity; released only by explicit revocation
    pub current_subscribers: u64,
    pub active: bool,
    pub created_at: u64,
}

impl SubscriptionPlan {
    /// Whether the plan has no remaining capacity.
    pub fn is_full(&self) -> bool {
        self.current_subscribers >= self.max_subscribers
    }
}

/// A single access grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AccessToken {
    pub id: TokenId,
    /// Content id for PPV/Lifetime/Rental, plan id for Subscription
    pub subject_id: u64,
    pub access_type: AccessType,
    pub owner: Principal,
    /// Balance-style quantity; zeroed on revocation
    pub quantity: u64,
    /// 0 means the grant never expires
    pub expires_at: u64,
    pub active: bool,
    pub issued_at: u64,
}

impl AccessToken {
    /// A token with `expires_at == 0` never expires; otherwise it is
    /// expired once `now >= expires_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at != 0 && now >= self.expires_at
    }

    /// Whether this token grants anything at `now`: active, unexpired,
    /// with a positive balance.
    pub fn grants_at(&self, now: u64) -> bool {
        self.active && self.quantity > 0 && !self.is_expired(now)
    }
}

/// One page of a paginated id query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ContentPage {
    /// Ids on this page, in ascending id order
    pub ids: Vec<ContentId>,
    /// Total number of matching items across all pages
    pub total: usize,
}

/// Running mint counters, maintained incrementally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AccessStats {
    pub ppv: u64,
    pub subscription: u64,
    pub lifetime: u64,
    pub rental: u64,
}
