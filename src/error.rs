//! Error taxonomy for the registry and entitlement core.
//!
//! Every failure is terminal and synchronous: it reflects bad input or a
//! business-rule violation, never a transient fault, so nothing here is
//! retried internally. The calling workflow (payment settlement, moderation
//! console) translates these into user-visible messages and compensating
//! actions.

use crate::types::{ContentId, ModerationStatus, PlanId, TokenId};

/// Errors surfaced by the content registry and entitlement engine.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input: empty string, zero amount, oversized tag list.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced content, plan, or token does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Perceptual-hash collision on registration.
    #[error("content with perceptual hash {hash} is already registered")]
    DuplicateContent { hash: String },

    /// Caller lacks the required capability or registration status.
    #[error("{principal} is not authorized: requires {needed}")]
    Unauthorized { principal: String, needed: String },

    /// Moderation self-transition attempted.
    #[error("content {content_id} is already {status}")]
    AlreadyInStatus {
        content_id: ContentId,
        status: ModerationStatus,
    },

    /// Subscription plan at capacity.
    #[error("subscription plan {plan_id} is at capacity")]
    AlreadyFull { plan_id: PlanId },

    /// Revocation attempted by a non-owner.
    #[error("token {token_id} is not held by the given owner")]
    NotOwner { token_id: TokenId },

    /// Rental duration exceeds the ceiling.
    #[error("rental duration {requested}s exceeds the {max}s ceiling")]
    DurationTooLong { requested: u64, max: u64 },

    /// Mutating call while administratively paused.
    #[error("system is paused")]
    Paused,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Shorthand for a `NotFound` with a numeric id.
    pub(crate) fn not_found(kind: &'static str, id: u64) -> Self {
        CoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_identifiers() {
        let err = CoreError::not_found("content", 42);
        assert_eq!(err.to_string(), "content 42 not found");

        let err = CoreError::AlreadyFull { plan_id: 7 };
        assert!(err.to_string().contains('7'));

        let err = CoreError::DurationTooLong {
            requested: 100,
            max: 50,
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }
}
