//! Error types for the moderation engine
//!
//! This module defines the errors that can occur while applying, modifying, or
//! expiring reprimands.

use serenity::http::HttpError;
use thiserror::Error;
use uuid::Uuid;

use crate::moderation::ReprimandStatus;

/// Errors that can occur during moderation operations
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The member already has an active reprimand of this kind
    #[error("an active mute already exists for this member")]
    AlreadyActive,

    /// Reprimand record not found
    #[error("reprimand not found: {0}")]
    NotFound(Uuid),

    /// Invalid status transition attempted
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ReprimandStatus,
        to: ReprimandStatus,
    },

    /// The platform refused the action
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A trigger's cascade template names a kind with no registered handler
    #[error("no handler registered for reprimand kind: {0}")]
    UnknownTemplate(String),

    /// The history store could not be written
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Discord API error
    #[error("Discord API error: {0}")]
    Discord(#[from] Box<serenity::Error>),
}

impl ModerationError {
    /// Classify a Discord API error, mapping HTTP 403 responses onto the
    /// soft `PermissionDenied` variant.
    pub fn from_discord(error: serenity::Error) -> Self {
        if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref response)) = error {
            if response.status_code == serenity::http::StatusCode::FORBIDDEN {
                return Self::PermissionDenied(response.error.message.clone());
            }
        }

        Self::Discord(Box::new(error))
    }

    /// Whether the error aborts the request or is reported as a short reason
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::UnknownTemplate(_) | Self::Discord(_)
        )
    }
}

impl From<serenity::Error> for ModerationError {
    fn from(error: serenity::Error) -> Self {
        Self::from_discord(error)
    }
}

/// Result type for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;
