//! Error handling for session negotiation
//!
//! Every failure an endpoint can hit during negotiation surfaces through
//! [`SessionError`]; nothing is retried or swallowed inside the core.

use thiserror::Error;

use crate::types::NegotiationState;

/// Result type alias for negotiation operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Error type for session negotiation operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Local media acquisition failed; the endpoint stays usable only for
    /// another start attempt
    #[error("Media unavailable: {details}")]
    MediaUnavailable { details: String },

    /// Offer or answer could not be built
    #[error("Description unavailable: {details}")]
    DescriptionUnavailable { details: String },

    /// A description slot was already filled and no reset happened
    #[error("{which} description already set for endpoint {endpoint}")]
    DescriptionAlreadySet { endpoint: String, which: String },

    /// Pairing capacity (two endpoints) exceeded
    #[error("Session registry full: a pair is already registered")]
    RegistryFull,

    /// No counterpart registered for the endpoint
    #[error("Counterpart unreachable for endpoint {endpoint}")]
    CounterpartUnreachable { endpoint: String },

    /// Unknown endpoint id
    #[error("Endpoint not found: {endpoint}")]
    EndpointNotFound { endpoint: String },

    /// Operation attempted on an endpoint that already closed
    #[error("Endpoint closed: {endpoint}")]
    EndpointClosed { endpoint: String },

    /// State machine rejected the transition
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: NegotiationState,
        to: NegotiationState,
    },

    /// Operation not valid in the endpoint's current state
    #[error("Invalid state for {operation}: endpoint is {state}")]
    InvalidState {
        operation: String,
        state: NegotiationState,
    },
}

impl SessionError {
    /// Helper for media acquisition failures
    pub fn media_unavailable(details: impl Into<String>) -> Self {
        Self::MediaUnavailable {
            details: details.into(),
        }
    }

    /// Helper for description build failures
    pub fn description_unavailable(details: impl Into<String>) -> Self {
        Self::DescriptionUnavailable {
            details: details.into(),
        }
    }

    /// Helper for unknown endpoints
    pub fn endpoint_not_found(endpoint: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            endpoint: endpoint.into(),
        }
    }
}

impl From<peerlink_media_core::MediaError> for SessionError {
    fn from(err: peerlink_media_core::MediaError) -> Self {
        match err {
            peerlink_media_core::MediaError::MediaUnavailable { details } => {
                Self::MediaUnavailable { details }
            }
            other => Self::MediaUnavailable {
                details: other.to_string(),
            },
        }
    }
}
