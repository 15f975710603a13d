//! Core negotiation types
//!
//! Identity, role, lifecycle state, and the two wire-visible values
//! (session descriptions and connectivity candidates).

use serde::{Deserialize, Serialize};

/// Endpoint ID type
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EndpointId(pub String);

impl EndpointId {
    pub fn new() -> Self {
        Self(format!("endpoint-{}", uuid::Uuid::new_v4()))
    }

    /// Create from an existing string id
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which half of the offer/answer exchange an endpoint drives
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum EndpointRole {
    /// Proposes the session (builds the offer)
    Initiator,

    /// Confirms the session (builds the answer)
    Responder,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiator => write!(f, "initiator"),
            Self::Responder => write!(f, "responder"),
        }
    }
}

/// Negotiation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationState {
    /// Created, local media not yet acquired
    Idle,

    /// Local media acquired, ready to call or be called
    LocalReady,

    /// Offer sent, waiting for the answer (initiator only)
    Offering,

    /// Offer received, answer being built (responder only)
    AnsweringPending,

    /// Both descriptions in flight or applied, candidates still exchanging
    Negotiating,

    /// Descriptions applied on both sides and a viable candidate applied
    Connected,

    /// Negotiation failed; terminal, requires a fresh endpoint
    Failed,

    /// Hung up; terminal
    Closed,
}

impl NegotiationState {
    /// True for states no transition leaves
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Whether the state machine permits `self -> next`.
    ///
    /// Closing and failing are reachable from every non-terminal state;
    /// `Connected -> Negotiating` covers renegotiation after an explicit
    /// description reset.
    pub fn can_transition_to(&self, next: NegotiationState) -> bool {
        use NegotiationState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Closed || next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Idle, LocalReady)
                | (LocalReady, Offering)
                | (LocalReady, AnsweringPending)
                | (Offering, Negotiating)
                | (AnsweringPending, Negotiating)
                | (Negotiating, Connected)
                | (Connected, Negotiating)
        )
    }
}

impl std::fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LocalReady => write!(f, "local-ready"),
            Self::Offering => write!(f, "offering"),
            Self::AnsweringPending => write!(f, "answering-pending"),
            Self::Negotiating => write!(f, "negotiating"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One half of the offer/answer exchange
///
/// Immutable once built; renegotiation builds a fresh value after an
/// explicit reset, it never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Role the description was built for
    pub role: EndpointRole,

    /// Opaque negotiated-parameters payload (SDP-like text)
    payload: String,
}

impl SessionDescription {
    pub fn new(role: EndpointRole, payload: impl Into<String>) -> Self {
        Self {
            role,
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// True when this description is an offer
    pub fn is_offer(&self) -> bool {
        self.role == EndpointRole::Initiator
    }
}

/// A discovered connectivity option for reaching an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Endpoint the candidate belongs to
    pub endpoint: EndpointId,

    /// Opaque transport-address payload
    pub payload: String,

    /// Monotonic per-endpoint sequence, assigned at emission. Used to
    /// deduplicate at-least-once redelivery.
    pub sequence: u64,
}
