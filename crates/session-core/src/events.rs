//! Negotiation events
//!
//! Observable side of the coordinator. Consumers hold the receiver returned
//! by [`crate::coordinator::NegotiationCoordinator::new`]; a full or dropped
//! receiver only costs the event, never the transition.

use crate::types::{Candidate, EndpointId, EndpointRole, NegotiationState};

/// Events emitted by the negotiation coordinator
#[derive(Debug, Clone)]
pub enum NegotiationEvent {
    /// State change
    StateChanged {
        endpoint: EndpointId,
        from: NegotiationState,
        to: NegotiationState,
    },

    /// A local candidate was gathered
    CandidateGathered { candidate: Candidate },

    /// A remote description was applied
    DescriptionApplied {
        endpoint: EndpointId,
        role: EndpointRole,
    },

    /// A remote candidate was applied
    CandidateApplied {
        endpoint: EndpointId,
        sequence: u64,
    },

    /// Both sides of this endpoint's criterion were met
    Connected { endpoint: EndpointId },

    /// The endpoint was hung up, locally or by counterpart notification
    Closed { endpoint: EndpointId },

    /// Negotiation failed; endpoint is terminal
    Failed {
        endpoint: EndpointId,
        reason: String,
    },
}
