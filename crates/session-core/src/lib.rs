//! Offer/answer session negotiation for the peerlink stack.
//!
//! Two endpoints, an initiator and a responder, exchange session
//! descriptions and trickle connectivity candidates until a usable path
//! exists or either side hangs up. The [`coordinator::NegotiationCoordinator`]
//! owns endpoint lifecycle state and validates every transition; the
//! [`registry::SessionRegistry`] resolves "the other side" of the pair; the
//! [`signaling::SignalingChannel`] seam carries messages between
//! counterparts without assuming they share a process.
//!
//! Media capture, rendering, and detection live behind the interfaces in
//! `peerlink-media-core`.

// Error handling
pub mod errors;

// Core negotiation types
pub mod types;

// Endpoint record
pub mod endpoint;

// Candidate gathering
pub mod gatherer;

// Session description building
pub mod description;

// Two-party pairing registry
pub mod registry;

// Counterpart message delivery
pub mod signaling;

// Observable negotiation events
pub mod events;

// Configuration
pub mod config;

// Negotiation coordinator
pub mod coordinator;

// Public exports
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder};
pub use coordinator::NegotiationCoordinator;
pub use endpoint::Endpoint;
pub use errors::{Result, SessionError};
pub use events::NegotiationEvent;
pub use gatherer::CandidateGatherer;
pub use registry::SessionRegistry;
pub use signaling::{InProcessSignaling, SignalMessage, SignalingChannel};
pub use types::{Candidate, EndpointId, EndpointRole, NegotiationState, SessionDescription};

/// Re-export of common types and functions
pub mod prelude {
    pub use super::{
        Candidate, CoordinatorConfig, EndpointId, EndpointRole, InProcessSignaling,
        NegotiationCoordinator, NegotiationEvent, NegotiationState, Result, SessionDescription,
        SessionError, SessionRegistry, SignalMessage, SignalingChannel,
    };
}
