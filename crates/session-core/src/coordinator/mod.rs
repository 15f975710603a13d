//! Negotiation coordinator
//!
//! Owns endpoint lifecycle state and drives the offer/answer exchange.
//! Split into the coordinator proper (lifecycle operations, candidate
//! relay) and the inbound message handler (offer, answer, candidate,
//! hangup).

mod coordinator;
mod message_handler;

pub use coordinator::NegotiationCoordinator;
