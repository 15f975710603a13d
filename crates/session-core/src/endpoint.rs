//! Endpoint record
//!
//! Single source of truth for one side of a negotiation: lifecycle state,
//! the two description slots, and the candidate queues. All mutation goes
//! through the coordinator, which holds the endpoint behind a per-endpoint
//! lock so only one mutation is in flight at a time.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use crate::errors::{Result, SessionError};
use crate::types::{Candidate, EndpointId, EndpointRole, NegotiationState, SessionDescription};

#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Unique endpoint identifier (primary key)
    pub id: EndpointId,

    /// Role of this endpoint (initiator or responder)
    pub role: EndpointRole,

    /// Current lifecycle state
    state: NegotiationState,

    /// Local description, at most one per session life
    local_description: Option<SessionDescription>,

    /// Remote description, at most one per session life
    remote_description: Option<SessionDescription>,

    /// Remote candidates that arrived before the remote description; held
    /// FIFO and flushed the moment the description lands
    inbound_buffer: VecDeque<Candidate>,

    /// Locally gathered candidates not yet delivered to the counterpart
    outbound_queue: VecDeque<Candidate>,

    /// Sequences of remote candidates already accepted, for at-least-once
    /// redelivery dedupe
    seen_sequences: HashSet<u64>,

    /// Local candidates emitted by the gatherer
    emitted_candidates: u64,

    /// Remote candidates applied
    applied_candidates: u64,

    /// When this endpoint was created
    pub created_at: Instant,

    /// When this endpoint was last updated
    pub updated_at: Instant,
}

impl Endpoint {
    pub fn new(role: EndpointRole) -> Self {
        let now = Instant::now();
        Self {
            id: EndpointId::new(),
            role,
            state: NegotiationState::Idle,
            local_description: None,
            remote_description: None,
            inbound_buffer: VecDeque::new(),
            outbound_queue: VecDeque::new(),
            seen_sequences: HashSet::new(),
            emitted_candidates: 0,
            applied_candidates: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == NegotiationState::Closed
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn emitted_candidates(&self) -> u64 {
        self.emitted_candidates
    }

    pub fn applied_candidates(&self) -> u64 {
        self.applied_candidates
    }

    pub fn buffered_candidates(&self) -> usize {
        self.inbound_buffer.len()
    }

    /// Validated state transition
    pub fn transition(&mut self, next: NegotiationState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Endpoint {} state: {} -> {}", self.id, self.state, next);
        self.state = next;
        self.touch();
        Ok(())
    }

    /// Fill the local description slot. Rejected when already set; only an
    /// explicit reset reopens the slot.
    pub fn set_local_description(&mut self, description: SessionDescription) -> Result<()> {
        if self.local_description.is_some() {
            return Err(SessionError::DescriptionAlreadySet {
                endpoint: self.id.to_string(),
                which: "local".to_string(),
            });
        }
        self.local_description = Some(description);
        self.touch();
        Ok(())
    }

    /// Fill the remote description slot and hand back every buffered
    /// candidate, oldest first, for the caller to apply.
    pub fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<Vec<Candidate>> {
        if self.remote_description.is_some() {
            return Err(SessionError::DescriptionAlreadySet {
                endpoint: self.id.to_string(),
                which: "remote".to_string(),
            });
        }
        self.remote_description = Some(description);
        self.touch();
        Ok(self.inbound_buffer.drain(..).collect())
    }

    pub fn has_both_descriptions(&self) -> bool {
        self.local_description.is_some() && self.remote_description.is_some()
    }

    /// Record a remote candidate's sequence; false when it was already seen
    /// (a redelivered duplicate to drop).
    pub fn note_sequence(&mut self, sequence: u64) -> bool {
        self.seen_sequences.insert(sequence)
    }

    /// Hold a remote candidate until the remote description arrives
    pub fn buffer_inbound(&mut self, candidate: Candidate) {
        self.inbound_buffer.push_back(candidate);
        self.touch();
    }

    /// Count one applied remote candidate
    pub fn record_applied(&mut self) {
        self.applied_candidates += 1;
        self.touch();
    }

    /// Count one locally gathered candidate
    pub fn record_emitted(&mut self) {
        self.emitted_candidates += 1;
        self.touch();
    }

    /// Queue a local candidate whose counterpart is not yet reachable
    pub fn queue_outbound(&mut self, candidate: Candidate) {
        self.outbound_queue.push_back(candidate);
        self.touch();
    }

    /// Take the undelivered local candidates, oldest first
    pub fn drain_outbound(&mut self) -> Vec<Candidate> {
        self.outbound_queue.drain(..).collect()
    }

    /// Connection criterion judged from this side: both descriptions
    /// applied, at least one remote candidate applied, and at least one
    /// local candidate emitted for the counterpart.
    pub fn connect_eligible(&self) -> bool {
        self.has_both_descriptions() && self.applied_candidates > 0 && self.emitted_candidates > 0
    }

    /// Reopen both description slots for renegotiation. Candidate state
    /// survives untouched: the transport path is not being renegotiated, so
    /// applied/emitted counters keep counting and sequences stay monotonic.
    pub fn reset_for_renegotiation(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(SessionError::EndpointClosed {
                endpoint: self.id.to_string(),
            });
        }
        tracing::debug!("Endpoint {} descriptions reset for renegotiation", self.id);
        self.local_description = None;
        self.remote_description = None;
        self.touch();
        Ok(())
    }

    /// Drop all buffered and queued candidates (hang-up path)
    pub fn drain_all(&mut self) {
        let dropped = self.inbound_buffer.len() + self.outbound_queue.len();
        if dropped > 0 {
            tracing::debug!("Endpoint {} dropping {} queued candidates", self.id, dropped);
        }
        self.inbound_buffer.clear();
        self.outbound_queue.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Instant::now();
    }
}
