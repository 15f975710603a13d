//! Inbound signaling message handling
//!
//! Every handler validates the endpoint's current state before mutating it.
//! Messages for closed endpoints are discarded quietly: teardown and late
//! delivery race under at-least-once signaling.

use tracing::{debug, info, warn};

use crate::description;
use crate::errors::{Result, SessionError};
use crate::events::NegotiationEvent;
use crate::signaling::SignalMessage;
use crate::types::{Candidate, EndpointId, NegotiationState, SessionDescription};

use super::coordinator::{EndpointShared, NegotiationCoordinator};

impl NegotiationCoordinator {
    /// Process one message addressed to a hosted endpoint
    pub async fn handle_message(&self, to: &EndpointId, message: SignalMessage) -> Result<()> {
        match message {
            SignalMessage::Offer { from, description } => {
                self.handle_offer(to, &from, description).await
            }
            SignalMessage::Answer { from: _, description } => {
                self.handle_answer(to, description).await
            }
            SignalMessage::Candidate(candidate) => self.handle_candidate(to, candidate).await,
            SignalMessage::Hangup { from } => self.handle_hangup(to, &from).await,
        }
    }

    /// Counterpart proposed a session: apply the offer, build and return
    /// the answer
    async fn handle_offer(
        &self,
        to: &EndpointId,
        from: &EndpointId,
        offer: SessionDescription,
    ) -> Result<()> {
        let context = self.context(to)?;

        // A fresh offer walks LocalReady -> AnsweringPending -> Negotiating;
        // an offer arriving in Negotiating/Connected is either a redelivered
        // duplicate (rejected by the description slot) or a renegotiation
        // offer after an explicit reset (applied without those transitions).
        let fresh = {
            let mut shared = context.shared.lock().await;
            let fresh = match shared.endpoint.state() {
                NegotiationState::Closed | NegotiationState::Failed => {
                    debug!("Discarding offer for terminal endpoint {}", to);
                    return Ok(());
                }
                NegotiationState::Offering => {
                    // Glare: both sides initiated at once. No arbitration
                    // rule exists; reject and leave both offers standing.
                    warn!("Glare: endpoint {} received an offer from {} while offering", to, from);
                    return Err(SessionError::InvalidTransition {
                        from: NegotiationState::Offering,
                        to: NegotiationState::AnsweringPending,
                    });
                }
                NegotiationState::LocalReady => true,
                NegotiationState::Negotiating | NegotiationState::Connected => false,
                state => {
                    return Err(SessionError::InvalidState {
                        operation: "handle offer".to_string(),
                        state,
                    });
                }
            };

            if fresh {
                self.transition(&mut shared.endpoint, NegotiationState::AnsweringPending)?;
            }
            let flushed = shared.endpoint.set_remote_description(offer.clone())?;
            self.emit(NegotiationEvent::DescriptionApplied {
                endpoint: to.clone(),
                role: offer.role,
            });
            self.apply_flushed(&mut shared, flushed);
            info!("Endpoint {} applied offer from {}", to, from);
            fresh
        };

        // Answer build happens without the lock so a hang-up can interleave
        let (role, media) = {
            let shared = context.shared.lock().await;
            (shared.endpoint.role, shared.media.clone())
        };
        let answer = match description::build_answer(to, role, &offer, media.as_ref()).await {
            Ok(answer) => answer,
            Err(e) => {
                let mut shared = context.shared.lock().await;
                self.fail(to, &mut shared, e.to_string()).await;
                return Err(e);
            }
        };

        let mut shared = context.shared.lock().await;
        if shared.endpoint.is_closed() {
            debug!("Discarding answer built for closed endpoint {}", to);
            return Ok(());
        }

        shared.endpoint.set_local_description(answer.clone())?;

        let counterpart = match self.registry.lookup_counterpart(to).await {
            Ok(counterpart) => counterpart,
            Err(e) => {
                self.fail(to, &mut shared, e.to_string()).await;
                return Err(e);
            }
        };
        let message = SignalMessage::Answer {
            from: to.clone(),
            description: answer,
        };
        if let Err(e) = self.signaling.send(&counterpart, message).await {
            self.fail(to, &mut shared, e.to_string()).await;
            return Err(e);
        }
        info!("Endpoint {} sent answer to {}", to, counterpart);

        if fresh {
            self.transition(&mut shared.endpoint, NegotiationState::Negotiating)?;
        }
        self.flush_outbound(&mut shared, &counterpart).await;
        self.maybe_connect(&mut shared);
        Ok(())
    }

    /// Counterpart confirmed our offer
    async fn handle_answer(&self, to: &EndpointId, answer: SessionDescription) -> Result<()> {
        let context = self.context(to)?;
        let mut shared = context.shared.lock().await;

        // As with offers, an answer landing in Negotiating/Connected is a
        // duplicate (slot rejects it) or a renegotiation answer post-reset.
        let fresh = match shared.endpoint.state() {
            NegotiationState::Closed | NegotiationState::Failed => {
                debug!("Discarding answer for terminal endpoint {}", to);
                return Ok(());
            }
            NegotiationState::Offering => true,
            NegotiationState::Negotiating | NegotiationState::Connected => false,
            state => {
                return Err(SessionError::InvalidState {
                    operation: "handle answer".to_string(),
                    state,
                });
            }
        };

        let flushed = shared.endpoint.set_remote_description(answer.clone())?;
        self.emit(NegotiationEvent::DescriptionApplied {
            endpoint: to.clone(),
            role: answer.role,
        });
        self.apply_flushed(&mut shared, flushed);
        if fresh {
            self.transition(&mut shared.endpoint, NegotiationState::Negotiating)?;
        }
        info!("Endpoint {} applied answer", to);

        if let Ok(counterpart) = self.registry.lookup_counterpart(to).await {
            self.flush_outbound(&mut shared, &counterpart).await;
        }
        self.maybe_connect(&mut shared);
        Ok(())
    }

    /// One trickled candidate from the counterpart. Buffered until the
    /// remote description is applied; duplicates from redelivery dropped by
    /// sequence; still applied after `Connected`.
    async fn handle_candidate(&self, to: &EndpointId, candidate: Candidate) -> Result<()> {
        let context = self.context(to)?;
        let mut shared = context.shared.lock().await;

        if shared.endpoint.state().is_terminal() {
            debug!("Discarding candidate for terminal endpoint {}", to);
            return Ok(());
        }
        if !shared.endpoint.note_sequence(candidate.sequence) {
            debug!(
                "Duplicate candidate seq {} for endpoint {} dropped",
                candidate.sequence, to
            );
            return Ok(());
        }

        if shared.endpoint.remote_description().is_none() {
            debug!(
                "Buffering candidate seq {} for endpoint {} (no remote description yet)",
                candidate.sequence, to
            );
            shared.endpoint.buffer_inbound(candidate);
            return Ok(());
        }

        let sequence = candidate.sequence;
        shared.endpoint.record_applied();
        self.emit(NegotiationEvent::CandidateApplied {
            endpoint: to.clone(),
            sequence,
        });
        self.maybe_connect(&mut shared);
        Ok(())
    }

    /// Counterpart hung up; close without notifying back
    async fn handle_hangup(&self, to: &EndpointId, from: &EndpointId) -> Result<()> {
        let Ok(context) = self.context(to) else {
            return Ok(());
        };
        let mut shared = context.shared.lock().await;
        if shared.endpoint.state().is_terminal() {
            return Ok(());
        }

        info!("Endpoint {} closed by counterpart {}", to, from);
        self.close(to, &context, &mut shared).await;
        Ok(())
    }

    /// Apply candidates released by the remote description, oldest first
    fn apply_flushed(&self, shared: &mut EndpointShared, flushed: Vec<Candidate>) {
        for candidate in flushed {
            let sequence = candidate.sequence;
            shared.endpoint.record_applied();
            self.emit(NegotiationEvent::CandidateApplied {
                endpoint: shared.endpoint.id.clone(),
                sequence,
            });
        }
    }
}
