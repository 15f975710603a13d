//! Coordinator lifecycle operations
//!
//! One coordinator hosts any number of endpoints; each endpoint's state
//! lives behind its own async mutex, so exactly one mutation is in flight
//! per endpoint while unrelated endpoints proceed untouched. Asynchronous
//! steps that outlive a lock (media acquisition, description building)
//! re-check the endpoint on completion and discard their result if the
//! endpoint closed in the meantime.

use std::sync::Arc;

use dashmap::DashMap;
use peerlink_media_core::{LocalMediaSource, MediaHandle};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::description;
use crate::endpoint::Endpoint;
use crate::errors::{Result, SessionError};
use crate::events::NegotiationEvent;
use crate::gatherer::CandidateGatherer;
use crate::registry::SessionRegistry;
use crate::signaling::{SignalMessage, SignalingChannel};
use crate::types::{Candidate, EndpointId, EndpointRole, NegotiationState, SessionDescription};

/// Mutable endpoint state, guarded by the per-endpoint mutex
pub(super) struct EndpointShared {
    pub(super) endpoint: Endpoint,
    pub(super) media: Option<MediaHandle>,
}

/// Per-endpoint context held in the coordinator map
pub(super) struct EndpointContext {
    pub(super) shared: Mutex<EndpointShared>,
    /// Flipped on close; gatherer and relay check it every cycle
    pub(super) shutdown_tx: watch::Sender<bool>,
}

/// Drives offer/answer negotiation for its endpoints
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct NegotiationCoordinator {
    pub(super) config: CoordinatorConfig,
    pub(super) media_source: Arc<dyn LocalMediaSource>,
    pub(super) signaling: Arc<dyn SignalingChannel>,
    pub(super) registry: SessionRegistry,
    pub(super) endpoints: Arc<DashMap<EndpointId, Arc<EndpointContext>>>,
    pub(super) event_tx: mpsc::Sender<NegotiationEvent>,
    inbox_tx: mpsc::Sender<(EndpointId, SignalMessage)>,
}

impl NegotiationCoordinator {
    /// Create the coordinator and spawn its inbound dispatch task.
    ///
    /// The registry and signaling channel are injected; sharing one
    /// registry between two coordinators pairs their endpoints.
    pub async fn new(
        config: CoordinatorConfig,
        media_source: Arc<dyn LocalMediaSource>,
        signaling: Arc<dyn SignalingChannel>,
        registry: SessionRegistry,
    ) -> (Self, mpsc::Receiver<NegotiationEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);
        let (inbox_tx, mut inbox_rx) = mpsc::channel(config.channel_capacity);

        let coordinator = Self {
            config,
            media_source,
            signaling,
            registry,
            endpoints: Arc::new(DashMap::new()),
            event_tx,
            inbox_tx,
        };

        let dispatch = coordinator.clone();
        tokio::spawn(async move {
            while let Some((to, message)) = inbox_rx.recv().await {
                if let Err(e) = dispatch.handle_message(&to, message).await {
                    warn!("Message for {} rejected: {}", to, e);
                }
            }
            debug!("Coordinator dispatch task exited");
        });

        (coordinator, event_rx)
    }

    /// Inbox for a signaling channel to route this coordinator's endpoints
    pub fn inbox(&self) -> mpsc::Sender<(EndpointId, SignalMessage)> {
        self.inbox_tx.clone()
    }

    /// Create an endpoint and claim a registry slot.
    ///
    /// When the registry already holds a pair, the endpoint is discarded and
    /// the error surfaces; an endpoint that cannot pair is never retained.
    pub async fn create_endpoint(&self, role: EndpointRole) -> Result<EndpointId> {
        let endpoint = Endpoint::new(role);
        let id = endpoint.id.clone();

        let (shutdown_tx, _) = watch::channel(false);
        let context = Arc::new(EndpointContext {
            shared: Mutex::new(EndpointShared {
                endpoint,
                media: None,
            }),
            shutdown_tx,
        });
        self.endpoints.insert(id.clone(), context);

        if let Err(e) = self.registry.register(&id).await {
            self.endpoints.remove(&id);
            return Err(e);
        }
        info!("Created {} endpoint {}", role, id);
        Ok(id)
    }

    /// Acquire local media and begin gathering candidates ("start" action).
    ///
    /// Acquisition failure leaves the endpoint in `Idle` with the error
    /// surfaced; `call` stays unavailable until a start succeeds.
    pub async fn start(&self, id: &EndpointId) -> Result<()> {
        let context = self.context(id)?;

        {
            let shared = context.shared.lock().await;
            let state = shared.endpoint.state();
            if state != NegotiationState::Idle {
                return Err(SessionError::InvalidState {
                    operation: "start".to_string(),
                    state,
                });
            }
        }

        // No endpoint lock across the device open
        let handle = match self.media_source.acquire(self.config.constraints).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Media acquisition failed for {}: {}", id, e);
                return Err(e.into());
            }
        };

        let mut shared = context.shared.lock().await;
        let state = shared.endpoint.state();
        if state != NegotiationState::Idle {
            // Lost the race against a hang-up or a concurrent start while
            // the device was opening; hand the stream back
            drop(shared);
            self.media_source.release(&handle).await;
            return Err(if state == NegotiationState::Closed {
                SessionError::EndpointClosed {
                    endpoint: id.to_string(),
                }
            } else {
                SessionError::InvalidState {
                    operation: "start".to_string(),
                    state,
                }
            });
        }

        shared.media = Some(handle);
        self.transition(&mut shared.endpoint, NegotiationState::LocalReady)?;

        // Candidates start flowing as soon as local media is up
        let (candidate_tx, candidate_rx) = mpsc::channel(self.config.channel_capacity);
        let _gatherer = CandidateGatherer::spawn(
            id.clone(),
            &self.config,
            candidate_tx,
            context.shutdown_tx.subscribe(),
        );
        let relay = self.clone();
        let relay_id = id.clone();
        tokio::spawn(async move { relay.relay_loop(relay_id, candidate_rx).await });

        Ok(())
    }

    /// Build and send the offer ("call" action, initiator only).
    ///
    /// Runs from `LocalReady` for the first round. After
    /// [`NegotiationCoordinator::renegotiate`] has emptied the local slot
    /// the endpoint sits in `Negotiating`, and `call` issues the fresh offer
    /// from there without re-walking the `Offering` transition.
    pub async fn call(&self, id: &EndpointId) -> Result<()> {
        let context = self.context(id)?;

        let (role, media, first_round) = {
            let shared = context.shared.lock().await;
            let state = shared.endpoint.state();
            let first_round = match state {
                NegotiationState::LocalReady => true,
                NegotiationState::Negotiating
                    if shared.endpoint.local_description().is_none() =>
                {
                    false
                }
                _ => {
                    return Err(SessionError::InvalidState {
                        operation: "call".to_string(),
                        state,
                    });
                }
            };
            (shared.endpoint.role, shared.media.clone(), first_round)
        };

        // Build without the lock; a hang-up may land while we wait
        let offer = match description::build_offer(id, role, media.as_ref()).await {
            Ok(offer) => offer,
            Err(e) => {
                let mut shared = context.shared.lock().await;
                self.fail(id, &mut shared, e.to_string()).await;
                return Err(e);
            }
        };

        let mut shared = context.shared.lock().await;
        if shared.endpoint.is_closed() {
            debug!("Discarding offer built for closed endpoint {}", id);
            return Err(SessionError::EndpointClosed {
                endpoint: id.to_string(),
            });
        }

        shared.endpoint.set_local_description(offer.clone())?;
        if first_round {
            self.transition(&mut shared.endpoint, NegotiationState::Offering)?;
        }

        let counterpart = match self.registry.lookup_counterpart(id).await {
            Ok(counterpart) => counterpart,
            Err(e) => {
                self.fail(id, &mut shared, e.to_string()).await;
                return Err(e);
            }
        };

        let message = SignalMessage::Offer {
            from: id.clone(),
            description: offer,
        };
        if let Err(e) = self.signaling.send(&counterpart, message).await {
            self.fail(id, &mut shared, e.to_string()).await;
            return Err(e);
        }
        info!("Endpoint {} sent offer to {}", id, counterpart);

        self.flush_outbound(&mut shared, &counterpart).await;
        Ok(())
    }

    /// Tear the endpoint down and notify the counterpart ("hang up").
    /// Idempotent: hanging up a closed endpoint is a no-op.
    pub async fn hang_up(&self, id: &EndpointId) -> Result<()> {
        let context = self.context(id)?;
        let mut shared = context.shared.lock().await;

        if shared.endpoint.is_closed() {
            debug!("Hang-up on already closed endpoint {} ignored", id);
            return Ok(());
        }

        // Resolve the counterpart before the registry slot goes away
        let counterpart = self.registry.lookup_counterpart(id).await.ok();
        self.close(id, &context, &mut shared).await;

        if let Some(counterpart) = counterpart {
            let message = SignalMessage::Hangup { from: id.clone() };
            if let Err(e) = self.signaling.send(&counterpart, message).await {
                // Counterpart may already be gone; teardown still succeeded
                debug!("Hang-up notification to {} failed: {}", counterpart, e);
            }
        }
        Ok(())
    }

    /// Reopen the description slots of a connected endpoint for a fresh
    /// offer/answer round. Both sides reset, then the initiator re-issues
    /// the offer with `call`. Trickled candidates keep their sequence space.
    pub async fn renegotiate(&self, id: &EndpointId) -> Result<()> {
        let context = self.context(id)?;
        let mut shared = context.shared.lock().await;

        shared.endpoint.reset_for_renegotiation()?;
        if shared.endpoint.state() == NegotiationState::Connected {
            self.transition(&mut shared.endpoint, NegotiationState::Negotiating)?;
        }
        Ok(())
    }

    /// Current lifecycle state of an endpoint
    pub async fn state(&self, id: &EndpointId) -> Result<NegotiationState> {
        let context = self.context(id)?;
        let shared = context.shared.lock().await;
        Ok(shared.endpoint.state())
    }

    /// The endpoint's local description, if built
    pub async fn local_description(&self, id: &EndpointId) -> Result<Option<SessionDescription>> {
        let context = self.context(id)?;
        let shared = context.shared.lock().await;
        Ok(shared.endpoint.local_description().cloned())
    }

    /// The endpoint's remote description, if applied
    pub async fn remote_description(&self, id: &EndpointId) -> Result<Option<SessionDescription>> {
        let context = self.context(id)?;
        let shared = context.shared.lock().await;
        Ok(shared.endpoint.remote_description().cloned())
    }

    /// Remote candidates held until the remote description arrives
    pub async fn buffered_candidates(&self, id: &EndpointId) -> Result<usize> {
        let context = self.context(id)?;
        let shared = context.shared.lock().await;
        Ok(shared.endpoint.buffered_candidates())
    }

    /// Remote candidates applied so far
    pub async fn applied_candidates(&self, id: &EndpointId) -> Result<u64> {
        let context = self.context(id)?;
        let shared = context.shared.lock().await;
        Ok(shared.endpoint.applied_candidates())
    }

    /// Number of endpoints this coordinator currently hosts
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    // ---- internals ----

    pub(super) fn context(&self, id: &EndpointId) -> Result<Arc<EndpointContext>> {
        self.endpoints
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::endpoint_not_found(id.to_string()))
    }

    /// Validated transition plus the matching event
    pub(super) fn transition(
        &self,
        endpoint: &mut Endpoint,
        next: NegotiationState,
    ) -> Result<()> {
        let from = endpoint.state();
        endpoint.transition(next)?;
        let id = endpoint.id.clone();
        self.emit(NegotiationEvent::StateChanged {
            endpoint: id.clone(),
            from,
            to: next,
        });
        match next {
            NegotiationState::Connected => self.emit(NegotiationEvent::Connected { endpoint: id }),
            NegotiationState::Closed => self.emit(NegotiationEvent::Closed { endpoint: id }),
            _ => {}
        }
        Ok(())
    }

    /// Events are best-effort; a slow or absent consumer never stalls a
    /// transition.
    pub(super) fn emit(&self, event: NegotiationEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            debug!("Dropping negotiation event: {}", e);
        }
    }

    /// Move a live endpoint to `Failed` and release its resources
    pub(super) async fn fail(&self, id: &EndpointId, shared: &mut EndpointShared, reason: String) {
        warn!("Endpoint {} failed: {}", id, reason);
        if !shared.endpoint.state().is_terminal() {
            // Transition to Failed from a live state cannot be rejected
            let _ = self.transition(&mut shared.endpoint, NegotiationState::Failed);
        }
        self.emit(NegotiationEvent::Failed {
            endpoint: id.clone(),
            reason,
        });
        self.release(id, shared).await;
    }

    /// Close a live endpoint and release its resources
    pub(super) async fn close(
        &self,
        id: &EndpointId,
        context: &EndpointContext,
        shared: &mut EndpointShared,
    ) {
        info!("Closing endpoint {}", id);
        let _ = context.shutdown_tx.send(true);
        let _ = self.transition(&mut shared.endpoint, NegotiationState::Closed);
        self.release(id, shared).await;
    }

    /// Shared teardown: queues, media handle, registry slot
    async fn release(&self, id: &EndpointId, shared: &mut EndpointShared) {
        shared.endpoint.drain_all();
        if let Some(handle) = shared.media.take() {
            self.media_source.release(&handle).await;
        }
        self.registry.unregister(id).await;
    }

    /// Deliver any locally queued candidates now that the counterpart is
    /// reachable; redelivery is deduplicated by sequence on the far side.
    pub(super) async fn flush_outbound(&self, shared: &mut EndpointShared, counterpart: &EndpointId) {
        for candidate in shared.endpoint.drain_outbound() {
            if let Err(e) = self
                .signaling
                .send(counterpart, SignalMessage::Candidate(candidate.clone()))
                .await
            {
                debug!("Requeueing candidate seq {}: {}", candidate.sequence, e);
                shared.endpoint.queue_outbound(candidate);
                return;
            }
        }
    }

    /// Consume gathered candidates for one endpoint and relay them
    async fn relay_loop(self, id: EndpointId, mut candidates: mpsc::Receiver<Candidate>) {
        while let Some(candidate) = candidates.recv().await {
            let Ok(context) = self.context(&id) else {
                return;
            };
            let mut shared = context.shared.lock().await;
            if shared.endpoint.state().is_terminal() {
                debug!("Dropping candidate for terminal endpoint {}", id);
                return;
            }

            shared.endpoint.record_emitted();
            self.emit(NegotiationEvent::CandidateGathered {
                candidate: candidate.clone(),
            });

            match self.registry.lookup_counterpart(&id).await {
                Ok(counterpart) => {
                    shared.endpoint.queue_outbound(candidate);
                    self.flush_outbound(&mut shared, &counterpart).await;
                }
                Err(_) => {
                    // No pairing yet; hold for delivery once one exists
                    shared.endpoint.queue_outbound(candidate);
                }
            }

            self.maybe_connect(&mut shared);
        }
        debug!("Relay loop for {} finished", id);
    }

    /// Flip to `Connected` once this side's criterion holds: both
    /// descriptions applied, one remote candidate applied, one local
    /// candidate emitted.
    pub(super) fn maybe_connect(&self, shared: &mut EndpointShared) {
        if shared.endpoint.state() == NegotiationState::Negotiating
            && shared.endpoint.connect_eligible()
        {
            let _ = self.transition(&mut shared.endpoint, NegotiationState::Connected);
        }
    }
}
