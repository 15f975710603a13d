//! Signaling channel
//!
//! Carries descriptions and candidates to the counterpart. The reference
//! deployment is in-process (both endpoints colocated behind one or two
//! coordinators), but nothing here assumes colocation: the seam is an
//! addressed `send` with at-least-once delivery, and receivers deduplicate
//! candidates by sequence number.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::errors::{Result, SessionError};
use crate::types::{Candidate, EndpointId, SessionDescription};

/// Messages exchanged between counterparts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignalMessage {
    /// Initiator's proposed description
    Offer {
        from: EndpointId,
        description: SessionDescription,
    },

    /// Responder's confirming description
    Answer {
        from: EndpointId,
        description: SessionDescription,
    },

    /// One trickled connectivity candidate
    Candidate(Candidate),

    /// Counterpart hung up
    Hangup { from: EndpointId },
}

/// Delivery seam toward the counterpart
///
/// Implementations provide at-least-once delivery; duplicate suppression is
/// the receiver's job.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Deliver one message to the named endpoint.
    ///
    /// Fails with [`SessionError::CounterpartUnreachable`] when no route to
    /// the endpoint exists.
    async fn send(&self, to: &EndpointId, message: SignalMessage) -> Result<()>;
}

/// In-process signaling router
///
/// Routes messages into per-endpoint inboxes. A coordinator attaches an
/// inbox for every endpoint it hosts and drains it from its dispatch task.
#[derive(Clone, Default)]
pub struct InProcessSignaling {
    routes: Arc<RwLock<HashMap<EndpointId, mpsc::Sender<(EndpointId, SignalMessage)>>>>,
}

impl InProcessSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route messages for `endpoint` into `inbox`
    pub async fn attach(&self, endpoint: EndpointId, inbox: mpsc::Sender<(EndpointId, SignalMessage)>) {
        debug!("Attached signaling route for {}", endpoint);
        self.routes.write().await.insert(endpoint, inbox);
    }

    /// Remove the route for a closed endpoint
    pub async fn detach(&self, endpoint: &EndpointId) {
        debug!("Detached signaling route for {}", endpoint);
        self.routes.write().await.remove(endpoint);
    }
}

#[async_trait]
impl SignalingChannel for InProcessSignaling {
    async fn send(&self, to: &EndpointId, message: SignalMessage) -> Result<()> {
        let inbox = {
            let routes = self.routes.read().await;
            routes.get(to).cloned()
        };

        let Some(inbox) = inbox else {
            return Err(SessionError::CounterpartUnreachable {
                endpoint: to.to_string(),
            });
        };

        if inbox.send((to.clone(), message)).await.is_err() {
            warn!("Signaling inbox for {} dropped", to);
            return Err(SessionError::CounterpartUnreachable {
                endpoint: to.to_string(),
            });
        }
        Ok(())
    }
}
