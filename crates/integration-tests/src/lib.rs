//! Shared fixtures for the peerlink scenario tests
//!
//! Each fixture wires two coordinators (one per endpoint, the
//! non-colocated deployment shape) through a shared registry and an
//! in-process signaling router.

use std::sync::Arc;
use std::time::Duration;

use peerlink_media_core::{LocalMediaSource, LoopbackMediaSource};
use peerlink_session_core::{
    CoordinatorConfig, EndpointId, EndpointRole, InProcessSignaling, NegotiationCoordinator,
    NegotiationEvent, NegotiationState, SessionRegistry,
};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

/// One side of a negotiation pair under test
pub struct TestPeer {
    pub coordinator: NegotiationCoordinator,
    pub events: mpsc::Receiver<NegotiationEvent>,
    pub id: EndpointId,
}

/// Initialize test logging; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}

fn test_config() -> CoordinatorConfig {
    CoordinatorConfig::builder()
        .gather_interval(Duration::from_millis(2))
        .max_candidates(4)
        .build()
}

/// Build an initiator/responder pair on separate coordinators sharing a
/// registry and signaling channel
pub async fn wired_pair(
    initiator_source: Arc<dyn LocalMediaSource>,
    responder_source: Arc<dyn LocalMediaSource>,
) -> (TestPeer, TestPeer) {
    let registry = SessionRegistry::new();
    let signaling = Arc::new(InProcessSignaling::new());

    let (alice, alice_events) = NegotiationCoordinator::new(
        test_config(),
        initiator_source,
        signaling.clone(),
        registry.clone(),
    )
    .await;
    let (bob, bob_events) = NegotiationCoordinator::new(
        test_config(),
        responder_source,
        signaling.clone(),
        registry.clone(),
    )
    .await;

    let a = alice.create_endpoint(EndpointRole::Initiator).await.unwrap();
    let b = bob.create_endpoint(EndpointRole::Responder).await.unwrap();
    signaling.attach(a.clone(), alice.inbox()).await;
    signaling.attach(b.clone(), bob.inbox()).await;
    debug!("Wired pair: {} <-> {}", a, b);

    (
        TestPeer {
            coordinator: alice,
            events: alice_events,
            id: a,
        },
        TestPeer {
            coordinator: bob,
            events: bob_events,
            id: b,
        },
    )
}

/// Pair backed by always-working loopback capture on both sides
pub async fn loopback_pair() -> (TestPeer, TestPeer) {
    wired_pair(
        Arc::new(LoopbackMediaSource::new()),
        Arc::new(LoopbackMediaSource::new()),
    )
    .await
}

/// Poll an endpoint until it reaches `expected`, panicking after ~1s
pub async fn wait_for_state(peer: &TestPeer, expected: NegotiationState) {
    for _ in 0..200 {
        if peer.coordinator.state(&peer.id).await.unwrap() == expected {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "endpoint {} never reached {expected}, stuck at {}",
        peer.id,
        peer.coordinator.state(&peer.id).await.unwrap()
    );
}
