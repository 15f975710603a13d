//! Offer/answer exchange tests on a single coordinator hosting both sides
//!
//! Covers:
//! - Full negotiation to Connected
//! - Candidate buffering before the remote description (FIFO, no drops)
//! - Duplicate redelivery suppression
//! - Double remote description rejection
//! - Glare rejection
//! - Hang-up propagation to the counterpart

use std::sync::Arc;
use std::time::Duration;

use peerlink_media_core::LoopbackMediaSource;
use peerlink_session_core::{
    Candidate, CoordinatorConfig, EndpointId, EndpointRole, InProcessSignaling,
    NegotiationCoordinator, NegotiationState, SessionError, SessionRegistry, SignalMessage,
};
use tokio::time::sleep;

async fn setup() -> (NegotiationCoordinator, EndpointId, EndpointId) {
    let signaling = Arc::new(InProcessSignaling::new());
    let (coordinator, _events) = NegotiationCoordinator::new(
        CoordinatorConfig::builder()
            .gather_interval(Duration::from_millis(2))
            .build(),
        Arc::new(LoopbackMediaSource::new()),
        signaling.clone(),
        SessionRegistry::new(),
    )
    .await;

    let a = coordinator
        .create_endpoint(EndpointRole::Initiator)
        .await
        .unwrap();
    let b = coordinator
        .create_endpoint(EndpointRole::Responder)
        .await
        .unwrap();
    signaling.attach(a.clone(), coordinator.inbox()).await;
    signaling.attach(b.clone(), coordinator.inbox()).await;
    (coordinator, a, b)
}

async fn wait_for_state(
    coordinator: &NegotiationCoordinator,
    endpoint: &EndpointId,
    expected: NegotiationState,
) {
    for _ in 0..100 {
        if coordinator.state(endpoint).await.unwrap() == expected {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "endpoint {endpoint} never reached {expected}, stuck at {}",
        coordinator.state(endpoint).await.unwrap()
    );
}

fn candidate_for(endpoint: &EndpointId, sequence: u64) -> Candidate {
    Candidate {
        endpoint: endpoint.clone(),
        payload: format!("candidate:{sequence} 1 UDP 2130706430 10.0.0.7 40000 typ host"),
        sequence,
    }
}

#[tokio::test]
async fn both_sides_reach_connected() {
    let (coordinator, a, b) = setup().await;

    coordinator.start(&a).await.unwrap();
    coordinator.start(&b).await.unwrap();
    coordinator.call(&a).await.unwrap();

    wait_for_state(&coordinator, &a, NegotiationState::Connected).await;
    wait_for_state(&coordinator, &b, NegotiationState::Connected).await;

    // Both descriptions applied on both sides
    assert!(coordinator.local_description(&a).await.unwrap().is_some());
    assert!(coordinator.remote_description(&a).await.unwrap().is_some());
    assert!(coordinator.local_description(&b).await.unwrap().is_some());
    assert!(coordinator.remote_description(&b).await.unwrap().is_some());

    // At least one viable candidate applied on each side
    assert!(coordinator.applied_candidates(&a).await.unwrap() >= 1);
    assert!(coordinator.applied_candidates(&b).await.unwrap() >= 1);
}

#[tokio::test]
async fn early_candidates_buffer_until_description_then_apply_in_order() {
    let (coordinator, a, b) = setup().await;
    coordinator.start(&b).await.unwrap();

    // Candidates from A land before B has any remote description
    for sequence in [1u64, 2, 3] {
        coordinator
            .handle_message(&b, SignalMessage::Candidate(candidate_for(&a, sequence)))
            .await
            .unwrap();
    }
    assert_eq!(coordinator.buffered_candidates(&b).await.unwrap(), 3);
    assert_eq!(coordinator.applied_candidates(&b).await.unwrap(), 0);

    // The offer flushes the buffer in arrival order; the flushed candidates
    // already satisfy B's connection criterion
    coordinator.start(&a).await.unwrap();
    coordinator.call(&a).await.unwrap();
    wait_for_state(&coordinator, &b, NegotiationState::Connected).await;

    assert_eq!(coordinator.buffered_candidates(&b).await.unwrap(), 0);
    assert!(coordinator.applied_candidates(&b).await.unwrap() >= 3);
}

#[tokio::test]
async fn redelivered_candidates_are_deduplicated() {
    let (coordinator, a, b) = setup().await;
    coordinator.start(&b).await.unwrap();

    // At-least-once delivery: the same candidate arrives twice
    coordinator
        .handle_message(&b, SignalMessage::Candidate(candidate_for(&a, 9)))
        .await
        .unwrap();
    coordinator
        .handle_message(&b, SignalMessage::Candidate(candidate_for(&a, 9)))
        .await
        .unwrap();

    assert_eq!(coordinator.buffered_candidates(&b).await.unwrap(), 1);
}

#[tokio::test]
async fn second_remote_description_is_rejected() {
    let (coordinator, a, b) = setup().await;

    coordinator.start(&a).await.unwrap();
    coordinator.start(&b).await.unwrap();
    coordinator.call(&a).await.unwrap();
    wait_for_state(&coordinator, &a, NegotiationState::Connected).await;

    // Replay the answer B already gave; the slot rejects the overwrite
    let replay = coordinator.local_description(&b).await.unwrap().unwrap();
    let err = coordinator
        .handle_message(
            &a,
            SignalMessage::Answer {
                from: b.clone(),
                description: replay,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::DescriptionAlreadySet { ref which, .. } if which == "remote"
    ));

    // The established session is not disturbed
    assert_eq!(
        coordinator.state(&a).await.unwrap(),
        NegotiationState::Connected
    );
}

#[tokio::test]
async fn glare_offer_is_rejected_without_arbitration() {
    let (coordinator, a, b) = setup().await;

    // B never starts, so no answer can race this test out of Offering
    coordinator.start(&a).await.unwrap();
    coordinator.call(&a).await.unwrap();
    assert_eq!(
        coordinator.state(&a).await.unwrap(),
        NegotiationState::Offering
    );

    // A fabricated simultaneous offer toward the offering side
    let fake_offer = coordinator.local_description(&a).await.unwrap().unwrap();
    let err = coordinator
        .handle_message(
            &a,
            SignalMessage::Offer {
                from: b.clone(),
                description: fake_offer,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
}

#[tokio::test]
async fn hang_up_propagates_and_discards_buffers() {
    let (coordinator, a, b) = setup().await;

    coordinator.start(&a).await.unwrap();
    coordinator.start(&b).await.unwrap();
    coordinator.call(&a).await.unwrap();
    wait_for_state(&coordinator, &a, NegotiationState::Connected).await;
    wait_for_state(&coordinator, &b, NegotiationState::Connected).await;

    coordinator.hang_up(&a).await.unwrap();
    wait_for_state(&coordinator, &b, NegotiationState::Closed).await;

    assert_eq!(
        coordinator.state(&a).await.unwrap(),
        NegotiationState::Closed
    );
    assert_eq!(coordinator.buffered_candidates(&a).await.unwrap(), 0);
    assert_eq!(coordinator.buffered_candidates(&b).await.unwrap(), 0);
}

#[tokio::test]
async fn renegotiation_runs_a_second_offer_answer_round() {
    let (coordinator, a, b) = setup().await;

    coordinator.start(&a).await.unwrap();
    coordinator.start(&b).await.unwrap();
    coordinator.call(&a).await.unwrap();
    wait_for_state(&coordinator, &a, NegotiationState::Connected).await;
    wait_for_state(&coordinator, &b, NegotiationState::Connected).await;

    // Calling again without a reset is rejected; the slots are still full
    let err = coordinator.call(&a).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));

    // Both sides reopen their slots, then the initiator re-offers
    coordinator.renegotiate(&a).await.unwrap();
    coordinator.renegotiate(&b).await.unwrap();
    assert_eq!(
        coordinator.state(&a).await.unwrap(),
        NegotiationState::Negotiating
    );
    assert!(coordinator.local_description(&a).await.unwrap().is_none());
    assert!(coordinator.remote_description(&b).await.unwrap().is_none());

    coordinator.call(&a).await.unwrap();
    wait_for_state(&coordinator, &a, NegotiationState::Connected).await;
    wait_for_state(&coordinator, &b, NegotiationState::Connected).await;

    assert!(coordinator.local_description(&a).await.unwrap().is_some());
    assert!(coordinator.remote_description(&a).await.unwrap().is_some());
    assert!(coordinator.local_description(&b).await.unwrap().is_some());
    assert!(coordinator.remote_description(&b).await.unwrap().is_some());
}

#[tokio::test]
async fn late_candidates_still_apply_after_connected() {
    let (coordinator, a, b) = setup().await;

    coordinator.start(&a).await.unwrap();
    coordinator.start(&b).await.unwrap();
    coordinator.call(&a).await.unwrap();
    wait_for_state(&coordinator, &b, NegotiationState::Connected).await;

    let before = coordinator.applied_candidates(&b).await.unwrap();
    coordinator
        .handle_message(&b, SignalMessage::Candidate(candidate_for(&a, 1_000)))
        .await
        .unwrap();
    assert_eq!(coordinator.applied_candidates(&b).await.unwrap(), before + 1);
    assert_eq!(
        coordinator.state(&b).await.unwrap(),
        NegotiationState::Connected
    );
}
