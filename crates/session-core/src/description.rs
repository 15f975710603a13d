//! Session description building
//!
//! Builds the offer/answer payloads from an acquired media handle. The
//! payload is SDP-like text summarizing the tracks on offer; negotiation
//! treats it as opaque. Building is asynchronous (it depends on the local
//! device setup) and fails with `DescriptionUnavailable` when local media
//! has not been acquired.

use peerlink_media_core::MediaHandle;
use tracing::debug;

use crate::errors::{Result, SessionError};
use crate::types::{EndpointId, EndpointRole, SessionDescription};

/// Build the initiator's offer
pub async fn build_offer(
    endpoint: &EndpointId,
    role: EndpointRole,
    media: Option<&MediaHandle>,
) -> Result<SessionDescription> {
    if role != EndpointRole::Initiator {
        return Err(SessionError::description_unavailable(format!(
            "offer requested by {role} endpoint {endpoint}"
        )));
    }
    let media = media.ok_or_else(|| {
        SessionError::description_unavailable(format!("no local media acquired for {endpoint}"))
    })?;

    // Device introspection is asynchronous in a real builder
    tokio::task::yield_now().await;

    let description = SessionDescription::new(role, payload("offer", endpoint, media));
    debug!("Built offer for endpoint {}", endpoint);
    Ok(description)
}

/// Build the responder's answer to a received offer
pub async fn build_answer(
    endpoint: &EndpointId,
    role: EndpointRole,
    remote_offer: &SessionDescription,
    media: Option<&MediaHandle>,
) -> Result<SessionDescription> {
    if role != EndpointRole::Responder {
        return Err(SessionError::description_unavailable(format!(
            "answer requested by {role} endpoint {endpoint}"
        )));
    }
    if !remote_offer.is_offer() {
        return Err(SessionError::description_unavailable(format!(
            "answer for {endpoint} requires a remote offer, got an answer"
        )));
    }
    let media = media.ok_or_else(|| {
        SessionError::description_unavailable(format!("no local media acquired for {endpoint}"))
    })?;

    tokio::task::yield_now().await;

    let description = SessionDescription::new(role, payload("answer", endpoint, media));
    debug!("Built answer for endpoint {}", endpoint);
    Ok(description)
}

fn payload(kind: &str, endpoint: &EndpointId, media: &MediaHandle) -> String {
    let mut lines = vec![
        "v=0".to_string(),
        format!("o={endpoint} {kind}"),
        format!("s=peerlink {kind}"),
    ];
    if media.has_audio() {
        lines.push("m=audio".to_string());
    }
    if media.has_video() {
        lines.push("m=video".to_string());
    }
    lines.join("\r\n")
}
