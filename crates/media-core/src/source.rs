//! Local capture devices
//!
//! The negotiation core never touches a camera or microphone directly; it
//! asks a [`LocalMediaSource`] for a handle and keeps that handle for the
//! life of the endpoint. [`LoopbackMediaSource`] is the in-process stand-in
//! used by tests and demos.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{MediaError, Result};
use crate::types::{MediaConstraints, MediaHandle};

/// Source of local capture streams
#[async_trait]
pub trait LocalMediaSource: Send + Sync {
    /// Acquire a local capture stream matching the constraints.
    ///
    /// Fails with [`MediaError::MediaUnavailable`] when the device cannot be
    /// opened. Acquisition is asynchronous; callers must not hold endpoint
    /// locks across the await.
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaHandle>;

    /// Release a previously acquired stream. Releasing an unknown handle is
    /// a no-op.
    async fn release(&self, handle: &MediaHandle);
}

/// Simulated capture device for loopback use
///
/// Always succeeds unless constructed with [`LoopbackMediaSource::failing`],
/// which refuses every acquisition the way a missing or busy device would.
pub struct LoopbackMediaSource {
    fail: bool,
    acquired: AtomicUsize,
}

impl LoopbackMediaSource {
    /// A source that grants every acquisition
    pub fn new() -> Self {
        Self {
            fail: false,
            acquired: AtomicUsize::new(0),
        }
    }

    /// A source that refuses every acquisition
    pub fn failing() -> Self {
        Self {
            fail: true,
            acquired: AtomicUsize::new(0),
        }
    }

    /// Number of currently live handles
    pub fn live_handles(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl Default for LoopbackMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalMediaSource for LoopbackMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaHandle> {
        if self.fail {
            warn!("loopback source configured to fail acquisition");
            return Err(MediaError::media_unavailable("no capture device"));
        }
        if constraints.is_empty() {
            return Err(MediaError::media_unavailable("no tracks requested"));
        }

        // Yield once so acquisition is a genuine suspension point, matching
        // the shape of a real device open.
        tokio::task::yield_now().await;

        let handle = MediaHandle::new(constraints);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        debug!("Acquired loopback media stream {}", handle.id);
        Ok(handle)
    }

    async fn release(&self, handle: &MediaHandle) {
        debug!("Released loopback media stream {}", handle.id);
        // Saturating: releasing twice must not underflow the gauge
        let _ = self
            .acquired
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}
