//! Media collaborator interfaces for the peerlink stack.
//!
//! Session negotiation treats capture, rendering, and detection as external
//! capabilities. This crate defines those seams as traits along with
//! simulated implementations suitable for tests and loopback demos, plus a
//! cooperative render loop that periodically pulls frames, runs optional
//! detection, and pushes the result to a sink.

// Error handling
pub mod errors;

// Shared media types
pub mod types;

// Local capture devices
pub mod source;

// On-screen rendering
pub mod render;

// Classifier-backed detection
pub mod detect;

// Public exports
pub use detect::{DetectionEngine, NoopDetectionEngine};
pub use errors::{MediaError, Result};
pub use render::{NullRenderSink, RenderLoop, RenderSink};
pub use source::{LocalMediaSource, LoopbackMediaSource};
pub use types::{FrameBuffer, MediaConstraints, MediaHandle, MediaHandleId, ModelHandle, Rect};

/// Re-export of common types and traits
pub mod prelude {
    pub use super::{
        DetectionEngine, FrameBuffer, LocalMediaSource, LoopbackMediaSource, MediaConstraints,
        MediaError, MediaHandle, ModelHandle, NullRenderSink, Rect, RenderLoop, RenderSink,
        Result,
    };
}
