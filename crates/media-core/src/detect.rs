//! Classifier-backed detection
//!
//! Face/eye detection over captured frames. The engine itself (model format,
//! algorithm, accuracy) is an opaque external capability; this module only
//! fixes the seam the render loop calls through.

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{FrameBuffer, ModelHandle, Rect};

/// Detection engine seam
#[async_trait]
pub trait DetectionEngine: Send + Sync {
    /// Load a classifier model from a URI. Loading is asynchronous and may
    /// fail with [`crate::MediaError::ModelUnavailable`].
    async fn load_model(&self, uri: &str) -> Result<ModelHandle>;

    /// Run the classifier over one frame, returning detected regions.
    fn detect(&self, frame: &FrameBuffer, model: &ModelHandle) -> Vec<Rect>;
}

/// Engine that loads any model and never detects anything
pub struct NoopDetectionEngine;

#[async_trait]
impl DetectionEngine for NoopDetectionEngine {
    async fn load_model(&self, uri: &str) -> Result<ModelHandle> {
        Ok(ModelHandle {
            uri: uri.to_string(),
        })
    }

    fn detect(&self, _frame: &FrameBuffer, _model: &ModelHandle) -> Vec<Rect> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_engine_loads_and_detects_nothing() {
        let engine = NoopDetectionEngine;
        let model = engine.load_model("models/frontal_face.xml").await.unwrap();
        assert_eq!(model.uri, "models/frontal_face.xml");

        let frame = FrameBuffer::blank(8, 8);
        assert!(engine.detect(&frame, &model).is_empty());
    }
}
