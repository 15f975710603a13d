//! Shared media types
//!
//! Plain value types passed across the capture, render, and detection seams.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::{MediaError, Result};

/// Media handle ID type
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MediaHandleId(pub String);

impl MediaHandleId {
    pub fn new() -> Self {
        Self(format!("media-{}", uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Display for MediaHandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requested capture tracks
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

impl MediaConstraints {
    /// Video-only capture
    pub fn video_only() -> Self {
        Self {
            video: true,
            audio: false,
        }
    }

    /// Audio-only capture
    pub fn audio_only() -> Self {
        Self {
            video: false,
            audio: true,
        }
    }

    /// True when no track is requested
    pub fn is_empty(&self) -> bool {
        !self.video && !self.audio
    }
}

/// An acquired local capture stream
///
/// Returned by a [`crate::source::LocalMediaSource`] and held for the life of
/// the capture. The handle is an opaque reference; the real device stays
/// behind the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    /// Opaque stream identifier
    pub id: MediaHandleId,

    /// Tracks this handle carries
    pub constraints: MediaConstraints,
}

impl MediaHandle {
    pub fn new(constraints: MediaConstraints) -> Self {
        Self {
            id: MediaHandleId::new(),
            constraints,
        }
    }

    pub fn has_video(&self) -> bool {
        self.constraints.video
    }

    pub fn has_audio(&self) -> bool {
        self.constraints.audio
    }
}

/// A single raw frame pulled from a capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Packed grayscale pixel data, one byte per pixel
    pub data: Bytes,
}

impl FrameBuffer {
    /// Create a frame, validating that the payload matches the dimensions
    pub fn new(width: u32, height: u32, data: Bytes) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(MediaError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A zero-filled frame, useful for loopback capture
    pub fn blank(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: Bytes::from(vec![0u8; len]),
        }
    }
}

/// A detection result region, in frame pixel coordinates
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A loaded classifier model
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ModelHandle {
    /// URI the model was loaded from
    pub uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_dimensions_validated() {
        let ok = FrameBuffer::new(4, 4, Bytes::from(vec![0u8; 16]));
        assert!(ok.is_ok());

        let bad = FrameBuffer::new(4, 4, Bytes::from(vec![0u8; 15]));
        assert_eq!(
            bad.unwrap_err(),
            MediaError::InvalidFrame {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn default_constraints_request_both_tracks() {
        let constraints = MediaConstraints::default();
        assert!(constraints.video);
        assert!(constraints.audio);
        assert!(!constraints.is_empty());
    }
}
