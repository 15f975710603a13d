//! On-screen rendering
//!
//! [`RenderSink`] is the fire-and-forget display seam. [`RenderLoop`] is the
//! periodic task that pulls captured frames, optionally runs detection and
//! overlays the resulting regions, then hands the frame to the sink. The
//! loop runs on a fixed interval and checks a cancellation flag every cycle,
//! so stopping it never races a reschedule.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, trace};

use crate::detect::DetectionEngine;
use crate::types::{FrameBuffer, MediaHandle, ModelHandle, Rect};

/// Display seam: no return values, no failure surface
pub trait RenderSink: Send + Sync {
    /// Bind a live capture stream to the sink
    fn attach(&self, handle: &MediaHandle);

    /// Display one frame
    fn render(&self, frame: &FrameBuffer);

    /// Draw a detection region over the last rendered frame
    fn overlay(&self, rect: &Rect);
}

/// Sink that discards everything, counting calls for tests
#[derive(Default)]
pub struct NullRenderSink {
    frames: AtomicUsize,
    overlays: AtomicUsize,
}

impl NullRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn overlays_drawn(&self) -> usize {
        self.overlays.load(Ordering::SeqCst)
    }
}

impl RenderSink for NullRenderSink {
    fn attach(&self, handle: &MediaHandle) {
        debug!("Attached media stream {} to null sink", handle.id);
    }

    fn render(&self, _frame: &FrameBuffer) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn overlay(&self, _rect: &Rect) {
        self.overlays.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cooperative periodic render task
///
/// Replaces a self-rescheduling display callback with an interval-driven
/// task owning an explicit cancellation flag. One frame is rendered per
/// cycle; if several frames arrived since the last cycle, only the newest is
/// shown and the rest are dropped.
pub struct RenderLoop {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RenderLoop {
    /// Spawn the loop. `detection` is optional; when present, every rendered
    /// frame is classified and the regions are overlaid.
    pub fn spawn(
        mut frames: mpsc::Receiver<FrameBuffer>,
        sink: Arc<dyn RenderSink>,
        detection: Option<(Arc<dyn DetectionEngine>, ModelHandle)>,
        interval: Duration,
    ) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel_rx.changed() => {}
                }
                if *cancel_rx.borrow() {
                    debug!("Render loop cancelled");
                    break;
                }

                // Keep only the newest frame from this cycle's backlog
                let mut latest = None;
                while let Ok(frame) = frames.try_recv() {
                    latest = Some(frame);
                }
                let Some(frame) = latest else {
                    trace!("No frame this render cycle");
                    continue;
                };

                sink.render(&frame);
                if let Some((engine, model)) = &detection {
                    for rect in engine.detect(&frame, model) {
                        sink.overlay(&rect);
                    }
                }
            }
        });

        Self { cancel_tx, task }
    }

    /// Cancel the loop and wait for the task to exit
    pub async fn stop(self) {
        let _ = self.cancel_tx.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectionEngine;
    use crate::errors::Result;
    use async_trait::async_trait;

    struct OneRectEngine;

    #[async_trait]
    impl DetectionEngine for OneRectEngine {
        async fn load_model(&self, uri: &str) -> Result<ModelHandle> {
            Ok(ModelHandle {
                uri: uri.to_string(),
            })
        }

        fn detect(&self, _frame: &FrameBuffer, _model: &ModelHandle) -> Vec<Rect> {
            vec![Rect {
                x: 1,
                y: 1,
                width: 2,
                height: 2,
            }]
        }
    }

    #[tokio::test]
    async fn renders_frames_and_overlays_detections() {
        let sink = Arc::new(NullRenderSink::new());
        let engine: Arc<dyn DetectionEngine> = Arc::new(OneRectEngine);
        let model = engine.load_model("test").await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let render_loop = RenderLoop::spawn(
            rx,
            sink.clone(),
            Some((engine, model)),
            Duration::from_millis(5),
        );

        tx.send(FrameBuffer::blank(4, 4)).await.unwrap();

        // Wait until at least one cycle has consumed the frame
        for _ in 0..50 {
            if sink.frames_rendered() > 0 {
                break;
            }
            time::sleep(Duration::from_millis(5)).await;
        }

        render_loop.stop().await;
        assert!(sink.frames_rendered() >= 1);
        assert_eq!(sink.overlays_drawn(), sink.frames_rendered());
    }

    #[tokio::test]
    async fn stop_halts_rendering() {
        let sink = Arc::new(NullRenderSink::new());
        let (tx, rx) = mpsc::channel(8);
        let render_loop =
            RenderLoop::spawn(rx, sink.clone(), None, Duration::from_millis(5));

        render_loop.stop().await;
        let stopped_at = sink.frames_rendered();

        // Frames sent after stop are never rendered
        let _ = tx.send(FrameBuffer::blank(4, 4)).await;
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.frames_rendered(), stopped_at);
    }
}
