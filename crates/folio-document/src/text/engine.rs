// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection-provider abstraction and engine lifecycle.
//
// A `TextDetector` turns an image into canonical fragments. `DetectionEngine`
// owns one detector, loads it once on a blocking thread, publishes its
// lifecycle through a watch channel, and feeds detector output through
// reading-order reconstruction.

use std::sync::Arc;

use folio_core::TextFragment;
use folio_core::config::ReadingOrderConfig;
use folio_core::error::{FolioError, Result};
use image::DynamicImage;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, error, info, instrument, warn};

use super::fragment::order_fragments;
use super::reading_order::{ReadingOrder, ReconstructedDocument};

/// Anything that can locate and read text in an image.
///
/// Implementations convert their native geometry into [`TextFragment`]s;
/// output order does not matter.
pub trait TextDetector: Send + Sync + 'static {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    fn detect(&self, image: &DynamicImage) -> Result<Vec<TextFragment>>;
}

/// Lifecycle of a detection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Publishes `Failed` when an in-flight load is dropped before it finishes,
/// so waiters in [`DetectionEngine::ready`] are released.
struct LoadGuard<'a> {
    state: &'a watch::Sender<EngineState>,
    armed: bool,
}

impl LoadGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Detection engine initialization cancelled");
            self.state
                .send_replace(EngineState::Failed("initialization cancelled".into()));
        }
    }
}

/// Lazily initialized text recognizer.
pub struct DetectionEngine<D: TextDetector> {
    detector: OnceCell<Arc<D>>,
    state: watch::Sender<EngineState>,
    reading_order: ReadingOrder,
}

impl<D: TextDetector> Default for DetectionEngine<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TextDetector> DetectionEngine<D> {
    pub fn new() -> Self {
        Self::with_reading_order(&ReadingOrderConfig::default())
    }

    pub fn with_reading_order(config: &ReadingOrderConfig) -> Self {
        let (state, _) = watch::channel(EngineState::Uninitialized);
        Self {
            detector: OnceCell::new(),
            state,
            reading_order: ReadingOrder::new(config),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Load the detector with `loader` on a blocking thread.
    ///
    /// Concurrent calls share a single load. Once ready, later calls return
    /// immediately without running their loader. A failed or cancelled load
    /// leaves the engine in `Failed` and may be retried.
    #[instrument(skip_all)]
    pub async fn initialize<F>(&self, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<D> + Send + 'static,
    {
        let loaded = self
            .detector
            .get_or_try_init(|| async move {
                let guard = LoadGuard {
                    state: &self.state,
                    armed: true,
                };
                self.state.send_replace(EngineState::Initializing);
                info!("Initializing detection engine");
                let loaded = tokio::task::spawn_blocking(loader)
                    .await
                    .map_err(|err| FolioError::Internal(format!("engine loader aborted: {err}")))
                    .and_then(|result| result);
                guard.disarm();
                Ok::<_, FolioError>(Arc::new(loaded?))
            })
            .await;

        match loaded {
            Ok(detector) => {
                if !self.state.borrow().is_ready() {
                    info!(detector = detector.name(), "Detection engine ready");
                    self.state.send_replace(EngineState::Ready);
                }
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Detection engine failed to initialize");
                self.state.send_replace(EngineState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Wait for the engine to become usable.
    ///
    /// Waits while a load is in progress; fails immediately with
    /// `EngineUnavailable` if no load was started or the last one failed.
    pub async fn ready(&self) -> Result<Arc<D>> {
        let mut rx = self.state.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                EngineState::Ready => {
                    return self.detector.get().cloned().ok_or_else(|| {
                        FolioError::Internal("engine marked ready without a detector".into())
                    });
                }
                EngineState::Initializing => {
                    debug!("Waiting for detection engine");
                    rx.changed().await.map_err(|_| {
                        FolioError::Internal("engine state channel closed".into())
                    })?;
                }
                EngineState::Uninitialized => {
                    return Err(FolioError::EngineUnavailable(
                        "detection engine has not been initialized".into(),
                    ));
                }
                EngineState::Failed(reason) => {
                    return Err(FolioError::EngineUnavailable(format!(
                        "detection engine failed to initialize: {reason}"
                    )));
                }
            }
        }
    }

    /// Detect text in `image` and rebuild it in reading order.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub async fn recognize(&self, image: &DynamicImage) -> Result<ReconstructedDocument> {
        let detector = self.ready().await?;
        let image = image.clone();

        let fragments = tokio::task::spawn_blocking(move || detector.detect(&image))
            .await
            .map_err(|err| FolioError::Internal(format!("detection task aborted: {err}")))??;
        debug!(fragments = fragments.len(), "Fragments detected");

        let ordered = order_fragments(fragments);
        let document = self.reading_order.reconstruct_document(&ordered);
        info!(lines = document.lines().len(), "Recognition complete");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use image::GrayImage;

    /// Returns the same fragments for every image.
    struct FixedDetector {
        fragments: Vec<TextFragment>,
    }

    impl TextDetector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect(&self, _image: &DynamicImage) -> Result<Vec<TextFragment>> {
            Ok(self.fragments.clone())
        }
    }

    struct BrokenDetector;

    impl TextDetector for BrokenDetector {
        fn name(&self) -> &str {
            "broken"
        }

        fn detect(&self, _image: &DynamicImage) -> Result<Vec<TextFragment>> {
            Err(FolioError::OcrError("model crashed".into()))
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::new(8, 8))
    }

    /// Engine output in scrambled order: two lines of two words each.
    fn scrambled() -> FixedDetector {
        FixedDetector {
            fragments: vec![
                TextFragment::new("there", 60, 100, 50, 70),
                TextFragment::new("world", 60, 100, 0, 20),
                TextFragment::new("hello", 0, 40, 2, 22),
                TextFragment::new("hi", 0, 20, 48, 68),
            ],
        }
    }

    #[tokio::test]
    async fn uninitialized_engine_is_unavailable() {
        let engine = DetectionEngine::<FixedDetector>::new();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        let err = engine.recognize(&page()).await.unwrap_err();
        assert!(matches!(err, FolioError::EngineUnavailable(_)));
    }

    #[tokio::test]
    async fn recognize_orders_detector_output() {
        let engine = DetectionEngine::new();
        engine.initialize(|| Ok(scrambled())).await.unwrap();
        assert_eq!(engine.state(), EngineState::Ready);

        let doc = engine.recognize(&page()).await.unwrap();
        assert_eq!(doc.lines(), ["hello  world", "hi    there"]);
    }

    #[tokio::test]
    async fn failed_load_is_recorded_and_retriable() {
        let engine = DetectionEngine::<FixedDetector>::new();
        let err = engine
            .initialize(|| Err(FolioError::OcrError("missing model".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::OcrError(_)));
        assert!(matches!(engine.state(), EngineState::Failed(ref r) if r.contains("missing model")));
        assert!(matches!(engine.ready().await, Err(FolioError::EngineUnavailable(_))));

        engine.initialize(|| Ok(scrambled())).await.unwrap();
        assert!(engine.state().is_ready());
    }

    #[tokio::test]
    async fn cancelled_initialization_releases_waiters() {
        let engine = DetectionEngine::new();
        let attempt = tokio::time::timeout(
            Duration::from_millis(20),
            engine.initialize(|| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(scrambled())
            }),
        )
        .await;
        assert!(attempt.is_err(), "load should still be running at the timeout");
        assert!(matches!(engine.state(), EngineState::Failed(ref r) if r.contains("cancelled")));

        let ready = tokio::time::timeout(Duration::from_secs(2), engine.ready())
            .await
            .expect("ready() returns instead of waiting forever");
        assert!(matches!(ready, Err(FolioError::EngineUnavailable(_))));

        engine.initialize(|| Ok(scrambled())).await.unwrap();
        assert!(engine.state().is_ready());
    }

    #[tokio::test]
    async fn concurrent_initialization_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let engine = DetectionEngine::new();

        let loader = |loads: Arc<AtomicUsize>| {
            move || {
                loads.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Ok::<_, FolioError>(scrambled())
            }
        };

        let (a, b, ready) = tokio::join!(
            engine.initialize(loader(Arc::clone(&loads))),
            engine.initialize(loader(Arc::clone(&loads))),
            engine.ready(),
        );
        assert!(a.is_ok() && b.is_ok());
        assert!(ready.is_ok(), "waiter should see the shared load complete");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detector_errors_propagate() {
        let engine = DetectionEngine::new();
        engine.initialize(|| Ok(BrokenDetector)).await.unwrap();
        let err = engine.recognize(&page()).await.unwrap_err();
        assert!(matches!(err, FolioError::OcrError(_)));
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let engine = DetectionEngine::new();
        let mut rx = engine.subscribe();
        engine.initialize(|| Ok(scrambled())).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), EngineState::Ready);
    }
}
