//! The orchestration loop: capture, throttle, classify, stabilize, select,
//! publish. Every fault the loop can see is recoverable; it runs until told
//! to shut down.

use crate::camera::CameraHub;
use crate::classify::{ClassifyError, EmotionClassifier, RawObservation};
use crate::respond::{JokeSource, ResponseSelector};
use crate::stabilize::{EmotionStabilizer, Observation};
use crate::state::StableState;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

const NO_FRAME_DELAY: Duration = Duration::from_millis(100);
const SKIP_DELAY: Duration = Duration::from_millis(50);
const SAMPLE_DELAY: Duration = Duration::from_millis(200);

/// Decides which frames are worth a classifier call. The counter starts at
/// one, so with interval 15 the first sampled frame is frame 15.
pub struct FrameThrottle {
    interval: u32,
    count: u64,
}

impl FrameThrottle {
    pub fn new(interval: u32) -> Self {
        assert!(interval > 0, "interval must be > 0");
        Self { interval, count: 0 }
    }

    /// Counts one captured frame; true means submit it to the classifier.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        self.count % u64::from(self.interval) == 0
    }
}

pub struct MirrorSession<C, J> {
    camera: CameraHub,
    classifier: C,
    selector: ResponseSelector<J>,
    throttle: FrameThrottle,
    stabilizer: EmotionStabilizer,
    publisher: watch::Sender<StableState>,
}

impl<C, J> MirrorSession<C, J>
where
    C: EmotionClassifier,
    J: JokeSource,
{
    pub fn new(
        camera: CameraHub,
        classifier: C,
        selector: ResponseSelector<J>,
        sample_interval: u32,
        window_size: usize,
        confidence_threshold: f32,
    ) -> (Self, watch::Receiver<StableState>) {
        let (publisher, snapshot) = watch::channel(StableState::detecting());
        (
            Self {
                camera,
                classifier,
                selector,
                throttle: FrameThrottle::new(sample_interval),
                stabilizer: EmotionStabilizer::new(window_size, confidence_threshold),
                publisher,
            },
            snapshot,
        )
    }

    /// Runs until `shutdown` flips to true. Never returns early: frame read
    /// failures skip the tick, classification failures downgrade the
    /// published snapshot to the no-face sentinel.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let Some(frame) = self.camera.latest_frame() else {
                tokio::time::sleep(NO_FRAME_DELAY).await;
                continue;
            };

            if !self.throttle.tick() {
                tokio::time::sleep(SKIP_DELAY).await;
                continue;
            }

            let observation = match frame.to_jpeg() {
                Ok(jpeg) => self.classifier.classify(jpeg).await,
                Err(e) => {
                    warn!(error = %e, "frame encode failed, skipping tick");
                    tokio::time::sleep(SKIP_DELAY).await;
                    continue;
                }
            };
            self.process(observation).await;

            tokio::time::sleep(SAMPLE_DELAY).await;
        }
    }

    /// One sampled tick. A classifier error is the same as a gate rejection:
    /// the snapshot downgrades to the sentinel and the loop moves on.
    async fn process(&mut self, observation: Result<RawObservation, ClassifyError>) {
        let raw = match observation {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "classification failed");
                RawObservation::none()
            }
        };

        match self.stabilizer.observe(&raw) {
            Observation::Rejected => {
                self.publisher.send_replace(StableState::no_face());
            }
            Observation::Stable { emotion, changed } => {
                let previous_joke = self.publisher.borrow().joke.clone();
                let reading = self.selector.select(emotion, changed, &previous_joke).await;
                self.publisher
                    .send_replace(StableState::from_reading(emotion, reading));
            }
        }
    }
}
