//! CameraMonitor - background camera polling and hazard assessment
//!
//! ## Responsibilities
//!
//! - Own the camera stream handle; reconnect with fixed backoff on failure
//! - Run the hazard detector over one frame per cycle
//! - Hand each cycle's verdict to the dispatcher task that drives the
//!   shared classify/record/broadcast path
//!
//! The monitor never touches the hub itself. Readings cross from the
//! monitor task to the serving context over an mpsc channel; the
//! dispatcher on the other end is the only camera-side caller of the
//! ingest pipeline, so broadcasts stay ordered and none are lost.

pub mod detector;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::alert_store::AlertStore;
use crate::ingest;
use crate::realtime_hub::RealtimeHub;
use crate::threat_classifier;

use detector::HazardDetector;
use stream::{CameraStream, Frame};

/// Wait between failed attempts to open the stream.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Wait between processed frames; bounds the inference rate.
pub const CYCLE_DELAY: Duration = Duration::from_secs(1);

const READING_CHANNEL_CAPACITY: usize = 32;

/// One camera cycle's verdict, handed across to the dispatcher.
#[derive(Debug, Clone)]
pub struct CameraReading {
    pub hazardous: bool,
    pub score: f64,
}

/// CameraMonitor instance
pub struct CameraMonitor {
    client: reqwest::Client,
    url: String,
    detector: Arc<dyn HazardDetector>,
}

impl CameraMonitor {
    pub fn new(url: String, detector: Arc<dyn HazardDetector>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url,
            detector,
        }
    }

    /// Spawn the monitor loop and its dispatcher.
    pub fn spawn(self, store: Arc<AlertStore>, hub: Arc<RealtimeHub>) {
        let (tx, rx) = mpsc::channel(READING_CHANNEL_CAPACITY);
        tokio::spawn(dispatch_readings(rx, store, hub));
        tokio::spawn(self.run(tx));
    }

    /// Monitor loop. Runs for the process lifetime: stream failures are
    /// logged and retried, never fatal.
    async fn run(self, tx: mpsc::Sender<CameraReading>) {
        tracing::info!(url = %self.url, detector = self.detector.name(), "Starting camera monitor");

        loop {
            let mut stream = match CameraStream::connect(self.client.clone(), &self.url).await {
                Ok(stream) => {
                    tracing::info!(url = %self.url, "Camera stream connected");
                    stream
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "Camera stream unavailable, retrying");
                    sleep(RECONNECT_BACKOFF).await;
                    continue;
                }
            };

            loop {
                match stream.next_frame().await {
                    Ok(frame) => {
                        let reading = self.assess_frame(frame).await;
                        if tx.send(reading).await.is_err() {
                            tracing::error!("Reading dispatcher gone, stopping camera monitor");
                            return;
                        }
                        sleep(CYCLE_DELAY).await;
                    }
                    Err(e) => {
                        tracing::warn!(url = %self.url, error = %e, "Frame read failed, reconnecting");
                        break;
                    }
                }
            }
        }
    }

    /// Assess one frame. Detector failures are downgraded to a safe
    /// reading for this cycle; inference runs off the async runtime.
    async fn assess_frame(&self, frame: Frame) -> CameraReading {
        let detector = self.detector.clone();
        let result = tokio::task::spawn_blocking(move || detector.assess(&frame)).await;

        match result {
            Ok(Ok(assessment)) => {
                if assessment.hazardous {
                    tracing::warn!(
                        detector = self.detector.name(),
                        score = assessment.score,
                        detections = assessment.detections.len(),
                        "Camera hazard detected"
                    );
                }
                CameraReading {
                    hazardous: assessment.hazardous,
                    score: assessment.score,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    detector = self.detector.name(),
                    error = %e,
                    "Detector failed, treating frame as safe"
                );
                CameraReading {
                    hazardous: false,
                    score: 0.0,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Detector task aborted, treating frame as safe");
                CameraReading {
                    hazardous: false,
                    score: 0.0,
                }
            }
        }
    }
}

/// Drain camera readings on the serving side and push each one through
/// the shared ingest pipeline.
async fn dispatch_readings(
    mut rx: mpsc::Receiver<CameraReading>,
    store: Arc<AlertStore>,
    hub: Arc<RealtimeHub>,
) {
    while let Some(reading) = rx.recv().await {
        let alert = threat_classifier::camera_alert(reading.hazardous, reading.score);
        ingest::publish_alert(&store, &hub, alert).await;
    }

    tracing::info!("Camera reading channel closed, dispatcher exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat_classifier::{SensorKind, Severity};

    #[tokio::test]
    async fn dispatched_hazard_reaches_store_and_observers() {
        let store = Arc::new(AlertStore::new());
        let hub = Arc::new(RealtimeHub::new());
        let (_id, mut observer) = hub.register().await;

        let (tx, rx) = mpsc::channel(4);
        let dispatcher = tokio::spawn(dispatch_readings(rx, store.clone(), hub.clone()));

        tx.send(CameraReading {
            hazardous: true,
            score: 0.93,
        })
        .await
        .unwrap();
        tx.send(CameraReading {
            hazardous: false,
            score: 0.0,
        })
        .await
        .unwrap();
        drop(tx);
        dispatcher.await.unwrap();

        let history = store.history(10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sensor, SensorKind::Camera);
        assert_eq!(history[0].severity, Severity::Critical);

        // cache reflects the later safe cycle, history keeps the hazard
        let latest = store.latest().await;
        let camera = latest
            .iter()
            .find(|a| a.sensor == SensorKind::Camera)
            .unwrap();
        assert_eq!(camera.severity, Severity::Safe);

        let first: serde_json::Value =
            serde_json::from_str(&observer.recv().await.unwrap()).unwrap();
        assert_eq!(first["sensor"], "camera");
        assert_eq!(first["threat_level"], "critical");
        assert_eq!(first["alert"]["title"], "CAMERA HAZARD DETECTED");

        let second: serde_json::Value =
            serde_json::from_str(&observer.recv().await.unwrap()).unwrap();
        assert_eq!(second["threat_level"], "safe");
        assert!(second.get("alert").is_none());
    }
}
