//! Satwa Sentinel Library
//!
//! Hazard telemetry server for distributed field sensors.
//!
//! ## Architecture
//!
//! 1. ThreatClassifier - severity tiers for raw readings
//! 2. AlertStore - bounded alert history + latest-value cache
//! 3. RealtimeHub - WebSocket fan-out to dashboard observers
//! 4. CameraMonitor - camera polling + visual hazard detection
//! 5. PositionRegistry - sensor placement CRUD
//! 6. WebAPI - REST + WebSocket endpoints
//!
//! Readings from HTTP sensors and the camera monitor flow through the same
//! pipeline: classify, record, broadcast.

pub mod alert_store;
pub mod camera_monitor;
pub mod error;
pub mod ingest;
pub mod position_registry;
pub mod realtime_hub;
pub mod state;
pub mod threat_classifier;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
