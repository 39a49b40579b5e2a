//! Application state
//!
//! Holds configuration and the shared components handlers work against.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::alert_store::AlertStore;
use crate::position_registry::PositionRegistry;
use crate::realtime_hub::RealtimeHub;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database URL
    pub database_url: String,
    /// Camera stream or snapshot URL
    pub camera_url: String,
    /// ONNX hazard model path
    pub model_path: PathBuf,
    /// Label file for the hazard model (one label per line)
    pub model_labels: PathBuf,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// Frontend directory served as fallback
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://sentinel.db?mode=rwc".to_string()),
            camera_url: std::env::var("CAMERA_URL")
                .unwrap_or_else(|_| "http://10.10.168.105:4747/video".to_string()),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("fire_model.onnx")),
            model_labels: std::env::var("MODEL_LABELS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("fire_model.labels")),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub pool: SqlitePool,
    /// Application config
    pub config: AppConfig,
    /// AlertStore (bounded history + latest-value cache)
    pub store: Arc<AlertStore>,
    /// RealtimeHub (WebSocket fan-out)
    pub realtime: Arc<RealtimeHub>,
    /// PositionRegistry (sensor placement CRUD)
    pub positions: Arc<PositionRegistry>,
    /// System health status
    pub system_health: Arc<RwLock<SystemHealth>>,
}

/// System health metrics
#[derive(Debug, Clone, Default)]
pub struct SystemHealth {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

impl SystemHealth {
    pub fn update(&mut self, cpu: f32, memory: f32) {
        self.cpu_percent = cpu;
        self.memory_percent = memory;
    }
}
