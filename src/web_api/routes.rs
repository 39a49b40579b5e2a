//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::ingest;
use crate::position_registry::CreatePositionRequest;
use crate::state::AppState;
use crate::threat_classifier::SensorKind;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/system/status", get(system_status))
        // Sensor ingestion
        .route("/sensor/temperature", post(submit_temperature))
        .route("/sensor/humidity", post(submit_humidity))
        .route("/sensor/gas", post(submit_gas))
        .route("/sensor/water-level", post(submit_water_level))
        // Alert queries
        .route("/sensors/latest", get(all_latest))
        .route("/alerts", get(alert_history))
        .route("/alerts/latest", get(latest_alert))
        .route("/alerts/active", get(active_alerts))
        // Sensor positions
        .route("/positions", get(list_positions))
        .route("/positions", post(create_position))
        .route("/positions/:id", delete(delete_position))
        // WebSocket
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// Sensor Ingestion Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct ValueOnly {
    value: f64,
}

async fn submit_reading(state: AppState, sensor: SensorKind, value: f64) -> Response {
    if !value.is_finite() {
        return Error::Validation(format!("{sensor} reading must be a finite number"))
            .into_response();
    }

    ingest::process_reading(&state.store, &state.realtime, sensor, value).await;
    Json(json!({"status": "ok"})).into_response()
}

async fn submit_temperature(
    State(state): State<AppState>,
    Json(body): Json<ValueOnly>,
) -> Response {
    submit_reading(state, SensorKind::Temperature, body.value).await
}

async fn submit_humidity(State(state): State<AppState>, Json(body): Json<ValueOnly>) -> Response {
    submit_reading(state, SensorKind::Humidity, body.value).await
}

async fn submit_gas(State(state): State<AppState>, Json(body): Json<ValueOnly>) -> Response {
    submit_reading(state, SensorKind::Gas, body.value).await
}

async fn submit_water_level(
    State(state): State<AppState>,
    Json(body): Json<ValueOnly>,
) -> Response {
    submit_reading(state, SensorKind::WaterLevel, body.value).await
}

// ========================================
// Alert Query Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    20
}

/// Latest reading per sensor kind, safe ones included.
async fn all_latest(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.latest().await)
}

/// Most recent non-safe alerts, newest first.
async fn alert_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    Json(state.store.history(query.limit).await)
}

/// The single most recent alert, or an explicit no-alerts marker.
async fn latest_alert(State(state): State<AppState>) -> Response {
    match state.store.latest_alert().await {
        Some(alert) => Json(alert).into_response(),
        None => Json(json!({"message": "No alerts"})).into_response(),
    }
}

/// Currently-cached alerts with non-safe severity.
async fn active_alerts(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.active().await)
}

// ========================================
// Sensor Position Handlers
// ========================================

async fn list_positions(State(state): State<AppState>) -> Response {
    match state.positions.list().await {
        Ok(positions) => Json(positions).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn create_position(
    State(state): State<AppState>,
    Json(req): Json<CreatePositionRequest>,
) -> Response {
    match state.positions.create(req).await {
        Ok(position) => (StatusCode::CREATED, Json(position)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_position(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.positions.delete(id).await {
        Ok(()) => Json(json!({"status": "deleted"})).into_response(),
        Err(e) => e.into_response(),
    }
}

// ========================================
// System Status
// ========================================

async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.system_health.read().await.clone();

    Json(json!({
        "cpu_percent": health.cpu_percent,
        "memory_percent": health.memory_percent,
        "observers": state.realtime.connection_count(),
        "alerts_buffered": state.store.history_len().await,
    }))
}

// ========================================
// WebSocket
// ========================================

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle one observer connection.
///
/// Observer frames carry no commands; the read side only notices the
/// close. Either direction ending unregisters the connection.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut rx) = state.realtime.register().await;

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Drain observer frames until the socket closes
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    state.realtime.unregister(&conn_id).await;
}
