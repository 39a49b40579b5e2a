//! Shared reading pipeline: classify, record, broadcast.
//!
//! Both producers drive the same path through here - the HTTP sensor
//! endpoints and the camera dispatcher - so every reading reaches the
//! store and the observers the same way.

use crate::alert_store::AlertStore;
use crate::realtime_hub::{RealtimeHub, SensorMessage};
use crate::threat_classifier::{self, Alert, SensorKind};

/// Classify a raw reading and push it downstream.
pub async fn process_reading(
    store: &AlertStore,
    hub: &RealtimeHub,
    sensor: SensorKind,
    value: f64,
) -> Alert {
    let alert = threat_classifier::classify(sensor, value);
    publish_alert(store, hub, alert).await
}

/// Record an already-classified alert and broadcast the resulting state.
pub async fn publish_alert(store: &AlertStore, hub: &RealtimeHub, alert: Alert) -> Alert {
    let alert = store.record(alert).await;
    hub.broadcast(&SensorMessage::from_alert(&alert)).await;

    tracing::info!(
        alert_id = alert.id,
        sensor = %alert.sensor,
        severity = ?alert.severity,
        value = alert.value,
        "Reading processed"
    );

    alert
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat_classifier::Severity;

    #[tokio::test]
    async fn warning_reading_reaches_active_set_and_observers() {
        let store = AlertStore::new();
        let hub = RealtimeHub::new();
        let (_id, mut rx) = hub.register().await;

        process_reading(&store, &hub, SensorKind::Gas, 900.0).await;

        let active = store.active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].severity, Severity::Warning);

        let frame = rx.recv().await.expect("observer should receive the broadcast");
        let msg: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(msg["sensor"], "gas");
        assert_eq!(msg["value"], 900.0);
        assert_eq!(msg["threat_level"], "warning");
        assert_eq!(msg["alert"]["severity"], "warning");
        assert_eq!(msg["alert"]["sensor"], "gas");
    }

    #[tokio::test]
    async fn critical_reading_leads_history_and_safe_updates_cache_only() {
        let store = AlertStore::new();
        let hub = RealtimeHub::new();

        process_reading(&store, &hub, SensorKind::Gas, 900.0).await;
        process_reading(&store, &hub, SensorKind::Gas, 1500.0).await;
        process_reading(&store, &hub, SensorKind::Temperature, 20.0).await;

        let history = store.history(20).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].severity, Severity::Critical);
        assert_eq!(history[0].value, 1500.0);

        // the safe temperature reading updated the cache but not the history
        let latest = store.latest().await;
        let temp = latest
            .iter()
            .find(|a| a.sensor == SensorKind::Temperature)
            .expect("cache should hold the temperature reading");
        assert_eq!(temp.severity, Severity::Safe);
        assert!(history.iter().all(|a| a.sensor != SensorKind::Temperature));
    }
}
