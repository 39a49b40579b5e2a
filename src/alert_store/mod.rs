//! AlertStore - bounded alert history + latest-value cache
//!
//! ## Responsibilities
//!
//! - Assign monotonic alert ids
//! - Keep the 50 most recent non-safe alerts, newest first
//! - Keep the latest reading per sensor kind, safe readings included
//!
//! Both structures live behind one lock so a record is atomic with respect
//! to concurrent records and reads: readers always see either the state
//! before an insert or the state after it, never a partial update.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

use crate::threat_classifier::{Alert, SensorKind};

/// Maximum number of non-safe alerts retained.
pub const HISTORY_CAPACITY: usize = 50;

struct StoreInner {
    history: VecDeque<Alert>,
    latest: HashMap<SensorKind, Alert>,
    next_id: u64,
}

/// Shared alert state, written by HTTP ingestion and the camera dispatcher.
pub struct AlertStore {
    inner: RwLock<StoreInner>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                history: VecDeque::with_capacity(HISTORY_CAPACITY),
                latest: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Record a classified reading. The latest-value cache is updated for
    /// every severity; only non-safe alerts enter the history. Returns the
    /// stored alert with its assigned id.
    pub async fn record(&self, mut alert: Alert) -> Alert {
        let mut inner = self.inner.write().await;
        alert.id = inner.next_id;
        inner.next_id += 1;

        inner.latest.insert(alert.sensor, alert.clone());

        if !alert.severity.is_safe() {
            inner.history.push_front(alert.clone());
            inner.history.truncate(HISTORY_CAPACITY);
        }

        tracing::debug!(
            alert_id = alert.id,
            sensor = %alert.sensor,
            severity = ?alert.severity,
            "Alert recorded"
        );

        alert
    }

    /// The most recent non-safe alerts, newest first.
    pub async fn history(&self, limit: usize) -> Vec<Alert> {
        let inner = self.inner.read().await;
        inner.history.iter().take(limit).cloned().collect()
    }

    /// The latest reading per sensor kind, safe ones included.
    pub async fn latest(&self) -> Vec<Alert> {
        let inner = self.inner.read().await;
        inner.latest.values().cloned().collect()
    }

    /// Currently-cached alerts with non-safe severity.
    pub async fn active(&self) -> Vec<Alert> {
        let inner = self.inner.read().await;
        inner
            .latest
            .values()
            .filter(|a| !a.severity.is_safe())
            .cloned()
            .collect()
    }

    /// The single newest non-safe alert, if any.
    pub async fn latest_alert(&self) -> Option<Alert> {
        let inner = self.inner.read().await;
        inner.history.front().cloned()
    }

    /// Number of alerts currently buffered.
    pub async fn history_len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.history.len()
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat_classifier::{classify, Severity};

    #[tokio::test]
    async fn history_is_capped_and_newest_first() {
        let store = AlertStore::new();
        for i in 0..60 {
            store.record(classify(SensorKind::Gas, 900.0 + i as f64)).await;
        }

        let history = store.history(100).await;
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // the 60th record got id 60 and sits at the front
        assert_eq!(history[0].id, 60);
        assert_eq!(history[0].value, 959.0);
        // the 10 oldest were evicted
        assert_eq!(history.last().unwrap().id, 11);
    }

    #[tokio::test]
    async fn safe_alerts_never_enter_history() {
        let store = AlertStore::new();
        store.record(classify(SensorKind::Temperature, 20.0)).await;
        store.record(classify(SensorKind::Humidity, 40.0)).await;

        assert!(store.history(10).await.is_empty());
        assert!(store.latest_alert().await.is_none());
        assert!(store.history(10).await.iter().all(|a| !a.severity.is_safe()));
    }

    #[tokio::test]
    async fn latest_cache_holds_one_entry_per_kind() {
        let store = AlertStore::new();
        store.record(classify(SensorKind::Gas, 1500.0)).await;
        store.record(classify(SensorKind::Gas, 100.0)).await;
        store.record(classify(SensorKind::Temperature, 25.0)).await;

        let latest = store.latest().await;
        assert_eq!(latest.len(), 2);

        let gas = latest.iter().find(|a| a.sensor == SensorKind::Gas).unwrap();
        assert_eq!(gas.value, 100.0);
        assert_eq!(gas.severity, Severity::Safe);
    }

    #[tokio::test]
    async fn active_filters_safe_entries_out_of_the_cache() {
        let store = AlertStore::new();
        store.record(classify(SensorKind::Gas, 900.0)).await;
        store.record(classify(SensorKind::Temperature, 20.0)).await;
        store.record(classify(SensorKind::WaterLevel, 15.0)).await;

        let active = store.active().await;
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|a| !a.severity.is_safe()));
    }

    #[tokio::test]
    async fn ids_are_monotonic_across_severities() {
        let store = AlertStore::new();
        let a = store.record(classify(SensorKind::Gas, 100.0)).await;
        let b = store.record(classify(SensorKind::Gas, 1500.0)).await;
        let c = store.record(classify(SensorKind::Gas, 50.0)).await;
        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
        assert_eq!(store.latest_alert().await.unwrap().id, 2);
    }
}
