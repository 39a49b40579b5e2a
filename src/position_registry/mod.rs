//! PositionRegistry - sensor placement CRUD
//!
//! Named sensor positions (map pins for the dashboard) persisted in
//! SQLite. Schema is created on startup; alert state itself is never
//! persisted here, only where sensors live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// One placed sensor.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorPosition {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub sensor_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePositionRequest {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub sensor_type: String,
}

/// PositionRegistry instance
pub struct PositionRegistry {
    pool: SqlitePool,
}

impl PositionRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_positions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                sensor_type TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Sensor position table ready");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<SensorPosition>> {
        let positions = sqlx::query_as::<_, SensorPosition>(
            "SELECT id, name, lat, lng, sensor_type, created_at FROM sensor_positions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(positions)
    }

    pub async fn create(&self, req: CreatePositionRequest) -> Result<SensorPosition> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO sensor_positions (name, lat, lng, sensor_type, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&req.name)
        .bind(req.lat)
        .bind(req.lng)
        .bind(&req.sensor_type)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(SensorPosition {
            id: result.last_insert_rowid(),
            name: req.name,
            lat: req.lat,
            lng: req.lng,
            sensor_type: req.sensor_type,
            created_at,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM sensor_positions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("position {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_registry() -> PositionRegistry {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let registry = PositionRegistry::new(pool);
        registry.init().await.unwrap();
        registry
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let registry = memory_registry().await;

        let created = registry
            .create(CreatePositionRequest {
                name: "river gate".to_string(),
                lat: -6.2088,
                lng: 106.8456,
                sensor_type: "water_level".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let positions = registry.list().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].name, "river gate");
        assert_eq!(positions[0].sensor_type, "water_level");
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let registry = memory_registry().await;
        let created = registry
            .create(CreatePositionRequest {
                name: "kitchen".to_string(),
                lat: 0.0,
                lng: 0.0,
                sensor_type: "gas".to_string(),
            })
            .await
            .unwrap();

        registry.delete(created.id).await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_position_is_not_found() {
        let registry = memory_registry().await;
        match registry.delete(99).await {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
