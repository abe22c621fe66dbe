//! Pluggable persistence for [`SwapState`], kept optional so a caller is
//! never forced to run a database just to relay swaps. The in-memory
//! implementation is the default and is always available; a Postgres-backed
//! one is gated behind the `persistence` feature, following a pattern of
//! hand-written query functions over `sqlx` rather than an ORM.
//!
//! The [`OrderManager`](crate::manager::OrderManager) treats its own
//! in-process indexes as the source of truth and the store as a
//! write-behind mirror: a store failure is surfaced through
//! [`OrderError::Storage`] but never rolls back or blocks the in-memory
//! transition, so a transient database outage degrades persistence, not
//! availability.

use async_trait::async_trait;
use relayer_model::{OrderId, SwapState};

use crate::error::OrderError;

/// Recovers and mirrors [`SwapState`] across restarts.
///
/// Implementations must make `upsert` safe to call repeatedly with the same
/// `SwapState` (the manager calls it after every transition, not just once),
/// and `load_all` must return every non-deleted order so the manager can
/// rebuild its indexes on startup without missing or duplicating a
/// `TxConfirmed`-driven transition.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<SwapState>, OrderError>;
    async fn upsert(&self, state: &SwapState) -> Result<(), OrderError>;
    async fn delete(&self, order_id: OrderId) -> Result<(), OrderError>;
}

/// Default store: keeps no state of its own across process restarts. Used
/// when no persistence backend is configured, so the crate works fully
/// in-memory for tests and for deployments that accept losing in-flight
/// swaps on restart.
#[derive(Debug, Default)]
pub struct NullStateStore;

#[async_trait]
impl StateStore for NullStateStore {
    async fn load_all(&self) -> Result<Vec<SwapState>, OrderError> {
        Ok(Vec::new())
    }

    async fn upsert(&self, _state: &SwapState) -> Result<(), OrderError> {
        Ok(())
    }

    async fn delete(&self, _order_id: OrderId) -> Result<(), OrderError> {
        Ok(())
    }
}

#[cfg(feature = "persistence")]
pub use postgres::PostgresStateStore;

#[cfg(feature = "persistence")]
mod postgres {
    use async_trait::async_trait;
    use relayer_model::{OrderId, SwapState};
    use sqlx::{PgPool, Row};

    use super::StateStore;
    use crate::error::OrderError;

    /// Persists [`SwapState`] as a single JSONB column keyed by `order_id`,
    /// using hand-written queries rather than an ORM, while avoiding a wide
    /// relational schema for a type whose shape (nested `Vec<TxRef>`,
    /// `Vec<PartialFillState>`) does not benefit from per-column storage -
    /// nothing in the core queries `SwapState` by anything other than
    /// `order_id`, the indexes in `OrderManager` are rebuilt from
    /// `load_all` on startup.
    pub struct PostgresStateStore {
        pool: PgPool,
    }

    impl PostgresStateStore {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        /// Creates the backing table if it does not already exist. Callers
        /// that manage their own migrations can skip this and create the
        /// table themselves with the same shape.
        pub async fn ensure_schema(&self) -> Result<(), OrderError> {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS swap_states (
                    order_id TEXT PRIMARY KEY,
                    status TEXT NOT NULL,
                    body JSONB NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL
                )
                "#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?;
            Ok(())
        }
    }

    #[async_trait]
    impl StateStore for PostgresStateStore {
        async fn load_all(&self) -> Result<Vec<SwapState>, OrderError> {
            let rows = sqlx::query("SELECT body FROM swap_states")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| OrderError::Storage(e.to_string()))?;
            rows.into_iter()
                .map(|row| {
                    let body: serde_json::Value = row.try_get("body").map_err(|e| OrderError::Storage(e.to_string()))?;
                    serde_json::from_value(body).map_err(|e| OrderError::Storage(e.to_string()))
                })
                .collect()
        }

        async fn upsert(&self, state: &SwapState) -> Result<(), OrderError> {
            let body = serde_json::to_value(state).map_err(|e| OrderError::Storage(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO swap_states (order_id, status, body, updated_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (order_id) DO UPDATE
                SET status = EXCLUDED.status, body = EXCLUDED.body, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(state.order_id.to_string())
            .bind(format!("{:?}", state.status))
            .bind(body)
            .bind(state.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| OrderError::Storage(e.to_string()))?;
            Ok(())
        }

        async fn delete(&self, order_id: OrderId) -> Result<(), OrderError> {
            sqlx::query("DELETE FROM swap_states WHERE order_id = $1")
                .bind(order_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| OrderError::Storage(e.to_string()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_store_round_trips_to_empty() {
        let store = NullStateStore;
        assert!(store.load_all().await.unwrap().is_empty());
        store.delete(OrderId::ZERO).await.unwrap();
    }
}
