//! SQLite-backed [`PreferenceStore`].

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::error::ErrorKind;

use qm_core::store::{DefaultsUpdate, PreferenceStore, StoreError, UserDefaults};

/// Durable store for user defaults and server ownership.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl PreferenceStore for SqliteStore {
    async fn defaults(&self, user_id: &str) -> Result<UserDefaults, StoreError> {
        let row: Option<(Option<i64>, Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT network_id, ssh_key_id, firewall_id FROM user_defaults WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(match row {
            Some((network_id, ssh_key_id, firewall_id)) => UserDefaults {
                network_id,
                ssh_key_id,
                firewall_id,
            },
            None => UserDefaults::default(),
        })
    }

    async fn set_defaults(
        &self,
        user_id: &str,
        update: &DefaultsUpdate,
    ) -> Result<UserDefaults, StoreError> {
        // COALESCE keeps the stored value wherever the update is NULL.
        let (network_id, ssh_key_id, firewall_id): (Option<i64>, Option<i64>, Option<i64>) =
            sqlx::query_as(
                "INSERT INTO user_defaults (user_id, network_id, ssh_key_id, firewall_id)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                     network_id = COALESCE(excluded.network_id, user_defaults.network_id),
                     ssh_key_id = COALESCE(excluded.ssh_key_id, user_defaults.ssh_key_id),
                     firewall_id = COALESCE(excluded.firewall_id, user_defaults.firewall_id)
                 RETURNING network_id, ssh_key_id, firewall_id",
            )
            .bind(user_id)
            .bind(update.network_id)
            .bind(update.ssh_key_id)
            .bind(update.firewall_id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok(UserDefaults {
            network_id,
            ssh_key_id,
            firewall_id,
        })
    }

    async fn record_ownership(
        &self,
        user_id: &str,
        server_name: &str,
        server_id: i64,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("INSERT INTO server_map (user_id, server_id, server_name) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(server_id)
                .bind(server_name)
                .execute(&self.pool)
                .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.kind() == ErrorKind::UniqueViolation => {
                Err(StoreError::DuplicateName(server_name.to_string()))
            }
            Err(e) => Err(backend(e)),
        }
    }

    // A name match wins; only then is a numeric query tried as an ID.
    async fn find_server(&self, user_id: &str, query: &str) -> Result<Option<i64>, StoreError> {
        let query = query.trim();
        let by_name: Option<i64> = sqlx::query_scalar(
            "SELECT server_id FROM server_map WHERE user_id = ? AND server_name = ?",
        )
        .bind(user_id)
        .bind(query)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        if by_name.is_some() {
            return Ok(by_name);
        }

        let Ok(id) = query.parse::<i64>() else {
            return Ok(None);
        };
        sqlx::query_scalar("SELECT server_id FROM server_map WHERE user_id = ? AND server_id = ?")
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use super::*;

    // One connection only: every :memory: connection is its own database.
    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:").unwrap())
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn defaults_start_unset() {
        let store = memory_store().await;
        assert_eq!(store.defaults("u1").await.unwrap(), UserDefaults::default());
    }

    #[tokio::test]
    async fn partial_update_preserves_other_fields() {
        let store = memory_store().await;
        store
            .set_defaults(
                "u1",
                &DefaultsUpdate {
                    network_id: Some(10),
                    ssh_key_id: Some(20),
                    firewall_id: None,
                },
            )
            .await
            .unwrap();

        let merged = store
            .set_defaults(
                "u1",
                &DefaultsUpdate {
                    firewall_id: Some(30),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(merged.network_id, Some(10));
        assert_eq!(merged.ssh_key_id, Some(20));
        assert_eq!(merged.firewall_id, Some(30));

        let reread = store.defaults("u1").await.unwrap();
        assert_eq!(reread, merged);
    }

    #[tokio::test]
    async fn duplicate_name_for_same_user_is_rejected() {
        let store = memory_store().await;
        store.record_ownership("u1", "WEB", 1).await.unwrap();

        let err = store.record_ownership("u1", "WEB", 2).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateName("WEB".into()));
    }

    #[tokio::test]
    async fn same_name_under_another_user_is_fine() {
        let store = memory_store().await;
        store.record_ownership("u1", "WEB", 1).await.unwrap();
        store.record_ownership("u2", "WEB", 2).await.unwrap();

        assert_eq!(store.find_server("u1", "WEB").await.unwrap(), Some(1));
        assert_eq!(store.find_server("u2", "WEB").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn lookup_by_name_id_and_trimmed_input() {
        let store = memory_store().await;
        store.record_ownership("u1", "WEB", 42).await.unwrap();

        assert_eq!(store.find_server("u1", "WEB").await.unwrap(), Some(42));
        assert_eq!(store.find_server("u1", "42").await.unwrap(), Some(42));
        assert_eq!(store.find_server("u1", "  WEB  ").await.unwrap(), Some(42));
        assert_eq!(store.find_server("u1", "GONE").await.unwrap(), None);
        assert_eq!(store.find_server("u2", "WEB").await.unwrap(), None);
    }

    #[tokio::test]
    async fn numeric_looking_name_beats_id_interpretation() {
        let store = memory_store().await;
        store.record_ownership("u1", "123", 7).await.unwrap();
        store.record_ownership("u1", "OTHER", 123).await.unwrap();

        assert_eq!(store.find_server("u1", "123").await.unwrap(), Some(7));
    }
}
