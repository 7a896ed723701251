//! SQLite deployment ledger for Marshal
//!
//! This crate provides the [`Database`] struct which implements
//! [`DeploymentLedger`](marshal_core::DeploymentLedger) from `marshal-core`,
//! backed by SQLite. Each `record_step` runs in its own transaction and the
//! `(network, step_order)` uniqueness constraint makes re-recording a no-op.

pub mod models;
mod repositories;
mod schema;

pub use models::*;

use marshal_core::{MarshalDir, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use std::path::Path;

/// SQLite database connection and ledger implementation
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the default ledger file (.marshal/marshal.db)
    pub async fn connect() -> Result<Self> {
        Self::connect_to(&MarshalDir::new().ledger_path()).await
    }

    /// Connect to a specific database file
    pub async fn connect_to(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open a private in-memory database with the schema applied
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // A single connection, every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Check whether the default ledger file exists
    pub fn exists() -> bool {
        MarshalDir::new().ledger_path().is_file()
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        schema::init_schema(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// List recorded instances, optionally filtered by network
    pub async fn list_instances(&self, filter: InstanceFilter) -> Result<Vec<InstanceRow>> {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT * FROM deployed_instances i");

        let mut has_where = false;
        if let Some(ref network) = filter.network {
            builder.push(" WHERE i.network = ");
            builder.push_bind(network);
            has_where = true;
        }
        if filter.latest_only {
            builder.push(if has_where { " AND " } else { " WHERE " });
            builder.push(
                "i.id = (SELECT l.id FROM deployed_instances l \
                 WHERE l.network = i.network AND l.binding_key = i.binding_key \
                 ORDER BY l.step_order DESC, l.position DESC LIMIT 1)",
            );
        }

        builder.push(" ORDER BY i.network, i.step_order, i.position");

        let rows = builder
            .build_query_as::<InstanceRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_core::{Address, DeployedInstance, DeploymentLedger, Error};

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    fn instance(network: &str, key: &str, byte: u8) -> DeployedInstance {
        DeployedInstance {
            artifact: "ODAOToken".to_string(),
            key: key.to_string(),
            network: network.to_string(),
            handle: Address::repeat_byte(byte),
            tx_hash: format!("0x{:064x}", byte),
            deployer: Some(Address::repeat_byte(0xaa)),
            confirmed_at: u64::from(byte) * 10,
        }
    }

    #[tokio::test]
    async fn test_unseen_network() {
        let db = setup_test_db().await;
        assert_eq!(db.last_completed("sepolia").await.unwrap(), 0);
        assert!(db.steps("sepolia").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_and_resolve() {
        let db = setup_test_db().await;
        let token = instance("sepolia", "ODAOToken", 1);

        assert!(db
            .record_step("sepolia", 1, "token", &[token.clone()])
            .await
            .unwrap());

        assert_eq!(db.last_completed("sepolia").await.unwrap(), 1);
        assert_eq!(db.resolve("sepolia", "ODAOToken").await.unwrap(), token);
    }

    #[tokio::test]
    async fn test_record_step_twice_is_noop() {
        let db = setup_test_db().await;

        assert!(db
            .record_step("sepolia", 1, "token", &[instance("sepolia", "ODAOToken", 1)])
            .await
            .unwrap());
        assert!(!db
            .record_step("sepolia", 1, "token", &[instance("sepolia", "ODAOToken", 2)])
            .await
            .unwrap());

        let resolved = db.resolve("sepolia", "ODAOToken").await.unwrap();
        assert_eq!(resolved.handle, Address::repeat_byte(1));

        let steps = db.steps("sepolia").await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].instances.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_latest() {
        let db = setup_test_db().await;
        db.record_step("local", 1, "a", &[instance("local", "Token", 1)])
            .await
            .unwrap();
        db.record_step(
            "local",
            2,
            "b",
            &[instance("local", "Token", 2), instance("local", "Token", 3)],
        )
        .await
        .unwrap();

        let resolved = db.resolve("local", "Token").await.unwrap();
        assert_eq!(resolved.handle, Address::repeat_byte(3));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_artifact_name() {
        let db = setup_test_db().await;
        db.record_step(
            "local",
            1,
            "tokens",
            &[instance("local", "gov", 1), instance("local", "fee", 2)],
        )
        .await
        .unwrap();

        assert_eq!(
            db.resolve("local", "gov").await.unwrap().handle,
            Address::repeat_byte(1)
        );
        assert_eq!(
            db.resolve("local", "ODAOToken").await.unwrap().handle,
            Address::repeat_byte(2)
        );

        // A binding key match wins over a newer artifact name match
        db.record_step("sepolia", 1, "a", &[instance("sepolia", "ODAOToken", 3)])
            .await
            .unwrap();
        db.record_step("sepolia", 2, "b", &[instance("sepolia", "fee", 4)])
            .await
            .unwrap();
        assert_eq!(
            db.resolve("sepolia", "ODAOToken").await.unwrap().handle,
            Address::repeat_byte(3)
        );
    }

    #[tokio::test]
    async fn test_resolve_not_yet_deployed() {
        let db = setup_test_db().await;
        db.record_step("local", 1, "a", &[instance("local", "Token", 1)])
            .await
            .unwrap();

        let err = db.resolve("sepolia", "Token").await.unwrap_err();
        assert!(matches!(err, Error::NotYetDeployed { .. }));
    }

    #[tokio::test]
    async fn test_steps_group_instances() {
        let db = setup_test_db().await;
        db.record_step(
            "local",
            1,
            "tokens",
            &[instance("local", "gov", 1), instance("local", "fee", 2)],
        )
        .await
        .unwrap();
        db.record_step("local", 2, "identity", &[instance("local", "Identity", 3)])
            .await
            .unwrap();

        let steps = db.steps("local").await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_id, "tokens");
        assert_eq!(
            steps[0]
                .instances
                .iter()
                .map(|i| i.key.as_str())
                .collect::<Vec<_>>(),
            vec!["gov", "fee"]
        );
        assert_eq!(steps[1].order, 2);
        assert!(steps[1].recorded_at.is_some());
    }

    #[tokio::test]
    async fn test_record_step_without_instances() {
        let db = setup_test_db().await;
        assert!(db.record_step("local", 3, "noop", &[]).await.unwrap());
        assert_eq!(db.last_completed("local").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_instances() {
        let db = setup_test_db().await;
        db.record_step("local", 1, "a", &[instance("local", "Token", 1)])
            .await
            .unwrap();
        db.record_step("local", 2, "b", &[instance("local", "Token", 2)])
            .await
            .unwrap();
        db.record_step("sepolia", 1, "a", &[instance("sepolia", "Token", 3)])
            .await
            .unwrap();

        let all = db.list_instances(InstanceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let latest = db
            .list_instances(InstanceFilter::for_network("local"))
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].step_order, 2);

        let latest_everywhere = db
            .list_instances(InstanceFilter {
                network: None,
                latest_only: true,
            })
            .await
            .unwrap();
        assert_eq!(latest_everywhere.len(), 2);
    }

    #[tokio::test]
    async fn test_connect_to_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marshal.db");

        {
            let db = Database::connect_to(&path).await.unwrap();
            db.init_schema().await.unwrap();
            db.record_step("local", 1, "a", &[instance("local", "Token", 1)])
                .await
                .unwrap();
            db.pool().close().await;
        }

        let db = Database::connect_to(&path).await.unwrap();
        assert_eq!(db.last_completed("local").await.unwrap(), 1);
        db.pool().close().await;
    }
}
