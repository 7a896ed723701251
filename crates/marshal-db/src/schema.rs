use sqlx::SqlitePool;

use marshal_core::Error;

/// SQL schema for initializing the ledger database
pub const SCHEMA: &str = r#"
-- Completed migration steps, one row per (network, order)
CREATE TABLE IF NOT EXISTS ledger_steps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    network TEXT NOT NULL,
    step_order INTEGER NOT NULL,
    step_id TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(network, step_order)
);

-- Instances produced by completed steps
CREATE TABLE IF NOT EXISTS deployed_instances (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ledger_step_id INTEGER NOT NULL REFERENCES ledger_steps(id),
    network TEXT NOT NULL,
    step_order INTEGER NOT NULL,
    position INTEGER NOT NULL,
    artifact_name TEXT NOT NULL,
    binding_key TEXT NOT NULL,
    address TEXT NOT NULL,
    tx_hash TEXT NOT NULL,
    deployer TEXT,
    confirmed_at INTEGER NOT NULL,
    UNIQUE(ledger_step_id, position)
);

CREATE INDEX IF NOT EXISTS idx_instances_network_key ON deployed_instances(network, binding_key);
CREATE INDEX IF NOT EXISTS idx_instances_network_artifact ON deployed_instances(network, artifact_name);
"#;

/// Initialize the database schema
pub async fn init_schema(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
