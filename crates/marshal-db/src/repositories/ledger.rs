//! DeploymentLedger implementation for SQLite

use async_trait::async_trait;
use marshal_core::{DeployedInstance, DeploymentLedger, Error, Result, StepRecord};

use crate::models::{InstanceRow, StepRow};
use crate::Database;

/// Orders and sequence numbers are stored as SQLite integers
fn to_sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidPlan(format!("{} {} is too large", what, value)))
}

#[async_trait]
impl DeploymentLedger for Database {
    async fn last_completed(&self, network: &str) -> Result<u64> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT MAX(step_order) FROM ledger_steps WHERE network = ?")
                .bind(network)
                .fetch_one(&self.pool)
                .await?;
        Ok(last.unwrap_or(0) as u64)
    }

    async fn record_step(
        &self,
        network: &str,
        order: u64,
        step_id: &str,
        instances: &[DeployedInstance],
    ) -> Result<bool> {
        let step_order = to_sql_int(order, "step order")?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO ledger_steps (network, step_order, step_id)
            VALUES (?, ?, ?)
            ON CONFLICT(network, step_order) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(network)
        .bind(step_order)
        .bind(step_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ledger_step_id) = inserted else {
            tx.rollback().await?;
            tracing::debug!(network, order, "step already recorded");
            return Ok(false);
        };

        for (position, instance) in instances.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO deployed_instances
                    (ledger_step_id, network, step_order, position, artifact_name, binding_key,
                     address, tx_hash, deployer, confirmed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(ledger_step_id)
            .bind(network)
            .bind(step_order)
            .bind(position as i64)
            .bind(&instance.artifact)
            .bind(&instance.key)
            .bind(instance.handle.to_string())
            .bind(&instance.tx_hash)
            .bind(instance.deployer.map(|d| d.to_string()))
            .bind(to_sql_int(instance.confirmed_at, "confirmation")?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(network, order, step = step_id, instances = instances.len(), "step recorded");
        Ok(true)
    }

    async fn resolve(&self, network: &str, key: &str) -> Result<DeployedInstance> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT * FROM deployed_instances
            WHERE network = ? AND (binding_key = ? OR artifact_name = ?)
            ORDER BY binding_key = ? DESC, step_order DESC, position DESC
            LIMIT 1
            "#,
        )
        .bind(network)
        .bind(key)
        .bind(key)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| Error::not_yet_deployed(network, key))?
            .into_instance()
    }

    async fn steps(&self, network: &str) -> Result<Vec<StepRecord>> {
        let steps = sqlx::query_as::<_, StepRow>(
            "SELECT * FROM ledger_steps WHERE network = ? ORDER BY step_order",
        )
        .bind(network)
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, InstanceRow>(
            "SELECT * FROM deployed_instances WHERE network = ? ORDER BY step_order, position",
        )
        .bind(network)
        .fetch_all(&self.pool)
        .await?;

        let mut instances: Vec<(i64, DeployedInstance)> = Vec::with_capacity(rows.len());
        for row in rows {
            let step = row.ledger_step_id;
            instances.push((step, row.into_instance()?));
        }

        Ok(steps
            .into_iter()
            .map(|step| {
                let own = instances
                    .iter()
                    .filter(|(id, _)| *id == step.id)
                    .map(|(_, instance)| instance.clone())
                    .collect();
                step.into_record(own)
            })
            .collect())
    }
}
