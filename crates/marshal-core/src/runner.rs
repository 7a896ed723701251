//! Migration execution engine.
//!
//! The runner walks a [`MigrationPlan`] against one network:
//!
//! `Idle -> Loading -> Executing(step) -> Recording(step) -> ... -> Complete`
//!
//! or ends in `Failed(step, cause)`. A step is recorded in the ledger only
//! after every one of its actions has been confirmed, so a failed or
//! cancelled run always resumes from the first action of the step it stopped
//! in.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::artifact::{ArtifactSpec, ArtifactStore};
use crate::deployer::Deployer;
use crate::error::{Error, Result};
use crate::ledger::DeploymentLedger;
use crate::migration::{DeployAction, MigrationPlan, MigrationStep};
use crate::network::NetworkContext;
use crate::types::{Address, ArgValue, DeployedInstance, ResolvedArg, RunState};

/// Options narrowing a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after the step with this order
    pub target: Option<u64>,
}

/// Outcome of one executed step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub order: u64,
    pub id: String,
    pub instances: Vec<DeployedInstance>,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub network: String,
    /// Last completed order before the run started
    pub resumed_from: u64,
    /// Last completed order after the run
    pub last_completed: u64,
    pub steps: Vec<StepOutcome>,
}

impl RunReport {
    pub fn deployments(&self) -> usize {
        self.steps.iter().map(|step| step.instances.len()).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Drives a migration plan against a single network
pub struct MigrationRunner<'a> {
    artifacts: &'a dyn ArtifactStore,
    deployer: &'a dyn Deployer,
    ledger: &'a dyn DeploymentLedger,
    state: RunState,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        artifacts: &'a dyn ArtifactStore,
        deployer: &'a dyn Deployer,
        ledger: &'a dyn DeploymentLedger,
    ) -> Self {
        Self {
            artifacts,
            deployer,
            ledger,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Execute every pending step of `plan` on `ctx`'s network
    pub async fn run(
        &mut self,
        plan: &MigrationPlan,
        ctx: &NetworkContext,
        options: RunOptions,
    ) -> Result<RunReport> {
        match self.execute(plan, ctx, options).await {
            Ok(report) => {
                self.transition(ctx, RunState::Complete);
                tracing::info!(
                    network = %ctx.name,
                    steps = report.steps.len(),
                    deployments = report.deployments(),
                    last_completed = report.last_completed,
                    "migration run complete"
                );
                Ok(report)
            }
            Err(err) => {
                let order = match &err {
                    Error::StepFailed { order, .. } => Some(*order),
                    _ => None,
                };
                self.transition(
                    ctx,
                    RunState::Failed {
                        order,
                        cause: err.cause().to_string(),
                    },
                );
                tracing::error!(network = %ctx.name, error = %err, "migration run failed");
                Err(err)
            }
        }
    }

    /// Pending steps after preflight checks, without deploying anything
    pub async fn plan(
        &mut self,
        plan: &MigrationPlan,
        ctx: &NetworkContext,
        options: RunOptions,
    ) -> Result<Vec<MigrationStep>> {
        self.transition(ctx, RunState::Loading);
        let last_completed = self.ledger.last_completed(&ctx.name).await?;
        let pending = plan.pending(last_completed, options.target);
        if let Err(err) = self.preflight(&pending, ctx).await {
            self.transition(
                ctx,
                RunState::Failed {
                    order: None,
                    cause: err.to_string(),
                },
            );
            return Err(err);
        }
        self.transition(ctx, RunState::Idle);
        Ok(pending.into_iter().cloned().collect())
    }

    async fn execute(
        &mut self,
        plan: &MigrationPlan,
        ctx: &NetworkContext,
        options: RunOptions,
    ) -> Result<RunReport> {
        self.transition(ctx, RunState::Loading);

        let resumed_from = self.ledger.last_completed(&ctx.name).await?;
        let pending = plan.pending(resumed_from, options.target);
        let mut report = RunReport {
            network: ctx.name.clone(),
            resumed_from,
            last_completed: resumed_from,
            steps: Vec::new(),
        };

        if pending.is_empty() {
            tracing::info!(network = %ctx.name, last_completed = resumed_from, "network is up to date");
            return Ok(report);
        }

        let specs = self.preflight(&pending, ctx).await?;
        tracing::info!(
            network = %ctx.name,
            resumed_from,
            pending = pending.len(),
            "starting migration run"
        );

        let mut produced = Produced::default();

        for step in pending {
            self.transition(ctx, RunState::Executing { order: step.order });

            let instances = self
                .execute_step(step, &specs, &mut produced, ctx)
                .await
                .map_err(|source| step_failed(step, source))?;

            self.transition(ctx, RunState::Recording { order: step.order });
            let recorded = self
                .ledger
                .record_step(&ctx.name, step.order, &step.id, &instances)
                .await
                .map_err(|source| step_failed(step, source))?;
            if !recorded {
                tracing::warn!(
                    network = %ctx.name,
                    order = step.order,
                    step = %step.id,
                    "step was already recorded by another run"
                );
            }

            report.last_completed = step.order;
            report.steps.push(StepOutcome {
                order: step.order,
                id: step.id.clone(),
                instances,
            });
        }

        Ok(report)
    }

    async fn execute_step(
        &self,
        step: &MigrationStep,
        specs: &HashMap<String, Arc<ArtifactSpec>>,
        produced: &mut Produced,
        ctx: &NetworkContext,
    ) -> Result<Vec<DeployedInstance>> {
        let mut instances = Vec::with_capacity(step.actions.len());

        for action in &step.actions {
            let spec = match specs.get(&action.artifact) {
                Some(spec) => spec.clone(),
                None => self.artifacts.resolve(&action.artifact)?,
            };
            let args = self.resolve_args(step, action, produced, ctx).await?;

            tracing::info!(
                network = %ctx.name,
                order = step.order,
                artifact = %action.artifact,
                args = %render_args(&args),
                "deploying"
            );

            let instance = self
                .deployer
                .deploy(&spec, &args, ctx)
                .await?
                .bound_to(action.key());

            tracing::info!(
                network = %ctx.name,
                artifact = %instance.artifact,
                key = %instance.key,
                address = %instance.handle,
                confirmed_at = instance.confirmed_at,
                "deployed"
            );

            produced.insert(&instance);
            instances.push(instance);
        }

        Ok(instances)
    }

    /// Bind every argument of `action`: literals pass through, references
    /// prefer this run's handles and fall back to the ledger
    async fn resolve_args(
        &self,
        step: &MigrationStep,
        action: &DeployAction,
        produced: &Produced,
        ctx: &NetworkContext,
    ) -> Result<Vec<ResolvedArg>> {
        let mut resolved = Vec::with_capacity(action.args.len());

        for arg in &action.args {
            let value = match arg {
                ArgValue::Literal(value) => ResolvedArg::Literal(value.clone()),
                ArgValue::Reference { key } => match produced.get(key) {
                    Some(handle) => ResolvedArg::Handle(handle),
                    None => match self.ledger.resolve(&ctx.name, key).await {
                        Ok(instance) => ResolvedArg::Handle(instance.handle),
                        Err(Error::NotYetDeployed { .. }) => {
                            return Err(Error::UnresolvedReference {
                                key: key.clone(),
                                order: step.order,
                                artifact: action.artifact.clone(),
                            })
                        }
                        Err(err) => return Err(err),
                    },
                },
            };
            resolved.push(value);
        }

        Ok(resolved)
    }

    /// Resolve every artifact and check every reference before anything is
    /// deployed, so configuration errors never reach the network
    async fn preflight(
        &self,
        pending: &[&MigrationStep],
        ctx: &NetworkContext,
    ) -> Result<HashMap<String, Arc<ArtifactSpec>>> {
        let mut specs: HashMap<String, Arc<ArtifactSpec>> = HashMap::new();
        let mut available: HashSet<String> = HashSet::new();

        for step in pending {
            for action in &step.actions {
                if !specs.contains_key(&action.artifact) {
                    let spec = self.artifacts.resolve(&action.artifact)?;
                    specs.insert(action.artifact.clone(), spec);
                }
                specs[&action.artifact].abi.check_args(&action.args)?;

                for key in action.references() {
                    if available.contains(key) {
                        continue;
                    }
                    match self.ledger.resolve(&ctx.name, key).await {
                        Ok(_) => {
                            available.insert(key.to_string());
                        }
                        Err(Error::NotYetDeployed { .. }) => {
                            return Err(Error::UnresolvedReference {
                                key: key.to_string(),
                                order: step.order,
                                artifact: action.artifact.clone(),
                            })
                        }
                        Err(err) => return Err(err),
                    }
                }

                available.insert(action.key().to_string());
                available.insert(action.artifact.clone());
            }
        }

        Ok(specs)
    }

    fn transition(&mut self, ctx: &NetworkContext, next: RunState) {
        tracing::debug!(network = %ctx.name, from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

/// Handles produced during the current run; later deployments win and a
/// binding key match wins over an artifact name match
#[derive(Default)]
struct Produced {
    by_key: HashMap<String, Address>,
    by_artifact: HashMap<String, Address>,
}

impl Produced {
    fn insert(&mut self, instance: &DeployedInstance) {
        self.by_key.insert(instance.key.clone(), instance.handle);
        self.by_artifact
            .insert(instance.artifact.clone(), instance.handle);
    }

    fn get(&self, key: &str) -> Option<Address> {
        self.by_key
            .get(key)
            .or_else(|| self.by_artifact.get(key))
            .copied()
    }
}

fn step_failed(step: &MigrationStep, source: Error) -> Error {
    Error::StepFailed {
        order: step.order,
        step: step.id.clone(),
        source: Box::new(source),
    }
}

fn render_args(args: &[ResolvedArg]) -> String {
    let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
