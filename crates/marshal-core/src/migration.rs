//! Migration plans
//!
//! A [`MigrationPlan`] is a validated, ordered list of [`MigrationStep`]s.
//! Validation happens once at load time so that configuration mistakes are
//! reported before anything is sent to a network.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ArgValue;

/// One deployment inside a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployAction {
    pub artifact: String,
    /// Key the produced handle is published under, defaults to the artifact name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgValue>,
}

impl DeployAction {
    pub fn new(artifact: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            bind: None,
            args: Vec::new(),
        }
    }

    pub fn bind(mut self, key: impl Into<String>) -> Self {
        self.bind = Some(key.into());
        self
    }

    pub fn arg(mut self, arg: ArgValue) -> Self {
        self.args.push(arg);
        self
    }

    /// Binding key of the handle this action produces
    pub fn key(&self) -> &str {
        self.bind.as_deref().unwrap_or(&self.artifact)
    }

    /// Binding keys referenced by this action's arguments
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(ArgValue::reference_key)
    }
}

/// One ordered, atomic unit of deployment work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub order: u64,
    pub id: String,
    #[serde(default)]
    pub actions: Vec<DeployAction>,
}

impl MigrationStep {
    pub fn new(order: u64, id: impl Into<String>, actions: Vec<DeployAction>) -> Self {
        Self {
            order,
            id: id.into(),
            actions,
        }
    }
}

/// On-disk shape of a migrations file
#[derive(Debug, Deserialize)]
struct MigrationFile {
    #[serde(default)]
    steps: Vec<MigrationStep>,
}

/// Validated steps sorted by ascending order
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    /// Validate and sort `steps`
    pub fn new(mut steps: Vec<MigrationStep>) -> Result<Self> {
        let mut seen: HashMap<u64, String> = HashMap::new();

        for step in &steps {
            if step.order == 0 {
                return Err(Error::InvalidPlan(format!(
                    "step '{}' uses order 0, orders start at 1",
                    step.id
                )));
            }
            if step.id.trim().is_empty() {
                return Err(Error::InvalidPlan(format!(
                    "step {} has an empty id",
                    step.order
                )));
            }
            if let Some(first) = seen.insert(step.order, step.id.clone()) {
                return Err(Error::DuplicateOrder {
                    order: step.order,
                    first,
                    second: step.id.clone(),
                });
            }
            if step.actions.is_empty() {
                return Err(Error::EmptyStep {
                    order: step.order,
                    id: step.id.clone(),
                });
            }
            if let Some(action) = step.actions.iter().find(|a| a.artifact.trim().is_empty()) {
                return Err(Error::InvalidPlan(format!(
                    "step {} has an action with an empty artifact name (bind: {:?})",
                    step.order, action.bind
                )));
            }
        }

        steps.sort_by_key(|step| step.order);
        Ok(Self { steps })
    }

    /// Parse a plan from TOML (`[[steps]]` tables)
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: MigrationFile = toml::from_str(content)?;
        Self::new(file.steps)
    }

    /// Load a plan from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps after `last_completed`, up to and including `target` if given
    pub fn pending(&self, last_completed: u64, target: Option<u64>) -> Vec<&MigrationStep> {
        self.steps
            .iter()
            .filter(|step| step.order > last_completed)
            .filter(|step| target.is_none_or(|target| step.order <= target))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
[[steps]]
order = 2
id = "identity"

[[steps.actions]]
artifact = "ODAOIdentity"
args = [{ ref = "ODAOToken" }, 1000]

[[steps]]
order = 1
id = "token"

[[steps.actions]]
artifact = "ODAOToken"
"#;

    #[test]
    fn test_parse_and_sort() {
        let plan = MigrationPlan::from_toml(PLAN).unwrap();
        let orders: Vec<u64> = plan.steps().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2]);

        let identity = &plan.steps()[1].actions[0];
        assert_eq!(identity.key(), "ODAOIdentity");
        assert_eq!(
            identity.args,
            vec![ArgValue::reference("ODAOToken"), ArgValue::literal(1000)]
        );
        assert_eq!(identity.references().collect::<Vec<_>>(), vec!["ODAOToken"]);
    }

    #[test]
    fn test_explicit_binding_key() {
        let plan = MigrationPlan::from_toml(
            r#"
[[steps]]
order = 1
id = "tokens"

[[steps.actions]]
artifact = "ERC20"
bind = "usdc"
args = ["USD Coin", "USDC"]
"#,
        )
        .unwrap();
        assert_eq!(plan.steps()[0].actions[0].key(), "usdc");
    }

    #[test]
    fn test_duplicate_order() {
        let err = MigrationPlan::new(vec![
            MigrationStep::new(1, "a", vec![DeployAction::new("A")]),
            MigrationStep::new(1, "b", vec![DeployAction::new("B")]),
        ])
        .unwrap_err();

        match err {
            Error::DuplicateOrder {
                order,
                first,
                second,
            } => {
                assert_eq!(order, 1);
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_step() {
        let err = MigrationPlan::new(vec![MigrationStep::new(1, "noop", vec![])]).unwrap_err();
        assert!(matches!(err, Error::EmptyStep { order: 1, .. }));
    }

    #[test]
    fn test_order_zero_is_reserved() {
        let err =
            MigrationPlan::new(vec![MigrationStep::new(0, "a", vec![DeployAction::new("A")])])
                .unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_empty_artifact_name() {
        let err =
            MigrationPlan::new(vec![MigrationStep::new(1, "a", vec![DeployAction::new(" ")])])
                .unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
    }

    #[test]
    fn test_pending() {
        let plan = MigrationPlan::new(
            (1..=5)
                .map(|i| MigrationStep::new(i, format!("s{i}"), vec![DeployAction::new("A")]))
                .collect(),
        )
        .unwrap();

        let orders = |steps: Vec<&MigrationStep>| steps.iter().map(|s| s.order).collect::<Vec<_>>();
        assert_eq!(orders(plan.pending(0, None)), vec![1, 2, 3, 4, 5]);
        assert_eq!(orders(plan.pending(2, None)), vec![3, 4, 5]);
        assert_eq!(orders(plan.pending(2, Some(4))), vec![3, 4]);
        assert!(plan.pending(5, None).is_empty());
    }

    #[test]
    fn test_empty_file() {
        let plan = MigrationPlan::from_toml("").unwrap();
        assert!(plan.is_empty());
    }
}
