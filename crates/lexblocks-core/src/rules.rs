//! Rules: condition groups that trigger actions.
//!
//! Everything here is pure. Fetching rules from a store and evaluating all of
//! them lives in the assembly crate's `RuleEngine`.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{self, Condition};
use crate::value::{Context, Value};

/// How the conditions of a group combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
    /// Any other operator name. A non-empty group with it never holds.
    #[serde(other)]
    Unsupported,
}

/// A logical combination of conditions.
///
/// An empty group is vacuously true, whatever its operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            operator: LogicalOperator::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            operator: LogicalOperator::Or,
            conditions,
        }
    }
}

/// What a matched rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    IncludeBlock,
    ExcludeBlock,
    SetVariable,
}

/// An effect triggered by a matched rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Block id or variable name.
    pub target: String,
    #[serde(default)]
    pub params: IndexMap<String, Value>,
}

impl Action {
    pub fn include_block(block_id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::IncludeBlock,
            target: block_id.into(),
            params: IndexMap::new(),
        }
    }

    pub fn exclude_block(block_id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::ExcludeBlock,
            target: block_id.into(),
            params: IndexMap::new(),
        }
    }

    pub fn set_variable(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut params = IndexMap::new();
        params.insert("value".to_string(), value.into());
        Self {
            kind: ActionKind::SetVariable,
            target: name.into(),
            params,
        }
    }
}

/// A conditionally triggered list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Higher runs earlier in store order. Does not gate matching.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub condition_group: ConditionGroup,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition_group: ConditionGroup,
        actions: Vec<Action>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            priority: 0,
            enabled: true,
            condition_group,
            actions,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rule_id: String,
    pub matched: bool,
    /// The rule's actions when matched, otherwise empty.
    pub actions: Vec<Action>,
    pub message: String,
}

/// Evaluate a condition group. Empty groups are true.
pub fn evaluate_group(group: &ConditionGroup, context: &Context) -> bool {
    if group.conditions.is_empty() {
        return true;
    }
    if group.operator == LogicalOperator::Unsupported {
        debug!(conditions = group.conditions.len(), "unsupported logical operator, group fails");
        return false;
    }
    // Every condition is evaluated; no short-circuit, so each fail-closed
    // reason is logged.
    let results: Vec<bool> = group
        .conditions
        .iter()
        .map(|c| condition::evaluate(c, context))
        .collect();
    match group.operator {
        LogicalOperator::And => results.iter().all(|&r| r),
        LogicalOperator::Or => results.iter().any(|&r| r),
        LogicalOperator::Unsupported => false,
    }
}

/// Evaluate a single rule. Disabled rules never match.
pub fn evaluate_rule(rule: &Rule, context: &Context) -> RuleEvaluation {
    if !rule.enabled {
        return RuleEvaluation {
            rule_id: rule.id.clone(),
            matched: false,
            actions: Vec::new(),
            message: "Rule is disabled".to_string(),
        };
    }

    let matched = evaluate_group(&rule.condition_group, context);
    debug!(rule_id = %rule.id, matched, "rule evaluated");

    RuleEvaluation {
        rule_id: rule.id.clone(),
        matched,
        actions: if matched { rule.actions.clone() } else { Vec::new() },
        message: format!(
            "Rule {} evaluated: {}",
            rule.name,
            if matched { "matched" } else { "not matched" }
        ),
    }
}

/// Actions of every matched evaluation, in evaluation order.
pub fn matched_actions(evaluations: &[RuleEvaluation]) -> Vec<Action> {
    evaluations
        .iter()
        .filter(|e| e.matched)
        .flat_map(|e| e.actions.iter().cloned())
        .collect()
}

/// Distinct `include_block` targets of matched evaluations, first-seen order.
pub fn included_block_ids(evaluations: &[RuleEvaluation]) -> IndexSet<String> {
    evaluations
        .iter()
        .filter(|e| e.matched)
        .flat_map(|e| e.actions.iter())
        .filter(|a| a.kind == ActionKind::IncludeBlock)
        .map(|a| a.target.clone())
        .collect()
}

/// Variables and block selections accumulated by [`apply_actions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    #[serde(default)]
    pub included_blocks: IndexSet<String>,
    #[serde(default)]
    pub excluded_blocks: IndexSet<String>,
}

impl ActionState {
    /// Seed the state with an existing context.
    pub fn from_context(context: &Context) -> Self {
        Self {
            variables: context.clone(),
            ..Default::default()
        }
    }
}

/// Reduce `actions` over `state`, returning the updated state.
///
/// `set_variable` assigns `params["value"]` (null when absent). Block
/// inclusions and exclusions are idempotent.
pub fn apply_actions(actions: &[Action], state: &ActionState) -> ActionState {
    let mut next = state.clone();
    for action in actions {
        match action.kind {
            ActionKind::SetVariable => {
                let value = action.params.get("value").cloned().unwrap_or_default();
                next.variables.insert(action.target.clone(), value);
            }
            ActionKind::IncludeBlock => {
                next.included_blocks.insert(action.target.clone());
            }
            ActionKind::ExcludeBlock => {
                next.excluded_blocks.insert(action.target.clone());
            }
        }
    }
    next
}
