//! Store-backed rule engine.

use std::sync::Arc;

use indexmap::IndexSet;
use lexblocks_core::rules::{self, Action, ActionState, RuleEvaluation};
use lexblocks_core::Context;
use lexblocks_store::{RuleStore, StoreError};
use tracing::{debug, info};

/// Evaluates every enabled rule in the rule store against a context.
#[derive(Clone)]
pub struct RuleEngine {
    rules: Arc<dyn RuleStore>,
}

impl RuleEngine {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }

    /// One evaluation per enabled rule, in store order. Rules are independent:
    /// a match never stops later rules from being evaluated.
    pub async fn evaluate_all_rules(&self, context: &Context) -> Result<Vec<RuleEvaluation>, StoreError> {
        let enabled = self.rules.list_enabled().await?;
        let evaluations: Vec<RuleEvaluation> = enabled
            .iter()
            .map(|rule| rules::evaluate_rule(rule, context))
            .collect();
        let matched = evaluations.iter().filter(|e| e.matched).count();
        debug!(rules = evaluations.len(), matched, "rules evaluated");
        Ok(evaluations)
    }

    /// Actions of all matched rules, concatenated in store order.
    pub async fn matched_actions(&self, context: &Context) -> Result<Vec<Action>, StoreError> {
        let evaluations = self.evaluate_all_rules(context).await?;
        Ok(rules::matched_actions(&evaluations))
    }

    /// Distinct `include_block` targets of matched rules, first-seen order.
    pub async fn get_blocks_to_include(&self, context: &Context) -> Result<IndexSet<String>, StoreError> {
        let evaluations = self.evaluate_all_rules(context).await?;
        let blocks = rules::included_block_ids(&evaluations);
        info!(count = blocks.len(), "rule blocks collected");
        Ok(blocks)
    }

    /// Reduce `actions` over `state`. Pure; no store access.
    pub fn apply_actions(&self, actions: &[Action], state: &ActionState) -> ActionState {
        rules::apply_actions(actions, state)
    }
}
