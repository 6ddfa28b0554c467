//! Evaluation engine: the precedence chain.
//!
//! Resolution order, first applicable step wins and later steps are not
//! computed:
//!
//! 1. rules, in declared order
//! 2. the flag's percentage rollout, for identified subjects only
//! 3. the static flag map
//! 4. the caller-supplied default
//! 5. the schema default

use crate::context::EvaluationContext;
use crate::rollout::PercentageRollout;
use crate::rule::RolloutRule;
use crate::schema::FlagSchema;
use crate::value::FlagValue;
use pennant_log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only inputs of the engine.
#[derive(Debug, Clone, Default)]
pub struct FlagRules {
    schema: Arc<FlagSchema>,
    static_flags: HashMap<String, FlagValue>,
    rules: Vec<RolloutRule>,
    rollouts: Vec<PercentageRollout>,
}

impl FlagRules {
    pub fn builder() -> FlagRulesBuilder {
        FlagRulesBuilder::default()
    }

    pub fn schema(&self) -> &Arc<FlagSchema> {
        &self.schema
    }

    pub fn static_value(&self, flag: &str) -> Option<&FlagValue> {
        self.static_flags.get(flag)
    }

    pub fn rules(&self) -> &[RolloutRule] {
        &self.rules
    }

    /// The rollout for `flag`. Only the first declared one is used.
    pub fn rollout(&self, flag: &str) -> Option<&PercentageRollout> {
        self.rollouts.iter().find(|r| r.flag() == flag)
    }

    pub fn rollouts(&self) -> &[PercentageRollout] {
        &self.rollouts
    }
}

/// Builder for [`FlagRules`].
#[derive(Debug, Default)]
pub struct FlagRulesBuilder {
    schema: Option<Arc<FlagSchema>>,
    static_flags: HashMap<String, FlagValue>,
    rules: Vec<RolloutRule>,
    rollouts: Vec<PercentageRollout>,
}

impl FlagRulesBuilder {
    pub fn schema(mut self, schema: impl Into<Arc<FlagSchema>>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn static_flag(mut self, flag: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.static_flags.insert(flag.into(), value.into());
        self
    }

    pub fn static_flags<I, K, V>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FlagValue>,
    {
        self.static_flags
            .extend(flags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Append a rule. Rules are scanned in the order they are added.
    pub fn rule(mut self, rule: RolloutRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rollout(mut self, rollout: PercentageRollout) -> Self {
        if self.rollouts.iter().any(|r| r.flag() == rollout.flag()) {
            warn!(
                "Flag '{}' already has a rollout; the later one is ignored",
                rollout.flag()
            );
        }
        self.rollouts.push(rollout);
        self
    }

    pub fn build(self) -> FlagRules {
        FlagRules {
            schema: self.schema.unwrap_or_default(),
            static_flags: self.static_flags,
            rules: self.rules,
            rollouts: self.rollouts,
        }
    }
}

/// Which step of the chain produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionReason {
    /// The rule at `index` in the rule list matched.
    RuleMatch { index: usize },
    /// The subject's bucket fell inside the rollout.
    Rollout { bucket: u32 },
    Static,
    CallerDefault,
    SchemaDefault,
}

/// A resolved variant and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub value: FlagValue,
    pub reason: ResolutionReason,
}

/// Resolve `flag`, reporting the step that produced the value.
///
/// `None` only when the flag is unknown to every source and no default was
/// given.
pub fn evaluate_detailed(
    flag: &str,
    context: &EvaluationContext,
    default: Option<&FlagValue>,
    rules: &FlagRules,
) -> Option<Resolution> {
    let resolution = resolve(flag, context, default, rules);
    match &resolution {
        Some(r) => debug!("Flag '{}' resolved to {} ({:?})", flag, r.value, r.reason),
        None => debug!("Flag '{}' is unknown and has no default", flag),
    }
    resolution
}

/// Resolve `flag` to a value. See [`evaluate_detailed`].
pub fn evaluate(
    flag: &str,
    context: &EvaluationContext,
    default: Option<&FlagValue>,
    rules: &FlagRules,
) -> Option<FlagValue> {
    evaluate_detailed(flag, context, default, rules).map(|r| r.value)
}

fn resolve(
    flag: &str,
    context: &EvaluationContext,
    default: Option<&FlagValue>,
    rules: &FlagRules,
) -> Option<Resolution> {
    if let Some((index, rule)) = rules
        .rules
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.applies(flag, context))
    {
        return Some(Resolution {
            value: rule.variant().clone(),
            reason: ResolutionReason::RuleMatch { index },
        });
    }

    // Anonymous subjects never take part in percentage rollouts.
    if let Some(rollout) = rules.rollout(flag)
        && let Some(user_id) = context.user_id().filter(|id| !id.is_empty())
        && rollout.includes(user_id)
    {
        return Some(Resolution {
            value: rollout.variant().clone(),
            reason: ResolutionReason::Rollout {
                bucket: rollout.bucket(user_id),
            },
        });
    }

    if let Some(value) = rules.static_value(flag) {
        return Some(Resolution {
            value: value.clone(),
            reason: ResolutionReason::Static,
        });
    }

    if let Some(value) = default {
        return Some(Resolution {
            value: value.clone(),
            reason: ResolutionReason::CallerDefault,
        });
    }

    rules.schema.schema_default(flag).map(|value| Resolution {
        value,
        reason: ResolutionReason::SchemaDefault,
    })
}
