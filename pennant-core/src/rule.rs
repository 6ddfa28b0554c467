//! Rules: predicate-guarded overrides that force a variant.

use crate::context::EvaluationContext;
use crate::error::{FlagError, FlagResult};
use crate::value::FlagValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Decides whether a rule applies to a context.
///
/// Implemented for plain closures and for attribute [`Condition`]s, so rule
/// tables can hold arbitrary logic without requiring it to be serializable.
pub trait Predicate: Send + Sync {
    fn matches(&self, context: &EvaluationContext) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&EvaluationContext) -> bool + Send + Sync,
{
    fn matches(&self, context: &EvaluationContext) -> bool {
        self(context)
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    /// Regular expression match
    Matches,
}

/// Attribute condition: `attribute <operator> any of values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ConditionRepr", into = "ConditionRepr")]
pub struct Condition {
    attribute: String,
    operator: Operator,
    values: Vec<String>,
    patterns: Vec<Regex>,
}

impl Condition {
    /// Build a condition. `Matches` compiles its values as regular
    /// expressions and fails on an invalid pattern.
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        values: Vec<String>,
    ) -> FlagResult<Self> {
        let patterns = if operator == Operator::Matches {
            values
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|e| {
                        FlagError::configuration(format!("invalid pattern '{}': {}", pattern, e))
                    })
                })
                .collect::<FlagResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            attribute: attribute.into(),
            operator,
            values,
            patterns,
        })
    }

    fn plain(attribute: impl Into<String>, operator: Operator, values: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            values,
            patterns: Vec::new(),
        }
    }

    pub fn is_in<S: Into<String>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::plain(
            attribute,
            Operator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in<S: Into<String>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::plain(
            attribute,
            Operator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::plain(attribute, Operator::Contains, vec![value.into()])
    }

    pub fn starts_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::plain(attribute, Operator::StartsWith, vec![value.into()])
    }

    pub fn ends_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::plain(attribute, Operator::EndsWith, vec![value.into()])
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl Predicate for Condition {
    /// A missing attribute satisfies only `NotIn`.
    fn matches(&self, context: &EvaluationContext) -> bool {
        let Some(actual) = context.get(&self.attribute) else {
            return self.operator == Operator::NotIn;
        };
        let actual: &str = &actual;

        match self.operator {
            Operator::In => self.values.iter().any(|v| v == actual),
            Operator::NotIn => !self.values.iter().any(|v| v == actual),
            Operator::Contains => self.values.iter().any(|v| actual.contains(v.as_str())),
            Operator::StartsWith => self.values.iter().any(|v| actual.starts_with(v.as_str())),
            Operator::EndsWith => self.values.iter().any(|v| actual.ends_with(v.as_str())),
            Operator::Matches => self.patterns.iter().any(|re| re.is_match(actual)),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ConditionRepr {
    attribute: String,
    operator: Operator,
    #[serde(default)]
    values: Vec<String>,
}

impl TryFrom<ConditionRepr> for Condition {
    type Error = FlagError;

    fn try_from(repr: ConditionRepr) -> FlagResult<Self> {
        Condition::new(repr.attribute, repr.operator, repr.values)
    }
}

impl From<Condition> for ConditionRepr {
    fn from(condition: Condition) -> Self {
        ConditionRepr {
            attribute: condition.attribute,
            operator: condition.operator,
            values: condition.values,
        }
    }
}

/// Conjunction of conditions. Empty matches everything.
#[derive(Debug, Clone, Default)]
pub struct AllOf(pub Vec<Condition>);

impl Predicate for AllOf {
    fn matches(&self, context: &EvaluationContext) -> bool {
        self.0.iter().all(|condition| condition.matches(context))
    }
}

/// Forces `variant` for `flag` whenever the predicate matches.
///
/// Position in the containing rule list is significant: the first matching
/// rule for a flag wins.
#[derive(Clone)]
pub struct RolloutRule {
    flag: String,
    predicate: Arc<dyn Predicate>,
    variant: FlagValue,
}

impl RolloutRule {
    /// Rule guarded by a closure.
    pub fn new<F>(flag: impl Into<String>, predicate: F, variant: impl Into<FlagValue>) -> Self
    where
        F: Fn(&EvaluationContext) -> bool + Send + Sync + 'static,
    {
        Self::with_predicate(flag, Arc::new(predicate), variant)
    }

    /// Rule guarded by any predicate implementation.
    pub fn with_predicate(
        flag: impl Into<String>,
        predicate: Arc<dyn Predicate>,
        variant: impl Into<FlagValue>,
    ) -> Self {
        Self {
            flag: flag.into(),
            predicate,
            variant: variant.into(),
        }
    }

    /// Rule that applies when every condition matches.
    pub fn when_all(
        flag: impl Into<String>,
        conditions: Vec<Condition>,
        variant: impl Into<FlagValue>,
    ) -> Self {
        Self::with_predicate(flag, Arc::new(AllOf(conditions)), variant)
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn variant(&self) -> &FlagValue {
        &self.variant
    }

    /// Whether this rule targets `flag` and its predicate accepts `context`.
    pub fn applies(&self, flag: &str, context: &EvaluationContext) -> bool {
        self.flag == flag && self.predicate.matches(context)
    }
}

impl fmt::Debug for RolloutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolloutRule")
            .field("flag", &self.flag)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

/// Serializable rule form: attribute conditions instead of code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingRule {
    /// Flag the rule applies to
    pub flag: String,

    /// Conditions (all must match)
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Variation to return if rule matches
    pub variant: FlagValue,
}

impl From<TargetingRule> for RolloutRule {
    fn from(rule: TargetingRule) -> Self {
        RolloutRule::when_all(rule.flag, rule.conditions, rule.variant)
    }
}
