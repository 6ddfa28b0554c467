//! Evaluation context and the context merge.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Subject identifier used for bucketing when a context has no user id.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Subject-describing data supplied for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Subject identity
    #[serde(default, rename = "userId", alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Arbitrary subject attributes
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look up `user_id` or a scalar attribute as text.
    ///
    /// Numbers and booleans are rendered; null, arrays and objects yield `None`.
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        if key == "user_id" || key == "userId" {
            return self.user_id.as_deref().map(Cow::Borrowed);
        }

        match self.attributes.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    /// Identifier used for bucketing: the user id, or `"anonymous"`.
    pub fn subject_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(ANONYMOUS_SUBJECT)
    }

    /// Merge `overrides` on top of this context. See [`merge`].
    pub fn merged_with(&self, overrides: &EvaluationContext) -> EvaluationContext {
        merge(self, overrides)
    }
}

/// Combine a base context with a call-specific one.
///
/// The override's `user_id` wins whenever it is present, including an empty
/// string. Attributes are merged one level deep with the override winning per
/// key. Neither input is modified.
pub fn merge(base: &EvaluationContext, overrides: &EvaluationContext) -> EvaluationContext {
    let mut attributes = base.attributes.clone();
    attributes.extend(
        overrides
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    EvaluationContext {
        user_id: overrides.user_id.clone().or_else(|| base.user_id.clone()),
        attributes,
    }
}
