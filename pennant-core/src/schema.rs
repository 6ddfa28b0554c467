//! Flag schema: which flags exist and what values they may take.

use crate::error::{FlagError, FlagResult};
use crate::value::FlagValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Primitive domain tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Number,
    Boolean,
}

impl PrimitiveType {
    /// `""`, `0` or `false`.
    pub fn default_value(self) -> FlagValue {
        match self {
            Self::String => FlagValue::String(String::new()),
            Self::Number => FlagValue::Number(0.0),
            Self::Boolean => FlagValue::Bool(false),
        }
    }
}

/// The set of variants a flag may resolve to.
///
/// Serialized either as an array of string literals (enumerated domain) or as
/// one of `"string"`, `"number"`, `"boolean"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DomainRepr", into = "DomainRepr")]
pub enum VariantDomain {
    /// Ordered, non-empty list of allowed strings. The first is the default.
    Enumerated(Vec<String>),
    /// Any value of the given primitive type.
    Primitive(PrimitiveType),
}

impl VariantDomain {
    /// Enumerated domain. Fails on an empty list.
    pub fn enumerated<I, S>(variants: I) -> FlagResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        if variants.is_empty() {
            return Err(FlagError::configuration(
                "enumerated flag domain must have at least one variant",
            ));
        }
        Ok(Self::Enumerated(variants))
    }

    pub fn string() -> Self {
        Self::Primitive(PrimitiveType::String)
    }

    pub fn number() -> Self {
        Self::Primitive(PrimitiveType::Number)
    }

    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveType::Boolean)
    }

    /// Schema default: the first enumerated variant, or the primitive default.
    pub fn default_value(&self) -> FlagValue {
        match self {
            // Construction guarantees a first element.
            Self::Enumerated(variants) => variants
                .first()
                .map(|v| FlagValue::String(v.clone()))
                .unwrap_or_else(|| PrimitiveType::String.default_value()),
            Self::Primitive(kind) => kind.default_value(),
        }
    }

    /// Whether `value` belongs to this domain.
    pub fn admits(&self, value: &FlagValue) -> bool {
        match (self, value) {
            (Self::Enumerated(variants), FlagValue::String(s)) => variants.contains(s),
            (Self::Enumerated(_), _) => false,
            (Self::Primitive(PrimitiveType::String), FlagValue::String(_)) => true,
            (Self::Primitive(PrimitiveType::Number), FlagValue::Number(_)) => true,
            (Self::Primitive(PrimitiveType::Boolean), FlagValue::Bool(_)) => true,
            (Self::Primitive(_), _) => false,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DomainRepr {
    Enumerated(Vec<String>),
    Primitive(PrimitiveType),
}

impl TryFrom<DomainRepr> for VariantDomain {
    type Error = FlagError;

    fn try_from(repr: DomainRepr) -> FlagResult<Self> {
        match repr {
            DomainRepr::Enumerated(variants) => Self::enumerated(variants),
            DomainRepr::Primitive(kind) => Ok(Self::Primitive(kind)),
        }
    }
}

impl From<VariantDomain> for DomainRepr {
    fn from(domain: VariantDomain) -> Self {
        match domain {
            VariantDomain::Enumerated(variants) => DomainRepr::Enumerated(variants),
            VariantDomain::Primitive(kind) => DomainRepr::Primitive(kind),
        }
    }
}

/// Immutable mapping from flag name to its variant domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSchema {
    flags: HashMap<String, VariantDomain>,
}

impl FlagSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a flag.
    pub fn with_flag(mut self, name: impl Into<String>, domain: VariantDomain) -> Self {
        self.flags.insert(name.into(), domain);
        self
    }

    /// Declare an enumerated flag. Fails on an empty variant list.
    pub fn with_enum<I, S>(self, name: impl Into<String>, variants: I) -> FlagResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.with_flag(name, VariantDomain::enumerated(variants)?))
    }

    pub fn domain(&self, flag: &str) -> Option<&VariantDomain> {
        self.flags.get(flag)
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.flags.contains_key(flag)
    }

    /// Default derived from the flag's domain; `None` for undeclared flags.
    pub fn schema_default(&self, flag: &str) -> Option<FlagValue> {
        self.domain(flag).map(VariantDomain::default_value)
    }

    /// Whether `value` is acceptable for `flag`. Undeclared flags accept anything.
    pub fn admits(&self, flag: &str, value: &FlagValue) -> bool {
        self.domain(flag).is_none_or(|domain| domain.admits(value))
    }

    pub fn flags(&self) -> impl Iterator<Item = (&str, &VariantDomain)> {
        self.flags.iter().map(|(name, domain)| (name.as_str(), domain))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, VariantDomain)> for FlagSchema {
    fn from_iter<T: IntoIterator<Item = (S, VariantDomain)>>(iter: T) -> Self {
        Self {
            flags: iter
                .into_iter()
                .map(|(name, domain)| (name.into(), domain))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerated_default_is_first() {
        let domain = VariantDomain::enumerated(["light", "dark", "system"]).unwrap();
        assert_eq!(domain.default_value(), FlagValue::string("light"));
    }

    #[test]
    fn test_empty_enumeration_rejected() {
        let result = VariantDomain::enumerated(Vec::<String>::new());
        assert!(matches!(result, Err(FlagError::Configuration(_))));
    }

    #[test]
    fn test_primitive_defaults() {
        assert_eq!(VariantDomain::string().default_value(), FlagValue::string(""));
        assert_eq!(VariantDomain::number().default_value(), FlagValue::number(0.0));
        assert_eq!(
            VariantDomain::boolean().default_value(),
            FlagValue::boolean(false)
        );
    }

    #[test]
    fn test_admits() {
        let theme = VariantDomain::enumerated(["light", "dark"]).unwrap();
        assert!(theme.admits(&FlagValue::string("dark")));
        assert!(!theme.admits(&FlagValue::string("blue")));
        assert!(!theme.admits(&FlagValue::boolean(true)));

        assert!(VariantDomain::number().admits(&FlagValue::number(4.0)));
        assert!(!VariantDomain::boolean().admits(&FlagValue::string("true")));
    }

    #[test]
    fn test_schema_deserialize() {
        let schema: FlagSchema = serde_json::from_str(
            r#"{"theme": ["light", "dark", "system"], "beta": "boolean", "limit": "number"}"#,
        )
        .unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.schema_default("theme"), Some(FlagValue::string("light")));
        assert_eq!(schema.schema_default("beta"), Some(FlagValue::boolean(false)));
        assert_eq!(schema.schema_default("limit"), Some(FlagValue::number(0.0)));
        assert_eq!(schema.schema_default("missing"), None);
    }

    #[test]
    fn test_schema_deserialize_rejects_empty_enum() {
        let result: Result<FlagSchema, _> = serde_json::from_str(r#"{"theme": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_undeclared_flags_admit_anything() {
        let schema = FlagSchema::new().with_flag("beta", VariantDomain::boolean());
        assert!(schema.admits("other", &FlagValue::number(1.0)));
        assert!(!schema.admits("beta", &FlagValue::number(1.0)));
    }
}
