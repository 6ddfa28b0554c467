// Flag definition validation

use crate::{ConfigError, Result};
use pennant_core::{FlagError, FlagRules, FlagSchema, FlagValue};

/// Trait for validating flag definitions
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Checks values against a schema
pub struct ConfigValidator;

impl ConfigValidator {
    /// `value` must belong to `flag`'s domain. Undeclared flags accept anything.
    pub fn admits(schema: &FlagSchema, flag: &str, value: &FlagValue) -> Result<()> {
        if schema.admits(flag, value) {
            Ok(())
        } else {
            Err(FlagError::InvalidValue {
                flag: flag.to_string(),
                value: value.to_string(),
            }
            .into())
        }
    }

    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }
}

impl Validate for FlagRules {
    /// Static values, rule variants and rollout variants must all be members
    /// of their flag's domain.
    fn validate(&self) -> Result<()> {
        let schema = self.schema();

        for rollout in self.rollouts() {
            ConfigValidator::not_empty(rollout.flag(), "rollout flag")?;
            ConfigValidator::admits(schema, rollout.flag(), rollout.variant())?;
        }
        for rule in self.rules() {
            ConfigValidator::not_empty(rule.flag(), "rule flag")?;
            ConfigValidator::admits(schema, rule.flag(), rule.variant())?;
        }
        for (flag, _) in schema.flags() {
            if let Some(value) = self.static_value(flag) {
                ConfigValidator::admits(schema, flag, value)?;
            }
        }

        Ok(())
    }
}
