// Environment variable flag overrides

use crate::{ConfigError, Result};
use pennant_core::{FlagSchema, FlagValue};
use pennant_log::debug;
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Default prefix: `PENNANT_FLAG_NEW_CHECKOUT=true` sets `new-checkout`.
pub const DEFAULT_PREFIX: &str = "PENNANT_FLAG";

/// Reads static flag values from prefixed environment variables.
///
/// The variable suffix is lower-cased to form the flag name. When the schema
/// declares the same name with `_` replaced by `-`, that name is used instead.
/// Values parse as a boolean, then a number, and otherwise stay strings.
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Flag overrides from the process environment
    pub fn load(&self, schema: &FlagSchema) -> HashMap<String, FlagValue> {
        self.flags_from(env::vars(), schema)
    }

    /// Flag overrides from a dotenv file, without touching the process
    /// environment
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        schema: &FlagSchema,
    ) -> Result<HashMap<String, FlagValue>> {
        let vars = dotenvy::from_path_iter(path.as_ref())
            .map_err(|e| ConfigError::LoadError(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(self.flags_from(vars, schema))
    }

    /// Load a `.env` file into the process environment.
    ///
    /// Variables already set are left alone. Without a path the usual
    /// dotenv search applies and a missing file is not an error.
    pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => dotenvy::from_path(path)
                .map_err(|e| ConfigError::LoadError(e.to_string())),
            None => match dotenvy::dotenv() {
                Ok(_) => Ok(()),
                Err(e) if e.not_found() => Ok(()),
                Err(e) => Err(ConfigError::LoadError(e.to_string())),
            },
        }
    }

    /// Flag overrides from an arbitrary set of variables
    pub fn flags_from<I, K, V>(&self, vars: I, schema: &FlagSchema) -> HashMap<String, FlagValue>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut flags = HashMap::new();

        for (key, value) in vars {
            let Some(name) = self.strip_prefix(key.as_ref()) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let flag = flag_name(name, schema);
            let value = parse_value(value.as_ref());
            debug!("Environment override {} = {}", flag, value);
            flags.insert(flag, value);
        }

        flags
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Flag name for a variable suffix such as `NEW_CHECKOUT`.
pub fn flag_name(suffix: &str, schema: &FlagSchema) -> String {
    let lower = suffix.to_lowercase();
    let hyphenated = lower.replace('_', "-");

    if hyphenated != lower && !schema.contains(&lower) && schema.contains(&hyphenated) {
        hyphenated
    } else {
        lower
    }
}

/// Parse a raw variable value: boolean, then finite number, else string.
pub fn parse_value(raw: &str) -> FlagValue {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("true") {
        return FlagValue::boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return FlagValue::boolean(false);
    }
    if let Ok(number) = trimmed.parse::<f64>()
        && number.is_finite()
    {
        return FlagValue::number(number);
    }

    FlagValue::string(raw)
}
