//! Flag configuration for Pennant
//!
//! Loads a [`FlagDocument`] (schema, static values, rollouts, targeting
//! rules and a base context) from JSON or TOML, layers environment overrides
//! on top, validates it and turns it into a [`LocalAdapter`] or a client.
//!
//! ```toml
//! [schema]
//! theme = ["light", "dark", "system"]
//! new-checkout = "boolean"
//!
//! [flags]
//! theme = "dark"
//!
//! [[rollouts]]
//! flag = "new-checkout"
//! percentage = 25
//! variant = true
//!
//! [[rules]]
//! flag = "theme"
//! variant = "system"
//! conditions = [{ attribute = "plan", operator = "in", values = ["beta"] }]
//! ```
//!
//! ```
//! use pennant_config::{FileFormat, FlagDocument};
//!
//! let doc = FlagDocument::parse(
//!     r#"{"schema": {"theme": ["light", "dark"]}, "flags": {"theme": "dark"}}"#,
//!     FileFormat::Json,
//! )
//! .unwrap();
//!
//! let adapter = doc.into_local_adapter().unwrap();
//! assert_eq!(adapter.rules().static_value("theme").unwrap().as_str(), Some("dark"));
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::{DEFAULT_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use pennant_core::{
    EvaluationContext, FlagClient, FlagClientBuilder, FlagRules, FlagSchema, FlagValue,
    LocalAdapter, PercentageRollout, RolloutRule, TargetingRule,
};
use pennant_log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Declarative flag definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagDocument {
    #[serde(default)]
    pub schema: FlagSchema,

    /// Static flag values
    #[serde(default)]
    pub flags: HashMap<String, FlagValue>,

    #[serde(default)]
    pub rollouts: Vec<PercentageRollout>,

    /// Targeting rules, in priority order
    #[serde(default)]
    pub rules: Vec<TargetingRule>,

    /// Base context for clients built from this document
    #[serde(default)]
    pub context: EvaluationContext,
}

impl FlagDocument {
    /// Parse a document. `Env` content is read as static flags only.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let tree = ConfigLoader::new(format).parse(content)?;

        if format == FileFormat::Env {
            let vars = tree
                .as_object()
                .into_iter()
                .flatten()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())));
            return Ok(Self::from_env_pairs(vars));
        }

        serde_json::from_value(tree).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load a document, detecting the format from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        let content = std::fs::read_to_string(path)?;

        let doc = Self::parse(&content, loader.format())?;
        info!(
            "Loaded {} flag definitions from {}",
            doc.flags.len() + doc.rollouts.len() + doc.rules.len(),
            path.display()
        );
        Ok(doc)
    }

    fn from_env_pairs(vars: impl Iterator<Item = (String, String)>) -> Self {
        let flags = vars
            .map(|(key, value)| {
                let name = env::flag_name(&key, &FlagSchema::new());
                (name, env::parse_value(&value))
            })
            .collect();

        Self {
            flags,
            ..Self::default()
        }
    }

    /// Apply environment overrides from the process environment. Overrides
    /// win over values from the document.
    pub fn with_env(self, loader: &EnvLoader) -> Self {
        let overrides = loader.load(&self.schema);
        self.with_overrides(overrides)
    }

    /// Apply explicit static overrides.
    pub fn with_overrides(mut self, overrides: HashMap<String, FlagValue>) -> Self {
        for (flag, value) in overrides {
            debug!("Override for '{}': {}", flag, value);
            self.flags.insert(flag, value);
        }
        self
    }

    /// Build validated evaluation rules.
    pub fn into_rules(self) -> Result<FlagRules> {
        let mut builder = FlagRules::builder()
            .schema(self.schema)
            .static_flags(self.flags);
        for rule in self.rules {
            builder = builder.rule(RolloutRule::from(rule));
        }
        for rollout in self.rollouts {
            builder = builder.rollout(rollout);
        }

        let rules = builder.build();
        rules.validate()?;
        Ok(rules)
    }

    pub fn into_local_adapter(self) -> Result<LocalAdapter> {
        self.into_rules().map(LocalAdapter::new)
    }

    /// Client builder over a local adapter, carrying the document's schema
    /// and base context.
    pub fn into_client_builder(self) -> Result<FlagClientBuilder> {
        let context = self.context.clone();
        Ok(FlagClient::local(self.into_rules()?).context(context))
    }
}
