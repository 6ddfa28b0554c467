// Pennant - provider-agnostic feature flags for Rust
//
// A typed flag schema, a context merge, deterministic percentage bucketing and
// a fixed precedence chain, behind a client that contains flag source failures.

// Re-export core functionality
pub use pennant_core::*;

// Re-export what adapter implementations need
pub use async_trait::async_trait;
pub use serde;

// Re-export logging so applications can configure it through one crate
pub use pennant_log as log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use pennant_config;

#[cfg(feature = "testing")]
pub use pennant_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ClientState,
        Condition,
        EvaluationContext,
        Exposure,
        FlagAdapter,
        FlagClient,
        FlagError,
        FlagResult,
        FlagRules,
        FlagSchema,
        FlagValue,
        LocalAdapter,
        Operator,
        PercentageRollout,
        RolloutRule,
        ScopedClient,
        TargetingRule,
        VariantDomain,
    };

    #[cfg(feature = "config")]
    pub use pennant_config::{EnvLoader, FileFormat, FlagDocument, Validate};
}
