//! Feature Flags for Pennant
//!
//! Provider-agnostic flag evaluation: a typed flag schema, context merging,
//! deterministic percentage rollouts and a fixed precedence chain, behind a
//! client facade that never lets a flag source failure reach the caller.
//!
//! # Features
//!
//! - **Flag Schema** - Every flag declares its variant domain and default
//! - **Targeting Rules** - Ordered predicates that force a variant
//! - **Gradual Rollout** - Stable percentage bucketing per subject
//! - **Adapters** - Pluggable flag sources behind one async trait
//! - **Exposure Events** - A callback for every variant served
//!
//! # Evaluation Order
//!
//! For a flag and a merged context the first of these that yields a value wins:
//!
//! 1. the first matching rule for the flag
//! 2. the flag's rollout, for identified subjects inside the percentage
//! 3. the static value
//! 4. the caller's default
//! 5. the schema default
//!
//! # Quick Start
//!
//! ```
//! use pennant_core::*;
//!
//! # tokio_test::block_on(async {
//! let schema = FlagSchema::new()
//!     .with_enum("theme", ["light", "dark", "system"])
//!     .unwrap()
//!     .with_flag("new-checkout", VariantDomain::boolean());
//!
//! let rules = FlagRules::builder()
//!     .schema(schema)
//!     .rollout(PercentageRollout::new("new-checkout", 25.0, true).unwrap())
//!     .build();
//!
//! let client = FlagClient::local(rules).build();
//! client.initialize().await.unwrap();
//!
//! let theme = client.evaluate("theme", None, None).await.unwrap();
//! assert_eq!(theme, FlagValue::string("light"));
//!
//! let ctx = EvaluationContext::new().with_user_id("user-1");
//! let enabled = client.get_bool("new-checkout", Some(&ctx), false).await.unwrap();
//! # let _ = enabled;
//! # });
//! ```
//!
//! # Targeting Rules
//!
//! ```
//! use pennant_core::*;
//!
//! let staff = RolloutRule::when_all(
//!     "beta-dashboard",
//!     vec![Condition::ends_with("email", "@company.com")],
//!     true,
//! );
//!
//! let rules = FlagRules::builder()
//!     .rule(staff)
//!     .static_flag("beta-dashboard", false)
//!     .build();
//!
//! let ctx = EvaluationContext::new().with_attribute("email", "ana@company.com");
//! assert_eq!(evaluate("beta-dashboard", &ctx, None, &rules), Some(FlagValue::boolean(true)));
//! ```

pub mod adapter;
pub mod bucket;
pub mod client;
pub mod context;
pub mod engine;
pub mod error;
pub mod rollout;
pub mod rule;
pub mod schema;
pub mod value;

pub use adapter::{FlagAdapter, LocalAdapter};
pub use bucket::{DEFAULT_SEED, bucket_of, hash_key, is_in_rollout};
pub use client::{
    ClientState, Exposure, ExposureCallback, FlagClient, FlagClientBuilder, ScopedClient,
};
pub use context::{ANONYMOUS_SUBJECT, EvaluationContext, merge};
pub use engine::{
    FlagRules, FlagRulesBuilder, Resolution, ResolutionReason, evaluate, evaluate_detailed,
};
pub use error::{FlagError, FlagResult};
pub use rollout::PercentageRollout;
pub use rule::{AllOf, Condition, Operator, Predicate, RolloutRule, TargetingRule};
pub use schema::{FlagSchema, PrimitiveType, VariantDomain};
pub use value::FlagValue;
