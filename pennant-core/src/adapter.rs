//! Adapter boundary between the client and a flag source.

use crate::context::EvaluationContext;
use crate::engine::{self, FlagRules};
use crate::error::FlagResult;
use crate::value::FlagValue;
use async_trait::async_trait;
use std::sync::Arc;

/// A pluggable flag source.
///
/// Adapters wrapping remote services translate the context into the vendor's
/// shape and vendor failures into `Err`. The client treats any `Err` from
/// [`evaluate`](FlagAdapter::evaluate) as "serve the fallback", so adapters
/// may also absorb failures themselves by returning `default`.
#[async_trait]
pub trait FlagAdapter: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Prepare the adapter (connect, fetch, warm caches).
    async fn initialize(&self) -> FlagResult<()>;

    /// Resolve `flag` for an already merged context.
    ///
    /// `default` is the fallback the client resolved (caller default, else
    /// schema default). `Ok(None)` means the adapter has nothing to offer.
    async fn evaluate(
        &self,
        flag: &str,
        context: &EvaluationContext,
        default: Option<&FlagValue>,
    ) -> FlagResult<Option<FlagValue>>;

    /// Release resources. Defaults to a no-op.
    async fn close(&self) -> FlagResult<()> {
        Ok(())
    }
}

/// In-process adapter that runs the evaluation engine over local rules.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    rules: Arc<FlagRules>,
}

impl LocalAdapter {
    pub fn new(rules: FlagRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    pub fn rules(&self) -> &FlagRules {
        &self.rules
    }
}

#[async_trait]
impl FlagAdapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    async fn initialize(&self) -> FlagResult<()> {
        Ok(())
    }

    async fn evaluate(
        &self,
        flag: &str,
        context: &EvaluationContext,
        default: Option<&FlagValue>,
    ) -> FlagResult<Option<FlagValue>> {
        Ok(engine::evaluate(flag, context, default, &self.rules))
    }
}
