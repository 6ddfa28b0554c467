//! Client facade: lifecycle, failure containment and exposure reporting.
//!
//! ```text
//!   Uninitialized --initialize()--> Initializing --ok--> Ready --close()--> Closing --> Closed
//!         ^                              |                                             |
//!         +------------- error ----------+                  initialize() re-opens <----+
//! ```
//!
//! Concurrent `initialize()` calls share a single in-flight adapter
//! initialization, and concurrent `close()` calls share a single adapter
//! close. A re-opening `initialize()` waits for a close in progress, so the
//! adapter never initializes and closes at the same time. `evaluate()` outside `Ready` fails with
//! [`FlagError::NotInitialized`]; adapter failures during evaluation are
//! logged and replaced by the fallback value.

use crate::adapter::{FlagAdapter, LocalAdapter};
use crate::context::{EvaluationContext, merge};
use crate::engine::FlagRules;
use crate::error::{FlagError, FlagResult};
use crate::schema::FlagSchema;
use crate::value::FlagValue;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use pennant_log::{debug, info, warn};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reported each time a caller receives a resolved variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exposure {
    pub flag: String,
    pub value: FlagValue,
    /// The merged context the value was resolved for
    pub context: EvaluationContext,
    pub timestamp: DateTime<Utc>,
}

/// Exposure callback. Panics inside it are caught and logged.
pub type ExposureCallback = Arc<dyn Fn(&Exposure) + Send + Sync>;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    /// Closed, or still closing the adapter
    Closed,
}

type SharedInit = Shared<BoxFuture<'static, FlagResult<()>>>;
type SharedClose = Shared<BoxFuture<'static, ()>>;

enum Lifecycle {
    Uninitialized,
    Initializing { generation: u64, pending: SharedInit },
    Ready,
    Closing { generation: u64, done: SharedClose },
    Closed,
}

impl Lifecycle {
    fn state(&self) -> ClientState {
        match self {
            Lifecycle::Uninitialized => ClientState::Uninitialized,
            Lifecycle::Initializing { .. } => ClientState::Initializing,
            Lifecycle::Ready => ClientState::Ready,
            Lifecycle::Closing { .. } | Lifecycle::Closed => ClientState::Closed,
        }
    }
}

struct ClientInner {
    adapter: Arc<dyn FlagAdapter>,
    schema: Arc<FlagSchema>,
    base_context: EvaluationContext,
    on_exposure: Option<ExposureCallback>,
    lifecycle: Mutex<Lifecycle>,
    generations: AtomicU64,
}

/// Feature flag client.
///
/// Cheap to clone; clones share one lifecycle and one adapter.
#[derive(Clone)]
pub struct FlagClient {
    inner: Arc<ClientInner>,
}

impl FlagClient {
    /// Start building a client around `adapter`.
    pub fn builder<A: FlagAdapter + 'static>(adapter: A) -> FlagClientBuilder {
        FlagClientBuilder::new(Arc::new(adapter))
    }

    /// Builder for a client over a shared adapter handle.
    pub fn builder_from_arc(adapter: Arc<dyn FlagAdapter>) -> FlagClientBuilder {
        FlagClientBuilder::new(adapter)
    }

    /// Builder for an in-process client. The schema is taken from `rules`.
    pub fn local(rules: FlagRules) -> FlagClientBuilder {
        let schema = Arc::clone(rules.schema());
        FlagClientBuilder::new(Arc::new(LocalAdapter::new(rules))).schema(schema)
    }

    pub fn state(&self) -> ClientState {
        self.inner.lifecycle.lock().state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ClientState::Ready
    }

    pub fn schema(&self) -> &FlagSchema {
        &self.inner.schema
    }

    pub fn base_context(&self) -> &EvaluationContext {
        &self.inner.base_context
    }

    /// Initialize the adapter.
    ///
    /// Joins an initialization already in flight instead of starting another.
    /// On failure the client returns to `Uninitialized` and the call can be
    /// retried. Calling it on a ready client is a no-op.
    pub async fn initialize(&self) -> FlagResult<()> {
        let (generation, pending) = loop {
            let (closing, done) = {
                let mut lifecycle = self.inner.lifecycle.lock();
                match std::mem::replace(&mut *lifecycle, Lifecycle::Uninitialized) {
                    Lifecycle::Ready => {
                        *lifecycle = Lifecycle::Ready;
                        return Ok(());
                    }
                    Lifecycle::Initializing {
                        generation,
                        pending,
                    } => {
                        debug!(
                            "Joining in-flight initialization of adapter '{}'",
                            self.inner.adapter.name()
                        );
                        *lifecycle = Lifecycle::Initializing {
                            generation,
                            pending: pending.clone(),
                        };
                        break (generation, pending);
                    }
                    Lifecycle::Closing { generation, done } => {
                        *lifecycle = Lifecycle::Closing {
                            generation,
                            done: done.clone(),
                        };
                        (generation, done)
                    }
                    Lifecycle::Uninitialized | Lifecycle::Closed => {
                        info!("Initializing adapter '{}'", self.inner.adapter.name());
                        let generation = self.next_generation();
                        let pending = self.start_initialization();
                        *lifecycle = Lifecycle::Initializing {
                            generation,
                            pending: pending.clone(),
                        };
                        break (generation, pending);
                    }
                }
            };

            debug!(
                "Waiting for adapter '{}' to close before re-initializing",
                self.inner.adapter.name()
            );
            done.await;
            self.finish_close(closing);
        };

        let result = pending.await;

        let mut lifecycle = self.inner.lifecycle.lock();
        // A close() or a newer initialization may have replaced this attempt.
        if let Lifecycle::Initializing {
            generation: current,
            ..
        } = &*lifecycle
            && *current == generation
        {
            *lifecycle = match &result {
                Ok(()) => {
                    info!("Adapter '{}' ready", self.inner.adapter.name());
                    Lifecycle::Ready
                }
                Err(e) => {
                    warn!(
                        "Adapter '{}' failed to initialize: {}",
                        self.inner.adapter.name(),
                        e
                    );
                    Lifecycle::Uninitialized
                }
            };
        }

        result
    }

    fn next_generation(&self) -> u64 {
        self.inner.generations.fetch_add(1, Ordering::SeqCst)
    }

    fn start_initialization(&self) -> SharedInit {
        let adapter = Arc::clone(&self.inner.adapter);
        async move {
            adapter.initialize().await.map_err(|e| match e {
                FlagError::Initialization(_) => e,
                other => FlagError::Initialization(other.to_string()),
            })
        }
        .boxed()
        .shared()
    }

    /// Evaluate `flag` for the base context merged with `context`.
    ///
    /// The fallback is `default` if given, else the schema default. Adapter
    /// failures and out-of-domain adapter values resolve to the fallback and
    /// are not reported as exposures. Fails with `NotInitialized` outside the
    /// ready state, and with `UnknownFlag` when no value can be produced.
    pub async fn evaluate(
        &self,
        flag: &str,
        context: Option<&EvaluationContext>,
        default: Option<FlagValue>,
    ) -> FlagResult<FlagValue> {
        self.ensure_ready()?;

        let merged = match context {
            Some(context) => merge(&self.inner.base_context, context),
            None => self.inner.base_context.clone(),
        };
        let fallback = default.or_else(|| self.inner.schema.schema_default(flag));
        let adapter = &self.inner.adapter;

        match adapter.evaluate(flag, &merged, fallback.as_ref()).await {
            Ok(Some(value)) if self.inner.schema.admits(flag, &value) => {
                self.report_exposure(flag, &value, merged);
                Ok(value)
            }
            Ok(Some(value)) => {
                warn!(
                    "Adapter '{}' returned {} for '{}', outside the declared domain; serving fallback",
                    adapter.name(),
                    value,
                    flag
                );
                fallback.ok_or_else(|| FlagError::UnknownFlag(flag.to_string()))
            }
            Ok(None) => {
                let value = fallback.ok_or_else(|| FlagError::UnknownFlag(flag.to_string()))?;
                self.report_exposure(flag, &value, merged);
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "Adapter '{}' failed to evaluate '{}': {}; serving fallback",
                    adapter.name(),
                    flag,
                    e
                );
                fallback.ok_or_else(|| FlagError::UnknownFlag(flag.to_string()))
            }
        }
    }

    /// Boolean flag. A value of another type yields `default`.
    pub async fn get_bool(
        &self,
        flag: &str,
        context: Option<&EvaluationContext>,
        default: bool,
    ) -> FlagResult<bool> {
        let value = self.evaluate(flag, context, Some(default.into())).await?;
        Ok(value.as_bool().unwrap_or(default))
    }

    /// Numeric flag. A value of another type yields `default`.
    pub async fn get_number(
        &self,
        flag: &str,
        context: Option<&EvaluationContext>,
        default: f64,
    ) -> FlagResult<f64> {
        let value = self.evaluate(flag, context, Some(default.into())).await?;
        Ok(value.as_number().unwrap_or(default))
    }

    /// String flag. A value of another type yields `default`.
    pub async fn get_string(
        &self,
        flag: &str,
        context: Option<&EvaluationContext>,
        default: &str,
    ) -> FlagResult<String> {
        let value = self.evaluate(flag, context, Some(default.into())).await?;
        Ok(value.as_str().unwrap_or(default).to_string())
    }

    /// Close the client. Idempotent and infallible.
    ///
    /// Closing an uninitialized client does nothing. Closing during
    /// initialization waits for it and closes the adapter if it succeeded.
    /// Returns once the adapter is closed.
    pub async fn close(&self) {
        let (generation, done) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Closed) {
                Lifecycle::Uninitialized => {
                    *lifecycle = Lifecycle::Uninitialized;
                    return;
                }
                Lifecycle::Closed => return,
                Lifecycle::Closing { generation, done } => {
                    *lifecycle = Lifecycle::Closing {
                        generation,
                        done: done.clone(),
                    };
                    (generation, done)
                }
                Lifecycle::Ready => self.begin_close(&mut lifecycle, None),
                Lifecycle::Initializing { pending, .. } => {
                    self.begin_close(&mut lifecycle, Some(pending))
                }
            }
        };

        done.await;
        self.finish_close(generation);
    }

    fn begin_close(
        &self,
        lifecycle: &mut Lifecycle,
        pending: Option<SharedInit>,
    ) -> (u64, SharedClose) {
        let generation = self.next_generation();
        let adapter = Arc::clone(&self.inner.adapter);
        let done = async move {
            if let Some(pending) = pending
                && pending.await.is_err()
            {
                debug!("Initialization failed before close; nothing to release");
                return;
            }

            match adapter.close().await {
                Ok(()) => info!("Adapter '{}' closed", adapter.name()),
                Err(e) => warn!("Adapter '{}' failed to close cleanly: {}", adapter.name(), e),
            }
        }
        .boxed()
        .shared();

        *lifecycle = Lifecycle::Closing {
            generation,
            done: done.clone(),
        };
        (generation, done)
    }

    // Closing -> Closed, unless another transition already happened.
    fn finish_close(&self, generation: u64) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if let Lifecycle::Closing {
            generation: current,
            ..
        } = &*lifecycle
            && *current == generation
        {
            *lifecycle = Lifecycle::Closed;
        }
    }

    /// Handle bound to one request's context.
    pub fn scoped(&self, context: EvaluationContext) -> ScopedClient {
        ScopedClient {
            client: self.clone(),
            context,
        }
    }

    fn ensure_ready(&self) -> FlagResult<()> {
        match *self.inner.lifecycle.lock() {
            Lifecycle::Ready => Ok(()),
            _ => Err(FlagError::NotInitialized),
        }
    }

    fn report_exposure(&self, flag: &str, value: &FlagValue, context: EvaluationContext) {
        let Some(callback) = &self.inner.on_exposure else {
            return;
        };

        let exposure = Exposure {
            flag: flag.to_string(),
            value: value.clone(),
            context,
            timestamp: Utc::now(),
        };

        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(&exposure))) {
            warn!(
                "Exposure callback panicked for '{}': {}",
                flag,
                panic_message(panic.as_ref())
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl fmt::Debug for FlagClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagClient")
            .field("adapter", &self.inner.adapter.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FlagClient`].
pub struct FlagClientBuilder {
    adapter: Arc<dyn FlagAdapter>,
    schema: Arc<FlagSchema>,
    context: EvaluationContext,
    on_exposure: Option<ExposureCallback>,
}

impl FlagClientBuilder {
    fn new(adapter: Arc<dyn FlagAdapter>) -> Self {
        Self {
            adapter,
            schema: Arc::default(),
            context: EvaluationContext::default(),
            on_exposure: None,
        }
    }

    /// Schema used for fallbacks and for checking adapter values.
    pub fn schema(mut self, schema: impl Into<Arc<FlagSchema>>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Base context every call context is merged onto.
    pub fn context(mut self, context: EvaluationContext) -> Self {
        self.context = context;
        self
    }

    pub fn on_exposure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Exposure) + Send + Sync + 'static,
    {
        self.on_exposure = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> FlagClient {
        FlagClient {
            inner: Arc::new(ClientInner {
                adapter: self.adapter,
                schema: self.schema,
                base_context: self.context,
                on_exposure: self.on_exposure,
                lifecycle: Mutex::new(Lifecycle::Uninitialized),
                generations: AtomicU64::new(0),
            }),
        }
    }
}

/// Client handle carrying one request's context.
///
/// Request handlers pass this around explicitly instead of stashing a
/// "current context" in process-wide state, so concurrent requests never
/// observe each other's context.
#[derive(Clone, Debug)]
pub struct ScopedClient {
    client: FlagClient,
    context: EvaluationContext,
}

impl ScopedClient {
    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    pub fn client(&self) -> &FlagClient {
        &self.client
    }

    pub async fn evaluate(&self, flag: &str, default: Option<FlagValue>) -> FlagResult<FlagValue> {
        self.client.evaluate(flag, Some(&self.context), default).await
    }

    /// Boolean flag defaulting to `false`.
    pub async fn is_enabled(&self, flag: &str) -> FlagResult<bool> {
        self.client.get_bool(flag, Some(&self.context), false).await
    }

    pub async fn get_bool(&self, flag: &str, default: bool) -> FlagResult<bool> {
        self.client.get_bool(flag, Some(&self.context), default).await
    }

    pub async fn get_number(&self, flag: &str, default: f64) -> FlagResult<f64> {
        self.client.get_number(flag, Some(&self.context), default).await
    }

    pub async fn get_string(&self, flag: &str, default: &str) -> FlagResult<String> {
        self.client.get_string(flag, Some(&self.context), default).await
    }
}
