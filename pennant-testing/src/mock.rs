// Scriptable flag adapter

use async_trait::async_trait;
use parking_lot::Mutex;
use pennant_core::{EvaluationContext, FlagAdapter, FlagError, FlagResult, FlagValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One recorded `evaluate` call
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationCall {
    pub flag: String,
    pub context: EvaluationContext,
    pub default: Option<FlagValue>,
}

#[derive(Default)]
struct MockState {
    values: HashMap<String, FlagValue>,
    failures: HashMap<String, String>,
    init_failures: usize,
    init_delay: Option<Duration>,
    close_failure: Option<String>,
    init_calls: usize,
    close_calls: usize,
    evaluations: Vec<EvaluationCall>,
}

/// Mock adapter for testing clients
///
/// Scripted values win, then scripted failures; otherwise the fallback the
/// client passed in is echoed back. Clones share state, so a test can keep
/// one handle while the client owns another.
#[derive(Clone, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `value` for `flag`
    pub fn with_value(self, flag: &str, value: impl Into<FlagValue>) -> Self {
        self.set_value(flag, value);
        self
    }

    /// Fail every evaluation of `flag`
    pub fn with_failure(self, flag: &str, message: &str) -> Self {
        self.state
            .lock()
            .failures
            .insert(flag.to_string(), message.to_string());
        self
    }

    /// Fail the next `times` initializations
    pub fn failing_initialize(self, times: usize) -> Self {
        self.state.lock().init_failures = times;
        self
    }

    /// Sleep before completing each initialization
    pub fn with_init_delay(self, delay: Duration) -> Self {
        self.state.lock().init_delay = Some(delay);
        self
    }

    pub fn failing_close(self, message: &str) -> Self {
        self.state.lock().close_failure = Some(message.to_string());
        self
    }

    /// Change a scripted value while the adapter is in use
    pub fn set_value(&self, flag: &str, value: impl Into<FlagValue>) {
        let mut state = self.state.lock();
        state.failures.remove(flag);
        state.values.insert(flag.to_string(), value.into());
    }

    pub fn initialize_calls(&self) -> usize {
        self.state.lock().init_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// All evaluations, oldest first
    pub fn evaluations(&self) -> Vec<EvaluationCall> {
        self.state.lock().evaluations.clone()
    }

    pub fn evaluation_count(&self, flag: &str) -> usize {
        self.state
            .lock()
            .evaluations
            .iter()
            .filter(|call| call.flag == flag)
            .count()
    }

    pub fn last_evaluation(&self) -> Option<EvaluationCall> {
        self.state.lock().evaluations.last().cloned()
    }

    /// Forget recorded calls; scripted behavior is kept
    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.init_calls = 0;
        state.close_calls = 0;
        state.evaluations.clear();
    }
}

#[async_trait]
impl FlagAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> FlagResult<()> {
        let delay = {
            let mut state = self.state.lock();
            state.init_calls += 1;
            state.init_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.init_failures > 0 {
            state.init_failures -= 1;
            return Err(FlagError::Initialization(
                "mock initialization failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn evaluate(
        &self,
        flag: &str,
        context: &EvaluationContext,
        default: Option<&FlagValue>,
    ) -> FlagResult<Option<FlagValue>> {
        let mut state = self.state.lock();
        state.evaluations.push(EvaluationCall {
            flag: flag.to_string(),
            context: context.clone(),
            default: default.cloned(),
        });

        if let Some(value) = state.values.get(flag) {
            return Ok(Some(value.clone()));
        }
        if let Some(message) = state.failures.get(flag) {
            return Err(FlagError::evaluation(flag, message.clone()));
        }
        Ok(default.cloned())
    }

    async fn close(&self) -> FlagResult<()> {
        let mut state = self.state.lock();
        state.close_calls += 1;
        match &state.close_failure {
            Some(message) => Err(FlagError::Configuration(message.clone())),
            None => Ok(()),
        }
    }
}
