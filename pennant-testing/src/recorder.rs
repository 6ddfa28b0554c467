// Exposure capture

use parking_lot::Mutex;
use pennant_core::{Exposure, FlagValue};
use std::sync::Arc;

/// Collects exposures reported by a client.
///
/// ```
/// use pennant_core::{FlagClient, FlagRules};
/// use pennant_testing::ExposureRecorder;
///
/// let recorder = ExposureRecorder::new();
/// let client = FlagClient::local(FlagRules::default())
///     .on_exposure(recorder.callback())
///     .build();
/// # let _ = client;
/// ```
#[derive(Clone, Default)]
pub struct ExposureRecorder {
    exposures: Arc<Mutex<Vec<Exposure>>>,
}

impl ExposureRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback to pass to `FlagClientBuilder::on_exposure`
    pub fn callback(&self) -> impl Fn(&Exposure) + Send + Sync + 'static {
        let exposures = Arc::clone(&self.exposures);
        move |exposure: &Exposure| exposures.lock().push(exposure.clone())
    }

    pub fn exposures(&self) -> Vec<Exposure> {
        self.exposures.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.exposures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exposures.lock().is_empty()
    }

    pub fn for_flag(&self, flag: &str) -> Vec<Exposure> {
        self.exposures
            .lock()
            .iter()
            .filter(|e| e.flag == flag)
            .cloned()
            .collect()
    }

    /// Values served for `flag`, oldest first
    pub fn values(&self, flag: &str) -> Vec<FlagValue> {
        self.for_flag(flag).into_iter().map(|e| e.value).collect()
    }

    pub fn clear(&self) {
        self.exposures.lock().clear();
    }
}
