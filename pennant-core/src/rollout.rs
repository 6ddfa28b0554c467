//! Percentage-based gradual rollout.

use crate::bucket::{self, DEFAULT_SEED};
use crate::error::{FlagError, FlagResult};
use crate::value::FlagValue;
use serde::{Deserialize, Serialize};

/// Serves `variant` to a deterministic `percentage` of identified subjects.
///
/// The percentage is validated on construction, including deserialization;
/// a rollout that exists is always in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RolloutRepr")]
pub struct PercentageRollout {
    flag: String,
    percentage: f64,
    variant: FlagValue,
    seed: String,
}

impl PercentageRollout {
    /// Rollout with the default seed. Fails unless `0 <= percentage <= 100`.
    pub fn new(
        flag: impl Into<String>,
        percentage: f64,
        variant: impl Into<FlagValue>,
    ) -> FlagResult<Self> {
        let flag = flag.into();
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(FlagError::configuration(format!(
                "rollout percentage for '{}' must be a finite number in [0, 100], got {}",
                flag, percentage
            )));
        }

        Ok(Self {
            flag,
            percentage,
            variant: variant.into(),
            seed: DEFAULT_SEED.to_string(),
        })
    }

    /// Use a different seed. Re-seeding reshuffles which subjects are included.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn variant(&self) -> &FlagValue {
        &self.variant
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Bucket of `subject_id` for this rollout.
    pub fn bucket(&self, subject_id: &str) -> u32 {
        bucket::bucket_of(subject_id, &self.flag, &self.seed)
    }

    /// Whether `subject_id` is inside the rolled-out population.
    pub fn includes(&self, subject_id: &str) -> bool {
        bucket::is_in_rollout(subject_id, self.percentage, &self.flag, &self.seed)
    }
}

#[derive(Deserialize)]
struct RolloutRepr {
    flag: String,
    percentage: f64,
    variant: FlagValue,
    #[serde(default)]
    seed: Option<String>,
}

impl TryFrom<RolloutRepr> for PercentageRollout {
    type Error = FlagError;

    fn try_from(repr: RolloutRepr) -> FlagResult<Self> {
        let rollout = PercentageRollout::new(repr.flag, repr.percentage, repr.variant)?;
        Ok(match repr.seed {
            Some(seed) => rollout.with_seed(seed),
            None => rollout,
        })
    }
}
