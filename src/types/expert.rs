//! Expert handle: a model plus its sampling configuration.

use std::fmt;
use std::sync::Arc;

use crate::schedule::NoiseSchedule;

use super::config::ModelConfig;

/// A noise-prediction model together with its active schedule.
///
/// The model itself is shared behind an [`Arc`]; the schedule attachment is
/// owned per handle, so deriving a shifted expert never touches other
/// handles to the same model.
pub struct Expert<M> {
    /// Display name used in log output.
    pub name: String,
    /// Shared model handle, opaque to this crate.
    pub model: Arc<M>,
    /// Sampling-relevant model configuration.
    pub config: ModelConfig,
    schedule: Option<NoiseSchedule>,
}

impl<M> Expert<M> {
    /// Creates an expert with no active schedule attached.
    pub fn new(name: impl Into<String>, model: Arc<M>, config: ModelConfig) -> Self {
        Self {
            name: name.into(),
            model,
            config,
            schedule: None,
        }
    }

    /// Returns this expert with `schedule` attached.
    pub fn with_schedule(mut self, schedule: NoiseSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Returns the attached schedule, if any.
    pub fn schedule(&self) -> Option<&NoiseSchedule> {
        self.schedule.as_ref()
    }
}

// Manual impls: `M` itself need not be Clone or Debug.
impl<M> Clone for Expert<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            model: Arc::clone(&self.model),
            config: self.config.clone(),
            schedule: self.schedule.clone(),
        }
    }
}

impl<M> fmt::Debug for Expert<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expert")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// The two experts of a MoE model.
pub struct ExpertPair<M> {
    /// Expert for the early, high-noise steps.
    pub high_noise: Expert<M>,
    /// Expert for the late, low-noise steps.
    pub low_noise: Expert<M>,
}

impl<M> ExpertPair<M> {
    pub fn new(high_noise: Expert<M>, low_noise: Expert<M>) -> Self {
        Self {
            high_noise,
            low_noise,
        }
    }
}

impl<M> Clone for ExpertPair<M> {
    fn clone(&self) -> Self {
        Self::new(self.high_noise.clone(), self.low_noise.clone())
    }
}

impl<M> fmt::Debug for ExpertPair<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpertPair")
            .field("high_noise", &self.high_noise)
            .field("low_noise", &self.low_noise)
            .finish()
    }
}
