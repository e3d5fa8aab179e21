//! Sigma splitting node.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::generation::{split_sigmas_at_boundary, SigmaSplit, DEFAULT_BOUNDARY};
use crate::schedule::{get_or_create_schedule, NoiseSchedule};
use crate::types::Expert;

use super::options::check_range;

/// Splits a sigma sequence into the high- and low-noise halves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSigmasAtBoundary {
    pub boundary: f64,
}

impl Default for SplitSigmasAtBoundary {
    fn default() -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY,
        }
    }
}

impl SplitSigmasAtBoundary {
    pub fn new(boundary: f64) -> Self {
        Self { boundary }
    }

    /// Splits `sigmas` using the expert's schedule, or the unshifted flow
    /// schedule when no expert is given.
    pub fn split<M>(&self, sigmas: &[f64], expert: Option<&Expert<M>>) -> Result<SigmaSplit> {
        check_range("boundary", self.boundary, 0.0, 1.0)?;

        let schedule = match expert {
            Some(expert) => get_or_create_schedule(expert),
            None => Cow::Owned(NoiseSchedule::default()),
        };
        let split = split_sigmas_at_boundary(&schedule, sigmas, self.boundary)?;

        info!("Splitting sigmas at index {}", split.switch_step);
        Ok(split)
    }
}
