//! Noise schedules mapping between sigma and model timestep.
//!
//! A schedule answers two questions for a model: "what sigma sits at this
//! timestep" and "what timestep does this sigma correspond to". Two families
//! are supported:
//!
//! - [`FlowSchedule`]: discrete flow matching with constant (CONST) prediction,
//!   warped by a `shift` parameter. This is what MoE video experts use.
//! - [`DiscreteSchedule`]: the classic 1000-step scaled-linear epsilon schedule.

use serde::{Deserialize, Serialize};

/// Multiplier installed by the shift configurator.
///
/// Maps a normalized flow position in `[0, 1]` to the model's timestep range.
pub const FIXED_MULTIPLIER: f64 = 1000.0;

/// Number of training timesteps in the discrete tables.
pub const NUM_TRAIN_TIMESTEPS: usize = 1000;

// ============================================================================
// FlowSchedule
// ============================================================================

/// Shifted discrete-flow schedule.
///
/// `sigma(t) = shift * p / (1 + (shift - 1) * p)` with `p = t / multiplier`,
/// and `timestep(sigma) = sigma * multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSchedule {
    shift: f64,
    multiplier: f64,
}

impl FlowSchedule {
    /// Creates a flow schedule with the given shift and multiplier.
    pub fn new(shift: f64, multiplier: f64) -> Self {
        Self { shift, multiplier }
    }

    /// Returns the shift parameter.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// Returns the timestep multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Replaces both schedule parameters.
    pub fn set_parameters(&mut self, shift: f64, multiplier: f64) {
        self.shift = shift;
        self.multiplier = multiplier;
    }

    /// Returns the sigma at the given model timestep.
    pub fn sigma(&self, timestep: f64) -> f64 {
        time_snr_shift(self.shift, timestep / self.multiplier)
    }

    /// Returns the model timestep for a sigma.
    pub fn timestep(&self, sigma: f64) -> f64 {
        sigma * self.multiplier
    }

    /// Returns the sigma at a fraction of the way through sampling.
    pub fn percent_to_sigma(&self, percent: f64) -> f64 {
        if percent <= 0.0 {
            return 1.0;
        }
        if percent >= 1.0 {
            return 0.0;
        }
        time_snr_shift(self.shift, 1.0 - percent)
    }

    /// Smallest non-zero sigma in the training table.
    pub fn sigma_min(&self) -> f64 {
        self.sigma(self.multiplier / NUM_TRAIN_TIMESTEPS as f64)
    }

    /// Largest sigma in the training table.
    pub fn sigma_max(&self) -> f64 {
        self.sigma(self.multiplier)
    }
}

impl Default for FlowSchedule {
    fn default() -> Self {
        Self::new(1.0, FIXED_MULTIPLIER)
    }
}

/// Warps a flow position by `alpha`. Identity when `alpha == 1`.
fn time_snr_shift(alpha: f64, t: f64) -> f64 {
    if alpha == 1.0 {
        return t;
    }
    alpha * t / (1.0 + (alpha - 1.0) * t)
}

// ============================================================================
// DiscreteSchedule
// ============================================================================

/// Scaled-linear discrete schedule with a 1000-entry sigma table.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteSchedule {
    /// Sigmas indexed by training timestep (increasing).
    sigmas: Vec<f64>,
    /// Natural log of `sigmas`.
    log_sigmas: Vec<f64>,
}

impl DiscreteSchedule {
    /// Builds the schedule from linear beta endpoints.
    ///
    /// Betas are spaced linearly in square-root space, as in Stable Diffusion.
    pub fn scaled_linear(linear_start: f64, linear_end: f64) -> Self {
        let n = NUM_TRAIN_TIMESTEPS;
        let (lo, hi) = (linear_start.sqrt(), linear_end.sqrt());

        let mut alphas_cumprod = 1.0_f64;
        let mut sigmas = Vec::with_capacity(n);
        for i in 0..n {
            let root = lo + (hi - lo) * i as f64 / (n - 1) as f64;
            let beta = root * root;
            alphas_cumprod *= 1.0 - beta;
            sigmas.push(((1.0 - alphas_cumprod) / alphas_cumprod).sqrt());
        }

        Self::from_sigmas(sigmas)
    }

    /// Builds the schedule from an increasing sigma table.
    pub fn from_sigmas(sigmas: Vec<f64>) -> Self {
        let log_sigmas = sigmas.iter().map(|s| s.ln()).collect();
        Self { sigmas, log_sigmas }
    }

    /// Returns the sigma table.
    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }

    /// Returns the interpolated timestep for a sigma.
    ///
    /// Sigmas at or below zero map to timestep 0.
    pub fn timestep(&self, sigma: f64) -> f64 {
        if sigma <= 0.0 || self.log_sigmas.len() < 2 {
            return 0.0;
        }
        let log_sigma = sigma.ln();
        let max_low = self.log_sigmas.len() - 2;

        let low_idx = self
            .log_sigmas
            .iter()
            .rposition(|&ls| log_sigma - ls >= 0.0)
            .unwrap_or(0)
            .min(max_low);
        let high_idx = low_idx + 1;

        let low = self.log_sigmas[low_idx];
        let high = self.log_sigmas[high_idx];
        let w = ((low - log_sigma) / (low - high)).clamp(0.0, 1.0);

        (1.0 - w) * low_idx as f64 + w * high_idx as f64
    }

    /// Returns the interpolated sigma at a timestep.
    pub fn sigma(&self, timestep: f64) -> f64 {
        let Some(last) = self.log_sigmas.len().checked_sub(1) else {
            return 0.0;
        };
        let t = timestep.clamp(0.0, last as f64);
        let low_idx = t.floor() as usize;
        let high_idx = t.ceil() as usize;
        let w = t.fract();
        let log_sigma = (1.0 - w) * self.log_sigmas[low_idx] + w * self.log_sigmas[high_idx];
        log_sigma.exp()
    }

    /// Returns the sigma at a fraction of the way through sampling.
    pub fn percent_to_sigma(&self, percent: f64) -> f64 {
        if percent <= 0.0 {
            return 999_999_999.9;
        }
        if percent >= 1.0 {
            return 0.0;
        }
        let remaining = 1.0 - percent;
        self.sigma(remaining * (NUM_TRAIN_TIMESTEPS - 1) as f64)
    }

    /// Smallest sigma in the table.
    pub fn sigma_min(&self) -> f64 {
        self.sigmas.first().copied().unwrap_or(0.0)
    }

    /// Largest sigma in the table.
    pub fn sigma_max(&self) -> f64 {
        self.sigmas.last().copied().unwrap_or(0.0)
    }
}

impl Default for DiscreteSchedule {
    fn default() -> Self {
        Self::scaled_linear(0.00085, 0.012)
    }
}

// ============================================================================
// NoiseSchedule enum for dispatch
// ============================================================================

/// Active noise schedule of a model.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseSchedule {
    DiscreteFlow(FlowSchedule),
    Discrete(DiscreteSchedule),
}

impl NoiseSchedule {
    /// Default flow schedule with the given shift and multiplier.
    pub fn flow(shift: f64, multiplier: f64) -> Self {
        NoiseSchedule::DiscreteFlow(FlowSchedule::new(shift, multiplier))
    }

    /// Returns the shift for flow schedules.
    pub fn shift(&self) -> Option<f64> {
        match self {
            NoiseSchedule::DiscreteFlow(s) => Some(s.shift()),
            NoiseSchedule::Discrete(_) => None,
        }
    }

    /// Returns the model timestep for a sigma.
    pub fn timestep(&self, sigma: f64) -> f64 {
        match self {
            NoiseSchedule::DiscreteFlow(s) => s.timestep(sigma),
            NoiseSchedule::Discrete(s) => s.timestep(sigma),
        }
    }

    /// Returns the sigma at a model timestep.
    pub fn sigma(&self, timestep: f64) -> f64 {
        match self {
            NoiseSchedule::DiscreteFlow(s) => s.sigma(timestep),
            NoiseSchedule::Discrete(s) => s.sigma(timestep),
        }
    }

    /// Returns the sigma at a fraction of the way through sampling.
    pub fn percent_to_sigma(&self, percent: f64) -> f64 {
        match self {
            NoiseSchedule::DiscreteFlow(s) => s.percent_to_sigma(percent),
            NoiseSchedule::Discrete(s) => s.percent_to_sigma(percent),
        }
    }

    pub fn sigma_min(&self) -> f64 {
        match self {
            NoiseSchedule::DiscreteFlow(s) => s.sigma_min(),
            NoiseSchedule::Discrete(s) => s.sigma_min(),
        }
    }

    pub fn sigma_max(&self) -> f64 {
        match self {
            NoiseSchedule::DiscreteFlow(s) => s.sigma_max(),
            NoiseSchedule::Discrete(s) => s.sigma_max(),
        }
    }
}

impl Default for NoiseSchedule {
    fn default() -> Self {
        NoiseSchedule::DiscreteFlow(FlowSchedule::default())
    }
}
