//! MoE KSampler nodes.
//!
//! Each node validates its parameters, installs the per-expert shift and
//! hands a [`MoeRequest`] to the [`DualExpertSampler`].

use serde::{Deserialize, Serialize};

use crate::config::MoeConfig;
use crate::error::Result;
use crate::generation::{DualExpertSampler, MoeRequest, NoiseSource, Sampler, DEFAULT_BOUNDARY};
use crate::schedule::apply_shift;
use crate::types::{ExpertPair, Latent};

use super::options::{
    check_range, check_sampler, check_scheduler, check_steps, AddNoise, LeftoverNoise, MAX_CFG,
    MAX_SHIFT, MAX_STEPS,
};

/// Dual-expert sampler over the full schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoeKSampler {
    pub boundary: f64,
    pub seed: u64,
    pub steps: u32,
    pub cfg_high_noise: f64,
    pub cfg_low_noise: f64,
    pub sampler_name: String,
    pub scheduler: String,
    pub sigma_shift_high: f64,
    pub sigma_shift_low: f64,
    pub denoise: f64,
}

impl Default for MoeKSampler {
    fn default() -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY,
            seed: 0,
            steps: 20,
            cfg_high_noise: 4.0,
            cfg_low_noise: 3.0,
            sampler_name: "euler".to_string(),
            scheduler: "simple".to_string(),
            sigma_shift_high: 8.0,
            sigma_shift_low: 8.0,
            denoise: 1.0,
        }
    }
}

impl MoeKSampler {
    /// Node with its defaults taken from `config`.
    pub fn from_config(config: &MoeConfig) -> Self {
        Self {
            boundary: config.boundary,
            seed: 0,
            steps: config.steps,
            cfg_high_noise: config.cfg_high,
            cfg_low_noise: config.cfg_low,
            sampler_name: config.sampler_name.clone(),
            scheduler: config.scheduler_name.clone(),
            sigma_shift_high: config.shift_high,
            sigma_shift_low: config.shift_low,
            denoise: config.denoise,
        }
    }

    /// Checks every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_range("boundary", self.boundary, 0.0, 1.0)?;
        check_steps("steps", self.steps, 1, MAX_STEPS)?;
        check_range("cfg_high_noise", self.cfg_high_noise, 0.0, MAX_CFG)?;
        check_range("cfg_low_noise", self.cfg_low_noise, 0.0, MAX_CFG)?;
        check_sampler(&self.sampler_name)?;
        check_scheduler(&self.scheduler)?;
        check_range("sigma_shift_high", self.sigma_shift_high, 0.0, MAX_SHIFT)?;
        check_range("sigma_shift_low", self.sigma_shift_low, 0.0, MAX_SHIFT)?;
        check_range("denoise", self.denoise, 0.0, 1.0)
    }

    /// Builds the orchestrator request for this node.
    pub fn request<C>(&self, positive: C, negative: C) -> MoeRequest<C> {
        MoeRequest {
            seed: self.seed,
            steps: self.steps,
            cfg: (self.cfg_high_noise, self.cfg_low_noise),
            sampler_name: self.sampler_name.clone(),
            scheduler_name: self.scheduler.clone(),
            positive,
            negative,
            boundary: self.boundary,
            denoise: self.denoise,
            disable_noise: false,
            start_step: None,
            last_step: None,
            force_full_denoise: true,
        }
    }

    /// Denoises `latent` with the shifted experts.
    pub fn sample<S, N>(
        &self,
        pipeline: &mut DualExpertSampler<S, N>,
        experts: &ExpertPair<S::Model>,
        positive: S::Conditioning,
        negative: S::Conditioning,
        latent: &Latent,
    ) -> Result<Latent>
    where
        S: Sampler,
        N: NoiseSource,
    {
        self.validate()?;
        let shifted = shift_experts(experts, self.sigma_shift_high, self.sigma_shift_low);
        pipeline.run(&shifted, &self.request(positive, negative), latent)
    }
}

/// Dual-expert sampler with explicit step range and noise toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoeKSamplerAdvanced {
    pub boundary: f64,
    pub add_noise: AddNoise,
    pub noise_seed: u64,
    pub steps: u32,
    pub cfg_high_noise: f64,
    pub cfg_low_noise: f64,
    pub sampler_name: String,
    pub scheduler: String,
    pub sigma_shift_high: f64,
    pub sigma_shift_low: f64,
    pub start_at_step: u32,
    pub end_at_step: u32,
    pub return_with_leftover_noise: LeftoverNoise,
}

impl Default for MoeKSamplerAdvanced {
    fn default() -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY,
            add_noise: AddNoise::Enable,
            noise_seed: 0,
            steps: 20,
            cfg_high_noise: 8.0,
            cfg_low_noise: 8.0,
            sampler_name: "euler".to_string(),
            scheduler: "simple".to_string(),
            sigma_shift_high: 8.0,
            sigma_shift_low: 8.0,
            start_at_step: 0,
            end_at_step: MAX_STEPS,
            return_with_leftover_noise: LeftoverNoise::Disable,
        }
    }
}

impl MoeKSamplerAdvanced {
    /// Node with its defaults taken from `config`. The step range stays full.
    pub fn from_config(config: &MoeConfig) -> Self {
        Self {
            boundary: config.boundary,
            steps: config.steps,
            cfg_high_noise: config.cfg_high,
            cfg_low_noise: config.cfg_low,
            sampler_name: config.sampler_name.clone(),
            scheduler: config.scheduler_name.clone(),
            sigma_shift_high: config.shift_high,
            sigma_shift_low: config.shift_low,
            ..Self::default()
        }
    }

    /// Checks every parameter against its allowed range.
    ///
    /// Ordering of `start_at_step` and `end_at_step` is checked by the
    /// orchestrator.
    pub fn validate(&self) -> Result<()> {
        check_range("boundary", self.boundary, 0.0, 1.0)?;
        check_steps("steps", self.steps, 1, MAX_STEPS)?;
        check_range("cfg_high_noise", self.cfg_high_noise, 0.0, MAX_CFG)?;
        check_range("cfg_low_noise", self.cfg_low_noise, 0.0, MAX_CFG)?;
        check_sampler(&self.sampler_name)?;
        check_scheduler(&self.scheduler)?;
        check_range("sigma_shift_high", self.sigma_shift_high, 0.0, MAX_SHIFT)?;
        check_range("sigma_shift_low", self.sigma_shift_low, 0.0, MAX_SHIFT)?;
        check_steps("start_at_step", self.start_at_step, 0, MAX_STEPS)?;
        check_steps("end_at_step", self.end_at_step, 0, MAX_STEPS)
    }

    /// Builds the orchestrator request for this node.
    pub fn request<C>(&self, positive: C, negative: C) -> MoeRequest<C> {
        MoeRequest {
            seed: self.noise_seed,
            steps: self.steps,
            cfg: (self.cfg_high_noise, self.cfg_low_noise),
            sampler_name: self.sampler_name.clone(),
            scheduler_name: self.scheduler.clone(),
            positive,
            negative,
            boundary: self.boundary,
            denoise: 1.0,
            disable_noise: self.add_noise == AddNoise::Disable,
            start_step: Some(self.start_at_step as usize),
            last_step: Some(self.end_at_step as usize),
            force_full_denoise: self.return_with_leftover_noise == LeftoverNoise::Disable,
        }
    }

    /// Denoises `latent` over `start_at_step..end_at_step`.
    pub fn sample<S, N>(
        &self,
        pipeline: &mut DualExpertSampler<S, N>,
        experts: &ExpertPair<S::Model>,
        positive: S::Conditioning,
        negative: S::Conditioning,
        latent: &Latent,
    ) -> Result<Latent>
    where
        S: Sampler,
        N: NoiseSource,
    {
        self.validate()?;
        let shifted = shift_experts(experts, self.sigma_shift_high, self.sigma_shift_low);
        pipeline.run(&shifted, &self.request(positive, negative), latent)
    }
}

/// Derives a pair with each expert's shift installed; the input pair is
/// left untouched.
fn shift_experts<M>(experts: &ExpertPair<M>, shift_high: f64, shift_low: f64) -> ExpertPair<M> {
    ExpertPair::new(
        apply_shift(&experts.high_noise, shift_high),
        apply_shift(&experts.low_noise, shift_low),
    )
}
