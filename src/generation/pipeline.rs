//! Dual-expert sampling pipeline.
//!
//! Orchestrates the two experts of a MoE model: computes where the schedule
//! crosses the boundary, then delegates each expert's share of the steps to
//! the external sampler, threading the latent from one call to the next.

use ndarray::ArrayD;
use tracing::{debug, info};

use crate::config::MoeConfig;
use crate::error::Result;
use crate::schedule::{get_or_create_schedule, NoiseSchedule};
use crate::types::{fix_empty_latent_channels, Expert, ExpertPair, Latent};

use super::boundary::{find_switch_step, DEFAULT_BOUNDARY};
use super::plan::{ExpertRole, RunPlan, StepRange};
use super::sampler::{NoiseSource, SampleRequest, Sampler, SeededNoise};

/// Parameters of one dual-expert run.
#[derive(Debug, Clone)]
pub struct MoeRequest<C> {
    /// Seed for the initial noise.
    pub seed: u64,
    /// Number of steps in the full schedule.
    pub steps: u32,
    /// CFG scales as `(high_noise, low_noise)`.
    pub cfg: (f64, f64),
    pub sampler_name: String,
    pub scheduler_name: String,
    pub positive: C,
    pub negative: C,
    /// Normalized timestep at which the low-noise expert takes over.
    pub boundary: f64,
    pub denoise: f64,
    pub disable_noise: bool,
    /// First step to run; `None` starts at 0.
    pub start_step: Option<usize>,
    /// Step to stop before; `None` runs to the end.
    pub last_step: Option<usize>,
    pub force_full_denoise: bool,
}

impl<C> MoeRequest<C> {
    /// Creates a full-range request with default settings.
    pub fn new(positive: C, negative: C) -> Self {
        Self {
            seed: 0,
            steps: 20,
            cfg: (4.0, 3.0),
            sampler_name: "euler".to_string(),
            scheduler_name: "simple".to_string(),
            positive,
            negative,
            boundary: DEFAULT_BOUNDARY,
            denoise: 1.0,
            disable_noise: false,
            start_step: None,
            last_step: None,
            force_full_denoise: false,
        }
    }

    /// Returns the CFG scale for an expert.
    pub fn cfg_for(&self, role: ExpertRole) -> f64 {
        match role {
            ExpertRole::HighNoise => self.cfg.0,
            ExpertRole::LowNoise => self.cfg.1,
        }
    }
}

/// Plans a run over an already computed sigma sequence.
///
/// `schedule` must be the high-noise expert's schedule, the one the sigmas
/// were derived from.
pub fn plan_with_sigmas<C>(
    schedule: &NoiseSchedule,
    sigmas: &[f64],
    request: &MoeRequest<C>,
) -> Result<RunPlan> {
    let range = StepRange::new(request.start_step, request.last_step, request.steps)?;
    let switch_step = find_switch_step(schedule, sigmas, request.boundary)?;

    Ok(RunPlan::new(
        range,
        request.steps,
        switch_step,
        request.disable_noise,
        request.force_full_denoise,
    ))
}

/// Runs a sampler against a pair of experts.
pub struct DualExpertSampler<S, N = SeededNoise> {
    sampler: S,
    noise: N,
    disable_progress: bool,
}

impl<S: Sampler> DualExpertSampler<S, SeededNoise> {
    /// Creates a pipeline using [`SeededNoise`] for initial noise.
    pub fn new(sampler: S) -> Self {
        Self::with_noise_source(sampler, SeededNoise)
    }

    /// Creates a pipeline whose progress flag follows `config`.
    pub fn from_config(sampler: S, config: &MoeConfig) -> Self {
        Self::new(sampler).disable_progress(config.disable_progress())
    }
}

impl<S: Sampler, N: NoiseSource> DualExpertSampler<S, N> {
    /// Creates a pipeline with a custom noise source.
    pub fn with_noise_source(sampler: S, noise: N) -> Self {
        Self {
            sampler,
            noise,
            disable_progress: false,
        }
    }

    /// Sets the progress-bar flag forwarded to every sampler call.
    pub fn disable_progress(mut self, disable: bool) -> Self {
        self.disable_progress = disable;
        self
    }

    /// Returns the wrapped sampler.
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Computes which expert runs which steps, without sampling.
    ///
    /// Fails with `INVALID_STEP_RANGE` when the requested range violates
    /// its preconditions.
    pub fn plan(
        &self,
        experts: &ExpertPair<S::Model>,
        request: &MoeRequest<S::Conditioning>,
    ) -> Result<RunPlan> {
        // Reject bad ranges before asking the sampler for sigmas.
        StepRange::new(request.start_step, request.last_step, request.steps)?;

        let schedule = get_or_create_schedule(&experts.high_noise);
        let sigmas = self
            .sampler
            .calculate_sigmas(&schedule, &request.scheduler_name, request.steps)?;
        plan_with_sigmas(&schedule, &sigmas, request)
    }

    /// Denoises `latent` with both experts.
    ///
    /// Returns a copy of `latent` whose samples are the final sampler
    /// output. Sampler and noise errors are returned as-is; nothing is
    /// retried.
    pub fn run(
        &mut self,
        experts: &ExpertPair<S::Model>,
        request: &MoeRequest<S::Conditioning>,
        latent: &Latent,
    ) -> Result<Latent> {
        let plan = self.plan(experts, request)?;
        info!("Switching model at step {}", plan.switch_step);

        // Noise is shaped after the first expert's channel layout so it
        // matches the latent that expert receives.
        let mut samples = match plan.runnable().next() {
            Some(first) => {
                let expert = expert_for(experts, first.role);
                fix_empty_latent_channels(&expert.config, latent.samples.clone())
            }
            None => latent.samples.clone(),
        };

        let noise = if request.disable_noise {
            ArrayD::zeros(samples.raw_dim())
        } else {
            self.noise
                .prepare_noise(&samples, request.seed, latent.batch_index.as_deref())?
        };

        for run in plan.runnable() {
            let expert = expert_for(experts, run.role);
            info!("Running {} expert '{}'", run.role, expert.name);
            debug!(
                "steps {}..{:?}, disable_noise={}, force_full_denoise={}",
                run.start_step, run.last_step, run.disable_noise, run.force_full_denoise
            );

            let latent_image = fix_empty_latent_channels(&expert.config, samples);
            samples = self.sampler.sample(
                expert,
                &noise,
                SampleRequest {
                    steps: request.steps,
                    cfg: request.cfg_for(run.role),
                    sampler_name: &request.sampler_name,
                    scheduler_name: &request.scheduler_name,
                    positive: &request.positive,
                    negative: &request.negative,
                    latent_image,
                    denoise: request.denoise,
                    disable_noise: run.disable_noise,
                    start_step: run.start_step,
                    last_step: run.last_step.as_option(),
                    force_full_denoise: run.force_full_denoise,
                    noise_mask: latent.noise_mask.as_ref(),
                    disable_progress: self.disable_progress,
                    seed: request.seed,
                },
            )?;
        }

        Ok(latent.replace_samples(samples))
    }
}

fn expert_for<M>(experts: &ExpertPair<M>, role: ExpertRole) -> &Expert<M> {
    match role {
        ExpertRole::HighNoise => &experts.high_noise,
        ExpertRole::LowNoise => &experts.low_noise,
    }
}
