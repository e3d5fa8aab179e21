//! Interfaces to the external sampling engine.
//!
//! The iterative sampler and the noise generator live outside this crate.
//! [`Sampler`] and [`NoiseSource`] are the seams the orchestrator drives;
//! [`SeededNoise`] is a deterministic noise source for callers that have no
//! engine-specific one.

use std::collections::HashMap;

use ndarray::{ArrayD, Axis, IxDyn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{Result, SamplerError};
use crate::schedule::NoiseSchedule;
use crate::types::Expert;

/// Arguments of one delegated sampler call.
#[derive(Debug)]
pub struct SampleRequest<'a, C> {
    /// Total steps of the schedule, not of this sub-run.
    pub steps: u32,
    pub cfg: f64,
    pub sampler_name: &'a str,
    pub scheduler_name: &'a str,
    pub positive: &'a C,
    pub negative: &'a C,
    /// Current latent, already adapted to the expert's channel layout.
    pub latent_image: ArrayD<f32>,
    pub denoise: f64,
    pub disable_noise: bool,
    pub start_step: usize,
    /// `None` runs to the end of the schedule.
    pub last_step: Option<usize>,
    pub force_full_denoise: bool,
    pub noise_mask: Option<&'a ArrayD<f32>>,
    pub disable_progress: bool,
    pub seed: u64,
}

/// Iterative sampler that denoises a latent with one model.
pub trait Sampler {
    /// Model handle type carried by [`Expert`].
    type Model;
    /// Encoded conditioning, opaque to this crate.
    type Conditioning;

    /// Returns the decreasing sigma sequence (`steps + 1` values) produced
    /// by the named scheduler for `schedule`.
    fn calculate_sigmas(
        &self,
        schedule: &NoiseSchedule,
        scheduler_name: &str,
        steps: u32,
    ) -> Result<Vec<f64>>;

    /// Runs the sampler over `request.start_step..request.last_step`.
    fn sample(
        &mut self,
        expert: &Expert<Self::Model>,
        noise: &ArrayD<f32>,
        request: SampleRequest<'_, Self::Conditioning>,
    ) -> Result<ArrayD<f32>>;
}

/// Produces initial noise for a latent.
pub trait NoiseSource {
    /// Returns noise shaped like `latent`.
    ///
    /// With `batch_index`, sample `i` receives the noise for batch index
    /// `batch_index[i]`, so a sample's noise does not depend on its batch
    /// position.
    fn prepare_noise(
        &self,
        latent: &ArrayD<f32>,
        seed: u64,
        batch_index: Option<&[usize]>,
    ) -> Result<ArrayD<f32>>;
}

/// Standard-normal noise from a seeded ChaCha8 stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededNoise;

impl NoiseSource for SeededNoise {
    fn prepare_noise(
        &self,
        latent: &ArrayD<f32>,
        seed: u64,
        batch_index: Option<&[usize]>,
    ) -> Result<ArrayD<f32>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let shape = latent.shape();

        let Some(batch_index) = batch_index else {
            return Ok(standard_normal(shape, &mut rng));
        };

        let Some((&batch, per_sample)) = shape.split_first() else {
            return Err(SamplerError::noise_failed("latent has no batch axis"));
        };
        if batch_index.len() != batch {
            return Err(SamplerError::noise_failed(format!(
                "batch_index has {} entries for a batch of {}",
                batch_index.len(),
                batch
            )));
        }
        let Some(&max_index) = batch_index.iter().max() else {
            return Ok(ArrayD::zeros(IxDyn(shape)));
        };

        let mut rows: HashMap<usize, Vec<usize>> = HashMap::new();
        for (row, &index) in batch_index.iter().enumerate() {
            rows.entry(index).or_default().push(row);
        }

        // Index k always gets the k-th draw of the stream; draws nobody
        // asked for are consumed without being stored.
        let per_sample_len: usize = per_sample.iter().product();
        let mut noise = ArrayD::zeros(IxDyn(shape));
        for index in 0..=max_index {
            match rows.get(&index) {
                Some(targets) => {
                    let draw = standard_normal(per_sample, &mut rng);
                    for &row in targets {
                        noise.index_axis_mut(Axis(0), row).assign(&draw);
                    }
                }
                None => skip_standard_normal(per_sample_len, &mut rng),
            }
        }
        Ok(noise)
    }
}

/// Fills an array of `shape` with standard-normal samples.
fn standard_normal(shape: &[usize], rng: &mut ChaCha8Rng) -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(shape), |_| StandardNormal.sample(rng))
}

/// Advances `rng` past `count` standard-normal samples.
fn skip_standard_normal(count: usize, rng: &mut ChaCha8Rng) {
    for _ in 0..count {
        let _: f32 = StandardNormal.sample(rng);
    }
}
