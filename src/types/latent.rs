//! Latent container threaded through a sampling run.

use ndarray::{ArrayD, Axis, IxDyn};

use super::config::ModelConfig;

/// Latent tensor plus the optional metadata that travels with it.
///
/// Shape is `[batch, channels, ...]`: four axes for images, five for video.
#[derive(Debug, Clone, PartialEq)]
pub struct Latent {
    /// The latent samples.
    pub samples: ArrayD<f32>,
    /// Per-sample batch indices used to select deterministic noise.
    pub batch_index: Option<Vec<usize>>,
    /// Denoise mask forwarded to the sampler untouched.
    pub noise_mask: Option<ArrayD<f32>>,
}

impl Latent {
    /// Wraps samples with no metadata.
    pub fn new(samples: ArrayD<f32>) -> Self {
        Self {
            samples,
            batch_index: None,
            noise_mask: None,
        }
    }

    /// Creates an all-zero latent of the given shape.
    pub fn empty(shape: &[usize]) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn with_batch_index(mut self, batch_index: Vec<usize>) -> Self {
        self.batch_index = Some(batch_index);
        self
    }

    pub fn with_noise_mask(mut self, noise_mask: ArrayD<f32>) -> Self {
        self.noise_mask = Some(noise_mask);
        self
    }

    /// Returns a copy with `samples` replaced and all metadata kept.
    pub fn replace_samples(&self, samples: ArrayD<f32>) -> Self {
        Self {
            samples,
            batch_index: self.batch_index.clone(),
            noise_mask: self.noise_mask.clone(),
        }
    }
}

/// Adapts an empty latent to the channel layout a model expects.
///
/// An all-zero latent whose channel axis differs from the model's
/// `latent_channels` is replaced with zeros of the right channel count.
/// A 4-D latent fed to a video model gains a unit time axis at position 2.
/// Non-empty latents keep their channels.
pub fn fix_empty_latent_channels(config: &ModelConfig, samples: ArrayD<f32>) -> ArrayD<f32> {
    let mut samples = samples;

    if samples.ndim() >= 2
        && samples.shape()[1] != config.latent_channels
        && samples.iter().all(|&v| v == 0.0)
    {
        let mut shape = samples.shape().to_vec();
        shape[1] = config.latent_channels;
        samples = ArrayD::zeros(IxDyn(&shape));
    }

    if config.latent_dimensions == 3 && samples.ndim() == 4 {
        samples = samples.insert_axis(Axis(2));
    }

    samples
}
