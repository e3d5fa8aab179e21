//! ModelConfig type for expert model sampling settings.
//!
//! Contains the parameters a model exposes to the sampling core: the
//! defaults used to build its noise schedule and the shape of its latents.

use serde::{Deserialize, Serialize};

use crate::schedule::{FlowSchedule, NoiseSchedule, FIXED_MULTIPLIER};

/// Sampling-relevant configuration of an expert model.
///
/// These values normally come from the model's config.json and are used
/// when the model does not already carry an active noise schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default flow shift for the model's schedule.
    pub shift: f64,

    /// Timestep multiplier for the model's schedule.
    pub multiplier: f64,

    /// Number of latent channels the model consumes (16 for Wan 2.x video).
    pub latent_channels: usize,

    /// Spatial rank of the latent: 2 for images, 3 for video.
    pub latent_dimensions: usize,
}

impl ModelConfig {
    /// Creates a ModelConfig for a Wan-style video expert.
    ///
    /// 16-channel video latents with an unshifted flow schedule; the
    /// per-run shift is installed later by the shift configurator.
    pub fn wan_video() -> Self {
        Self {
            shift: 1.0,
            multiplier: FIXED_MULTIPLIER,
            latent_channels: 16,
            latent_dimensions: 3,
        }
    }

    /// Builds the default flow schedule for this configuration.
    pub fn default_schedule(&self) -> NoiseSchedule {
        NoiseSchedule::DiscreteFlow(FlowSchedule::new(self.shift, self.multiplier))
    }

    /// Validates the configuration for consistency.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.multiplier.is_nan() || self.multiplier <= 0.0 {
            return Some(format!("multiplier must be > 0, got {}", self.multiplier));
        }

        if self.shift < 0.0 {
            return Some(format!("shift must be >= 0, got {}", self.shift));
        }

        if self.latent_channels == 0 {
            return Some("latent_channels must be > 0".to_string());
        }

        if !(2..=3).contains(&self.latent_dimensions) {
            return Some(format!(
                "latent_dimensions must be 2 or 3, got {}",
                self.latent_dimensions
            ));
        }

        None
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::wan_video()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wan_video_config() {
        let config = ModelConfig::wan_video();
        assert_eq!(config.latent_channels, 16);
        assert_eq!(config.latent_dimensions, 3);
        assert_eq!(config.multiplier, 1000.0);
        assert!(config.validate().is_none());
    }

    #[test]
    fn config_validation() {
        let mut config = ModelConfig::wan_video();
        config.latent_dimensions = 4;
        assert!(config.validate().is_some());

        let mut config = ModelConfig::wan_video();
        config.multiplier = 0.0;
        assert!(config.validate().is_some());
    }

    #[test]
    fn default_schedule_uses_config_shift() {
        let config = ModelConfig {
            shift: 5.0,
            ..ModelConfig::wan_video()
        };
        assert_eq!(config.default_schedule().shift(), Some(5.0));
    }
}
