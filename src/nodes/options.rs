//! Enumerated choices and range checks shared by the nodes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplerError};

/// Samplers understood by the sampling engine.
pub const SAMPLER_NAMES: &[&str] = &[
    "euler",
    "euler_cfg_pp",
    "euler_ancestral",
    "euler_ancestral_cfg_pp",
    "heun",
    "heunpp2",
    "dpm_2",
    "dpm_2_ancestral",
    "lms",
    "dpm_fast",
    "dpm_adaptive",
    "dpmpp_2s_ancestral",
    "dpmpp_2s_ancestral_cfg_pp",
    "dpmpp_sde",
    "dpmpp_sde_gpu",
    "dpmpp_2m",
    "dpmpp_2m_cfg_pp",
    "dpmpp_2m_sde",
    "dpmpp_2m_sde_gpu",
    "dpmpp_3m_sde",
    "dpmpp_3m_sde_gpu",
    "ddpm",
    "lcm",
    "ipndm",
    "ipndm_v",
    "deis",
    "res_multistep",
    "res_multistep_cfg_pp",
    "res_multistep_ancestral",
    "res_multistep_ancestral_cfg_pp",
    "gradient_estimation",
    "er_sde",
    "seeds_2",
    "seeds_3",
    "ddim",
    "uni_pc",
    "uni_pc_bh2",
];

/// Sigma schedulers understood by the sampling engine.
pub const SCHEDULER_NAMES: &[&str] = &[
    "simple",
    "sgm_uniform",
    "karras",
    "exponential",
    "ddim_uniform",
    "beta",
    "normal",
    "linear_quadratic",
    "kl_optimal",
];

pub const MAX_STEPS: u32 = 10_000;
pub const MAX_CFG: f64 = 100.0;
pub const MAX_SHIFT: f64 = 100.0;

/// Whether the advanced node adds initial noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddNoise {
    #[default]
    Enable,
    Disable,
}

/// Whether the advanced node leaves residual noise after its last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeftoverNoise {
    #[default]
    Disable,
    Enable,
}

/// Checks a sampler name against [`SAMPLER_NAMES`].
pub fn check_sampler(name: &str) -> Result<()> {
    if SAMPLER_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(SamplerError::unknown_sampler(name))
    }
}

/// Checks a scheduler name against [`SCHEDULER_NAMES`].
pub fn check_scheduler(name: &str) -> Result<()> {
    if SCHEDULER_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(SamplerError::unknown_scheduler(name))
    }
}

/// Checks that `value` lies in `[min, max]`. NaN is rejected.
pub fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SamplerError::out_of_range(name, value, min, max))
    }
}

/// Checks an integer parameter against `[min, max]`.
pub fn check_steps(name: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SamplerError::out_of_range(name, value, min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn known_names_accepted() {
        assert!(check_sampler("euler").is_ok());
        assert!(check_sampler("uni_pc_bh2").is_ok());
        assert!(check_scheduler("simple").is_ok());
        assert!(check_scheduler("beta").is_ok());
    }

    #[test]
    fn unknown_names_rejected() {
        assert_eq!(check_sampler("Euler").unwrap_err().code, ErrorCode::UnknownSampler);
        assert_eq!(check_scheduler("cosine").unwrap_err().code, ErrorCode::UnknownScheduler);
    }

    #[test]
    fn range_checks() {
        assert!(check_range("boundary", 0.0, 0.0, 1.0).is_ok());
        assert!(check_range("boundary", 1.0, 0.0, 1.0).is_ok());
        assert!(check_range("boundary", 1.001, 0.0, 1.0).is_err());
        assert!(check_range("boundary", f64::NAN, 0.0, 1.0).is_err());
        assert!(check_steps("steps", 0, 1, MAX_STEPS).is_err());
        assert!(check_steps("steps", MAX_STEPS, 1, MAX_STEPS).is_ok());
    }

    #[test]
    fn toggle_defaults() {
        assert_eq!(AddNoise::default(), AddNoise::Enable);
        assert_eq!(LeftoverNoise::default(), LeftoverNoise::Disable);
    }

    #[test]
    fn toggle_serde() {
        let v: AddNoise = serde_json::from_str("\"disable\"").unwrap();
        assert_eq!(v, AddNoise::Disable);
        assert_eq!(serde_json::to_string(&LeftoverNoise::Enable).unwrap(), "\"enable\"");
    }
}
