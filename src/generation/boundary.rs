//! Locating the step where a schedule crosses the expert boundary.
//!
//! The boundary is a threshold on normalized timestep. The switch step is
//! the first index after the initial sigma whose normalized timestep is
//! strictly below the boundary. Schedules are assumed to decrease
//! monotonically; for a non-monotonic schedule the first crossing wins and
//! later crossings are ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplerError};
use crate::schedule::{normalize_timestep, NoiseSchedule};

/// Default boundary for text-to-video experts.
pub const DEFAULT_BOUNDARY: f64 = 0.875;

/// A sigma sequence split at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaSplit {
    /// `sigmas[..=switch_step]`, ending with the switch sigma.
    pub high: Vec<f64>,
    /// `sigmas[switch_step..]`, starting with the switch sigma.
    pub low: Vec<f64>,
    /// Index of the switch sigma in the input sequence.
    pub switch_step: usize,
}

/// Returns the normalized timestep of every sigma.
pub fn normalized_timesteps(schedule: &NoiseSchedule, sigmas: &[f64]) -> Vec<f64> {
    sigmas
        .iter()
        .map(|&sigma| normalize_timestep(schedule, sigma))
        .collect()
}

/// Finds the first step whose normalized timestep is below `boundary`.
///
/// Index 0 (the initial, full-noise sigma) is never a candidate. Returns
/// `sigmas.len() - 1`, the step count, when the boundary is never crossed,
/// meaning the high-noise expert handles every step.
pub fn find_switch_step(schedule: &NoiseSchedule, sigmas: &[f64], boundary: f64) -> Result<usize> {
    if sigmas.is_empty() {
        return Err(SamplerError::empty_sigmas());
    }

    let timesteps = normalized_timesteps(schedule, sigmas);
    let switch_step = timesteps
        .iter()
        .enumerate()
        .skip(1)
        .find(|&(_, &t)| t < boundary)
        .map(|(i, _)| i)
        .unwrap_or(sigmas.len() - 1);

    Ok(switch_step)
}

/// Splits `sigmas` into high- and low-noise halves at the switch step.
///
/// The switch sigma is shared: it ends `high` and starts `low`.
pub fn split_sigmas_at_boundary(
    schedule: &NoiseSchedule,
    sigmas: &[f64],
    boundary: f64,
) -> Result<SigmaSplit> {
    let switch_step = find_switch_step(schedule, sigmas, boundary)?;

    Ok(SigmaSplit {
        high: sigmas[..=switch_step].to_vec(),
        low: sigmas[switch_step..].to_vec(),
        switch_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::schedule::{FlowSchedule, FIXED_MULTIPLIER};

    const SIGMAS: [f64; 5] = [1.0, 0.7, 0.5, 0.2, 0.0];

    fn identity() -> NoiseSchedule {
        NoiseSchedule::default()
    }

    /// Sigmas of a shifted flow schedule sampled at evenly spaced positions.
    fn shifted_sigmas(steps: usize, shift: f64) -> Vec<f64> {
        let flow = FlowSchedule::new(shift, FIXED_MULTIPLIER);
        (0..=steps)
            .map(|i| flow.sigma(FIXED_MULTIPLIER * (1.0 - i as f64 / steps as f64)))
            .collect()
    }

    #[test]
    fn normalized_timesteps_for_identity_flow() {
        let timesteps = normalized_timesteps(&identity(), &SIGMAS);
        for (t, s) in timesteps.iter().zip(SIGMAS.iter()) {
            assert!((t - s).abs() < 1e-12);
        }
    }

    #[test]
    fn switch_at_first_crossing() {
        // 0.7 >= 0.6, 0.5 < 0.6
        assert_eq!(find_switch_step(&identity(), &SIGMAS, 0.6).unwrap(), 2);
    }

    #[test]
    fn switch_is_smallest_index_below_boundary() {
        let sigmas = shifted_sigmas(20, 8.0);
        let timesteps = normalized_timesteps(&identity(), &sigmas);
        for boundary in [0.1, 0.5, 0.875, 0.9, 0.99] {
            let switch = find_switch_step(&identity(), &sigmas, boundary).unwrap();
            assert!(switch >= 1);
            assert!(timesteps[switch] < boundary);
            assert!(timesteps[1..switch].iter().all(|&t| t >= boundary));
        }
    }

    #[test]
    fn zero_boundary_never_switches() {
        assert_eq!(find_switch_step(&identity(), &SIGMAS, 0.0).unwrap(), 4);
        let sigmas = shifted_sigmas(30, 8.0);
        assert_eq!(find_switch_step(&identity(), &sigmas, 0.0).unwrap(), 30);
    }

    #[test]
    fn unit_boundary_switches_immediately() {
        assert_eq!(find_switch_step(&identity(), &SIGMAS, 1.0).unwrap(), 1);
    }

    #[test]
    fn initial_sigma_is_not_a_candidate() {
        // Every timestep is below the boundary, index 0 included
        let sigmas = [0.4, 0.3, 0.0];
        assert_eq!(find_switch_step(&identity(), &sigmas, 0.5).unwrap(), 1);
    }

    #[test]
    fn non_monotonic_returns_first_crossing() {
        let sigmas = [1.0, 0.9, 0.4, 0.95, 0.3, 0.0];
        assert_eq!(find_switch_step(&identity(), &sigmas, 0.5).unwrap(), 2);
    }

    #[test]
    fn single_sigma_has_switch_zero() {
        assert_eq!(find_switch_step(&identity(), &[1.0], 0.5).unwrap(), 0);
    }

    #[test]
    fn empty_sigmas_rejected() {
        let err = find_switch_step(&identity(), &[], 0.5).unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptySigmas);
    }

    #[test]
    fn split_shares_switch_sigma() {
        let split = split_sigmas_at_boundary(&identity(), &SIGMAS, 0.6).unwrap();
        assert_eq!(split.switch_step, 2);
        assert_eq!(split.high, vec![1.0, 0.7, 0.5]);
        assert_eq!(split.low, vec![0.5, 0.2, 0.0]);
        assert_eq!(split.high.last(), split.low.first());
        assert_eq!(split.high.len() + split.low.len(), SIGMAS.len() + 1);
    }

    #[test]
    fn split_without_crossing_leaves_terminal_sigma_for_low() {
        let split = split_sigmas_at_boundary(&identity(), &SIGMAS, 0.0).unwrap();
        assert_eq!(split.high, SIGMAS.to_vec());
        assert_eq!(split.low, vec![0.0]);
    }

    #[test]
    fn shift_moves_switch_later() {
        let plain = shifted_sigmas(20, 1.0);
        let shifted = shifted_sigmas(20, 8.0);
        let plain_switch = find_switch_step(&identity(), &plain, DEFAULT_BOUNDARY).unwrap();
        let shifted_switch = find_switch_step(&identity(), &shifted, DEFAULT_BOUNDARY).unwrap();
        assert!(shifted_switch > plain_switch);
    }
}
