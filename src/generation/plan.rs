//! Partitioning a step range between the two experts.
//!
//! Given the switch step, the requested range `[start, last)` is cut into a
//! high-noise part `[start, min(last, switch))` and a low-noise part
//! `[max(start, switch), last)`. The two half-open ranges never overlap and
//! together cover the requested range.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplerError};

/// End of a step range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastStep {
    /// Stop before this step index.
    At(usize),
    /// Run to the end of the schedule.
    Unbounded,
}

impl LastStep {
    /// `None` means unbounded.
    pub fn from_option(last_step: Option<usize>) -> Self {
        match last_step {
            Some(step) => LastStep::At(step),
            None => LastStep::Unbounded,
        }
    }

    /// Returns the bound as an `Option`, `None` when unbounded.
    pub fn as_option(&self) -> Option<usize> {
        match self {
            LastStep::At(step) => Some(*step),
            LastStep::Unbounded => None,
        }
    }

    /// Returns true if this end is at or past `step`.
    pub fn reaches(&self, step: usize) -> bool {
        match self {
            LastStep::At(last) => *last >= step,
            LastStep::Unbounded => true,
        }
    }

    /// Returns the earlier of this end and `step`.
    pub fn min(&self, step: usize) -> usize {
        match self {
            LastStep::At(last) => (*last).min(step),
            LastStep::Unbounded => step,
        }
    }
}

/// Requested half-open step range `[start, last)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub start: usize,
    pub last: LastStep,
}

impl StepRange {
    /// Builds a validated range over a schedule of `steps` steps.
    ///
    /// `start` defaults to 0 and must be below `steps`; `last` defaults to
    /// unbounded and must not precede `start`.
    pub fn new(start: Option<usize>, last: Option<usize>, steps: u32) -> Result<Self> {
        if let Some(start) = start {
            if start >= steps as usize {
                return Err(SamplerError::start_out_of_range(start, steps));
            }
        }
        let start = start.unwrap_or(0);

        if let Some(last) = last {
            if last < start {
                return Err(SamplerError::last_before_start(last, start));
            }
        }

        Ok(Self {
            start,
            last: LastStep::from_option(last),
        })
    }
}

/// Which expert a sub-run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertRole {
    HighNoise,
    LowNoise,
}

impl ExpertRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpertRole::HighNoise => "high_noise",
            ExpertRole::LowNoise => "low_noise",
        }
    }

}

impl std::fmt::Display for ExpertRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One delegated sampler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRun {
    pub role: ExpertRole,
    pub start_step: usize,
    pub last_step: LastStep,
    pub disable_noise: bool,
    pub force_full_denoise: bool,
}

impl SubRun {
    /// Returns true if no step of a `steps`-step schedule falls in this run.
    pub fn is_empty(&self, steps: u32) -> bool {
        self.start_step >= self.last_step.min(steps as usize)
    }
}

/// Participation and flags of both experts for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    pub steps: u32,
    pub switch_step: usize,
    /// Present when the run starts before the switch step.
    pub high: Option<SubRun>,
    /// Present when the run reaches the switch step.
    pub low: Option<SubRun>,
}

impl RunPlan {
    /// Partitions `range` at `switch_step`.
    ///
    /// A high-noise run followed by a low-noise run has its noise disabled
    /// and full denoise forced. The terminal run always receives the
    /// caller's `disable_noise` and `force_full_denoise` unchanged.
    pub fn new(
        range: StepRange,
        steps: u32,
        switch_step: usize,
        disable_noise: bool,
        force_full_denoise: bool,
    ) -> Self {
        let starts_with_high = range.start < switch_step;
        let ends_with_low = range.last.reaches(switch_step);

        let high = starts_with_high.then(|| SubRun {
            role: ExpertRole::HighNoise,
            start_step: range.start,
            last_step: LastStep::At(range.last.min(switch_step)),
            disable_noise: ends_with_low || disable_noise,
            force_full_denoise: ends_with_low || force_full_denoise,
        });

        let low = ends_with_low.then(|| SubRun {
            role: ExpertRole::LowNoise,
            start_step: range.start.max(switch_step),
            last_step: range.last,
            disable_noise,
            force_full_denoise,
        });

        Self {
            steps,
            switch_step,
            high,
            low,
        }
    }

    /// Sub-runs to execute, in order, skipping empty ranges.
    pub fn runnable(&self) -> impl Iterator<Item = SubRun> + '_ {
        [self.high, self.low]
            .into_iter()
            .flatten()
            .filter(move |run| !run.is_empty(self.steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn full() -> StepRange {
        StepRange::new(None, None, 4).unwrap()
    }

    fn steps_covered(plan: &RunPlan) -> Vec<usize> {
        plan.runnable()
            .flat_map(|run| run.start_step..run.last_step.min(plan.steps as usize))
            .collect()
    }

    // ========== StepRange Tests ==========

    #[test]
    fn step_range_defaults() {
        let range = StepRange::new(None, None, 20).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.last, LastStep::Unbounded);
    }

    #[test]
    fn step_range_rejects_start_past_end_of_schedule() {
        let err = StepRange::new(Some(20), None, 20).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStepRange);
        assert!(StepRange::new(Some(19), None, 20).is_ok());
    }

    #[test]
    fn step_range_rejects_last_before_start() {
        let err = StepRange::new(Some(5), Some(4), 20).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStepRange);
        assert!(StepRange::new(Some(5), Some(5), 20).is_ok());
    }

    #[test]
    fn step_range_checks_last_against_default_start() {
        assert!(StepRange::new(None, Some(0), 20).is_ok());
    }

    // ========== LastStep Tests ==========

    #[test]
    fn last_step_bounds() {
        assert!(LastStep::Unbounded.reaches(usize::MAX));
        assert!(LastStep::At(4).reaches(4));
        assert!(!LastStep::At(3).reaches(4));
        assert_eq!(LastStep::Unbounded.min(7), 7);
        assert_eq!(LastStep::At(3).min(7), 3);
        assert_eq!(LastStep::from_option(None).as_option(), None);
        assert_eq!(LastStep::from_option(Some(9)).as_option(), Some(9));
    }

    // ========== RunPlan Tests ==========

    #[test]
    fn full_range_splits_at_switch() {
        let plan = RunPlan::new(full(), 4, 2, false, false);

        let high = plan.high.unwrap();
        assert_eq!(high.start_step, 0);
        assert_eq!(high.last_step, LastStep::At(2));
        assert!(high.disable_noise);
        assert!(high.force_full_denoise);

        let low = plan.low.unwrap();
        assert_eq!(low.start_step, 2);
        assert_eq!(low.last_step, LastStep::Unbounded);
        assert!(!low.disable_noise);
        assert!(!low.force_full_denoise);

        assert_eq!(plan.runnable().count(), 2);
    }

    #[test]
    fn terminal_high_run_keeps_caller_flags() {
        let range = StepRange::new(Some(0), Some(5), 20).unwrap();
        let plan = RunPlan::new(range, 20, 10, false, true);

        assert!(plan.low.is_none());
        let high = plan.high.unwrap();
        assert_eq!(high.last_step, LastStep::At(5));
        assert!(!high.disable_noise);
        assert!(high.force_full_denoise);
    }

    #[test]
    fn start_after_switch_runs_low_only() {
        let range = StepRange::new(Some(12), None, 20).unwrap();
        let plan = RunPlan::new(range, 20, 10, true, false);

        assert!(plan.high.is_none());
        let low = plan.low.unwrap();
        assert_eq!(low.start_step, 12);
        assert!(low.disable_noise);
        assert!(!low.force_full_denoise);
    }

    #[test]
    fn never_crossed_boundary_runs_high_only() {
        let plan = RunPlan::new(full(), 4, 4, false, true);

        // the low expert participates with an empty range and is skipped
        assert!(plan.low.is_some());
        let runs: Vec<_> = plan.runnable().collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].role, ExpertRole::HighNoise);
        assert_eq!(runs[0].last_step, LastStep::At(4));
    }

    #[test]
    fn zero_length_range_runs_nothing() {
        let range = StepRange::new(Some(3), Some(3), 4).unwrap();
        let plan = RunPlan::new(range, 4, 2, false, false);
        assert_eq!(plan.runnable().count(), 0);
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let steps = 12u32;
        for switch in 1..=steps as usize {
            for start in 0..steps as usize {
                let lasts = (start..=steps as usize + 2).map(Some).chain([None]);
                for last in lasts {
                    let range = StepRange::new(Some(start), last, steps).unwrap();
                    let plan = RunPlan::new(range, steps, switch, false, false);
                    let end = range.last.min(steps as usize);
                    let expected: Vec<usize> = (start..end).collect();
                    assert_eq!(
                        steps_covered(&plan),
                        expected,
                        "switch={} start={} last={:?}",
                        switch,
                        start,
                        last
                    );
                }
            }
        }
    }

    #[test]
    fn expert_role_names() {
        assert_eq!(ExpertRole::HighNoise.as_str(), "high_noise");
        assert_eq!(ExpertRole::LowNoise.to_string(), "low_noise");
    }
}
