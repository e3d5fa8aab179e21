//! Schedule resolution and shift configuration for experts.

use std::borrow::Cow;

use tracing::debug;

use crate::types::Expert;

use super::noise_schedule::{FlowSchedule, NoiseSchedule, FIXED_MULTIPLIER};

/// Returns the expert's active schedule, or a fresh default one.
///
/// An attached schedule is borrowed as-is. Otherwise a flow schedule is
/// built from the expert's [`ModelConfig`](crate::types::ModelConfig); that
/// schedule is NOT attached to the expert. Use [`apply_shift`] when the
/// schedule must persist.
pub fn get_or_create_schedule<M>(expert: &Expert<M>) -> Cow<'_, NoiseSchedule> {
    match expert.schedule() {
        Some(schedule) => Cow::Borrowed(schedule),
        None => Cow::Owned(expert.config.default_schedule()),
    }
}

/// Returns a copy of `expert` with a flow schedule at `shift` installed.
///
/// The multiplier is pinned to [`FIXED_MULTIPLIER`]. A discrete schedule
/// cannot be shifted and is replaced by a flow schedule. The input expert
/// keeps its previous schedule.
pub fn apply_shift<M>(expert: &Expert<M>, shift: f64) -> Expert<M> {
    let schedule = match get_or_create_schedule(expert).into_owned() {
        NoiseSchedule::DiscreteFlow(mut flow) => {
            flow.set_parameters(shift, FIXED_MULTIPLIER);
            NoiseSchedule::DiscreteFlow(flow)
        }
        NoiseSchedule::Discrete(_) => {
            NoiseSchedule::DiscreteFlow(FlowSchedule::new(shift, FIXED_MULTIPLIER))
        }
    };

    debug!("Installed shift {} on expert '{}'", shift, expert.name);
    expert.clone().with_schedule(schedule)
}

/// Projects a sigma to the `[0, 1]` timestep scale used for boundaries.
pub fn normalize_timestep(schedule: &NoiseSchedule, sigma: f64) -> f64 {
    schedule.timestep(sigma) / FIXED_MULTIPLIER
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DiscreteSchedule;
    use crate::types::ModelConfig;
    use std::sync::Arc;

    fn expert() -> Expert<()> {
        Expert::new("test", Arc::new(()), ModelConfig::wan_video())
    }

    #[test]
    fn attached_schedule_is_borrowed() {
        let expert = expert().with_schedule(NoiseSchedule::flow(5.0, FIXED_MULTIPLIER));
        let schedule = get_or_create_schedule(&expert);
        assert!(matches!(schedule, Cow::Borrowed(_)));
        assert_eq!(schedule.shift(), Some(5.0));
    }

    #[test]
    fn missing_schedule_is_created_but_not_attached() {
        let expert = expert();
        let schedule = get_or_create_schedule(&expert);
        assert!(matches!(schedule, Cow::Owned(_)));
        assert_eq!(schedule.shift(), Some(1.0));
        assert!(expert.schedule().is_none());
    }

    #[test]
    fn apply_shift_installs_schedule() {
        let original = expert();
        let shifted = apply_shift(&original, 8.0);

        assert_eq!(shifted.schedule(), Some(&NoiseSchedule::flow(8.0, FIXED_MULTIPLIER)));
        assert!(original.schedule().is_none());
        assert!(Arc::ptr_eq(&original.model, &shifted.model));
    }

    #[test]
    fn apply_shift_overwrites_existing_shift() {
        let first = apply_shift(&expert(), 3.0);
        let second = apply_shift(&first, 8.0);
        assert_eq!(first.schedule().and_then(|s| s.shift()), Some(3.0));
        assert_eq!(second.schedule().and_then(|s| s.shift()), Some(8.0));
    }

    #[test]
    fn apply_shift_pins_multiplier() {
        let mut config = ModelConfig::wan_video();
        config.multiplier = 1.0;
        let expert = Expert::new("test", Arc::new(()), config);
        let shifted = apply_shift(&expert, 2.0);

        match shifted.schedule() {
            Some(NoiseSchedule::DiscreteFlow(flow)) => {
                assert_eq!(flow.multiplier(), FIXED_MULTIPLIER)
            }
            other => panic!("expected flow schedule, got {:?}", other),
        }
    }

    #[test]
    fn apply_shift_replaces_discrete_schedule() {
        let expert = expert().with_schedule(NoiseSchedule::Discrete(DiscreteSchedule::default()));
        let shifted = apply_shift(&expert, 8.0);
        assert_eq!(shifted.schedule().and_then(|s| s.shift()), Some(8.0));
    }

    #[test]
    fn normalize_flow_timestep() {
        let schedule = NoiseSchedule::flow(8.0, FIXED_MULTIPLIER);
        assert!((normalize_timestep(&schedule, 0.875) - 0.875).abs() < 1e-12);
        assert_eq!(normalize_timestep(&schedule, 0.0), 0.0);
    }
}
