//! Noise schedules and their attachment to experts.
//!
//! ## Components
//!
//! - [`noise_schedule`]: Flow and discrete schedules behind one enum
//! - [`adapter`]: Resolving an expert's schedule and installing shifts

pub mod adapter;
pub mod noise_schedule;

// Re-export commonly used types
pub use adapter::{apply_shift, get_or_create_schedule, normalize_timestep};
pub use noise_schedule::{
    DiscreteSchedule, FlowSchedule, NoiseSchedule, FIXED_MULTIPLIER, NUM_TRAIN_TIMESTEPS,
};
