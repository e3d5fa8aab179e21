//! Dual-expert generation.
//!
//! Provides the boundary splitter, step-range planning, the sampler
//! interfaces and the pipeline that ties them together.

pub mod boundary;
pub mod pipeline;
pub mod plan;
pub mod sampler;

// Re-export commonly used items
pub use boundary::{
    find_switch_step, normalized_timesteps, split_sigmas_at_boundary, SigmaSplit,
    DEFAULT_BOUNDARY,
};
pub use pipeline::{plan_with_sigmas, DualExpertSampler, MoeRequest};
pub use plan::{ExpertRole, LastStep, RunPlan, StepRange, SubRun};
pub use sampler::{NoiseSource, SampleRequest, Sampler, SeededNoise};
