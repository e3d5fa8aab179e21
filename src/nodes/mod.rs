//! Node adapters.
//!
//! Parameter-validated entry points that wire the schedule, boundary and
//! orchestrator pieces together:
//!
//! - [`MoeKSampler`]: full-range dual-expert sampling
//! - [`MoeKSamplerAdvanced`]: explicit step range and noise toggles
//! - [`SplitSigmasAtBoundary`]: sigma splitting for custom sampler graphs

pub mod ksampler;
pub mod options;
pub mod split_sigmas;

pub use ksampler::{MoeKSampler, MoeKSamplerAdvanced};
pub use options::{AddNoise, LeftoverNoise, SAMPLER_NAMES, SCHEDULER_NAMES};
pub use split_sigmas::SplitSigmasAtBoundary;
