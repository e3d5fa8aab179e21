//! moe-sampler: two-expert (mixture-of-experts) denoising scheduler.
//!
//! MoE video diffusion models such as Wan 2.2 ship two experts: one tuned
//! for the early, high-noise steps and one for the late, low-noise steps.
//! This crate decides where along the sigma schedule to hand over from one
//! to the other and drives an external sampler through both halves.
//!
//! # Modules
//!
//! - [`schedule`]: Noise schedules, shift installation, timestep normalization
//! - [`generation`]: Boundary splitting, step-range planning, the orchestrator
//! - [`nodes`]: Parameter-validated sampler and sigma-splitting nodes
//! - [`types`]: Expert handles, model configuration, latents
//! - [`config`]: Runtime configuration (MoeConfig)
//! - [`error`]: Error types and codes (SamplerError, ErrorCode)
//! - [`logging`]: Tracing subscriber setup
//! - [`cli`]: Command-line interface of the `moe-sampler` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use moe_sampler::{
//!     generation::DualExpertSampler,
//!     nodes::MoeKSampler,
//!     types::{Expert, ExpertPair, Latent, ModelConfig},
//! };
//!
//! // `engine` implements `generation::Sampler`
//! let mut pipeline = DualExpertSampler::new(engine);
//! let experts = ExpertPair::new(
//!     Expert::new("wan2.2_t2v_high_noise", high_model, ModelConfig::wan_video()),
//!     Expert::new("wan2.2_t2v_low_noise", low_model, ModelConfig::wan_video()),
//! );
//!
//! let node = MoeKSampler { seed: 42, ..Default::default() };
//! let latent = Latent::empty(&[1, 16, 21, 60, 104]);
//! let out = node.sample(&mut pipeline, &experts, positive, negative, &latent)?;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod nodes;
pub mod schedule;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::MoeConfig;
pub use error::{ErrorCode, Result, SamplerError};
pub use generation::{DualExpertSampler, MoeRequest, RunPlan, Sampler, SigmaSplit};
pub use nodes::{MoeKSampler, MoeKSamplerAdvanced, SplitSigmasAtBoundary};
pub use schedule::{apply_shift, get_or_create_schedule, NoiseSchedule};
pub use types::{Expert, ExpertPair, Latent, ModelConfig};
