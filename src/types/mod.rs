//! Core types for the MoE sampler.
//!
//! This module re-exports all the core data types used throughout the crate:
//! - [`ModelConfig`]: Sampling settings of an expert model
//! - [`Expert`] / [`ExpertPair`]: Model handles with their active schedule
//! - [`Latent`]: The latent container threaded between sub-runs

mod config;
mod expert;
mod latent;

// Re-export all types at the module level
pub use config::ModelConfig;
pub use expert::{Expert, ExpertPair};
pub use latent::{fix_empty_latent_channels, Latent};
