//! Error types for the MoE sampler.
//!
//! Defines all error codes and types used throughout the crate for
//! consistent error handling and reporting.

use std::fmt;

/// Error codes attached to every [`SamplerError`].
///
/// These codes allow callers to programmatically handle specific error
/// conditions without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Requested step range violates its preconditions.
    /// Trigger: `start_step >= steps` or `last_step < start_step`.
    InvalidStepRange,

    /// A node parameter is outside its documented range.
    /// Trigger: boundary outside [0, 1], steps outside [1, 10000], etc.
    InvalidParameter,

    /// A sigma sequence has no elements.
    /// Trigger: splitting or scanning an empty schedule.
    EmptySigmas,

    /// Sampler name is not one of the known samplers.
    UnknownSampler,

    /// Scheduler name is not one of the known schedulers.
    UnknownScheduler,

    /// The external sampler failed.
    /// Trigger: numerical instability, OOM, model execution error.
    SamplingFailed,

    /// The noise source failed to produce noise.
    NoiseFailed,

    /// Configuration could not be loaded or is inconsistent.
    ConfigInvalid,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidStepRange => "INVALID_STEP_RANGE",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
            ErrorCode::EmptySigmas => "EMPTY_SIGMAS",
            ErrorCode::UnknownSampler => "UNKNOWN_SAMPLER",
            ErrorCode::UnknownScheduler => "UNKNOWN_SCHEDULER",
            ErrorCode::SamplingFailed => "SAMPLING_FAILED",
            ErrorCode::NoiseFailed => "NOISE_FAILED",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidStepRange => "Step range is outside the schedule",
            ErrorCode::InvalidParameter => "Parameter is outside its valid range",
            ErrorCode::EmptySigmas => "Sigma sequence is empty",
            ErrorCode::UnknownSampler => "Sampler name is not recognized",
            ErrorCode::UnknownScheduler => "Scheduler name is not recognized",
            ErrorCode::SamplingFailed => "Sampler failed while denoising",
            ErrorCode::NoiseFailed => "Noise generation failed",
            ErrorCode::ConfigInvalid => "Configuration is invalid",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::InvalidStepRange => {
                "Use a start step below the step count and an end step at or after the start step"
            }
            ErrorCode::InvalidParameter => {
                "Check the parameter against its documented range \
                 (e.g., boundary between 0.0 and 1.0, steps between 1 and 10000)"
            }
            ErrorCode::EmptySigmas => "Provide at least one sigma value (usually steps + 1 values)",
            ErrorCode::UnknownSampler => {
                "Pick a sampler from the supported list (e.g., euler, dpmpp_2m, uni_pc)"
            }
            ErrorCode::UnknownScheduler => {
                "Pick a scheduler from the supported list (e.g., simple, normal, beta)"
            }
            ErrorCode::SamplingFailed => {
                "Inspect the underlying sampler error; try fewer steps or free accelerator memory"
            }
            ErrorCode::NoiseFailed => "Check the latent shape and batch indices",
            ErrorCode::ConfigInvalid => {
                "Fix or delete the configuration file, or unset the MOE_* environment variables"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for sampler operations.
#[derive(Debug)]
pub struct SamplerError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SamplerError {
    /// Creates a new SamplerError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new SamplerError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an INVALID_STEP_RANGE error for a start step past the schedule.
    pub fn start_out_of_range(start_step: usize, steps: u32) -> Self {
        Self::new(
            ErrorCode::InvalidStepRange,
            format!(
                "start_step {} must be less than steps {}",
                start_step, steps
            ),
        )
    }

    /// Creates an INVALID_STEP_RANGE error for an end step before the start step.
    pub fn last_before_start(last_step: usize, start_step: usize) -> Self {
        Self::new(
            ErrorCode::InvalidStepRange,
            format!(
                "last_step {} must not be less than start_step {}",
                last_step, start_step
            ),
        )
    }

    /// Creates an INVALID_PARAMETER error for a value outside `[min, max]`.
    pub fn out_of_range(
        name: &str,
        value: impl fmt::Display,
        min: impl fmt::Display,
        max: impl fmt::Display,
    ) -> Self {
        Self::new(
            ErrorCode::InvalidParameter,
            format!("{} = {} is outside [{}, {}]", name, value, min, max),
        )
    }

    /// Creates an EMPTY_SIGMAS error.
    pub fn empty_sigmas() -> Self {
        Self::new(ErrorCode::EmptySigmas, "Sigma sequence has no elements")
    }

    /// Creates an UNKNOWN_SAMPLER error.
    pub fn unknown_sampler(name: &str) -> Self {
        Self::new(ErrorCode::UnknownSampler, format!("Unknown sampler: {}", name))
    }

    /// Creates an UNKNOWN_SCHEDULER error.
    pub fn unknown_scheduler(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownScheduler,
            format!("Unknown scheduler: {}", name),
        )
    }

    /// Creates a SAMPLING_FAILED error.
    pub fn sampling_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SamplingFailed,
            format!("Sampling failed: {}", reason.into()),
        )
    }

    /// Creates a NOISE_FAILED error.
    pub fn noise_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NoiseFailed,
            format!("Noise generation failed: {}", reason.into()),
        )
    }

    /// Creates a CONFIG_INVALID error.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalid,
            format!("Invalid configuration: {}", reason.into()),
        )
    }
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for SamplerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using SamplerError.
pub type Result<T> = std::result::Result<T, SamplerError>;
