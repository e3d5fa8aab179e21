//! Runtime configuration module.
//!
//! Holds the defaults the sampler nodes start from and the progress flag
//! forwarded to the sampling engine. Values come from built-in defaults, a
//! JSON file, or `MOE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SamplerError};
use crate::generation::DEFAULT_BOUNDARY;
use crate::nodes::{SAMPLER_NAMES, SCHEDULER_NAMES};

/// Node defaults and engine flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoeConfig {
    /// Normalized timestep at which the low-noise expert takes over.
    /// Recommended: 0.875 for text-to-video, 0.9 for image-to-video.
    pub boundary: f64,

    /// Number of denoising steps.
    pub steps: u32,

    /// CFG scale for the high-noise expert.
    pub cfg_high: f64,

    /// CFG scale for the low-noise expert.
    pub cfg_low: f64,

    /// Schedule shift for the high-noise expert.
    pub shift_high: f64,

    /// Schedule shift for the low-noise expert.
    pub shift_low: f64,

    /// Sampler algorithm name.
    pub sampler_name: String,

    /// Sigma scheduler name.
    pub scheduler_name: String,

    /// Denoise strength.
    pub denoise: f64,

    /// Whether the sampling engine should draw a progress bar.
    pub progress_bar: bool,
}

impl Default for MoeConfig {
    fn default() -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY,
            steps: 20,
            cfg_high: 4.0,
            cfg_low: 3.0,
            shift_high: 8.0,
            shift_low: 8.0,
            sampler_name: "euler".to_string(),
            scheduler_name: "simple".to_string(),
            denoise: 1.0,
            progress_bar: true,
        }
    }
}

impl MoeConfig {
    /// Creates a new MoeConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a MoeConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `MOE_BOUNDARY` - Expert switch boundary (0.0-1.0)
    /// - `MOE_STEPS` - Denoising steps (1-10000)
    /// - `MOE_CFG_HIGH` / `MOE_CFG_LOW` - CFG scales (0-100)
    /// - `MOE_SHIFT_HIGH` / `MOE_SHIFT_LOW` - Schedule shifts (0-100)
    /// - `MOE_SAMPLER` - Sampler name
    /// - `MOE_SCHEDULER` - Scheduler name
    /// - `MOE_PROGRESS` - Progress bar (1/0, true/false)
    ///
    /// Falls back to defaults for unset or invalid variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overrides fields from a variable lookup.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let float = |key: &str, min: f64, max: f64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| (min..=max).contains(v))
        };

        if let Some(boundary) = float("MOE_BOUNDARY", 0.0, 1.0) {
            self.boundary = boundary;
        }

        if let Some(steps) = lookup("MOE_STEPS").and_then(|v| v.trim().parse::<u32>().ok()) {
            if steps > 0 && steps <= 10_000 {
                self.steps = steps;
            }
        }

        if let Some(cfg) = float("MOE_CFG_HIGH", 0.0, 100.0) {
            self.cfg_high = cfg;
        }
        if let Some(cfg) = float("MOE_CFG_LOW", 0.0, 100.0) {
            self.cfg_low = cfg;
        }
        if let Some(shift) = float("MOE_SHIFT_HIGH", 0.0, 100.0) {
            self.shift_high = shift;
        }
        if let Some(shift) = float("MOE_SHIFT_LOW", 0.0, 100.0) {
            self.shift_low = shift;
        }

        if let Some(sampler) = lookup("MOE_SAMPLER") {
            let sampler = sampler.to_lowercase();
            if SAMPLER_NAMES.contains(&sampler.as_str()) {
                self.sampler_name = sampler;
            }
        }

        if let Some(scheduler) = lookup("MOE_SCHEDULER") {
            let scheduler = scheduler.to_lowercase();
            if SCHEDULER_NAMES.contains(&scheduler.as_str()) {
                self.scheduler_name = scheduler;
            }
        }

        if let Some(progress) = lookup("MOE_PROGRESS") {
            match progress.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.progress_bar = true,
                "0" | "false" | "no" | "off" => self.progress_bar = false,
                _ => {}
            }
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SamplerError::with_source(
                crate::error::ErrorCode::ConfigInvalid,
                format!("Cannot read {}", path.display()),
                e,
            )
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            SamplerError::with_source(
                crate::error::ErrorCode::ConfigInvalid,
                format!("Cannot parse {}", path.display()),
                e,
            )
        })?;

        if let Some(reason) = config.validate() {
            return Err(SamplerError::config_invalid(reason));
        }
        Ok(config)
    }

    /// Loads the file at [`default_config_path`] if it exists, else reads
    /// the environment via [`MoeConfig::from_env`].
    pub fn load_or_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::from_env())
        }
    }

    /// The flag forwarded to the sampling engine.
    pub fn disable_progress(&self) -> bool {
        !self.progress_bar
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if !(0.0..=1.0).contains(&self.boundary) {
            return Some(format!("boundary must be in [0, 1], got {}", self.boundary));
        }

        if self.steps == 0 || self.steps > 10_000 {
            return Some(format!("steps must be in [1, 10000], got {}", self.steps));
        }

        for (name, value) in [
            ("cfg_high", self.cfg_high),
            ("cfg_low", self.cfg_low),
            ("shift_high", self.shift_high),
            ("shift_low", self.shift_low),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Some(format!("{} must be in [0, 100], got {}", name, value));
            }
        }

        if !(0.0..=1.0).contains(&self.denoise) {
            return Some(format!("denoise must be in [0, 1], got {}", self.denoise));
        }

        if !SAMPLER_NAMES.contains(&self.sampler_name.as_str()) {
            return Some(format!("unknown sampler: {}", self.sampler_name));
        }

        if !SCHEDULER_NAMES.contains(&self.scheduler_name.as_str()) {
            return Some(format!("unknown scheduler: {}", self.scheduler_name));
        }

        None
    }
}

/// Returns the platform-specific default config file path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Application Support/moe-sampler/config.json
/// - Linux: ~/.config/moe-sampler/config.json
/// - Windows: C:\Users\<user>\AppData\Roaming\moe-sampler\config\config.json
pub fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "moe-sampler") {
        proj_dirs.config_dir().join("config.json")
    } else {
        // Fallback to current directory
        PathBuf::from("./moe-sampler.json")
    }
}
