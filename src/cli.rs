//! CLI argument parser.
//!
//! Inspects how a sigma schedule is divided between the two experts
//! without loading any model: `split` shows the two sigma halves, `plan`
//! shows which expert runs which steps with which flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::config::{default_config_path, MoeConfig};
use crate::error::{ErrorCode, Result, SamplerError};
use crate::generation::{plan_with_sigmas, RunPlan, SigmaSplit};
use crate::nodes::options::MAX_STEPS;
use crate::nodes::{AddNoise, LeftoverNoise, MoeKSamplerAdvanced, SplitSigmasAtBoundary};
use crate::schedule::{apply_shift, get_or_create_schedule};
use crate::types::{Expert, ModelConfig};

/// moe-sampler: dual-expert schedule inspection
#[derive(Parser, Debug)]
#[command(name = "moe-sampler")]
#[command(about = "Inspect how a MoE model's denoising schedule is split between its experts")]
#[command(version)]
pub struct Cli {
    /// JSON config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a sigma sequence at the boundary
    Split(SigmaArgs),
    /// Show which expert runs which steps
    Plan(PlanArgs),
}

/// Sigma input shared by all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct SigmaArgs {
    /// Comma-separated sigmas, highest first (e.g. 1.0,0.7,0.5,0.2,0.0)
    #[arg(long, value_delimiter = ',', required_unless_present = "sigmas_file")]
    pub sigmas: Vec<f64>,

    /// JSON file holding an array of sigmas
    #[arg(long, conflicts_with = "sigmas")]
    pub sigmas_file: Option<PathBuf>,

    /// Normalized timestep at which the low-noise expert takes over (0-1)
    #[arg(short, long)]
    pub boundary: Option<f64>,

    /// Schedule shift of the high-noise expert
    #[arg(long)]
    pub shift: Option<f64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: SigmaArgs,

    /// First step to run
    #[arg(long)]
    pub start: Option<u32>,

    /// Step to stop before (runs to the end when omitted)
    #[arg(long)]
    pub end: Option<u32>,

    /// Add initial noise (default)
    #[arg(long, overrides_with = "no_add_noise")]
    pub add_noise: bool,

    /// Start from the latent as-is, without initial noise
    #[arg(long)]
    pub no_add_noise: bool,

    /// Leave residual noise after the last step
    #[arg(long)]
    pub leftover_noise: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns the effective config file path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Loads the configuration.
    ///
    /// An explicit `--config` file must exist; otherwise see
    /// [`MoeConfig::load_or_default`].
    pub fn load_config(&self) -> Result<MoeConfig> {
        match &self.config {
            Some(path) => MoeConfig::load(path),
            None => MoeConfig::load_or_default(),
        }
    }
}

impl SigmaArgs {
    /// Returns the sigmas from the command line or the sigmas file.
    pub fn resolve_sigmas(&self) -> Result<Vec<f64>> {
        match &self.sigmas_file {
            Some(path) => read_sigmas_file(path),
            None => Ok(self.sigmas.clone()),
        }
    }

    /// A high-noise expert carrying the requested shift.
    fn expert(&self, config: &MoeConfig) -> Expert<()> {
        let expert = Expert::new("high_noise", Arc::new(()), ModelConfig::wan_video());
        apply_shift(&expert, self.shift.unwrap_or(config.shift_high))
    }
}

impl PlanArgs {
    /// Builds the advanced node these arguments describe.
    fn node(&self, config: &MoeConfig, steps: u32) -> MoeKSamplerAdvanced {
        MoeKSamplerAdvanced {
            boundary: self.input.boundary.unwrap_or(config.boundary),
            add_noise: if self.no_add_noise {
                AddNoise::Disable
            } else {
                AddNoise::Enable
            },
            steps,
            sigma_shift_high: self.input.shift.unwrap_or(config.shift_high),
            start_at_step: self.start.unwrap_or(0),
            end_at_step: self.end.unwrap_or(MAX_STEPS),
            return_with_leftover_noise: if self.leftover_noise {
                LeftoverNoise::Enable
            } else {
                LeftoverNoise::Disable
            },
            ..MoeKSamplerAdvanced::from_config(config)
        }
    }
}

/// Reads a JSON array of sigmas.
pub fn read_sigmas_file(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        SamplerError::with_source(
            ErrorCode::InvalidParameter,
            format!("Cannot read {}", path.display()),
            e,
        )
    })?;
    serde_json::from_str(&text).map_err(|e| {
        SamplerError::with_source(
            ErrorCode::InvalidParameter,
            format!("{} is not a JSON array of numbers", path.display()),
            e,
        )
    })
}

/// Runs the `split` subcommand.
pub fn split_command(args: &SigmaArgs, config: &MoeConfig) -> Result<SigmaSplit> {
    let sigmas = args.resolve_sigmas()?;
    let expert = args.expert(config);
    let boundary = args.boundary.unwrap_or(config.boundary);
    SplitSigmasAtBoundary::new(boundary).split(&sigmas, Some(&expert))
}

/// Runs the `plan` subcommand.
pub fn plan_command(args: &PlanArgs, config: &MoeConfig) -> Result<RunPlan> {
    let sigmas = args.input.resolve_sigmas()?;
    let steps = sigmas.len().saturating_sub(1) as u32;

    let node = args.node(config, steps);
    node.validate()?;

    let expert = args.input.expert(config);
    let schedule = get_or_create_schedule(&expert);
    plan_with_sigmas(&schedule, &sigmas, &node.request((), ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{ExpertRole, LastStep};

    fn sigma_args(boundary: f64) -> SigmaArgs {
        SigmaArgs {
            sigmas: vec![1.0, 0.7, 0.5, 0.2, 0.0],
            sigmas_file: None,
            boundary: Some(boundary),
            shift: None,
        }
    }

    fn plan_args(boundary: f64) -> PlanArgs {
        PlanArgs {
            input: sigma_args(boundary),
            ..Default::default()
        }
    }

    #[test]
    fn parses_split_command() {
        let cli = Cli::try_parse_from([
            "moe-sampler",
            "split",
            "--sigmas",
            "1.0,0.5,0.0",
            "--boundary",
            "0.6",
        ])
        .unwrap();
        match cli.command {
            Command::Split(args) => {
                assert_eq!(args.sigmas, vec![1.0, 0.5, 0.0]);
                assert_eq!(args.boundary, Some(0.6));
            }
            other => panic!("expected split, got {:?}", other),
        }
    }

    #[test]
    fn parses_plan_flags() {
        let cli = Cli::try_parse_from([
            "moe-sampler",
            "plan",
            "--sigmas",
            "1.0,0.5,0.0",
            "--start",
            "1",
            "--no-add-noise",
            "--leftover-noise",
        ])
        .unwrap();
        match cli.command {
            Command::Plan(args) => {
                assert_eq!(args.start, Some(1));
                assert!(args.no_add_noise);
                assert!(args.leftover_noise);
            }
            other => panic!("expected plan, got {:?}", other),
        }
    }

    #[test]
    fn sigmas_required() {
        assert!(Cli::try_parse_from(["moe-sampler", "split"]).is_err());
    }

    #[test]
    fn split_uses_boundary() {
        let split = split_command(&sigma_args(0.6), &MoeConfig::default()).unwrap();
        assert_eq!(split.switch_step, 2);
        assert_eq!(split.high, vec![1.0, 0.7, 0.5]);
        assert_eq!(split.low, vec![0.5, 0.2, 0.0]);
    }

    #[test]
    fn split_falls_back_to_config_boundary() {
        let mut args = sigma_args(0.0);
        args.boundary = None;
        let config = MoeConfig {
            boundary: 0.6,
            ..MoeConfig::default()
        };
        assert_eq!(split_command(&args, &config).unwrap().switch_step, 2);
    }

    #[test]
    fn plan_full_range() {
        let plan = plan_command(&plan_args(0.6), &MoeConfig::default()).unwrap();
        assert_eq!(plan.steps, 4);
        assert_eq!(plan.switch_step, 2);

        let high = plan.high.unwrap();
        assert_eq!(high.role, ExpertRole::HighNoise);
        assert_eq!((high.start_step, high.last_step), (0, LastStep::At(2)));
        assert!(high.disable_noise && high.force_full_denoise);

        let low = plan.low.unwrap();
        assert_eq!(low.start_step, 2);
        assert!(!low.disable_noise);
        assert!(low.force_full_denoise);
    }

    #[test]
    fn plan_with_range_and_toggles() {
        let args = PlanArgs {
            start: Some(3),
            no_add_noise: true,
            leftover_noise: true,
            ..plan_args(0.6)
        };
        let plan = plan_command(&args, &MoeConfig::default()).unwrap();
        assert!(plan.high.is_none());

        let low = plan.low.unwrap();
        assert_eq!(low.start_step, 3);
        assert!(low.disable_noise);
        assert!(!low.force_full_denoise);
    }

    #[test]
    fn plan_rejects_bad_range() {
        let args = PlanArgs {
            start: Some(4),
            ..plan_args(0.6)
        };
        let err = plan_command(&args, &MoeConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStepRange);
    }

    #[test]
    fn plan_needs_two_sigmas() {
        let mut args = plan_args(0.6);
        args.input.sigmas = vec![1.0];
        let err = plan_command(&args, &MoeConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
    }

    #[test]
    fn sigmas_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigmas.json");
        std::fs::write(&path, "[1.0, 0.7, 0.5, 0.2, 0.0]").unwrap();

        let args = SigmaArgs {
            sigmas: Vec::new(),
            sigmas_file: Some(path),
            boundary: Some(0.6),
            shift: None,
        };
        assert_eq!(split_command(&args, &MoeConfig::default()).unwrap().switch_step, 2);
    }

    #[test]
    fn malformed_sigmas_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigmas.json");
        std::fs::write(&path, "{\"sigmas\": 1}").unwrap();

        let err = read_sigmas_file(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
    }

    #[test]
    fn config_path_override() {
        let cli = Cli {
            config: Some(PathBuf::from("/tmp/moe.json")),
            command: Command::Split(sigma_args(0.6)),
        };
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/moe.json"));
    }
}
