//! CLI entry point for mlpipe.
//!
//! Pipeline commands install the tracing subscriber, then resolve the three
//! YAML documents through the configuration manager.

mod cmd;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

use mlpipe::paths::{CONFIG_FILE_PATH, LOGS_DIR, PARAMS_FILE_PATH, SCHEMA_FILE_PATH};
use mlpipe::stages::Stage;

#[derive(Parser)]
#[command(name = "mlpipe")]
#[command(version)]
#[command(about = "Stage-based training pipeline for an elastic net model", long_about = None)]
#[command(
    after_help = "STAGES:\n    ingest, validate, transform, train, evaluate\n\n    Running 'mlpipe' without a command runs every stage in order."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Artifact locations for every stage
    #[arg(long, global = true, value_name = "PATH", default_value = CONFIG_FILE_PATH)]
    pub config: PathBuf,
    /// Model hyperparameters
    #[arg(long, global = true, value_name = "PATH", default_value = PARAMS_FILE_PATH)]
    pub params: PathBuf,
    /// Expected dataset columns and target column
    #[arg(long, global = true, value_name = "PATH", default_value = SCHEMA_FILE_PATH)]
    pub schema: PathBuf,
    /// Directory receiving running_logs.log
    #[arg(long, global = true, value_name = "DIR", default_value = LOGS_DIR)]
    pub log_dir: PathBuf,
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline, optionally limited to a range of stages
    Run {
        /// First stage to run
        #[arg(long, value_name = "STAGE", default_value = "ingest")]
        from: Stage,
        /// Last stage to run
        #[arg(long, value_name = "STAGE", default_value = "evaluate")]
        to: Stage,
    },
    /// Run a single stage
    Stage {
        /// Stage to run (ingest, validate, transform, train, evaluate)
        stage: Stage,
    },
    /// Print the resolved per-stage configuration
    Config {
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: cmd::config::OutputFormat,
    },
    /// Predict the target for every row of a CSV file with a trained model
    Predict {
        /// CSV file with the feature columns
        #[arg(long, short, value_name = "CSV")]
        input: PathBuf,
        /// Saved model (defaults to the trainer's model path)
        #[arg(long, short, value_name = "PATH")]
        model: Option<PathBuf>,
        /// Write the input plus a prediction column here instead of stdout
        #[arg(long, short, value_name = "CSV")]
        output: Option<PathBuf>,
    },
    /// Generate shell completion script
    Completion {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Show version information (with -v, commit and build date)
    Version,
}

fn main() -> Result<()> {
    // Must run before anything reads MLFLOW_* variables.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let global = cli.global;

    match cli.command {
        None => cmd::run::cmd_run(&global, Stage::ALL),
        Some(Commands::Run { from, to }) => cmd::run::cmd_run(&global, Stage::range(from, to)?),
        Some(Commands::Stage { stage }) => cmd::run::cmd_run(&global, &[stage]),
        Some(Commands::Config { format }) => cmd::config::cmd_config(&global, format),
        Some(Commands::Predict {
            input,
            model,
            output,
        }) => cmd::predict::cmd_predict(&global, &input, model.as_deref(), output.as_deref()),
        Some(Commands::Completion { shell }) => cmd_completion(shell),
        Some(Commands::Version) => cmd_version(global.verbose),
    }
}

/// Generate shell completion script
fn cmd_completion(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "mlpipe", &mut io::stdout());
    Ok(())
}

fn cmd_version(verbose: bool) -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    println!("mlpipe {}", VERSION);

    if verbose {
        const GIT_SHA: &str = env!("GIT_SHA");
        const BUILD_DATE: &str = env!("BUILD_DATE");
        println!("commit: {}", GIT_SHA);
        println!("built: {}", BUILD_DATE);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_command_runs_everything() {
        let cli = Cli::try_parse_from(["mlpipe"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.global.config, PathBuf::from(CONFIG_FILE_PATH));
        assert!(!cli.global.verbose);
    }

    #[test]
    fn test_run_range_parses_stage_keys() {
        let cli = Cli::try_parse_from(["mlpipe", "run", "--from", "validate", "--to", "train"])
            .unwrap();
        match cli.command {
            Some(Commands::Run { from, to }) => {
                assert_eq!(from, Stage::DataValidation);
                assert_eq!(to, Stage::ModelTrainer);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        assert!(Cli::try_parse_from(["mlpipe", "stage", "deploy"]).is_err());
    }

    #[test]
    fn test_version_uses_global_verbose() {
        let cli = Cli::try_parse_from(["mlpipe", "version", "-v"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Version)));
        assert!(cli.global.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mlpipe", "stage", "train", "--params", "p.yaml", "-v"])
            .unwrap();
        assert_eq!(cli.global.params, PathBuf::from("p.yaml"));
        assert!(cli.global.verbose);
    }
}
