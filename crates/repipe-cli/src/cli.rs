//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "repipe",
    version,
    about = "Inspect, fit and run serialized feature pipelines",
    long_about = "Inspect, fit and run serialized feature pipelines.\n\n\
                  Pipelines and class coverage mappers are stored as JSON instance\n\
                  descriptors and rebuilt through the built-in component registry."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every registered component class.
    Components,

    /// Show the steps of a pipeline document.
    Inspect(ConfigArgs),

    /// Check that a pipeline document loads and serializes back unchanged.
    Verify(ConfigArgs),

    /// Fit a pipeline on a CSV file and save the fitted document.
    Fit(FitArgs),

    /// Run a fitted pipeline over a CSV file.
    Transform(TransformArgs),

    /// Show the retained classes of a class coverage mapper document.
    Coverage(CoverageArgs),
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Pipeline document (JSON).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(Parser)]
pub struct FitArgs {
    /// Pipeline document (JSON).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Training data with a header row.
    #[arg(value_name = "CSV")]
    pub data: PathBuf,

    /// Where to write the fitted pipeline document.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Parser)]
pub struct TransformArgs {
    /// Fitted pipeline document (JSON).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Input data with a header row.
    #[arg(value_name = "CSV")]
    pub data: PathBuf,

    /// Also write the features to this CSV file.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CoverageArgs {
    /// Class coverage mapper document (JSON).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// List every class of this head.
    #[arg(long = "head", value_name = "NAME")]
    pub head: Option<String>,

    /// Print the per-head summary as JSON instead of tables.
    #[arg(long = "json", conflicts_with = "head")]
    pub json: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
