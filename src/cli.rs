//! CLI argument parsing for lineprof

use crate::report::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lineprof")]
#[command(version)]
#[command(about = "Line-level execution profiler: replays recorded event traces into per-line timing reports", long_about = None)]
pub struct Cli {
    /// Recorded trace (JSON lines), or - for standard input
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Report format (overrides the config file)
    #[arg(long = "format", value_enum)]
    pub format: Option<ReportFormat>,

    /// Report destination, - for standard output (overrides the config file)
    #[arg(short = 'o', long = "output", value_name = "DEST")]
    pub output: Option<String>,

    /// Load report settings from a TOML file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only report matching callables (e.g., name=main,helper or regex=^test_)
    #[arg(long = "filter", value_name = "EXPR")]
    pub filter: Option<String>,

    /// Omit lines with no recorded time from text reports
    #[arg(long = "hide-idle")]
    pub hide_idle: bool,

    /// Leave foreign routines out of the report
    #[arg(long = "no-foreign")]
    pub no_foreign: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
