use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "go-license-checkr",
    about = "Look up the licenses of a Go module's dependencies on pkg.go.dev",
    version
)]
pub struct Cli {
    /// Go project directory (containing go.mod)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Enable debug logs
    #[arg(long)]
    pub debug: bool,

    /// Print the loaded modules without looking up licenses
    #[arg(long)]
    pub dry: bool,

    /// Load modules with `go list -m -json all` instead of reading go.mod
    #[arg(long)]
    pub list: bool,

    /// Ignore indirect dependencies
    #[arg(long)]
    pub direct: bool,

    /// Config file [default: ./.go-license-checkr/config.toml, fallback ~/.config/go-license-checkr/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Only print summary line (terminal report)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Json,
    Terminal,
}
