//! CLI argument definitions for candlelens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `extract` | Reconstruct chart data from a page snapshot |
//! | `analyze` | Run one analysis cycle |
//! | `watch` | Run analysis cycles on the configured interval |
//! | `health` | Check the inference service |
//! | `news` | Fetch news sentiment for a symbol |
//! | `settings` | Print the effective settings |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON settings file |
//! | `--endpoint` | from settings | Inference service base URL |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--log-json` | `false` | Emit logs as JSON on stderr |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Trend calls reconstructed from rendered chart pages.
#[derive(Debug, Parser)]
#[command(
    name = "candlelens",
    author,
    version,
    about = "Chart reconstruction and short-horizon trend analysis",
    long_about = "candlelens reads a serialized chart page (text nodes and canvas pixels), \
reconstructs the candle series, and produces a bullish/bearish/neutral call with a \
confidence score and rationale. A remote inference service is used when reachable; \
otherwise a local heuristic answers.\n\
\n\
Use 'candlelens <command> --help' for command-specific help."
)]
pub struct Cli {
    /// JSON settings file (camelCase keys, all optional).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Inference service base URL; overrides settings and environment.
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconstruct chart data from a page snapshot.
    ///
    /// Prints the reconciled series, which producer supplied it, and any
    /// reconciliation warnings.
    ///
    /// # Examples
    ///
    ///   candlelens extract --page snapshot.json --pretty
    Extract(PageArgs),

    /// Run one analysis cycle and print the insight.
    ///
    /// # Examples
    ///
    ///   candlelens analyze --page snapshot.json
    ///   candlelens analyze --page snapshot.json --offline
    Analyze(AnalyzeArgs),

    /// Re-read the page and analyze it every `analysisIntervalSeconds`.
    ///
    /// Each insight is printed as one JSON line as soon as it completes.
    ///
    /// # Examples
    ///
    ///   candlelens watch --page snapshot.json --cycles 5
    Watch(WatchArgs),

    /// Query the inference service health route.
    Health,

    /// Fetch news sentiment for a symbol.
    ///
    /// # Examples
    ///
    ///   candlelens news NASDAQ:AAPL
    News(NewsArgs),

    /// Print the effective settings after file and environment overrides.
    Settings,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page snapshot JSON file.
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Skip the inference service and use the local predictor.
    #[arg(long, default_value_t = false)]
    pub offline: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Stop after this many completed cycles. Runs until interrupted if absent.
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Skip the inference service and use the local predictor.
    #[arg(long, default_value_t = false)]
    pub offline: bool,
}

#[derive(Debug, Args)]
pub struct NewsArgs {
    /// Symbol, e.g. NASDAQ:AAPL.
    pub symbol: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "candlelens",
            "watch",
            "--page",
            "page.json",
            "--cycles",
            "3",
            "--endpoint",
            "http://10.0.0.5:8000",
            "--pretty",
        ])
        .expect("valid arguments");

        assert!(cli.pretty);
        assert_eq!(cli.endpoint.as_deref(), Some("http://10.0.0.5:8000"));
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.cycles, Some(3));
                assert_eq!(args.page.page, PathBuf::from("page.json"));
                assert!(!args.offline);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
