mod anchors;
mod baseline;
mod claims;
mod commands;
mod config;
mod contract;
mod conventions;
mod diagnostics;
mod drift;
mod error;
mod frontmatter;
mod link_graph;
mod links;
mod loader;
mod logging;
mod markdown;
mod model;
mod network;
mod report;
mod rules;
mod structure;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::{CheckOptions, OutputFormat, Project};
use crate::logging::LogFormat;

/// Validate a documentation site against its navigation, links, and OpenAPI contract
#[derive(Parser)]
#[command(name = "docdrift", version)]
struct Cli {
    /// Command to run
    #[command(subcommand)]
    command: Commands,
    /// Config file (default: <root>/.docdrift.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
    /// Project root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// More log output (-v info, -vv debug, -vvv trace); DOCDRIFT_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the anchors a page exposes
    Anchors {
        /// Page slug (`api/models`) or source file (`docs/api/models.md`)
        page: String,
    },
    /// Accept every current finding into the baseline file
    Baseline {
        /// Include network findings
        #[arg(long)]
        network: bool,
    },
    /// Run every validator and report findings (exit 0 ok, 1 errors, 2 fatal)
    Check {
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Probe external links and the live models and health endpoints
        #[arg(long)]
        network: bool,
        /// Report findings the baseline would hide
        #[arg(long)]
        no_baseline: bool,
    },
    /// List the endpoints the API contract declares
    Endpoints {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the rule catalog, configuration keys, and exit codes
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check, then re-check on every change to docs, config, or contract
    Watch {
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Probe external links and the live models and health endpoints
        #[arg(long)]
        network: bool,
        /// Report findings the baseline would hide
        #[arg(long)]
        no_baseline: bool,
    },
}

/// Map a unit command result to an exit code, printing any error as markdown.
fn exit_with(result: Result<(), error::Error>) -> ExitCode {
    return match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    };
}

/// Print a fatal error and return the runtime-error exit code.
fn fail(e: &error::Error) -> ExitCode {
    diagnostics::print_error(e);
    return ExitCode::from(2);
}

/// Parse arguments, install logging, dispatch.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.log_format) {
        eprintln!("warning: {e}");
    }

    let project = Project { config: cli.config, root: cli.root };

    return match cli.command {
        Commands::Anchors { page } => exit_with(commands::anchors(&project, &page)),
        Commands::Baseline { network } => exit_with(commands::baseline(&project, network)),
        Commands::Check { format, network, no_baseline } => {
            match commands::check(&project, CheckOptions { format, network, no_baseline }) {
                Ok(code) => code,
                Err(e) => fail(&e),
            }
        },
        Commands::Endpoints { json } => exit_with(commands::endpoints(&project, json)),
        Commands::Rules { json } => {
            exit_with(rules::run(&project.root, project.config.as_deref(), json))
        },
        Commands::Watch { format, network, no_baseline } => {
            match watch::run(&project, CheckOptions { format, network, no_baseline }) {
                Ok(code) => code,
                Err(e) => fail(&e),
            }
        },
    };
}
