//! toolhost-mcp: MCP tool-invocation server over stdio.
//!
//! Wires the server core to stdin/stdout and registers the built-in memory
//! tools and status resource.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use toolhost_mcp::builtin;
use toolhost_mcp::config;
use toolhost_mcp::mcp::server::{DispatchOptions, McpServer};
use toolhost_mcp::registry::Registry;

/// MCP tool-invocation server over stdio.
///
/// Serves the built-in memory tools and status resource to a single MCP
/// client connected on stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "toolhost-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber.
///
/// Logs go to stderr: stdout carries protocol frames and nothing else.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the toolhost-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %cfg.server.name,
        "Starting toolhost-mcp server"
    );

    let Some(memory_dir) = cfg
        .memory
        .data_dir
        .clone()
        .or_else(config::default_memory_dir)
    else {
        error!("Cannot determine a memory data directory; set memory.data_dir");
        return ExitCode::FAILURE;
    };

    let mut registry = Registry::new();
    if let Err(e) = builtin::register_builtins(&mut registry, &cfg.server.name, &memory_dir) {
        error!(error = %e, "Failed to register built-in tools");
        return ExitCode::FAILURE;
    }

    let options = DispatchOptions {
        server_name: cfg.server.name.clone(),
        unknown_fields: cfg.dispatch.unknown_field_policy(),
        call_timeout: match cfg.dispatch.call_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        },
    };

    let mut server = McpServer::stdio(registry, options);

    info!(memory_dir = %memory_dir.display(), "Server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Transport error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn quiet_wins_over_config_level() {
        assert_eq!(get_log_level(0, true, "debug"), Level::ERROR);
    }

    #[test]
    fn verbosity_flags_escalate() {
        assert_eq!(get_log_level(0, false, "warn"), Level::WARN);
        assert_eq!(get_log_level(1, false, "warn"), Level::INFO);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
        assert_eq!(get_log_level(3, false, "warn"), Level::TRACE);
    }

    #[test]
    fn unknown_config_level_defaults_to_warn() {
        assert_eq!(get_log_level(0, false, "chatty"), Level::WARN);
    }
}
