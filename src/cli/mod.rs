//! Command Line Interface module
//!
//! Argument parsing for the worklink terminal client.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "worklink")]
#[command(about = "Worklink workspace client")]
#[command(long_about = "Terminal session client for a remote AI coding workspace")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Workspace server WebSocket URL (overrides the config file)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective log level, with --verbose forcing debug
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }
}
