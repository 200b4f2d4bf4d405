//! Worklink Workspace Client Library
//!
//! A terminal client for a remote AI coding workspace: one persistent
//! WebSocket session with local mirrors of the file tree, open buffers,
//! conversation transcript, and pending command approvals.

pub mod cli;
pub mod config;
pub mod protocol;
pub mod session;
pub mod workspace;

use anyhow::Result;

/// Application result type for consistent error handling
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize tracing subscriber for logging
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("worklink={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
