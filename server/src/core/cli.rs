use std::path::PathBuf;

use clap::Parser;

use super::constants::{ENV_DATABASE_PATH, ENV_HEARTBEAT_SECS, ENV_HOST, ENV_PORT};

#[derive(Parser)]
#[command(name = "reviewdeck")]
#[command(version, about = "Collaborative code review server", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to the SQLite database file
    #[arg(long, env = ENV_DATABASE_PATH)]
    pub database: Option<PathBuf>,

    /// WebSocket heartbeat interval in seconds
    #[arg(long, env = ENV_HEARTBEAT_SECS)]
    pub heartbeat_secs: Option<u64>,
}

/// Parse CLI arguments
pub fn parse() -> Cli {
    Cli::parse()
}
