use clap::Parser;
use std::path::PathBuf;

/// Netdiag server — stores network test results and serves analytics.
#[derive(Parser, Debug, Clone)]
#[command(name = "netdiag-server")]
pub struct CliArgs {
    /// Directory for the record database
    #[arg(short = 'd', long = "data-dir", default_value = "./netdiag-data")]
    pub data_dir: PathBuf,

    /// HTTP port
    #[arg(long = "port", default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,

    /// Bind address
    #[arg(long = "bind", default_value = "0.0.0.0")]
    pub bind: String,
}

pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub bind: String,
}

// Port constants
pub const DEFAULT_SERVER_PORT: u16 = 9880;

// Speed-test transport constants
pub const DOWNLOAD_CHUNK_BYTES: usize = 1024 * 1024;
pub const DEFAULT_DOWNLOAD_MB: u64 = 10;
pub const MAX_DOWNLOAD_MB: u64 = 100;
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

// Sampler constants
pub const SAMPLER_TIMEOUT_SECS: u64 = 30;

// Connection quality thresholds (Mbps, inclusive lower bounds)
pub const QUALITY_FAIR_MBPS: f64 = 5.0;
pub const QUALITY_GOOD_MBPS: f64 = 25.0;
pub const QUALITY_EXCELLENT_MBPS: f64 = 100.0;

// Listing limits
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 100;

// Analytics limits
pub const DEFAULT_ANALYTICS_LIMIT: usize = 500;
pub const MAX_ANALYTICS_LIMIT: usize = 1000;

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Self {
        ServerConfig {
            data_dir: args.data_dir,
            port: args.port,
            bind: args.bind,
        }
    }

    /// Path to the record database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("test-results.db")
    }

    /// Path to the persisted client profile.
    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join("client-profile.json")
    }
}
