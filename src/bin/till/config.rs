//! Register configuration

use std::path::PathBuf;

use clap::{Args, Parser};

/// Till register configuration
#[derive(Debug, Parser)]
#[command(name = "till", about = "Till point-of-sale register", long_about = None)]
pub struct TillConfig {
    /// Sales API settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Register settings.
    #[command(flatten)]
    pub register: RegisterConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl TillConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Sales API settings.
#[derive(Debug, Args)]
pub struct ApiConfig {
    /// Base address of the sales API
    #[arg(long, env = "TILL_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Bearer token for the sales API
    #[arg(long, env = "TILL_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Record sales in memory instead of posting them to the API
    #[arg(long, env = "TILL_OFFLINE", default_value_t = false)]
    pub offline: bool,
}

/// Register settings.
#[derive(Debug, Args)]
pub struct RegisterConfig {
    /// Selling location recorded with every sale
    #[arg(long, env = "TILL_LOCATION_ID", default_value_t = 1)]
    pub location_id: u64,

    /// Loyalty customer attached to sales
    #[arg(long, env = "TILL_CUSTOMER_ID")]
    pub customer_id: Option<u64>,

    /// Catalog fixture name
    #[arg(long, env = "TILL_CATALOG", default_value = "market")]
    pub catalog: String,

    /// Directory holding `catalogs/<name>.yml`
    #[arg(long, env = "TILL_FIXTURES_DIR", default_value = "./fixtures")]
    pub fixtures_dir: PathBuf,
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}
