use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL, only needed by the HTTP endpoint
    pub database_url: Option<String>,
    /// Address the HTTP endpoint listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Endpoint URL used by the terminal front end
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Upper bound of the connection pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if it exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to serve the endpoint")
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
