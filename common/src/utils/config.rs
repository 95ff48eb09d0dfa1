use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    #[serde(default = "default_import_workers")]
    pub import_workers: usize,
    #[serde(default = "default_import_queue_depth")]
    pub import_queue_depth: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Fix the simulated fetcher's RNG seed for reproducible catalogs.
    #[serde(default)]
    pub fetcher_seed: Option<u64>,
    #[serde(default = "default_bootstrap_admin_email")]
    pub bootstrap_admin_email: String,
    /// API key assigned to the bootstrap admin; generated when unset.
    #[serde(default)]
    pub bootstrap_api_key: Option<String>,
}

fn default_import_workers() -> usize {
    4
}

fn default_import_queue_depth() -> usize {
    64
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_bootstrap_admin_email() -> String {
    "admin@globalmedia.local".to_string()
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
