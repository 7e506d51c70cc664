use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const PLACEHOLDER_CLIENT_ID: &str = "your-client-id";
pub const PLACEHOLDER_TENANT_ID: &str = "your-tenant-id";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub redis_timeout: Duration,
    pub redis_prefix: String,
}

impl StoreConfig {
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            redis_timeout: Duration::from_secs(5),
            redis_prefix: "claims:staged:".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaimsConfig {
    pub azure_client_id: String,
    pub azure_tenant_id: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub debug_routes: bool,
    pub store: StoreConfig,
}

impl ClaimsConfig {
    pub fn from_env() -> Result<Self> {
        let azure_client_id =
            env::var("AZURE_CLIENT_ID").unwrap_or_else(|_| PLACEHOLDER_CLIENT_ID.to_string());
        let azure_tenant_id =
            env::var("AZURE_TENANT_ID").unwrap_or_else(|_| PLACEHOLDER_TENANT_ID.to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_env("PORT", 8000u16)?;
        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|value| parse_origins(&value))
            .unwrap_or_else(|_| vec!["*".to_string()]);
        let debug_routes = bool_from_env("DEBUG_ROUTES")
            .unwrap_or(!environment.eq_ignore_ascii_case("production"));

        let redis_host = env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
        let redis_port = parse_env("REDIS_PORT", 6379u16)?;
        let redis_db = parse_env("REDIS_DB", 0i64)?;
        let redis_timeout_secs = parse_env("REDIS_TIMEOUT_SECONDS", 5u64)?;
        let redis_prefix =
            env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "claims:staged:".to_string());

        Ok(Self {
            azure_client_id,
            azure_tenant_id,
            environment,
            host,
            port,
            allowed_origins,
            debug_routes,
            store: StoreConfig {
                redis_host,
                redis_port,
                redis_db,
                redis_timeout: Duration::from_secs(redis_timeout_secs.max(1)),
                redis_prefix,
            },
        })
    }

    /// False while the client id is unset or still the deployment placeholder.
    pub fn client_id_configured(&self) -> bool {
        let client_id = self.azure_client_id.trim();
        !client_id.is_empty() && client_id != PLACEHOLDER_CLIENT_ID
    }
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            azure_client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            azure_tenant_id: PLACEHOLDER_TENANT_ID.to_string(),
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec!["*".to_string()],
            debug_routes: true,
            store: StoreConfig::default(),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{value}'")),
        Err(_) => Ok(default),
    }
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
