//! Environment-sourced configuration.
//!
//! Everything is read from the environment once at startup and then held
//! immutably inside [`crate::AppState`]. Azure credentials are deliberately
//! optional at load time: a function host with missing credentials should
//! still start and answer preflight/health requests, and the missing
//! credentials surface per-request as an upstream auth failure.

use std::env;

use thiserror::Error;

/// Public-cloud management plane, also used as the OAuth2 resource.
pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";
/// Public-cloud Azure AD token authority.
pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} is not a valid port")]
    InvalidPort { var: &'static str, value: String },
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub azure: AzureConfig,
}

/// HTTP listener configuration.
///
/// As an Azure Functions custom handler, the host tells us which port to
/// bind via `FUNCTIONS_CUSTOMHANDLER_PORT`; `PORT` and a fixed default cover
/// local runs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Azure AD credentials and upstream endpoints.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Fallback subscription when the request supplies none.
    pub default_subscription_id: Option<String>,
    /// Base URL of the ARM management plane. Overridable for tests.
    pub management_url: String,
    /// Base URL of the token authority. Overridable for tests.
    pub login_url: String,
}

impl AppConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = read_port("FUNCTIONS_CUSTOMHANDLER_PORT")?
            .or(read_port("PORT")?)
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            server: ServerConfig {
                host: env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            azure: AzureConfig {
                tenant_id: env_var("AZURE_TENANT_ID"),
                client_id: env_var("AZURE_CLIENT_ID"),
                client_secret: env_var("AZURE_CLIENT_SECRET"),
                default_subscription_id: env_var("AZURE_SUBSCRIPTION_ID"),
                management_url: base_url("AZURE_MANAGEMENT_URL", DEFAULT_MANAGEMENT_URL),
                login_url: base_url("AZURE_LOGIN_URL", DEFAULT_LOGIN_URL),
            },
        })
    }
}

/// Reads a variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Reads a base URL override, stripping any trailing slash so that URL
/// composition with `format!` stays predictable.
fn base_url(name: &str, default: &str) -> String {
    env_var(name)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}

fn read_port(var: &'static str) -> Result<Option<u16>, ConfigError> {
    match env_var(var) {
        None => Ok(None),
        Some(value) => value
            .parse::<u16>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidPort { var, value }),
    }
}
