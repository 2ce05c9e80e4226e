//! Azure AD client-credentials token exchange.
//!
//! One token per invocation; tokens are deliberately not cached across
//! requests since the function is stateless per invocation.

use reqwest::Client;
use serde::Deserialize;

use crate::{config::AzureConfig, error::UpstreamError};

/// OAuth2 resource for the ARM management plane.
const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange the configured service principal for a bearer token.
///
/// Missing credentials error here rather than at startup so the host can
/// boot without them and report the failure per request.
pub async fn acquire(client: &Client, azure: &AzureConfig) -> Result<String, UpstreamError> {
    let tenant_id = azure
        .tenant_id
        .as_deref()
        .ok_or(UpstreamError::MissingCredentials("AZURE_TENANT_ID"))?;
    let client_id = azure
        .client_id
        .as_deref()
        .ok_or(UpstreamError::MissingCredentials("AZURE_CLIENT_ID"))?;
    let client_secret = azure
        .client_secret
        .as_deref()
        .ok_or(UpstreamError::MissingCredentials("AZURE_CLIENT_SECRET"))?;

    let url = format!("{}/{}/oauth2/token", azure.login_url, tenant_id);
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("resource", MANAGEMENT_RESOURCE),
    ];

    let response = client
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(UpstreamError::TokenRequest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::TokenRejected { status, body });
    }

    let token: TokenResponse = response.json().await.map_err(UpstreamError::TokenRequest)?;
    tracing::debug!(tenant_id, "acquired management-plane token");
    Ok(token.access_token)
}
