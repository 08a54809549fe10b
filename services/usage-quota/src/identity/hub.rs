use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{token_from_headers, Identity, IdentityError, IdentityResolver, HUB_USER_PATH};

#[derive(Debug, Deserialize)]
struct HubUser {
    name: String,
}

/// Validates hub-issued tokens by asking the hub who owns them.
pub struct HubTokenResolver {
    http_client: Client,
    user_url: String,
    cookie_name: String,
}

impl HubTokenResolver {
    pub fn new(hub_api_url: &str, cookie_name: String, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build hub API client")?;

        Ok(Self {
            http_client,
            user_url: format!("{}{}", hub_api_url.trim_end_matches('/'), HUB_USER_PATH),
            cookie_name,
        })
    }
}

#[async_trait]
impl IdentityResolver for HubTokenResolver {
    #[instrument(skip(self, headers))]
    async fn resolve(&self, headers: &HeaderMap) -> Result<Identity, IdentityError> {
        let token = token_from_headers(headers, &self.cookie_name)
            .ok_or(IdentityError::MissingCredentials)?;

        debug!("Validating token against hub at {}", self.user_url);

        let response = self
            .http_client
            .get(&self.user_url)
            .header(reqwest::header::AUTHORIZATION, format!("token {}", token))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: HubUser = response.json().await?;
                Identity::new(user.name)
            }
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(IdentityError::Rejected(status.as_u16()))
            }
            status => Err(IdentityError::InvalidHubResponse(format!(
                "hub responded with {}",
                status
            ))),
        }
    }
}
