use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::{debug, error, warn};

use super::Identity;
use crate::api::{ApiError, AppState};

/// A request whose credentials resolved to an [`Identity`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match state.resolver.resolve(&parts.headers).await {
            Ok(identity) => {
                debug!(identity = %identity, "Request authenticated");
                Ok(AuthenticatedUser(identity))
            }
            Err(err) if err.is_hub_outage() => {
                error!(error = %err, path = %parts.uri.path(), "Hub unavailable for token lookup");
                Err(ApiError::Unauthenticated)
            }
            Err(err) => {
                warn!(error = %err, path = %parts.uri.path(), "Identity unresolved");
                Err(ApiError::Unauthenticated)
            }
        }
    }
}

/// Hub token from `Authorization: token <t>` / `Bearer <t>`, falling back to `cookie_name`.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            let scheme = scheme.to_ascii_lowercase();
            (scheme == "token" || scheme == "bearer").then(|| token.trim().to_string())
        })
        .filter(|token| !token.is_empty());

    from_authorization.or_else(|| cookie_value(headers, cookie_name))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
