use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};

use super::{Identity, IdentityError, IdentityResolver};

/// Reads the username from a header set by an authenticating reverse proxy.
/// Only safe when the service is reachable exclusively through that proxy.
pub struct TrustedHeaderResolver {
    header: HeaderName,
}

impl TrustedHeaderResolver {
    pub fn new(header: &str) -> anyhow::Result<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())?;
        Ok(Self { header })
    }
}

#[async_trait]
impl IdentityResolver for TrustedHeaderResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Identity, IdentityError> {
        let value = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .ok_or(IdentityError::MissingCredentials)?;

        Identity::new(value.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn resolves_identity_from_header() {
        let resolver = TrustedHeaderResolver::new("X-Forwarded-User").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-user", HeaderValue::from_static(" alice "));

        let identity = resolver.resolve(&headers).await.unwrap();
        assert_eq!(identity.as_str(), "alice");
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_rejected() {
        let resolver = TrustedHeaderResolver::new("X-Forwarded-User").unwrap();
        assert!(matches!(
            resolver.resolve(&HeaderMap::new()).await,
            Err(IdentityError::MissingCredentials)
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-user", HeaderValue::from_static("   "));
        assert!(matches!(
            resolver.resolve(&headers).await,
            Err(IdentityError::EmptyIdentity)
        ));
    }
}
