mod context;
mod error;
mod extractor;
mod header;
mod hub;

pub use context::Identity;
pub use error::IdentityError;
pub use extractor::{token_from_headers, AuthenticatedUser};
pub use header::TrustedHeaderResolver;
pub use hub::HubTokenResolver;

use async_trait::async_trait;
use axum::http::HeaderMap;

pub const HUB_USER_PATH: &str = "/user";

/// Turns the credentials carried by a request into an [`Identity`].
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Identity, IdentityError>;
}
