use std::sync::Arc;

pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::create_router;
pub use types::*;

use crate::config::{IdentityMode, ServiceConfig};
use crate::identity::{HubTokenResolver, IdentityResolver, TrustedHeaderResolver};
use crate::usage::UsageAdapter;

pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub adapter: UsageAdapter,
    pub resolver: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        adapter: UsageAdapter,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            adapter,
            resolver,
        }
    }

    /// Wire the backend and identity resolver selected by the configuration.
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let adapter = UsageAdapter::from_config(&config)?;
        let resolver: Arc<dyn IdentityResolver> = match config.identity_mode {
            IdentityMode::Hub => Arc::new(HubTokenResolver::new(
                &config.hub_api_url,
                config.identity_cookie.clone(),
                config.hub_timeout(),
            )?),
            IdentityMode::Header => Arc::new(TrustedHeaderResolver::new(&config.identity_header)?),
        };

        Ok(Self::new(config, adapter, resolver))
    }
}
