//! Storage usage and quota lookup for hub-authenticated users.
//!
//! A request is authenticated by an [`identity::IdentityResolver`], answered by a
//! [`usage::UsageBackend`] behind the [`usage::UsageAdapter`], and rendered by
//! [`presenter::present`].

pub mod api;
pub mod config;
pub mod identity;
pub mod presenter;
pub mod server;
pub mod usage;

pub use api::{ApiError, AppState};
pub use config::{BackendMode, IdentityMode, ServiceConfig};
pub use identity::{Identity, IdentityError, IdentityResolver};
pub use presenter::{present, UsagePayload};
pub use server::UsageServer;
pub use usage::{UsageAdapter, UsageBackend, UsageError, UsageQuery, UsageResult};
