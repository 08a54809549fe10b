use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_QUOTA_BYTES: u64 = 10_000_000_000;
pub const DEFAULT_USAGE_METRIC: &str = "dirsize_total_size_bytes";
pub const DEFAULT_QUOTA_METRIC: &str = "dirsize_hard_limit_bytes";
pub const DEFAULT_HUB_TIMEOUT_SECS: u64 = 5;

/// Slack between the slowest outbound call and the request deadline, so a
/// backend timeout is still answered with its own error body.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 5;
const MIN_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Mock,
    Live,
}

impl std::str::FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(BackendMode::Mock),
            "live" => Ok(BackendMode::Live),
            _ => anyhow::bail!("Unsupported BACKEND_MODE: {} (expected mock or live)", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// Validate the hub-issued token against the hub REST API.
    Hub,
    /// Trust a username header set by an authenticating reverse proxy.
    Header,
}

impl std::str::FromStr for IdentityMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hub" => Ok(IdentityMode::Hub),
            "header" => Ok(IdentityMode::Header),
            _ => anyhow::bail!("Unsupported IDENTITY_MODE: {} (expected hub or header)", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen host address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Route prefix assigned by the hub, always starts and ends with '/'
    pub service_prefix: String,

    pub backend_mode: BackendMode,

    /// Prometheus base URL, required in live mode
    pub metrics_endpoint_url: Option<String>,

    /// Upper bound for a single outbound metrics query
    pub query_timeout_secs: u64,

    /// Quota reported when the backend has none for the user
    pub default_quota_bytes: u64,

    /// Namespace label used to pick a series when several are returned
    pub metrics_namespace: Option<String>,

    pub usage_metric: String,
    pub quota_metric: String,

    pub identity_mode: IdentityMode,

    /// Hub REST API base, e.g. http://jupyterhub:8081/hub/api
    pub hub_api_url: String,

    /// Upper bound for the token lookup against the hub
    pub hub_timeout_secs: u64,

    /// Cookie that may carry the hub token instead of the Authorization header
    pub identity_cookie: String,

    /// Header carrying the username in header mode
    pub identity_header: String,

    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            service_prefix: "/".to_string(),
            backend_mode: BackendMode::Mock,
            metrics_endpoint_url: None,
            query_timeout_secs: 5,
            default_quota_bytes: DEFAULT_QUOTA_BYTES,
            metrics_namespace: None,
            usage_metric: DEFAULT_USAGE_METRIC.to_string(),
            quota_metric: DEFAULT_QUOTA_METRIC.to_string(),
            identity_mode: IdentityMode::Hub,
            hub_api_url: "http://jupyterhub:8081/hub/api".to_string(),
            hub_timeout_secs: DEFAULT_HUB_TIMEOUT_SECS,
            identity_cookie: "usage-quota-token".to_string(),
            identity_header: "X-Forwarded-User".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(host) = var("USAGE_HOST") {
            cfg.host = host;
        }
        if let Some(port) = var("USAGE_PORT") {
            cfg.port = port.parse().context("Invalid USAGE_PORT")?;
        }
        if let Some(prefix) = var("JUPYTERHUB_SERVICE_PREFIX") {
            cfg.service_prefix = normalize_prefix(&prefix);
        }
        if let Some(mode) = var("BACKEND_MODE") {
            cfg.backend_mode = mode.parse()?;
        }

        cfg.metrics_endpoint_url = var("METRICS_ENDPOINT_URL").or_else(|| var("PROMETHEUS_URL"));

        if let Some(timeout) = var("QUERY_TIMEOUT_SECONDS") {
            cfg.query_timeout_secs = timeout
                .parse()
                .context("QUERY_TIMEOUT_SECONDS must be a positive integer")?;
        }
        if let Some(quota) = var("DEFAULT_QUOTA_BYTES") {
            cfg.default_quota_bytes = quota
                .replace('_', "")
                .parse()
                .context("DEFAULT_QUOTA_BYTES must be a positive integer")?;
        }

        cfg.metrics_namespace = var("PROMETHEUS_NAMESPACE");

        if let Some(metric) = var("USAGE_METRIC") {
            cfg.usage_metric = metric;
        }
        if let Some(metric) = var("QUOTA_METRIC") {
            cfg.quota_metric = metric;
        }
        if let Some(mode) = var("IDENTITY_MODE") {
            cfg.identity_mode = mode.parse()?;
        }
        if let Some(url) = var("JUPYTERHUB_API_URL") {
            cfg.hub_api_url = url;
        }
        if let Some(timeout) = var("HUB_TIMEOUT_SECONDS") {
            cfg.hub_timeout_secs = timeout
                .parse()
                .context("HUB_TIMEOUT_SECONDS must be a positive integer")?;
        }
        if let Some(cookie) = var("IDENTITY_COOKIE") {
            cfg.identity_cookie = cookie;
        }
        if let Some(header) = var("IDENTITY_HEADER") {
            cfg.identity_header = header;
        }
        if let Some(level) = var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend_mode == BackendMode::Live {
            match self.metrics_endpoint_url.as_deref() {
                None => anyhow::bail!("METRICS_ENDPOINT_URL is required when BACKEND_MODE is live"),
                Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    anyhow::bail!("METRICS_ENDPOINT_URL must be an http(s) URL: {}", url)
                }
                Some(_) => {}
            }
        }

        if self.query_timeout_secs == 0 {
            anyhow::bail!("QUERY_TIMEOUT_SECONDS must be greater than zero");
        }
        if self.hub_timeout_secs == 0 {
            anyhow::bail!("HUB_TIMEOUT_SECONDS must be greater than zero");
        }
        if self.default_quota_bytes == 0 {
            anyhow::bail!("DEFAULT_QUOTA_BYTES must be greater than zero");
        }
        if self.usage_metric.is_empty() || self.quota_metric.is_empty() {
            anyhow::bail!("USAGE_METRIC and QUOTA_METRIC cannot be empty");
        }

        match self.identity_mode {
            IdentityMode::Hub => {
                if self.hub_api_url.is_empty() {
                    anyhow::bail!("JUPYTERHUB_API_URL cannot be empty when IDENTITY_MODE is hub");
                }
            }
            IdentityMode::Header => {
                axum::http::HeaderName::from_bytes(self.identity_header.as_bytes())
                    .with_context(|| format!("IDENTITY_HEADER is invalid: {}", self.identity_header))?;
            }
        }

        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn hub_timeout(&self) -> Duration {
        Duration::from_secs(self.hub_timeout_secs)
    }

    /// Deadline for a whole request. Always outlasts the hub lookup followed by the metrics query.
    pub fn request_timeout(&self) -> Duration {
        let outbound = self
            .hub_timeout_secs
            .saturating_add(self.query_timeout_secs)
            .saturating_add(REQUEST_TIMEOUT_MARGIN_SECS);
        Duration::from_secs(outbound.max(MIN_REQUEST_TIMEOUT_SECS))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.backend_mode, BackendMode::Mock);
        assert_eq!(cfg.query_timeout_secs, 5);
        assert_eq!(cfg.hub_timeout_secs, 5);
        assert_eq!(cfg.default_quota_bytes, 10_000_000_000);
        assert_eq!(cfg.service_prefix, "/");
        cfg.validate().unwrap();
    }

    #[test]
    fn live_mode_requires_metrics_url() {
        let cfg = config_from(&[("BACKEND_MODE", "live")]).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("METRICS_ENDPOINT_URL"));

        let cfg = config_from(&[
            ("BACKEND_MODE", "LIVE"),
            ("METRICS_ENDPOINT_URL", "http://prometheus:9090"),
        ])
        .unwrap();
        cfg.validate().unwrap();
    }

    #[test]
    fn prometheus_url_is_a_fallback_for_the_metrics_url() {
        let cfg = config_from(&[("PROMETHEUS_URL", "http://prom:9090")]).unwrap();
        assert_eq!(cfg.metrics_endpoint_url.as_deref(), Some("http://prom:9090"));

        let cfg = config_from(&[
            ("PROMETHEUS_URL", "http://prom:9090"),
            ("METRICS_ENDPOINT_URL", "http://metrics:9090"),
        ])
        .unwrap();
        assert_eq!(cfg.metrics_endpoint_url.as_deref(), Some("http://metrics:9090"));
    }

    #[test]
    fn rejects_unknown_modes_and_zero_values() {
        assert!(config_from(&[("BACKEND_MODE", "remote")]).is_err());
        assert!(config_from(&[("IDENTITY_MODE", "ldap")]).is_err());
        assert!(config_from(&[("QUERY_TIMEOUT_SECONDS", "soon")]).is_err());

        let cfg = config_from(&[("QUERY_TIMEOUT_SECONDS", "0")]).unwrap();
        assert!(cfg.validate().is_err());

        let cfg = config_from(&[("DEFAULT_QUOTA_BYTES", "0")]).unwrap();
        assert!(cfg.validate().is_err());

        let cfg = config_from(&[("HUB_TIMEOUT_SECONDS", "0")]).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn hub_timeout_is_configurable() {
        let cfg = config_from(&[("HUB_TIMEOUT_SECONDS", "12")]).unwrap();
        assert_eq!(cfg.hub_timeout(), Duration::from_secs(12));
        assert!(config_from(&[("HUB_TIMEOUT_SECONDS", "later")]).is_err());
    }

    #[test]
    fn request_timeout_outlasts_outbound_calls() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));

        let cfg = config_from(&[("QUERY_TIMEOUT_SECONDS", "35"), ("HUB_TIMEOUT_SECONDS", "25")])
            .unwrap();
        cfg.validate().unwrap();
        assert!(cfg.request_timeout() > cfg.query_timeout() + cfg.hub_timeout());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(65));

        let cfg = ServiceConfig {
            query_timeout_secs: u64::MAX,
            ..ServiceConfig::default()
        };
        assert_eq!(cfg.request_timeout(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn quota_accepts_digit_separators() {
        let cfg = config_from(&[("DEFAULT_QUOTA_BYTES", "10_737_418_240")]).unwrap();
        assert_eq!(cfg.default_quota_bytes, 10_737_418_240);
    }

    #[test]
    fn empty_namespace_counts_as_unset() {
        let cfg = config_from(&[("PROMETHEUS_NAMESPACE", "")]).unwrap();
        assert!(cfg.metrics_namespace.is_none());
    }

    #[test]
    fn service_prefix_is_normalized() {
        assert_eq!(normalize_prefix("/services/usage-quota"), "/services/usage-quota/");
        assert_eq!(normalize_prefix("services/usage-quota/"), "/services/usage-quota/");
        assert_eq!(normalize_prefix("/"), "/");
    }

    #[test]
    fn header_mode_rejects_invalid_header_name() {
        let cfg = config_from(&[("IDENTITY_MODE", "header"), ("IDENTITY_HEADER", "bad header")])
            .unwrap();
        assert!(cfg.validate().is_err());
    }
}
