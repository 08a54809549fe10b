use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ResourceKind, UsageBackend, UsageError, UsageQuery, UsageResult, PROMETHEUS_QUERY_PATH};
use crate::config::ServiceConfig;

/// Prometheus `errorType` values that mean the server could not answer right now.
const TRANSIENT_ERROR_TYPES: &[&str] = &["timeout", "unavailable", "canceled"];

#[derive(Debug, Clone)]
pub struct PrometheusSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub namespace: Option<String>,
    pub usage_metric: String,
    pub quota_metric: String,
    pub default_quota_bytes: u64,
}

impl PrometheusSettings {
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let base_url = config
            .metrics_endpoint_url
            .clone()
            .context("METRICS_ENDPOINT_URL missing despite validation")?;

        Ok(Self {
            base_url,
            timeout: config.query_timeout(),
            namespace: config.metrics_namespace.clone(),
            usage_metric: config.usage_metric.clone(),
            quota_metric: config.quota_metric.clone(),
            default_quota_bytes: config.default_quota_bytes,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: (f64, String),
}

/// Live backend answering from the Prometheus instant query API.
pub struct PrometheusBackend {
    http_client: Client,
    query_url: String,
    settings: PrometheusSettings,
}

impl PrometheusBackend {
    pub fn new(settings: PrometheusSettings) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build Prometheus client")?;

        let query_url = format!(
            "{}{}",
            settings.base_url.trim_end_matches('/'),
            PROMETHEUS_QUERY_PATH
        );

        Ok(Self {
            http_client,
            query_url,
            settings,
        })
    }

    fn selector(&self, metric: &str, identity: &str) -> String {
        let mut selector = format!("{}{{directory=\"{}\"", metric, escape_label_value(identity));
        if let Some(namespace) = &self.settings.namespace {
            selector.push_str(&format!(",namespace=\"{}\"", escape_label_value(namespace)));
        }
        selector.push('}');
        selector
    }

    #[instrument(skip(self))]
    async fn instant_query(&self, promql: &str) -> Result<Vec<Sample>, UsageError> {
        debug!("Querying Prometheus at {}", self.query_url);

        let response = self
            .http_client
            .get(&self.query_url)
            .query(&[("query", promql)])
            .send()
            .await
            .map_err(UsageError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(UsageError::BackendUnavailable(format!(
                "Prometheus responded with {}: {}",
                status, body
            )));
        }

        let body = response.text().await.map_err(UsageError::from)?;
        parse_query_response(&body)
    }

    fn select_sample<'a>(&self, samples: &'a [Sample]) -> Option<&'a Sample> {
        match &self.settings.namespace {
            Some(namespace) => samples
                .iter()
                .find(|sample| sample.metric.get("namespace") == Some(namespace)),
            None => samples.first(),
        }
    }
}

#[async_trait]
impl UsageBackend for PrometheusBackend {
    fn name(&self) -> &'static str {
        "prometheus"
    }

    async fn answer(&self, query: &UsageQuery) -> Result<UsageResult, UsageError> {
        let (usage_metric, quota_metric) = match query.kind() {
            ResourceKind::Storage => (&self.settings.usage_metric, &self.settings.quota_metric),
        };

        let identity = query.identity().as_str();
        let usage_query = self.selector(usage_metric, identity);
        let quota_query = self.selector(quota_metric, identity);

        let (usage_samples, quota_samples) = tokio::try_join!(
            self.instant_query(&usage_query),
            self.instant_query(&quota_query)
        )?;

        let usage_sample = self.select_sample(&usage_samples).ok_or_else(|| {
            UsageError::MalformedBackendResponse(format!("no series for query {}", usage_query))
        })?;
        let bytes_used = parse_sample_value(&usage_sample.value.1)?;

        let bytes_quota = match self.select_sample(&quota_samples) {
            Some(sample) => match parse_sample_value(&sample.value.1)? {
                0 => self.settings.default_quota_bytes,
                quota => quota,
            },
            None => {
                debug!(identity = %identity, "No quota series, using configured default");
                self.settings.default_quota_bytes
            }
        };

        let username = usage_sample
            .metric
            .get("directory")
            .map(String::as_str)
            .unwrap_or(identity);
        let mut result = UsageResult::new(bytes_used, bytes_quota).with_username(username);
        if let Some(sampled_at) = sample_timestamp(usage_sample.value.0) {
            result = result.with_sampled_at(sampled_at);
        }
        Ok(result)
    }
}

fn parse_query_response(body: &str) -> Result<Vec<Sample>, UsageError> {
    let response: QueryResponse = serde_json::from_str(body).map_err(|e| {
        UsageError::MalformedBackendResponse(format!("Failed to parse Prometheus response: {}", e))
    })?;

    if response.status != "success" {
        let error_type = response.error_type.unwrap_or_default();
        let message = format!(
            "Prometheus query failed ({}): {}",
            error_type,
            response.error.unwrap_or_default()
        );
        warn!(error_type = %error_type, "Prometheus returned an error status");

        return if TRANSIENT_ERROR_TYPES.contains(&error_type.as_str()) {
            Err(UsageError::BackendUnavailable(message))
        } else {
            Err(UsageError::MalformedBackendResponse(message))
        };
    }

    let data = response.data.ok_or_else(|| {
        UsageError::MalformedBackendResponse("Prometheus response has no data".to_string())
    })?;

    if data.result_type != "vector" {
        return Err(UsageError::MalformedBackendResponse(format!(
            "unexpected result type {}",
            data.result_type
        )));
    }

    Ok(data.result)
}

/// Whole bytes from a sample value. Rejects anything that is not a finite, non-negative number.
fn parse_sample_value(raw: &str) -> Result<u64, UsageError> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        UsageError::MalformedBackendResponse(format!("non-numeric sample value {:?}", raw))
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(UsageError::MalformedBackendResponse(format!(
            "sample value out of range: {}",
            raw
        )));
    }

    Ok(value.trunc() as u64)
}

fn sample_timestamp(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

/// Escape a label value for use inside a double-quoted PromQL string.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
