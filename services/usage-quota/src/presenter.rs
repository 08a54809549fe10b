use serde::{Deserialize, Serialize};

use crate::usage::UsageResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePayload {
    pub used_bytes: u64,
    pub quota_bytes: u64,
    pub percent_used: f64,
    pub over_quota: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Map a usage result onto the response payload. A zero quota reads as fully used.
pub fn present(result: &UsageResult) -> UsagePayload {
    let (percent_used, over_quota) = if result.bytes_quota == 0 {
        (100.0, true)
    } else {
        let ratio = result.bytes_used as f64 / result.bytes_quota as f64;
        (
            round_one_decimal(ratio * 100.0),
            result.bytes_used > result.bytes_quota,
        )
    };

    UsagePayload {
        used_bytes: result.bytes_used,
        quota_bytes: result.bytes_quota,
        percent_used,
        over_quota,
        last_updated: result.sampled_at.map(|ts| ts.to_rfc3339()),
        username: result.username.clone(),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
