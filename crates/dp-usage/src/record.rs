use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Usage counters for one calendar day, as stored in the usage file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsageRecord {
    pub date: NaiveDate,
    #[serde(rename = "requestCount", default)]
    pub request_count: u64,
    #[serde(rename = "estimatedTokens", default)]
    pub estimated_tokens: u64,
    /// Never negative; negative values on disk read as zero.
    #[serde(
        rename = "totalCosts",
        alias = "totalCost",
        default,
        deserialize_with = "non_negative_cost"
    )]
    pub total_cost: f64,
}

fn non_negative_cost<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(f64::deserialize(deserializer)?.max(0.0))
}

impl DailyUsageRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            request_count: 0,
            estimated_tokens: 0,
            total_cost: 0.0,
        }
    }

    /// Adds a delta to the counters. Counters saturate instead of wrapping.
    pub fn add(&mut self, requests: u64, tokens: u64) {
        self.request_count = self.request_count.saturating_add(requests);
        self.estimated_tokens = self.estimated_tokens.saturating_add(tokens);
    }
}

fn default_max_requests_per_day() -> u64 {
    1500
}

fn default_max_tokens_per_day() -> u64 {
    1_000_000
}

fn default_max_requests_per_minute() -> u64 {
    15
}

/// Daily ceilings of the provider's free tier.
///
/// `max_requests_per_minute` is carried for reporting only; admission checks
/// look at the daily ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    #[serde(default = "default_max_requests_per_day")]
    pub max_requests_per_day: u64,
    #[serde(default = "default_max_tokens_per_day")]
    pub max_tokens_per_day: u64,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            max_requests_per_day: default_max_requests_per_day(),
            max_tokens_per_day: default_max_tokens_per_day(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

/// Requests and tokens charged for a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationEstimate {
    pub requests: u64,
    pub tokens: u64,
}

/// Charge for a single generation call.
pub const CALL_ESTIMATE: OperationEstimate = OperationEstimate {
    requests: 1,
    tokens: 750,
};

impl OperationEstimate {
    pub const fn new(requests: u64, tokens: u64) -> Self {
        Self { requests, tokens }
    }

    pub fn times(self, n: u64) -> Self {
        Self {
            requests: self.requests.saturating_mul(n),
            tokens: self.tokens.saturating_mul(n),
        }
    }
}

/// A full content run: two posts at one call each.
impl Default for OperationEstimate {
    fn default() -> Self {
        CALL_ESTIMATE.times(2)
    }
}
