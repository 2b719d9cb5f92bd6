//! Daily usage ledger and admission checks.
//!
//! Every operation reloads the whole ledger from storage, applies its change
//! and writes the whole ledger back. Nothing is cached between calls, so
//! repeated short-lived processes always see the latest file.

use crate::record::{DailyUsageRecord, OperationEstimate, QuotaPolicy};
use crate::report::{CurrentUsage, DailyReport, WeeklyReport};
use crate::storage::{JsonFileStorage, LedgerStorage, MemoryStorage};
use crate::LedgerError;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Days of history kept in the ledger.
pub const RETENTION_DAYS: i64 = 30;

/// Days covered by the weekly report.
pub const WEEKLY_WINDOW_DAYS: i64 = 7;

/// Source of the current calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Calendar day in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Why an admission check refused the proposed work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitRejection {
    DailyRequests { projected: u64, limit: u64 },
    DailyTokens { projected: u64, limit: u64 },
}

impl fmt::Display for LimitRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitRejection::DailyRequests { projected, limit } => write!(
                f,
                "Would exceed daily request limit ({}/{})",
                projected, limit
            ),
            LimitRejection::DailyTokens { projected, limit } => {
                write!(f, "Would exceed daily token limit ({}/{})", projected, limit)
            }
        }
    }
}

/// Outcome of [`UsageLedger::check_limits`].
#[derive(Debug, Clone, PartialEq)]
pub struct LimitCheck {
    pub can_proceed: bool,
    pub reason: Option<LimitRejection>,
    pub usage: DailyUsageRecord,
}

pub struct UsageLedger {
    storage: Box<dyn LedgerStorage>,
    policy: QuotaPolicy,
    operation: OperationEstimate,
    clock: Box<dyn Clock>,
}

impl UsageLedger {
    pub fn new(storage: impl LedgerStorage + 'static, policy: QuotaPolicy) -> Self {
        Self {
            storage: Box::new(storage),
            policy,
            operation: OperationEstimate::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Ledger backed by the JSON file at `path`.
    pub fn open(path: impl Into<PathBuf>, policy: QuotaPolicy) -> Self {
        Self::new(JsonFileStorage::new(path), policy)
    }

    pub fn in_memory(policy: QuotaPolicy) -> Self {
        Self::new(MemoryStorage::new(), policy)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Sets the per-run estimate used by reports.
    pub fn with_operation(mut self, operation: OperationEstimate) -> Self {
        self.operation = operation;
        self
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub fn operation(&self) -> &OperationEstimate {
        &self.operation
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Reads every stored record.
    ///
    /// Only a document that is not a JSON array is an error. Entries that do
    /// not decode as a record are skipped so their siblings stay usable.
    pub fn load_all(&self) -> Result<Vec<DailyUsageRecord>, LedgerError> {
        match self.storage.read()? {
            Some(contents) => {
                let entries: Vec<serde_json::Value> = serde_json::from_str(&contents)?;
                Ok(decode_entries(entries))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Like `load_all`, but an unreadable ledger reads as empty.
    fn load_all_or_empty(&self) -> Vec<DailyUsageRecord> {
        self.load_all().unwrap_or_else(|e| {
            tracing::debug!("Treating usage ledger as empty: {}", e);
            Vec::new()
        })
    }

    /// Today's record, or a zeroed one when storage has nothing usable.
    pub fn load_today(&self) -> DailyUsageRecord {
        let today = self.today();
        self.load_all_or_empty()
            .into_iter()
            .find(|r| r.date == today)
            .unwrap_or_else(|| DailyUsageRecord::empty(today))
    }

    /// Upserts `record`, prunes expired days and rewrites the ledger.
    pub fn persist(&self, record: DailyUsageRecord) -> Result<(), LedgerError> {
        let records = merge_and_prune(self.load_all_or_empty(), record, self.today());
        let contents = serde_json::to_string_pretty(&records)?;
        self.storage.write(&contents)
    }

    /// Best-effort `persist`: a failed write is logged and dropped.
    pub fn save(&self, record: DailyUsageRecord) {
        let date = record.date;
        if let Err(e) = self.persist(record) {
            tracing::warn!("Could not save usage stats for {}: {}", date, e);
        }
    }

    /// Pre-flight check of whether `requests` / `tokens` still fit today.
    ///
    /// Nothing is reserved. Two callers can both pass and then overshoot the
    /// ceiling once both record their usage.
    pub fn check_limits(&self, requests: u64, tokens: u64) -> LimitCheck {
        let usage = self.load_today();
        let reason = evaluate_limits(&self.policy, &usage, requests, tokens);
        if let Some(r) = &reason {
            tracing::debug!("Admission refused: {}", r);
        }
        LimitCheck {
            can_proceed: reason.is_none(),
            reason,
            usage,
        }
    }

    /// Adds work that has already been performed to today's counters.
    pub fn record_usage(&self, requests: u64, tokens: u64) {
        let mut usage = self.load_today();
        usage.add(requests, tokens);
        tracing::info!(
            requests,
            tokens,
            total_requests = usage.request_count,
            total_tokens = usage.estimated_tokens,
            "Recorded API usage"
        );
        self.save(usage);
    }

    pub fn report(&self) -> DailyReport {
        DailyReport::new(self.load_today(), &self.policy, &self.operation)
    }

    pub fn weekly_report(&self) -> WeeklyReport {
        let since = self.today() - Duration::days(WEEKLY_WINDOW_DAYS);
        let window: Vec<DailyUsageRecord> = self
            .load_all_or_empty()
            .into_iter()
            .filter(|r| r.date > since)
            .collect();
        WeeklyReport::from_records(&window)
    }

    pub fn current_usage(&self) -> CurrentUsage {
        CurrentUsage::new(self.load_today(), &self.policy)
    }
}

fn decode_entries(entries: Vec<serde_json::Value>) -> Vec<DailyUsageRecord> {
    entries
        .into_iter()
        .filter_map(|entry| match DailyUsageRecord::deserialize(&entry) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Skipping usage entry {}: {}", entry, e);
                None
            }
        })
        .collect()
}

pub(crate) fn evaluate_limits(
    policy: &QuotaPolicy,
    usage: &DailyUsageRecord,
    requests: u64,
    tokens: u64,
) -> Option<LimitRejection> {
    let projected = usage.request_count.saturating_add(requests);
    if projected > policy.max_requests_per_day {
        return Some(LimitRejection::DailyRequests {
            projected,
            limit: policy.max_requests_per_day,
        });
    }

    let projected = usage.estimated_tokens.saturating_add(tokens);
    if projected > policy.max_tokens_per_day {
        return Some(LimitRejection::DailyTokens {
            projected,
            limit: policy.max_tokens_per_day,
        });
    }

    None
}

/// Replaces any record for `record.date`, drops days that fell out of the
/// retention window and returns the ledger ordered by date.
pub(crate) fn merge_and_prune(
    mut records: Vec<DailyUsageRecord>,
    record: DailyUsageRecord,
    today: NaiveDate,
) -> Vec<DailyUsageRecord> {
    let cutoff = today - Duration::days(RETENTION_DAYS);
    records.retain(|r| r.date != record.date);
    records.push(record);
    records.retain(|r| r.date > cutoff);
    records.sort_by_key(|r| r.date);
    records
}
