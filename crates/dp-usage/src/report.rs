use crate::record::{DailyUsageRecord, OperationEstimate, QuotaPolicy};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Good,
    Elevated,
    Warning,
}

impl UsageLevel {
    pub fn from_percentages(request_percent: f64, token_percent: f64) -> Self {
        if request_percent > 80.0 || token_percent > 80.0 {
            UsageLevel::Warning
        } else if request_percent > 50.0 || token_percent > 50.0 {
            UsageLevel::Elevated
        } else {
            UsageLevel::Good
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            UsageLevel::Good => "GOOD: Well within daily limits",
            UsageLevel::Elevated => "INFO: Over 50% of daily limits used",
            UsageLevel::Warning => "WARNING: Approaching daily limits!",
        }
    }
}

fn percent_of(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    used as f64 / limit as f64 * 100.0
}

/// How many whole operations of `per_op` fit in `remaining`. A zero-sized
/// operation does not constrain.
fn operations_in(remaining: u64, per_op: u64) -> Option<u64> {
    remaining.checked_div(per_op)
}

/// Snapshot of today's usage measured against the policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub usage: DailyUsageRecord,
    pub policy: QuotaPolicy,
    pub request_percent: f64,
    pub token_percent: f64,
    pub remaining_requests: u64,
    pub remaining_tokens: u64,
    pub estimated_operations: u64,
    pub level: UsageLevel,
}

impl DailyReport {
    pub fn new(usage: DailyUsageRecord, policy: &QuotaPolicy, operation: &OperationEstimate) -> Self {
        let request_percent = percent_of(usage.request_count, policy.max_requests_per_day);
        let token_percent = percent_of(usage.estimated_tokens, policy.max_tokens_per_day);
        let remaining_requests = policy
            .max_requests_per_day
            .saturating_sub(usage.request_count);
        let remaining_tokens = policy
            .max_tokens_per_day
            .saturating_sub(usage.estimated_tokens);

        let estimated_operations = match (
            operations_in(remaining_requests, operation.requests),
            operations_in(remaining_tokens, operation.tokens),
        ) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => 0,
        };

        Self {
            usage,
            policy: *policy,
            request_percent,
            token_percent,
            remaining_requests,
            remaining_tokens,
            estimated_operations,
            level: UsageLevel::from_percentages(request_percent, token_percent),
        }
    }
}

impl fmt::Display for DailyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "API USAGE (FREE TIER)")?;
        writeln!(f, "================================")?;
        writeln!(f, "Date:     {}", self.usage.date)?;
        writeln!(
            f,
            "Requests: {}/{} ({:.1}%)",
            self.usage.request_count, self.policy.max_requests_per_day, self.request_percent
        )?;
        writeln!(
            f,
            "Tokens:   {}/{} ({:.1}%)",
            group_thousands(self.usage.estimated_tokens),
            group_thousands(self.policy.max_tokens_per_day),
            self.token_percent
        )?;
        writeln!(f, "Cost:     ${:.2}", self.usage.total_cost)?;
        writeln!(
            f,
            "Rate:     {} requests/minute",
            self.policy.max_requests_per_minute
        )?;
        writeln!(f)?;
        writeln!(f, "REMAINING CAPACITY:")?;
        writeln!(f, "Requests: {}", group_thousands(self.remaining_requests))?;
        writeln!(f, "Tokens:   {}", group_thousands(self.remaining_tokens))?;
        writeln!(f, "Estimated runs possible today: {}", self.estimated_operations)?;
        writeln!(f)?;
        write!(f, "{}", self.level.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub days: usize,
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_requests_per_day: f64,
    pub avg_tokens_per_day: f64,
}

/// Roll-up of the trailing seven days.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeeklyReport {
    NoData,
    Summary(WeeklySummary),
}

impl WeeklyReport {
    /// Averages are taken over the days that have a record, not over seven.
    pub fn from_records(records: &[DailyUsageRecord]) -> Self {
        if records.is_empty() {
            return WeeklyReport::NoData;
        }
        let total_requests = records
            .iter()
            .fold(0u64, |sum, r| sum.saturating_add(r.request_count));
        let total_tokens = records
            .iter()
            .fold(0u64, |sum, r| sum.saturating_add(r.estimated_tokens));
        let total_cost = records.iter().map(|r| r.total_cost).sum();
        let days = records.len();

        WeeklyReport::Summary(WeeklySummary {
            days,
            total_requests,
            total_tokens,
            total_cost,
            avg_requests_per_day: total_requests as f64 / days as f64,
            avg_tokens_per_day: total_tokens as f64 / days as f64,
        })
    }
}

impl fmt::Display for WeeklyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeeklyReport::NoData => write!(f, "No usage data for the last 7 days"),
            WeeklyReport::Summary(s) => {
                writeln!(f, "WEEKLY USAGE SUMMARY (Last 7 Days)")?;
                writeln!(f, "======================================")?;
                writeln!(f, "Days recorded:    {}", s.days)?;
                writeln!(f, "Total Requests:   {}", s.total_requests)?;
                writeln!(f, "Total Tokens:     {}", group_thousands(s.total_tokens))?;
                writeln!(f, "Avg Requests/Day: {:.1}", s.avg_requests_per_day)?;
                writeln!(f, "Avg Tokens/Day:   {:.1}", s.avg_tokens_per_day)?;
                write!(f, "Total Cost:       ${:.2}", s.total_cost)
            }
        }
    }
}

/// Today's counters in the shape CI scripts read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUsage {
    pub daily_requests: u64,
    pub daily_tokens: u64,
    pub date: NaiveDate,
    pub usage_percentage: u64,
}

impl CurrentUsage {
    pub fn new(usage: DailyUsageRecord, policy: &QuotaPolicy) -> Self {
        let percent = percent_of(usage.request_count, policy.max_requests_per_day);
        Self {
            daily_requests: usage.request_count,
            daily_tokens: usage.estimated_tokens,
            date: usage.date,
            usage_percentage: percent.round() as u64,
        }
    }
}

/// Formats `n` with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(requests: u64, tokens: u64) -> DailyUsageRecord {
        DailyUsageRecord {
            date: NaiveDate::from_ymd_opt(2026, 5, 10).unwrap(),
            request_count: requests,
            estimated_tokens: tokens,
            total_cost: 0.0,
        }
    }

    #[test]
    fn daily_report_computes_percentages_and_remaining() {
        let report = DailyReport::new(
            usage(150, 250_000),
            &QuotaPolicy::default(),
            &OperationEstimate::default(),
        );
        assert!((report.request_percent - 10.0).abs() < 1e-9);
        assert!((report.token_percent - 25.0).abs() < 1e-9);
        assert_eq!(report.remaining_requests, 1350);
        assert_eq!(report.remaining_tokens, 750_000);
        // min(1350 / 2, 750000 / 1500) = min(675, 500)
        assert_eq!(report.estimated_operations, 500);
        assert_eq!(report.level, UsageLevel::Good);
    }

    #[test]
    fn daily_report_floors_estimated_operations() {
        let report = DailyReport::new(
            usage(1497, 0),
            &QuotaPolicy::default(),
            &OperationEstimate::default(),
        );
        assert_eq!(report.remaining_requests, 3);
        assert_eq!(report.estimated_operations, 1);
        assert_eq!(report.level, UsageLevel::Warning);
    }

    #[test]
    fn daily_report_saturates_when_over_ceiling() {
        let report = DailyReport::new(
            usage(1600, 2_000_000),
            &QuotaPolicy::default(),
            &OperationEstimate::default(),
        );
        assert_eq!(report.remaining_requests, 0);
        assert_eq!(report.remaining_tokens, 0);
        assert_eq!(report.estimated_operations, 0);
    }

    #[test]
    fn zero_sized_operation_dimension_does_not_constrain() {
        let report = DailyReport::new(
            usage(0, 999_000),
            &QuotaPolicy::default(),
            &OperationEstimate::new(3, 0),
        );
        assert_eq!(report.estimated_operations, 500);

        let report = DailyReport::new(
            usage(0, 0),
            &QuotaPolicy::default(),
            &OperationEstimate::new(0, 0),
        );
        assert_eq!(report.estimated_operations, 0);
    }

    #[test]
    fn usage_level_thresholds() {
        assert_eq!(UsageLevel::from_percentages(50.0, 50.0), UsageLevel::Good);
        assert_eq!(UsageLevel::from_percentages(50.1, 0.0), UsageLevel::Elevated);
        assert_eq!(UsageLevel::from_percentages(80.0, 0.0), UsageLevel::Elevated);
        assert_eq!(UsageLevel::from_percentages(0.0, 80.5), UsageLevel::Warning);
    }

    #[test]
    fn daily_report_display_mentions_totals() {
        let report = DailyReport::new(
            usage(2, 1500),
            &QuotaPolicy::default(),
            &OperationEstimate::default(),
        );
        let text = report.to_string();
        assert!(text.contains("Date:     2026-05-10"));
        assert!(text.contains("Requests: 2/1500 (0.1%)"));
        assert!(text.contains("Tokens:   1,500/1,000,000 ("));
        assert!(text.contains("Estimated runs possible today: 665"));
        assert!(text.ends_with(UsageLevel::Good.message()));
    }

    #[test]
    fn daily_report_display_warns_once() {
        let report = DailyReport::new(
            usage(1300, 0),
            &QuotaPolicy::default(),
            &OperationEstimate::default(),
        );
        let text = report.to_string();
        assert_eq!(text.matches("Approaching daily limits").count(), 1);
        assert!(text.ends_with(UsageLevel::Warning.message()));
    }

    #[test]
    fn weekly_report_empty_is_no_data() {
        let report = WeeklyReport::from_records(&[]);
        assert_eq!(report, WeeklyReport::NoData);
        assert_eq!(report.to_string(), "No usage data for the last 7 days");
    }

    #[test]
    fn weekly_report_averages_over_recorded_days() {
        let report = WeeklyReport::from_records(&[usage(2, 1500), usage(4, 3000), usage(3, 0)]);
        let WeeklyReport::Summary(summary) = report else {
            panic!("expected summary");
        };
        assert_eq!(summary.days, 3);
        assert_eq!(summary.total_requests, 9);
        assert_eq!(summary.total_tokens, 4500);
        assert!((summary.avg_requests_per_day - 3.0).abs() < 1e-9);
        assert!((summary.avg_tokens_per_day - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_report_serializes_status_tag() {
        let json = serde_json::to_value(WeeklyReport::NoData).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "no_data" }));
    }

    #[test]
    fn current_usage_serializes_camel_case() {
        let current = CurrentUsage::new(usage(750, 10), &QuotaPolicy::default());
        let json = serde_json::to_value(&current).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dailyRequests": 750,
                "dailyTokens": 10,
                "date": "2026-05-10",
                "usagePercentage": 50
            })
        );
    }

    #[test]
    fn group_thousands_formats() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_000_000), "1,000,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }
}
