//! README status badges reflecting today's usage.

use chrono::{DateTime, SecondsFormat, Utc};
use dp_usage::report::group_thousands;
use dp_usage::{DailyUsageRecord, QuotaPolicy, UsageLedger};
use regex::{NoExpand, Regex};
use std::path::Path;

fn color_for(used: u64, limit: u64) -> &'static str {
    let percent = if limit == 0 {
        100.0
    } else {
        used as f64 / limit as f64 * 100.0
    };
    if percent > 80.0 {
        "red"
    } else if percent > 50.0 {
        "yellow"
    } else {
        "green"
    }
}

/// Shields.io path segments must escape `/` and `,`.
fn shield_number(n: u64) -> String {
    group_thousands(n).replace(',', "%2C")
}

/// Rewrites the usage badges and the `**Last Updated:**` line in `readme`.
/// Text without badges is returned unchanged apart from the timestamp line.
pub fn render_badges(
    readme: &str,
    usage: &DailyUsageRecord,
    policy: &QuotaPolicy,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let limited = usage.request_count >= policy.max_requests_per_day
        || usage.estimated_tokens >= policy.max_tokens_per_day;
    let (status, status_color) = if limited {
        ("Limited", "red")
    } else {
        ("Active", "brightgreen")
    };

    let requests_badge = format!(
        "![API Usage](https://img.shields.io/badge/Daily%20Requests-{}%2F{}-{})",
        shield_number(usage.request_count),
        shield_number(policy.max_requests_per_day),
        color_for(usage.request_count, policy.max_requests_per_day)
    );
    let tokens_badge = format!(
        "![Token Usage](https://img.shields.io/badge/Daily%20Tokens-{}%2F{}-{})",
        shield_number(usage.estimated_tokens),
        shield_number(policy.max_tokens_per_day),
        color_for(usage.estimated_tokens, policy.max_tokens_per_day)
    );
    let status_badge = format!(
        "![Status](https://img.shields.io/badge/Status-{}-{})",
        status, status_color
    );
    let updated = format!(
        "**Last Updated:** {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    let replacements = [
        (
            r"!\[API Usage\]\(https://img\.shields\.io/badge/Daily%20Requests-.*?\)",
            requests_badge,
        ),
        (
            r"!\[Token Usage\]\(https://img\.shields\.io/badge/Daily%20Tokens-.*?\)",
            tokens_badge,
        ),
        (
            r"!\[Status\]\(https://img\.shields\.io/badge/Status-.*?\)",
            status_badge,
        ),
        (r"\*\*Last Updated:\*\* .*", updated),
    ];

    let mut out = readme.to_string();
    for (pattern, replacement) in replacements {
        let re = Regex::new(pattern)?;
        out = re.replace_all(&out, NoExpand(&replacement)).into_owned();
    }
    Ok(out)
}

/// Updates the badges of the README at `path` from today's ledger record.
pub fn update_readme(path: &Path, ledger: &UsageLedger) -> anyhow::Result<()> {
    let readme = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?;
    let usage = ledger.load_today();
    let updated = render_badges(&readme, &usage, ledger.policy(), Utc::now())?;
    std::fs::write(path, updated)?;
    tracing::info!(
        requests = usage.request_count,
        tokens = usage.estimated_tokens,
        "Updated README badges in {}",
        path.display()
    );
    Ok(())
}
