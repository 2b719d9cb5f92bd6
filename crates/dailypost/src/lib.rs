//! Shared helpers used by the `dailypost` binary.

pub mod badges;
pub mod workflow;

use dp_config::DailypostConfig;
use dp_usage::UsageLedger;
use std::path::PathBuf;

/// Build-time version string.
///
/// `DAILYPOST_VERSION` from the build environment wins over the crate
/// package version.
pub const DAILYPOST_VERSION: &str = match option_env!("DAILYPOST_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Opens the usage ledger described by `config`. `usage_file` overrides the
/// configured location.
pub fn open_ledger(
    config: &DailypostConfig,
    usage_file: Option<PathBuf>,
) -> anyhow::Result<UsageLedger> {
    let path = match usage_file {
        Some(path) => path,
        None => config.usage_file()?,
    };
    tracing::debug!("Using usage ledger at {}", path.display());
    Ok(UsageLedger::open(path, config.quota).with_operation(config.operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_config::ConfigPaths;
    use dp_usage::{OperationEstimate, QuotaPolicy};

    #[test]
    fn open_ledger_prefers_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.json");
        let mut config = DailypostConfig::default();
        config.set_paths(ConfigPaths::with_base(dir.path().join("base")));

        let ledger = open_ledger(&config, Some(explicit.clone())).unwrap();
        ledger.record_usage(1, 750);

        assert!(explicit.exists());
        assert!(!dir.path().join("base").join("api-usage.json").exists());
    }

    #[test]
    fn open_ledger_carries_config_limits() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DailypostConfig::default();
        config.usage_file = None;
        config.quota = QuotaPolicy {
            max_requests_per_day: 3,
            ..QuotaPolicy::default()
        };
        config.operation = OperationEstimate::new(1, 100);
        config.set_paths(ConfigPaths::with_base(dir.path().to_path_buf()));

        let ledger = open_ledger(&config, None).unwrap();
        assert_eq!(ledger.policy().max_requests_per_day, 3);
        assert_eq!(ledger.report().estimated_operations, 3);

        ledger.record_usage(2, 0);
        assert!(dir.path().join("api-usage.json").exists());
        assert!(!ledger.check_limits(2, 0).can_proceed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_charges_configured_call() {
        use crate::workflow::{GenerationRun, RunOutcome};
        use std::sync::Arc;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::with_base(dir.path().to_path_buf());
        std::fs::write(
            paths.config_path(),
            "[call]\nrequests = 2\ntokens = 3000\n",
        )
        .unwrap();
        let mut config = DailypostConfig::load_from(&paths).unwrap();
        config.usage_file = Some(dir.path().join("ledger.json"));

        let ledger = Arc::new(open_ledger(&config, None).unwrap());
        let run = GenerationRun {
            posts: 3,
            call: config.call,
            delay: Duration::ZERO,
            command: vec!["true".to_string()],
        };
        let outcome = run.execute(Arc::clone(&ledger)).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Completed { posts: 3 }));
        let usage = ledger.load_today();
        assert_eq!(usage.request_count, 6);
        assert_eq!(usage.estimated_tokens, 9000);
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!DAILYPOST_VERSION.is_empty());
    }
}
