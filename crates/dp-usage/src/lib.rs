pub mod ledger;
pub mod record;
pub mod report;
pub mod storage;

pub use ledger::{Clock, FixedClock, LimitCheck, LimitRejection, SystemClock, UsageLedger};
pub use record::{DailyUsageRecord, OperationEstimate, QuotaPolicy, CALL_ESTIMATE};
pub use report::{CurrentUsage, DailyReport, UsageLevel, WeeklyReport, WeeklySummary};
pub use storage::{JsonFileStorage, LedgerStorage, MemoryStorage};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed usage file: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Storage write rejected: {0}")]
    WriteRejected(String),
}
