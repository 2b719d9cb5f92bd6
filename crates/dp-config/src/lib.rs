pub mod config;
pub mod paths;

pub use config::DailypostConfig;
pub use paths::ConfigPaths;
