use dp_usage::{OperationEstimate, QuotaPolicy, CALL_ESTIMATE};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::paths::ConfigPaths;

fn default_usage_file() -> Option<PathBuf> {
    env::var_os("DAILYPOST_USAGE_FILE")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn default_readme_path() -> PathBuf {
    PathBuf::from("README.md")
}

fn default_call() -> OperationEstimate {
    CALL_ESTIMATE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailypostConfig {
    /// Overrides the ledger location. Relative paths resolve against the
    /// working directory.
    #[serde(default = "default_usage_file")]
    pub usage_file: Option<PathBuf>,
    #[serde(default = "default_readme_path")]
    pub readme_path: PathBuf,
    #[serde(default)]
    pub quota: QuotaPolicy,
    /// Charge for one run.
    #[serde(default)]
    pub operation: OperationEstimate,
    /// Charge for one generator call; `run` and `record` use it.
    #[serde(default = "default_call")]
    pub call: OperationEstimate,
    #[serde(skip)]
    paths: Option<ConfigPaths>,
}

impl Default for DailypostConfig {
    fn default() -> Self {
        Self {
            usage_file: default_usage_file(),
            readme_path: default_readme_path(),
            quota: QuotaPolicy::default(),
            operation: OperationEstimate::default(),
            call: default_call(),
            paths: None,
        }
    }
}

impl DailypostConfig {
    /// Returns the `ConfigPaths` for this config, falling back to the default
    /// home-directory paths.
    pub fn paths(&self) -> anyhow::Result<ConfigPaths> {
        match &self.paths {
            Some(p) => Ok(p.clone()),
            None => ConfigPaths::new(),
        }
    }

    pub fn set_paths(&mut self, paths: ConfigPaths) {
        self.paths = Some(paths);
    }

    /// Load config from the default location (`~/.dailypost/config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths)
    }

    pub fn load_from(paths: &ConfigPaths) -> anyhow::Result<Self> {
        let config_file = paths.config_path();
        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let config: DailypostConfig = toml::from_str(&content)?;
            config
        } else {
            Self::default()
        };
        config.paths = Some(paths.clone());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.quota.max_requests_per_day == 0 {
            anyhow::bail!("quota.max_requests_per_day must be greater than 0");
        }
        if self.quota.max_tokens_per_day == 0 {
            anyhow::bail!("quota.max_tokens_per_day must be greater than 0");
        }
        if self.operation.requests == 0 && self.operation.tokens == 0 {
            anyhow::bail!("operation must charge at least one request or token");
        }
        if self.call.requests == 0 && self.call.tokens == 0 {
            anyhow::bail!("call must charge at least one request or token");
        }
        if self.readme_path.as_os_str().is_empty() {
            anyhow::bail!("readme_path must not be empty");
        }
        Ok(())
    }

    /// Ledger file: the configured override, or `usage_path()` under the
    /// config directory.
    pub fn usage_file(&self) -> anyhow::Result<PathBuf> {
        match &self.usage_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.paths()?.usage_path()),
        }
    }
}
