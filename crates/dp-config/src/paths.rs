use std::path::PathBuf;

/// Holds a configurable base directory for all dailypost file paths.
///
/// Use `ConfigPaths::new()` for production (resolves `~/.dailypost`),
/// or `ConfigPaths::with_base()` for testing with an isolated directory.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    base: PathBuf,
}

impl ConfigPaths {
    /// Create paths rooted at `~/.dailypost`. Returns an error if the home
    /// directory cannot be determined.
    pub fn new() -> anyhow::Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(Self {
            base: home.join(".dailypost"),
        })
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    /// Default location of the usage ledger.
    pub fn usage_path(&self) -> PathBuf {
        self.base.join("api-usage.json")
    }
}
