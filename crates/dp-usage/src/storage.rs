use crate::LedgerError;
use std::path::PathBuf;
use std::sync::Mutex;

/// Raw access to the persisted ledger contents.
///
/// Implementations move whole documents: `read` returns the full contents
/// (`None` when nothing has been stored yet) and `write` replaces them.
pub trait LedgerStorage: Send + Sync {
    fn read(&self) -> Result<Option<String>, LedgerError>;
    fn write(&self, contents: &str) -> Result<(), LedgerError>;
}

/// Ledger stored as a single JSON file on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<String>, LedgerError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Rename keeps readers from ever seeing a half-written file.
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// In-process storage, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: Mutex::new(false),
        }
    }

    /// Makes every subsequent `write` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        *self
            .fail_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = fail;
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl LedgerStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, LedgerError> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<(), LedgerError> {
        let fail = *self
            .fail_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if fail {
            return Err(LedgerError::WriteRejected(
                "memory storage is read-only".to_string(),
            ));
        }
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(contents.to_string());
        Ok(())
    }
}

impl<S: LedgerStorage + ?Sized> LedgerStorage for std::sync::Arc<S> {
    fn read(&self) -> Result<Option<String>, LedgerError> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> Result<(), LedgerError> {
        (**self).write(contents)
    }
}
