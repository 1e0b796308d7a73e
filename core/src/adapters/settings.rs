//! Settings repository adapters.
//!
//! `JsonFileRepository` stores settings in `~/.portpilot/settings.json`;
//! `MemoryRepository` keeps them in process for tests and `--no-persist`.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{Error, Result};
use crate::ports::{SettingsMap, SettingsRepository};

/// Settings persisted as a flat JSON object.
pub struct JsonFileRepository {
    /// Path to the settings file.
    path: PathBuf,
}

impl JsonFileRepository {
    /// Create a repository at the default path.
    ///
    /// Default path: `~/.portpilot/settings.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            path: home.join(".portpilot").join("settings.json"),
        })
    }

    /// Create a repository with a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRepository for JsonFileRepository {
    /// Returns an empty map if the file doesn't exist or isn't a JSON object.
    async fn load(&self) -> Result<SettingsMap> {
        if !self.path.exists() {
            return Ok(SettingsMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        match serde_json::from_str::<SettingsMap>(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed settings file");
                Ok(SettingsMap::new())
            }
        }
    }

    async fn save(&self, values: &SettingsMap) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).await.map_err(|e| {
                    Error::Config(format!("Failed to create settings directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(values)?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp settings file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync settings: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename settings file: {}", e)))?;

        Ok(())
    }
}

/// In-process settings.
#[derive(Default)]
pub struct MemoryRepository {
    values: RwLock<SettingsMap>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from pre-seeded values.
    pub fn with_values(values: SettingsMap) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Current stored values.
    pub fn snapshot(&self) -> SettingsMap {
        self.values.read().clone()
    }
}

impl SettingsRepository for MemoryRepository {
    async fn load(&self) -> Result<SettingsMap> {
        Ok(self.values.read().clone())
    }

    async fn save(&self, values: &SettingsMap) -> Result<()> {
        *self.values.write() = values.clone();
        Ok(())
    }
}
