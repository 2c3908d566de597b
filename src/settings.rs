use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// User-facing preferences that must survive a restart. Currently a single
/// toggle: whether the proximity monitor should be running.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Settings {
    pub monitor_enabled: bool,
}

/// JSON-file-backed settings store. With no path configured (tests) the
/// store is memory-only.
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    pub fn open(path: Option<PathBuf>) -> Self {
        let current = match &path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(settings) => settings,
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            path = %path.display(),
                            "ignoring corrupt settings file"
                        );
                        Settings::default()
                    }
                },
                Err(_) => Settings::default(),
            },
            None => Settings::default(),
        };

        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn current(&self) -> Settings {
        *self.current.read().expect("settings lock poisoned")
    }

    pub async fn update(&self, settings: Settings) -> Result<(), AppError> {
        *self.current.write().expect("settings lock poisoned") = settings;

        if let Some(path) = &self.path {
            let raw = serde_json::to_string_pretty(&settings)
                .map_err(|err| AppError::Internal(format!("failed to encode settings: {err}")))?;
            tokio::fs::write(path, raw).await.map_err(|err| {
                AppError::Internal(format!(
                    "failed to write settings {}: {err}",
                    path.display()
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Settings, SettingsStore};

    #[tokio::test]
    async fn toggle_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(Some(path.clone()));
        assert!(!store.current().monitor_enabled);

        store
            .update(Settings {
                monitor_enabled: true,
            })
            .await
            .unwrap();

        let reopened = SettingsStore::open(Some(path));
        assert!(reopened.current().monitor_enabled);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SettingsStore::open(Some(path));
        assert!(!store.current().monitor_enabled);
    }

    #[test]
    fn missing_path_is_memory_only() {
        let store = SettingsStore::open(None);
        assert!(!store.current().monitor_enabled);
    }
}
