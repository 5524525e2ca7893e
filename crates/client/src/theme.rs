//! Persisted theme preference.

use std::sync::Arc;

use parking_lot::RwLock;
use talent_ops_core::{Theme, ThemeMode};

use crate::storage::{ClientStorage, StorageError, keys};

pub struct ThemeStore {
    mode: RwLock<ThemeMode>,
    storage: Arc<dyn ClientStorage>,
}

impl std::fmt::Debug for ThemeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeStore")
            .field("mode", &*self.mode.read())
            .finish_non_exhaustive()
    }
}

impl ThemeStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            mode: RwLock::new(ThemeMode::default()),
            storage,
        }
    }

    /// Load the saved mode. Unknown saved values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read.
    pub fn init(&self) -> Result<ThemeMode, StorageError> {
        if let Some(saved) = self.storage.get(keys::THEME_MODE)? {
            match saved.parse::<ThemeMode>() {
                Ok(mode) => *self.mode.write() = mode,
                Err(e) => tracing::warn!(error = %e, "Ignoring saved theme mode"),
            }
        }
        Ok(self.mode())
    }

    pub fn mode(&self) -> ThemeMode {
        *self.mode.read()
    }

    /// The theme to apply right now.
    pub fn theme(&self, system_prefers_dark: bool) -> Theme {
        self.mode().resolve(system_prefers_dark)
    }

    /// Change and persist the mode.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the mode cannot be persisted; the new mode
    /// applies in memory regardless.
    pub fn set_mode(&self, mode: ThemeMode) -> Result<(), StorageError> {
        *self.mode.write() = mode;
        self.storage.set(keys::THEME_MODE, mode.as_str())
    }

    /// Switch to the explicit mode opposite to the applied theme.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_mode`].
    pub fn toggle(&self, system_prefers_dark: bool) -> Result<ThemeMode, StorageError> {
        let next = self.mode().toggled(system_prefers_dark);
        self.set_mode(next)?;
        Ok(next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_defaults_to_system() {
        let store = ThemeStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.init().unwrap(), ThemeMode::System);
        assert_eq!(store.theme(true), Theme::Dark);
    }

    #[test]
    fn test_invalid_saved_mode_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::THEME_MODE, "sepia").unwrap();
        let store = ThemeStore::new(storage);
        assert_eq!(store.init().unwrap(), ThemeMode::System);
    }

    #[test]
    fn test_toggle_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ThemeStore::new(storage.clone());
        assert_eq!(store.toggle(false).unwrap(), ThemeMode::Dark);
        assert_eq!(storage.get(keys::THEME_MODE).unwrap().as_deref(), Some("dark"));

        let reloaded = ThemeStore::new(storage);
        assert_eq!(reloaded.init().unwrap(), ThemeMode::Dark);
    }
}
