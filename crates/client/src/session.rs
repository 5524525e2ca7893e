//! Signed-in user and bearer token, mirrored to durable storage.
//!
//! The session is either anonymous or authenticated; `is_logged_in` holds
//! only when both a token and a user are present. Nothing here expires on a
//! timer: the session ends on logout or when the API answers 401.

use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use talent_ops_core::{AccountRole, User};

use crate::storage::{ClientStorage, StorageError, keys};

#[derive(Default)]
struct SessionState {
    token: Option<SecretString>,
    user: Option<User>,
}

/// In-memory session state backed by [`ClientStorage`].
pub struct SessionStore {
    storage: Arc<dyn ClientStorage>,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("SessionStore")
            .field("token", &state.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &state.user.as_ref().map(|user| &user.username))
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Restore the session from storage.
    ///
    /// A stored user that no longer parses is logged and ignored; the token
    /// is kept, so the session reads as logged out until a profile fetch or
    /// a new login.
    pub fn restore(storage: Arc<dyn ClientStorage>) -> Self {
        let token = match storage.get(keys::TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()).map(SecretString::from),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        let user = match storage.get(keys::USER) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse stored user data");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored user");
                None
            }
        };

        tracing::debug!(
            has_token = token.is_some(),
            user = user.as_ref().map(|u| u.username.as_str()),
            "Session restored"
        );

        Self {
            storage,
            state: RwLock::new(SessionState { token, user }),
        }
    }

    /// Start an authenticated session. Storage is written first; memory only
    /// changes once both keys are persisted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either key cannot be written. The in-memory
    /// session is left unchanged and a token already written is removed.
    pub fn establish(&self, token: SecretString, user: User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&user)?;
        self.storage.set(keys::TOKEN, token.expose_secret())?;
        if let Err(e) = self.storage.set(keys::USER, &user_json) {
            // A token without a user must not survive into the next start.
            if let Err(rollback) = self.storage.remove(keys::TOKEN) {
                tracing::error!(error = %rollback, "Failed to roll back stored token");
            }
            return Err(e);
        }

        let mut state = self.state.write();
        state.token = Some(token);
        state.user = Some(user);
        Ok(())
    }

    /// Replace the stored user, keeping the token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be persisted.
    pub fn set_user(&self, user: User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&user)?;
        self.storage.set(keys::USER, &user_json)?;
        self.state.write().user = Some(user);
        Ok(())
    }

    /// End the session. Memory is always cleared; storage failures are
    /// logged and reported after the fact. Safe to call when anonymous.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` hit while removing the keys.
    pub fn clear(&self) -> Result<(), StorageError> {
        {
            let mut state = self.state.write();
            state.token = None;
            state.user = None;
        }

        let mut first_error = None;
        for key in [keys::TOKEN, keys::USER] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear session key");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Tear the session down after the API rejected the token.
    pub fn expire(&self) {
        let was_logged_in = self.is_logged_in();
        // Failures are already logged by `clear`.
        let _ = self.clear();
        tracing::info!(was_logged_in, "Session expired");
    }

    pub fn token(&self) -> Option<SecretString> {
        self.state.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        let state = self.state.read();
        state
            .token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
            && state.user.is_some()
    }

    /// Account role of the signed-in user.
    pub fn role(&self) -> Option<AccountRole> {
        self.state.read().user.as_ref().map(|user| user.role.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(AccountRole::Admin)
    }

    pub fn is_hr(&self) -> bool {
        self.role() == Some(AccountRole::Hr)
    }

    pub fn is_candidate(&self) -> bool {
        self.role() == Some(AccountRole::Candidate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn user(role: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "username": "alice",
            "email": "alice@example.com",
            "role": role,
            "status": "active"
        }))
        .unwrap()
    }

    /// Memory storage whose writes to one key fail.
    struct FailingKey {
        inner: MemoryStorage,
        key: &'static str,
    }

    impl ClientStorage for FailingKey {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.key {
                return Err(StorageError::Io {
                    path: "storage.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_anonymous_by_default() {
        let session = SessionStore::restore(Arc::new(MemoryStorage::new()));
        assert!(!session.is_logged_in());
        assert!(session.role().is_none());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_establish_and_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionStore::restore(storage.clone());

        session
            .establish(SecretString::from("tok-1"), user("hr"))
            .unwrap();
        assert!(session.is_logged_in());
        assert!(session.is_hr());
        assert_eq!(session.token().unwrap().expose_secret(), "tok-1");
        assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("tok-1"));
        assert!(storage.get(keys::USER).unwrap().is_some());

        session.clear().unwrap();
        session.clear().unwrap();
        assert!(!session.is_logged_in());
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::USER).unwrap(), None);
    }

    #[test]
    fn test_restore_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        SessionStore::restore(storage.clone())
            .establish(SecretString::from("tok-2"), user("candidate"))
            .unwrap();

        let restored = SessionStore::restore(storage);
        assert!(restored.is_logged_in());
        assert!(restored.is_candidate());
    }

    #[test]
    fn test_corrupt_user_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::TOKEN, "tok-3").unwrap();
        storage.set(keys::USER, "{not json").unwrap();

        let session = SessionStore::restore(storage);
        assert!(session.token().is_some());
        assert!(session.user().is_none());
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = SessionStore::restore(Arc::new(MemoryStorage::new()));
        session
            .establish(SecretString::from("super-secret"), user("admin"))
            .unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_failed_user_write_rolls_back_token() {
        let storage = Arc::new(FailingKey {
            inner: MemoryStorage::new(),
            key: keys::USER,
        });
        let session = SessionStore::restore(storage.clone());

        let result = session.establish(SecretString::from("tok"), user("hr"));

        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert!(!session.is_logged_in());
        assert!(session.token().is_none());
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert!(SessionStore::restore(storage).token().is_none());
    }

    #[test]
    fn test_empty_token_is_not_logged_in() {
        let session = SessionStore::restore(Arc::new(MemoryStorage::new()));
        session.establish(SecretString::from(""), user("hr")).unwrap();
        assert!(!session.is_logged_in());
    }
}
