//! Soft per-installation identity.
//!
//! Preferences, favorites and the activity log are keyed by a random id kept
//! in local storage. It only separates installations from each other; it is
//! not an authentication mechanism.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::storage::StoragePort;

/// Storage key holding the user id.
pub const USER_ID_KEY: &str = "streetgasm_user_id";

const USER_ID_PREFIX: &str = "user_";
const USER_ID_RANDOM_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Soft user id, `user_` followed by nine base-36 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Read the stored id, or generate and persist a fresh one.
    ///
    /// A failed write still returns the fresh id; the next run simply gets
    /// another one.
    pub fn load_or_create(storage: &dyn StoragePort) -> Self {
        if let Some(existing) = storage.get(USER_ID_KEY).filter(|v| !v.trim().is_empty()) {
            return Self(existing);
        }

        let fresh = Self::generate();
        if let Err(e) = storage.set(USER_ID_KEY, fresh.as_str()) {
            tracing::warn!(error = %e, "Failed to persist user id");
        }
        fresh
    }

    /// Generate a new random id without persisting it.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..USER_ID_RANDOM_LEN)
            .map(|_| {
                let idx = rng.random_range(0..BASE36.len());
                char::from(BASE36.get(idx).copied().unwrap_or(b'0'))
            })
            .collect();
        Self(format!("{USER_ID_PREFIX}{suffix}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
