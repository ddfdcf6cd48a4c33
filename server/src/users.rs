//! The persisted user store backing registration and login.
//!
//! Records live in a JSON array of `{"username", "password"}` objects,
//! where the password field holds a bcrypt digest, never the cleartext.
//! The whole file is rewritten on every registration so a crash never
//! leaves a half-applied append.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One registered user. Read-only after creation apart from the
/// uniqueness check on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(rename = "password")]
    pub password_digest: String,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Ok,
    UsernameTaken,
}

/// Result of a credential check. Wire codes 0, 1 and 2 respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Ok,
    UnknownUser,
    BadPassword,
}

impl LoginOutcome {
    pub fn code(self) -> u8 {
        match self {
            LoginOutcome::Ok => 0,
            LoginOutcome::UnknownUser => 1,
            LoginOutcome::BadPassword => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is not in a valid JSON format")]
    InvalidJson(String),
    #[error("failed to access user store {0}: {1}")]
    Io(String, std::io::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug)]
pub struct UserStore {
    path: PathBuf,
    users: Vec<UserRecord>,
    cost: u32,
}

impl UserStore {
    /// Loads the store at `path`, creating an empty one if the file
    /// does not exist yet. Invalid JSON is a startup error.
    pub fn load(path: &Path) -> Result<UserStore, StoreError> {
        Self::load_with_cost(path, bcrypt::DEFAULT_COST)
    }

    pub(crate) fn load_with_cost(path: &Path, cost: u32) -> Result<UserStore, StoreError> {
        let mut store = UserStore {
            path: path.to_path_buf(),
            users: Vec::new(),
            cost,
        };
        if !path.exists() {
            store.save();
            return Ok(store);
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Io(path.display().to_string(), e))?;
        store.users = serde_json::from_str(&text)
            .map_err(|_| StoreError::InvalidJson(path.display().to_string()))?;
        Ok(store)
    }

    /// A store hashing at the given bcrypt cost; unit and integration
    /// tests use the minimum cost to stay fast.
    pub fn load_with_low_cost(path: &Path) -> Result<UserStore, StoreError> {
        Self::load_with_cost(path, 4)
    }

    /// Registers a new user. Usernames are compared case-sensitively,
    /// exact match only. On success the digest is appended and the
    /// store is persisted immediately.
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<RegisterOutcome, StoreError> {
        if self.users.iter().any(|user| user.username == username) {
            return Ok(RegisterOutcome::UsernameTaken);
        }
        let digest = bcrypt::hash(password, self.cost)?;
        self.users.push(UserRecord {
            username: username.to_string(),
            password_digest: digest,
        });
        self.save();
        info!("Registered user '{}'", username);
        Ok(RegisterOutcome::Ok)
    }

    /// Checks `password` against the stored digest for `username`.
    pub fn verify(&self, username: &str, password: &str) -> LoginOutcome {
        match self.users.iter().find(|user| user.username == username) {
            None => LoginOutcome::UnknownUser,
            Some(user) => {
                // A corrupt digest fails closed as a bad password
                if bcrypt::verify(password, &user.password_digest).unwrap_or(false) {
                    LoginOutcome::Ok
                } else {
                    LoginOutcome::BadPassword
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Rewrites the backing file in full. A write failure loses the
    /// newest record on restart but must not take the server down, so
    /// it is logged and swallowed.
    fn save(&self) {
        let text = match serde_json::to_string_pretty(&self.users) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize user store: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, text) {
            warn!("Failed to save user store {}: {}", self.path.display(), e);
        }
    }
}
