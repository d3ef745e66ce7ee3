// crates/roulette-client/src/session.rs

//! Identity persistence.
//!
//! The server hands out an identity token in `welcome`. Keeping it in a
//! small TOML file lets the next run send `reconnect` and pick up the
//! same balance, as long as the server's grace period has not expired.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("session file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize session: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub identity: Option<String>,
    /// Name as typed by the user, without the server's `#xxxx` suffix.
    pub name: Option<String>,
}

/// Read the session file. A missing file is an empty session.
pub fn load(path: &Path) -> Result<SavedSession, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(SavedSession::default()),
        Err(err) => Err(err.into()),
    }
}

pub fn save(path: &Path, session: &SavedSession) -> Result<(), SessionError> {
    let text = toml::to_string(session)?;
    std::fs::write(path, text)?;
    Ok(())
}
