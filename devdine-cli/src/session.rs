//! The customer's progress through the ordering flow, kept between runs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use devdine_core::{common::OrderType, email::Email};
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::Path};

/// Everything the client remembers about the current customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSessionState {
    /// Display name as entered
    pub name: String,
    /// Normalized email address
    pub email: Email,
    /// Whether the email address passed verification
    pub verified: bool,
    /// When it passed verification
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    /// Chosen order type, once picked
    #[serde(default)]
    pub order_type: Option<OrderType>,
}

impl ClientSessionState {
    /// A fresh, unverified session.
    pub fn new(name: impl Into<String>, email: Email) -> Self {
        Self {
            name: name.into(),
            email,
            verified: false,
            verified_at: None,
            order_type: None,
        }
    }

    /// Record a successful verification at `now`.
    pub fn mark_verified(&mut self, now: DateTime<Utc>) {
        self.verified = true;
        self.verified_at = Some(now);
    }

    /// Read the session at `path`. A missing file means there is no session.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Reading session from {}", path.display()))
            }
        };

        let state = serde_json::from_str(&contents)
            .with_context(|| format!("Parsing session from {}", path.display()))?;

        Ok(Some(state))
    }

    /// Write the session to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating directory {}", parent.display()))?;
        }

        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Writing session to {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Saved session");

        Ok(())
    }

    /// Remove the session at `path`. Returns whether there was one.
    pub fn clear(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("Removing session at {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::{prelude::*, TempDir};
    use testresult::TestResult;

    #[test]
    fn test_missing_session() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.child("session.json");

        assert_eq!(ClientSessionState::load(path.path())?, None);
        assert!(!ClientSessionState::clear(path.path())?);

        Ok(())
    }

    #[test]
    fn test_save_load_clear() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.child("nested").child("session.json");

        let mut state = ClientSessionState::new("Alice", "alice@example.com".parse()?);
        state.mark_verified(Utc::now());
        state.order_type = Some(OrderType::TakeHome);
        state.save(path.path())?;

        path.assert(predicates::str::contains("\"take-home\""));
        assert_eq!(ClientSessionState::load(path.path())?, Some(state));

        assert!(ClientSessionState::clear(path.path())?);
        path.assert(predicates::path::missing());

        Ok(())
    }

    #[test]
    fn test_corrupt_session() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.child("session.json");
        path.write_str("{ not json")?;

        assert!(ClientSessionState::load(path.path()).is_err());

        Ok(())
    }

    #[test]
    fn test_session_with_invalid_email() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.child("session.json");
        path.write_str(r#"{ "name": "Alice", "email": "ALICE@x", "verified": true }"#)?;

        assert!(ClientSessionState::load(path.path()).is_err());

        Ok(())
    }

    #[test]
    fn test_older_session_without_order_type() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.child("session.json");
        path.write_str(r#"{ "name": "Bob", "email": "bob@example.com", "verified": false }"#)?;

        let state = ClientSessionState::load(path.path())?.ok_or("no session")?;
        assert_eq!(state.order_type, None);
        assert_eq!(state.verified_at, None);

        Ok(())
    }
}
