//! This abstracts devdine server side-effects into "setups".
//!
//! This module defines the traits, submodules define production, local
//! & test collections of implementations.
use crate::models::user::{UpsertOutcome, UserRecord};
use anyhow::Result;
use async_trait::async_trait;
use devdine_core::email::Email;

pub mod local;
pub mod prod;

/// This trait groups type parameters to the server's `AppState` struct.
///
/// It captures the setup of the server, distinguishing between e.g.
/// unit testing & production setups.
pub trait ServerSetup: Clone + Send + Sync + 'static {
    /// Where users are persisted
    type UserStore: UserStore;
    /// Which implementation to use to send verification codes
    type VerificationCodeSender: VerificationCodeSender;
}

/// Persistence for user records.
/// Abstracted away, so you can plug in Postgres or an in-memory store.
#[async_trait]
pub trait UserStore: Clone + Send + Sync + 'static {
    /// Create the user for `email`, or rename the existing one.
    async fn upsert(&self, name: &str, email: &Email) -> Result<UpsertOutcome>;

    /// Look a user up by email address.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>>;

    /// Report whether the store is reachable and migrated.
    async fn health(&self) -> StoreHealth;
}

/// Diagnostic information about a [`UserStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHealth {
    /// Whether a connection could be made
    pub connected: bool,
    /// Whether all migrations are applied. `None` if it can't be told.
    pub up_to_date: Option<bool>,
}

/// The service that sends account verification codes
#[async_trait]
pub trait VerificationCodeSender: Clone + Send + Sync + 'static {
    /// Send the code associated with the email
    async fn send_code(&self, email: &Email, code: &str) -> Result<()>;
}
