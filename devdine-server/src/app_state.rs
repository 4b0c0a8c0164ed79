//! The Axum Application State

use crate::{models::otp::OtpStore, setups::ServerSetup};
use anyhow::{anyhow, Result};
use devdine_core::email::EmailPolicy;
use std::sync::Arc;

#[derive(Clone)]
/// Global application route state.
pub struct AppState<S: ServerSetup> {
    /// Where users are persisted
    pub user_store: S::UserStore,
    /// The service that sends account verification codes
    pub verification_code_sender: S::VerificationCodeSender,
    /// Pending verification codes
    pub otp_store: Arc<OtpStore>,
    /// Which email addresses are accepted
    pub email_policy: Arc<EmailPolicy>,
    /// Whether issued codes are returned in the response body
    pub echo_codes: bool,
}

/// Builder for [`AppState`]
#[derive(Debug)]
pub struct AppStateBuilder<S: ServerSetup> {
    user_store: Option<S::UserStore>,
    verification_code_sender: Option<S::VerificationCodeSender>,
    otp_store: Option<OtpStore>,
    email_policy: EmailPolicy,
    echo_codes: bool,
}

impl<S: ServerSetup> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self {
            user_store: None,
            verification_code_sender: None,
            otp_store: None,
            email_policy: EmailPolicy::default(),
            echo_codes: false,
        }
    }
}

impl<S: ServerSetup> AppStateBuilder<S> {
    /// Finalize the builder and return the [`AppState`]
    pub fn finalize(self) -> Result<AppState<S>> {
        let user_store = self
            .user_store
            .ok_or_else(|| anyhow!("user_store is required"))?;

        let verification_code_sender = self
            .verification_code_sender
            .ok_or_else(|| anyhow!("verification_code_sender is required"))?;

        let otp_store = self.otp_store.unwrap_or_default();

        Ok(AppState {
            user_store,
            verification_code_sender,
            otp_store: Arc::new(otp_store),
            email_policy: Arc::new(self.email_policy),
            echo_codes: self.echo_codes,
        })
    }

    /// Set the user store
    pub fn with_user_store(mut self, user_store: S::UserStore) -> Self {
        self.user_store = Some(user_store);
        self
    }

    /// Set the service that sends account verification codes
    pub fn with_verification_code_sender(
        mut self,
        verification_code_sender: S::VerificationCodeSender,
    ) -> Self {
        self.verification_code_sender = Some(verification_code_sender);
        self
    }

    /// Set the store for pending verification codes
    pub fn with_otp_store(mut self, otp_store: OtpStore) -> Self {
        self.otp_store = Some(otp_store);
        self
    }

    /// Set which email addresses are accepted
    pub fn with_email_policy(mut self, email_policy: EmailPolicy) -> Self {
        self.email_policy = email_policy;
        self
    }

    /// Set whether issued codes are returned in the response body
    pub fn with_echo_codes(mut self, echo_codes: bool) -> Self {
        self.echo_codes = echo_codes;
        self
    }
}

impl<S> std::fmt::Debug for AppState<S>
where
    S: ServerSetup,
    S::UserStore: std::fmt::Debug,
    S::VerificationCodeSender: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("user_store", &self.user_store)
            .field("verification_code_sender", &self.verification_code_sender)
            .field("pending_codes", &self.otp_store.len())
            .field("email_policy", &self.email_policy)
            .field("echo_codes", &self.echo_codes)
            .finish()
    }
}
