//! Helpers for running isolated webserver instances
use crate::{
    app_state::{AppState, AppStateBuilder},
    router::setup_app_router,
    setups::test::{TestSetup, TestUserStore, TestVerificationCodeSender},
};
use axum::Router;

/// A devdine server router with in-memory side-effects
#[derive(Debug)]
pub struct TestContext {
    app: Router,
    app_state: AppState<TestSetup>,
}

impl TestContext {
    /// Create a new test context
    pub fn new() -> Self {
        Self::new_with_state(|builder| builder)
    }

    pub fn new_with_state<F>(f: F) -> Self
    where
        F: FnOnce(AppStateBuilder<TestSetup>) -> AppStateBuilder<TestSetup>,
    {
        let builder = AppStateBuilder::default()
            .with_user_store(TestUserStore::default())
            .with_verification_code_sender(TestVerificationCodeSender::default())
            .with_echo_codes(true);

        let app_state = f(builder).finalize().unwrap();

        let app = setup_app_router(app_state.clone());

        Self { app, app_state }
    }

    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn app_state(&self) -> &AppState<TestSetup> {
        &self.app_state
    }

    pub fn user_store(&self) -> &TestUserStore {
        &self.app_state.user_store
    }

    pub fn verification_code_sender(&self) -> &TestVerificationCodeSender {
        &self.app_state.verification_code_sender
    }
}
