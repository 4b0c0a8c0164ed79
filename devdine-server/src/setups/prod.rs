//! Production server setup code

use crate::{
    db::{self, Pool},
    models::user::{UpsertOutcome, UserRecord},
    setups::{ServerSetup, StoreHealth, UserStore, VerificationCodeSender},
};
use anyhow::Result;
use async_trait::async_trait;
use devdine_core::email::Email;
use diesel_async::pooled_connection::{PoolableConnection, RecyclingMethod};

/// Production implementation of `ServerSetup`.
/// Persists users in the Postgres database configured in `settings.toml`.
/// Verification codes go out through [`LogCodeSender`], the demo delivery channel.
#[derive(Clone, Debug, Default)]
pub struct ProdSetup;

impl ServerSetup for ProdSetup {
    type UserStore = PgUserStore;
    type VerificationCodeSender = LogCodeSender;
}

/// A [`UserStore`] backed by the `users` table.
#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    /// Create a store on top of a connection pool
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn upsert(&self, name: &str, email: &Email) -> Result<UpsertOutcome> {
        let mut conn = db::connect(&self.pool).await?;
        Ok(UserRecord::upsert(&mut conn, name, email).await?)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        let mut conn = db::connect(&self.pool).await?;
        Ok(UserRecord::find_by_email(&mut conn, email).await?)
    }

    async fn health(&self) -> StoreHealth {
        let Ok(mut conn) = db::connect(&self.pool).await else {
            return StoreHealth {
                connected: false,
                up_to_date: None,
            };
        };

        let connected = conn.ping(&RecyclingMethod::Verified).await.is_ok();

        let up_to_date = match (
            db::schema_version(&mut conn).await,
            db::migrations::latest_version(),
        ) {
            (Ok(current), Ok(latest)) => Some(current == latest),
            _ => None,
        };

        StoreHealth {
            connected,
            up_to_date,
        }
    }
}

/// A `VerificationCodeSender` that doesn't actually send emails,
/// but hands the code to the log pipeline at debug level.
///
/// This is the demo delivery channel. Codes only show up in logs when
/// debug logging is enabled for `devdine_server`.
#[derive(Debug, Clone, Default)]
pub struct LogCodeSender;

#[async_trait]
impl VerificationCodeSender for LogCodeSender {
    async fn send_code(&self, email: &Email, code: &str) -> Result<()> {
        tracing::debug!(
            subject = "verification_code",
            category = "delivery",
            %email,
            code,
            "verification code issued"
        );
        Ok(())
    }
}
