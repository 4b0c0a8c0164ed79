//! Server setup for local development & running without a database

use super::{prod::LogCodeSender, ServerSetup, StoreHealth, UserStore};
use crate::models::user::{UpsertOutcome, UserRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use devdine_core::email::Email;
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

/// Implementation of `ServerSetup` for local environments.
/// Users only live as long as the process does.
#[derive(Debug, Clone)]
pub struct LocalSetup;

impl ServerSetup for LocalSetup {
    type UserStore = MemoryUserStore;
    type VerificationCodeSender = LogCodeSender;
}

/// A [`UserStore`] keeping users in a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<MemoryUsers>,
}

#[derive(Debug, Default)]
struct MemoryUsers {
    users: DashMap<Email, UserRecord>,
    last_id: AtomicI32,
}

impl MemoryUserStore {
    /// Number of stored users
    pub fn len(&self) -> usize {
        self.inner.users.len()
    }

    /// Whether no user is stored
    pub fn is_empty(&self) -> bool {
        self.inner.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert(&self, name: &str, email: &Email) -> Result<UpsertOutcome> {
        let now = Utc::now().naive_utc();

        let outcome = match self.inner.users.entry(email.clone()) {
            Entry::Occupied(mut entry) => {
                let user = entry.get_mut();
                user.name = name.to_string();
                user.updated_at = Some(now);
                UpsertOutcome::Updated { id: user.id }
            }
            Entry::Vacant(entry) => {
                let id = self.inner.last_id.fetch_add(1, Ordering::Relaxed) + 1;
                entry.insert(UserRecord {
                    id,
                    name: name.to_string(),
                    email: email.to_string(),
                    created_at: now,
                    updated_at: None,
                });
                UpsertOutcome::Created { id }
            }
        };

        Ok(outcome)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        Ok(self.inner.users.get(email).map(|user| user.clone()))
    }

    async fn health(&self) -> StoreHealth {
        StoreHealth {
            connected: true,
            up_to_date: None,
        }
    }
}
