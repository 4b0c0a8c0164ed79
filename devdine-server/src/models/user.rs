//! User Model
use crate::db::{schema::users, Conn};
use chrono::{NaiveDateTime, Utc};
use devdine_core::{common::UserResponse, email::Email};
use diesel::{
    pg::Pg, ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;

/// New User Struct (for creating new users)
#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    /// Display name
    pub name: &'a str,
    /// Normalized email address
    pub email: &'a str,
}

/// User Record
#[derive(Debug, Queryable, Selectable, Clone, PartialEq, Eq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct UserRecord {
    /// Internal Database Identifier
    pub id: i32,
    /// Display name
    pub name: String,
    /// Email address, unique across all users
    pub email: String,
    /// Inserted at timestamp
    pub created_at: NaiveDateTime,
    /// Updated at timestamp, unset until the first update
    pub updated_at: Option<NaiveDateTime>,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No user had this email yet
    Created {
        /// Identifier of the new record
        id: i32,
    },
    /// An existing user got a new name
    Updated {
        /// Identifier of the existing record
        id: i32,
    },
}

impl UpsertOutcome {
    /// Identifier of the affected record.
    pub fn id(&self) -> i32 {
        match self {
            UpsertOutcome::Created { id } | UpsertOutcome::Updated { id } => *id,
        }
    }

    /// Short label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            UpsertOutcome::Created { .. } => "created",
            UpsertOutcome::Updated { .. } => "updated",
        }
    }
}

impl UserRecord {
    /// Insert a user for `email`, or rename the existing one.
    ///
    /// The insert skips on a conflicting email instead of failing, so
    /// concurrent upserts for the same address end up with one record.
    pub async fn upsert(
        conn: &mut Conn<'_>,
        name: &str,
        email: &Email,
    ) -> Result<UpsertOutcome, diesel::result::Error> {
        let new_user = NewUser {
            name,
            email: email.as_str(),
        };

        tracing::debug!(?new_user, "Upserting user");

        let inserted = diesel::insert_into(users::table)
            .values(&new_user)
            .on_conflict(users::email)
            .do_nothing()
            .returning(UserRecord::as_returning())
            .get_result(conn)
            .await
            .optional()?;

        if let Some(user) = inserted {
            return Ok(UpsertOutcome::Created { id: user.id });
        }

        let updated = diesel::update(users::table.filter(users::email.eq(email.as_str())))
            .set((
                users::name.eq(name),
                users::updated_at.eq(Some(Utc::now().naive_utc())),
            ))
            .returning(UserRecord::as_returning())
            .get_result(conn)
            .await?;

        Ok(UpsertOutcome::Updated { id: updated.id })
    }

    /// Find a user by email address.
    pub async fn find_by_email(
        conn: &mut Conn<'_>,
        email: &Email,
    ) -> Result<Option<Self>, diesel::result::Error> {
        users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRecord::as_select())
            .first(conn)
            .await
            .optional()
    }
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
