//! User directory: create, fetch and partially update `User` vertices.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{ProfileUpdate, User};
use crate::credential::hash_password;
use crate::error::{FollowGraphError, Result};
use crate::store::{GraphStore, Params, Record, Statement};

/// CRUD over user vertices.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn GraphStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Create a user with an empty bio and `created_at = now`.
    ///
    /// Uniqueness is enforced by the store in the same statement that
    /// creates the vertex, so concurrent registrations of one username
    /// yield exactly one success and `DuplicateUsername` for the rest.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User> {
        let params = Params::new()
            .with("username", username)
            .with("email", email)
            .with("password", hash_password(password)?)
            .with("name", name)
            .with("bio", "")
            .with("created_at", Utc::now());

        let rows = self.store.execute(Statement::CreateUser, &params)?;
        let user = first_user(&rows)?.ok_or_else(|| {
            FollowGraphError::MalformedRecord("create_user returned no rows".to_string())
        })?;

        info!(username = %user.username, "user created");
        Ok(user)
    }

    /// Exact-match lookup by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let rows = self
            .store
            .execute(Statement::MatchUser, &Params::new().with("username", username))?;
        first_user(&rows)
    }

    /// Apply only the fields present in `update`.
    ///
    /// Returns `None` when `update` is empty or the user does not exist.
    pub fn update_user(&self, username: &str, update: &ProfileUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            debug!(%username, "empty profile update, nothing to do");
            return Ok(None);
        }

        let params = Params::new()
            .with("username", username)
            .with("name", update.name.clone())
            .with("email", update.email.clone())
            .with("bio", update.bio.clone());

        let rows = self.store.execute(Statement::SetUserFields, &params)?;
        let user = first_user(&rows)?;
        if user.is_some() {
            info!(%username, "profile updated");
        }
        Ok(user)
    }
}

fn first_user(rows: &[Record]) -> Result<Option<User>> {
    match rows.first() {
        Some(row) => Ok(Some(User::from_record(row.get_record("u")?)?)),
        None => Ok(None),
    }
}
