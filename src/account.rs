//! Accounts: registration, login and the signed-in user's profile.
//!
//! The signed-in user is an explicit [`Account`] value owned by the caller.
//! It is a snapshot of the stored user and may go stale; [`Account::refresh`]
//! re-reads it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::credential::verify_password;
use crate::error::{FollowGraphError, Result};
use crate::graph::{FollowGraph, ProfileUpdate, User, UserDirectory};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("email pattern is valid"));

/// Whether `email` looks like `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Registration input. Every field is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// A signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    user: User,
}

impl Account {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    /// Re-read the stored user.
    pub fn refresh(&mut self, accounts: &Accounts) -> Result<()> {
        self.user = accounts
            .users
            .get_user_by_username(&self.user.username)?
            .ok_or_else(|| FollowGraphError::UserNotFound(self.user.username.clone()))?;
        Ok(())
    }
}

/// Validation and authentication on top of the user directory.
#[derive(Clone)]
pub struct Accounts {
    users: UserDirectory,
}

impl Accounts {
    pub fn new(graph: &FollowGraph) -> Self {
        Self {
            users: graph.users(),
        }
    }

    /// Validate `form` and create the user.
    ///
    /// There is no pre-check for the username: the store rejects
    /// duplicates with `DuplicateUsername`.
    pub fn register(&self, form: &RegistrationForm) -> Result<User> {
        let username = form.username.trim();
        let email = form.email.trim();
        let name = form.name.trim();
        let password = form.password.trim();

        if [username, email, name, password].iter().any(|f| f.is_empty()) {
            return Err(FollowGraphError::InvalidArgument(
                "all fields are required".to_string(),
            ));
        }
        if !is_valid_email(email) {
            return Err(FollowGraphError::InvalidArgument(format!(
                "invalid email format: {}",
                email
            )));
        }

        self.users.create_user(username, email, password, name)
    }

    /// Authenticate `username` with `secret`.
    pub fn login(&self, username: &str, secret: &str) -> Result<Account> {
        let username = username.trim();
        let user = self
            .users
            .get_user_by_username(username)?
            .ok_or_else(|| FollowGraphError::UserNotFound(username.to_string()))?;

        if !verify_password(secret.trim(), &user.password_hash) {
            warn!(%username, "login rejected");
            return Err(FollowGraphError::InvalidCredentials);
        }

        info!(%username, "login");
        Ok(Account { user })
    }

    /// Apply `update` to the signed-in user and refresh the snapshot.
    pub fn edit_profile(&self, account: &mut Account, update: &ProfileUpdate) -> Result<User> {
        if let Some(email) = &update.email {
            if !is_valid_email(email) {
                return Err(FollowGraphError::InvalidArgument(format!(
                    "invalid email format: {}",
                    email
                )));
            }
        }
        if update.is_empty() {
            return Err(FollowGraphError::InvalidArgument(
                "nothing to update".to_string(),
            ));
        }

        self.users
            .update_user(account.username(), update)?
            .ok_or_else(|| FollowGraphError::UserNotFound(account.username().to_string()))?;
        account.refresh(self)?;
        debug!(username = %account.username(), "account refreshed");
        Ok(account.user.clone())
    }
}

/// Clamp a requested most-followed count to `[1, max]`.
///
/// Values above `max` become `max`; values below 1 are rejected.
pub fn clamp_top_limit(requested: i64, max: usize) -> Result<usize> {
    if requested < 1 {
        return Err(FollowGraphError::InvalidArgument(
            "limit must be greater than 0".to_string(),
        ));
    }
    Ok(usize::try_from(requested).map_or(max, |n| n.min(max)))
}
