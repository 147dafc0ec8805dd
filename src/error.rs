//! Error types for followgraph.

use thiserror::Error;

use crate::store::{Constraint, StoreError};

/// Errors returned by the follow-graph operations.
///
/// Idempotent no-ops (`AlreadyFollowing`, `NotFollowing`) are not errors;
/// they are reported through [`FollowOutcome`](crate::FollowOutcome) and
/// [`UnfollowOutcome`](crate::UnfollowOutcome).
#[derive(Error, Debug)]
pub enum FollowGraphError {
    /// The backing store could not be reached or failed mid-request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A user with this username already exists.
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    /// No user with this username exists.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A user tried to follow or unfollow themselves.
    #[error("cannot follow or unfollow yourself: {0}")]
    SelfFollow(String),

    /// Caller input was rejected before reaching the store.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Username exists but the secret does not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The store returned a record the core could not decode.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A secret could not be hashed.
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl From<StoreError> for FollowGraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation {
                constraint: Constraint::UniqueUsername,
                value,
            } => FollowGraphError::DuplicateUsername(value),
            StoreError::ConstraintViolation {
                constraint: Constraint::NoSelfLoop,
                value,
            } => FollowGraphError::SelfFollow(value),
            StoreError::MissingParameter(_)
            | StoreError::MissingField(_)
            | StoreError::Decode(_)
            | StoreError::TypeMismatch { .. } => {
                FollowGraphError::MalformedRecord(err.to_string())
            }
            other => FollowGraphError::StoreUnavailable(other),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FollowGraphError>;
