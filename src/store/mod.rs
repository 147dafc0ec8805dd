//! Graph store adapter: the only owner of persisted vertex and edge state.
//!
//! The core talks to the store through [`GraphStore::execute`], passing a
//! [`Statement`] and its [`Params`] and receiving a list of [`Record`]s.
//! Every statement is a single atomic unit at the store: uniqueness of
//! usernames and "merge, don't duplicate" for follow edges are enforced
//! here, not by callers.
//!
//! A [`Session`] is opened per logical operation and released when it is
//! dropped, on every exit path.

pub mod bolt;
pub mod embedded;
pub mod persistence;
pub mod value;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::StoreConfig;

pub use bolt::BoltStore;
pub use embedded::EmbeddedStore;
pub use value::{Params, Record, Value};

/// Store-level constraints that a statement can violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// At most one user vertex per username.
    UniqueUsername,
    /// A follows edge must join two different users.
    NoSelfLoop,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::UniqueUsername => write!(f, "unique_username"),
            Constraint::NoSelfLoop => write!(f, "no_self_loop"),
        }
    }
}

/// Errors raised by the store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Session could not be opened or a request could not complete.
    #[error("{0}")]
    Unavailable(String),

    #[error("constraint {constraint} violated by '{value}'")]
    ConstraintViolation { constraint: Constraint, value: String },

    #[error("missing statement parameter: {0}")]
    MissingParameter(&'static str),

    #[error("missing record field: {0}")]
    MissingField(String),

    #[error("field '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A backend row could not be converted to a record.
    #[error("cannot decode column: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Query descriptors understood by every backend.
///
/// Each one matches a single pattern or performs a single mutation, and
/// runs atomically with respect to concurrent statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    /// `username, email, password, name, created_at` -> `[{u}]`.
    /// Fails with `UniqueUsername` if the username is taken.
    CreateUser,
    /// `username` -> `[{u}]` or `[]`.
    MatchUser,
    /// `username` plus optional `name, email, bio` -> `[{u}]` or `[]`.
    /// Null parameters leave the stored value unchanged.
    SetUserFields,
    /// `follower, followee` -> `[{follower_found, followee_found, created}]`.
    MergeFollows,
    /// `follower, followee` -> `[{follower_found, followee_found, deleted}]`.
    DeleteFollows,
    /// `username` -> `{direction, username, name}` per neighbour, where
    /// `direction` is `"follower"` (inbound) or `"following"` (outbound).
    MatchConnections,
    /// `usernames` -> `{owner, username, name}` per outbound edge of each owner.
    MatchFollowingOfEach,
    /// `username` -> `{hop, via, username, name}` for every one- and two-hop
    /// outbound path from the origin.
    ExpandTwoHops,
    /// -> `{follower, username, name}` per follows edge.
    MatchInboundFollows,
    /// -> `[{u}]` per user.
    ScanUsers,
}

impl Statement {
    /// Whether the statement mutates the graph.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Statement::CreateUser
                | Statement::SetUserFields
                | Statement::MergeFollows
                | Statement::DeleteFollows
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateUser => write!(f, "create_user"),
            Statement::MatchUser => write!(f, "match_user"),
            Statement::SetUserFields => write!(f, "set_user_fields"),
            Statement::MergeFollows => write!(f, "merge_follows"),
            Statement::DeleteFollows => write!(f, "delete_follows"),
            Statement::MatchConnections => write!(f, "match_connections"),
            Statement::MatchFollowingOfEach => write!(f, "match_following_of_each"),
            Statement::ExpandTwoHops => write!(f, "expand_two_hops"),
            Statement::MatchInboundFollows => write!(f, "match_inbound_follows"),
            Statement::ScanUsers => write!(f, "scan_users"),
        }
    }
}

/// A scoped connection to the store. Released on drop.
pub trait Session {
    fn run(&mut self, statement: Statement, params: &Params) -> StoreResult<Vec<Record>>;
}

/// A property-graph backend.
pub trait GraphStore: Send + Sync {
    /// Acquire a session for one logical operation.
    fn session(&self) -> StoreResult<Box<dyn Session + '_>>;

    /// Run a single statement in its own session.
    fn execute(&self, statement: Statement, params: &Params) -> StoreResult<Vec<Record>> {
        let mut session = self.session()?;
        debug!(%statement, "executing statement");
        session.run(statement, params)
    }
}

const DEFAULT_BOLT_USER: &str = "neo4j";

fn is_bolt_uri(uri: &str) -> bool {
    ["bolt://", "bolt+s://", "neo4j://", "neo4j+s://"]
        .iter()
        .any(|scheme| uri.starts_with(scheme))
}

/// Open the backend named by `config.uri`.
///
/// - `memory://` keeps the graph in process.
/// - `file://<path>` keeps a snapshot at `<path>`, loaded now and written
///   through after every mutation.
/// - `bolt://`, `neo4j://` (and their `+s` variants) connect to a server
///   with `config.user` (default `neo4j`) and `config.password`.
pub fn open(config: &StoreConfig) -> StoreResult<Arc<dyn GraphStore>> {
    let uri = config.uri.trim();
    if uri == "memory://" || uri == "memory" {
        info!("opening in-memory store");
        return Ok(Arc::new(EmbeddedStore::in_memory()));
    }
    if let Some(path) = uri.strip_prefix("file://") {
        if path.is_empty() {
            return Err(StoreError::Unavailable(format!(
                "store uri has no path: {}",
                uri
            )));
        }
        let path = PathBuf::from(path);
        info!(path = %path.display(), "opening snapshot store");
        return Ok(Arc::new(EmbeddedStore::open_file(path)?));
    }

    if is_bolt_uri(uri) {
        let user = config.user.as_deref().unwrap_or(DEFAULT_BOLT_USER);
        let password = config.password.as_deref().unwrap_or_default();
        info!(%uri, %user, "opening bolt store");
        return Ok(Arc::new(BoltStore::connect(uri, user, password)?));
    }
    if config.user.is_some() || config.password.is_some() {
        debug!("store credentials are only used by bolt stores");
    }

    Err(StoreError::Unavailable(format!(
        "unsupported store uri: {}",
        uri
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(uri: &str) -> StoreConfig {
        StoreConfig {
            uri: uri.to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_open_memory() {
        let store = open(&config("memory://")).unwrap();
        let rows = store.execute(Statement::ScanUsers, &Params::new()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_open_file_creates_parent_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.bin");
        let uri = format!("file://{}", path.display());
        let store = open(&config(&uri)).unwrap();

        store
            .execute(
                Statement::CreateUser,
                &Params::new()
                    .with("username", "alice")
                    .with("email", "alice@example.com")
                    .with("password", "x")
                    .with("name", "Alice")
                    .with("created_at", chrono::Utc::now()),
            )
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_unsupported_scheme() {
        let result = open(&config("redis://localhost:6379"));
        assert!(matches!(result, Err(StoreError::Unavailable(ref m)) if m.contains("unsupported")));
    }

    #[test]
    fn test_open_file_without_path() {
        assert!(matches!(
            open(&config("file://")),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_bolt_schemes() {
        assert!(is_bolt_uri("bolt://localhost:7687"));
        assert!(is_bolt_uri("neo4j+s://db.example.com"));
        assert!(!is_bolt_uri("file://bolt://x"));
        assert!(!is_bolt_uri("memory://"));
    }

    #[test]
    fn test_write_statements() {
        assert!(Statement::MergeFollows.is_write());
        assert!(Statement::CreateUser.is_write());
        assert!(!Statement::ExpandTwoHops.is_write());
        assert!(!Statement::ScanUsers.is_write());
    }
}
