//! # followgraph
//!
//! A social follow graph: users, directed "follows" edges, and the queries
//! that walk them.
//!
//! ## Key Features
//!
//! - **Atomic**: uniqueness and idempotent follow are enforced by the store
//! - **Persistent**: `file://` stores survive restarts and can be shared
//!   between processes; `bolt://` stores live on a graph server
//! - **Recommendations**: friend-of-friend suggestions ranked by mutual count
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use followgraph::FollowGraph;
//!
//! let graph = FollowGraph::in_memory();
//! graph.users().create_user("alice", "alice@example.com", "pw", "Alice")?;
//! graph.users().create_user("bob", "bob@example.com", "pw", "Bob")?;
//! graph.relationships().follow("alice", "bob")?;
//!
//! let top = graph.ranking().most_followed(10)?;
//! assert_eq!(top[0].username, "bob");
//! # Ok::<(), followgraph::FollowGraphError>(())
//! ```

pub mod account;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod graph;
pub mod store;

// Re-exports for convenience
pub use error::{FollowGraphError, Result};

pub use account::{clamp_top_limit, Account, Accounts, RegistrationForm};
pub use config::{FollowGraphConfig, QueryLimits, StoreConfig};
pub use graph::{
    Connections, FollowGraph, FollowOutcome, PopularityRow, ProfileUpdate, Ranking,
    RecommendationRow, RelationshipEngine, UnfollowOutcome, User, UserDirectory, UserSummary,
};
pub use store::{BoltStore, EmbeddedStore, GraphStore, Statement, StoreError};
