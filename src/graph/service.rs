//! `FollowGraph`: one shared store handle plus the components built on it.

use std::sync::Arc;
use tracing::info;

use super::directory::UserDirectory;
use super::ranking::Ranking;
use super::relationships::RelationshipEngine;
use crate::config::{FollowGraphConfig, QueryLimits};
use crate::error::Result;
use crate::store::{self, EmbeddedStore, GraphStore};

/// Entry point for the follow-graph operations.
///
/// Cheap to clone; every clone shares the same store.
#[derive(Clone)]
pub struct FollowGraph {
    store: Arc<dyn GraphStore>,
    limits: QueryLimits,
}

impl FollowGraph {
    /// Limits outside their accepted ranges are clamped.
    pub fn new(store: Arc<dyn GraphStore>, limits: QueryLimits) -> Self {
        Self {
            store,
            limits: limits.validated(),
        }
    }

    /// A fresh in-process graph with default limits.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(EmbeddedStore::in_memory()), QueryLimits::default())
    }

    /// Open the store named in `config`.
    pub fn open(config: &FollowGraphConfig) -> Result<Self> {
        let store = store::open(&config.store)?;
        info!(uri = %config.store.uri, "follow graph ready");
        Ok(Self::new(store, config.limits))
    }

    pub fn users(&self) -> UserDirectory {
        UserDirectory::new(Arc::clone(&self.store))
    }

    pub fn relationships(&self) -> RelationshipEngine {
        RelationshipEngine::new(Arc::clone(&self.store))
            .with_recommendation_limit(self.limits.recommendations)
    }

    pub fn ranking(&self) -> Ranking {
        Ranking::new(Arc::clone(&self.store))
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_follow_graph_is_send_sync() {
        assert_send_sync::<FollowGraph>();
    }

    #[test]
    fn test_clones_share_store() {
        let graph = FollowGraph::in_memory();
        let other = graph.clone();
        graph
            .users()
            .create_user("alice", "alice@example.com", "pw", "Alice")
            .unwrap();
        assert!(other.users().get_user_by_username("alice").unwrap().is_some());
    }

    #[test]
    fn test_recommendation_limit_from_config() {
        let graph = FollowGraph::new(
            Arc::new(EmbeddedStore::in_memory()),
            QueryLimits {
                max_top: 20,
                recommendations: 1,
            },
        );
        let users = graph.users();
        for u in ["me", "friend", "x", "y"] {
            users.create_user(u, &format!("{}@example.com", u), "pw", u).unwrap();
        }
        let rel = graph.relationships();
        rel.follow("me", "friend").unwrap();
        rel.follow("friend", "x").unwrap();
        rel.follow("friend", "y").unwrap();

        let recs = rel.recommendations("me").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].username, "x");
    }

    #[test]
    fn test_out_of_range_limits_clamped() {
        let graph = FollowGraph::new(
            Arc::new(EmbeddedStore::in_memory()),
            QueryLimits {
                max_top: 0,
                recommendations: 0,
            },
        );
        assert_eq!(graph.limits().max_top, 1);
        assert_eq!(graph.limits().recommendations, 1);

        let users = graph.users();
        for u in ["me", "friend", "x"] {
            users.create_user(u, &format!("{}@example.com", u), "pw", u).unwrap();
        }
        let rel = graph.relationships();
        rel.follow("me", "friend").unwrap();
        rel.follow("friend", "x").unwrap();
        assert_eq!(rel.recommendations("me").unwrap().len(), 1);
    }

    #[test]
    fn test_open_memory_config() {
        let mut config = FollowGraphConfig::default();
        config.store.uri = "memory://".to_string();
        let graph = FollowGraph::open(&config).unwrap();
        assert_eq!(graph.limits(), QueryLimits::default());
        assert!(graph.ranking().search_user("").unwrap().is_empty());
    }
}
