//! Popularity ranking and user search.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::types::{PopularityRow, User};
use crate::error::{FollowGraphError, Result};
use crate::store::{GraphStore, Params, Statement};

/// Read-only aggregate queries over the whole graph.
#[derive(Clone)]
pub struct Ranking {
    store: Arc<dyn GraphStore>,
}

impl Ranking {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// The `limit` users with the most distinct followers.
    ///
    /// Ties break on username ascending. Users nobody follows never appear.
    pub fn most_followed(&self, limit: usize) -> Result<Vec<PopularityRow>> {
        if limit == 0 {
            return Err(FollowGraphError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }

        let rows = self
            .store
            .execute(Statement::MatchInboundFollows, &Params::new())?;

        let mut followers: HashMap<&str, (&str, HashSet<&str>)> = HashMap::new();
        for row in &rows {
            let name = row.get_str("name")?;
            followers
                .entry(row.get_str("username")?)
                .or_insert_with(|| (name, HashSet::new()))
                .1
                .insert(row.get_str("follower")?);
        }

        let mut ranked: Vec<PopularityRow> = followers
            .into_iter()
            .map(|(username, (name, set))| PopularityRow {
                name: name.to_string(),
                username: username.to_string(),
                follower_count: set.len(),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.follower_count
                .cmp(&a.follower_count)
                .then_with(|| a.username.cmp(&b.username))
        });
        ranked.truncate(limit);

        debug!(limit, returned = ranked.len(), "most followed");
        Ok(ranked)
    }

    /// Users whose username or name contains `substring`, ignoring case.
    pub fn search_user(&self, substring: &str) -> Result<Vec<User>> {
        let needle = substring.to_lowercase();
        let rows = self.store.execute(Statement::ScanUsers, &Params::new())?;

        let mut matches = Vec::new();
        for row in &rows {
            let user = User::from_record(row.get_record("u")?)?;
            if user.username.to_lowercase().contains(&needle)
                || user.name.to_lowercase().contains(&needle)
            {
                matches.push(user);
            }
        }
        matches.sort_by(|a, b| a.username.cmp(&b.username));

        debug!(%substring, count = matches.len(), "user search");
        Ok(matches)
    }
}
