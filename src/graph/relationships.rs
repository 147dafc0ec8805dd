//! Relationship engine: owns the `FOLLOWS` edge.
//!
//! Each ordered pair `(follower, followee)` is either `NotFollowing` or
//! `Following`. `follow` and `unfollow` move between the two with a single
//! store statement each, so existence checks and the edge change happen
//! atomically. Reads (connections, mutual friends, recommendations) are
//! likewise one statement each, aggregated here.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{Connections, FollowOutcome, RecommendationRow, UnfollowOutcome, UserSummary};
use crate::error::{FollowGraphError, Result};
use crate::store::{GraphStore, Params, Record, Statement};

/// Default number of recommendations returned.
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// Follow/unfollow and the queries that walk follow edges.
#[derive(Clone)]
pub struct RelationshipEngine {
    store: Arc<dyn GraphStore>,
    recommendation_limit: usize,
}

impl RelationshipEngine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            recommendation_limit: DEFAULT_RECOMMENDATION_LIMIT,
        }
    }

    /// Override how many recommendations are returned.
    pub fn with_recommendation_limit(mut self, limit: usize) -> Self {
        self.recommendation_limit = limit;
        self
    }

    // ─── Mutations ──────────────────────────────────────────────

    /// Create `follower -> followee` if it does not exist.
    pub fn follow(&self, follower: &str, followee: &str) -> Result<FollowOutcome> {
        if follower == followee {
            return Err(FollowGraphError::SelfFollow(follower.to_string()));
        }

        let rows = self.store.execute(Statement::MergeFollows, &edge_params(follower, followee))?;
        let row = single_row(&rows, Statement::MergeFollows)?;
        check_endpoints(row, follower, followee)?;

        let outcome = if row.get_bool("created")? {
            FollowOutcome::Followed
        } else {
            FollowOutcome::AlreadyFollowing
        };
        info!(%follower, %followee, %outcome, "follow");
        Ok(outcome)
    }

    /// Remove `follower -> followee` if it exists.
    pub fn unfollow(&self, follower: &str, followee: &str) -> Result<UnfollowOutcome> {
        if follower == followee {
            return Err(FollowGraphError::SelfFollow(follower.to_string()));
        }

        let rows = self.store.execute(Statement::DeleteFollows, &edge_params(follower, followee))?;
        let row = single_row(&rows, Statement::DeleteFollows)?;
        check_endpoints(row, follower, followee)?;

        let outcome = if row.get_bool("deleted")? {
            UnfollowOutcome::Unfollowed
        } else {
            UnfollowOutcome::NotFollowing
        };
        info!(%follower, %followee, %outcome, "unfollow");
        Ok(outcome)
    }

    // ─── Queries ────────────────────────────────────────────────

    /// Followers and followees of `username`, each sorted by username.
    /// Unknown users have no connections.
    pub fn get_connections(&self, username: &str) -> Result<Connections> {
        let rows = self
            .store
            .execute(Statement::MatchConnections, &Params::new().with("username", username))?;

        let mut connections = Connections::default();
        for row in &rows {
            let summary = UserSummary::from_record(row)?;
            match row.get_str("direction")? {
                "follower" => connections.followers.push(summary),
                "following" => connections.following.push(summary),
                other => {
                    return Err(FollowGraphError::MalformedRecord(format!(
                        "unknown connection direction '{}'",
                        other
                    )))
                }
            }
        }
        connections.followers.sort();
        connections.following.sort();
        Ok(connections)
    }

    /// Users followed by both `a` and `b`, sorted by username.
    pub fn get_mutual_friends(&self, a: &str, b: &str) -> Result<Vec<UserSummary>> {
        let rows = self.store.execute(
            Statement::MatchFollowingOfEach,
            &Params::new().with("usernames", vec![a, b]),
        )?;

        let mut followed_by_a: HashMap<String, UserSummary> = HashMap::new();
        let mut followed_by_b: HashSet<String> = HashSet::new();
        for row in &rows {
            let owner = row.get_str("owner")?;
            let summary = UserSummary::from_record(row)?;
            if owner == b {
                followed_by_b.insert(summary.username.clone());
            }
            if owner == a {
                followed_by_a.insert(summary.username.clone(), summary);
            }
        }

        let mut mutual: Vec<UserSummary> = followed_by_a
            .into_values()
            .filter(|s| followed_by_b.contains(&s.username))
            .collect();
        mutual.sort();
        debug!(%a, %b, count = mutual.len(), "mutual friends");
        Ok(mutual)
    }

    /// Friend-of-friend suggestions for `username`.
    ///
    /// A candidate is reached by `username -> friend -> candidate`, is not
    /// `username`, and is not already followed. `mutual_friends` counts the
    /// distinct friends reaching it. Sorted by that count descending, then
    /// username ascending; at most the configured limit.
    pub fn recommendations(&self, username: &str) -> Result<Vec<RecommendationRow>> {
        let rows = self
            .store
            .execute(Statement::ExpandTwoHops, &Params::new().with("username", username))?;

        let mut following: HashSet<&str> = HashSet::new();
        let mut second_hops: Vec<(&str, &str, &str)> = Vec::new();
        for row in &rows {
            let target = row.get_str("username")?;
            match row.get_int("hop")? {
                1 => {
                    following.insert(target);
                }
                2 => {
                    let via = row.get_opt_str("via")?.ok_or_else(|| {
                        FollowGraphError::MalformedRecord("two-hop row without 'via'".to_string())
                    })?;
                    second_hops.push((target, row.get_str("name")?, via));
                }
                other => {
                    return Err(FollowGraphError::MalformedRecord(format!(
                        "unexpected hop {}",
                        other
                    )))
                }
            }
        }

        let mut candidates: HashMap<&str, (&str, HashSet<&str>)> = HashMap::new();
        for (target, name, via) in second_hops {
            if target == username || following.contains(target) {
                continue;
            }
            candidates
                .entry(target)
                .or_insert_with(|| (name, HashSet::new()))
                .1
                .insert(via);
        }

        let mut ranked: Vec<RecommendationRow> = candidates
            .into_iter()
            .map(|(target, (name, vias))| RecommendationRow {
                username: target.to_string(),
                name: name.to_string(),
                mutual_friends: vias.len(),
            })
            .collect();
        ranked.sort_by(|x, y| {
            y.mutual_friends
                .cmp(&x.mutual_friends)
                .then_with(|| x.username.cmp(&y.username))
        });
        ranked.truncate(self.recommendation_limit);

        debug!(%username, count = ranked.len(), "recommendations");
        Ok(ranked)
    }
}

fn edge_params(follower: &str, followee: &str) -> Params {
    Params::new()
        .with("follower", follower)
        .with("followee", followee)
}

fn single_row(rows: &[Record], statement: Statement) -> Result<&Record> {
    rows.first().ok_or_else(|| {
        FollowGraphError::MalformedRecord(format!("{} returned no rows", statement))
    })
}

fn check_endpoints(row: &Record, follower: &str, followee: &str) -> Result<()> {
    if !row.get_bool("follower_found")? {
        return Err(FollowGraphError::UserNotFound(follower.to_string()));
    }
    if !row.get_bool("followee_found")? {
        return Err(FollowGraphError::UserNotFound(followee.to_string()));
    }
    Ok(())
}
