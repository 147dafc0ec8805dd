//! Core types for the follow graph.
//!
//! Defines the user record, the summary projections returned by queries,
//! and the outcomes of follow/unfollow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{Record, StoreResult};

/// A user vertex as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique, immutable key.
    pub username: String,
    pub email: String,
    pub name: String,
    /// Empty until the user sets one.
    pub bio: String,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Salted hash of the user's secret. Never serialized.
    #[serde(skip_serializing, default)]
    pub(crate) password_hash: String,
}

impl User {
    /// Decode a user from the `u` record returned by the store.
    pub(crate) fn from_record(record: &Record) -> StoreResult<Self> {
        Ok(Self {
            username: record.get_str("username")?.to_string(),
            email: record.get_str("email")?.to_string(),
            name: record.get_str("name")?.to_string(),
            bio: record.get_opt_str("bio")?.unwrap_or_default().to_string(),
            created_at: record.get_timestamp("created_at")?,
            password_hash: record.get_str("password")?.to_string(),
        })
    }

    /// Project to `{username, name}`.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }
}

/// Lightweight `{username, name}` projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub name: String,
}

impl UserSummary {
    pub(crate) fn from_record(record: &Record) -> StoreResult<Self> {
        Ok(Self {
            username: record.get_str("username")?.to_string(),
            name: record.get_str("name")?.to_string(),
        })
    }
}

/// Inbound and outbound neighbours of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    /// Users who follow this user.
    pub followers: Vec<UserSummary>,
    /// Users this user follows.
    pub following: Vec<UserSummary>,
}

/// A friend-of-friend suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub username: String,
    pub name: String,
    /// Distinct followed users who in turn follow this one.
    pub mutual_friends: usize,
}

/// A row of the most-followed ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityRow {
    pub name: String,
    pub username: String,
    pub follower_count: usize,
}

/// Result of `follow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowOutcome {
    /// A new edge was created.
    Followed,
    /// The edge already existed; nothing changed.
    AlreadyFollowing,
}

impl fmt::Display for FollowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowOutcome::Followed => write!(f, "followed"),
            FollowOutcome::AlreadyFollowing => write!(f, "already following"),
        }
    }
}

/// Result of `unfollow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfollowOutcome {
    /// The edge was removed.
    Unfollowed,
    /// There was no edge; nothing changed.
    NotFollowing,
}

impl fmt::Display for UnfollowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnfollowOutcome::Unfollowed => write!(f, "unfollowed"),
            UnfollowOutcome::NotFollowing => write!(f, "not following"),
        }
    }
}

/// Partial profile update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Build from form input where a blank entry means "keep current".
    pub fn from_form(name: &str, email: &str, bio: &str) -> Self {
        let keep_blank = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Self {
            name: keep_blank(name),
            email: keep_blank(email),
            bio: keep_blank(bio),
        }
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.bio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_record() {
        let now = Utc::now();
        let record = Record::new()
            .with("username", "alice")
            .with("email", "alice@example.com")
            .with("password", "$2b$04$opaque")
            .with("name", "Alice")
            .with("bio", "")
            .with("created_at", now);

        let user = User::from_record(&record).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.created_at, now);
        assert_eq!(user.password_hash, "$2b$04$opaque");
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            bio: String::new(),
            created_at: Utc::now(),
            password_hash: "$2b$04$saltanddigest".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("saltanddigest"));
    }

    #[test]
    fn test_user_from_incomplete_record() {
        let record = Record::new().with("username", "alice");
        assert!(User::from_record(&record).is_err());
    }

    #[test]
    fn test_profile_update_from_form() {
        let update = ProfileUpdate::from_form("  ", "new@example.com", "");
        assert_eq!(update.name, None);
        assert_eq!(update.email.as_deref(), Some("new@example.com"));
        assert_eq!(update.bio, None);
        assert!(!update.is_empty());

        assert!(ProfileUpdate::from_form("", " ", "").is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(FollowOutcome::AlreadyFollowing.to_string(), "already following");
        assert_eq!(UnfollowOutcome::NotFollowing.to_string(), "not following");
    }
}
