//! Text and JSON rendering of command results.

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::io::Write;

use crate::graph::{
    Connections, FollowOutcome, PopularityRow, RecommendationRow, UnfollowOutcome, User,
    UserSummary,
};

/// Writes one command's result, as text or pretty JSON.
pub struct Renderer<'a> {
    out: &'a mut dyn Write,
    json: bool,
}

impl<'a> Renderer<'a> {
    pub fn new(out: &'a mut dyn Write, json: bool) -> Self {
        Self { out, json }
    }

    fn emit_json<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        writeln!(self.out, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    pub fn registered(self, user: &User) -> Result<()> {
        if self.json {
            return self.emit_json(user);
        }
        writeln!(self.out, "✓ Registered @{}", user.username)?;
        Ok(())
    }

    pub fn welcome(self, user: &User) -> Result<()> {
        if self.json {
            return self.emit_json(user);
        }
        writeln!(self.out, "Welcome back, {}!", user.name)?;
        Ok(())
    }

    pub fn profile(self, user: &User) -> Result<()> {
        if self.json {
            return self.emit_json(user);
        }
        writeln!(self.out, "Name:     {}", user.name)?;
        writeln!(self.out, "Username: {}", user.username)?;
        writeln!(self.out, "Email:    {}", user.email)?;
        writeln!(self.out, "Bio:      {}", or_na(&user.bio))?;
        writeln!(self.out, "Joined:   {}", user.created_at.format("%Y-%m-%d"))?;
        Ok(())
    }

    pub fn follow(self, target: &str, outcome: FollowOutcome) -> Result<()> {
        if self.json {
            return self.emit_json(&json!({ "target": target, "outcome": outcome }));
        }
        match outcome {
            FollowOutcome::Followed => writeln!(self.out, "✓ You are now following @{}", target)?,
            FollowOutcome::AlreadyFollowing => {
                writeln!(self.out, "You are already following @{}", target)?
            }
        }
        Ok(())
    }

    pub fn unfollow(self, target: &str, outcome: UnfollowOutcome) -> Result<()> {
        if self.json {
            return self.emit_json(&json!({ "target": target, "outcome": outcome }));
        }
        match outcome {
            UnfollowOutcome::Unfollowed => writeln!(self.out, "✓ You unfollowed @{}", target)?,
            UnfollowOutcome::NotFollowing => {
                writeln!(self.out, "You are not following @{}", target)?
            }
        }
        Ok(())
    }

    pub fn connections(self, connections: &Connections) -> Result<()> {
        if self.json {
            return self.emit_json(connections);
        }
        writeln!(self.out, "Followers:")?;
        if connections.followers.is_empty() {
            writeln!(self.out, "  No followers found.")?;
        }
        for user in &connections.followers {
            writeln!(self.out, "  {}", summary_line(user))?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "Following:")?;
        if connections.following.is_empty() {
            writeln!(self.out, "  Not following anyone.")?;
        }
        for user in &connections.following {
            writeln!(self.out, "  {}", summary_line(user))?;
        }
        Ok(())
    }

    pub fn mutual(self, other: &str, mutual: &[UserSummary]) -> Result<()> {
        if self.json {
            return self.emit_json(mutual);
        }
        if mutual.is_empty() {
            writeln!(self.out, "No mutual friends with @{}.", other)?;
            return Ok(());
        }
        writeln!(self.out, "Mutual friends with @{}:", other)?;
        for user in mutual {
            writeln!(self.out, "  {}", summary_line(user))?;
        }
        Ok(())
    }

    pub fn recommendations(self, recs: &[RecommendationRow]) -> Result<()> {
        if self.json {
            return self.emit_json(recs);
        }
        if recs.is_empty() {
            writeln!(self.out, "No recommendations available at the moment.")?;
            return Ok(());
        }
        writeln!(self.out, "Recommended:")?;
        for rec in recs {
            writeln!(
                self.out,
                "  @{} ({}) - {} mutual",
                rec.username, rec.name, rec.mutual_friends
            )?;
        }
        Ok(())
    }

    pub fn most_followed(self, limit: usize, rows: &[PopularityRow]) -> Result<()> {
        if self.json {
            return self.emit_json(rows);
        }
        if rows.is_empty() {
            writeln!(self.out, "No users are followed yet.")?;
            return Ok(());
        }
        writeln!(self.out, "Top {} most followed:", limit)?;
        for (rank, row) in rows.iter().enumerate() {
            writeln!(
                self.out,
                "  {:>2}. @{} ({}) - {} followers",
                rank + 1,
                row.username,
                row.name,
                row.follower_count
            )?;
        }
        Ok(())
    }

    pub fn search(self, query: &str, users: &[User]) -> Result<()> {
        if self.json {
            return self.emit_json(users);
        }
        if users.is_empty() {
            writeln!(self.out, "No user found matching '{}'", query)?;
            return Ok(());
        }
        for user in users {
            writeln!(self.out, "@{} ({})", user.username, user.name)?;
            writeln!(self.out, "  Bio: {}", or_na(&user.bio))?;
        }
        Ok(())
    }
}

fn summary_line(user: &UserSummary) -> String {
    format!("@{} ({})", user.username, user.name)
}

fn or_na(s: &str) -> &str {
    if s.is_empty() {
        "N/A"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_text(f: impl FnOnce(Renderer<'_>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(Renderer::new(&mut out, false)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_connections_text() {
        let text = render_text(|r| r.connections(&Connections::default()));
        assert!(text.contains("No followers found."));
        assert!(text.contains("Not following anyone."));
    }

    #[test]
    fn test_most_followed_text() {
        let rows = vec![PopularityRow {
            name: "Carol".to_string(),
            username: "carol".to_string(),
            follower_count: 3,
        }];
        let text = render_text(|r| r.most_followed(5, &rows));
        assert!(text.contains("Top 5 most followed:"));
        assert!(text.contains("@carol (Carol) - 3 followers"));
    }

    #[test]
    fn test_follow_outcome_json() {
        let mut out = Vec::new();
        Renderer::new(&mut out, true)
            .follow("bob", FollowOutcome::AlreadyFollowing)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["outcome"], "already_following");
        assert_eq!(value["target"], "bob");
    }
}
