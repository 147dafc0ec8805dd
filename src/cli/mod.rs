//! CLI module for followgraph.
//!
//! Commands:
//! - Accounts: register, login, profile, edit
//! - Relationships: follow, unfollow, connections, mutual, recommend
//! - Ranking: top, search
//!
//! Commands that change the graph sign in first with `--username` and
//! `--password` (or `FOLLOWGRAPH_PASSWORD`). Read-only commands take no
//! credentials.

pub mod output;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::account::{clamp_top_limit, Account, Accounts, RegistrationForm};
use crate::error::FollowGraphError;
use crate::graph::{FollowGraph, ProfileUpdate};

pub const ENV_PASSWORD: &str = "FOLLOWGRAPH_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "followgraph")]
#[command(about = "Social follow graph: users, follows and recommendations")]
pub struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = ".followgraph/config.toml")]
    pub config: PathBuf,

    /// Store URI (`memory://`, `file://<path>` or `bolt://<host>:<port>`), overrides the config
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Sign-in arguments for commands that act as a user.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Your username
    #[arg(short, long)]
    pub username: String,

    /// Your password
    #[arg(short, long, env = ENV_PASSWORD, hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    // ─── Accounts ───────────────────────────────────────────────
    /// Create a new account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long, env = ENV_PASSWORD, hide_env_values = true)]
        password: String,
    },

    /// Check a username and password
    Login {
        #[command(flatten)]
        auth: Credentials,
    },

    /// Show a user's profile
    Profile {
        #[arg(short, long)]
        username: String,
    },

    /// Edit your profile (omitted or blank fields are kept)
    Edit {
        #[command(flatten)]
        auth: Credentials,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },

    // ─── Relationships ──────────────────────────────────────────
    /// Follow another user
    Follow {
        target: String,
        #[command(flatten)]
        auth: Credentials,
    },

    /// Stop following a user
    Unfollow {
        target: String,
        #[command(flatten)]
        auth: Credentials,
    },

    /// List followers and followees
    Connections {
        #[arg(short, long)]
        username: String,
    },

    /// Users both you and <other> follow
    Mutual {
        other: String,
        #[arg(short, long)]
        username: String,
    },

    /// Friend-of-friend suggestions
    Recommend {
        #[arg(short, long)]
        username: String,
    },

    // ─── Ranking ────────────────────────────────────────────────
    /// Most-followed users
    Top {
        /// How many to show (clamped to the configured maximum)
        #[arg(short, long, default_value = "10", allow_negative_numbers = true)]
        limit: i64,
    },

    /// Find users by username or name (substring, case-insensitive)
    Search { query: String },
}

/// Run one command against `graph`, writing results to `out`.
pub fn execute(
    graph: &FollowGraph,
    command: Commands,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let accounts = Accounts::new(graph);
    let render = output::Renderer::new(out, json);

    match command {
        Commands::Register {
            username,
            email,
            name,
            password,
        } => {
            let form = RegistrationForm {
                username,
                email,
                name,
                password,
            };
            let user = accounts.register(&form)?;
            render.registered(&user)
        }

        Commands::Login { auth } => {
            let account = sign_in(&accounts, &auth)?;
            render.welcome(account.user())
        }

        Commands::Profile { username } => {
            match graph.users().get_user_by_username(username.trim())? {
                Some(user) => render.profile(&user),
                None => Err(FollowGraphError::UserNotFound(username).into()),
            }
        }

        Commands::Edit {
            auth,
            name,
            email,
            bio,
        } => {
            let mut account = sign_in(&accounts, &auth)?;
            let update = ProfileUpdate::from_form(
                name.as_deref().unwrap_or(""),
                email.as_deref().unwrap_or(""),
                bio.as_deref().unwrap_or(""),
            );
            let user = accounts.edit_profile(&mut account, &update)?;
            render.profile(&user)
        }

        Commands::Follow { target, auth } => {
            let account = sign_in(&accounts, &auth)?;
            let outcome = graph
                .relationships()
                .follow(account.username(), target.trim())?;
            render.follow(target.trim(), outcome)
        }

        Commands::Unfollow { target, auth } => {
            let account = sign_in(&accounts, &auth)?;
            let outcome = graph
                .relationships()
                .unfollow(account.username(), target.trim())?;
            render.unfollow(target.trim(), outcome)
        }

        Commands::Connections { username } => {
            let connections = graph.relationships().get_connections(username.trim())?;
            render.connections(&connections)
        }

        Commands::Mutual { other, username } => {
            let (me, other) = (username.trim(), other.trim());
            if me == other {
                bail!("cannot check mutual friends with yourself");
            }
            let mutual = graph.relationships().get_mutual_friends(me, other)?;
            render.mutual(other, &mutual)
        }

        Commands::Recommend { username } => {
            let recs = graph.relationships().recommendations(username.trim())?;
            render.recommendations(&recs)
        }

        Commands::Top { limit } => {
            let limit = clamp_top_limit(limit, graph.limits().max_top)?;
            let rows = graph.ranking().most_followed(limit)?;
            render.most_followed(limit, &rows)
        }

        Commands::Search { query } => {
            let users = graph.ranking().search_user(query.trim())?;
            render.search(query.trim(), &users)
        }
    }
}

fn sign_in(accounts: &Accounts, auth: &Credentials) -> crate::Result<Account> {
    accounts.login(&auth.username, &auth.password)
}
