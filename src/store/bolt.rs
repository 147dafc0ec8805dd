//! Bolt backend.
//!
//! Runs each [`Statement`] as one Cypher query against a Neo4j-compatible
//! server through `neo4rs`. The driver is async; a private tokio runtime
//! blocks on it so the backend fits the synchronous [`GraphStore`] seam.
//!
//! Users are `(:User)` nodes keyed by a unique `username` constraint and
//! follows are `[:FOLLOWS]` relationships. `created_at` is stored as an
//! RFC 3339 string.

use chrono::{DateTime, Utc};
use neo4rs::{query, Graph, Query, Row};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{Constraint, GraphStore, Params, Record, Session, Statement, StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    "CREATE CONSTRAINT user_username IF NOT EXISTS FOR (u:User) REQUIRE u.username IS UNIQUE",
    "CREATE INDEX user_name IF NOT EXISTS FOR (u:User) ON (u.name)",
];

const USER_COLUMNS: &str = "u.username AS username, u.email AS email, u.password AS password, \
     u.name AS name, coalesce(u.bio, '') AS bio, u.created_at AS created_at";

// ─── Query Plans ────────────────────────────────────────────────

/// A parameter bound into a Cypher query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CypherParam {
    Text(String),
    List(Vec<String>),
}

/// Cypher text plus parameters for one statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CypherPlan {
    pub(crate) cypher: String,
    pub(crate) params: Vec<(&'static str, CypherParam)>,
}

impl CypherPlan {
    fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Vec::new(),
        }
    }

    fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, CypherParam::Text(value.into())));
        self
    }

    fn list(mut self, name: &'static str, values: Vec<String>) -> Self {
        self.params.push((name, CypherParam::List(values)));
        self
    }

    #[cfg(test)]
    pub(crate) fn param(&self, name: &str) -> Option<&CypherParam> {
        self.params.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    fn into_query(self) -> Query {
        let mut q = query(&self.cypher);
        for (name, value) in self.params {
            q = match value {
                CypherParam::Text(text) => q.param(name, text),
                CypherParam::List(list) => q.param(name, list),
            };
        }
        q
    }
}

/// Translate a statement into Cypher.
pub(crate) fn plan(statement: Statement, params: &Params) -> StoreResult<CypherPlan> {
    let plan = match statement {
        Statement::CreateUser => CypherPlan::new(format!(
            "MERGE (u:User {{username: $username}}) \
             ON CREATE SET u.email = $email, u.password = $password, u.name = $name, \
                 u.bio = $bio, u.created_at = $created_at, u.fresh = true \
             WITH u, coalesce(u.fresh, false) AS created \
             REMOVE u.fresh \
             RETURN created, {}",
            USER_COLUMNS
        ))
        .text("username", params.str("username")?)
        .text("email", params.str("email")?)
        .text("password", params.str("password")?)
        .text("name", params.str("name")?)
        .text("bio", params.opt_str("bio")?.unwrap_or_default())
        .text("created_at", params.timestamp("created_at")?.to_rfc3339()),

        Statement::MatchUser => CypherPlan::new(format!(
            "MATCH (u:User {{username: $username}}) RETURN {}",
            USER_COLUMNS
        ))
        .text("username", params.str("username")?),

        Statement::SetUserFields => {
            let mut plan = CypherPlan::new("").text("username", params.str("username")?);
            let mut sets = Vec::new();
            for field in ["name", "email", "bio"] {
                if let Some(value) = params.opt_str(field)? {
                    sets.push(format!("u.{0} = ${0}", field));
                    plan = plan.text(field, value);
                }
            }
            let set_clause = if sets.is_empty() {
                String::new()
            } else {
                format!("SET {} ", sets.join(", "))
            };
            plan.cypher = format!(
                "MATCH (u:User {{username: $username}}) {}RETURN {}",
                set_clause, USER_COLUMNS
            );
            plan
        }

        Statement::MergeFollows => {
            let (follower, followee) = edge_endpoints(params)?;
            // Writing a property on the follower takes its node lock, so two
            // concurrent merges of the same pair cannot both see no edge.
            CypherPlan::new(
                "OPTIONAL MATCH (a:User {username: $follower}) \
                 OPTIONAL MATCH (b:User {username: $followee}) \
                 FOREACH (n IN CASE WHEN a IS NULL THEN [] ELSE [a] END | \
                     SET n.lock = true REMOVE n.lock) \
                 WITH a, b \
                 OPTIONAL MATCH (a)-[existing:FOLLOWS]->(b) \
                 WITH a, b, a IS NOT NULL AND b IS NOT NULL AND existing IS NULL AS created \
                 FOREACH (_ IN CASE WHEN created THEN [1] ELSE [] END | \
                     MERGE (a)-[:FOLLOWS]->(b)) \
                 RETURN a IS NOT NULL AS follower_found, b IS NOT NULL AS followee_found, created",
            )
            .text("follower", follower)
            .text("followee", followee)
        }

        Statement::DeleteFollows => {
            let (follower, followee) = edge_endpoints(params)?;
            CypherPlan::new(
                "OPTIONAL MATCH (a:User {username: $follower}) \
                 OPTIONAL MATCH (b:User {username: $followee}) \
                 OPTIONAL MATCH (a)-[r:FOLLOWS]->(b) \
                 WITH a, b, collect(r) AS edges \
                 FOREACH (r IN edges | DELETE r) \
                 RETURN a IS NOT NULL AS follower_found, b IS NOT NULL AS followee_found, \
                     size(edges) > 0 AS deleted",
            )
            .text("follower", follower)
            .text("followee", followee)
        }

        Statement::MatchConnections => CypherPlan::new(
            "MATCH (u:User {username: $username})-[r:FOLLOWS]-(other:User) \
             RETURN CASE WHEN startNode(r) = u THEN 'following' ELSE 'follower' END AS direction, \
                 other.username AS username, other.name AS name",
        )
        .text("username", params.str("username")?),

        Statement::MatchFollowingOfEach => CypherPlan::new(
            "UNWIND $usernames AS owner \
             MATCH (:User {username: owner})-[:FOLLOWS]->(f:User) \
             RETURN owner, f.username AS username, f.name AS name",
        )
        .list(
            "usernames",
            params
                .str_list("usernames")?
                .into_iter()
                .map(str::to_string)
                .collect(),
        ),

        Statement::ExpandTwoHops => CypherPlan::new(
            "MATCH (:User {username: $username})-[:FOLLOWS]->(f:User) \
             RETURN 1 AS hop, null AS via, f.username AS username, f.name AS name \
             UNION ALL \
             MATCH (:User {username: $username})-[:FOLLOWS]->(f:User)-[:FOLLOWS]->(c:User) \
             RETURN 2 AS hop, f.username AS via, c.username AS username, c.name AS name",
        )
        .text("username", params.str("username")?),

        Statement::MatchInboundFollows => CypherPlan::new(
            "MATCH (a:User)-[:FOLLOWS]->(b:User) \
             RETURN a.username AS follower, b.username AS username, b.name AS name",
        ),

        Statement::ScanUsers => {
            CypherPlan::new(format!("MATCH (u:User) RETURN {}", USER_COLUMNS))
        }
    };
    Ok(plan)
}

fn edge_endpoints(params: &Params) -> StoreResult<(&str, &str)> {
    let follower = params.str("follower")?;
    let followee = params.str("followee")?;
    if follower == followee {
        return Err(StoreError::ConstraintViolation {
            constraint: Constraint::NoSelfLoop,
            value: follower.to_string(),
        });
    }
    Ok((follower, followee))
}

// ─── Row Decoding ───────────────────────────────────────────────

fn text(row: &Row, column: &str) -> StoreResult<String> {
    row.get::<String>(column)
        .map_err(|e| StoreError::Decode(format!("{}: {}", column, e)))
}

fn opt_text(row: &Row, column: &str) -> StoreResult<Option<String>> {
    row.get::<Option<String>>(column)
        .map_err(|e| StoreError::Decode(format!("{}: {}", column, e)))
}

fn flag(row: &Row, column: &str) -> StoreResult<bool> {
    row.get::<bool>(column)
        .map_err(|e| StoreError::Decode(format!("{}: {}", column, e)))
}

fn int(row: &Row, column: &str) -> StoreResult<i64> {
    row.get::<i64>(column)
        .map_err(|e| StoreError::Decode(format!("{}: {}", column, e)))
}

pub(crate) fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("created_at '{}': {}", raw, e)))
}

fn user(row: &Row) -> StoreResult<Record> {
    Ok(Record::new()
        .with("username", text(row, "username")?)
        .with("email", text(row, "email")?)
        .with("password", text(row, "password")?)
        .with("name", text(row, "name")?)
        .with("bio", text(row, "bio")?)
        .with("created_at", parse_timestamp(&text(row, "created_at")?)?))
}

fn summary(row: &Row) -> StoreResult<Record> {
    Ok(Record::new()
        .with("username", text(row, "username")?)
        .with("name", text(row, "name")?))
}

fn decode(statement: Statement, row: &Row) -> StoreResult<Record> {
    match statement {
        Statement::CreateUser
        | Statement::MatchUser
        | Statement::SetUserFields
        | Statement::ScanUsers => Ok(Record::new().with("u", user(row)?)),
        Statement::MergeFollows => Ok(Record::new()
            .with("follower_found", flag(row, "follower_found")?)
            .with("followee_found", flag(row, "followee_found")?)
            .with("created", flag(row, "created")?)),
        Statement::DeleteFollows => Ok(Record::new()
            .with("follower_found", flag(row, "follower_found")?)
            .with("followee_found", flag(row, "followee_found")?)
            .with("deleted", flag(row, "deleted")?)),
        Statement::MatchConnections => Ok(summary(row)?.with("direction", text(row, "direction")?)),
        Statement::MatchFollowingOfEach => Ok(summary(row)?.with("owner", text(row, "owner")?)),
        Statement::ExpandTwoHops => Ok(summary(row)?
            .with("hop", int(row, "hop")?)
            .with("via", opt_text(row, "via")?)),
        Statement::MatchInboundFollows => {
            Ok(summary(row)?.with("follower", text(row, "follower")?))
        }
    }
}

fn unavailable(err: neo4rs::Error) -> StoreError {
    StoreError::Unavailable(format!("bolt: {}", err))
}

// ─── Store ──────────────────────────────────────────────────────

/// Graph store backed by a Bolt server.
pub struct BoltStore {
    graph: Graph,
    runtime: Runtime,
    closed: AtomicBool,
    active_sessions: AtomicUsize,
}

impl BoltStore {
    /// Connect and make sure the username constraint exists.
    ///
    /// Must not be called from inside another tokio runtime.
    pub fn connect(uri: &str, user: &str, password: &str) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let graph = runtime
            .block_on(Graph::new(uri, user, password))
            .map_err(unavailable)?;

        let store = Self {
            graph,
            runtime,
            closed: AtomicBool::new(false),
            active_sessions: AtomicUsize::new(0),
        };
        store.init_schema()?;
        info!(%uri, %user, "bolt store connected");
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            self.runtime
                .block_on(self.graph.run(query(statement)))
                .map_err(unavailable)?;
        }
        debug!("bolt schema ready");
        Ok(())
    }

    /// Refuse all further sessions.
    pub fn close(&self) {
        info!("closing bolt store");
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of sessions currently open.
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    async fn fetch(&self, q: Query) -> Result<Vec<Row>, neo4rs::Error> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

impl GraphStore for BoltStore {
    fn session(&self) -> StoreResult<Box<dyn Session + '_>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(BoltSession { store: self }))
    }
}

struct BoltSession<'a> {
    store: &'a BoltStore,
}

impl Session for BoltSession<'_> {
    fn run(&mut self, statement: Statement, params: &Params) -> StoreResult<Vec<Record>> {
        if self.store.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }

        let plan = plan(statement, params)?;
        let rows = self
            .store
            .runtime
            .block_on(self.store.fetch(plan.into_query()))
            .map_err(unavailable)?;

        if statement == Statement::CreateUser {
            let created = match rows.first() {
                Some(row) => flag(row, "created")?,
                None => false,
            };
            if !created {
                return Err(StoreError::ConstraintViolation {
                    constraint: Constraint::UniqueUsername,
                    value: params.str("username")?.to_string(),
                });
            }
        }

        rows.iter().map(|row| decode(statement, row)).collect()
    }
}

impl Drop for BoltSession<'_> {
    fn drop(&mut self) {
        self.store.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}
