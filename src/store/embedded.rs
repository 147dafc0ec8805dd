//! Embedded graph backend.
//!
//! Uses petgraph to hold `User` vertices and `FOLLOWS` edges in process,
//! with a username index for key lookups. All state sits behind one
//! `RwLock`: write statements hold the write lock for their whole run,
//! which is what makes "create if absent" and "merge edge" atomic.
//!
//! A snapshot-backed store also holds the snapshot's file lock around each
//! statement, so handles in other processes see one another's writes. A
//! write is applied to a copy of the graph and only replaces the live
//! graph once the snapshot is on disk.

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::persistence::{self, FileStamp, SnapshotLock};
use super::{
    Constraint, GraphStore, Params, Record, Session, Statement, StoreError, StoreResult, Value,
};

/// Properties stored on a `User` vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVertex {
    pub username: String,
    pub email: String,
    /// Opaque credential. The store never interprets it.
    pub password: String,
    pub name: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

impl UserVertex {
    fn to_record(&self) -> Record {
        Record::new()
            .with("username", self.username.as_str())
            .with("email", self.email.as_str())
            .with("password", self.password.as_str())
            .with("name", self.name.as_str())
            .with("bio", self.bio.as_str())
            .with("created_at", self.created_at)
    }

    fn summary(&self) -> Record {
        Record::new()
            .with("username", self.username.as_str())
            .with("name", self.name.as_str())
    }
}

/// Weight of a `FOLLOWS` edge. Edges carry no attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follows;

/// The graph plus its username index.
#[derive(Default, Clone)]
pub(crate) struct GraphState {
    graph: DiGraph<UserVertex, Follows>,
    username_index: HashMap<String, NodeIndex>,
}

impl GraphState {
    /// Rebuild state from persisted users and follow pairs.
    ///
    /// Duplicate usernames keep the first vertex. Duplicate or self-loop
    /// pairs, and pairs naming unknown users, are skipped.
    pub(crate) fn from_parts(users: Vec<UserVertex>, follows: Vec<(String, String)>) -> Self {
        let mut state = GraphState::default();
        for user in users {
            if state.username_index.contains_key(&user.username) {
                warn!(username = %user.username, "duplicate user in snapshot, skipping");
                continue;
            }
            let name = user.username.clone();
            let idx = state.graph.add_node(user);
            state.username_index.insert(name, idx);
        }
        for (follower, followee) in follows {
            match (state.lookup(&follower), state.lookup(&followee)) {
                (Some(a), Some(b)) if a != b => {
                    if state.graph.find_edge(a, b).is_none() {
                        state.graph.add_edge(a, b, Follows);
                    }
                }
                _ => warn!(%follower, %followee, "dangling follow pair in snapshot, skipping"),
            }
        }
        state
    }

    pub(crate) fn users(&self) -> impl Iterator<Item = &UserVertex> {
        self.graph.node_weights()
    }

    pub(crate) fn follow_pairs(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].username.clone(),
                    self.graph[e.target()].username.clone(),
                )
            })
            .collect()
    }

    pub(crate) fn user_count(&self) -> usize {
        self.graph.node_count()
    }

    pub(crate) fn follow_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn lookup(&self, username: &str) -> Option<NodeIndex> {
        self.username_index.get(username).copied()
    }

    // ─── Write Statements ───────────────────────────────────────

    fn apply(&mut self, statement: Statement, params: &Params) -> StoreResult<Vec<Record>> {
        match statement {
            Statement::CreateUser => self.create_user(params),
            Statement::SetUserFields => self.set_user_fields(params),
            Statement::MergeFollows => self.merge_follows(params),
            Statement::DeleteFollows => self.delete_follows(params),
            read => self.query(read, params),
        }
    }

    fn create_user(&mut self, params: &Params) -> StoreResult<Vec<Record>> {
        let username = params.str("username")?;
        if self.username_index.contains_key(username) {
            return Err(StoreError::ConstraintViolation {
                constraint: Constraint::UniqueUsername,
                value: username.to_string(),
            });
        }

        let vertex = UserVertex {
            username: username.to_string(),
            email: params.str("email")?.to_string(),
            password: params.str("password")?.to_string(),
            name: params.str("name")?.to_string(),
            bio: params.opt_str("bio")?.unwrap_or_default().to_string(),
            created_at: params.timestamp("created_at")?,
        };
        let record = vertex.to_record();
        let idx = self.graph.add_node(vertex);
        self.username_index.insert(username.to_string(), idx);

        Ok(vec![Record::new().with("u", record)])
    }

    fn set_user_fields(&mut self, params: &Params) -> StoreResult<Vec<Record>> {
        let username = params.str("username")?;
        let Some(idx) = self.lookup(username) else {
            return Ok(Vec::new());
        };

        let name = params.opt_str("name")?;
        let email = params.opt_str("email")?;
        let bio = params.opt_str("bio")?;

        let vertex = &mut self.graph[idx];
        if let Some(name) = name {
            vertex.name = name.to_string();
        }
        if let Some(email) = email {
            vertex.email = email.to_string();
        }
        if let Some(bio) = bio {
            vertex.bio = bio.to_string();
        }

        Ok(vec![Record::new().with("u", vertex.to_record())])
    }

    fn merge_follows(&mut self, params: &Params) -> StoreResult<Vec<Record>> {
        let (follower, followee) = self.edge_endpoints(params)?;
        let (a, b) = (self.lookup(follower), self.lookup(followee));

        let created = match (a, b) {
            (Some(a), Some(b)) if self.graph.find_edge(a, b).is_none() => {
                self.graph.add_edge(a, b, Follows);
                true
            }
            _ => false,
        };

        Ok(vec![Record::new()
            .with("follower_found", a.is_some())
            .with("followee_found", b.is_some())
            .with("created", created)])
    }

    fn delete_follows(&mut self, params: &Params) -> StoreResult<Vec<Record>> {
        let (follower, followee) = self.edge_endpoints(params)?;
        let (a, b) = (self.lookup(follower), self.lookup(followee));

        let deleted = match (a, b) {
            (Some(a), Some(b)) => match self.graph.find_edge(a, b) {
                Some(edge) => self.graph.remove_edge(edge).is_some(),
                None => false,
            },
            _ => false,
        };

        Ok(vec![Record::new()
            .with("follower_found", a.is_some())
            .with("followee_found", b.is_some())
            .with("deleted", deleted)])
    }

    fn edge_endpoints<'p>(&self, params: &'p Params) -> StoreResult<(&'p str, &'p str)> {
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

    // ─── Read Statements ────────────────────────────────────────

    fn query(&self, statement: Statement, params: &Params) -> StoreResult<Vec<Record>> {
        match statement {
            Statement::MatchUser => {
                let username = params.str("username")?;
                Ok(self
                    .lookup(username)
                    .map(|idx| Record::new().with("u", self.graph[idx].to_record()))
                    .into_iter()
                    .collect())
            }
            Statement::MatchConnections => self.connections(params.str("username")?),
            Statement::MatchFollowingOfEach => {
                let mut rows = Vec::new();
                for owner in params.str_list("usernames")? {
                    let Some(idx) = self.lookup(owner) else {
                        continue;
                    };
                    for target in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                        rows.push(self.graph[target].summary().with("owner", owner));
                    }
                }
                Ok(rows)
            }
            Statement::ExpandTwoHops => self.expand_two_hops(params.str("username")?),
            Statement::MatchInboundFollows => Ok(self
                .graph
                .edge_references()
                .map(|e| {
                    self.graph[e.target()]
                        .summary()
                        .with("follower", self.graph[e.source()].username.as_str())
                })
                .collect()),
            Statement::ScanUsers => Ok(self
                .graph
                .node_weights()
                .map(|u| Record::new().with("u", u.to_record()))
                .collect()),
            write => Err(StoreError::Unavailable(format!(
                "statement {} requires a write session",
                write
            ))),
        }
    }

    fn connections(&self, username: &str) -> StoreResult<Vec<Record>> {
        let Some(idx) = self.lookup(username) else {
            return Ok(Vec::new());
        };
        let inbound = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].summary().with("direction", "follower"));
        let outbound = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].summary().with("direction", "following"));
        Ok(inbound.chain(outbound).collect())
    }

    fn expand_two_hops(&self, username: &str) -> StoreResult<Vec<Record>> {
        let Some(origin) = self.lookup(username) else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for friend in self.graph.neighbors_directed(origin, Direction::Outgoing) {
            let friend_node = &self.graph[friend];
            rows.push(
                friend_node
                    .summary()
                    .with("hop", 1i64)
                    .with("via", Value::Null),
            );
            for candidate in self.graph.neighbors_directed(friend, Direction::Outgoing) {
                rows.push(
                    self.graph[candidate]
                        .summary()
                        .with("hop", 2i64)
                        .with("via", friend_node.username.as_str()),
                );
            }
        }
        Ok(rows)
    }
}

// ─── Store ──────────────────────────────────────────────────────

/// In-process graph store, optionally backed by a snapshot file.
pub struct EmbeddedStore {
    state: RwLock<GraphState>,
    snapshot_path: Option<PathBuf>,
    /// Stamp of the snapshot the live graph was loaded from or saved as.
    seen: Mutex<Option<FileStamp>>,
    closed: AtomicBool,
    active_sessions: AtomicUsize,
}

impl EmbeddedStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_state(GraphState::default(), None, None)
    }

    /// Open a snapshot-backed store. A missing file starts an empty graph;
    /// the file is created on the first write.
    pub fn open_file(path: PathBuf) -> StoreResult<Self> {
        let (state, stamp) = if path.exists() {
            let _lock = SnapshotLock::shared(&path)?;
            let stamp = persistence::stamp(&path)?;
            let state = persistence::load(&path)?;
            info!(
                path = %path.display(),
                users = state.user_count(),
                follows = state.follow_count(),
                "snapshot loaded"
            );
            (state, stamp)
        } else {
            debug!(path = %path.display(), "no snapshot yet, starting empty");
            (GraphState::default(), None)
        };

        Ok(Self::with_state(state, Some(path), stamp))
    }

    fn with_state(state: GraphState, path: Option<PathBuf>, stamp: Option<FileStamp>) -> Self {
        Self {
            state: RwLock::new(state),
            snapshot_path: path,
            seen: Mutex::new(stamp),
            closed: AtomicBool::new(false),
            active_sessions: AtomicUsize::new(0),
        }
    }

    /// Refuse all further sessions.
    pub fn close(&self) {
        info!("closing store");
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of sessions currently open.
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Unavailable(format!("graph lock poisoned: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, GraphState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Unavailable(format!("graph lock poisoned: {}", e)))
    }

    fn seen(&self) -> StoreResult<MutexGuard<'_, Option<FileStamp>>> {
        self.seen
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("snapshot stamp poisoned: {}", e)))
    }

    // ─── Snapshot Mode ──────────────────────────────────────────

    /// The graph as it is on disk now: the live graph if nobody else has
    /// written the snapshot since, otherwise a fresh load.
    fn current(
        &self,
        path: &Path,
        live: &GraphState,
    ) -> StoreResult<(GraphState, Option<FileStamp>)> {
        let stamp = persistence::stamp(path)?;
        if *self.seen()? == stamp {
            return Ok((live.clone(), stamp));
        }
        let state = match stamp {
            Some(_) => persistence::load(path)?,
            None => GraphState::default(),
        };
        debug!(
            path = %path.display(),
            users = state.user_count(),
            "snapshot changed on disk, reloaded"
        );
        Ok((state, stamp))
    }

    fn query_snapshot(
        &self,
        path: &Path,
        statement: Statement,
        params: &Params,
    ) -> StoreResult<Vec<Record>> {
        let _lock = SnapshotLock::shared(path)?;

        let stale = *self.seen()? != persistence::stamp(path)?;
        if stale {
            let mut state = self.write()?;
            let (fresh, stamp) = self.current(path, &state)?;
            *state = fresh;
            *self.seen()? = stamp;
        }

        self.read()?.query(statement, params)
    }

    fn apply_snapshot(
        &self,
        path: &Path,
        statement: Statement,
        params: &Params,
    ) -> StoreResult<Vec<Record>> {
        let _lock = SnapshotLock::exclusive(path)?;
        let mut state = self.write()?;

        let (mut next, _) = self.current(path, &state)?;
        let rows = next.apply(statement, params)?;
        if let Err(e) = persistence::save(&next, path) {
            warn!(error = %e, path = %path.display(), "snapshot write failed, change discarded");
            return Err(e);
        }

        *state = next;
        *self.seen()? = persistence::stamp(path)?;
        Ok(rows)
    }
}

impl GraphStore for EmbeddedStore {
    fn session(&self) -> StoreResult<Box<dyn Session + '_>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EmbeddedSession { store: self }))
    }
}

struct EmbeddedSession<'a> {
    store: &'a EmbeddedStore,
}

impl Session for EmbeddedSession<'_> {
    fn run(&mut self, statement: Statement, params: &Params) -> StoreResult<Vec<Record>> {
        if self.store.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }

        match (&self.store.snapshot_path, statement.is_write()) {
            (Some(path), true) => self.store.apply_snapshot(path, statement, params),
            (Some(path), false) => self.store.query_snapshot(path, statement, params),
            // apply checks every parameter before it mutates anything.
            (None, true) => self.store.write()?.apply(statement, params),
            (None, false) => self.store.read()?.query(statement, params),
        }
    }
}

impl Drop for EmbeddedSession<'_> {
    fn drop(&mut self) {
        self.store.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(store: &EmbeddedStore, username: &str, name: &str) {
        store
            .execute(
                Statement::CreateUser,
                &Params::new()
                    .with("username", username)
                    .with("email", format!("{}@example.com", username))
                    .with("password", "secret")
                    .with("name", name)
                    .with("created_at", Utc::now()),
            )
            .unwrap();
    }

    fn follow(store: &EmbeddedStore, a: &str, b: &str) -> Record {
        store
            .execute(
                Statement::MergeFollows,
                &Params::new().with("follower", a).with("followee", b),
            )
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_empty_store() {
        let store = EmbeddedStore::in_memory();
        let rows = store.execute(Statement::ScanUsers, &Params::new()).unwrap();
        assert!(rows.is_empty());
        let rows = store
            .execute(Statement::MatchUser, &Params::new().with("username", "ghost"))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_create_and_match_user() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");

        let rows = store
            .execute(Statement::MatchUser, &Params::new().with("username", "alice"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        let u = rows[0].get_record("u").unwrap();
        assert_eq!(u.get_str("name").unwrap(), "Alice");
        assert_eq!(u.get_str("bio").unwrap(), "");
    }

    #[test]
    fn test_unique_username_constraint() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");

        let result = store.execute(
            Statement::CreateUser,
            &Params::new()
                .with("username", "alice")
                .with("email", "other@example.com")
                .with("password", "x")
                .with("name", "Impostor")
                .with("created_at", Utc::now()),
        );
        assert!(matches!(
            result,
            Err(StoreError::ConstraintViolation {
                constraint: Constraint::UniqueUsername,
                ..
            })
        ));

        let rows = store.execute(Statement::ScanUsers, &Params::new()).unwrap();
        assert_eq!(rows.len(), 1);
        let u = rows[0].get_record("u").unwrap();
        assert_eq!(u.get_str("name").unwrap(), "Alice");
    }

    #[test]
    fn test_set_fields_leaves_nulls_untouched() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");

        let rows = store
            .execute(
                Statement::SetUserFields,
                &Params::new()
                    .with("username", "alice")
                    .with("name", None::<String>)
                    .with("bio", "hello"),
            )
            .unwrap();
        let u = rows[0].get_record("u").unwrap();
        assert_eq!(u.get_str("name").unwrap(), "Alice");
        assert_eq!(u.get_str("bio").unwrap(), "hello");

        let rows = store
            .execute(
                Statement::SetUserFields,
                &Params::new().with("username", "ghost").with("bio", "x"),
            )
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_merge_follows_is_idempotent() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");
        create(&store, "bob", "Bob");

        assert!(follow(&store, "alice", "bob").get_bool("created").unwrap());
        assert!(!follow(&store, "alice", "bob").get_bool("created").unwrap());

        let rows = store
            .execute(Statement::MatchInboundFollows, &Params::new())
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_merge_follows_reports_missing_endpoints() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");

        let row = follow(&store, "alice", "ghost");
        assert!(row.get_bool("follower_found").unwrap());
        assert!(!row.get_bool("followee_found").unwrap());
        assert!(!row.get_bool("created").unwrap());
    }

    #[test]
    fn test_self_loop_rejected() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");
        let result = store.execute(
            Statement::MergeFollows,
            &Params::new().with("follower", "alice").with("followee", "alice"),
        );
        assert!(matches!(
            result,
            Err(StoreError::ConstraintViolation {
                constraint: Constraint::NoSelfLoop,
                ..
            })
        ));
    }

    #[test]
    fn test_delete_follows() {
        let store = EmbeddedStore::in_memory();
        create(&store, "alice", "Alice");
        create(&store, "bob", "Bob");
        follow(&store, "alice", "bob");

        let params = Params::new().with("follower", "alice").with("followee", "bob");
        let row = store.execute(Statement::DeleteFollows, &params).unwrap().remove(0);
        assert!(row.get_bool("deleted").unwrap());
        let row = store.execute(Statement::DeleteFollows, &params).unwrap().remove(0);
        assert!(!row.get_bool("deleted").unwrap());

        let rows = store
            .execute(Statement::MatchConnections, &Params::new().with("username", "alice"))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_expand_two_hops_rows() {
        let store = EmbeddedStore::in_memory();
        for name in ["alice", "bob", "carol"] {
            create(&store, name, name);
        }
        follow(&store, "alice", "bob");
        follow(&store, "bob", "carol");
        follow(&store, "bob", "alice");

        let rows = store
            .execute(Statement::ExpandTwoHops, &Params::new().with("username", "alice"))
            .unwrap();
        let hop1: Vec<_> = rows.iter().filter(|r| r.get_int("hop").unwrap() == 1).collect();
        let hop2: Vec<_> = rows.iter().filter(|r| r.get_int("hop").unwrap() == 2).collect();
        assert_eq!(hop1.len(), 1);
        assert_eq!(hop1[0].get_str("username").unwrap(), "bob");
        // The loop back to the origin is returned; callers filter it.
        assert_eq!(hop2.len(), 2);
        assert!(hop2.iter().all(|r| r.get_opt_str("via").unwrap() == Some("bob")));
    }

    #[test]
    fn test_sessions_released_on_error() {
        let store = EmbeddedStore::in_memory();
        let result = store.execute(Statement::MatchUser, &Params::new());
        assert!(matches!(result, Err(StoreError::MissingParameter("username"))));
        assert_eq!(store.active_sessions(), 0);

        create(&store, "alice", "Alice");
        assert_eq!(store.active_sessions(), 0);
    }

    #[test]
    fn test_closed_store_is_unavailable() {
        let store = EmbeddedStore::in_memory();
        store.close();
        let result = store.execute(Statement::ScanUsers, &Params::new());
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.active_sessions(), 0);
    }

    fn usernames(store: &EmbeddedStore) -> Vec<String> {
        let mut names: Vec<String> = store
            .execute(Statement::ScanUsers, &Params::new())
            .unwrap()
            .iter()
            .map(|r| r.get_record("u").unwrap().get_str("username").unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    fn try_create(store: &EmbeddedStore, username: &str) -> StoreResult<Vec<Record>> {
        store.execute(
            Statement::CreateUser,
            &Params::new()
                .with("username", username)
                .with("email", format!("{}@example.com", username))
                .with("password", "secret")
                .with("name", username)
                .with("created_at", Utc::now()),
        )
    }

    #[test]
    fn test_handles_on_one_snapshot_share_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let first = EmbeddedStore::open_file(path.clone()).unwrap();
        let second = EmbeddedStore::open_file(path.clone()).unwrap();

        create(&first, "alice", "Alice");
        assert!(matches!(
            try_create(&second, "alice"),
            Err(StoreError::ConstraintViolation {
                constraint: Constraint::UniqueUsername,
                ..
            })
        ));

        create(&first, "bob", "Bob");
        create(&second, "carol", "Carol");
        assert_eq!(usernames(&first), ["alice", "bob", "carol"]);
        assert_eq!(usernames(&second), ["alice", "bob", "carol"]);

        let reopened = EmbeddedStore::open_file(path).unwrap();
        assert_eq!(usernames(&reopened), ["alice", "bob", "carol"]);
    }

    #[test]
    fn test_concurrent_handles_lose_no_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let stores: Vec<EmbeddedStore> = (0..2)
            .map(|_| EmbeddedStore::open_file(path.clone()).unwrap())
            .collect();

        std::thread::scope(|scope| {
            for (s, store) in stores.iter().enumerate() {
                for t in 0..4 {
                    scope.spawn(move || {
                        for i in 0..5 {
                            try_create(store, &format!("user_{}_{}_{}", s, t, i)).unwrap();
                        }
                    });
                }
            }
        });

        let reopened = EmbeddedStore::open_file(path).unwrap();
        assert_eq!(usernames(&reopened).len(), 40);
    }

    #[test]
    fn test_failed_save_leaves_graph_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let store = EmbeddedStore::open_file(path.clone()).unwrap();
        // The temporary snapshot cannot be created over a directory.
        std::fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(matches!(try_create(&store, "alice"), Err(StoreError::Io(_))));
        assert!(matches!(try_create(&store, "alice"), Err(StoreError::Io(_))));
        let rows = store
            .execute(Statement::MatchUser, &Params::new().with("username", "alice"))
            .unwrap();
        assert!(rows.is_empty());

        std::fs::remove_dir(path.with_extension("tmp")).unwrap();
        create(&store, "alice", "Alice");
        assert_eq!(usernames(&store), ["alice"]);
    }

    #[test]
    fn test_from_parts_skips_bad_pairs() {
        let now = Utc::now();
        let user = |name: &str| UserVertex {
            username: name.to_string(),
            email: String::new(),
            password: String::new(),
            name: name.to_string(),
            bio: String::new(),
            created_at: now,
        };
        let state = GraphState::from_parts(
            vec![user("a"), user("b"), user("a")],
            vec![
                ("a".to_string(), "b".to_string()),
                ("a".to_string(), "b".to_string()),
                ("a".to_string(), "a".to_string()),
                ("a".to_string(), "zed".to_string()),
            ],
        );
        assert_eq!(state.user_count(), 2);
        assert_eq!(state.follow_count(), 1);
    }
}
