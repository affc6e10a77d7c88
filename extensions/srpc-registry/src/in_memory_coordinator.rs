use crate::constants::PATH_SEPARATOR;
use crate::{CoordinationDriver, DriverConnector, RegistryConfig, RegistryError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

struct Node {
    data: Vec<u8>,
    /// Owning session for ephemeral nodes.
    owner: Option<u64>,
}

#[derive(Default)]
struct CoordinatorState {
    nodes: BTreeMap<String, Node>,
    live_sessions: HashSet<u64>,
    next_session_id: u64,
}

impl CoordinatorState {
    fn is_node(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    fn create(&mut self, session_id: u64, path: &str, node: Node) -> Result<(), RegistryError> {
        if !self.live_sessions.contains(&session_id) {
            return Err(RegistryError::SessionClosed);
        }

        let parent = parent_path(path)?;

        if self.is_node(path) {
            return Err(RegistryError::NodeExists(path.to_string()));
        }

        if !self.is_node(parent) {
            return Err(RegistryError::NoNode(parent.to_string()));
        }

        if self
            .nodes
            .get(parent)
            .is_some_and(|parent_node| parent_node.owner.is_some())
        {
            return Err(RegistryError::EphemeralParent(parent.to_string()));
        }

        self.nodes.insert(path.to_string(), node);
        Ok(())
    }

    fn end_session(&mut self, session_id: u64) -> usize {
        if !self.live_sessions.remove(&session_id) {
            return 0;
        }

        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.owner != Some(session_id));
        before - self.nodes.len()
    }
}

/// Process-local stand-in for a ZooKeeper-style coordination service.
///
/// Every [`session`](Self::session) behaves like an independent client
/// connection: ephemeral nodes it creates vanish when the session is closed,
/// dropped or expired. Cloning shares the same node tree.
#[derive(Clone, Default)]
pub struct InMemoryCoordinator {
    state: Arc<Mutex<CoordinatorState>>,
}

impl InMemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> InMemorySession {
        let mut state = lock(&self.state);
        state.next_session_id += 1;
        let id = state.next_session_id;
        state.live_sessions.insert(id);

        tracing::debug!(session_id = id, "opened coordination session");

        InMemorySession {
            id,
            state: Arc::clone(&self.state),
        }
    }

    /// Ends a session from the service side, as a session timeout would.
    /// Returns the number of ephemeral nodes removed.
    pub fn expire_session(&self, session_id: u64) -> usize {
        let removed = lock(&self.state).end_session(session_id);
        tracing::info!(session_id, removed, "expired coordination session");
        removed
    }

    pub fn node_exists(&self, path: &str) -> bool {
        lock(&self.state).is_node(path)
    }

    pub fn node_data(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).nodes.get(path).map(|node| node.data.clone())
    }
}

#[async_trait]
impl DriverConnector for InMemoryCoordinator {
    async fn connect(
        &self,
        config: &RegistryConfig,
    ) -> Result<Arc<dyn CoordinationDriver>, RegistryError> {
        tracing::debug!(address = %config, "connecting in-memory coordination session");
        Ok(Arc::new(self.session()))
    }
}

/// A client session to an [`InMemoryCoordinator`].
pub struct InMemorySession {
    id: u64,
    state: Arc<Mutex<CoordinatorState>>,
}

impl InMemorySession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_live(&self) -> bool {
        lock(&self.state).live_sessions.contains(&self.id)
    }

    fn ensure_live(&self, state: &CoordinatorState) -> Result<(), RegistryError> {
        if state.live_sessions.contains(&self.id) {
            Ok(())
        } else {
            Err(RegistryError::SessionClosed)
        }
    }
}

#[async_trait]
impl CoordinationDriver for InMemorySession {
    async fn create_persistent(&self, path: &str) -> Result<(), RegistryError> {
        lock(&self.state).create(
            self.id,
            path,
            Node {
                data: Vec::new(),
                owner: None,
            },
        )
    }

    async fn create_ephemeral(&self, path: &str, data: &[u8]) -> Result<(), RegistryError> {
        lock(&self.state).create(
            self.id,
            path,
            Node {
                data: data.to_vec(),
                owner: Some(self.id),
            },
        )
    }

    async fn exists(&self, path: &str) -> Result<bool, RegistryError> {
        let state = lock(&self.state);
        self.ensure_live(&state)?;
        validate_path(path)?;
        Ok(state.is_node(path))
    }

    async fn children(&self, path: &str) -> Result<Vec<String>, RegistryError> {
        let state = lock(&self.state);
        self.ensure_live(&state)?;
        validate_path(path)?;

        if !state.is_node(path) {
            return Err(RegistryError::NoNode(path.to_string()));
        }

        let prefix = if path == "/" {
            path.to_string()
        } else {
            format!("{}{}", path, PATH_SEPARATOR)
        };

        Ok(state
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let name = &key[prefix.len()..];
                (!name.contains(PATH_SEPARATOR)).then(|| name.to_string())
            })
            .collect())
    }

    async fn close(&self) -> Result<(), RegistryError> {
        let removed = lock(&self.state).end_session(self.id);
        tracing::debug!(session_id = self.id, removed, "closed coordination session");
        Ok(())
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        lock(&self.state).end_session(self.id);
    }
}

fn lock(state: &Mutex<CoordinatorState>) -> MutexGuard<'_, CoordinatorState> {
    // Every mutation is a single map operation, so poisoned state is still consistent
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn validate_path(path: &str) -> Result<(), RegistryError> {
    let valid = path == "/"
        || (path.starts_with(PATH_SEPARATOR)
            && !path.ends_with(PATH_SEPARATOR)
            && !path[1..].split(PATH_SEPARATOR).any(str::is_empty));

    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidPath(path.to_string()))
    }
}

fn parent_path(path: &str) -> Result<&str, RegistryError> {
    validate_path(path)?;

    match path.rfind(PATH_SEPARATOR) {
        Some(0) if path.len() > 1 => Ok("/"),
        Some(index) if index > 0 => Ok(&path[..index]),
        _ => Err(RegistryError::InvalidPath(path.to_string())),
    }
}
