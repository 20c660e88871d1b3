use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::form::IntakeForm;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared handle to one live form. Mutations to a record are serialized by
/// the lock.
pub type SessionHandle = Arc<Mutex<IntakeForm>>;

/// Storage abstraction for in-progress form sessions.
pub trait SessionStore: Send + Sync {
    fn insert(&self, id: SessionId, session: SessionHandle) -> Result<(), StoreError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionHandle>, StoreError>;
    fn remove(&self, id: &SessionId) -> Result<Option<SessionHandle>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
