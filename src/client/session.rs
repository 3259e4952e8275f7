use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::ClientError;
use crate::user::UserView;

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the serialized user profile
pub const USER_KEY: &str = "user";

/// The signed-in user as cached on the device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub user: UserView,
}

/// Device-side session cache injected into `ApiClient`
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSession>, ClientError>;
    async fn store(&self, session: &StoredSession) -> Result<(), ClientError>;
    async fn clear(&self) -> Result<(), ClientError>;
}

/// Session store that lives only as long as the process
#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        Ok(self.session.read().await.clone())
    }

    async fn store(&self, session: &StoredSession) -> Result<(), ClientError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        self.session.write().await.take();
        Ok(())
    }
}

/// Session store keeping one file per key inside a directory
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the platform data directory
    pub fn in_default_dir() -> Result<Self, ClientError> {
        let dirs = ProjectDirs::from("com", "bookshelf", "bookshelf").ok_or_else(|| {
            ClientError::Session("no home directory available for session storage".to_string())
        })?;
        Ok(Self::new(dirs.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    async fn read_key(&self, key: &str) -> Result<Option<String>, ClientError> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(session_error(key, e)),
        }
    }

    async fn remove_key(&self, key: &str) -> Result<(), ClientError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(session_error(key, e)),
        }
    }
}

fn session_error(key: &str, e: impl std::fmt::Display) -> ClientError {
    ClientError::Session(format!("{key}: {e}"))
}

#[async_trait]
impl SessionStore for FileSessionStore {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        let (Some(token), Some(user)) = (
            self.read_key(TOKEN_KEY).await?,
            self.read_key(USER_KEY).await?,
        ) else {
            debug!("No stored session");
            return Ok(None);
        };

        let user: UserView = match serde_json::from_str(&user) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Stored user profile is unreadable, ignoring session");
                return Ok(None);
            }
        };

        Ok(Some(StoredSession {
            token: token.trim().to_string(),
            user,
        }))
    }

    #[instrument(skip(self, session), fields(dir = %self.dir.display()))]
    async fn store(&self, session: &StoredSession) -> Result<(), ClientError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| session_error("directory", e))?;

        let user = serde_json::to_string(&session.user).map_err(|e| session_error(USER_KEY, e))?;
        tokio::fs::write(self.path(TOKEN_KEY), &session.token)
            .await
            .map_err(|e| session_error(TOKEN_KEY, e))?;
        tokio::fs::write(self.path(USER_KEY), user)
            .await
            .map_err(|e| session_error(USER_KEY, e))?;

        debug!(user_id = %session.user.id, "Session stored");
        Ok(())
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn clear(&self) -> Result<(), ClientError> {
        self.remove_key(TOKEN_KEY).await?;
        self.remove_key(USER_KEY).await?;
        debug!("Session cleared");
        Ok(())
    }
}
