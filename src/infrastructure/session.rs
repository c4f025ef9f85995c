use crate::error::{CommerceError, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The bearer credential shared by every authenticated remote call.
///
/// A single slot: set by login, read before each request, cleared by logout
/// or when the server reports the session expired. When a token path is
/// configured the slot is mirrored to that file so it survives restarts.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    path: Option<PathBuf>,
}

impl Session {
    /// A session that lives only in memory.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Restores the token persisted at `path`, if any.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// The token, or `NotAuthenticated` when nobody is logged in.
    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(CommerceError::NotAuthenticated)
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if let Some(path) = &self.path {
            std::fs::write(path, &token)?;
        }
        *self.token.write() = Some(token);
        Ok(())
    }

    /// Forgets the credential in memory and on disk.
    pub fn invalidate(&self) {
        *self.token.write() = None;
        if let Some(path) = &self.path
            && let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), "failed to remove token file: {e}");
        }
    }
}
