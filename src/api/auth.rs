//! The access token a session carries, and the file it is kept in between runs.

use crate::{utils, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use tracing::debug;

/// The credential sent with each API request. It is passed to the client explicitly rather than
/// read from shared state.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    /// A context with no token. Requests are sent without an `Authorization` header.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let mut ctx = Self::default();
        ctx.set(token);
        ctx
    }

    /// Loads the token saved at `path`, or an anonymous context when there is none.
    pub async fn load(path: &Path) -> Result<Self> {
        match TokenFile::load(path).await? {
            Some(file) => Ok(Self::with_token(file.access_token)),
            None => Ok(Self::anonymous()),
        }
    }

    /// Replaces the token. A blank token clears it.
    pub fn set(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The `Authorization` header value, if there is a token.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }
}

impl Debug for AuthContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The on-disk form of a saved token.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenFile {
    pub access_token: String,
    pub saved_at: DateTime<Utc>,
}

impl Debug for TokenFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenFile")
            .field("access_token", &"<redacted>")
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

impl TokenFile {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            saved_at: Utc::now(),
        }
    }

    /// Returns `None` when no token has been saved.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            debug!("No token file at {}", path.display());
            return Ok(None);
        }
        let file: TokenFile = utils::deserialize(path)
            .await
            .context("The saved token is unreadable, run 'taxmate login' again")?;
        Ok(Some(file))
    }

    /// Writes the token so that only the current user can read it.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            utils::make_dir(parent).await?;
        }
        let data = serde_json::to_string_pretty(self).context("Unable to serialize token")?;
        utils::write_private(path, data).await
    }

    /// Deletes the saved token. Returns `false` when there was none.
    pub async fn remove(path: &Path) -> Result<bool> {
        utils::remove(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bearer_only_with_token() {
        let mut ctx = AuthContext::anonymous();
        assert_eq!(ctx.bearer(), None);
        ctx.set("abc");
        assert_eq!(ctx.bearer().as_deref(), Some("Bearer abc"));
        ctx.set("   ");
        assert!(!ctx.is_authenticated());
        ctx.set("abc");
        ctx.clear();
        assert_eq!(ctx.token(), None);
    }

    #[test]
    fn test_debug_hides_token() {
        let ctx = AuthContext::with_token("secret-value");
        assert!(!format!("{ctx:?}").contains("secret-value"));
        let file = TokenFile::new("secret-value");
        assert!(!format!("{file:?}").contains("secret-value"));
    }

    #[tokio::test]
    async fn test_token_file_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".secrets").join("token.json");

        assert!(TokenFile::load(&path).await.unwrap().is_none());
        assert!(!AuthContext::load(&path).await.unwrap().is_authenticated());

        TokenFile::new("tok").save(&path).await.unwrap();
        let ctx = AuthContext::load(&path).await.unwrap();
        assert_eq!(ctx.token(), Some("tok"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert!(TokenFile::remove(&path).await.unwrap());
        assert!(!TokenFile::remove(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_token_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        utils::write(&path, "not json").await.unwrap();
        let err = TokenFile::load(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("taxmate login"));
    }
}
