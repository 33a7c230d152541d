use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFileV1 {
    version: u8,
    access_token: String,
}

/// Holds the bearer credential and mirrors it to `<data_dir>/token.json`.
///
/// Credential acquisition is someone else's job; this only keeps whatever
/// token was handed over so every request can attach it.
#[derive(Clone)]
pub struct TokenStore {
    path: Option<PathBuf>,
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Load the persisted token, if any.
    ///
    /// An unreadable or unrecognised file is treated as no token, so a
    /// later `set` or `clear` can replace it.
    pub fn open(path: &Path) -> Self {
        let token = match read_token_file(path) {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring token file {:?}: {}", path, e);
                None
            }
        };
        debug!("Token store at {:?} (token present: {})", path, token.is_some());
        Self {
            path: Some(path.to_path_buf()),
            token: Arc::new(RwLock::new(token)),
        }
    }

    /// Token store that never touches disk.
    pub fn in_memory(token: Option<String>) -> Self {
        Self {
            path: None,
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set(&self, token: String) -> Result<()> {
        if let Some(path) = &self.path {
            write_token_file(path, &token)?;
        }
        *self.token.write().await = Some(token);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path).map_err(ChatError::Io)?;
            }
        }
        *self.token.write().await = None;
        Ok(())
    }
}

fn read_token_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(ChatError::Io)?;
    let parsed: TokenFileV1 = serde_json::from_str(&raw).map_err(ChatError::Serialization)?;
    if parsed.version != 1 {
        return Err(ChatError::Config(format!(
            "Unsupported token file version: {}",
            parsed.version
        )));
    }
    Ok(Some(parsed.access_token))
}

fn write_token_file(path: &Path, token: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(ChatError::Io)?;
    }
    let file = TokenFileV1 {
        version: 1,
        access_token: token.to_string(),
    };
    let json = serde_json::to_string_pretty(&file).map_err(ChatError::Serialization)?;
    fs::write(path, json).map_err(ChatError::Io)?;
    Ok(())
}
