//! Persisted local session state: stable user id, bearer token, theme.
//!
//! Backed by a small TOML file. Each key is independently optional and
//! recoverable: a missing `user_id` is generated once, a missing token
//! means "not logged in", a missing theme means light.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use parley_core::{ParleyError, Result, Theme};
use rand::Rng;
use serde::{Deserialize, Serialize};

const USER_ID_PREFIX: &str = "user_";
const USER_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate `user_` followed by 9 random lowercase base-36 characters.
pub fn generate_user_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..USER_ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{}{}", USER_ID_PREFIX, suffix)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<Theme>,
}

/// Process-wide session state with read-or-create init and write-through
/// mutations.
#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    user_id: String,
    state: Mutex<SessionFile>,
}

impl SessionStore {
    /// Open the session file at `path`, creating it if needed.
    ///
    /// An unreadable or corrupt file is replaced by fresh state. An existing
    /// `user_id` is kept as-is.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<SessionFile>(&content) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(error = %e, "Session file {} is corrupt, starting fresh", path.display());
                    SessionFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No session file at {}, creating one", path.display());
                SessionFile::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session file {}, starting fresh", path.display());
                SessionFile::default()
            }
        };

        let user_id = match file.user_id.clone().filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => {
                let id = generate_user_id();
                tracing::info!(user_id = %id, "Generated new user id");
                file.user_id = Some(id.clone());
                id
            }
        };
        // An empty stored token is the same as no token.
        if file.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            file.token = None;
        }

        let store = Self {
            path: Some(path.to_path_buf()),
            user_id,
            state: Mutex::new(file),
        };
        store.persist(&store.lock())?;
        Ok(store)
    }

    /// A store with no backing file.
    pub fn in_memory() -> Self {
        let user_id = generate_user_id();
        Self {
            path: None,
            user_id: user_id.clone(),
            state: Mutex::new(SessionFile {
                user_id: Some(user_id),
                ..SessionFile::default()
            }),
        }
    }

    /// Stable identifier for this client. Never changes for the store's
    /// lifetime.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The last issued bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        let mut state = self.lock();
        state.token = Some(token.to_string());
        self.persist(&state)
    }

    pub fn clear_token(&self) -> Result<()> {
        let mut state = self.lock();
        if state.token.take().is_none() {
            return Ok(());
        }
        self.persist(&state)
    }

    pub fn theme(&self) -> Theme {
        self.lock().theme.unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        let mut state = self.lock();
        state.theme = Some(theme);
        self.persist(&state)
    }

    fn lock(&self) -> MutexGuard<'_, SessionFile> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &SessionFile) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(state)
            .map_err(|e| ParleyError::Storage(format!("failed to encode session: {}", e)))?;
        // The file holds a bearer token: create it owner-only and tighten a
        // pre-existing file before the token is written.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = file.set_permissions(std::fs::Permissions::from_mode(0o600)) {
                tracing::warn!(error = %e, "Failed to restrict permissions on {}", path.display());
            }
        }
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}
