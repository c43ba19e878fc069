use std::fs;
use std::path::PathBuf;

use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use upscaler_core::SessionSnapshot;
use upscaler_engine::AtomicFileWriter;

/// Storage key of the cached sign-in record.
pub const SESSION_KEY: &str = "ai-upscaler-user";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// The `{name, email, picture}` record kept between runs under [`SESSION_KEY`].
#[derive(Debug, Clone)]
pub struct SessionCache {
    writer: AtomicFileWriter,
}

impl SessionCache {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(state_dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(file_name())
    }

    /// Returns the cached session. A malformed record is removed and ignored.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                engine_warn!("Failed to read cached session from {:?}: {}", path, err);
                return None;
            }
        };

        let user: PersistedUser = match serde_json::from_str(&content) {
            Ok(user) => user,
            Err(err) => {
                engine_warn!("Discarding malformed cached session {:?}: {}", path, err);
                self.clear();
                return None;
            }
        };

        engine_info!("Restored cached session from {:?}", path);
        Some(SessionSnapshot {
            name: user.name.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            picture: user.picture.unwrap_or_default(),
        })
    }

    pub fn store(&self, snapshot: &SessionSnapshot) {
        let user = PersistedUser {
            name: Some(snapshot.name.clone()),
            email: Some(snapshot.email.clone()),
            picture: Some(snapshot.picture.clone()),
        };
        let content = match serde_json::to_string(&user) {
            Ok(text) => text,
            Err(err) => {
                engine_error!("Failed to serialize session: {}", err);
                return;
            }
        };
        if let Err(err) = self.writer.write(&file_name(), &content) {
            engine_error!(
                "Failed to write session to {:?}: {}",
                self.writer.dir(),
                err
            );
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.writer.remove(&file_name()) {
            engine_error!("Failed to remove cached session {:?}: {}", self.path(), err);
        }
    }
}

fn file_name() -> String {
    format!("{SESSION_KEY}.json")
}
