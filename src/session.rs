//! Per-chat state kept between chat messages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{self, StoreError};

/// Identifies a message the transport already delivered, so it can be edited
/// or deleted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Words of the last reverse search, in result order.
    #[serde(default)]
    pub last_results: Vec<String>,
    /// Tag carried by the navigation buttons of `last_results`; buttons from
    /// an earlier search carry another tag and are ignored.
    #[serde(default)]
    pub nonce: Option<String>,
    /// Message showing those results.
    #[serde(default)]
    pub last_message: Option<MessageRef>,
}

/// Sessions by chat id, persisted as one JSON object keyed by the id.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    sessions: HashMap<i64, SessionState>,
}

impl SessionStore {
    /// Load sessions from `path`. A missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        let sessions: HashMap<i64, SessionState> = if path.exists() {
            store::load(path).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable sessions");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), chats = sessions.len(), "sessions loaded");
        Self {
            path: path.to_path_buf(),
            sessions,
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        store::save(&self.path, &self.sessions)
    }

    pub fn get(&self, chat_id: i64) -> Option<&SessionState> {
        self.sessions.get(&chat_id)
    }

    pub fn entry(&mut self, chat_id: i64) -> &mut SessionState {
        self.sessions.entry(chat_id).or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(&dir.path().join("sessions.json"));
        assert!(sessions.is_empty());
    }

    #[test]
    fn persists_and_reloads_by_chat_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let mut sessions = SessionStore::load(&path);
        let state = sessions.entry(-1001);
        state.last_results = vec!["albo".into(), "ebúrneo".into()];
        state.last_message = Some(MessageRef {
            chat_id: -1001,
            message_id: 7,
        });
        sessions.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"-1001\""), "keys are JSON strings: {raw}");

        let reloaded = SessionStore::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(-1001), sessions.get(-1001));
    }

    #[test]
    fn reads_hand_written_file_with_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, r#"{"42": {"last_results": ["boca"]}}"#).unwrap();

        let sessions = SessionStore::load(&path);
        let state = sessions.get(42).unwrap();
        assert_eq!(state.last_results, vec!["boca".to_string()]);
        assert!(state.last_message.is_none());
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "nope").unwrap();
        assert!(SessionStore::load(&path).is_empty());
    }
}
