// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file persistence for conversations and UI preferences.
//!
//! The whole state is rewritten after every mutation. Writes go to a
//! sibling temp file that is renamed into place, so a crash never leaves a
//! half-written store behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parley_core::ParleyError;
use serde::{Deserialize, Serialize};

use crate::store::{Conversation, ConversationSet};

/// UI preference flags stored next to the conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

/// Everything read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub conversations: BTreeMap<String, Conversation>,
    #[serde(default)]
    pub current_conversation_id: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl PersistedState {
    /// Splits into the conversation set and preferences.
    pub fn into_parts(self) -> (ConversationSet, Preferences) {
        (
            ConversationSet {
                conversations: self.conversations,
                current_conversation_id: self.current_conversation_id,
            },
            self.preferences,
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateRef<'a> {
    conversations: &'a BTreeMap<String, Conversation>,
    current_conversation_id: &'a Option<String>,
    preferences: &'a Preferences,
}

/// A JSON file holding the persisted state.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state. A missing file yields an empty state.
    pub async fn load(&self) -> Result<PersistedState, ParleyError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no conversation file yet");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(ParleyError::storage(e)),
        };

        let state: PersistedState = serde_json::from_slice(&bytes).map_err(ParleyError::storage)?;
        tracing::debug!(
            path = %self.path.display(),
            conversations = state.conversations.len(),
            "loaded conversations"
        );
        Ok(state)
    }

    /// Writes the full state.
    pub async fn save(
        &self,
        set: &ConversationSet,
        preferences: &Preferences,
    ) -> Result<(), ParleyError> {
        let state = StateRef {
            conversations: &set.conversations,
            current_conversation_id: &set.current_conversation_id,
            preferences,
        };
        let json = serde_json::to_vec_pretty(&state).map_err(ParleyError::storage)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ParleyError::storage)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(ParleyError::storage)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(ParleyError::storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parley_core::Message;

    use super::*;
    use crate::store::ConversationStore;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileStore::new(dir.path().join("nested/conversations.json"));
        assert_eq!(file.load().await.unwrap(), PersistedState::default());
    }

    #[tokio::test]
    async fn round_trip_preserves_set_and_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileStore::new(dir.path().join("nested/conversations.json"));

        let mut store = ConversationStore::default();
        let a = store.create();
        store.append_message(&a, Message::user("Hi")).unwrap();
        store
            .append_message(
                &a,
                Message::assistant("Hello there").with_thinking(Some("greeting".into())),
            )
            .unwrap();
        let b = store.create();
        store.rename(&b, "Scratch").unwrap();
        store.switch_to(&a).unwrap();

        let prefs = Preferences { dark_mode: true };
        file.save(store.set(), &prefs).await.unwrap();

        let (set, loaded_prefs) = file.load().await.unwrap().into_parts();
        assert_eq!(&set, store.set());
        assert_eq!(set.current_conversation_id.as_deref(), Some(a.as_str()));
        assert!(loaded_prefs.dark_mode);
    }

    #[tokio::test]
    async fn file_uses_camel_case_and_iso_dates() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileStore::new(dir.path().join("conversations.json"));
        let mut store = ConversationStore::default();
        let id = store.create();
        store.append_message(&id, Message::user("Hi")).unwrap();
        file.save(store.set(), &Preferences::default()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(file.path()).unwrap()).unwrap();
        assert_eq!(raw["currentConversationId"], id.as_str());
        assert_eq!(raw["preferences"]["darkMode"], false);
        let conversation = &raw["conversations"][id.as_str()];
        let created = conversation["createdAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
        assert_eq!(conversation["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, ParleyError::Storage { .. }));
    }
}
