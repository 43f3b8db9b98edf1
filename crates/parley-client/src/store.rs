// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversation store.
//!
//! Owns every [`Conversation`] and the current-conversation pointer. Only the
//! chat session mutates it; streamed text reaches it as a finished
//! [`Message`] value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parley_core::{Message, ParleyError, Role};
use serde::{Deserialize, Serialize};

/// Title shown until the first user message names the conversation.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Characters kept from the first user message when deriving a title.
pub const TITLE_MAX_CHARS: usize = 20;

/// Default number of user/assistant pairs kept per conversation.
pub const DEFAULT_HISTORY_PAIRS: usize = 20;

/// One conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the user renames the conversation; disables auto titles.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom_title: bool,
}

impl Conversation {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            custom_title: false,
        }
    }

    /// Timestamp of the newest message, if any.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.timestamp)
    }

    /// Moves `updated_at` forward to `at`, never backwards.
    fn touch(&mut self, at: DateTime<Utc>) {
        let floor = self.created_at.max(self.updated_at);
        self.updated_at = at.max(floor);
    }
}

/// Derives a title from a user message: its first line, cut to
/// [`TITLE_MAX_CHARS`] characters with an ellipsis when longer.
pub fn derive_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or(content).trim();
    if first_line.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if first_line.chars().count() <= TITLE_MAX_CHARS {
        return first_line.to_string();
    }
    first_line.chars().take(TITLE_MAX_CHARS).collect::<String>() + "..."
}

/// Conversations keyed by id plus the current pointer, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSet {
    #[serde(default)]
    pub conversations: BTreeMap<String, Conversation>,
    #[serde(default)]
    pub current_conversation_id: Option<String>,
}

/// The conversation store with its trimming policy.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    set: ConversationSet,
    history_pairs: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_PAIRS)
    }
}

impl ConversationStore {
    /// Creates an empty store keeping at most `history_pairs` user/assistant
    /// pairs per conversation (`0` keeps everything).
    pub fn new(history_pairs: usize) -> Self {
        Self {
            set: ConversationSet::default(),
            history_pairs,
        }
    }

    /// Rebuilds a store from a persisted set, repairing a dangling current
    /// pointer.
    pub fn from_set(mut set: ConversationSet, history_pairs: usize) -> Self {
        if let Some(id) = &set.current_conversation_id
            && !set.conversations.contains_key(id)
        {
            tracing::warn!(%id, "persisted current conversation is missing, reassigning");
            set.current_conversation_id = None;
        }
        let mut store = Self { set, history_pairs };
        if store.set.current_conversation_id.is_none() {
            store.set.current_conversation_id = store.most_recent_id();
        }
        store
    }

    /// The persistable view of the store.
    pub fn set(&self) -> &ConversationSet {
        &self.set
    }

    pub fn history_pairs(&self) -> usize {
        self.history_pairs
    }

    pub fn len(&self) -> usize {
        self.set.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.set.conversations.get(id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.set.current_conversation_id.as_deref()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current_id().and_then(|id| self.get(id))
    }

    /// Conversations, most recently updated first.
    pub fn list(&self) -> Vec<&Conversation> {
        let mut all: Vec<&Conversation> = self.set.conversations.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Creates an empty conversation and makes it current. Returns its id.
    pub fn create(&mut self) -> String {
        let conversation = Conversation::new(Utc::now());
        let id = conversation.id.clone();
        tracing::debug!(%id, "conversation created");
        self.set.conversations.insert(id.clone(), conversation);
        self.set.current_conversation_id = Some(id.clone());
        id
    }

    /// Makes `id` the current conversation.
    pub fn switch_to(&mut self, id: &str) -> Result<(), ParleyError> {
        self.ensure(id)?;
        self.set.current_conversation_id = Some(id.to_string());
        Ok(())
    }

    /// Sets a custom title. A blank title reverts to the derived one.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<(), ParleyError> {
        let conversation = self.get_mut(id)?;
        let title = title.trim();
        if title.is_empty() {
            conversation.custom_title = false;
            conversation.title = conversation
                .messages
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| derive_title(&m.content))
                .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        } else {
            conversation.custom_title = true;
            conversation.title = title.to_string();
        }
        conversation.touch(Utc::now());
        Ok(())
    }

    /// Removes a conversation. When it was current, the most recently
    /// updated remaining conversation becomes current, or none.
    pub fn delete(&mut self, id: &str) -> Result<Conversation, ParleyError> {
        let removed = self
            .set
            .conversations
            .remove(id)
            .ok_or_else(|| ParleyError::NotFound { id: id.to_string() })?;

        if self.set.current_conversation_id.as_deref() == Some(id) {
            self.set.current_conversation_id = self.most_recent_id();
        }
        tracing::debug!(%id, current = ?self.set.current_conversation_id, "conversation deleted");
        Ok(removed)
    }

    /// Appends a message, keeping timestamps non-decreasing.
    ///
    /// The first user message names the conversation unless it was renamed.
    /// When the pair capacity is exceeded the oldest messages are dropped.
    pub fn append_message(&mut self, id: &str, mut message: Message) -> Result<(), ParleyError> {
        let history_pairs = self.history_pairs;
        let conversation = self.get_mut(id)?;

        let floor = conversation
            .last_activity()
            .unwrap_or(conversation.created_at)
            .max(conversation.created_at);
        if message.timestamp < floor {
            message.timestamp = floor;
        }

        let names_conversation = !conversation.custom_title
            && message.role == Role::User
            && !conversation.messages.iter().any(|m| m.role == Role::User);
        if names_conversation {
            conversation.title = derive_title(&message.content);
        }

        let at = message.timestamp;
        conversation.messages.push(message);
        if history_pairs > 0 {
            let cap = history_pairs * 2;
            let excess = conversation.messages.len().saturating_sub(cap);
            if excess > 0 {
                conversation.messages.drain(..excess);
                tracing::debug!(%id, dropped = excess, "trimmed conversation history");
            }
        }
        conversation.touch(at.max(Utc::now()));
        Ok(())
    }

    /// Removes every message and restores the default title unless renamed.
    pub fn clear_messages(&mut self, id: &str) -> Result<(), ParleyError> {
        let conversation = self.get_mut(id)?;
        conversation.messages.clear();
        if !conversation.custom_title {
            conversation.title = DEFAULT_TITLE.to_string();
        }
        conversation.touch(Utc::now());
        Ok(())
    }

    fn ensure(&self, id: &str) -> Result<(), ParleyError> {
        if self.set.conversations.contains_key(id) {
            Ok(())
        } else {
            Err(ParleyError::NotFound { id: id.to_string() })
        }
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Conversation, ParleyError> {
        self.set
            .conversations
            .get_mut(id)
            .ok_or_else(|| ParleyError::NotFound { id: id.to_string() })
    }

    fn most_recent_id(&self) -> Option<String> {
        self.list().first().map(|c| c.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn store_with_one() -> (ConversationStore, String) {
        let mut store = ConversationStore::default();
        let id = store.create();
        (store, id)
    }

    #[test]
    fn create_makes_conversation_current() {
        let (store, id) = store_with_one();
        assert_eq!(store.current_id(), Some(id.as_str()));
        let c = store.current().unwrap();
        assert_eq!(c.title, DEFAULT_TITLE);
        assert!(c.messages.is_empty());
        assert!(c.updated_at >= c.created_at);
    }

    #[test]
    fn first_user_message_names_conversation() {
        let (mut store, id) = store_with_one();
        store.append_message(&id, Message::user("Hi")).unwrap();
        store
            .append_message(&id, Message::assistant("Hello there"))
            .unwrap();
        store.append_message(&id, Message::user("Second")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Hi");
    }

    #[test]
    fn long_titles_are_truncated_by_characters() {
        assert_eq!(
            derive_title("How do I write a parser in Rust?"),
            "How do I write a par..."
        );
        assert_eq!(derive_title("日本語のタイトルはとても長いのでここで切り詰めます"), "日本語のタイトルはとても長いのでここで切...");
        assert_eq!(derive_title("exactly twenty chars"), "exactly twenty chars");
        assert_eq!(derive_title("  \n"), DEFAULT_TITLE);
    }

    #[test]
    fn rename_sticks_and_blank_reverts() {
        let (mut store, id) = store_with_one();
        store.rename(&id, "Parser notes").unwrap();
        store.append_message(&id, Message::user("Hi")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Parser notes");

        store.rename(&id, "   ").unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Hi");
    }

    #[test]
    fn append_clamps_out_of_order_timestamps() {
        let (mut store, id) = store_with_one();
        let first = Message::user("one");
        let mut second = Message::assistant("two");
        second.timestamp = first.timestamp - Duration::seconds(30);

        store.append_message(&id, first).unwrap();
        store.append_message(&id, second).unwrap();

        let c = store.get(&id).unwrap();
        assert!(c.messages[1].timestamp >= c.messages[0].timestamp);
        assert!(c.messages[0].timestamp >= c.created_at);
        assert!(c.updated_at >= c.messages[1].timestamp);
    }

    #[test]
    fn history_is_trimmed_to_pair_capacity() {
        let mut store = ConversationStore::new(2);
        let id = store.create();
        for i in 0..3 {
            store.append_message(&id, Message::user(format!("q{i}"))).unwrap();
            store
                .append_message(&id, Message::assistant(format!("a{i}")))
                .unwrap();
        }
        let contents: Vec<&str> = store
            .get(&id)
            .unwrap()
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(store.get(&id).unwrap().title, "q0");
    }

    #[test]
    fn zero_capacity_keeps_everything() {
        let mut store = ConversationStore::new(0);
        let id = store.create();
        for i in 0..50 {
            store.append_message(&id, Message::user(format!("{i}"))).unwrap();
        }
        assert_eq!(store.get(&id).unwrap().messages.len(), 50);
    }

    #[test]
    fn deleting_current_reassigns_then_clears() {
        let mut store = ConversationStore::default();
        let a = store.create();
        let b = store.create();
        assert_eq!(store.current_id(), Some(b.as_str()));

        store.delete(&b).unwrap();
        assert_eq!(store.current_id(), Some(a.as_str()));

        store.delete(&a).unwrap();
        assert_eq!(store.current_id(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn deleting_other_keeps_current() {
        let mut store = ConversationStore::default();
        let a = store.create();
        let b = store.create();
        store.delete(&a).unwrap();
        assert_eq!(store.current_id(), Some(b.as_str()));
    }

    #[test]
    fn deleting_twice_is_not_found_without_mutation() {
        let (mut store, id) = store_with_one();
        let other = store.create();
        store.delete(&id).unwrap();
        let before = store.set().clone();

        let err = store.delete(&id).unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));
        assert_eq!(store.set(), &before);
        assert_eq!(store.current_id(), Some(other.as_str()));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = ConversationStore::default();
        assert!(store.switch_to("nope").is_err());
        assert!(store.rename("nope", "x").is_err());
        assert!(store.append_message("nope", Message::user("x")).is_err());
        assert!(store.clear_messages("nope").is_err());
    }

    #[test]
    fn clear_resets_auto_title() {
        let (mut store, id) = store_with_one();
        store.append_message(&id, Message::user("Hi")).unwrap();
        let updated = store.get(&id).unwrap().updated_at;
        store.clear_messages(&id).unwrap();

        let c = store.get(&id).unwrap();
        assert!(c.messages.is_empty());
        assert_eq!(c.title, DEFAULT_TITLE);
        assert!(c.updated_at >= updated);
    }

    #[test]
    fn from_set_repairs_dangling_pointer() {
        let (mut store, id) = store_with_one();
        store.append_message(&id, Message::user("keep")).unwrap();
        let mut set = store.set().clone();
        set.current_conversation_id = Some("gone".into());

        let restored = ConversationStore::from_set(set, 20);
        assert_eq!(restored.current_id(), Some(id.as_str()));
    }

    #[test]
    fn switch_changes_current() {
        let mut store = ConversationStore::default();
        let a = store.create();
        let _b = store.create();
        store.switch_to(&a).unwrap();
        assert_eq!(store.current_id(), Some(a.as_str()));
    }
}
