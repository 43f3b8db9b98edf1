// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session orchestration.
//!
//! [`ChatSession`] is the only writer of the [`ConversationStore`]. A send
//! goes through three steps: [`ChatSession::prepare_send`] appends the user
//! message and marks the conversation busy, the transport call runs, and
//! [`ChatSession::commit`] appends the reply (or a single error notice) and
//! releases the conversation. A cancelled send releases the conversation
//! without touching the store again.

use std::collections::HashSet;

use parley_core::wire::{ChatRequest, HistoryEntry};
use parley_core::{ChatTransport, Message, ParleyError, SettingsOverrides};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::persistence::{JsonFileStore, Preferences};
use crate::reassembler::{StreamEvent, StreamOutcome, reassemble};
use crate::store::{Conversation, ConversationStore};

/// Text of the assistant message recorded when a reply cannot be produced.
pub const ERROR_NOTICE: &str =
    "Sorry, I couldn't get a response from the model. Check that the inference server is running and try again.";

/// A send that has been recorded but not yet answered.
#[derive(Debug)]
pub struct PendingSend {
    pub conversation_id: String,
    pub request: ChatRequest,
}

/// How a send ended.
#[derive(Debug)]
pub enum SendOutcome {
    /// The assistant reply was appended.
    Replied(Message),
    /// The send failed; `notice` was appended in place of a reply.
    Failed { notice: Message, error: ParleyError },
    /// The caller abandoned the stream; nothing was appended.
    Cancelled,
}

/// Orchestrates sends over a [`ChatTransport`] into a [`ConversationStore`].
pub struct ChatSession<T> {
    transport: T,
    store: ConversationStore,
    file: Option<JsonFileStore>,
    preferences: Preferences,
    settings: SettingsOverrides,
    streaming: bool,
    in_flight: HashSet<String>,
}

impl<T: ChatTransport> ChatSession<T> {
    /// Creates a session over an in-memory store.
    pub fn new(transport: T, store: ConversationStore) -> Self {
        Self {
            transport,
            store,
            file: None,
            preferences: Preferences::default(),
            settings: SettingsOverrides::default(),
            streaming: true,
            in_flight: HashSet::new(),
        }
    }

    /// Opens a session backed by `file`, loading whatever it holds.
    pub async fn open(
        transport: T,
        file: JsonFileStore,
        history_pairs: usize,
    ) -> Result<Self, ParleyError> {
        let (set, preferences) = file.load().await?.into_parts();
        let store = ConversationStore::from_set(set, history_pairs);
        info!(
            path = %file.path().display(),
            conversations = store.len(),
            "conversation store opened"
        );
        let mut session = Self::new(transport, store);
        session.file = Some(file);
        session.preferences = preferences;
        Ok(session)
    }

    /// Replaces the settings sent with every request.
    pub fn with_settings(mut self, settings: SettingsOverrides) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &SettingsOverrides {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsOverrides {
        &mut self.settings
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Whether plain sends use the streaming endpoint.
    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn set_streaming(&mut self, on: bool) {
        self.streaming = on;
    }

    /// Whether a send into `id` is awaiting its reply.
    pub fn is_busy(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.store.current()
    }

    pub async fn set_dark_mode(&mut self, on: bool) -> Result<(), ParleyError> {
        self.preferences.dark_mode = on;
        self.persist().await
    }

    pub async fn new_conversation(&mut self) -> Result<String, ParleyError> {
        let id = self.store.create();
        self.persist().await?;
        Ok(id)
    }

    pub async fn switch_to(&mut self, id: &str) -> Result<(), ParleyError> {
        self.store.switch_to(id)?;
        self.persist().await
    }

    pub async fn rename(&mut self, id: &str, title: &str) -> Result<(), ParleyError> {
        self.store.rename(id, title)?;
        self.persist().await
    }

    pub async fn delete(&mut self, id: &str) -> Result<Conversation, ParleyError> {
        let removed = self.store.delete(id)?;
        self.in_flight.remove(id);
        self.persist().await?;
        Ok(removed)
    }

    pub async fn clear(&mut self, id: &str) -> Result<(), ParleyError> {
        self.store.clear_messages(id)?;
        self.persist().await
    }

    /// Records the user message in the current conversation (creating one if
    /// needed) and builds the relay request.
    ///
    /// Fails with [`ParleyError::StreamInFlight`] while a previous send into
    /// the same conversation is unanswered. If the store cannot be saved the
    /// session is left exactly as it was before the call.
    pub async fn prepare_send(&mut self, text: &str) -> Result<PendingSend, ParleyError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParleyError::BadRequest {
                message: "message must not be empty".to_string(),
            });
        }

        let before = self.store.clone();
        let conversation_id = match self.store.current_id() {
            Some(id) => id.to_string(),
            None => self.store.create(),
        };
        if self.in_flight.contains(&conversation_id) {
            return Err(ParleyError::StreamInFlight {
                id: conversation_id,
            });
        }

        let history: Vec<HistoryEntry> = self
            .store
            .get(&conversation_id)
            .map(|c| c.messages.iter().map(HistoryEntry::from).collect())
            .unwrap_or_default();
        let request = ChatRequest {
            message: text.to_string(),
            settings: self.settings.clone(),
            history,
        };

        self.store
            .append_message(&conversation_id, Message::user(text))?;
        if let Err(e) = self.persist().await {
            // Unsaved sends leave no trace in memory either.
            self.store = before;
            return Err(e);
        }
        self.in_flight.insert(conversation_id.clone());

        debug!(
            conversation = %conversation_id,
            history = request.history.len(),
            "send prepared"
        );
        Ok(PendingSend {
            conversation_id,
            request,
        })
    }

    /// Records the result of a prepared send and releases the conversation.
    ///
    /// Errors become a single [`ERROR_NOTICE`] message. When the conversation
    /// was deleted meanwhile the reply is dropped.
    pub async fn commit(
        &mut self,
        pending: PendingSend,
        result: Result<Message, ParleyError>,
    ) -> Result<SendOutcome, ParleyError> {
        let id = pending.conversation_id;
        self.in_flight.remove(&id);

        let (message, outcome) = match result {
            Ok(reply) => (reply.clone(), SendOutcome::Replied(reply)),
            Err(error) => {
                warn!(conversation = %id, error = %error, "send failed");
                let notice = Message::assistant(ERROR_NOTICE);
                (
                    notice.clone(),
                    SendOutcome::Failed { notice, error },
                )
            }
        };

        match self.store.append_message(&id, message) {
            Ok(()) => self.persist().await?,
            Err(ParleyError::NotFound { .. }) => {
                debug!(conversation = %id, "conversation deleted before reply arrived");
            }
            Err(e) => return Err(e),
        }
        Ok(outcome)
    }

    /// Releases a prepared send without writing anything.
    pub fn abandon(&mut self, pending: PendingSend) -> SendOutcome {
        self.in_flight.remove(&pending.conversation_id);
        debug!(conversation = %pending.conversation_id, "send cancelled");
        SendOutcome::Cancelled
    }

    /// Sends `text` and waits for the whole reply.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome, ParleyError> {
        let pending = self.prepare_send(text).await?;
        let result = self
            .transport
            .complete(&pending.request)
            .await
            .map(Message::assistant);
        self.commit(pending, result).await
    }

    /// Sends `text` over the streaming endpoint, surfacing deltas through
    /// `on_event` as they arrive.
    pub async fn send_streaming(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
        on_event: impl FnMut(StreamEvent<'_>),
    ) -> Result<SendOutcome, ParleyError> {
        let pending = self.prepare_send(text).await?;

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            stream = self.transport.stream(&pending.request) => Some(stream),
        };
        let stream = match started {
            None => return Ok(self.abandon(pending)),
            Some(Ok(stream)) => stream,
            Some(Err(e)) => return self.commit(pending, Err(e)).await,
        };

        match reassemble(stream, cancel, on_event).await {
            StreamOutcome::Completed(message) => self.commit(pending, Ok(message)).await,
            StreamOutcome::Failed(e) => self.commit(pending, Err(e)).await,
            StreamOutcome::Cancelled => Ok(self.abandon(pending)),
        }
    }

    async fn persist(&self) -> Result<(), ParleyError> {
        match &self.file {
            Some(file) => file.save(self.store.set(), &self.preferences).await,
            None => Ok(()),
        }
    }
}
