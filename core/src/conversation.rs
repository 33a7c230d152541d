/// Conversation view-model: one bot's transcript under optimistic updates
///
/// Sending is a two-phase commit against the service's history: the user
/// message is written locally first, then either confirmed (the reply is
/// appended) or aborted (the transcript is reloaded from the service).
/// Deleting the last exchange never touches the local copy speculatively.
use crate::error::{ChatError, Result};
use crate::service::ChatService;
use crate::types::{Bot, ConversationEvent, LoadStatus, Message, Phase, Sender};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Why an operation did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Submitted text was empty after trimming
    EmptyText,
    /// Nothing to delete
    EmptyTranscript,
    /// Another operation is in flight
    Busy(Phase),
    /// A later operation changed the transcript while this one was out
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service replied; carries the appended bot message
    Replied(Message),
    Skipped(Skip),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Exchange removed; carries the reloaded transcript length
    Deleted(usize),
    Skipped(Skip),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Transcript replaced; carries its length
    Loaded(usize),
    Skipped(Skip),
}

/// Point-in-time copy of a conversation, for rendering
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bot_id: i64,
    pub bot: Option<Bot>,
    pub messages: Vec<Message>,
    pub phase: Phase,
    pub load_status: LoadStatus,
}

struct State {
    bot: Option<Bot>,
    messages: Vec<Message>,
    phase: Phase,
    load_status: LoadStatus,
    /// Bumped by every load, send and delete as it starts
    generation: u64,
}

impl State {
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Handle to one bot's conversation.
///
/// Clones share the same state. The lock is never held across a remote
/// call; `phase` is what keeps a second operation out while one is in
/// flight.
pub struct Conversation<S: ChatService> {
    bot_id: i64,
    service: Arc<S>,
    state: Arc<RwLock<State>>,
    events: broadcast::Sender<ConversationEvent>,
}

impl<S: ChatService> Conversation<S> {
    /// Open a conversation. The transcript starts empty and `NotLoaded`;
    /// call `load_history` to fetch it.
    pub fn new(service: Arc<S>, bot_id: i64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            bot_id,
            service,
            state: Arc::new(RwLock::new(State {
                bot: None,
                messages: Vec::new(),
                phase: Phase::Idle,
                load_status: LoadStatus::NotLoaded,
                generation: 0,
            })),
            events,
        }
    }

    pub fn bot_id(&self) -> i64 {
        self.bot_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        Snapshot {
            bot_id: self.bot_id,
            bot: state.bot.clone(),
            messages: state.messages.clone(),
            phase: state.phase,
            load_status: state.load_status.clone(),
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    pub async fn load_status(&self) -> LoadStatus {
        self.state.read().await.load_status.clone()
    }

    /// Fetch bot metadata for the header.
    pub async fn load_bot(&self) -> Result<Bot> {
        let bot = self.service.bot(self.bot_id).await?;
        self.state.write().await.bot = Some(bot.clone());
        Ok(bot)
    }

    /// Replace the transcript with the service's history.
    ///
    /// On failure the transcript stays as it was and the load status
    /// records the error.
    pub async fn load_history(&self) -> Result<LoadOutcome> {
        let issued = {
            let mut state = self.state.write().await;
            if state.phase != Phase::Idle {
                return Ok(LoadOutcome::Skipped(Skip::Busy(state.phase)));
            }
            state.begin()
        };

        let fetched = self.service.history(self.bot_id).await;

        let mut state = self.state.write().await;
        // Anything issued after this fetch has a newer view of the transcript
        if state.generation != issued {
            debug!(bot_id = self.bot_id, "Dropping superseded history fetch");
            return Ok(LoadOutcome::Skipped(Skip::Superseded));
        }
        match fetched {
            Ok(messages) => {
                let count = messages.len();
                state.messages = messages;
                state.load_status = LoadStatus::Loaded;
                info!(bot_id = self.bot_id, "Loaded {} messages", count);
                self.emit(ConversationEvent::HistoryLoaded {
                    bot_id: self.bot_id,
                    count,
                });
                Ok(LoadOutcome::Loaded(count))
            }
            Err(e) => {
                warn!(bot_id = self.bot_id, "History load failed: {}", e);
                state.load_status = LoadStatus::Failed(e.to_string());
                self.emit_error(&e);
                Err(e)
            }
        }
    }

    /// Send `text` to the bot.
    ///
    /// The user message is appended (and published) before the service is
    /// contacted. If the service fails, the transcript is resynchronised
    /// from the service so the unconfirmed message does not survive, and
    /// the append error is returned.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome> {
        if text.trim().is_empty() {
            return Ok(SubmitOutcome::Skipped(Skip::EmptyText));
        }

        let optimistic_at = {
            let mut state = self.state.write().await;
            if state.phase != Phase::Idle {
                debug!(bot_id = self.bot_id, "Submit ignored while {:?}", state.phase);
                return Ok(SubmitOutcome::Skipped(Skip::Busy(state.phase)));
            }
            state.phase = Phase::Sending;
            state.begin();
            self.emit_phase(Phase::Sending);

            let user_message = Message::local(Sender::User, text);
            state.messages.push(user_message.clone());
            self.emit(ConversationEvent::MessageAppended {
                bot_id: self.bot_id,
                message: user_message,
            });
            state.messages.len() - 1
        };

        match self.service.append(self.bot_id, text).await {
            Ok(reply) => {
                let bot_message = Message::local(Sender::Bot, reply);
                let mut state = self.state.write().await;
                state.messages.push(bot_message.clone());
                state.phase = Phase::Idle;
                self.emit(ConversationEvent::MessageAppended {
                    bot_id: self.bot_id,
                    message: bot_message.clone(),
                });
                self.emit_phase(Phase::Idle);
                Ok(SubmitOutcome::Replied(bot_message))
            }
            Err(err) => {
                warn!(bot_id = self.bot_id, "Send failed, resynchronising: {}", err);
                let authoritative = self.service.history(self.bot_id).await;

                let mut state = self.state.write().await;
                match authoritative {
                    Ok(messages) => {
                        let count = messages.len();
                        state.messages = messages;
                        state.load_status = LoadStatus::Loaded;
                        self.emit(ConversationEvent::Resynced {
                            bot_id: self.bot_id,
                            count,
                        });
                    }
                    Err(resync_err) => {
                        warn!(bot_id = self.bot_id, "Resync failed: {}", resync_err);
                        state.messages.truncate(optimistic_at);
                        state.load_status = LoadStatus::Failed(resync_err.to_string());
                    }
                }
                state.phase = Phase::Idle;
                self.emit_phase(Phase::Idle);
                self.emit_error(&err);
                Err(err)
            }
        }
    }

    /// Remove the most recent exchange on the service, then reload.
    pub async fn delete_last_exchange(&self) -> Result<DeleteOutcome> {
        {
            let mut state = self.state.write().await;
            if state.phase != Phase::Idle {
                return Ok(DeleteOutcome::Skipped(Skip::Busy(state.phase)));
            }
            if state.messages.is_empty() {
                return Ok(DeleteOutcome::Skipped(Skip::EmptyTranscript));
            }
            state.phase = Phase::Deleting;
            state.begin();
            self.emit_phase(Phase::Deleting);
        }

        let result = match self.service.delete_last_exchange(self.bot_id).await {
            Ok(()) => self.service.history(self.bot_id).await.map_err(Reload::Failed),
            Err(e) => Err(Reload::NotAttempted(e)),
        };

        let mut state = self.state.write().await;
        state.phase = Phase::Idle;
        let outcome = match result {
            Ok(messages) => {
                let count = messages.len();
                state.messages = messages;
                state.load_status = LoadStatus::Loaded;
                info!(bot_id = self.bot_id, "Last exchange deleted, {} messages remain", count);
                self.emit(ConversationEvent::HistoryLoaded {
                    bot_id: self.bot_id,
                    count,
                });
                Ok(DeleteOutcome::Deleted(count))
            }
            Err(Reload::NotAttempted(e)) => {
                warn!(bot_id = self.bot_id, "Delete failed: {}", e);
                self.emit_error(&e);
                Err(e)
            }
            Err(Reload::Failed(e)) => {
                warn!(bot_id = self.bot_id, "Reload after delete failed: {}", e);
                state.load_status = LoadStatus::Failed(e.to_string());
                self.emit_error(&e);
                Err(e)
            }
        };
        self.emit_phase(Phase::Idle);
        outcome
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_phase(&self, phase: Phase) {
        self.emit(ConversationEvent::PhaseChanged {
            bot_id: self.bot_id,
            phase,
        });
    }

    fn emit_error(&self, err: &ChatError) {
        self.emit(ConversationEvent::Error {
            bot_id: self.bot_id,
            message: err.to_string(),
        });
    }
}

impl<S: ChatService> Clone for Conversation<S> {
    fn clone(&self) -> Self {
        Self {
            bot_id: self.bot_id,
            service: self.service.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
        }
    }
}

/// Where a delete-then-reload went wrong
enum Reload {
    NotAttempted(ChatError),
    Failed(ChatError),
}
