/// Botchat - client core for a chatbot platform
///
/// Talks to the platform's REST service (history, replies, bot directory)
/// and keeps one conversation transcript consistent under optimistic sends.

pub mod error;
pub mod config;
pub mod types;
pub mod token_store;
pub mod service;
pub mod api_client;
pub mod directory;
pub mod conversation;
pub mod cli_app;

pub use api_client::ApiClient;
pub use config::Config;
pub use conversation::{Conversation, DeleteOutcome, LoadOutcome, Skip, SubmitOutcome};
pub use error::{ChatError, Result};
pub use service::ChatService;
