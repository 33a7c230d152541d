/// HTTP client for the remote chat service
///
/// Endpoints used:
///   POST   /login                  body: {"username":"...","password":"..."}
///   GET    /bots/public            ?q=filter
///   GET    /bots/mybots            ?q=filter
///   GET    /bots/:id
///   GET    /chat/:bot_id/history
///   POST   /chat/:bot_id           body: {"message":"..."}
///   DELETE /chat/:bot_id/last_message
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::service::ChatService;
use crate::token_store::TokenStore;
use crate::types::{Bot, ErrorBody, LoginBody, Message, ReplyBody};
use async_trait::async_trait;
use bytes::Bytes;
use http::header;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

type HttpClient = Client<HttpConnector, Full<Bytes>>;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    request_timeout: Duration,
    tokens: TokenStore,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: TokenStore) -> Self {
        let http = Client::builder(TokioExecutor::new()).build_http();
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
            tokens,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Exchange credentials for an access token and keep it.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let body = serde_json::json!({ "username": username, "password": password });
        let bytes = self
            .request(Method::POST, "/login", Some(body), "Login failed")
            .await?;
        let login: LoginBody = decode(&bytes, "login response")?;
        self.tokens.set(login.access_token).await?;
        info!("Logged in as {}", username);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear().await
    }

    pub async fn get_chat_history(&self, bot_id: i64) -> Result<Vec<Message>> {
        let path = format!("/chat/{}/history", bot_id);
        let bytes = self
            .request(Method::GET, &path, None, "Failed to fetch chat history")
            .await?;
        decode(&bytes, "chat history")
    }

    pub async fn send_message(&self, bot_id: i64, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(ChatError::Validation("message must not be empty".to_string()));
        }
        let path = format!("/chat/{}", bot_id);
        let body = serde_json::json!({ "message": message });
        let bytes = self
            .request(Method::POST, &path, Some(body), "Failed to send message")
            .await?;
        let reply: ReplyBody = decode(&bytes, "chat reply")?;
        Ok(reply.response)
    }

    pub async fn delete_last_message(&self, bot_id: i64) -> Result<()> {
        let path = format!("/chat/{}/last_message", bot_id);
        self.request(Method::DELETE, &path, None, "Failed to delete last message")
            .await?;
        Ok(())
    }

    /// Issue one request and return the body of a 2xx response.
    ///
    /// Non-2xx responses become the matching error kind, carrying the
    /// service's `msg` when present and `fallback` otherwise.
    pub(crate) async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<serde_json::Value>,
        fallback: &str,
    ) -> Result<Bytes> {
        let request_id = Uuid::new_v4();
        let url = format!("{}{}", self.base_url, path_and_query);

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = self.tokens.get().await {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let payload = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Bytes::from(serde_json::to_vec(&value).map_err(ChatError::Serialization)?)
            }
            None => Bytes::new(),
        };
        let req = builder
            .body(Full::new(payload))
            .map_err(|e| ChatError::Config(format!("Invalid request URL {}: {}", url, e)))?;

        debug!(%request_id, %method, %url, "Sending request");

        let exchange = async {
            let resp = self
                .http
                .request(req)
                .await
                .map_err(|e| ChatError::Network(format!("{} {}: {}", method, path_and_query, e)))?;
            let status = resp.status();
            let bytes = resp
                .into_body()
                .collect()
                .await
                .map(|c| c.to_bytes())
                .map_err(|e| ChatError::Network(format!("body read error: {}", e)))?;
            Ok::<_, ChatError>((status, bytes))
        };

        let (status, bytes) = match timeout(self.request_timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(%request_id, "Request timed out after {:?}", self.request_timeout);
                return Err(ChatError::Network(format!(
                    "{} {} timed out after {:?}",
                    method, path_and_query, self.request_timeout
                )));
            }
        };

        debug!(%request_id, status = status.as_u16(), bytes = bytes.len(), "Response received");

        if status.is_success() {
            return Ok(bytes);
        }

        let msg = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|b| b.msg)
            .unwrap_or_else(|| fallback.to_string());
        Err(ChatError::from_status(status.as_u16(), msg))
    }
}

#[async_trait]
impl ChatService for ApiClient {
    async fn history(&self, bot_id: i64) -> Result<Vec<Message>> {
        self.get_chat_history(bot_id).await
    }

    async fn append(&self, bot_id: i64, text: &str) -> Result<String> {
        self.send_message(bot_id, text).await
    }

    async fn delete_last_exchange(&self, bot_id: i64) -> Result<()> {
        self.delete_last_message(bot_id).await
    }

    async fn bot(&self, bot_id: i64) -> Result<Bot> {
        self.get_bot(bot_id).await
    }
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| ChatError::Protocol(format!("Unexpected {} body: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_message_rejected_locally() {
        // Nothing listens on this port; a network attempt would fail differently
        let config = Config {
            api_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, TokenStore::in_memory(None));

        let err = client.send_message(1, "   \n").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let config = Config {
            api_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let client = ApiClient::new(&config, TokenStore::in_memory(None));

        let err = client.get_chat_history(1).await.unwrap_err();
        assert!(matches!(err, ChatError::Network(_)));
    }

    #[test]
    fn test_decode_maps_to_protocol_error() {
        let err = decode::<ReplyBody>(b"{\"nope\":1}", "chat reply").unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = Config {
            api_url: "http://localhost:5000/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, TokenStore::in_memory(None));
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
