/// Bot directory: public bots and the caller's own bots
/// Filtering is done by the service; nothing is merged client-side.
use crate::api_client::{decode, ApiClient};
use crate::error::Result;
use crate::types::Bot;
use hyper::Method;

const PLACEHOLDER_PORTRAIT: &str = "/placeholder.svg";

/// Which of the two disjoint collections to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotScope {
    Public,
    Mine,
}

impl BotScope {
    fn path(self) -> &'static str {
        match self {
            BotScope::Public => "/bots/public",
            BotScope::Mine => "/bots/mybots",
        }
    }

    fn failure(self) -> &'static str {
        match self {
            BotScope::Public => "Failed to fetch public bots",
            BotScope::Mine => "Failed to fetch my bots",
        }
    }
}

/// Path and query for a directory listing. Blank filters are dropped.
pub fn listing_path(scope: BotScope, filter: Option<&str>) -> String {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(q) => format!("{}?q={}", scope.path(), urlencoding::encode(q)),
        None => scope.path().to_string(),
    }
}

/// Resolve the portrait reference of a bot to something displayable
pub fn portrait_url(base_url: &str, bot: &Bot) -> String {
    if let Some(url) = bot.image_url.as_deref().filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    match bot.image_filename.as_deref().filter(|f| !f.is_empty()) {
        Some(filename) => format!("{}/uploads/bots/{}", base_url, filename),
        None => PLACEHOLDER_PORTRAIT.to_string(),
    }
}

impl ApiClient {
    pub async fn list_bots(&self, scope: BotScope, filter: Option<&str>) -> Result<Vec<Bot>> {
        let path = listing_path(scope, filter);
        let bytes = self.request(Method::GET, &path, None, scope.failure()).await?;
        decode(&bytes, "bot list")
    }

    pub async fn get_bot(&self, bot_id: i64) -> Result<Bot> {
        let path = format!("/bots/{}", bot_id);
        let bytes = self
            .request(Method::GET, &path, None, "Failed to fetch bot")
            .await?;
        decode(&bytes, "bot")
    }

    pub fn portrait_url(&self, bot: &Bot) -> String {
        portrait_url(self.base_url(), bot)
    }
}
