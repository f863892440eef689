use std::borrow::Cow;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Discord rejects message content above this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

const TRUNCATED_LENGTH: usize = 1990;
const TRUNCATION_MARKER: &str = "\n... (truncated)";
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

pub fn truncate_message(content: &str) -> Cow<'_, str> {
    if content.chars().count() <= MESSAGE_LIMIT {
        return Cow::Borrowed(content);
    }

    let mut truncated: String = content.chars().take(TRUNCATED_LENGTH).collect();
    truncated.push_str(TRUNCATION_MARKER);
    Cow::Owned(truncated)
}

#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    webhook_url: Option<String>,
    agent: ureq::Agent,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url: webhook_url.filter(|url| !url.is_empty()),
            agent: ureq::AgentBuilder::new().timeout(WEBHOOK_TIMEOUT).build(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Posts `content` to the webhook. Returns `false` when no webhook is set.
    pub fn send(&self, content: &str) -> Result<bool> {
        let Some(url) = &self.webhook_url else {
            warn!("discord webhook url not set, skipping notification");
            return Ok(false);
        };

        let content = truncate_message(content);
        self.agent
            .post(url)
            .send_json(WebhookMessage { content: &content })
            .map_err(|e| Error::http(url, e))?;

        info!("discord notification sent");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::test_support::StubServer;

    #[test]
    fn short_messages_untouched() {
        let message = "x".repeat(MESSAGE_LIMIT);
        assert!(matches!(truncate_message(&message), Cow::Borrowed(_)));
    }

    #[test]
    fn long_messages_truncated() {
        let message = "é".repeat(MESSAGE_LIMIT + 1);
        let truncated = truncate_message(&message);

        assert_eq!(truncated.chars().count(), TRUNCATED_LENGTH + TRUNCATION_MARKER.len());
        assert!(truncated.ends_with("\n... (truncated)"));
        assert!(truncated.starts_with("éé"));
    }

    #[test]
    fn unset_webhook_skips() {
        let notifier = DiscordNotifier::new(Some(String::new()));
        assert!(!notifier.is_configured());
        assert!(!notifier.send("hello").unwrap());
    }

    #[tokio::test]
    async fn posts_content_json() {
        let stub = StubServer::start().await;
        let notifier = DiscordNotifier::new(Some(format!("{}/webhook", stub.base)));
        let long = "x".repeat(MESSAGE_LIMIT + 50);

        let sent = tokio::task::spawn_blocking(move || {
            notifier.send("**Tracker Update Detected:**\n➕ Added: **A**").unwrap();
            notifier.send(&long).unwrap()
        })
        .await
        .unwrap();
        assert!(sent);

        let posts = stub.requests_to("/webhook");
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].method, Method::POST);

        let first: serde_json::Value = serde_json::from_str(&posts[0].body).unwrap();
        assert_eq!(first, json!({ "content": "**Tracker Update Detected:**\n➕ Added: **A**" }));

        let second: serde_json::Value = serde_json::from_str(&posts[1].body).unwrap();
        let content = second["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), TRUNCATED_LENGTH + TRUNCATION_MARKER.len());
        assert!(content.ends_with(TRUNCATION_MARKER));
    }
}
