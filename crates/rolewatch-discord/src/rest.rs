//! Discord REST client implementing the direct-message port.
//!
//! Sending a DM is two calls: open (or reuse) the DM channel for the
//! recipient, then post the message into it. A 403 on either call is the
//! recipient-side rejection the notifier logs as a warning.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use rolewatch_core::{
    domain::{MemberSnapshot, UserId},
    messaging::{DirectMessenger, SendError},
};

pub struct DiscordRest {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    // DM channel ids are stable per recipient; memoized for the process.
    dm_channels: Mutex<HashMap<UserId, u64>>,
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

impl DiscordRest {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            dm_channels: Mutex::new(HashMap::new()),
        }
    }

    async fn dm_channel_id(&self, user: UserId) -> Result<u64, SendError> {
        if let Some(&id) = self.dm_channels.lock().await.get(&user) {
            return Ok(id);
        }

        let url = format!("{}/users/@me/channels", self.api_base);
        let payload = serde_json::json!({ "recipient_id": user.0.to_string() });
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Other(format!("create DM channel failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        let channel: DmChannel = response
            .json()
            .await
            .map_err(|e| SendError::Other(format!("bad DM channel response: {e}")))?;
        let id = channel
            .id
            .parse::<u64>()
            .map_err(|_| SendError::Other(format!("bad DM channel id: {}", channel.id)))?;

        self.dm_channels.lock().await.insert(user, id);
        Ok(id)
    }
}

#[async_trait]
impl DirectMessenger for DiscordRest {
    async fn send_direct_message(
        &self,
        member: &MemberSnapshot,
        text: &str,
    ) -> Result<(), SendError> {
        let channel = self.dm_channel_id(member.id).await?;

        let url = format!("{}/channels/{channel}/messages", self.api_base);
        let payload = serde_json::json!({ "content": text });
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Other(format!("send DM failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        Ok(())
    }
}

/// 403 on a DM call means the recipient disallows messages from this bot;
/// anything else is reported with status and body excerpt.
fn classify(status: reqwest::StatusCode, body: &str) -> SendError {
    if status == reqwest::StatusCode::FORBIDDEN {
        SendError::Forbidden
    } else {
        SendError::Other(format!("discord api error {status}: {}", excerpt(body)))
    }
}

fn excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    if body.chars().count() <= MAX_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_status_maps_to_forbidden() {
        let err = classify(
            reqwest::StatusCode::FORBIDDEN,
            r#"{"message": "Cannot send messages to this user", "code": 50007}"#,
        );
        assert!(matches!(err, SendError::Forbidden));
    }

    #[test]
    fn other_statuses_carry_detail() {
        let err = classify(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        match err {
            SendError::Other(detail) => {
                assert!(detail.contains("500"));
                assert!(detail.contains("boom"));
            }
            SendError::Forbidden => panic!("500 must not classify as forbidden"),
        }
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let cut = excerpt(&long);
        assert!(cut.len() < long.len());
        assert!(cut.ends_with("..."));

        assert_eq!(excerpt("short"), "short");
    }
}
