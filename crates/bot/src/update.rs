//! Transport-neutral chat update and reply.
//!
//! A gateway in front of the bot translates the messenger's own payloads
//! into [`ChatUpdate`] and renders [`BotReply`] back.

use serde::{Deserialize, Serialize};

use crate::session::ChatId;

/// One inbound event: a message or a button press.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUpdate {
    pub chat_id: ChatId,
    pub user_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Data attached to the pressed button, if this is a button press.
    #[serde(default)]
    pub callback: Option<String>,
}

impl ChatUpdate {
    /// Message text with surrounding whitespace removed, if non-blank.
    #[must_use]
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Command name and argument when the text starts with `/`.
    ///
    /// `/catalog@boutique_bot Dresses` yields `("catalog", Some("Dresses"))`.
    #[must_use]
    pub fn command(&self) -> Option<(&str, Option<&str>)> {
        let text = self.trimmed_text()?.strip_prefix('/')?;
        let (head, rest) = text
            .split_once(char::is_whitespace)
            .map_or((text, None), |(head, rest)| (head, Some(rest.trim())));
        let name = head.split('@').next().unwrap_or(head);
        Some((name, rest.filter(|r| !r.is_empty())))
    }
}

/// The bot's answer to an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: None,
        }
    }

    pub fn with_link(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(link.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(value: &str) -> ChatUpdate {
        ChatUpdate {
            text: Some(value.to_string()),
            ..ChatUpdate::default()
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(text("/cart").command(), Some(("cart", None)));
        assert_eq!(
            text("  /catalog@boutique_bot   Dresses ").command(),
            Some(("catalog", Some("Dresses")))
        );
        assert_eq!(text("hello").command(), None);
        assert_eq!(ChatUpdate::default().command(), None);
    }

    #[test]
    fn test_update_accepts_minimal_payload() {
        let update: ChatUpdate = serde_json::from_str(r#"{"chat_id": 5, "user_id": 9}"#).unwrap();
        assert_eq!(update.chat_id, ChatId(5));
        assert!(update.text.is_none());
        assert!(update.callback.is_none());
    }

    #[test]
    fn test_reply_omits_missing_link() {
        let json = serde_json::to_value(BotReply::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "hi" }));
    }
}
