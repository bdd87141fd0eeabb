//! Admin broadcast composition.
//!
//! A broadcast is composed over several updates:
//!
//! ```text
//! /broadcast            -> AwaitingBroadcastContent
//! text | photo+caption  -> AwaitingBroadcastAudience { draft }
//! all | vip             -> Broadcast (session removed)
//! /cancel               -> session removed (any step)
//! ```
//!
//! Progress lives in the [`SessionStore`], so an abandoned composition
//! disappears once the session TTL passes.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::session::{ChatId, SessionStore};
use crate::update::ChatUpdate;

/// Callback prefix for broadcast buttons (`broadcast_all`, `broadcast_cancel`, ...).
pub const CALLBACK_PREFIX: &str = "broadcast_";

/// Per-chat interaction state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChatSession {
    AwaitingBroadcastContent,
    AwaitingBroadcastAudience { draft: BroadcastDraft },
}

/// Message body of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastDraft {
    Text {
        text: String,
    },
    Photo {
        photo_id: String,
        caption: Option<String>,
    },
}

impl BroadcastDraft {
    /// Draft from a chat message; `None` when it has neither text nor photo.
    ///
    /// A photo wins over text.
    #[must_use]
    pub fn from_update(update: &ChatUpdate) -> Option<Self> {
        if let Some(photo_id) = update.photo_id.as_deref().filter(|p| !p.trim().is_empty()) {
            return Some(Self::Photo {
                photo_id: photo_id.to_string(),
                caption: update
                    .caption
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            });
        }
        update.trimmed_text().map(|text| Self::Text {
            text: text.to_string(),
        })
    }

    /// Short human-readable preview.
    #[must_use]
    pub fn preview(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Photo {
                caption: Some(caption),
                ..
            } => format!("[photo] {caption}"),
            Self::Photo { caption: None, .. } => "[photo]".to_string(),
        }
    }
}

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Vip,
}

impl Audience {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Vip => "vip",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "vip" => Ok(Self::Vip),
            other => Err(BroadcastError::UnknownAudience(other.to_string())),
        }
    }
}

/// A completed broadcast, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub audience: Audience,
    pub draft: BroadcastDraft,
}

/// Ways a broadcast step can be refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("only administrators can send broadcasts")]
    NotAdmin,

    #[error("session expired, start again with /broadcast")]
    SessionExpired,

    #[error("send text or a photo with a caption, or /cancel")]
    UnsupportedContent,

    #[error("send the broadcast message first, or /cancel")]
    DraftMissing,

    #[error("unknown audience: {0}")]
    UnknownAudience(String),
}

/// Drives the composition flow over the session store.
#[derive(Clone)]
pub struct BroadcastFlow {
    sessions: SessionStore<ChatSession>,
    admins: Arc<HashSet<i64>>,
}

impl BroadcastFlow {
    #[must_use]
    pub fn new(sessions: SessionStore<ChatSession>, admins: HashSet<i64>) -> Self {
        Self {
            sessions,
            admins: Arc::new(admins),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore<ChatSession> {
        &self.sessions
    }

    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Begin composing. Restarts any composition already in progress.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError::NotAdmin` for non-admin users.
    #[instrument(skip(self))]
    pub async fn start(&self, chat: ChatId, user_id: i64) -> Result<(), BroadcastError> {
        if !self.is_admin(user_id) {
            warn!("Broadcast refused for non-admin");
            return Err(BroadcastError::NotAdmin);
        }
        self.sessions
            .put(chat, ChatSession::AwaitingBroadcastContent)
            .await;
        debug!("Broadcast composition started");
        Ok(())
    }

    /// Drop any composition in progress. Returns whether one existed.
    pub async fn cancel(&self, chat: ChatId) -> bool {
        self.sessions.delete(chat).await.is_some()
    }

    /// Accept the message to broadcast.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if no composition is live
    /// - `UnsupportedContent` if the message has neither text nor a photo; the
    ///   composition stays where it was
    #[instrument(skip(self, update), fields(chat = %update.chat_id))]
    pub async fn submit_content(&self, update: &ChatUpdate) -> Result<BroadcastDraft, BroadcastError> {
        let chat = update.chat_id;
        match self.sessions.get(chat).await {
            None => Err(BroadcastError::SessionExpired),
            Some(_) => {
                let draft =
                    BroadcastDraft::from_update(update).ok_or(BroadcastError::UnsupportedContent)?;
                self.sessions
                    .put(
                        chat,
                        ChatSession::AwaitingBroadcastAudience {
                            draft: draft.clone(),
                        },
                    )
                    .await;
                debug!("Broadcast draft captured");
                Ok(draft)
            }
        }
    }

    /// Pick the audience and complete the composition.
    ///
    /// The session is removed before the draft is returned, so concurrent
    /// choices complete at most once.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if no composition is live
    /// - `DraftMissing` if no message has been captured yet
    #[instrument(skip(self))]
    pub async fn choose_audience(
        &self,
        chat: ChatId,
        audience: Audience,
    ) -> Result<Broadcast, BroadcastError> {
        match self.sessions.delete(chat).await {
            Some(ChatSession::AwaitingBroadcastAudience { draft }) => {
                info!(%audience, "Broadcast composed");
                Ok(Broadcast { audience, draft })
            }
            Some(pending @ ChatSession::AwaitingBroadcastContent) => {
                self.sessions.put(chat, pending).await;
                Err(BroadcastError::DraftMissing)
            }
            None => Err(BroadcastError::SessionExpired),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    const ADMIN: i64 = 100;
    const CHAT: ChatId = ChatId(100);

    fn flow(ttl: Duration) -> BroadcastFlow {
        BroadcastFlow::new(SessionStore::new(ttl), HashSet::from([ADMIN]))
    }

    fn message(text: Option<&str>, photo: Option<&str>, caption: Option<&str>) -> ChatUpdate {
        ChatUpdate {
            chat_id: CHAT,
            user_id: ADMIN,
            text: text.map(str::to_string),
            photo_id: photo.map(str::to_string),
            caption: caption.map(str::to_string),
            callback: None,
        }
    }

    #[tokio::test]
    async fn test_text_broadcast_completes_once() {
        let flow = flow(Duration::from_secs(60));

        flow.start(CHAT, ADMIN).await.unwrap();
        let draft = flow
            .submit_content(&message(Some(" Spring sale "), None, None))
            .await
            .unwrap();
        assert_eq!(
            draft,
            BroadcastDraft::Text {
                text: "Spring sale".to_string()
            }
        );

        let broadcast = flow.choose_audience(CHAT, Audience::Vip).await.unwrap();
        assert_eq!(broadcast.audience, Audience::Vip);
        assert_eq!(broadcast.draft, draft);

        assert_eq!(
            flow.choose_audience(CHAT, Audience::Vip).await,
            Err(BroadcastError::SessionExpired)
        );
        assert!(flow.sessions().get(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn test_photo_with_caption() {
        let flow = flow(Duration::from_secs(60));
        flow.start(CHAT, ADMIN).await.unwrap();

        let draft = flow
            .submit_content(&message(None, Some("photo-1"), Some("New arrivals")))
            .await
            .unwrap();

        assert_eq!(draft.preview(), "[photo] New arrivals");
        assert!(matches!(
            flow.sessions().get(CHAT).await,
            Some(ChatSession::AwaitingBroadcastAudience { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_start() {
        let flow = flow(Duration::from_secs(60));

        assert_eq!(
            flow.start(ChatId(5), 5).await,
            Err(BroadcastError::NotAdmin)
        );
        assert!(flow.sessions().get(ChatId(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_content_keeps_state() {
        let flow = flow(Duration::from_secs(60));
        flow.start(CHAT, ADMIN).await.unwrap();

        assert_eq!(
            flow.submit_content(&message(Some("   "), None, None)).await,
            Err(BroadcastError::UnsupportedContent)
        );
        assert_eq!(
            flow.sessions().get(CHAT).await,
            Some(ChatSession::AwaitingBroadcastContent)
        );
    }

    #[tokio::test]
    async fn test_audience_before_content_is_refused() {
        let flow = flow(Duration::from_secs(60));
        flow.start(CHAT, ADMIN).await.unwrap();

        assert_eq!(
            flow.choose_audience(CHAT, Audience::All).await,
            Err(BroadcastError::DraftMissing)
        );
        assert_eq!(
            flow.sessions().get(CHAT).await,
            Some(ChatSession::AwaitingBroadcastContent)
        );
    }

    #[tokio::test]
    async fn test_cancel_clears_state() {
        let flow = flow(Duration::from_secs(60));
        flow.start(CHAT, ADMIN).await.unwrap();

        assert!(flow.cancel(CHAT).await);
        assert!(!flow.cancel(CHAT).await);
        assert_eq!(
            flow.submit_content(&message(Some("late"), None, None)).await,
            Err(BroadcastError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn test_expired_session_reports_expiry() {
        let flow = flow(Duration::from_millis(100));
        flow.start(CHAT, ADMIN).await.unwrap();
        flow.submit_content(&message(Some("hello"), None, None))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(
            flow.choose_audience(CHAT, Audience::All).await,
            Err(BroadcastError::SessionExpired)
        );
    }

    #[test]
    fn test_audience_parsing() {
        assert_eq!("ALL".parse::<Audience>().unwrap(), Audience::All);
        assert_eq!(" vip ".parse::<Audience>().unwrap(), Audience::Vip);
        assert!(matches!(
            "friends".parse::<Audience>(),
            Err(BroadcastError::UnknownAudience(a)) if a == "friends"
        ));
    }
}
