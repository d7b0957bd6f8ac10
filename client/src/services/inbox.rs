//! Private inbox: invites, conversations, messages and notifications.

use crate::{client::join, Client, Result};
use maffisol_types::social::{
    ChatInviteRequest, Conversation, DirectMessage, InviteDecision, InviteKind, InviteOutcome,
    InviteResponse, MarkReadRequest, Notification, Participant, SendMessageRequest, UnreadCount,
};
use reqwest::Method;

/// Everything the inbox shows, fetched together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboxSnapshot {
    pub chat_invites: Vec<Conversation>,
    pub family_invites: Vec<Conversation>,
    pub notifications: Vec<Notification>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<DirectMessage>,
}

impl Client {
    /// Fetches every inbox list for `user_id` concurrently.
    pub async fn inbox(&self, user_id: &str) -> Result<InboxSnapshot> {
        let base = &self.endpoints.base;
        let (chat_invites, family_invites, notifications, conversations, messages) = futures::try_join!(
            self.get_json::<Vec<Conversation>>(join(base, &["chat-invites", user_id])?),
            self.get_json::<Vec<Conversation>>(join(base, &["family-invites", user_id])?),
            self.get_json::<Vec<Notification>>(join(base, &["notifications", user_id])?),
            self.get_json::<Vec<Conversation>>(join(base, &["chats", user_id])?),
            self.get_json::<Vec<DirectMessage>>(join(base, &["messages", user_id])?),
        )?;
        Ok(InboxSnapshot {
            chat_invites,
            family_invites,
            notifications,
            conversations,
            messages,
        })
    }

    pub async fn conversation_messages(&self, chat_id: &str) -> Result<Vec<DirectMessage>> {
        let url = join(&self.endpoints.base, &["messages", "chat", chat_id])?;
        self.get_json(url).await
    }

    pub async fn send_direct_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<()> {
        let url = join(&self.endpoints.base, &["messages", "send"])?;
        let body = SendMessageRequest {
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
        };
        self.post_unit(url, &body).await
    }

    /// Accepts or declines an invite. Accepting a chat invite may return
    /// the new conversation.
    pub async fn respond_to_invite(
        &self,
        kind: InviteKind,
        invite_id: &str,
        decision: InviteDecision,
    ) -> Result<InviteOutcome> {
        let path = format!("{}-invites", kind.as_str());
        let url = join(&self.endpoints.base, &[path.as_str(), "respond"])?;
        let body = InviteResponse {
            invite_id: invite_id.to_string(),
            response: decision,
        };
        self.post_json(url, &body).await
    }

    pub async fn player_by_username(&self, username: &str) -> Result<Option<Participant>> {
        let url = join(&self.endpoints.base, &["player", "by-username", username])?;
        self.get_optional(url).await
    }

    /// Invites `invitee_username` to a private chat. Returns `false` when no
    /// such player exists.
    pub async fn send_chat_invite(&self, inviter_id: &str, invitee_username: &str) -> Result<bool> {
        let Some(invitee) = self.player_by_username(invitee_username).await? else {
            return Ok(false);
        };
        let url = join(&self.endpoints.base, &["chat-invites", "send"])?;
        let body = ChatInviteRequest {
            inviter_id: inviter_id.to_string(),
            invitee_id: invitee.id,
        };
        self.post_unit(url, &body).await?;
        Ok(true)
    }

    pub async fn delete_conversation(&self, chat_id: &str) -> Result<()> {
        let url = join(&self.endpoints.base, &["chats", chat_id])?;
        self.message(Method::DELETE, url).await.map(|_| ())
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64> {
        let url = join(&self.endpoints.base, &["messages", "unread", user_id])?;
        let count: UnreadCount = self.get_json(url).await?;
        Ok(count.unread_count)
    }

    pub async fn mark_read(&self, user_id: &str) -> Result<()> {
        let url = join(&self.endpoints.base, &["messages", "mark-read"])?;
        self.post_unit(
            url,
            &MarkReadRequest {
                user_id: user_id.to_string(),
            },
        )
        .await
    }
}
