//! Live rooms: history over REST, new entries from pushes.
//!
//! Every room subscribes before loading history, so a message pushed while
//! the history request is in flight is still seen.

use crate::{
    services::{family::FAMILY_CHAT_PAGE, inbox::InboxSnapshot},
    socket::Channel,
    Client, Result, Subscription,
};
use chrono::Utc;
use maffisol_types::{
    api::{ChatMessage, FamilyMessage, FamilyMessageRequest},
    events::{
        FAMILY_MESSAGE, JAIL_STATUS_UPDATED, JOIN_CHAT, JOIN_FAMILY_ROOM, MESSAGE_UPDATE,
        NEW_CHAT_INVITE, NEW_CHAT_MESSAGE, NEW_FAMILY_MESSAGE, NEW_MESSAGE,
    },
    social::{append_unique, push_notification, DirectMessage, Notification},
    Identity, PushEvent,
};
use serde_json::Value;
use tracing::{debug, warn};

fn decode(event: &str, args: &[Value]) -> Option<PushEvent> {
    match PushEvent::decode(event, args) {
        Ok(push) => Some(push),
        Err(err) => {
            warn!(event, error = ?err, "malformed push");
            None
        }
    }
}

/// The global chat.
pub struct PublicChat<C: Channel> {
    client: Client,
    channel: C,
    subscription: Subscription,
    messages: Vec<ChatMessage>,
}

impl<C: Channel> PublicChat<C> {
    pub async fn open(client: Client, channel: C) -> Result<Self> {
        let subscription = channel.subscribe(NEW_CHAT_MESSAGE);
        let messages = client.chat_messages().await?;
        Ok(Self {
            client,
            channel,
            subscription,
            messages,
        })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Waits for the next pushed message and appends it. `None` once the
    /// connection is gone.
    pub async fn next_message(&mut self) -> Option<ChatMessage> {
        loop {
            let args = self.subscription.recv().await?;
            if let Some(PushEvent::ChatMessage(message)) = decode(NEW_CHAT_MESSAGE, &args) {
                self.messages.push(message.clone());
                return Some(message);
            }
        }
    }

    /// Stores the message, then broadcasts the stored copy. Blank messages
    /// are not sent.
    pub async fn send(&self, sender_id: &str, message: &str) -> Result<Option<ChatMessage>> {
        if message.trim().is_empty() {
            return Ok(None);
        }
        let sent = self.client.send_chat_message(sender_id, message).await?;
        self.channel
            .emit(NEW_CHAT_MESSAGE, vec![serde_json::to_value(&sent)?])?;
        Ok(Some(sent))
    }
}

/// Appends `message` unless the same sender already posted at the same
/// timestamp.
fn append_family_message(messages: &mut Vec<FamilyMessage>, message: FamilyMessage) -> bool {
    if messages
        .iter()
        .any(|existing| existing.timestamp == message.timestamp && existing.sender == message.sender)
    {
        return false;
    }
    messages.push(message);
    true
}

/// A family's private room, oldest message first.
pub struct FamilyChat<C: Channel> {
    client: Client,
    channel: C,
    family_id: String,
    subscription: Subscription,
    messages: Vec<FamilyMessage>,
    has_more: bool,
}

impl<C: Channel> FamilyChat<C> {
    /// Joins the family room and loads the most recent page.
    pub async fn open(client: Client, channel: C, family_id: &str) -> Result<Self> {
        let subscription = channel.subscribe(NEW_FAMILY_MESSAGE);
        channel.emit(JOIN_FAMILY_ROOM, vec![Value::String(family_id.to_string())])?;
        let messages = client.family_chat(family_id, 0).await?;
        Ok(Self {
            client,
            channel,
            family_id: family_id.to_string(),
            has_more: messages.len() == FAMILY_CHAT_PAGE,
            subscription,
            messages,
        })
    }

    pub fn messages(&self) -> &[FamilyMessage] {
        &self.messages
    }

    /// Whether older history may exist. A short page means the start was
    /// reached.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Prepends the next older page, returning how many messages it held.
    pub async fn load_more(&mut self) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }
        let page = self
            .client
            .family_chat(&self.family_id, self.messages.len())
            .await?;
        self.has_more = page.len() == FAMILY_CHAT_PAGE;
        let loaded = page.len();
        self.messages.splice(0..0, page);
        Ok(loaded)
    }

    pub async fn next_message(&mut self) -> Option<FamilyMessage> {
        loop {
            let args = self.subscription.recv().await?;
            if let Some(PushEvent::FamilyMessage(message)) = decode(NEW_FAMILY_MESSAGE, &args) {
                if append_family_message(&mut self.messages, message.clone()) {
                    return Some(message);
                }
                debug!(sender = message.sender.as_str(), "duplicate family message");
            }
        }
    }

    /// Sends over the socket only; the server echoes it back to the room.
    pub fn send(&self, sender: &str, message: &str) -> Result<Option<FamilyMessageRequest>> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }
        let request = FamilyMessageRequest {
            family_id: self.family_id.clone(),
            sender: sender.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        };
        self.channel
            .emit(FAMILY_MESSAGE, vec![serde_json::to_value(&request)?])?;
        Ok(Some(request))
    }
}

/// One private conversation.
pub struct DirectChat<C: Channel> {
    client: Client,
    chat_id: String,
    subscription: Subscription,
    messages: Vec<DirectMessage>,
    _channel: C,
}

impl<C: Channel> DirectChat<C> {
    pub async fn open(client: Client, channel: C, chat_id: &str) -> Result<Self> {
        let subscription = channel.subscribe(NEW_MESSAGE);
        channel.emit(JOIN_CHAT, vec![Value::String(chat_id.to_string())])?;
        let messages = client.conversation_messages(chat_id).await?;
        Ok(Self {
            client,
            chat_id: chat_id.to_string(),
            subscription,
            messages,
            _channel: channel,
        })
    }

    pub fn messages(&self) -> &[DirectMessage] {
        &self.messages
    }

    /// Next new message in this conversation. Messages for other
    /// conversations and repeats are skipped.
    pub async fn next_message(&mut self) -> Option<DirectMessage> {
        loop {
            let args = self.subscription.recv().await?;
            let Some(PushEvent::DirectMessage(message)) = decode(NEW_MESSAGE, &args) else {
                continue;
            };
            if message.chat_id != self.chat_id {
                continue;
            }
            if append_unique(&mut self.messages, message.clone()) {
                return Some(message);
            }
        }
    }

    /// Blank messages are not sent. The stored message arrives as a push.
    pub async fn send(&self, sender_id: &str, content: &str) -> Result<bool> {
        if content.is_empty() {
            return Ok(false);
        }
        self.client
            .send_direct_message(&self.chat_id, sender_id, content)
            .await?;
        Ok(true)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboxChange {
    /// A jail push produced a new notification.
    Notification(Notification),
    /// The inbox was fetched again.
    Refreshed,
}

/// The inbox of one user, kept current by pushes.
pub struct LiveInbox<C: Channel> {
    client: Client,
    user: Identity,
    snapshot: InboxSnapshot,
    jail: Subscription,
    updates: Subscription,
    invites: Subscription,
    _channel: C,
}

impl<C: Channel> LiveInbox<C> {
    pub async fn open(client: Client, channel: C, user: Identity) -> Result<Self> {
        let jail = channel.subscribe(JAIL_STATUS_UPDATED);
        let updates = channel.subscribe(MESSAGE_UPDATE);
        let invites = channel.subscribe(NEW_CHAT_INVITE);
        channel.register_identity(&user)?;
        let snapshot = client.inbox(user.as_str()).await?;
        Ok(Self {
            client,
            user,
            snapshot,
            jail,
            updates,
            invites,
            _channel: channel,
        })
    }

    pub fn snapshot(&self) -> &InboxSnapshot {
        &self.snapshot
    }

    async fn refetch(&mut self) -> Result<InboxChange> {
        self.snapshot = self.client.inbox(self.user.as_str()).await?;
        Ok(InboxChange::Refreshed)
    }

    /// Waits for the next change. Jail pushes for this user become
    /// notifications (repeated texts are dropped); message updates for this
    /// user and new invites refetch everything. `None` once the connection
    /// is gone.
    pub async fn next_change(&mut self) -> Option<Result<InboxChange>> {
        loop {
            tokio::select! {
                args = self.jail.recv() => {
                    let args = args?;
                    let Some(PushEvent::JailStatus(push)) = decode(JAIL_STATUS_UPDATED, &args) else {
                        continue;
                    };
                    if !self.user.matches(&push.wallet_address) {
                        continue;
                    }
                    let notification =
                        Notification::from_jail_push(&push, Utc::now().timestamp_millis());
                    if push_notification(&mut self.snapshot.notifications, notification.clone()) {
                        return Some(Ok(InboxChange::Notification(notification)));
                    }
                }
                args = self.updates.recv() => {
                    let args = args?;
                    if let Some(PushEvent::MessageUpdate(update)) = decode(MESSAGE_UPDATE, &args) {
                        if self.user.matches(&update.user_id) {
                            return Some(self.refetch().await);
                        }
                    }
                }
                args = self.invites.recv() => {
                    args?;
                    return Some(self.refetch().await);
                }
            }
        }
    }
}
