//! Family management and the private inbox (invites, conversations,
//! notifications) served by the base API.

use crate::events::JailStatusPush;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Family treasury: a single total in older records, per-resource counts in
/// newer ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resources {
    Total(i64),
    ByKind(BTreeMap<String, i64>),
}

impl Default for Resources {
    fn default() -> Self {
        Resources::Total(0)
    }
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        match self {
            Resources::Total(total) => *total == 0,
            Resources::ByKind(kinds) => kinds.values().all(|count| *count == 0),
        }
    }
}

/// A family as listed by `GET /family` (management view, not the dashboard).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(default, deserialize_with = "nullable")]
    pub resources: Resources,
    #[serde(default, deserialize_with = "nullable")]
    pub dominance_points: u64,
}

impl FamilyRecord {
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.members.iter().any(|member| member == username)
    }
}

/// The family `username` belongs to, if any.
pub fn family_of<'a>(families: &'a [FamilyRecord], username: &str) -> Option<&'a FamilyRecord> {
    families.iter().find(|family| family.has_member(username))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyRequest {
    pub name: String,
    pub owner_username: String,
    pub members: Vec<String>,
}

impl CreateFamilyRequest {
    /// The founder is the first member.
    pub fn founded_by(name: impl Into<String>, owner_username: impl Into<String>) -> Self {
        let owner_username = owner_username.into();
        Self {
            name: name.into(),
            members: vec![owner_username.clone()],
            owner_username,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberRequest {
    pub inviter_wallet_address: String,
    pub invitee_username: String,
    pub family_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub family_id: String,
    pub username: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Username {
    #[serde(default)]
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvite {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub invitee_id: Username,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InviteKind {
    Chat,
    Family,
}

impl InviteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteKind::Chat => "chat",
            InviteKind::Family => "family",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteDecision {
    Accepted,
    Declined,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub invite_id: String,
    pub response: InviteDecision,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteOutcome {
    #[serde(default)]
    pub new_chat: Option<Conversation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInviteRequest {
    pub inviter_id: String,
    pub invitee_id: String,
}

/// Player as returned by `GET /player/by-username/{name}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub content: String,
}

/// A private conversation, or an invite to one (both share the shape).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub inviter_username: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Message inside a conversation. The sender is populated, or null when
/// the account was removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub sender_id: Option<Participant>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub chat_id: String,
}

impl DirectMessage {
    pub fn sender_name(&self) -> &str {
        self.sender_id
            .as_ref()
            .map(|sender| sender.username.as_str())
            .unwrap_or("unknown")
    }
}

/// Appends `message` unless a message with the same id is already present.
pub fn append_unique(messages: &mut Vec<DirectMessage>, message: DirectMessage) -> bool {
    if messages.iter().any(|existing| existing.id == message.id) {
        return false;
    }
    messages.push(message);
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
}

impl Notification {
    /// Inbox notice derived from a jail push for the inbox owner.
    pub fn from_jail_push(push: &JailStatusPush, now_ms: i64) -> Self {
        let message = if push.status.is_in_jail {
            let release = push
                .status
                .jail_release_time
                .map(|at| at.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "N/A".to_string());
            format!("You have been sent to jail. Release time: {release}")
        } else {
            "You have been released from jail.".to_string()
        };
        Self {
            id: format!("jail-{now_ms}"),
            message,
        }
    }
}

/// Adds `notification` unless one with the same text is already listed.
pub fn push_notification(list: &mut Vec<Notification>, notification: Notification) -> bool {
    if list.iter().any(|n| n.message == notification.message) {
        return false;
    }
    list.push(notification);
    true
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    #[serde(default, deserialize_with = "nullable")]
    pub unread_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub user_id: String,
}

/// `messageUpdate` push: the named user's inbox changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdate {
    pub user_id: String,
}

/// Click counter submission. The counter travels as a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitterRequest {
    pub wallet_address: String,
    pub click_count: String,
}
