//! Server-pushed events carried over the shared real-time connection.
//!
//! Payloads are validated here, at the boundary, and turned into a closed
//! set of variants. An unexpected shape is an error of its own rather than
//! a silently defaulted value.

use crate::{
    api::{
        ChatMessage, CooldownRemaining, FamilyMessage, FamilyUpdate, Leaderboard, PlayerProfile,
        ResourcesUpdate, TerritoryUpdate,
    },
    lock::{JailStatus, TimedLock},
    social::{DirectMessage, MessageUpdate},
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JAIL_STATUS_UPDATED: &str = "jailStatusUpdated";
pub const LEADERBOARD_UPDATE: &str = "leaderboardUpdate";
pub const NEW_CHAT_MESSAGE: &str = "newChatMessage";
pub const NEW_FAMILY_MESSAGE: &str = "newFamilyMessage";
pub const ATTACK_RESULT: &str = "attackResult";
pub const PLAYER_UPDATED: &str = "playerUpdated";
pub const UPDATE_COOLDOWNS: &str = "update-cooldowns";
pub const UPDATE_RESOURCES: &str = "update-resources";
pub const FAMILY_UPDATE: &str = "family-update";
pub const TERRITORY_UPDATE: &str = "territory-update";
pub const MESSAGE: &str = "message";
pub const NEW_MESSAGE: &str = "newMessage";
pub const MESSAGE_UPDATE: &str = "messageUpdate";
pub const NEW_CHAT_INVITE: &str = "newChatInvite";

/// Events the client sends.
pub const REGISTER: &str = "register";
pub const JOIN_FAMILY_ROOM: &str = "joinFamilyRoom";
pub const FAMILY_MESSAGE: &str = "familyMessage";
pub const JOIN_CHAT: &str = "joinChat";

#[derive(Error, Debug)]
pub enum EventError {
    #[error("unknown event: {0}")]
    Unknown(String),
    #[error("event {0} carried no payload")]
    MissingPayload(String),
    #[error("malformed {event} payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `jailStatusUpdated` payload as sent by the jail service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JailStatusPush {
    pub wallet_address: String,
    #[serde(flatten)]
    pub status: JailStatus,
}

impl JailStatusPush {
    pub fn lock_at(&self, now: DateTime<Utc>) -> TimedLock {
        self.status.lock_at(now)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackResult {
    pub attacker_id: String,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdated {
    pub wallet_address: String,
    pub updated_player: PlayerProfile,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PushEvent {
    JailStatus(JailStatusPush),
    Leaderboard(Leaderboard),
    ChatMessage(ChatMessage),
    FamilyMessage(FamilyMessage),
    AttackResult(AttackResult),
    PlayerUpdated(PlayerUpdated),
    Cooldowns(CooldownRemaining),
    Resources(ResourcesUpdate),
    Family(FamilyUpdate),
    Territory(TerritoryUpdate),
    Message(String),
    DirectMessage(DirectMessage),
    MessageUpdate(MessageUpdate),
    /// Carries no data; the inbox is refetched.
    ChatInvite,
}

fn payload<T: DeserializeOwned>(event: &str, args: &[Value]) -> Result<T, EventError> {
    let first = args
        .first()
        .ok_or_else(|| EventError::MissingPayload(event.to_string()))?;
    T::deserialize(first).map_err(|source| EventError::Malformed {
        event: event.to_string(),
        source,
    })
}

impl PushEvent {
    /// Decodes an event from its name and argument list (only the first
    /// argument carries data for every event the game pushes).
    pub fn decode(event: &str, args: &[Value]) -> Result<Self, EventError> {
        Ok(match event {
            JAIL_STATUS_UPDATED => PushEvent::JailStatus(payload(event, args)?),
            LEADERBOARD_UPDATE => PushEvent::Leaderboard(payload(event, args)?),
            NEW_CHAT_MESSAGE => PushEvent::ChatMessage(payload(event, args)?),
            NEW_FAMILY_MESSAGE => PushEvent::FamilyMessage(payload(event, args)?),
            ATTACK_RESULT => PushEvent::AttackResult(payload(event, args)?),
            PLAYER_UPDATED => PushEvent::PlayerUpdated(payload(event, args)?),
            UPDATE_COOLDOWNS => PushEvent::Cooldowns(payload(event, args)?),
            UPDATE_RESOURCES => PushEvent::Resources(payload(event, args)?),
            FAMILY_UPDATE => PushEvent::Family(payload(event, args)?),
            TERRITORY_UPDATE => PushEvent::Territory(payload(event, args)?),
            MESSAGE => PushEvent::Message(payload(event, args)?),
            NEW_MESSAGE => PushEvent::DirectMessage(payload(event, args)?),
            MESSAGE_UPDATE => PushEvent::MessageUpdate(payload(event, args)?),
            NEW_CHAT_INVITE => PushEvent::ChatInvite,
            other => return Err(EventError::Unknown(other.to_string())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::JailStatus(_) => JAIL_STATUS_UPDATED,
            PushEvent::Leaderboard(_) => LEADERBOARD_UPDATE,
            PushEvent::ChatMessage(_) => NEW_CHAT_MESSAGE,
            PushEvent::FamilyMessage(_) => NEW_FAMILY_MESSAGE,
            PushEvent::AttackResult(_) => ATTACK_RESULT,
            PushEvent::PlayerUpdated(_) => PLAYER_UPDATED,
            PushEvent::Cooldowns(_) => UPDATE_COOLDOWNS,
            PushEvent::Resources(_) => UPDATE_RESOURCES,
            PushEvent::Family(_) => FAMILY_UPDATE,
            PushEvent::Territory(_) => TERRITORY_UPDATE,
            PushEvent::Message(_) => MESSAGE,
            PushEvent::DirectMessage(_) => NEW_MESSAGE,
            PushEvent::MessageUpdate(_) => MESSAGE_UPDATE,
            PushEvent::ChatInvite => NEW_CHAT_INVITE,
        }
    }
}
