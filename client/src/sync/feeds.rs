use super::{Feed, Push, Scope};
use crate::{socket::Channel, Client, Result};
use chrono::{DateTime, Utc};
use maffisol_types::{
    api::{CooldownKind, Leaderboard, LeaderboardKind},
    events::{JOIN_FAMILY_ROOM, JAIL_STATUS_UPDATED, LEADERBOARD_UPDATE, UPDATE_COOLDOWNS},
    EventError, Identity, PushEvent, TimedLock,
};
use serde_json::Value;
use std::{future::Future, time::Duration};
use tracing::info;

pub(super) fn jail_push(
    args: &[Value],
    now: DateTime<Utc>,
) -> std::result::Result<Option<Push<TimedLock>>, EventError> {
    match PushEvent::decode(JAIL_STATUS_UPDATED, args)? {
        PushEvent::JailStatus(push) => Ok(Some(Push {
            scope: Scope::Identity(push.wallet_address.clone()),
            value: push.lock_at(now),
        })),
        _ => Ok(None),
    }
}

/// Jail status of a wallet. Reaching zero locally asks the jail service to
/// release the wallet.
#[derive(Clone)]
pub struct JailFeed {
    client: Client,
}

impl JailFeed {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Feed for JailFeed {
    type Value = TimedLock;

    fn event(&self) -> &'static str {
        JAIL_STATUS_UPDATED
    }

    fn fallback(&self) -> TimedLock {
        TimedLock::INACTIVE
    }

    fn fetch(&self, identity: &Identity) -> impl Future<Output = Result<TimedLock>> + Send {
        self.client.jail_lock(identity)
    }

    fn decode(
        &self,
        args: &[Value],
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<Push<TimedLock>>, EventError> {
        jail_push(args, now)
    }

    async fn release(&self, identity: &Identity) -> Result<()> {
        let message = self.client.release_from_jail(identity).await?;
        info!(identity = %identity, message = %message, "released from jail");
        Ok(())
    }
}

/// One family action cooldown. The identity tracked is the family id; the
/// server pushes to the family room.
#[derive(Clone)]
pub struct CooldownFeed {
    client: Client,
    kind: CooldownKind,
}

impl CooldownFeed {
    pub fn new(client: Client, kind: CooldownKind) -> Self {
        Self { client, kind }
    }
}

impl Feed for CooldownFeed {
    type Value = TimedLock;

    fn event(&self) -> &'static str {
        UPDATE_COOLDOWNS
    }

    fn fallback(&self) -> TimedLock {
        TimedLock::INACTIVE
    }

    async fn fetch(&self, identity: &Identity) -> Result<TimedLock> {
        let cooldown = self.client.cooldowns(identity.as_str()).await?.get(self.kind);
        Ok(if cooldown.active {
            TimedLock::for_remaining(Duration::from_millis(cooldown.remaining), Utc::now())
        } else {
            TimedLock::INACTIVE
        })
    }

    fn decode(
        &self,
        args: &[Value],
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<Push<TimedLock>>, EventError> {
        match PushEvent::decode(UPDATE_COOLDOWNS, args)? {
            PushEvent::Cooldowns(remaining) => Ok(Some(Push {
                scope: Scope::Joined,
                value: TimedLock::for_remaining(
                    Duration::from_millis(remaining.get(self.kind)),
                    now,
                ),
            })),
            _ => Ok(None),
        }
    }

    fn join<C: Channel>(&self, channel: &C, identity: &Identity) -> Result<()> {
        channel.emit(JOIN_FAMILY_ROOM, vec![Value::String(identity.to_string())])
    }
}

/// A leaderboard. Updates are broadcast, so the tracked identity is only the
/// viewer.
#[derive(Clone)]
pub struct LeaderboardFeed {
    client: Client,
    kind: LeaderboardKind,
}

impl LeaderboardFeed {
    pub fn new(client: Client, kind: LeaderboardKind) -> Self {
        Self { client, kind }
    }
}

impl Feed for LeaderboardFeed {
    type Value = Leaderboard;

    fn event(&self) -> &'static str {
        LEADERBOARD_UPDATE
    }

    fn fallback(&self) -> Leaderboard {
        Leaderboard::empty(self.kind)
    }

    fn fetch(&self, _identity: &Identity) -> impl Future<Output = Result<Leaderboard>> + Send {
        self.client.leaderboard(self.kind)
    }

    fn decode(
        &self,
        args: &[Value],
        _now: DateTime<Utc>,
    ) -> std::result::Result<Option<Push<Leaderboard>>, EventError> {
        match PushEvent::decode(LEADERBOARD_UPDATE, args)? {
            PushEvent::Leaderboard(board) => Ok(board.into_kind(self.kind).map(|value| Push {
                scope: Scope::Joined,
                value,
            })),
            _ => Ok(None),
        }
    }

    fn join<C: Channel>(&self, _channel: &C, _identity: &Identity) -> Result<()> {
        Ok(())
    }
}
