//! Server-synchronized values: poll on track, overwrite on push, count down
//! locally in between.

mod countdown;
mod feeds;
mod mirror;

pub use countdown::{Countdown, Tick, TICK};
pub use feeds::{CooldownFeed, JailFeed, LeaderboardFeed};
pub use mirror::{Generation, Mirror};

use crate::{socket::Channel, Result, Subscription};
use chrono::{DateTime, Utc};
use maffisol_types::{api::Leaderboard, EventError, Identity, TimedLock};
use serde_json::Value;
use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

/// A value that may lapse on its own after some time.
pub trait Expiring: Clone + Send + Sync + 'static {
    /// Time left before the value lapses, `None` if it never does.
    fn remaining(&self, now: DateTime<Utc>) -> Option<Duration>;

    /// The value once its remaining time has run out.
    fn expired(&self) -> Self;
}

impl Expiring for TimedLock {
    fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        TimedLock::remaining(self, now)
    }

    fn expired(&self) -> Self {
        TimedLock::INACTIVE
    }
}

impl Expiring for Leaderboard {
    fn remaining(&self, _: DateTime<Utc>) -> Option<Duration> {
        None
    }

    fn expired(&self) -> Self {
        self.clone()
    }
}

/// Who a pushed value is addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Names an identity; applies only if it is the tracked one.
    Identity(String),
    /// Delivered to a room this connection joined, or broadcast. Applies to
    /// whatever is tracked.
    Joined,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Push<V> {
    pub scope: Scope,
    pub value: V,
}

/// Binds a synchronized value to its endpoint, push event and decoder.
pub trait Feed: Send + Sync + 'static {
    type Value: Expiring + PartialEq + Debug;

    /// Push event carrying updates.
    fn event(&self) -> &'static str;

    /// Value shown before the first result and after a failed poll.
    fn fallback(&self) -> Self::Value;

    fn fetch(&self, identity: &Identity) -> impl Future<Output = Result<Self::Value>> + Send;

    /// Decodes a push. `Ok(None)` means the payload is well formed but not
    /// meant for this feed.
    fn decode(
        &self,
        args: &[Value],
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<Push<Self::Value>>, EventError>;

    /// Makes the server start pushing for `identity`.
    fn join<C: Channel>(&self, channel: &C, identity: &Identity) -> Result<()> {
        channel.register_identity(identity)
    }

    /// Side effect fired once when the local countdown reaches zero.
    fn release(&self, _identity: &Identity) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Snapshot published to observers.
#[derive(Clone, Debug, PartialEq)]
pub struct View<V> {
    pub identity: Option<Identity>,
    pub value: V,
    /// Advisory time left, ticking down locally.
    pub remaining: Option<Duration>,
}

enum Command {
    Track(Identity),
    Refresh,
    Clear,
}

/// A value kept in sync with the server by a background task.
///
/// The task owns all state. Dropping the handle stops it and drops its
/// push subscription.
pub struct Synced<F: Feed> {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<View<F::Value>>,
    task: JoinHandle<()>,
}

impl<F: Feed> Synced<F> {
    pub fn spawn<C: Channel>(feed: F, channel: C) -> Self {
        let subscription = channel.subscribe(feed.event());
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(View {
            identity: None,
            value: feed.fallback(),
            remaining: None,
        });
        let task = tokio::spawn(run(
            Arc::new(feed),
            channel,
            subscription,
            commands_rx,
            view_tx,
        ));
        Self {
            commands,
            view,
            task,
        }
    }

    /// Switches to `identity`, joining its push scope and polling it.
    /// Tracking the current identity again just polls.
    pub fn track(&self, identity: Identity) {
        let _ = self.commands.send(Command::Track(identity));
    }

    /// Polls the tracked identity again.
    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }

    pub fn clear(&self) {
        let _ = self.commands.send(Command::Clear);
    }

    pub fn view(&self) -> View<F::Value> {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<View<F::Value>> {
        self.view.clone()
    }
}

impl<F: Feed> Drop for Synced<F> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn publish<V: Expiring + PartialEq>(view: &watch::Sender<View<V>>, mirror: &Mirror<V>) {
    let next = View {
        identity: mirror.identity().cloned(),
        value: mirror.value().clone(),
        remaining: mirror.remaining(),
    };
    view.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

type PollResult<V> = (Generation, Result<V>);

fn spawn_poll<F: Feed>(
    feed: &Arc<F>,
    identity: Identity,
    generation: Generation,
    results: &mpsc::UnboundedSender<PollResult<F::Value>>,
) {
    let feed = Arc::clone(feed);
    let results = results.clone();
    tokio::spawn(async move {
        let result = feed.fetch(&identity).await;
        let _ = results.send((generation, result));
    });
}

async fn run<F: Feed, C: Channel>(
    feed: Arc<F>,
    channel: C,
    mut subscription: Subscription,
    mut commands: mpsc::UnboundedReceiver<Command>,
    view: watch::Sender<View<F::Value>>,
) {
    let event = feed.event();
    let mut mirror = Mirror::new(feed.fallback());
    let (polls_tx, mut polls) = mpsc::unbounded_channel();
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    return;
                };
                match command {
                    Command::Track(identity) => {
                        if mirror.identity() == Some(&identity) {
                            spawn_poll(&feed, identity, mirror.generation(), &polls_tx);
                        } else {
                            if let Err(err) = feed.join(&channel, &identity) {
                                warn!(event, identity = %identity, error = ?err, "failed to join push scope");
                            }
                            let generation = mirror.track(identity.clone());
                            publish(&view, &mirror);
                            spawn_poll(&feed, identity, generation, &polls_tx);
                        }
                    }
                    Command::Refresh => {
                        if let Some(identity) = mirror.identity().cloned() {
                            spawn_poll(&feed, identity, mirror.generation(), &polls_tx);
                        }
                    }
                    Command::Clear => {
                        mirror.clear();
                        publish(&view, &mirror);
                    }
                }
            }
            Some((generation, result)) = polls.recv() => {
                let value = match result {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!(event, error = ?err, "poll failed, showing fallback");
                        None
                    }
                };
                if mirror.apply_poll(generation, value, Utc::now()) {
                    ticker.reset();
                    publish(&view, &mirror);
                } else {
                    debug!(event, "discarding poll for a previous identity");
                }
            }
            args = subscription.recv() => {
                let Some(args) = args else {
                    debug!(event, "push source closed");
                    return;
                };
                let now = Utc::now();
                match feed.decode(&args, now) {
                    Ok(Some(push)) => {
                        if mirror.apply_push(&push.scope, push.value, now) {
                            ticker.reset();
                            publish(&view, &mirror);
                        } else {
                            debug!(event, scope = ?push.scope, "ignoring push for another scope");
                        }
                    }
                    Ok(None) => debug!(event, "ignoring push for another feed"),
                    Err(err) => warn!(event, error = ?err, "malformed push"),
                }
            }
            _ = ticker.tick(), if mirror.counting() => {
                match mirror.tick() {
                    Tick::Released => {
                        publish(&view, &mirror);
                        if let Some(identity) = mirror.identity().cloned() {
                            let feed = Arc::clone(&feed);
                            tokio::spawn(async move {
                                if let Err(err) = feed.release(&identity).await {
                                    warn!(event, identity = %identity, error = ?err, "release side effect failed");
                                }
                            });
                        }
                    }
                    Tick::Running(_) => publish(&view, &mirror),
                    Tick::Idle => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Loopback};
    use maffisol_types::events::JAIL_STATUS_UPDATED;
    use serde_json::json;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::{sleep, timeout};

    /// Answers polls from a table of `(delay, remaining ms)` per identity;
    /// identities missing from the table fail.
    struct ScriptedFeed {
        script: HashMap<String, (Duration, Option<u64>)>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedFeed {
        fn new(script: &[(&str, Duration, Option<u64>)]) -> Self {
            Self {
                script: script
                    .iter()
                    .map(|(identity, delay, remaining)| {
                        (identity.to_string(), (*delay, *remaining))
                    })
                    .collect(),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Feed for ScriptedFeed {
        type Value = TimedLock;

        fn event(&self) -> &'static str {
            JAIL_STATUS_UPDATED
        }

        fn fallback(&self) -> TimedLock {
            TimedLock::INACTIVE
        }

        fn fetch(&self, identity: &Identity) -> impl Future<Output = Result<TimedLock>> + Send {
            let script = self.script.get(identity.as_str()).copied();
            async move {
                let (delay, remaining) = script.ok_or(Error::ConnectionClosed)?;
                sleep(delay).await;
                Ok(match remaining {
                    Some(ms) => TimedLock::for_remaining(Duration::from_millis(ms), Utc::now()),
                    None => TimedLock::INACTIVE,
                })
            }
        }

        fn decode(
            &self,
            args: &[Value],
            now: DateTime<Utc>,
        ) -> std::result::Result<Option<Push<TimedLock>>, EventError> {
            feeds::jail_push(args, now)
        }

        fn release(&self, _identity: &Identity) -> impl Future<Output = Result<()>> + Send {
            let releases = Arc::clone(&self.releases);
            async move {
                releases.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn identity(raw: &str) -> Identity {
        Identity::new(raw).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_releases_once() {
        let feed = ScriptedFeed::new(&[("w1", Duration::ZERO, Some(5_000))]);
        let releases = Arc::clone(&feed.releases);
        let channel = Loopback::new();
        let synced = Synced::spawn(feed, channel.clone());
        let mut watch = synced.watch();

        synced.track(identity("w1"));
        timeout(Duration::from_secs(1), watch.wait_for(|view| view.value.is_active()))
            .await
            .unwrap()
            .unwrap();
        timeout(
            Duration::from_secs(10),
            watch.wait_for(|view| !view.value.is_active()),
        )
        .await
        .unwrap()
        .unwrap();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        let view = synced.view();
        assert_eq!(view.remaining, None);
        assert_eq!(view.value, TimedLock::INACTIVE);
        assert_eq!(channel.identities(), vec![identity("w1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_poll_discarded_after_identity_change() {
        let feed = ScriptedFeed::new(&[
            ("A", Duration::from_secs(5), Some(120_000)),
            ("B", Duration::ZERO, None),
        ]);
        let synced = Synced::spawn(feed, Loopback::new());

        synced.track(identity("A"));
        synced.track(identity("B"));
        sleep(Duration::from_secs(6)).await;

        let view = synced.view();
        assert_eq!(view.identity, Some(identity("B")));
        assert!(!view.value.is_active());
        assert_eq!(view.remaining, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_scoped_to_tracked_identity() {
        let feed = ScriptedFeed::new(&[("w1", Duration::ZERO, None)]);
        let channel = Loopback::new();
        let synced = Synced::spawn(feed, channel.clone());
        synced.track(identity("w1"));
        sleep(Duration::from_millis(10)).await;

        let release = (Utc::now() + chrono::Duration::seconds(60)).to_rfc3339();
        channel.deliver(
            JAIL_STATUS_UPDATED,
            vec![json!({"walletAddress": "w2", "isInJail": true, "jailReleaseTime": release})],
        );
        sleep(Duration::from_millis(10)).await;
        assert!(!synced.view().value.is_active());

        channel.deliver(
            JAIL_STATUS_UPDATED,
            vec![json!({"walletAddress": "w1", "isInJail": true, "jailReleaseTime": release})],
        );
        let mut watch = synced.watch();
        timeout(Duration::from_secs(1), watch.wait_for(|view| view.value.is_active()))
            .await
            .unwrap()
            .unwrap();

        // A malformed payload leaves the value alone.
        channel.deliver(JAIL_STATUS_UPDATED, vec![json!({"isInJail": "yes"})]);
        sleep(Duration::from_millis(10)).await;
        assert!(synced.view().value.is_active());

        channel.deliver(
            JAIL_STATUS_UPDATED,
            vec![json!({"walletAddress": "w1", "isInJail": true, "jailReleaseTime": null})],
        );
        timeout(Duration::from_secs(1), watch.wait_for(|view| !view.value.is_active()))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_unsubscribes() {
        let channel = Loopback::new();
        let synced = Synced::spawn(ScriptedFeed::new(&[]), channel.clone());
        assert_eq!(channel.listener_count(JAIL_STATUS_UPDATED), 1);
        drop(synced);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(channel.listener_count(JAIL_STATUS_UPDATED), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_view() {
        let feed = ScriptedFeed::new(&[("w1", Duration::ZERO, Some(60_000))]);
        let synced = Synced::spawn(feed, Loopback::new());
        let mut watch = synced.watch();
        synced.track(identity("w1"));
        timeout(Duration::from_secs(1), watch.wait_for(|view| view.value.is_active()))
            .await
            .unwrap()
            .unwrap();

        synced.clear();
        timeout(Duration::from_secs(1), watch.wait_for(|view| view.identity.is_none()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synced.view().value, TimedLock::INACTIVE);
    }
}
