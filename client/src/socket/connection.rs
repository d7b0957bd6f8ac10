use super::{
    hub::Hub,
    protocol::{EnginePacket, ProtocolError, SocketPacket, MAX_PING_WINDOW},
    Channel, Subscription,
};
use crate::{config::ReconnectPolicy, Error, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use maffisol_types::{events::REGISTER, Identity};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep, sleep_until, timeout, Instant},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
};
use tracing::{debug, error, info, warn};
use url::Url;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

enum Outbound {
    Register(Identity),
    Emit { event: String, args: Vec<Value> },
}

enum SessionEnd {
    /// The server went away after a successful connect.
    Lost,
    /// Every handle was dropped.
    Shutdown,
}

struct Driver(JoinHandle<()>);

/// Marks the connection down when the driver exits, whichever way it exits.
struct Offline<'a>(&'a watch::Sender<bool>);

impl Drop for Offline<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle onto the single Socket.IO connection shared by the application.
///
/// Cloning is cheap. The background task that owns the WebSocket stops when
/// the last clone is dropped, or after the reconnect policy is exhausted.
/// Anything sent while disconnected is queued and flushed on the next
/// successful connect.
#[derive(Clone)]
pub struct Socket {
    hub: Hub,
    outbound: mpsc::UnboundedSender<Outbound>,
    connected: watch::Receiver<bool>,
    _driver: Arc<Driver>,
}

impl Socket {
    /// Starts connecting to `url` (see [`crate::config::socket_url`]) in the
    /// background. Must be called from within a tokio runtime.
    pub fn connect(url: Url, policy: ReconnectPolicy) -> Self {
        let hub = Hub::default();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected) = watch::channel(false);
        let handle = tokio::spawn(drive(url, policy, hub.clone(), outbound_rx, connected_tx));
        Self {
            hub,
            outbound,
            connected,
            _driver: Arc::new(Driver(handle)),
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Observes connection state changes.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Waits until the connection is up. Fails once the connection has been
    /// abandoned.
    pub async fn wait_connected(&self) -> Result<()> {
        let mut connected = self.connected.clone();
        connected
            .wait_for(|connected| *connected)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Resolves once reconnection has been given up.
    pub async fn closed(&self) {
        let mut connected = self.connected.clone();
        while connected.changed().await.is_ok() {}
    }

    fn send(&self, command: Outbound) -> Result<()> {
        self.outbound
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}

impl Channel for Socket {
    fn register_identity(&self, identity: &Identity) -> Result<()> {
        self.send(Outbound::Register(identity.clone()))
    }

    fn subscribe(&self, event: &str) -> Subscription {
        self.hub.subscribe(event)
    }

    fn emit(&self, event: &str, args: Vec<Value>) -> Result<()> {
        self.send(Outbound::Emit {
            event: event.to_string(),
            args,
        })
    }
}

async fn drive(
    url: Url,
    policy: ReconnectPolicy,
    hub: Hub,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    connected: watch::Sender<bool>,
) {
    let _offline = Offline(&connected);
    // Identities outlive sessions so they can be re-announced.
    let mut identities: Vec<Identity> = Vec::new();
    let mut failures = 0u32;
    loop {
        match run_session(&url, &hub, &mut outbound, &mut identities, &connected).await {
            Ok(SessionEnd::Shutdown) => {
                debug!("socket handles dropped");
                return;
            }
            Ok(SessionEnd::Lost) => {
                info!(url = %url, "socket disconnected");
                failures = 0;
            }
            Err(err) => {
                failures += 1;
                warn!(url = %url, attempt = failures, error = ?err, "socket connect failed");
            }
        }
        connected.send_replace(false);
        if failures > policy.max_attempts {
            error!(url = %url, attempts = failures, "giving up on socket connection");
            return;
        }
        sleep(policy.delay).await;
    }
}

async fn run_session(
    url: &Url,
    hub: &Hub,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    identities: &mut Vec<Identity>,
    connected: &watch::Sender<bool>,
) -> Result<SessionEnd> {
    let (ws, _) = timeout(DIAL_TIMEOUT, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::DialTimeout)??;
    let (sink, mut stream) = ws.split();
    let mut session = Session::new(sink);

    let handshake = match next_engine_packet(&mut stream).await? {
        EnginePacket::Open(handshake) => handshake,
        _ => return Err(ProtocolError::Unexpected("open").into()),
    };
    debug!(
        sid = %handshake.sid,
        ping_interval = handshake.ping_interval,
        ping_timeout = handshake.ping_timeout,
        "engine.io open"
    );

    session.send(SocketPacket::connect()).await?;
    loop {
        match next_engine_packet(&mut stream).await? {
            EnginePacket::Ping(data) => session.send_engine(EnginePacket::Pong(data)).await?,
            EnginePacket::Message(text) => match SocketPacket::decode(&text)? {
                SocketPacket::Connect { .. } => break,
                SocketPacket::ConnectError { data, .. } => {
                    return Err(Error::ConnectRefused(refusal(data)));
                }
                other => debug!(?other, "packet before connect"),
            },
            EnginePacket::Close => return Err(Error::ConnectionClosed),
            _ => {}
        }
    }

    connected.send_replace(true);
    info!(url = %url, "socket connected");

    let ping_window = handshake.ping_window();
    match serve(
        &mut session,
        &mut stream,
        hub,
        outbound,
        identities,
        ping_window,
    )
    .await
    {
        Ok(end) => Ok(end),
        Err(err) => {
            warn!(error = ?err, "socket session ended");
            Ok(SessionEnd::Lost)
        }
    }
}

async fn serve<S, R>(
    session: &mut Session<S>,
    stream: &mut R,
    hub: &Hub,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    identities: &mut Vec<Identity>,
    ping_window: Duration,
) -> Result<SessionEnd>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    for identity in identities.iter() {
        session.register(identity).await?;
    }

    let mut deadline = ping_deadline(ping_window);
    loop {
        tokio::select! {
            command = outbound.recv() => {
                let Some(command) = command else {
                    let _ = session.send_engine(EnginePacket::Close).await;
                    return Ok(SessionEnd::Shutdown);
                };
                match command {
                    Outbound::Register(identity) => {
                        if !identities.contains(&identity) {
                            identities.push(identity.clone());
                        }
                        session.register(&identity).await?;
                    }
                    Outbound::Emit { event, args } => {
                        debug!(event = %event, "emit");
                        session.send(SocketPacket::event(event, args, None)).await?;
                    }
                }
            }
            packet = next_engine_packet(stream) => match packet? {
                EnginePacket::Ping(data) => {
                    deadline = ping_deadline(ping_window);
                    session.send_engine(EnginePacket::Pong(data)).await?;
                }
                EnginePacket::Message(text) => {
                    if !session.handle(&text, hub).await? {
                        return Ok(SessionEnd::Lost);
                    }
                }
                EnginePacket::Close => return Ok(SessionEnd::Lost),
                _ => {}
            },
            _ = sleep_until(deadline) => {
                warn!("no ping from server");
                return Ok(SessionEnd::Lost);
            }
        }
    }
}

fn ping_deadline(window: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(window)
        .or_else(|| now.checked_add(MAX_PING_WINDOW))
        .unwrap_or(now)
}

/// Next Engine.IO packet, skipping WebSocket control frames.
async fn next_engine_packet<R>(stream: &mut R) -> Result<EnginePacket>
where
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => return Ok(EnginePacket::decode(&text)?),
            Message::Close(_) => return Err(Error::ConnectionClosed),
            _ => {}
        }
    }
    Err(Error::ConnectionClosed)
}

fn refusal(data: Option<Value>) -> String {
    match data {
        Some(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => Value::Object(map).to_string(),
        },
        Some(other) => other.to_string(),
        None => "no reason given".to_string(),
    }
}

struct Session<S> {
    sink: S,
    next_ack: u64,
    pending: HashMap<u64, Identity>,
}

impl<S> Session<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    fn new(sink: S) -> Self {
        Self {
            sink,
            next_ack: 0,
            pending: HashMap::new(),
        }
    }

    async fn send_engine(&mut self, packet: EnginePacket) -> Result<()> {
        self.sink.send(Message::Text(packet.encode())).await?;
        Ok(())
    }

    async fn send(&mut self, packet: SocketPacket) -> Result<()> {
        self.sink.send(Message::Text(packet.into_frame())).await?;
        Ok(())
    }

    async fn register(&mut self, identity: &Identity) -> Result<()> {
        let id = self.next_ack;
        self.next_ack += 1;
        self.pending.insert(id, identity.clone());
        debug!(identity = %identity, ack = id, "registering identity");
        self.send(SocketPacket::event(
            REGISTER,
            vec![Value::String(identity.to_string())],
            Some(id),
        ))
        .await
    }

    /// Handles one Socket.IO packet; `false` means the server disconnected
    /// us.
    async fn handle(&mut self, text: &str, hub: &Hub) -> Result<bool> {
        let packet = match SocketPacket::decode(text) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(error = ?err, "dropping undecodable packet");
                return Ok(true);
            }
        };
        match packet {
            SocketPacket::Event {
                id, event, args, ..
            } => {
                let delivered = hub.dispatch(&event, &args);
                debug!(event = %event, delivered, "push");
                if let Some(id) = id {
                    self.send(SocketPacket::ack(id, Vec::new())).await?;
                }
            }
            SocketPacket::Ack { id, args, .. } => match self.pending.remove(&id) {
                Some(identity) => {
                    info!(identity = %identity, response = ?args, "identity registered");
                }
                None => debug!(ack = id, "unsolicited ack"),
            },
            SocketPacket::Disconnect { .. } => return Ok(false),
            SocketPacket::ConnectError { data, .. } => {
                warn!(reason = %refusal(data), "server rejected namespace");
                return Ok(false);
            }
            SocketPacket::Connect { .. } => {}
        }
        Ok(true)
    }
}
