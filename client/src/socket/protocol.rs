//! Engine.IO v4 and Socket.IO v4 text framing.
//!
//! Engine.IO wraps everything in a one-digit packet type; Socket.IO packets
//! travel inside Engine.IO `message` packets:
//!
//! ```text
//! 42["jailStatusUpdated",{...}]    message / EVENT
//! 4213["register","wallet"]        message / EVENT with ack id 13
//! 43/admin,13["ok"]                message / ACK on namespace /admin
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Upper bound on how long to wait for a server ping, whatever the server
/// announces.
pub const MAX_PING_WINDOW: Duration = Duration::from_secs(300);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,
    #[error("unknown engine packet type: {0}")]
    UnknownEnginePacket(char),
    #[error("unknown socket packet type: {0}")]
    UnknownSocketPacket(char),
    #[error("binary packets are not supported")]
    UnsupportedBinary,
    #[error("invalid ack id")]
    InvalidAckId,
    #[error("invalid packet payload: {0}")]
    InvalidPayload(String),
    #[error("event packet without a name")]
    MissingEventName,
    #[error("unexpected packet, expected {0}")]
    Unexpected(&'static str),
}

/// Payload of the Engine.IO `open` packet.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the server may stay silent before the session is
    /// considered lost: `pingInterval + pingTimeout`, capped at
    /// [`MAX_PING_WINDOW`].
    pub fn ping_window(&self) -> Duration {
        let millis = self.ping_interval.saturating_add(self.ping_timeout);
        Duration::from_millis(millis).min(MAX_PING_WINDOW)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();
        Ok(match kind {
            '0' => EnginePacket::Open(
                serde_json::from_str(rest)
                    .map_err(|err| ProtocolError::InvalidPayload(err.to_string()))?,
            ),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(rest.to_string()),
            '3' => EnginePacket::Pong(rest.to_string()),
            '4' => EnginePacket::Message(rest.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => return Err(ProtocolError::UnknownEnginePacket(other)),
        })
    }

    /// Encodes the packet. `Open` is only ever sent by servers and is
    /// encoded without its handshake.
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(_) => "0".to_string(),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        event: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    pub fn event(event: impl Into<String>, args: Vec<Value>, id: Option<u64>) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id,
            event: event.into(),
            args,
        }
    }

    pub fn ack(id: u64, args: Vec<Value>) -> Self {
        SocketPacket::Ack {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id,
            args,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::UnsupportedBinary);
        }
        if !matches!(kind, '0'..='4') {
            return Err(ProtocolError::UnknownSocketPacket(kind));
        }
        let mut rest = chars.as_str();

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            namespace = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
        }

        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|_| ProtocolError::InvalidAckId)?,
            )
        } else {
            None
        };
        let payload = &rest[digits..];
        let data = if payload.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(payload)
                    .map_err(|err| ProtocolError::InvalidPayload(err.to_string()))?,
            )
        };

        Ok(match kind {
            '0' => SocketPacket::Connect { namespace, data },
            '1' => SocketPacket::Disconnect { namespace },
            '2' => {
                let mut args = match data {
                    Some(Value::Array(args)) => args,
                    _ => return Err(ProtocolError::MissingEventName),
                };
                if args.is_empty() {
                    return Err(ProtocolError::MissingEventName);
                }
                let event = match args.remove(0) {
                    Value::String(event) => event,
                    _ => return Err(ProtocolError::MissingEventName),
                };
                SocketPacket::Event {
                    namespace,
                    id,
                    event,
                    args,
                }
            }
            '3' => {
                let id = id.ok_or(ProtocolError::InvalidAckId)?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                SocketPacket::Ack {
                    namespace,
                    id,
                    args,
                }
            }
            _ => SocketPacket::ConnectError { namespace, data },
        })
    }

    pub fn encode(&self) -> String {
        let (kind, id, data) = match self {
            SocketPacket::Connect { data, .. } => ('0', None, data.clone()),
            SocketPacket::Disconnect { .. } => ('1', None, None),
            SocketPacket::Event {
                id, event, args, ..
            } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(event.clone()));
                array.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(array)))
            }
            SocketPacket::Ack { id, args, .. } => ('3', Some(*id), Some(Value::Array(args.clone()))),
            SocketPacket::ConnectError { data, .. } => ('4', None, data.clone()),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Wraps the packet in an Engine.IO message frame.
    pub fn into_frame(self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_packets() {
        let open = EnginePacket::decode(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        let EnginePacket::Open(handshake) = open else {
            panic!("expected open");
        };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.ping_interval, 25_000);

        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        assert_eq!(
            EnginePacket::decode("42[\"x\"]").unwrap(),
            EnginePacket::Message("2[\"x\"]".to_string())
        );
        assert_eq!(EnginePacket::decode("1").unwrap(), EnginePacket::Close);
        assert_eq!(EnginePacket::decode("6").unwrap(), EnginePacket::Noop);
        assert_eq!(EnginePacket::decode(""), Err(ProtocolError::Empty));
        assert_eq!(
            EnginePacket::decode("9"),
            Err(ProtocolError::UnknownEnginePacket('9'))
        );
    }

    #[test]
    fn test_ping_window_capped() {
        let EnginePacket::Open(handshake) = EnginePacket::decode(
            r#"0{"sid":"s1","pingInterval":18446744073709551615,"pingTimeout":20000}"#,
        )
        .unwrap() else {
            panic!("expected open");
        };
        assert_eq!(handshake.ping_window(), MAX_PING_WINDOW);

        let EnginePacket::Open(handshake) =
            EnginePacket::decode(r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":20000}"#)
                .unwrap()
        else {
            panic!("expected open");
        };
        assert_eq!(handshake.ping_window(), Duration::from_secs(45));
    }

    #[test]
    fn test_decode_event() {
        let packet =
            SocketPacket::decode(r#"2["jailStatusUpdated",{"walletAddress":"w1"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".to_string(),
                id: None,
                event: "jailStatusUpdated".to_string(),
                args: vec![json!({"walletAddress": "w1"})],
            }
        );
    }

    #[test]
    fn test_namespace_and_ack_id_preserved() {
        let text = r#"2/admin,17["register","w1"]"#;
        let packet = SocketPacket::decode(text).unwrap();
        assert_eq!(packet.namespace(), "/admin");
        assert!(matches!(packet, SocketPacket::Event { id: Some(17), .. }));
        assert_eq!(packet.encode(), text);

        let ack = SocketPacket::decode(r#"313["registered"]"#).unwrap();
        assert_eq!(ack, SocketPacket::ack(13, vec![json!("registered")]));
        assert_eq!(ack.encode(), r#"313["registered"]"#);
    }

    #[test]
    fn test_connect_packets() {
        assert_eq!(SocketPacket::connect().into_frame(), "40");
        let connected = SocketPacket::decode(r#"0{"sid":"xyz"}"#).unwrap();
        assert!(
            matches!(connected, SocketPacket::Connect { ref data, .. } if data == &Some(json!({"sid": "xyz"})))
        );
        let refused = SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap();
        assert!(matches!(refused, SocketPacket::ConnectError { .. }));
        assert_eq!(
            SocketPacket::decode("1/chat,").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/chat".to_string()
            }
        );
    }

    #[test]
    fn test_encode_event_frame() {
        let frame = SocketPacket::event("register", vec![json!("w1")], Some(0)).into_frame();
        assert_eq!(frame, r#"420["register","w1"]"#);
    }

    #[test]
    fn test_binary_and_malformed_rejected() {
        assert_eq!(
            SocketPacket::decode(r#"51-["upload",{"_placeholder":true,"num":0}]"#),
            Err(ProtocolError::UnsupportedBinary)
        );
        assert_eq!(
            SocketPacket::decode("6"),
            Err(ProtocolError::UnsupportedBinary)
        );
        assert_eq!(
            SocketPacket::decode("2[]"),
            Err(ProtocolError::MissingEventName)
        );
        assert_eq!(
            SocketPacket::decode("2[42]"),
            Err(ProtocolError::MissingEventName)
        );
        assert!(matches!(
            SocketPacket::decode("2[\"x\""),
            Err(ProtocolError::InvalidPayload(_))
        ));
        assert_eq!(
            SocketPacket::decode("3[]"),
            Err(ProtocolError::InvalidAckId)
        );
        assert_eq!(
            SocketPacket::decode("9"),
            Err(ProtocolError::UnknownSocketPacket('9'))
        );
    }
}
