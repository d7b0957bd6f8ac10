//! Backend endpoints and reconnection settings, read from the environment.

use crate::{Error, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

const DEFAULT_ORIGIN: &str = "http://localhost:5000";

/// Base URL of every backend the game talks to.
///
/// Service URLs always end in `/` so relative paths join beneath them.
/// `missions` is the exception: it names the endpoint itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub socket: Url,
    pub player: Url,
    pub jail: Url,
    pub business: Url,
    pub upgrade: Url,
    pub kill: Url,
    pub missions: Url,
    pub family: Url,
    pub hitter: Url,
    pub base: Url,
}

impl Endpoints {
    /// Reads `MAFFISOL_*_URL` variables, falling back to a local backend.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            socket: socket_url(&read_string("MAFFISOL_SOCKET_URL", DEFAULT_ORIGIN))?,
            player: service_url(&read_string(
                "MAFFISOL_PLAYER_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/player"),
            ))?,
            jail: service_url(&read_string(
                "MAFFISOL_JAIL_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/jail"),
            ))?,
            business: service_url(&read_string(
                "MAFFISOL_BUSINESS_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/business"),
            ))?,
            upgrade: service_url(&read_string(
                "MAFFISOL_UPGRADE_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/upgrades"),
            ))?,
            kill: service_url(&read_string(
                "MAFFISOL_KILL_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/kill"),
            ))?,
            missions: endpoint_url(&read_string(
                "MAFFISOL_MISSIONS_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/missions"),
            ))?,
            family: service_url(&read_string(
                "MAFFISOL_FAMILY_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/family-dashboard"),
            ))?,
            hitter: service_url(&read_string(
                "MAFFISOL_HITTER_API_URL",
                &format!("{DEFAULT_ORIGIN}/api/hitter"),
            ))?,
            base: service_url(&read_string(
                "MAFFISOL_BASE_API_URL",
                &format!("{DEFAULT_ORIGIN}/api"),
            ))?,
        })
    }

    /// Every service mounted under one origin, the way the development
    /// proxy serves them.
    pub fn single(origin: &str) -> Result<Self> {
        let origin = origin.trim_end_matches('/');
        Ok(Self {
            socket: socket_url(origin)?,
            player: service_url(&format!("{origin}/api/player"))?,
            jail: service_url(&format!("{origin}/api/jail"))?,
            business: service_url(&format!("{origin}/api/business"))?,
            upgrade: service_url(&format!("{origin}/api/upgrades"))?,
            kill: service_url(&format!("{origin}/api/kill"))?,
            missions: endpoint_url(&format!("{origin}/api/missions"))?,
            family: service_url(&format!("{origin}/api/family-dashboard"))?,
            hitter: service_url(&format!("{origin}/api/hitter"))?,
            base: service_url(&format!("{origin}/api"))?,
        })
    }
}

/// Bounded reconnection: after `max_attempts` consecutive failures the
/// connection is abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_env() -> Self {
        Self {
            max_attempts: read_u32("MAFFISOL_RECONNECT_ATTEMPTS", DEFAULT_RECONNECT_ATTEMPTS),
            delay: Duration::from_millis(read_ms(
                "MAFFISOL_RECONNECT_DELAY_MS",
                DEFAULT_RECONNECT_DELAY_MS,
            )),
        }
    }
}

fn read_string(key: &str, fallback: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn read_ms(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn read_u32(key: &str, fallback: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(fallback)
}

fn http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidScheme(scheme.to_string())),
    }
}

/// Parses a service base URL, forcing a trailing slash.
pub fn service_url(raw: &str) -> Result<Url> {
    let mut url = http_url(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parses a URL naming a single endpoint; the path is kept as given.
pub fn endpoint_url(raw: &str) -> Result<Url> {
    http_url(raw)
}

/// Turns an http(s) or ws(s) origin into the Engine.IO websocket URL.
pub fn socket_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        scheme => return Err(Error::InvalidScheme(scheme.to_string())),
    };
    if url.set_scheme(scheme).is_err() {
        return Err(Error::InvalidScheme(url.scheme().to_string()));
    }
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_gets_trailing_slash() {
        let url = service_url("http://localhost:5000/api/jail").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/jail/");
        assert_eq!(
            url.join("jail-status/w1").unwrap().as_str(),
            "http://localhost:5000/api/jail/jail-status/w1"
        );

        let url = service_url("https://api.example.com/").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/");
    }

    #[test]
    fn test_invalid_scheme() {
        let err = service_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, Error::InvalidScheme(_)));
        assert_eq!(
            err.to_string(),
            "invalid URL scheme: ftp (expected http or https)"
        );

        assert!(matches!(
            socket_url("ftp://example.com"),
            Err(Error::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_socket_url() {
        let url = socket_url("http://localhost:5000").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        let url = socket_url("https://game.example.com/").unwrap();
        assert_eq!(url.scheme(), "wss");
        let url = socket_url("ws://127.0.0.1:9000").unwrap();
        assert_eq!(url.port(), Some(9000));
    }

    #[test]
    fn test_single_origin() {
        let endpoints = Endpoints::single("http://127.0.0.1:4000/").unwrap();
        assert_eq!(endpoints.jail.as_str(), "http://127.0.0.1:4000/api/jail/");
        assert_eq!(
            endpoints.missions.as_str(),
            "http://127.0.0.1:4000/api/missions"
        );
        assert_eq!(endpoints.socket.scheme(), "ws");
    }

    #[test]
    fn test_reconnect_policy_default() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(1_000));
    }
}
