use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Maximum accepted length of an identity string.
pub const MAX_IDENTITY_LENGTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,
    #[error("identity too long: {len} (max {max})")]
    TooLong { len: usize, max: usize },
    #[error("identity contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Key that scopes push delivery and REST paths: a wallet address, a
/// username or a family id.
///
/// Identities are interpolated into URL paths, so whitespace, `/`, `?` and
/// `#` are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentityError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdentityError::Empty);
        }
        if raw.len() > MAX_IDENTITY_LENGTH {
            return Err(IdentityError::TooLong {
                len: raw.len(),
                max: MAX_IDENTITY_LENGTH,
            });
        }
        if let Some(c) = raw
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
        {
            return Err(IdentityError::InvalidCharacter(c));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares against a raw identity string from an untyped payload.
    pub fn matches(&self, raw: &str) -> bool {
        self.0 == raw
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accepts_wallet_address() {
        let wallet = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
        let identity = Identity::new(wallet).unwrap();
        assert_eq!(identity.as_str(), wallet);
        assert!(identity.matches(wallet));
        assert!(!identity.matches("someone-else"));
    }

    #[test]
    fn test_identity_rejects_path_characters() {
        assert_eq!(Identity::new(""), Err(IdentityError::Empty));
        assert_eq!(
            Identity::new("a/b"),
            Err(IdentityError::InvalidCharacter('/'))
        );
        assert_eq!(
            Identity::new("a b"),
            Err(IdentityError::InvalidCharacter(' '))
        );
        assert!(matches!(
            Identity::new("x".repeat(MAX_IDENTITY_LENGTH + 1)),
            Err(IdentityError::TooLong { .. })
        ));
    }

    #[test]
    fn test_identity_validated_on_deserialize() {
        let ok: Identity = serde_json::from_str("\"wallet-1\"").unwrap();
        assert_eq!(ok.as_str(), "wallet-1");
        assert!(serde_json::from_str::<Identity>("\"\"").is_err());
    }
}
