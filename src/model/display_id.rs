//! External-safe short identifiers (`NNNN-AAAA`).

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

const PREFIX_LEN: usize = 4;
const SUFFIX_LEN: usize = 4;
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Display id: four ASCII digits, a hyphen, then an ASCII alphanumeric suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayId(String);

/// Reason a string is not a display id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed display id: {0:?}")]
pub struct InvalidDisplayId(pub String);

impl DisplayId {
    /// Validate and wrap a display id.
    pub fn parse(raw: &str) -> Result<Self, InvalidDisplayId> {
        let valid = raw.split_once('-').is_some_and(|(prefix, suffix)| {
            prefix.len() == PREFIX_LEN
                && prefix.bytes().all(|b| b.is_ascii_digit())
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
        });
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(InvalidDisplayId(raw.to_owned()))
        }
    }

    /// Generate a random display id.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate a display id from the given random source.
    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let mut id = String::with_capacity(PREFIX_LEN + 1 + SUFFIX_LEN);
        for _ in 0..PREFIX_LEN {
            id.push(char::from(b'0' + rng.random_range(0..10u8)));
        }
        id.push('-');
        for _ in 0..SUFFIX_LEN {
            id.push(char::from(ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())]));
        }
        Self(id)
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DisplayId {
    type Err = InvalidDisplayId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DisplayId {
    type Error = InvalidDisplayId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DisplayId> for String {
    fn from(value: DisplayId) -> Self {
        value.0
    }
}
