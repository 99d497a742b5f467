//! Session vocabulary shared with the transport: service tag, peer states, delivery modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Service type advertised and browsed for when none is configured.
pub const DEFAULT_SERVICE_TAG: &str = "multipeer-test";

const MAX_SERVICE_TAG_LEN: usize = 15;

/// Validated service type. 1-15 chars of `[a-z0-9-]`, no leading, trailing or doubled hyphen.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceTag(String);

impl ServiceTag {
    pub fn new(tag: impl Into<String>) -> Result<Self, ServiceTagError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(ServiceTagError::Empty);
        }
        if tag.len() > MAX_SERVICE_TAG_LEN {
            return Err(ServiceTagError::TooLong(tag.len()));
        }
        if let Some(c) = tag
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ServiceTagError::InvalidChar(c));
        }
        if tag.starts_with('-') || tag.ends_with('-') || tag.contains("--") {
            return Err(ServiceTagError::Hyphen);
        }
        Ok(ServiceTag(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServiceTag {
    fn default() -> Self {
        ServiceTag(DEFAULT_SERVICE_TAG.to_string())
    }
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceTag {
    type Err = ServiceTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceTag::new(s)
    }
}

impl TryFrom<String> for ServiceTag {
    type Error = ServiceTagError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ServiceTag::new(s)
    }
}

impl From<ServiceTag> for String {
    fn from(tag: ServiceTag) -> Self {
        tag.0
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ServiceTagError {
    #[error("service tag is empty")]
    Empty,
    #[error("service tag is {0} characters, at most 15 allowed")]
    TooLong(usize),
    #[error("service tag contains invalid character {0:?}")]
    InvalidChar(char),
    #[error("service tag has a leading, trailing or doubled hyphen")]
    Hyphen,
}

/// Connection state of one remote peer as reported by the transport.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PeerState {
    Connecting,
    Connected,
    Disconnected,
}

impl PeerState {
    /// Host encoding used by the C ABI: 0 connecting, 1 connected, 2 disconnected.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(PeerState::Connecting),
            1 => Some(PeerState::Connected),
            2 => Some(PeerState::Disconnected),
            _ => None,
        }
    }
}

/// Delivery mode requested from the transport for one send.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Reliability {
    /// In-order, retried delivery while the connection persists.
    Reliable,
    Unreliable,
}

impl Reliability {
    pub fn as_u8(self) -> u8 {
        match self {
            Reliability::Reliable => 0,
            Reliability::Unreliable => 1,
        }
    }
}
