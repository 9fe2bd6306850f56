use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TetherError;

/// Remote peer address: an immutable `(hostname, port)` pair.
///
/// Displayed as `hostname:port`. Equality and ordering are field-wise,
/// hostname first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    hostname: String,
    port: u16,
}

impl Address {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

impl FromStr for Address {
    type Err = TetherError;

    /// Parses `host:port`, splitting on the last `:` so that any rendered
    /// address (including a bare IPv6 host or an empty hostname) parses
    /// back to itself.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hostname, port) = s
            .rsplit_once(':')
            .ok_or_else(|| TetherError::InvalidAddress(format!("missing port in {s:?}")))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| TetherError::InvalidAddress(format!("bad port in {s:?}")))?;
        Ok(Self::new(hostname, port))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
