//! Bounded / unbounded limits

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A policy limit. An absent `limit` key in a policy means [`Limit::Unbounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// At most this many
    Bounded(u64),
    /// No cap
    Unbounded,
}

impl Limit {
    /// Limit from an optional policy value
    pub fn from_option(limit: Option<u64>) -> Self {
        limit.map_or(Self::Unbounded, Self::Bounded)
    }

    /// Whether one more item fits when `count` already exist
    pub fn allows_another(&self, count: u64) -> bool {
        match self {
            Self::Bounded(limit) => count < *limit,
            Self::Unbounded => true,
        }
    }

    /// Whether `count` items exceed the limit
    pub fn is_exceeded_by(&self, count: u64) -> bool {
        match self {
            Self::Bounded(limit) => count > *limit,
            Self::Unbounded => false,
        }
    }

    /// Wire value: the limit, or `-1` for unbounded
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Bounded(limit) => i64::try_from(*limit).unwrap_or(i64::MAX),
            Self::Unbounded => -1,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(limit) => write!(f, "{}", limit),
            Self::Unbounded => write!(f, "unlimited"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        if value < 0 {
            Ok(Self::Unbounded)
        } else {
            Ok(Self::Bounded(value as u64))
        }
    }
}
