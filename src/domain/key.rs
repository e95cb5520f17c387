// Dimension and group keys
use crate::error::DashboardError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A totally ordered key. Keys of different kinds order by kind first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Key {
    Time(DateTime<Utc>),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Time,
    Text,
}

impl Key {
    pub fn text(value: impl Into<String>) -> Self {
        Key::Text(value.into())
    }

    /// Parse a client-supplied key for a dimension of the given kind.
    pub fn parse(kind: KeyKind, raw: &str) -> Result<Self, DashboardError> {
        let invalid = || DashboardError::InvalidKey {
            kind,
            value: raw.to_string(),
        };
        match kind {
            KeyKind::Text => Ok(Key::Text(raw.to_string())),
            KeyKind::Time => parse_instant(raw).map(Key::Time).ok_or_else(invalid),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Key::Text(s) => write!(f, "{}", s),
        }
    }
}

/// ISO-8601 instant: RFC 3339 with offset, or a naive date-time read as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
