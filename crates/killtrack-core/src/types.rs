use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Mode ─────────────────────────────────────────────────────────

/// Difficulty variant of a subject.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    None,
    Normal,
    Hard,
}

impl Mode {
    pub const ALL: [Self; 3] = [Self::None, Self::Normal, Self::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }

    /// Short tag used as the record key suffix and in listings.
    /// `None` has no tag.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Normal => Some("nm"),
            Self::Hard => Some("hm"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "normal" | "nm" => Ok(Self::Normal),
            "hard" | "hm" => Ok(Self::Hard),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0}")]
pub struct UnknownMode(pub String);

// ─── Subject normalization ────────────────────────────────────────

/// Normalize a raw subject display name: lowercase, keep only ASCII
/// alphanumerics and spaces, trim.
///
/// Idempotent: `normalize_subject(&normalize_subject(s)) == normalize_subject(s)`.
pub fn normalize_subject(raw: &str) -> String {
    let kept: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();
    kept.trim().to_string()
}

// ─── RecordKey ────────────────────────────────────────────────────

/// Aggregation identity: normalized subject with spaces replaced by `_`,
/// suffixed with `_<tag>` when the mode carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Build a key from a raw (not yet normalized) subject.
    pub fn new(subject_raw: &str, mode: Mode) -> Self {
        Self::from_normalized(&normalize_subject(subject_raw), mode)
    }

    /// Build a key from an already normalized subject.
    pub fn from_normalized(subject: &str, mode: Mode) -> Self {
        let base = subject.replace(' ', "_");
        match mode.tag() {
            Some(tag) => Self(format!("{base}_{tag}")),
            None => Self(base),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── KillRecord ───────────────────────────────────────────────────

/// Durable aggregate for one (subject, mode) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillRecord {
    /// Normalized subject.
    pub subject: String,
    pub mode: Mode,
    pub kill_count: u64,
    /// Never reverts to `false` once stored as `true`.
    pub pet_acquired: bool,
    pub updated_at: DateTime<Utc>,
}

impl KillRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::from_normalized(&self.subject, self.mode)
    }

    /// `subject` or `subject (tag)` for listings.
    pub fn label(&self) -> String {
        match self.mode.tag() {
            Some(tag) => format!("{} ({tag})", self.subject),
            None => self.subject.clone(),
        }
    }
}
