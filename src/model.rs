//! Entities mirrored locally for the reporting program

use serde::{Deserialize, Serialize};

use crate::codec::ScalarValue;

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Report severity, carried on chain as a `u8` ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Severity::Low),
            1 => Ok(Severity::Medium),
            2 => Ok(Severity::High),
            3 => Ok(Severity::Critical),
            other => Err(format!("severity out of range: {other}")),
        }
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value as u8
    }
}

/// Report review status, carried on chain as a `u8` ordinal
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReportStatus {
    #[default]
    Open = 0,
    Reviewing = 1,
    Resolved = 2,
    Dismissed = 3,
}

impl ReportStatus {
    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Open => "Open",
            ReportStatus::Reviewing => "Reviewing",
            ReportStatus::Resolved => "Resolved",
            ReportStatus::Dismissed => "Dismissed",
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ReportStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReportStatus::Open),
            1 => Ok(ReportStatus::Reviewing),
            2 => Ok(ReportStatus::Resolved),
            3 => Ok(ReportStatus::Dismissed),
            other => Err(format!("status out of range: {other}")),
        }
    }
}

impl From<ReportStatus> for u8 {
    fn from(value: ReportStatus) -> Self {
        value as u8
    }
}

/// An organization this client registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub org_id: ScalarValue,
    /// Plaintext name; only its encoding is ever submitted
    pub name: String,
    pub admin_address: String,
    pub tx_id: String,
    pub created_at: u64,
}

/// A membership this client created or joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Absent when the secret was saved before its organization was known
    #[serde(default)]
    pub org_id: Option<ScalarValue>,
    /// Absent until the membership hash has been computed
    #[serde(default)]
    pub member_hash: Option<ScalarValue>,
    /// Local-only secret
    #[serde(default)]
    pub secret: Option<ScalarValue>,
    #[serde(default)]
    pub tx_id: Option<String>,
    pub created_at: u64,
}

/// A report this client submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: ScalarValue,
    pub org_id: ScalarValue,
    pub severity: Severity,
    /// Display-only excerpt of what the user typed
    pub excerpt: String,
    pub tx_id: String,
    /// Cached; the ledger holds the authoritative value
    #[serde(default)]
    pub status: ReportStatus,
    pub created_at: u64,
}

/// Kind tag of an activity log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    OrgRegistered,
    MemberAdded,
    MemberJoined,
    ReportSubmitted,
    StatusUpdated,
    TxConfirmed,
    TxTimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    #[serde(default)]
    pub ref_id: Option<String>,
    pub timestamp: u64,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, message: impl Into<String>, ref_id: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ref_id,
            timestamp: now_ms(),
        }
    }
}

/// Shorten an address for display: `aleo1abcde...uvwxyz`
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}
