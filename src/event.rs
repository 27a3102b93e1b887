//! File-activity events and their intrinsic risk weights.

use serde::{Deserialize, Serialize};

/// Seconds since the UNIX epoch, fractional.
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`].
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Kind of file operation observed or synthesized by an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
    Renamed,
    MassRead,
    EncryptOp,
    BackupDelete,
    NormalAccess,
    NormalModify,
}

impl EventKind {
    /// Static risk weight for this kind.
    pub const fn risk_weight(self) -> u32 {
        match self {
            EventKind::Created => 1,
            EventKind::Modified => 2,
            EventKind::Deleted => 10,
            EventKind::Renamed => 25,
            EventKind::MassRead => 10,
            EventKind::EncryptOp => 50,
            EventKind::BackupDelete => 75,
            EventKind::NormalAccess => 1,
            EventKind::NormalModify => 2,
        }
    }

    /// Content-changing operations, counted as `modify_count`.
    pub const fn is_modify(self) -> bool {
        matches!(
            self,
            EventKind::Modified | EventKind::NormalModify | EventKind::EncryptOp
        )
    }

    pub const fn is_rename(self) -> bool {
        matches!(self, EventKind::Renamed)
    }

    /// Destructive operations, counted towards `delete_ratio`.
    pub const fn is_delete(self) -> bool {
        matches!(self, EventKind::Deleted | EventKind::BackupDelete)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Created => "created",
            EventKind::Modified => "modified",
            EventKind::Deleted => "deleted",
            EventKind::Renamed => "renamed",
            EventKind::MassRead => "mass_read",
            EventKind::EncryptOp => "encrypt_op",
            EventKind::BackupDelete => "backup_delete",
            EventKind::NormalAccess => "normal_access",
            EventKind::NormalModify => "normal_modify",
        };
        write!(f, "{}", name)
    }
}

/// An immutable record of one file operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub kind: EventKind,
    pub file: String,
    pub risk_weight: u32,
}

impl Event {
    /// Build an event whose weight comes from the kind's static table entry.
    pub fn new(timestamp: Timestamp, kind: EventKind, file: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            file: file.into(),
            risk_weight: kind.risk_weight(),
        }
    }

    /// Same as [`Event::new`] stamped with the current wall-clock time.
    pub fn now(kind: EventKind, file: impl Into<String>) -> Self {
        Self::new(unix_now(), kind, file)
    }
}
