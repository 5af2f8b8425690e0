//! Migration ledger records.
//!
//! One [`MigrationRecord`] is written per applied (or attempted) migration.
//! The column order of the ledger table mirrors the field order here; both
//! are a compatibility contract for existing databases.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::value::Row;
use crate::error::{LedgerError, Result};

/// Maximum stored length of a migration description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Maximum stored length of a migration script name, in characters.
pub const MAX_NAME_LEN: usize = 1000;

/// Kind of ledger entry.
///
/// The runner decides which kinds exist; the ledger only persists the
/// discriminant. Wire values are part of the storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    /// An ordered, versioned migration script.
    Versioned,
    /// Creation of the target schema itself, recorded before any script runs.
    SchemaCreation,
    /// A baseline marker for adopting a pre-existing database.
    Baseline,
    /// A repeatable script, re-run whenever its checksum changes.
    Repeatable,
}

/// Convert a migration kind to its stored discriminant.
pub fn kind_to_i16(kind: MigrationKind) -> i16 {
    match kind {
        MigrationKind::Versioned => 1,
        MigrationKind::SchemaCreation => 2,
        MigrationKind::Baseline => 3,
        MigrationKind::Repeatable => 4,
    }
}

/// Parse a stored discriminant back into a migration kind.
pub fn i16_to_kind(value: i16) -> Result<MigrationKind> {
    match value {
        1 => Ok(MigrationKind::Versioned),
        2 => Ok(MigrationKind::SchemaCreation),
        3 => Ok(MigrationKind::Baseline),
        4 => Ok(MigrationKind::Repeatable),
        other => Err(LedgerError::UnknownKind(other)),
    }
}

/// One persisted row of the migration ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Ledger-assigned id, strictly increasing in insertion order.
    pub id: i32,

    /// Kind of entry.
    pub kind: MigrationKind,

    /// Version string; `None` for non-versioned kinds.
    pub version: Option<String>,

    /// Free-text description, capped at [`MAX_DESCRIPTION_LEN`].
    pub description: String,

    /// Script name, capped at [`MAX_NAME_LEN`].
    pub name: String,

    /// Content hash of the migration script.
    pub checksum: String,

    /// Database user that applied the migration.
    pub installed_by: String,

    /// When the record was inserted (UTC).
    pub installed_on: DateTime<Utc>,

    /// Whether the migration succeeded. Failed records are never deleted;
    /// a retry appends a new record.
    pub success: bool,
}

impl MigrationRecord {
    /// Map a ledger row into a record.
    ///
    /// Expects the canonical nine-column order: id, type, version,
    /// description, name, checksum, installed_by, installed_on, success.
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(MigrationRecord {
            id: row.get_i32(0)?,
            kind: i16_to_kind(row.get_i16(1)?)?,
            version: row.opt_string(2)?,
            description: row.get_string(3)?,
            name: row.get_string(4)?,
            checksum: row.get_string(5)?,
            installed_by: row.get_string(6)?,
            installed_on: row.get_datetime(7)?,
            success: row.get_bool(8)?,
        })
    }
}

/// Input for saving a new ledger entry.
///
/// The ledger assigns `id`, `installed_by` and `installed_on` at insert time.
#[derive(Debug, Clone)]
pub struct NewMigration {
    /// Kind of entry.
    pub kind: MigrationKind,
    /// Version string; `None` for non-versioned kinds.
    pub version: Option<String>,
    /// Free-text description, truncated on insert.
    pub description: String,
    /// Script name, truncated on insert.
    pub name: String,
    /// Content hash of the migration script.
    pub checksum: String,
    /// Outcome of the migration attempt.
    pub success: bool,
}

/// Truncate a string to at most `max_chars` characters, ending in `...`
/// when anything was cut. Char-boundary safe.
///
/// The result is exactly `max_chars` characters long for oversized input,
/// which keeps truncated values inside the ledger's column limits.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_chars {
        return Cow::Borrowed(s);
    }

    if max_chars <= 3 {
        return Cow::Owned(s.chars().take(max_chars).collect());
    }

    let kept: String = s.chars().take(max_chars - 3).collect();
    Cow::Owned(format!("{kept}..."))
}
