use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::ColumnId;
use crate::model::lenient;

//
// ─── COLUMN KIND ───────────────────────────────────────────────────────────────
//

/// Category tag of a tracked activity column.
///
/// Unknown tags found in persisted or imported data read back as `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ColumnKind {
    Pyqs,
    Notes,
    Lectures,
    QuickRevision,
    BrushUp,
    #[default]
    Custom,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 6] = [
        ColumnKind::Pyqs,
        ColumnKind::Notes,
        ColumnKind::Lectures,
        ColumnKind::QuickRevision,
        ColumnKind::BrushUp,
        ColumnKind::Custom,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Pyqs => "pyqs",
            ColumnKind::Notes => "notes",
            ColumnKind::Lectures => "lectures",
            ColumnKind::QuickRevision => "quick-revision",
            ColumnKind::BrushUp => "brush-up",
            ColumnKind::Custom => "custom",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown column type: {0}")]
pub struct ParseColumnKindError(String);

impl FromStr for ColumnKind {
    type Err = ParseColumnKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseColumnKindError(s.to_owned()))
    }
}

impl From<String> for ColumnKind {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<ColumnKind> for &'static str {
    fn from(kind: ColumnKind) -> Self {
        kind.as_str()
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PRESETS ───────────────────────────────────────────────────────────────────
//

/// A named column template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPreset {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// Columns every new subject starts with, in this order.
pub const DEFAULT_COLUMNS: [ColumnPreset; 2] = [
    ColumnPreset {
        name: "PYQs",
        kind: ColumnKind::Pyqs,
    },
    ColumnPreset {
        name: "Notes",
        kind: ColumnKind::Notes,
    },
];

/// Extra columns offered when a subject needs more tracking.
pub const AVAILABLE_COLUMNS: [ColumnPreset; 3] = [
    ColumnPreset {
        name: "Lectures",
        kind: ColumnKind::Lectures,
    },
    ColumnPreset {
        name: "Quick Revision",
        kind: ColumnKind::QuickRevision,
    },
    ColumnPreset {
        name: "Brush up",
        kind: ColumnKind::BrushUp,
    },
];

impl ColumnPreset {
    /// Preset whose name matches `name`, ignoring case and surrounding space.
    #[must_use]
    pub fn lookup(name: &str) -> Option<ColumnPreset> {
        let name = name.trim();
        DEFAULT_COLUMNS
            .into_iter()
            .chain(AVAILABLE_COLUMNS)
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }
}

//
// ─── COLUMN ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default = "lenient::missing_column", deserialize_with = "lenient::column_id")]
    pub id: ColumnId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::column_kind")]
    pub kind: ColumnKind,
    #[serde(default, deserialize_with = "lenient::order")]
    pub order: usize,
}

impl Column {
    #[must_use]
    pub fn new(id: ColumnId, name: impl Into<String>, kind: ColumnKind, order: usize) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            order,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
