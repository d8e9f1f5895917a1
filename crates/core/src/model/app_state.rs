use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::defaults::default_subjects;
use crate::model::ids::SubjectId;
use crate::model::lenient;
use crate::model::subject::Subject;

/// Schema version written next to every persisted snapshot.
pub const SCHEMA_VERSION: &str = "1.0.0";

//
// ─── THEME ─────────────────────────────────────────────────────────────────────
//

/// Anything other than `"light"` in stored data reads back as `Dark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(d)?.as_str() {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

//
// ─── APP STATE ─────────────────────────────────────────────────────────────────
//

/// Root of the progress tree.
///
/// Subjects sit behind `Arc` so a transition only rebuilds the subject it
/// touches; every other subject is shared with the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub subjects: Vec<Arc<Subject>>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_modified: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_text"
    )]
    pub version: Option<String>,
}

impl AppState {
    /// Default catalog, dark theme, stamped at `now` with the current schema version.
    #[must_use]
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            subjects: default_subjects(),
            theme: Theme::Dark,
            last_modified: iso_timestamp(now),
            version: Some(SCHEMA_VERSION.to_owned()),
        }
    }

    /// Empty tree, mostly useful for tests and imports built by hand.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            subjects: Vec::new(),
            theme: Theme::Dark,
            last_modified: iso_timestamp(now),
            version: Some(SCHEMA_VERSION.to_owned()),
        }
    }

    #[must_use]
    pub fn subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| &s.id == id).map(AsRef::as_ref)
    }

    /// Copy stamped for persistence.
    #[must_use]
    pub fn stamped(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_modified: iso_timestamp(now),
            version: Some(SCHEMA_VERSION.to_owned()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_modified)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Checkballs across all subjects whose column no longer exists.
    #[must_use]
    pub fn dangling_checkballs(&self) -> usize {
        self.subjects.iter().map(|s| s.dangling_checkballs()).sum()
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
