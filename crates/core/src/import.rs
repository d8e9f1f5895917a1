//! Structural guard for untrusted JSON before it may replace the app state.
//!
//! The check is intentionally shallow: it does not verify that checkball
//! column references resolve to columns of the same subject.

use serde_json::Value;
use thiserror::Error;

use crate::model::AppState;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Why an import payload was refused. The current state is never touched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("import is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("import payload rejected: {0}")]
    Rejected(#[from] ImportRejection),

    #[error("import payload could not be converted: {0}")]
    Shape(#[source] serde_json::Error),
}

/// First structural problem found in a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportRejection {
    #[error("payload is not an object")]
    NotAnObject,

    #[error("`subjects` is missing or not an array")]
    MissingSubjects,

    #[error("subject #{index} is missing `{field}`")]
    Subject { index: usize, field: &'static str },

    #[error("column #{column} of subject #{subject} is not an object")]
    Column { subject: usize, column: usize },

    #[error("chapter #{chapter} of subject #{subject} is missing `{field}`")]
    Chapter {
        subject: usize,
        chapter: usize,
        field: &'static str,
    },

    #[error("checkball #{checkball} of chapter #{chapter} in subject #{subject} has an invalid level")]
    Level {
        subject: usize,
        chapter: usize,
        checkball: usize,
    },
}

//
// ─── VALIDATED PAYLOAD ─────────────────────────────────────────────────────────
//

/// An `AppState` that came from an import and passed `validate`.
///
/// Only this module can build one, which keeps `Action::ImportData`
/// unreachable for unchecked payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedImport(AppState);

impl ValidatedImport {
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.0
    }

    #[must_use]
    pub fn into_state(self) -> AppState {
        self.0
    }
}

//
// ─── VALIDATION ────────────────────────────────────────────────────────────────
//

/// Boolean form of [`validate`].
#[must_use]
pub fn is_valid(raw: &Value) -> bool {
    validate(raw).is_ok()
}

/// Checks that `raw` has the persisted state shape.
///
/// # Errors
///
/// Returns the first `ImportRejection` encountered.
pub fn validate(raw: &Value) -> Result<(), ImportRejection> {
    let root = raw.as_object().ok_or(ImportRejection::NotAnObject)?;
    let subjects = root
        .get("subjects")
        .and_then(Value::as_array)
        .ok_or(ImportRejection::MissingSubjects)?;

    for (s_idx, subject) in subjects.iter().enumerate() {
        let missing = |field| ImportRejection::Subject {
            index: s_idx,
            field,
        };
        if !non_empty_str(subject.get("id")) {
            return Err(missing("id"));
        }
        if !non_empty_str(subject.get("name")) {
            return Err(missing("name"));
        }
        let chapters = subject
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or_else(|| missing("chapters"))?;
        let columns = subject
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| missing("columns"))?;
        if let Some(column) = columns.iter().position(|c| !c.is_object()) {
            return Err(ImportRejection::Column {
                subject: s_idx,
                column,
            });
        }

        for (c_idx, chapter) in chapters.iter().enumerate() {
            let missing = |field| ImportRejection::Chapter {
                subject: s_idx,
                chapter: c_idx,
                field,
            };
            if !non_empty_str(chapter.get("id")) {
                return Err(missing("id"));
            }
            if !non_empty_str(chapter.get("name")) {
                return Err(missing("name"));
            }
            let checkballs = chapter
                .get("checkballs")
                .and_then(Value::as_array)
                .ok_or_else(|| missing("checkballs"))?;

            for (b_idx, checkball) in checkballs.iter().enumerate() {
                let in_range = checkball
                    .get("level")
                    .and_then(Value::as_f64)
                    .is_some_and(|level| (0.0..=10.0).contains(&level));
                if !in_range {
                    return Err(ImportRejection::Level {
                        subject: s_idx,
                        chapter: c_idx,
                        checkball: b_idx,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Validates an already-parsed value and converts it into state.
///
/// # Errors
///
/// `ImportError::Rejected` when the shape is wrong. Fields the guard does not
/// look at read back leniently, so `ImportError::Shape` only surfaces if the
/// two ever drift apart.
pub fn accept(raw: Value) -> Result<ValidatedImport, ImportError> {
    validate(&raw)?;
    serde_json::from_value(raw)
        .map(ValidatedImport)
        .map_err(ImportError::Shape)
}

/// Parses JSON text, validates it and converts it into state.
///
/// # Errors
///
/// `ImportError::Parse` for malformed text, otherwise as [`accept`].
pub fn parse(text: &str) -> Result<ValidatedImport, ImportError> {
    let raw: Value = serde_json::from_str(text).map_err(ImportError::Parse)?;
    accept(raw)
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "subjects": [{
                "id": "s1",
                "name": "X",
                "columns": [],
                "chapters": [{ "id": "c1", "name": "Y", "checkballs": [] }]
            }],
            "theme": "dark",
            "lastModified": "...",
            "version": "..."
        })
    }

    #[test]
    fn accepts_chapter_with_empty_checkballs() {
        assert!(is_valid(&minimal()));
        let imported = accept(minimal()).unwrap();
        assert_eq!(imported.state().subjects[0].chapters[0].checkballs.len(), 0);
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(validate(&Value::Null), Err(ImportRejection::NotAnObject));
        assert_eq!(validate(&json!([1, 2])), Err(ImportRejection::NotAnObject));
    }

    #[test]
    fn rejects_missing_subjects() {
        assert_eq!(
            validate(&json!({ "theme": "dark" })),
            Err(ImportRejection::MissingSubjects)
        );
        assert_eq!(
            validate(&json!({ "subjects": {} })),
            Err(ImportRejection::MissingSubjects)
        );
    }

    #[test]
    fn rejects_subject_without_columns_or_empty_name() {
        let mut raw = minimal();
        raw["subjects"][0]
            .as_object_mut()
            .unwrap()
            .remove("columns");
        assert_eq!(
            validate(&raw),
            Err(ImportRejection::Subject {
                index: 0,
                field: "columns"
            })
        );

        let mut raw = minimal();
        raw["subjects"][0]["name"] = json!("");
        assert!(!is_valid(&raw));
    }

    #[test]
    fn rejects_chapter_without_checkballs() {
        let mut raw = minimal();
        raw["subjects"][0]["chapters"][0]
            .as_object_mut()
            .unwrap()
            .remove("checkballs");
        assert_eq!(
            validate(&raw),
            Err(ImportRejection::Chapter {
                subject: 0,
                chapter: 0,
                field: "checkballs"
            })
        );
    }

    #[test]
    fn rejects_out_of_range_or_non_numeric_levels() {
        for bad in [json!(11), json!(-0.5), json!("5"), Value::Null] {
            let mut raw = minimal();
            raw["subjects"][0]["chapters"][0]["checkballs"] =
                json!([{ "columnId": "k", "level": bad }]);
            assert!(!is_valid(&raw));
        }
    }

    #[test]
    fn tolerates_dangling_column_references() {
        let mut raw = minimal();
        raw["subjects"][0]["chapters"][0]["checkballs"] =
            json!([{ "columnId": "ghost", "level": 10 }]);
        let imported = accept(raw).unwrap();
        assert_eq!(imported.state().dangling_checkballs(), 1);
    }

    #[test]
    fn guard_and_conversion_agree() {
        let cases = [
            json!({
                "subjects": [{
                    "id": "s1", "name": "X",
                    "columns": [{ "name": "NoId" }],
                    "chapters": []
                }],
                "theme": "blue"
            }),
            json!({
                "subjects": [{
                    "id": "s1", "name": "X", "order": 1.5,
                    "columns": [{ "id": 4, "type": 9, "order": "last" }],
                    "chapters": [{
                        "id": "c1", "name": "Y", "order": -2,
                        "checkballs": [{ "columnId": 3, "level": 9.7 }]
                    }]
                }],
                "lastModified": null,
                "version": 2
            }),
            json!({
                "subjects": [{ "id": "s1", "name": "X", "columns": [5], "chapters": [] }]
            }),
            json!({ "subjects": [{ "id": "s1", "name": "X", "columns": [], "chapters": ["c"] }] }),
            json!({ "subjects": [7] }),
            minimal(),
        ];

        for raw in cases {
            assert_eq!(
                is_valid(&raw),
                accept(raw.clone()).is_ok(),
                "guard and conversion disagree on {raw}"
            );
        }
    }

    #[test]
    fn column_without_id_imports_with_defaults() {
        let mut raw = minimal();
        raw["subjects"][0]["columns"] = json!([{ "name": "NoId" }]);
        raw["theme"] = json!("blue");

        let imported = accept(raw).unwrap();
        let column = &imported.state().subjects[0].columns[0];
        assert_eq!(column.id.as_str(), "");
        assert_eq!(column.name, "NoId");
        assert_eq!(imported.state().theme, crate::model::Theme::Dark);
    }

    #[test]
    fn rejects_non_object_columns() {
        let mut raw = minimal();
        raw["subjects"][0]["columns"] = json!([{ "id": "k", "name": "Notes" }, "Extra"]);
        assert_eq!(
            validate(&raw),
            Err(ImportRejection::Column {
                subject: 0,
                column: 1
            })
        );
    }

    #[test]
    fn parse_reports_malformed_text() {
        assert!(matches!(parse("{not json"), Err(ImportError::Parse(_))));
        assert!(matches!(
            parse(r#"{"theme":"dark"}"#),
            Err(ImportError::Rejected(ImportRejection::MissingSubjects))
        ));
    }
}
