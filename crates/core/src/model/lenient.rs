//! Forgiving field readers for persisted and imported snapshots.
//!
//! The import guard only checks the skeleton of a payload, so every field it
//! does not look at has to read back as something rather than failing the
//! whole conversion.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::column::ColumnKind;
use crate::model::ids::ColumnId;

/// Non-negative integers pass through; fractions round, anything else is 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn order<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let value = Value::deserialize(d)?;
    let order = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    });
    Ok(order.and_then(|n| usize::try_from(n).ok()).unwrap_or(0))
}

pub(crate) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(as_text(Value::deserialize(d)?).unwrap_or_default())
}

pub(crate) fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(as_text(Value::deserialize(d)?))
}

pub(crate) fn column_id<'de, D: Deserializer<'de>>(d: D) -> Result<ColumnId, D::Error> {
    text(d).map(ColumnId::new)
}

pub(crate) fn missing_column() -> ColumnId {
    ColumnId::new("")
}

pub(crate) fn column_kind<'de, D: Deserializer<'de>>(d: D) -> Result<ColumnKind, D::Error> {
    Ok(as_text(Value::deserialize(d)?)
        .map(ColumnKind::from)
        .unwrap_or_default())
}

fn as_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "order")]
        order: usize,
        #[serde(default, deserialize_with = "text")]
        name: String,
        #[serde(default, deserialize_with = "column_kind")]
        kind: ColumnKind,
    }

    fn read(raw: Value) -> Fields {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn order_tolerates_fractions_and_junk() {
        assert_eq!(read(json!({ "order": 4 })).order, 4);
        assert_eq!(read(json!({ "order": 2.6 })).order, 3);
        assert_eq!(read(json!({ "order": -1 })).order, 0);
        assert_eq!(read(json!({ "order": "first" })).order, 0);
        assert_eq!(read(json!({})).order, 0);
    }

    #[test]
    fn non_string_text_reads_as_empty() {
        assert_eq!(read(json!({ "name": 12 })).name, "");
        assert_eq!(read(json!({ "name": "Notes" })).name, "Notes");
    }

    #[test]
    fn non_string_kind_reads_as_custom() {
        assert_eq!(read(json!({ "kind": 3 })).kind, ColumnKind::Custom);
        assert_eq!(read(json!({ "kind": "pyqs" })).kind, ColumnKind::Pyqs);
    }
}
