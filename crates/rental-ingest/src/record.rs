//! Opaque upstream rows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// District (자치구) code field.
pub const DISTRICT_CODE_FIELD: &str = "CGG_CD";
/// Sub-district (법정동) code field.
pub const SUB_DISTRICT_CODE_FIELD: &str = "STDG_CD";
/// Sub-district name, the first address component after the district.
pub const SUB_DISTRICT_NAME_FIELD: &str = "STDG_NM";
/// Lot classification; `"산"` marks a mountain lot.
pub const LOT_KIND_FIELD: &str = "LOTNO_SE_NM";
/// Main lot number.
pub const MAIN_LOT_FIELD: &str = "MNO";
/// Sub lot number.
pub const SUB_LOT_FIELD: &str = "SNO";

/// Columns the upstream serves as strings but that carry numbers.
pub const NUMERIC_FIELDS: [&str; 6] = ["GRFE", "RTFE", "MNO", "SNO", "FLR", "RENT_AREA"];

/// One row as returned by the upstream source.
///
/// No schema is enforced; callers interpret named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The field's value when it is a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// The field's value as an integer, accepting numeric strings.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
            }
            _ => None,
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Coerce [`NUMERIC_FIELDS`] to JSON numbers.
///
/// Values that do not parse become `null`; absent columns stay absent.
pub fn normalize_numeric(record: &mut Record) {
    for field in NUMERIC_FIELDS {
        if let Some(value) = record.0.get_mut(field) {
            *value = coerce_number(value);
        }
    }
}

fn coerce_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::Number(i.into())
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_get_str_only_matches_strings() {
        let r = record(json!({"CGG_CD": "11110", "FLR": 3}));
        assert_eq!(r.get_str("CGG_CD"), Some("11110"));
        assert_eq!(r.get_str("FLR"), None);
        assert_eq!(r.get_str("MISSING"), None);
    }

    #[test]
    fn test_get_i64_accepts_numeric_strings() {
        let r = record(json!({"MNO": "0123", "SNO": " 7 ", "FLR": 4, "AREA": "12.0", "X": "abc"}));
        assert_eq!(r.get_i64("MNO"), Some(123));
        assert_eq!(r.get_i64("SNO"), Some(7));
        assert_eq!(r.get_i64("FLR"), Some(4));
        assert_eq!(r.get_i64("AREA"), Some(12));
        assert_eq!(r.get_i64("X"), None);
    }

    #[test]
    fn test_normalize_numeric() {
        let mut r = record(json!({
            "GRFE": "5000",
            "RTFE": "",
            "RENT_AREA": "84.97",
            "FLR": "지하",
            "BLDG_NM": "123",
        }));
        normalize_numeric(&mut r);

        assert_eq!(r.get("GRFE"), Some(&json!(5000)));
        assert_eq!(r.get("RTFE"), Some(&Value::Null));
        assert_eq!(r.get("RENT_AREA"), Some(&json!(84.97)));
        assert_eq!(r.get("FLR"), Some(&Value::Null));
        // Non-numeric columns are untouched and absent columns stay absent.
        assert_eq!(r.get("BLDG_NM"), Some(&json!("123")));
        assert!(r.get("MNO").is_none());
    }

    #[test]
    fn test_transparent_serde() {
        let value = json!({"CGG_CD": "11110", "GRFE": 100});
        let r: Record = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&r).unwrap(), value);
    }
}
