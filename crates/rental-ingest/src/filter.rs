//! Client-side record filtering.
//!
//! The upstream cannot filter server-side, so every page is fetched whole and
//! narrowed here by exact string equality on the district codes.

use crate::record::{Record, DISTRICT_CODE_FIELD, SUB_DISTRICT_CODE_FIELD};

/// Optional equality predicates on district and sub-district codes.
///
/// An absent component places no constraint on that dimension. A
/// sub-district filter without a district filter is accepted as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub district_code: Option<String>,
    pub sub_district_code: Option<String>,
}

impl RecordFilter {
    pub fn new(district_code: Option<String>, sub_district_code: Option<String>) -> Self {
        Self {
            district_code,
            sub_district_code,
        }
    }

    /// Filter on a district only.
    pub fn district(code: impl ToString) -> Self {
        Self::new(Some(code.to_string()), None)
    }

    /// Add a sub-district constraint.
    pub fn with_sub_district(mut self, code: impl ToString) -> Self {
        self.sub_district_code = Some(code.to_string());
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.district_code.is_none() && self.sub_district_code.is_none()
    }

    /// Whether a single record passes every present predicate.
    pub fn matches(&self, record: &Record) -> bool {
        field_matches(record, DISTRICT_CODE_FIELD, self.district_code.as_deref())
            && field_matches(record, SUB_DISTRICT_CODE_FIELD, self.sub_district_code.as_deref())
    }

    /// Keep the records that match, preserving order.
    ///
    /// Without constraints the input vector is returned untouched.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        if self.is_unconstrained() {
            return records;
        }
        let mut records = records;
        records.retain(|record| self.matches(record));
        records
    }
}

fn field_matches(record: &Record, field: &str, expected: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => record.get_str(field) == Some(expected),
    }
}

/// Free-function form of [`RecordFilter::apply`].
pub fn apply_filter(
    records: Vec<Record>,
    district_code: Option<&str>,
    sub_district_code: Option<&str>,
) -> Vec<Record> {
    RecordFilter::new(
        district_code.map(str::to_string),
        sub_district_code.map(str::to_string),
    )
    .apply(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(district: &str, sub_district: &str, id: u32) -> Record {
        serde_json::from_value(json!({
            "CGG_CD": district,
            "STDG_CD": sub_district,
            "ID": id,
        }))
        .unwrap()
    }

    fn sample() -> Vec<Record> {
        vec![
            row("11110", "10100", 1),
            row("11140", "10100", 2),
            row("11110", "10200", 3),
            row("11110", "10100", 4),
            row("11140", "10200", 5),
        ]
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().filter_map(|r| r.get_i64("ID")).collect()
    }

    #[test]
    fn test_unconstrained_is_identity() {
        let input = sample();
        let ptr = input.as_ptr();
        let output = RecordFilter::default().apply(input);
        assert_eq!(output.as_ptr(), ptr);
        assert_eq!(output, sample());
    }

    #[test]
    fn test_district_only() {
        let output = RecordFilter::district("11110").apply(sample());
        assert_eq!(ids(&output), vec![1, 3, 4]);
    }

    #[test]
    fn test_sub_district_only() {
        let filter = RecordFilter::new(None, Some("10200".into()));
        assert_eq!(ids(&filter.apply(sample())), vec![3, 5]);
    }

    #[test]
    fn test_both_components() {
        let filter = RecordFilter::district(11110).with_sub_district(10100);
        assert_eq!(ids(&filter.apply(sample())), vec![1, 4]);
    }

    #[test]
    fn test_output_is_ordered_subset_for_every_combination() {
        let combos = [
            (None, None),
            (Some("11110"), None),
            (None, Some("10100")),
            (Some("11140"), Some("10200")),
            (Some("99999"), None),
        ];
        let input_ids = ids(&sample());
        for (district, sub) in combos {
            let output = ids(&apply_filter(sample(), district, sub));
            let mut cursor = input_ids.iter();
            for id in &output {
                assert!(cursor.any(|x| x == id), "{:?} not an ordered subset", output);
            }
        }
    }

    #[test]
    fn test_exact_string_match_without_coercion() {
        let records = vec![
            serde_json::from_value::<Record>(json!({"CGG_CD": 11110})).unwrap(),
            serde_json::from_value::<Record>(json!({"CGG_CD": " 11110"})).unwrap(),
            serde_json::from_value::<Record>(json!({})).unwrap(),
            serde_json::from_value::<Record>(json!({"CGG_CD": "11110"})).unwrap(),
        ];
        let output = RecordFilter::district("11110").apply(records);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].get_str("CGG_CD"), Some("11110"));
    }
}
