//! Generators for synthetic rental-contract rows.
//!
//! Rows carry a `SEQ` field equal to their 1-based upstream offset, so tests
//! can verify ordering and coverage by reading it back.

use serde_json::{json, Value};

/// District codes rotated through by [`create_rows`].
pub const DISTRICT_CYCLE: [(&str, &str); 3] = [
    ("11110", "종로구"),
    ("11140", "중구"),
    ("11680", "강남구"),
];

/// Sub-district codes rotated through by [`create_rows`].
pub const SUB_DISTRICT_CYCLE: [(&str, &str); 2] = [("10100", "청운동"), ("10200", "신교동")];

/// Creates one row at upstream offset `seq`.
///
/// District and sub-district cycle with the offset: the district is
/// `DISTRICT_CYCLE[(seq - 1) % 3]` and the sub-district
/// `SUB_DISTRICT_CYCLE[(seq - 1) % 2]`. Numeric columns are string-encoded,
/// as the upstream serves them.
///
/// # Example
///
/// ```
/// use test_utils::create_row;
///
/// let row = create_row(4);
/// assert_eq!(row["SEQ"], 4);
/// assert_eq!(row["CGG_CD"], "11110");
/// assert_eq!(row["STDG_CD"], "10200");
/// ```
pub fn create_row(seq: u64) -> Value {
    let idx = (seq.saturating_sub(1)) as usize;
    let (district_code, district_name) = DISTRICT_CYCLE[idx % DISTRICT_CYCLE.len()];
    let (sub_code, sub_name) = SUB_DISTRICT_CYCLE[idx % SUB_DISTRICT_CYCLE.len()];
    let lot_kind = if seq % 10 == 0 { "산" } else { "대지" };
    let rent_kind = if seq % 2 == 0 { "전세" } else { "월세" };
    json!({
        "SEQ": seq,
        "RCPT_YR": "2024",
        "CGG_CD": district_code,
        "CGG_NM": district_name,
        "STDG_CD": sub_code,
        "STDG_NM": sub_name,
        "LOTNO_SE_NM": lot_kind,
        "MNO": format!("{:04}", seq % 500 + 1),
        "SNO": format!("{:04}", seq % 4),
        "FLR": format!("{}", seq % 20 + 1),
        "CTRT_DAY": "20240115",
        "RENT_SE": rent_kind,
        "RENT_AREA": format!("{:.2}", 20.0 + (seq % 80) as f64 * 0.5),
        "GRFE": format!("{}", 1000 + seq * 10),
        "RTFE": format!("{}", seq % 150),
        "BLDG_NM": format!("테스트빌딩{}", seq),
    })
}

/// Creates rows for the inclusive offsets `[start, end]`.
///
/// # Example
///
/// ```
/// use test_utils::create_rows;
///
/// let rows = create_rows(101, 150);
/// assert_eq!(rows.len(), 50);
/// assert_eq!(rows[0]["SEQ"], 101);
/// ```
pub fn create_rows(start: u64, end: u64) -> Vec<Value> {
    (start..=end).map(create_row).collect()
}

/// Reads back the `SEQ` offsets of serialised rows.
pub fn seqs(rows: &[Value]) -> Vec<u64> {
    rows.iter().filter_map(|r| r["SEQ"].as_u64()).collect()
}
