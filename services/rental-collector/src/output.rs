//! Writing enriched records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};

use rental_ingest::{lot_address, EnrichedRecord, Record};

/// Row field carrying the district name.
const DISTRICT_NAME_FIELD: &str = "CGG_NM";

/// Geocoding address for a row, preferring an explicit district name over
/// the row's own.
pub fn address_for(record: &Record, district_name: Option<&str>) -> Option<String> {
    let district_name = district_name.or_else(|| record.get_str(DISTRICT_NAME_FIELD))?;
    lot_address(record, district_name)
}

/// `rental_records_YYYYmmdd_HHMMSS.jsonl` in the working directory.
pub fn default_output_path<Tz: TimeZone>(now: DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    PathBuf::from(format!(
        "rental_records_{}.jsonl",
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Write one JSON object per line. Returns the number of records written.
pub fn write_jsonl(path: &Path, records: &[EnrichedRecord]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record).context("Failed to serialize record")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rental_ingest::Coordinate;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_address_prefers_explicit_name() {
        let r = record(json!({"CGG_NM": "중구", "STDG_NM": "태평로1가", "MNO": "31"}));
        assert_eq!(
            address_for(&r, Some("종로구")).as_deref(),
            Some("서울특별시 종로구 태평로1가 31")
        );
        assert_eq!(
            address_for(&r, None).as_deref(),
            Some("서울특별시 중구 태평로1가 31")
        );
        assert_eq!(address_for(&record(json!({"STDG_NM": "x"})), None), None);
    }

    #[test]
    fn test_default_output_path() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            default_output_path(now),
            PathBuf::from("rental_records_20240305_140709.jsonl")
        );
    }

    #[test]
    fn test_write_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("records.jsonl");
        let records = vec![
            EnrichedRecord {
                record: record(json!({"SEQ": 1})),
                coordinate: Some(Coordinate::new(37.5, 127.0)),
            },
            EnrichedRecord {
                record: record(json!({"SEQ": 2})),
                coordinate: None,
            },
        ];

        assert_eq!(write_jsonl(&path, &records).unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                json!({"SEQ": 1, "latitude": 37.5, "longitude": 127.0}),
                json!({"SEQ": 2, "latitude": null, "longitude": null}),
            ]
        );
    }
}
