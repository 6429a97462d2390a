//! Response bodies as served by the upstream dataset and the geocoder.

use serde_json::{json, Value};

/// Dataset name used throughout the fixtures.
pub const DATASET: &str = "tbLnOpendataRentV";

/// Result codes the upstream is known to send.
pub mod codes {
    /// Normal completion, sent alongside rows
    pub const OK: &str = "INFO-000";
    /// No data in the requested range
    pub const NO_DATA: &str = "INFO-200";
    /// Invalid API key
    pub const INVALID_KEY: &str = "INFO-100";
    /// Server error
    pub const SERVER_ERROR: &str = "ERROR-500";
    /// Requested more than 1000 rows
    pub const TOO_MANY_ROWS: &str = "ERROR-336";
}

/// A successful page: `{DATASET: {list_total_count, RESULT, row}}`.
pub fn page_body(total_count: u64, rows: Vec<Value>) -> Value {
    json!({
        DATASET: {
            "list_total_count": total_count,
            "RESULT": {"CODE": codes::OK, "MESSAGE": "정상 처리되었습니다"},
            "row": rows,
        }
    })
}

/// A result code nested under the dataset key.
pub fn result_body(code: &str, message: &str) -> Value {
    json!({
        DATASET: {
            "RESULT": {"CODE": code, "MESSAGE": message}
        }
    })
}

/// A result code at the top level, as sent for key and range errors.
pub fn top_level_result_body(code: &str, message: &str) -> Value {
    json!({
        "RESULT": {"CODE": code, "MESSAGE": message}
    })
}

/// The "no data" envelope.
pub fn no_data_body() -> Value {
    top_level_result_body(codes::NO_DATA, "해당하는 데이터가 없습니다.")
}

/// A geocoder hit; `x` is longitude, `y` latitude.
pub fn geocode_body(longitude: f64, latitude: f64) -> Value {
    json!({
        "documents": [{
            "address_name": "서울 종로구 사직동 311-9",
            "x": longitude.to_string(),
            "y": latitude.to_string(),
        }],
        "meta": {"total_count": 1, "pageable_count": 1, "is_end": true}
    })
}

/// A geocoder response with no match.
pub fn geocode_miss_body() -> Value {
    json!({
        "documents": [],
        "meta": {"total_count": 0, "pageable_count": 0, "is_end": true}
    })
}

/// Well-known coordinates in Seoul, as `(latitude, longitude)`.
pub mod coords {
    /// Seoul City Hall
    pub const CITY_HALL: (f64, f64) = (37.5665, 126.9780);
    /// Gangnam Station
    pub const GANGNAM_STATION: (f64, f64) = (37.4979, 127.0276);
    /// Jongno-gu Office
    pub const JONGNO_OFFICE: (f64, f64) = (37.5735, 126.9790);
}
