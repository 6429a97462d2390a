//! Decoding of the upstream JSON envelope.
//!
//! Responses are keyed by the dataset name and carry either
//! `{list_total_count, row: [...]}` or `{RESULT: {CODE, MESSAGE}}`. Some
//! failures (invalid key, no data) place `RESULT` at the top level instead.

use serde::Deserialize;
use serde_json::Value;

use crate::error::TransportError;
use crate::record::Record;

/// Result code the upstream uses for "no data in this range".
pub const NO_DATA_CODE: &str = "INFO-200";

/// Result code sent alongside a normal page.
pub const SUCCESS_CODE: &str = "INFO-000";

const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";

/// One decoded upstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEnvelope {
    /// Success. `rows` is empty when the body carried only a count.
    Rows {
        total_count: Option<u64>,
        rows: Vec<Record>,
    },
    /// The provider's terminal "no data" code.
    NoData,
    /// Any other structured result code.
    ApiError { code: String, message: String },
    /// Shape did not match any known case.
    Malformed(String),
}

impl PageEnvelope {
    /// Decode a response body for `dataset`.
    pub fn parse(body: &Value, dataset: &str) -> Self {
        if let Some(inner) = body.get(dataset) {
            let decoded: DatasetBody = match serde_json::from_value(inner.clone()) {
                Ok(decoded) => decoded,
                Err(e) => return PageEnvelope::Malformed(format!("{}: {}", dataset, e)),
            };

            let DatasetBody {
                list_total_count,
                row,
                result,
            } = decoded;

            // Without rows, an error code outranks a bare count.
            if row.is_none() {
                if let Some(result) = result.as_ref().filter(|r| r.code != SUCCESS_CODE) {
                    return result.clone().into_envelope();
                }
            }

            if row.is_some() || list_total_count.is_some() {
                let total_count = match list_total_count.as_ref().map(parse_count) {
                    Some(Some(count)) => Some(count),
                    Some(None) => {
                        return PageEnvelope::Malformed(format!(
                            "invalid list_total_count: {}",
                            list_total_count.unwrap_or(Value::Null)
                        ))
                    }
                    None => None,
                };
                return PageEnvelope::Rows {
                    total_count,
                    rows: row.unwrap_or_default(),
                };
            }

            if let Some(result) = result {
                return result.into_envelope();
            }

            return PageEnvelope::Malformed(format!("{} carries neither rows nor RESULT", dataset));
        }

        if let Some(result) = body.get("RESULT") {
            return match serde_json::from_value::<ResultCode>(result.clone()) {
                Ok(result) => result.into_envelope(),
                Err(e) => PageEnvelope::Malformed(format!("RESULT: {}", e)),
            };
        }

        PageEnvelope::Malformed(truncate(&body.to_string(), 200))
    }

    /// Collapse the non-success cases into a [`TransportError`].
    ///
    /// `NoData` is not an error and maps to an empty success.
    pub fn into_rows(self) -> Result<(Option<u64>, Vec<Record>), TransportError> {
        match self {
            PageEnvelope::Rows { total_count, rows } => Ok((total_count, rows)),
            PageEnvelope::NoData => Ok((Some(0), Vec::new())),
            PageEnvelope::ApiError { code, message } => Err(TransportError::Api { code, message }),
            PageEnvelope::Malformed(detail) => Err(TransportError::Malformed(detail)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatasetBody {
    #[serde(default)]
    list_total_count: Option<Value>,
    #[serde(default)]
    row: Option<Vec<Record>>,
    #[serde(rename = "RESULT", default)]
    result: Option<ResultCode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResultCode {
    #[serde(rename = "CODE")]
    code: String,
    #[serde(rename = "MESSAGE", default)]
    message: Option<String>,
}

impl ResultCode {
    fn into_envelope(self) -> PageEnvelope {
        if self.code == NO_DATA_CODE {
            PageEnvelope::NoData
        } else {
            PageEnvelope::ApiError {
                code: self.code,
                message: self
                    .message
                    .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            }
        }
    }
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
