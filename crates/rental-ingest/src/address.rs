//! Free-text lot addresses for geocoding.

use crate::record::{Record, LOT_KIND_FIELD, MAIN_LOT_FIELD, SUB_DISTRICT_NAME_FIELD, SUB_LOT_FIELD};

/// City prefix for every address.
pub const CITY_PREFIX: &str = "서울특별시";

/// Lot classification marking a mountain lot.
const MOUNTAIN_LOT: &str = "산";

/// Build `"{city} {district} {sub-district}[ 산][ {main}[-{sub}]]"`.
///
/// The district name is not part of the upstream row and is supplied by the
/// caller. Returns `None` when the row has no sub-district name.
pub fn lot_address(record: &Record, district_name: &str) -> Option<String> {
    let sub_district = record.get_str(SUB_DISTRICT_NAME_FIELD)?.trim();
    if sub_district.is_empty() {
        return None;
    }

    let mut address = format!("{} {} {}", CITY_PREFIX, district_name.trim(), sub_district);

    if record.get_str(LOT_KIND_FIELD).map(str::trim) == Some(MOUNTAIN_LOT) {
        address.push(' ');
        address.push_str(MOUNTAIN_LOT);
    }

    if let Some(main) = record.get_i64(MAIN_LOT_FIELD) {
        address.push_str(&format!(" {}", main));
    }

    match record.get_i64(SUB_LOT_FIELD) {
        Some(0) | None => {}
        Some(sub) => address.push_str(&format!("-{}", sub)),
    }

    Some(address)
}
