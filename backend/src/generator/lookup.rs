//! Lookup tables for free-text CSV values.
//!
//! Keys are compared lowercase and trimmed. Unknown titles are upper-cased
//! verbatim; unknown vehicle bodies and types degrade to a fixed fallback.

/// Fallback when a body entry is not recognized.
pub const DEFAULT_BODY: &str = "CURTAIN_SIDER";

/// Fallback when a vehicle type entry is not recognized.
pub const DEFAULT_VEHICLE_TYPE: &str = "TRAILER";

const TITLES: &[(&str, &str)] = &[
    ("herr", "MR"),
    ("mr", "MR"),
    ("mr.", "MR"),
    ("mister", "MR"),
    ("monsieur", "MR"),
    ("frau", "MRS"),
    ("mrs", "MRS"),
    ("mrs.", "MRS"),
    ("madame", "MRS"),
    ("ms", "MS"),
    ("ms.", "MS"),
    ("miss", "MS"),
    ("dr", "DR"),
    ("dr.", "DR"),
];

const BODIES: &[(&str, &str)] = &[
    ("plane", "CURTAIN_SIDER"),
    ("planensattel", "CURTAIN_SIDER"),
    ("curtain", "CURTAIN_SIDER"),
    ("curtainsider", "CURTAIN_SIDER"),
    ("curtain sider", "CURTAIN_SIDER"),
    ("tautliner", "CURTAIN_SIDER"),
    ("koffer", "BOX"),
    ("box", "BOX"),
    ("box body", "BOX"),
    ("kühlkoffer", "REFRIGERATOR"),
    ("kuehlkoffer", "REFRIGERATOR"),
    ("kühler", "REFRIGERATOR"),
    ("reefer", "REFRIGERATOR"),
    ("refrigerated", "REFRIGERATOR"),
    ("refrigerator", "REFRIGERATOR"),
    ("pritsche", "FLATBED"),
    ("flatbed", "FLATBED"),
    ("open", "FLATBED"),
    ("tank", "TANK"),
    ("tanker", "TANK"),
    ("silo", "SILO"),
    ("kipper", "TIPPER"),
    ("tipper", "TIPPER"),
    ("walking floor", "MOVING_FLOOR"),
    ("schubboden", "MOVING_FLOOR"),
    ("moving floor", "MOVING_FLOOR"),
    ("mega", "MEGA_TRAILER"),
    ("megatrailer", "MEGA_TRAILER"),
    ("mega trailer", "MEGA_TRAILER"),
    ("container", "CONTAINER"),
    ("autotransporter", "CAR_TRANSPORTER"),
    ("car transporter", "CAR_TRANSPORTER"),
];

const VEHICLE_TYPES: &[(&str, &str)] = &[
    ("sattelzug", "TRAILER"),
    ("sattel", "TRAILER"),
    ("trailer", "TRAILER"),
    ("semi", "TRAILER"),
    ("semi-trailer", "TRAILER"),
    ("gliederzug", "ROAD_TRAIN"),
    ("hängerzug", "ROAD_TRAIN"),
    ("road train", "ROAD_TRAIN"),
    ("jumbo", "ROAD_TRAIN"),
    ("lkw", "TRUCK_UP_TO_12_T"),
    ("truck", "TRUCK_UP_TO_12_T"),
    ("motorwagen", "TRUCK_UP_TO_12_T"),
    ("7.5t", "VEHICLE_UP_TO_7_5_T"),
    ("7,5t", "VEHICLE_UP_TO_7_5_T"),
    ("7.5 t", "VEHICLE_UP_TO_7_5_T"),
    ("transporter", "VEHICLE_UP_TO_3_5_T"),
    ("sprinter", "VEHICLE_UP_TO_3_5_T"),
    ("van", "VEHICLE_UP_TO_3_5_T"),
    ("3.5t", "VEHICLE_UP_TO_3_5_T"),
    ("3,5t", "VEHICLE_UP_TO_3_5_T"),
];

fn lookup(table: &[(&str, &'static str)], raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_lowercase();
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Normalize a contact title.
pub fn normalize_title(raw: &str) -> String {
    lookup(TITLES, raw)
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_uppercase())
}

/// Normalize a comma or slash separated list of body descriptions.
pub fn normalize_bodies(raw: Option<&str>) -> Vec<String> {
    normalize_list(raw, BODIES, DEFAULT_BODY)
}

/// Normalize a comma or slash separated list of vehicle type descriptions.
pub fn normalize_vehicle_types(raw: Option<&str>) -> Vec<String> {
    normalize_list(raw, VEHICLE_TYPES, DEFAULT_VEHICLE_TYPE)
}

/// Map every entry, deduplicate in first-seen order, never return empty.
fn normalize_list(raw: Option<&str>, table: &[(&str, &'static str)], fallback: &'static str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for entry in split_entries(raw.unwrap_or("")) {
        if entry.trim().is_empty() {
            continue;
        }
        let mapped = lookup(table, entry).unwrap_or(fallback);
        if !out.iter().any(|v| v == mapped) {
            out.push(mapped.to_string());
        }
    }

    if out.is_empty() {
        out.push(fallback.to_string());
    }
    out
}

/// Split on `/` and `,`, keeping decimal commas such as `7,5t` inside an entry.
fn split_entries(raw: &str) -> Vec<&str> {
    let bytes = raw.as_bytes();
    let mut entries = Vec::new();
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        let decimal_comma = c == ','
            && i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if c == '/' || (c == ',' && !decimal_comma) {
            entries.push(&raw[start..i]);
            start = i + 1;
        }
    }
    entries.push(&raw[start..]);
    entries
}

/// Case-insensitive `"true"`; anything else is false.
pub fn parse_bool(raw: Option<&str>) -> bool {
    raw.map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Decimal number; accepts a decimal comma. Invalid or absent is zero.
pub fn parse_number(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().replace(',', ".").parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Integer identifier. Invalid or absent is zero.
pub fn parse_id(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0)
}
