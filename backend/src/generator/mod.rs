//! CSV-to-offer generator.
//!
//! Turns CSV rows into [`Offer`] payloads and, when more offers are
//! requested than the CSV has usable rows, synthesizes seeded variations
//! of the rows already converted.
//!
//! # Example
//!
//! ```rust,ignore
//! use freightload::generator::generate_offers;
//! use freightload::models::OfferKind;
//!
//! let report = generate_offers(OfferKind::Freight, "data/freight.csv", 25)?;
//! assert_eq!(report.offers.len(), 25);
//! ```
//!
//! Dates are always synthesized relative to `today`: loading tomorrow,
//! unloading the day after. Date columns in the CSV are never parsed.

pub mod lookup;
pub mod random;

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;
use std::path::Path;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{CsvError, GenerateError};
use crate::models::{
    Address, ClosedExchangeSetting, ContactPerson, Customer, LoadingPlace, LoadingType, Offer,
    OfferKind, Price, VehicleProperties,
};
use crate::parser::{parse_csv_file_auto, CsvRow};

use lookup::{
    normalize_bodies, normalize_title, normalize_vehicle_types, parse_bool, parse_id, parse_number,
};
use random::{base_seed, jitter, seeded};

/// Largest count accepted by a single generation call.
pub const MAX_COUNT: usize = 10_000;

/// Count used when a caller does not send one.
pub const DEFAULT_COUNT: usize = 10;

/// Columns every usable row must fill.
pub const REQUIRED_COLUMNS: [&str; 3] = ["customer_id", "contact_first_name", "description"];

/// Every column the generator understands, in template order.
pub const KNOWN_COLUMNS: [&str; 27] = [
    "customer_id",
    "contact_title",
    "contact_first_name",
    "contact_last_name",
    "contact_email",
    "contact_phone",
    "contact_languages",
    "vehicle_body",
    "vehicle_type",
    "trackable",
    "accept_quote",
    "description",
    "remark",
    "length_m",
    "weight_t",
    "loading_city",
    "loading_postal_code",
    "loading_country",
    "loading_date",
    "unloading_city",
    "unloading_postal_code",
    "unloading_country",
    "unloading_date",
    "price_amount",
    "price_currency",
    "closed_exchange_id",
    "closed_exchange_public",
];

const DEFAULT_TITLE: &str = "MR";
const DEFAULT_COUNTRY: &str = "DE";
const DEFAULT_LOADING_CITY: &str = "Berlin";
const DEFAULT_UNLOADING_CITY: &str = "Hamburg";
const DEFAULT_CURRENCY: &str = "EUR";
const DEFAULT_LANGUAGE: &str = "de";

/// Numeric fields of a variation stay within this fraction of the source.
pub const VARIATION_SPREAD: f64 = 0.2;

/// Variation loading dates start up to this many days after tomorrow.
pub const MAX_DAY_OFFSET: u64 = 30;

// =============================================================================
// Results
// =============================================================================

/// A row discarded because mandatory columns were blank or unusable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub line: usize,
    pub missing_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_fields: Vec<String>,
    pub reason: String,
}

impl SkippedRow {
    fn missing(line: usize, fields: Vec<&str>) -> Self {
        Self {
            line,
            reason: format!("missing: {}", fields.join(", ")),
            missing_fields: fields.into_iter().map(str::to_string).collect(),
            invalid_fields: Vec::new(),
        }
    }

    fn invalid(line: usize, field: &str, reason: String) -> Self {
        Self {
            line,
            missing_fields: Vec::new(),
            invalid_fields: vec![field.to_string()],
            reason,
        }
    }
}

/// Outcome of one generation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub kind: OfferKind,
    pub offers: Vec<Offer>,
    pub usable_rows: usize,
    pub variations: usize,
    pub skipped: Vec<SkippedRow>,
}

// =============================================================================
// Entry points
// =============================================================================

/// Check a caller-supplied count against `[1, MAX_COUNT]`.
pub fn validate_count(count: i64) -> Result<usize, GenerateError> {
    if count < 1 || count as u64 > MAX_COUNT as u64 {
        return Err(GenerateError::InvalidCount { count, max: MAX_COUNT });
    }
    Ok(count as usize)
}

/// Generate `count` offers from the CSV at `path`, dated from today.
pub fn generate_offers(
    kind: OfferKind,
    path: impl AsRef<Path>,
    count: usize,
) -> Result<GenerationReport, GenerateError> {
    let parsed = parse_csv_file_auto(path.as_ref())?;
    log_info(format!(
        "📖 Read {} rows from {}",
        parsed.rows.len(),
        path.as_ref().display()
    ));
    generate_from_rows(kind, parsed.rows, count, Local::now().date_naive())
}

/// Generate `count` offers from parsed rows.
///
/// Pure in `(rows, count, today)`. Fails only when no row is usable.
pub fn generate_from_rows(
    kind: OfferKind,
    rows: Vec<CsvRow>,
    count: usize,
    today: NaiveDate,
) -> Result<GenerationReport, GenerateError> {
    let (usable, skipped) = partition_rows(rows);

    for skip in skipped.iter().take(5) {
        log_warning(format!("Line {} skipped, {}", skip.line, skip.reason));
    }
    if skipped.len() > 5 {
        log_warning(format!("... and {} more rows skipped", skipped.len() - 5));
    }

    if usable.is_empty() {
        return Err(CsvError::NoUsableRows(skipped.len()).into());
    }

    let row_count = usable.len();
    let progress_step = (count / 10).max(1);
    let mut offers: Vec<Offer> = Vec::with_capacity(count);

    for index in 0..count {
        let offer = if index < row_count {
            convert_row(kind, &usable[index], today)
        } else {
            vary(&offers[index % row_count], index, today)
        };
        offers.push(offer);

        if (index + 1) % progress_step == 0 || index + 1 == count {
            log_info(format!(
                "⚙️  {}/{} {}s ({}%)",
                index + 1,
                count,
                kind.label(),
                (index + 1) * 100 / count
            ));
        }
    }

    let variations = count.saturating_sub(row_count);
    log_success(format!(
        "Generated {} {}s ({} from CSV, {} variations)",
        count,
        kind.label(),
        count - variations,
        variations
    ));

    Ok(GenerationReport {
        kind,
        offers,
        usable_rows: row_count,
        variations,
        skipped,
    })
}

/// Split rows into usable ones and those missing mandatory columns.
///
/// A `customer_id` that is not an integer makes the row unusable too.
pub fn partition_rows(rows: Vec<CsvRow>) -> (Vec<CsvRow>, Vec<SkippedRow>) {
    let mut usable = Vec::new();
    let mut skipped = Vec::new();

    for row in rows {
        let missing = row.missing(&REQUIRED_COLUMNS);
        if !missing.is_empty() {
            skipped.push(SkippedRow::missing(row.line, missing));
            continue;
        }

        match row.get("customer_id").map(parse_customer_id) {
            Some(Err(raw)) => skipped.push(SkippedRow::invalid(
                row.line,
                "customer_id",
                format!("customer_id '{}' is not an integer", raw),
            )),
            _ => usable.push(row),
        }
    }

    (usable, skipped)
}

fn parse_customer_id(raw: &str) -> Result<i64, &str> {
    raw.trim().parse::<i64>().map_err(|_| raw)
}

// =============================================================================
// Row conversion
// =============================================================================

/// Convert one usable row into an offer.
pub fn convert_row(kind: OfferKind, row: &CsvRow, today: NaiveDate) -> Offer {
    let text = |col: &str| row.get(col).map(str::to_string);

    let tomorrow = today + Days::new(1);
    let day_after = today + Days::new(2);

    let languages = row
        .get("contact_languages")
        .map(|raw| {
            raw.split([',', '/'])
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_else(|| vec![DEFAULT_LANGUAGE.to_string()]);

    let contact_person = ContactPerson {
        title: row
            .get("contact_title")
            .map(normalize_title)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        first_name: text("contact_first_name").unwrap_or_default(),
        last_name: text("contact_last_name"),
        email: text("contact_email"),
        business_phone: text("contact_phone"),
        languages,
    };

    let loading = LoadingPlace {
        loading_type: LoadingType::Loading,
        address: address(row, "loading", DEFAULT_LOADING_CITY),
        earliest_loading_date: tomorrow,
        latest_loading_date: day_after,
    };
    let unloading = LoadingPlace {
        loading_type: LoadingType::Unloading,
        address: address(row, "unloading", DEFAULT_UNLOADING_CITY),
        earliest_loading_date: day_after,
        latest_loading_date: day_after,
    };

    let price = row.get("price_amount").map(|amount| Price {
        amount: parse_number(Some(amount)),
        currency: row
            .get("price_currency")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    });

    let closed_freight_exchange_setting =
        row.get("closed_exchange_id").map(|id| ClosedExchangeSetting {
            closed_freight_exchange_id: parse_id(Some(id)),
            publish_to_public_exchange: parse_bool(row.get("closed_exchange_public")),
        });

    let (freight_description, public_remark) = match kind {
        OfferKind::Freight => (text("description"), text("remark")),
        OfferKind::VehicleSpace => (None, text("description")),
    };

    Offer {
        object_type: kind.object_type().to_string(),
        customer: Customer {
            id: parse_id(row.get("customer_id")),
        },
        contact_person,
        vehicle_properties: VehicleProperties {
            body: normalize_bodies(row.get("vehicle_body")),
            vehicle_type: normalize_vehicle_types(row.get("vehicle_type")),
        },
        trackable: parse_bool(row.get("trackable")),
        accept_quote: parse_bool(row.get("accept_quote")),
        freight_description,
        length_m: parse_number(row.get("length_m")),
        weight_t: parse_number(row.get("weight_t")),
        loading_places: vec![loading, unloading],
        price,
        public_remark,
        closed_freight_exchange_setting,
    }
}

fn address(row: &CsvRow, prefix: &str, default_city: &str) -> Address {
    let col = |suffix: &str| row.get(&format!("{}_{}", prefix, suffix)).map(str::to_string);
    Address::new(
        col("city").unwrap_or_else(|| default_city.to_string()),
        col("postal_code"),
        col("country")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    )
}

// =============================================================================
// Variations
// =============================================================================

/// Seeded variation of `base` for output position `index`.
pub fn vary(base: &Offer, index: usize, today: NaiveDate) -> Offer {
    let seed = base_seed(index);
    let mut offer = base.clone();

    offer.weight_t = perturb(base.weight_t, seed + 1);
    offer.length_m = perturb(base.length_m, seed + 2);

    if seeded(seed + 3) > 0.5 {
        offer.trackable = !offer.trackable;
    }
    if seeded(seed + 4) > 0.7 {
        offer.accept_quote = !offer.accept_quote;
    }

    let offset = (seeded(seed + 5) * MAX_DAY_OFFSET as f64).floor() as u64;
    let loading_start = today + Days::new(1 + offset);
    let loading_end = loading_start + Days::new(1);
    let unloading_day = loading_end + Days::new(1);

    for place in &mut offer.loading_places {
        match place.loading_type {
            LoadingType::Loading => {
                place.earliest_loading_date = loading_start;
                place.latest_loading_date = loading_end;
            }
            LoadingType::Unloading => {
                place.earliest_loading_date = unloading_day;
                place.latest_loading_date = unloading_day;
            }
        }
    }

    offer
}

/// Scale within the variation band, rounded to two decimals.
fn perturb(value: f64, seed: u64) -> f64 {
    let scaled = (value * jitter(seed, VARIATION_SPREAD) * 100.0).round() / 100.0;
    let (low, high) = band(value);
    scaled.clamp(low, high)
}

/// Inclusive bounds of the variation band around `value`.
pub fn band(value: f64) -> (f64, f64) {
    let a = value * (1.0 - VARIATION_SPREAD);
    let b = value * (1.0 + VARIATION_SPREAD);
    (a.min(b), a.max(b))
}
