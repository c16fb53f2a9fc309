//! Domain models for freight exchange offers.
//!
//! - [`OfferKind`] - freight offer or vehicle-space offer
//! - [`Offer`] - the flat payload posted to the freight exchange
//! - [`ContactPerson`], [`VehicleProperties`], [`LoadingPlace`], [`Price`],
//!   [`ClosedExchangeSetting`] - its parts
//!
//! Field names serialize to the exchange's camelCase wire names. Optional
//! fields are omitted rather than sent as empty strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Offer Kind
// =============================================================================

/// The two resource kinds the exchange exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OfferKind {
    Freight,
    VehicleSpace,
}

impl OfferKind {
    pub const ALL: [OfferKind; 2] = [OfferKind::Freight, OfferKind::VehicleSpace];

    /// `objectType` discriminator expected by the exchange.
    pub fn object_type(&self) -> &'static str {
        match self {
            OfferKind::Freight => "freightOffer",
            OfferKind::VehicleSpace => "vehicleSpaceOffer",
        }
    }

    /// Path of the "my offers" collection on the exchange.
    pub fn upstream_path(&self) -> &'static str {
        match self {
            OfferKind::Freight => "my-freight-offers",
            OfferKind::VehicleSpace => "my-vehicle-space-offers",
        }
    }

    /// Segment under `/api/timocom/`.
    pub fn route_segment(&self) -> &'static str {
        match self {
            OfferKind::Freight => "freight-offers",
            OfferKind::VehicleSpace => "vehicle-space-offers",
        }
    }

    /// Segment under `/api/generate/`.
    pub fn generate_segment(&self) -> &'static str {
        match self {
            OfferKind::Freight => "freight",
            OfferKind::VehicleSpace => "vehicle-space",
        }
    }

    /// Type name used by the CSV store (`freight.csv`, `vehicle.csv`).
    pub fn csv_type(&self) -> &'static str {
        match self {
            OfferKind::Freight => "freight",
            OfferKind::VehicleSpace => "vehicle",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OfferKind::Freight => "freight offer",
            OfferKind::VehicleSpace => "vehicle-space offer",
        }
    }

    pub fn from_generate_segment(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.generate_segment() == s)
    }

    pub fn from_csv_type(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.csv_type() == s)
    }
}

impl std::fmt::Display for OfferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Offer
// =============================================================================

/// A freight or vehicle-space offer as posted to the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub object_type: String,
    pub customer: Customer,
    pub contact_person: ContactPerson,
    pub vehicle_properties: VehicleProperties,
    pub trackable: bool,
    pub accept_quote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight_description: Option<String>,
    #[serde(rename = "length_m")]
    pub length_m: f64,
    #[serde(rename = "weight_t")]
    pub weight_t: f64,
    pub loading_places: Vec<LoadingPlace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_freight_exchange_setting: Option<ClosedExchangeSetting>,
}

impl Offer {
    /// Customer reference carried by every offer.
    pub fn customer_id(&self) -> i64 {
        self.customer.id
    }

    /// Places of the given type, in route order.
    pub fn places(&self, loading_type: LoadingType) -> impl Iterator<Item = &LoadingPlace> {
        self.loading_places
            .iter()
            .filter(move |p| p.loading_type == loading_type)
    }
}

/// Customer (company) the offer is published for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPerson {
    pub title: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
}

/// Vehicle requirements (freight) or offered vehicle (vehicle space).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleProperties {
    pub body: Vec<String>,
    #[serde(rename = "type")]
    pub vehicle_type: Vec<String>,
}

// =============================================================================
// Route
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingType {
    Loading,
    Unloading,
}

/// One stop of the route with its date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingPlace {
    pub loading_type: LoadingType,
    pub address: Address,
    pub earliest_loading_date: NaiveDate,
    pub latest_loading_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub object_type: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

impl Address {
    pub fn new(city: impl Into<String>, postal_code: Option<String>, country: impl Into<String>) -> Self {
        Self {
            object_type: "address".to_string(),
            city: city.into(),
            postal_code,
            country: country.into(),
        }
    }
}

// =============================================================================
// Price & publication
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

/// Publication in a closed (private) exchange group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedExchangeSetting {
    pub closed_freight_exchange_id: i64,
    pub publish_to_public_exchange: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Offer {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        Offer {
            object_type: OfferKind::Freight.object_type().to_string(),
            customer: Customer { id: 4711 },
            contact_person: ContactPerson {
                title: "MR".into(),
                first_name: "Max".into(),
                last_name: None,
                email: Some("max@example.com".into()),
                business_phone: None,
                languages: vec!["de".into()],
            },
            vehicle_properties: VehicleProperties {
                body: vec!["CURTAIN_SIDER".into()],
                vehicle_type: vec!["TRAILER".into()],
            },
            trackable: true,
            accept_quote: false,
            freight_description: Some("Pallets".into()),
            length_m: 13.6,
            weight_t: 24.0,
            loading_places: vec![LoadingPlace {
                loading_type: LoadingType::Loading,
                address: Address::new("Berlin", None, "DE"),
                earliest_loading_date: day,
                latest_loading_date: day,
            }],
            price: None,
            public_remark: None,
            closed_freight_exchange_setting: None,
        }
    }

    #[test]
    fn test_offer_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["objectType"], "freightOffer");
        assert_eq!(json["customer"]["id"], 4711);
        assert_eq!(json["contactPerson"]["firstName"], "Max");
        assert_eq!(json["vehicleProperties"]["type"][0], "TRAILER");
        assert_eq!(json["length_m"], 13.6);
        assert_eq!(json["loadingPlaces"][0]["loadingType"], "LOADING");
        assert_eq!(json["loadingPlaces"][0]["earliestLoadingDate"], "2026-10-19");
        assert_eq!(json["loadingPlaces"][0]["address"]["objectType"], "address");
    }

    #[test]
    fn test_blank_optionals_are_omitted() {
        let json = serde_json::to_value(sample()).unwrap();
        let contact = json["contactPerson"].as_object().unwrap();

        assert!(!contact.contains_key("lastName"));
        assert!(!contact.contains_key("businessPhone"));
        assert!(json.get("price").is_none());
        assert!(json.get("closedFreightExchangeSetting").is_none());
        assert!(json["loadingPlaces"][0]["address"].get("postalCode").is_none());
    }

    #[test]
    fn test_kind_segments() {
        assert_eq!(OfferKind::from_generate_segment("vehicle-space"), Some(OfferKind::VehicleSpace));
        assert_eq!(OfferKind::from_csv_type("vehicle"), Some(OfferKind::VehicleSpace));
        assert_eq!(OfferKind::from_csv_type("vehicle-space"), None);
        assert_eq!(OfferKind::Freight.upstream_path(), "my-freight-offers");
    }
}
