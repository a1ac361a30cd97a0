//! Domain records exchanged with the model and the browser client. Field
//! names on the wire follow the hosted service's camelCase conventions.

use serde::{Deserialize, Serialize};

/// One line of the DRC 2021 tariff schedule. Rates are kept verbatim as the
/// model returns them ("5 %", "4,5 %", "exempt"); numeric parsing happens
/// only at filter time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffItem {
    pub tariff_code: String,
    pub description: String,
    pub unit: String,
    #[serde(rename = "dutyNPF")]
    pub duty_npf: String,
    #[serde(rename = "dutyZLECAf")]
    pub duty_zlecaf: String,
    pub vat: String,
}

/// Inspection report from the BIVAC status check. `status` set to the
/// literal `"Not Found"` is the sentinel for an unknown report number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BivacReport {
    pub report_number: String,
    pub inspection_date: String,
    pub status: String,
    pub exporter: String,
    pub importer: String,
    pub goods_description: String,
    pub fob_value: String,
    pub hs_code: String,
    pub observations: String,
}

/// Vehicle technical report looked up by chassis number. `make` set to the
/// literal `"Not Found"` is the sentinel for an unknown vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReport {
    pub chassis_number: String,
    pub make: String,
    pub model: String,
    pub year: f64,
    pub engine_displacement: String,
    pub fuel_type: String,
    pub country_of_origin: String,
    #[serde(rename = "estimatedValueCIF")]
    pub estimated_value_cif: String,
    pub hs_code: String,
    pub technical_observations: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Code,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
}
