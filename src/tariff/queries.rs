//! Model-backed tariff lookups: search, autocomplete, inspection and
//! vehicle status checks. Each query pins its reply to a declared schema.

use crate::error::AppError;
use crate::gemini::{GeminiClient, Schema};
use crate::tariff::types::{BivacReport, Suggestion, TariffItem, VehicleReport};
use tracing::warn;

/// Sentinel the status checks use to signal a well-formed "no such record".
const NOT_FOUND_SENTINEL: &str = "Not Found";

/// Suggestions below this length are answered locally with no results.
const SUGGESTION_MIN_CHARS: usize = 3;

pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are a helpful and friendly assistant specializing in the Democratic Republic of Congo's customs, tariffs, and import/export procedures. Answer questions concisely and accurately based on the provided tariff schedule context.";

pub const LIVE_SYSTEM_INSTRUCTION: &str = "You are a helpful and friendly assistant specialized in the Democratic Republic of Congo's customs and tariffs.";

fn tariff_schema() -> Schema {
    Schema::array(Schema::object(
        vec![
            (
                "tariffCode",
                Schema::string_described("The tariff code, e.g., 01.01"),
            ),
            (
                "description",
                Schema::string_described("The description of the product."),
            ),
            (
                "unit",
                Schema::string_described("The unit of quantity, e.g., u, kg."),
            ),
            (
                "dutyNPF",
                Schema::string_described("The NPF customs duty rate, e.g., 5 %."),
            ),
            (
                "dutyZLECAf",
                Schema::string_described("The ZLECAf customs duty rate, e.g., 4,5 %."),
            ),
            (
                "vat",
                Schema::string_described("The VAT and other taxes, e.g., 16 %."),
            ),
        ],
        &[
            "tariffCode",
            "description",
            "unit",
            "dutyNPF",
            "dutyZLECAf",
            "vat",
        ],
    ))
}

fn suggestion_schema() -> Schema {
    Schema::array(Schema::object(
        vec![
            (
                "suggestion",
                Schema::string_described(
                    "A suggested tariff code or product description, e.g., \"09.01\" or \"Café, même torréfié ou décaféiné\"",
                ),
            ),
            (
                "type",
                Schema::string_described(
                    "The type of suggestion, either \"code\" or \"description\".",
                ),
            ),
        ],
        &["suggestion", "type"],
    ))
}

fn bivac_schema() -> Schema {
    let fields = [
        "reportNumber",
        "inspectionDate",
        "status",
        "exporter",
        "importer",
        "goodsDescription",
        "fobValue",
        "hsCode",
        "observations",
    ];
    Schema::object(
        fields.iter().map(|f| (*f, Schema::string())).collect(),
        &fields,
    )
}

fn vehicle_schema() -> Schema {
    Schema::object(
        vec![
            ("chassisNumber", Schema::string()),
            ("make", Schema::string()),
            ("model", Schema::string()),
            ("year", Schema::number()),
            ("engineDisplacement", Schema::string()),
            ("fuelType", Schema::string()),
            ("countryOfOrigin", Schema::string()),
            ("estimatedValueCIF", Schema::string()),
            ("hsCode", Schema::string()),
            ("technicalObservations", Schema::string()),
        ],
        &[
            "chassisNumber",
            "make",
            "model",
            "year",
            "engineDisplacement",
            "fuelType",
            "countryOfOrigin",
            "estimatedValueCIF",
            "hsCode",
            "technicalObservations",
        ],
    )
}

/// Free-text search over the DRC 2021 tariff schedule. An empty reply is an
/// empty result set, not an error.
pub async fn search_tariffs(
    client: &GeminiClient,
    query: &str,
) -> Result<Vec<TariffItem>, AppError> {
    let prompt = format!(
        "You are an expert API that provides information from the Democratic Republic of Congo's 2021 tariff schedule (TARIFS DES DROITS ET TAXES A L'IMPORTATION ET A L'EXPORTATION /ZLECAf). Your task is to find relevant tariff items based on the user's query. Interpret the query flexibly: it could be a product name, a tariff code, a partial description, or a natural language question (e.g., \"what are the taxes on coffee beans?\"). Be tolerant of spelling mistakes and find the closest matches. Return the results in the specified JSON format. User query: '{query}'"
    );

    let value = client.generate_json(&prompt, &tariff_schema()).await?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| AppError::SchemaViolation(format!("malformed tariff items: {e}")))
}

/// Autocomplete for the search box. Short inputs short-circuit locally, and
/// model failures degrade to no suggestions instead of surfacing an error.
pub async fn tariff_suggestions(client: &GeminiClient, partial: &str) -> Vec<Suggestion> {
    if partial.chars().count() < SUGGESTION_MIN_CHARS {
        return Vec::new();
    }

    let prompt = format!(
        "You are an autocomplete service for the DRC tariff schedule. Based on the user's partial query, suggest up to 5 relevant and distinct product descriptions or tariff codes. Prioritize conciseness and relevance. Do not suggest things that are too generic. User's partial query: '{partial}'"
    );

    let result = async {
        let value = client.generate_json(&prompt, &suggestion_schema()).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|e| AppError::SchemaViolation(format!("malformed suggestions: {e}")))
    }
    .await;

    match result {
        Ok(suggestions) => suggestions,
        Err(e) => {
            warn!("suggestion lookup degraded to empty: {e}");
            Vec::new()
        }
    }
}

/// Look up a BIVAC inspection report. A reply whose status is the not-found
/// sentinel becomes `NotFound`, distinct from any transport failure.
pub async fn check_bivac_status(
    client: &GeminiClient,
    bivac_id: &str,
) -> Result<BivacReport, AppError> {
    let prompt = format!(
        "You are a mock API simulating the BIVAC DRC inspection system. Based on the user's BIVAC number, generate a plausible inspection report. If the user provides 'NOT-FOUND' as the number, return a report with the status 'Not Found' and empty strings for other fields. For any other input, generate a realistic-looking report. BIVAC Number: '{bivac_id}'"
    );

    let value = client.generate_json(&prompt, &bivac_schema()).await?;
    let report: BivacReport = serde_json::from_value(value)
        .map_err(|e| AppError::SchemaViolation(format!("malformed inspection report: {e}")))?;

    if report.status == NOT_FOUND_SENTINEL {
        return Err(AppError::NotFound(format!(
            "no inspection report for '{bivac_id}'"
        )));
    }
    Ok(report)
}

/// Look up a vehicle technical report by chassis number. The not-found
/// sentinel lives in the `make` field for this check.
pub async fn vehicle_report(
    client: &GeminiClient,
    chassis_number: &str,
) -> Result<VehicleReport, AppError> {
    let prompt = format!(
        "You are a mock API simulating a vehicle technical report system for DRC customs. Based on the user's vehicle chassis number (VIN), generate a plausible technical report. If the user provides 'NOT-FOUND' as the chassis number, return a report with 'Not Found' in most fields. For any other input, generate a realistic-looking report with make, model, year, and technical details. Chassis Number: '{chassis_number}'"
    );

    let value = client.generate_json(&prompt, &vehicle_schema()).await?;
    let report: VehicleReport = serde_json::from_value(value)
        .map_err(|e| AppError::SchemaViolation(format!("malformed vehicle report: {e}")))?;

    if report.make == NOT_FOUND_SENTINEL {
        return Err(AppError::NotFound(format!(
            "no vehicle report for '{chassis_number}'"
        )));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tariff_schema_requires_every_column() {
        let rendered = tariff_schema().to_value();
        let required = rendered["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
    }

    #[test]
    fn tariff_item_round_trips_wire_names() {
        let json = serde_json::json!({
            "tariffCode": "09.01",
            "description": "Café",
            "unit": "kg",
            "dutyNPF": "10 %",
            "dutyZLECAf": "8 %",
            "vat": "16 %",
        });
        let item: TariffItem = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(item.duty_npf, "10 %");
        assert_eq!(serde_json::to_value(&item).unwrap(), json);
    }
}
