//! CSV rendering of a tariff result set.

use crate::tariff::types::TariffItem;

const HEADERS: [&str; 6] = [
    "Tariff Code",
    "Description",
    "Unit",
    "Duty (NPF)",
    "Duty (ZLECAf)",
    "VAT/Other",
];

fn escape(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn render_csv(items: &[TariffItem]) -> String {
    let mut rows = vec![HEADERS.join(",")];
    for item in items {
        rows.push(
            [
                &item.tariff_code,
                &item.description,
                &item.unit,
                &item.duty_npf,
                &item.duty_zlecaf,
                &item.vat,
            ]
            .map(|field| escape(field))
            .join(","),
        );
    }
    rows.join("\n")
}
