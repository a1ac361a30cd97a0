//! Tests for post-retrieval rate filtering and CSV export.

use douane::tariff::export::render_csv;
use douane::tariff::filter::{self, FilterCondition, FilterOperator, Filters};
use douane::tariff::TariffItem;

fn item(code: &str, npf: &str, zlecaf: &str, vat: &str) -> TariffItem {
    TariffItem {
        tariff_code: code.to_string(),
        description: format!("item {code}"),
        unit: "kg".to_string(),
        duty_npf: npf.to_string(),
        duty_zlecaf: zlecaf.to_string(),
        vat: vat.to_string(),
    }
}

fn at_least(value: f64) -> Option<FilterCondition> {
    Some(FilterCondition {
        operator: FilterOperator::AtLeast,
        value,
    })
}

#[test]
fn npf_threshold_keeps_only_matching_rows() {
    let items = vec![
        item("01.01", "5 %", "4 %", "16 %"),
        item("01.02", "12 %", "10 %", "16 %"),
        item("01.03", "exempt", "exempt", "16 %"),
    ];
    let filters = Filters {
        duty_npf: at_least(10.0),
        ..Default::default()
    };

    let kept = filter::apply(&items, &filters);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].tariff_code, "01.02");
}

#[test]
fn exempt_counts_as_zero() {
    let items = vec![
        item("01.01", "5 %", "4 %", "16 %"),
        item("01.03", "Exempt", "exempt", "16 %"),
    ];
    let filters = Filters {
        duty_npf: Some(FilterCondition {
            operator: FilterOperator::AtMost,
            value: 0.0,
        }),
        ..Default::default()
    };

    let kept = filter::apply(&items, &filters);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].tariff_code, "01.03");
}

#[test]
fn comma_decimal_rates_are_understood() {
    let items = vec![item("01.01", "5 %", "4,5 %", "16 %")];
    let filters = Filters {
        duty_zlecaf: Some(FilterCondition {
            operator: FilterOperator::Equal,
            value: 4.5,
        }),
        ..Default::default()
    };
    assert_eq!(filter::apply(&items, &filters).len(), 1);
}

#[test]
fn unparseable_rates_pass_every_condition() {
    let items = vec![item("01.01", "voir note", "n/a", "16 %")];
    let filters = Filters {
        duty_npf: at_least(10.0),
        duty_zlecaf: at_least(10.0),
        ..Default::default()
    };
    assert_eq!(filter::apply(&items, &filters).len(), 1);
}

#[test]
fn conditions_combine_across_columns() {
    let items = vec![
        item("01.01", "12 %", "10 %", "8 %"),
        item("01.02", "12 %", "10 %", "16 %"),
    ];
    let filters = Filters {
        duty_npf: at_least(10.0),
        vat: at_least(10.0),
        ..Default::default()
    };

    let kept = filter::apply(&items, &filters);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].tariff_code, "01.02");
}

#[test]
fn csv_export_has_header_and_quoted_fields() {
    let csv = render_csv(&[item("01.01", "5 %", "4 %", "16 %")]);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Tariff Code,Description,Unit,Duty (NPF),Duty (ZLECAf),VAT/Other")
    );
    assert_eq!(
        lines.next(),
        Some("\"01.01\",\"item 01.01\",\"kg\",\"5 %\",\"4 %\",\"16 %\"")
    );
    assert_eq!(lines.next(), None);
}
