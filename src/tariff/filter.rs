//! Client-side narrowing of a tariff result set by numeric rate, applied
//! after retrieval without another model round trip.

use crate::tariff::types::TariffItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "==")]
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub operator: FilterOperator,
    pub value: f64,
}

/// One optional condition per rate column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filters {
    #[serde(rename = "dutyNPF")]
    pub duty_npf: Option<FilterCondition>,
    #[serde(rename = "dutyZLECAf")]
    pub duty_zlecaf: Option<FilterCondition>,
    pub vat: Option<FilterCondition>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.duty_npf.is_none() && self.duty_zlecaf.is_none() && self.vat.is_none()
    }
}

/// Parse a display rate into a percentage. "exempt" in any case is 0;
/// `%` signs are stripped and comma decimal separators accepted.
/// Unparseable text is `None`.
pub fn parse_percentage(value: &str) -> Option<f64> {
    if value.to_lowercase().contains("exempt") {
        return Some(0.0);
    }
    let cleaned = value.replace('%', "").replace(',', ".");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
}

/// A missing condition or an unparseable rate passes unconditionally.
fn passes(rate: Option<f64>, condition: Option<FilterCondition>) -> bool {
    let (Some(rate), Some(condition)) = (rate, condition) else {
        return true;
    };
    match condition.operator {
        FilterOperator::AtLeast => rate >= condition.value,
        FilterOperator::AtMost => rate <= condition.value,
        FilterOperator::Equal => rate == condition.value,
    }
}

/// Keep the items satisfying every given condition.
pub fn apply(items: &[TariffItem], filters: &Filters) -> Vec<TariffItem> {
    items
        .iter()
        .filter(|item| {
            passes(parse_percentage(&item.duty_npf), filters.duty_npf)
                && passes(parse_percentage(&item.duty_zlecaf), filters.duty_zlecaf)
                && passes(parse_percentage(&item.vat), filters.vat)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_rates() {
        assert_eq!(parse_percentage("5 %"), Some(5.0));
        assert_eq!(parse_percentage("4,5 %"), Some(4.5));
        assert_eq!(parse_percentage("Exempt"), Some(0.0));
        assert_eq!(parse_percentage("n/a"), None);
        assert_eq!(parse_percentage(""), None);
    }

    #[test]
    fn unparseable_rate_passes_all_conditions() {
        let condition = Some(FilterCondition {
            operator: FilterOperator::AtLeast,
            value: 10.0,
        });
        assert!(passes(None, condition));
        assert!(passes(Some(5.0), None));
    }
}
