pub mod export;
pub mod filter;
pub mod queries;
pub mod types;

pub use filter::{FilterCondition, FilterOperator, Filters};
pub use types::{BivacReport, Suggestion, SuggestionKind, TariffItem, VehicleReport};
