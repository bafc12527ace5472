mod monthly;

pub use monthly::{aggregate_monthly, MonthlyAggregator};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no valid readings to aggregate")]
    EmptyResult,
}
