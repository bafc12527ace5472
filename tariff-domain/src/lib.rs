pub mod aggregate;
pub mod domain;
pub mod tariff;

pub use aggregate::{aggregate_monthly, AggregateError, MonthlyAggregator};
pub use domain::{
    DayPeriod, MonthKey, MonthlyAggregate, MonthlyTable, PriceColumn, PricedReading, Reading,
};
pub use tariff::{classify, Tariff};
