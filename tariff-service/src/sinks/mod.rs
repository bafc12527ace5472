pub mod monthly_aggregate;

pub use monthly_aggregate::{AggregateOutcome, MonthlyAggregateSink};
