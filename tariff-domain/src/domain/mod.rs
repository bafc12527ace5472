mod month_key;
mod monthly;
mod priced_reading;
mod reading;

pub use month_key::MonthKey;
pub use monthly::{MonthlyAggregate, MonthlyTable};
pub use priced_reading::{DayPeriod, PriceColumn, PricedReading};
pub use reading::Reading;
