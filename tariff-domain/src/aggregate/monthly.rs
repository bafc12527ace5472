use std::collections::BTreeMap;

use crate::{
    domain::{MonthKey, MonthlyAggregate, MonthlyTable, PriceColumn, PricedReading, Reading},
    tariff::Tariff,
};

use super::AggregateError;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    readings: usize,
    regular: f64,
    all_day_discount: f64,
    daytime_discount: f64,
    nighttime_discount: f64,
}

/// Group-and-sum of priced readings by calendar month.
///
/// Months are kept in a `BTreeMap`, so output is chronological regardless of
/// the order readings were pushed in.
#[derive(Debug, Clone)]
pub struct MonthlyAggregator {
    has_time_of_day: bool,
    months: BTreeMap<MonthKey, Totals>,
}

impl MonthlyAggregator {
    pub fn new(has_time_of_day: bool) -> Self {
        Self {
            has_time_of_day,
            months: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, priced: &PricedReading) {
        let key = MonthKey::from_date(priced.reading.date);
        let totals = self.months.entry(key).or_default();

        totals.readings += 1;
        totals.regular += priced.regular_price;
        totals.all_day_discount += priced.all_day_discount_price;
        totals.daytime_discount +=
            priced.daytime_discount_price.unwrap_or(priced.regular_price);
        totals.nighttime_discount +=
            priced.nighttime_discount_price.unwrap_or(priced.regular_price);
    }

    pub fn len(&self) -> usize {
        self.months.values().map(|t| t.readings).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn finish(self) -> Result<MonthlyTable, AggregateError> {
        if self.is_empty() {
            return Err(AggregateError::EmptyResult);
        }

        let has_time_of_day = self.has_time_of_day;
        let months = self
            .months
            .into_iter()
            .map(|(month, t)| MonthlyAggregate {
                month,
                readings: t.readings,
                regular: t.regular,
                all_day_discount: t.all_day_discount,
                daytime_discount: has_time_of_day.then_some(t.daytime_discount),
                nighttime_discount: has_time_of_day.then_some(t.nighttime_discount),
            })
            .collect();

        Ok(MonthlyTable::new(
            PriceColumn::for_time_of_day(has_time_of_day).to_vec(),
            months,
        ))
    }
}

/// Price and aggregate a batch of readings in one pass.
pub fn aggregate_monthly<I>(
    tariff: &Tariff,
    has_time_of_day: bool,
    readings: I,
) -> Result<MonthlyTable, AggregateError>
where
    I: IntoIterator<Item = Reading>,
{
    let mut aggregator = MonthlyAggregator::new(has_time_of_day);
    for reading in readings {
        aggregator.push(&tariff.price(reading));
    }
    aggregator.finish()
}
