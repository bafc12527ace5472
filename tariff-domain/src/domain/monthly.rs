use super::{MonthKey, PriceColumn};

/// Price sums for one calendar month.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonthlyAggregate {
    pub month: MonthKey,
    pub readings: usize,
    pub regular: f64,
    pub all_day_discount: f64,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub daytime_discount: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub nighttime_discount: Option<f64>,
}

impl MonthlyAggregate {
    pub fn total(&self, column: PriceColumn) -> Option<f64> {
        match column {
            PriceColumn::Regular => Some(self.regular),
            PriceColumn::AllDayDiscount => Some(self.all_day_discount),
            PriceColumn::DaytimeDiscount => self.daytime_discount,
            PriceColumn::NighttimeDiscount => self.nighttime_discount,
        }
    }
}

/// Monthly totals in ascending month order.
///
/// Only built by [`crate::MonthlyAggregator::finish`], which refuses to
/// produce a table without months.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonthlyTable {
    columns: Vec<PriceColumn>,
    months: Vec<MonthlyAggregate>,
}

impl MonthlyTable {
    pub(crate) fn new(columns: Vec<PriceColumn>, months: Vec<MonthlyAggregate>) -> Self {
        debug_assert!(!months.is_empty());
        Self { columns, months }
    }

    pub fn columns(&self) -> &[PriceColumn] {
        &self.columns
    }

    pub fn months(&self) -> &[MonthlyAggregate] {
        &self.months
    }

    pub fn has_time_of_day(&self) -> bool {
        self.columns.contains(&PriceColumn::DaytimeDiscount)
    }

    pub fn month(&self, key: MonthKey) -> Option<&MonthlyAggregate> {
        self.months.iter().find(|m| m.month == key)
    }

    /// Largest single monthly total across every column.
    pub fn max_total(&self) -> f64 {
        self.months
            .iter()
            .flat_map(|m| self.columns.iter().filter_map(|c| m.total(*c)))
            .fold(0.0, f64::max)
    }

    pub fn reading_count(&self) -> usize {
        self.months.iter().map(|m| m.readings).sum()
    }
}
