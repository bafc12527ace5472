use std::fmt;

use super::Reading;

/// Time-of-day bucket a reading falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum DayPeriod {
    Daytime,
    Nighttime,
    Neither,
}

/// A price series computed for every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum PriceColumn {
    Regular,
    AllDayDiscount,
    DaytimeDiscount,
    NighttimeDiscount,
}

impl PriceColumn {
    pub const ALL: [PriceColumn; 4] = [
        PriceColumn::Regular,
        PriceColumn::AllDayDiscount,
        PriceColumn::DaytimeDiscount,
        PriceColumn::NighttimeDiscount,
    ];

    /// Columns available when the input has no time of day.
    pub const FLAT: [PriceColumn; 2] = [PriceColumn::Regular, PriceColumn::AllDayDiscount];

    pub fn for_time_of_day(has_time_of_day: bool) -> &'static [PriceColumn] {
        if has_time_of_day {
            &Self::ALL
        } else {
            &Self::FLAT
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceColumn::Regular => "Regular price",
            PriceColumn::AllDayDiscount => "7% All Day",
            PriceColumn::DaytimeDiscount => "15% Daytime",
            PriceColumn::NighttimeDiscount => "20% Nighttime",
        }
    }
}

impl fmt::Display for PriceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A reading with every tariff applied.
///
/// The time-sensitive prices are `None` when the reading carries no time of
/// day; outside their window they equal `regular_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedReading {
    pub reading: Reading,
    pub period: Option<DayPeriod>,
    pub regular_price: f64,
    pub all_day_discount_price: f64,
    pub daytime_discount_price: Option<f64>,
    pub nighttime_discount_price: Option<f64>,
}

impl PricedReading {
    pub fn price(&self, column: PriceColumn) -> Option<f64> {
        match column {
            PriceColumn::Regular => Some(self.regular_price),
            PriceColumn::AllDayDiscount => Some(self.all_day_discount_price),
            PriceColumn::DaytimeDiscount => self.daytime_discount_price,
            PriceColumn::NighttimeDiscount => self.nighttime_discount_price,
        }
    }
}
