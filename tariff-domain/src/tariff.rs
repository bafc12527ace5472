use time::{macros::time, Time};

use crate::domain::{DayPeriod, PricedReading, Reading};

/// Base price per kWh.
pub const BASE_RATE: f64 = 0.5252;
/// 7% off, applied to every reading.
pub const ALL_DAY_MULTIPLIER: f64 = 0.93;
/// 15% off, daytime readings only.
pub const DAYTIME_MULTIPLIER: f64 = 0.85;
/// 20% off, nighttime readings only.
pub const NIGHTTIME_MULTIPLIER: f64 = 0.80;

pub const DAYTIME_START: Time = time!(07:00);
pub const DAYTIME_END: Time = time!(17:00);
pub const NIGHTTIME_START: Time = time!(23:00);

/// Classify a clock time.
///
/// Daytime is [07:00, 17:00], nighttime is [23:00, 24:00) plus [00:00, 07:00).
/// 07:00 itself counts as daytime so the two windows never overlap.
pub fn classify(t: Time) -> DayPeriod {
    if t >= DAYTIME_START && t <= DAYTIME_END {
        DayPeriod::Daytime
    } else if t >= NIGHTTIME_START || t < DAYTIME_START {
        DayPeriod::Nighttime
    } else {
        DayPeriod::Neither
    }
}

/// Fixed per-kWh rate with its three discount multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub base_rate: f64,
    pub all_day_multiplier: f64,
    pub daytime_multiplier: f64,
    pub nighttime_multiplier: f64,
}

impl Tariff {
    pub const STANDARD: Tariff = Tariff {
        base_rate: BASE_RATE,
        all_day_multiplier: ALL_DAY_MULTIPLIER,
        daytime_multiplier: DAYTIME_MULTIPLIER,
        nighttime_multiplier: NIGHTTIME_MULTIPLIER,
    };

    pub fn price(&self, reading: Reading) -> PricedReading {
        let regular_price = reading.kwh * self.base_rate;
        let all_day_discount_price = regular_price * self.all_day_multiplier;

        let period = reading.time.map(classify);
        let (daytime_discount_price, nighttime_discount_price) = match period {
            None => (None, None),
            Some(DayPeriod::Daytime) => (
                Some(regular_price * self.daytime_multiplier),
                Some(regular_price),
            ),
            Some(DayPeriod::Nighttime) => (
                Some(regular_price),
                Some(regular_price * self.nighttime_multiplier),
            ),
            Some(DayPeriod::Neither) => (Some(regular_price), Some(regular_price)),
        };

        PricedReading {
            reading,
            period,
            regular_price,
            all_day_discount_price,
            daytime_discount_price,
            nighttime_discount_price,
        }
    }
}

impl Default for Tariff {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn classify_window_boundaries() {
        assert_eq!(classify(time!(07:00)), DayPeriod::Daytime);
        assert_eq!(classify(time!(12:30)), DayPeriod::Daytime);
        assert_eq!(classify(time!(17:00)), DayPeriod::Daytime);
        assert_eq!(classify(time!(17:01)), DayPeriod::Neither);
        assert_eq!(classify(time!(22:59)), DayPeriod::Neither);
        assert_eq!(classify(time!(23:00)), DayPeriod::Nighttime);
        assert_eq!(classify(time!(23:59)), DayPeriod::Nighttime);
        assert_eq!(classify(time!(00:00)), DayPeriod::Nighttime);
        assert_eq!(classify(time!(06:59)), DayPeriod::Nighttime);
    }

    #[test]
    fn flat_reading_has_no_time_sensitive_prices() {
        let priced = Tariff::STANDARD.price(Reading::new(date!(2024 - 01 - 01), 10.0));

        assert!(approx(priced.regular_price, 10.0 * 0.5252));
        assert!(approx(priced.all_day_discount_price, 10.0 * 0.5252 * 0.93));
        assert_eq!(priced.daytime_discount_price, None);
        assert_eq!(priced.nighttime_discount_price, None);
        assert_eq!(priced.period, None);
    }

    #[test]
    fn daytime_reading_gets_daytime_discount_only() {
        let priced = Tariff::STANDARD.price(Reading::at(date!(2024 - 01 - 01), time!(12:00), 4.0));

        assert_eq!(priced.period, Some(DayPeriod::Daytime));
        assert!(approx(priced.daytime_discount_price.unwrap(), 4.0 * 0.5252 * 0.85));
        assert!(approx(priced.nighttime_discount_price.unwrap(), priced.regular_price));
    }

    #[test]
    fn nighttime_reading_gets_nighttime_discount_only() {
        let priced = Tariff::STANDARD.price(Reading::at(date!(2024 - 01 - 01), time!(02:15), 4.0));

        assert_eq!(priced.period, Some(DayPeriod::Nighttime));
        assert!(approx(priced.nighttime_discount_price.unwrap(), 4.0 * 0.5252 * 0.80));
        assert!(approx(priced.daytime_discount_price.unwrap(), priced.regular_price));
    }

    #[test]
    fn evening_reading_is_undiscounted_in_time_sensitive_columns() {
        let priced = Tariff::STANDARD.price(Reading::at(date!(2024 - 01 - 01), time!(19:45), 3.0));

        assert_eq!(priced.period, Some(DayPeriod::Neither));
        assert!(approx(priced.daytime_discount_price.unwrap(), priced.regular_price));
        assert!(approx(priced.nighttime_discount_price.unwrap(), priced.regular_price));
        assert!(approx(priced.all_day_discount_price, priced.regular_price * 0.93));
    }
}
