use time::{Date, Time};

/// One usage row taken from an uploaded CSV file.
///
/// `time` is only present for layouts that carry a time-of-day column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub date: Date,
    pub time: Option<Time>,
    pub kwh: f64,
}

impl Reading {
    pub fn new(date: Date, kwh: f64) -> Self {
        Self { date, time: None, kwh }
    }

    pub fn at(date: Date, time: Time, kwh: f64) -> Self {
        Self {
            date,
            time: Some(time),
            kwh,
        }
    }
}
