use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Inclusive calendar range, serialized as `YYYY-MM-DD` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRange")]
pub struct DateRange {
    #[serde(rename = "startDate")]
    start: NaiveDate,
    #[serde(rename = "endDate")]
    end: NaiveDate,
}

#[derive(Deserialize)]
struct UncheckedRange {
    #[serde(rename = "startDate")]
    start: NaiveDate,
    #[serde(rename = "endDate")]
    end: NaiveDate,
}

impl TryFrom<UncheckedRange> for DateRange {
    type Error = anyhow::Error;

    fn try_from(raw: UncheckedRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("date range starts after it ends ({start} > {end})");
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// `days` days ending on `end`, inclusive. A zero-day window is one day.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let span = u64::from(days.max(1) - 1);
        let start = end.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive length in days.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Window of the same length that ends the day before this one starts.
    pub fn previous_period(&self) -> Self {
        let length = u64::try_from(self.days()).unwrap_or(1);
        let start = self
            .start
            .checked_sub_days(Days::new(length))
            .unwrap_or(NaiveDate::MIN);
        let end = self.start.pred_opt().unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start_string(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ~ {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid date {input:?}, expected YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(input: &str) -> NaiveDate {
        parse_date(input).unwrap()
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert!(DateRange::parse("2025-03-02", "2025-03-01").is_err());
        assert!(DateRange::parse("2025-03-01", "2025-03-01").is_ok());
        assert!(DateRange::parse("03/01/2025", "2025-03-01").is_err());
    }

    #[test]
    fn trailing_window_is_inclusive() {
        let range = DateRange::trailing(date("2025-03-07"), DEFAULT_WINDOW_DAYS);
        assert_eq!(range.start(), date("2025-03-01"));
        assert_eq!(range.days(), 7);
        assert_eq!(DateRange::trailing(date("2025-03-07"), 0).days(), 1);
    }

    #[test]
    fn previous_period_has_same_length() {
        let range = DateRange::parse("2025-03-01", "2025-03-07").unwrap();
        let previous = range.previous_period();
        assert_eq!(previous.start(), date("2025-02-22"));
        assert_eq!(previous.end(), date("2025-02-28"));
        assert_eq!(previous.days(), range.days());
    }

    #[test]
    fn serializes_as_service_fields() {
        let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json["startDate"], "2025-01-01");
        assert_eq!(json["endDate"], "2025-01-31");
        assert_eq!(range.to_string(), "2025-01-01 ~ 2025-01-31");

        let back: DateRange = serde_json::from_value(json).unwrap();
        assert_eq!(back, range);
        let inverted = serde_json::json!({ "startDate": "2025-02-01", "endDate": "2025-01-01" });
        assert!(serde_json::from_value::<DateRange>(inverted).is_err());
    }
}
