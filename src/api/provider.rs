use crate::data::{BarSeries, Interval};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};

/// Which bars to request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarWindow {
    /// Provider-relative range such as "1d", "5d", "1mo", "3y"
    Range(String),
    /// Calendar dates, `end` exclusive
    Dates { start: NaiveDate, end: NaiveDate },
}

impl BarWindow {
    /// `years` of history up to and including `today`
    pub fn last_years(years: u32, today: NaiveDate) -> Self {
        let (start, end) = year_span(years, today);
        BarWindow::Dates { start, end }
    }

    /// Time bounds `[start, end)` of the window, relative to `now` for ranges.
    /// `None` for open-ended ranges such as "max".
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            BarWindow::Dates { start, end } => Some((
                start.and_hms_opt(0, 0, 0)?.and_utc(),
                end.and_hms_opt(0, 0, 0)?.and_utc(),
            )),
            BarWindow::Range(range) => {
                let span = parse_range(range)?;
                Some((now - span, now + Duration::seconds(1)))
            }
        }
    }
}

/// `[start, end)` dates covering `years` of history up to and including `today`
pub fn year_span(years: u32, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(today);
    let end = today.succ_opt().unwrap_or(today);
    (start, end)
}

fn parse_range(range: &str) -> Option<Duration> {
    let range = range.trim().to_lowercase();
    let split = range.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = range.split_at(split);
    let count: i64 = count.parse().ok()?;

    match unit {
        "d" => Some(Duration::days(count)),
        "wk" => Some(Duration::weeks(count)),
        "mo" => Some(Duration::days(count * 31)),
        "y" => Some(Duration::days(count * 366)),
        _ => None,
    }
}

/// Abstract interface for fetching price bars.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        window: &BarWindow,
    ) -> Result<BarSeries>;
}
