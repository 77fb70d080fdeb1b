//! Calendar bucketing: gap-free bucket boundaries for a date window.

use crate::{validate_window, AnalyticsError};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Bucket size of a generated series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

/// Number of whole calendar months from `start` to `end`.
///
/// A month only counts once `end` has reached the same day-of-month as
/// `start`, so 2025-01-15..2025-02-14 is 0 months and ..2025-02-15 is 1.
/// Returns 0 when `end < start`.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end <= start {
        return 0;
    }
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    u32::try_from(months).unwrap_or(0)
}

/// Granularity picked from the span when the caller does not set one:
/// up to 1 month is daily, up to 6 months weekly, monthly beyond that.
pub fn select_granularity(start: NaiveDate, end: NaiveDate) -> Granularity {
    match whole_months_between(start, end) {
        0..=1 => Granularity::Day,
        2..=6 => Granularity::Week,
        _ => Granularity::Month,
    }
}

/// The `k`-th step from `anchor`.
///
/// Steps are always taken from the anchor rather than from the previous
/// bucket, so a month series starting on the 31st clamps to shorter month
/// ends and returns to the 31st afterwards.
pub fn nth_step(anchor: NaiveDate, granularity: Granularity, k: u32) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => anchor.checked_add_days(Days::new(u64::from(k))),
        Granularity::Week => anchor.checked_add_days(Days::new(u64::from(k) * 7)),
        Granularity::Month => anchor.checked_add_months(Months::new(k)),
    }
}

/// Ordered bucket start dates covering `[start, end]`.
///
/// The first bucket starts at `start`; buckets are emitted until the next
/// start would exceed `end`. `start == end` yields one bucket.
pub fn build_buckets(
    start: NaiveDate,
    end: NaiveDate,
    granularity: Option<Granularity>,
) -> Result<Vec<NaiveDate>, AnalyticsError> {
    validate_window(start, end)?;
    let granularity = granularity.unwrap_or_else(|| select_granularity(start, end));
    let mut starts = Vec::new();
    let mut k = 0u32;
    loop {
        let next = nth_step(start, granularity, k).ok_or(AnalyticsError::DateOutOfRange)?;
        if next > end {
            break;
        }
        starts.push(next);
        k = k.checked_add(1).ok_or(AnalyticsError::DateOutOfRange)?;
    }
    Ok(starts)
}

/// Inclusive last day of the bucket at index `k`, clipped to `window_end`.
pub fn bucket_end(
    anchor: NaiveDate,
    granularity: Granularity,
    k: u32,
    window_end: NaiveDate,
) -> Option<NaiveDate> {
    let next = nth_step(anchor, granularity, k.checked_add(1)?)?;
    let last = next.pred_opt()?;
    Some(last.min(window_end))
}

/// Calendar quarter (1..=4) of a date.
pub fn quarter_of(date: NaiveDate) -> u8 {
    (date.month0() / 3 + 1) as u8
}
