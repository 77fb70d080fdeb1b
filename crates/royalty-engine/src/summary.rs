//! Current-vs-previous period comparison.

use royalty_core::{AnalyticsError, PeriodSummary};
use rust_decimal::Decimal;

/// Absolute and percentage change from `previous` to `current`.
///
/// A non-positive previous total reports 0% change.
pub fn summarize(current: Decimal, previous: Decimal) -> Result<PeriodSummary, AnalyticsError> {
    let absolute_change = current
        .checked_sub(previous)
        .ok_or(AnalyticsError::NonFinite)?;
    let percentage_change = if previous > Decimal::ZERO {
        absolute_change
            .checked_div(previous)
            .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
            .map(|p| p.round_dp(2))
            .unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    Ok(PeriodSummary {
        current_total: current,
        previous_total: previous,
        absolute_change,
        percentage_change,
    })
}
