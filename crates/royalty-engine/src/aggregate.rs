//! Bucket filling and quarterly/annual rollups.

use chrono::{Datelike, NaiveDate};
use royalty_core::calendar::quarter_of;
use royalty_core::{AnalyticsError, Bucket, Entity, EntityValues, Granularity, RollupPeriod};
use royalty_series::SeriesPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarser period a bucket series is rolled into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupGranularity {
    Quarter,
    Year,
}

/// Numeric sort key; quarter is 0 for annual periods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PeriodKey {
    year: i32,
    quarter: u8,
}

impl PeriodKey {
    fn of(date: NaiveDate, target: RollupGranularity) -> Self {
        let quarter = match target {
            RollupGranularity::Quarter => quarter_of(date),
            RollupGranularity::Year => 0,
        };
        Self {
            year: date.year(),
            quarter,
        }
    }

    fn label(&self) -> String {
        if self.quarter == 0 {
            self.year.to_string()
        } else {
            format!("{}-Q{}", self.year, self.quarter)
        }
    }

    fn start(&self) -> Option<NaiveDate> {
        let month = if self.quarter == 0 {
            1
        } else {
            u32::from(self.quarter - 1) * 3 + 1
        };
        NaiveDate::from_ymd_opt(self.year, month, 1)
    }
}

/// Build buckets from per-entity series aligned with `starts`.
///
/// `series[i]` belongs to `entities[i]`; points are matched to buckets by
/// position. Entities with no series still leave empty buckets behind.
pub fn fill_buckets(
    starts: &[NaiveDate],
    granularity: Granularity,
    entities: &[Entity],
    series: &[Vec<SeriesPoint>],
) -> Result<Vec<Bucket>, AnalyticsError> {
    let mut buckets: Vec<Bucket> = starts
        .iter()
        .map(|&s| Bucket::empty(s, granularity))
        .collect();
    for (entity, points) in entities.iter().zip(series) {
        for (bucket, point) in buckets.iter_mut().zip(points) {
            debug_assert_eq!(bucket.start, point.start);
            bucket.values.add(entity.id.clone(), point.value)?;
        }
    }
    Ok(buckets)
}

/// Sum buckets into calendar quarters or years, ordered by (year, quarter).
///
/// Each period's total is rebuilt from the per-entity sums. Periods cut by
/// the window edges are returned like full ones.
pub fn rollup(
    buckets: &[Bucket],
    target: RollupGranularity,
) -> Result<Vec<RollupPeriod>, AnalyticsError> {
    let mut groups: BTreeMap<PeriodKey, EntityValues> = BTreeMap::new();
    for b in buckets {
        groups
            .entry(PeriodKey::of(b.start, target))
            .or_default()
            .merge(&b.values)?;
    }
    groups
        .into_iter()
        .map(|(key, values)| -> Result<RollupPeriod, AnalyticsError> {
            Ok(RollupPeriod {
                label: key.label(),
                year: key.year,
                quarter: (key.quarter != 0).then_some(key.quarter),
                start: key.start().ok_or(AnalyticsError::DateOutOfRange)?,
                values,
            })
        })
        .collect()
}

/// Per-entity totals over every bucket.
pub fn grand_total(buckets: &[Bucket]) -> Result<EntityValues, AnalyticsError> {
    let mut total = EntityValues::new();
    for b in buckets {
        total.merge(&b.values)?;
    }
    Ok(total)
}
