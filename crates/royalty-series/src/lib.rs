#![deny(warnings)]

//! Per-entity series generation for royalty analytics.
//!
//! This crate provides validated utilities for:
//! - Monthly-compounded growth derived from an annual rate
//! - Seasonal multipliers keyed by calendar quarter
//! - Historical backfill pinned to a known current value
//! - Forward projections with seeded baseline noise
//!
//! Randomness is always injected as `&mut impl Rng`. [`entity_stream`]
//! derives independent, reproducible ChaCha streams from a single seed so
//! entities and scenarios can be generated in any order or in parallel.

use chrono::{Datelike, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use royalty_core::config::{EngineConfig, SeasonalCfg};
use royalty_core::{
    to_money, validate_growth_rate, AnalyticsError, Entity, EntityId, Granularity, SeriesMode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Average month length in days, used to express daily/weekly steps in months.
pub const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

/// One generated value, rounded to cents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub start: NaiveDate,
    pub value: Decimal,
}

/// Deterministic RNG for one (scenario slot, entity) pair.
///
/// Slot 0 is the main series; scenario `k` uses slot `k + 1`.
pub fn entity_stream(seed: u64, slot: u32, entity_index: u32) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream((u64::from(slot) << 32) | u64::from(entity_index));
    rng
}

/// True monthly-compounded equivalent of an annual percentage rate.
///
/// (1 + r_m)^12 = 1 + annual/100. Fails for rates <= -100%, where the
/// fractional power of a non-positive base is undefined.
pub fn monthly_rate(entity: &EntityId, annual_rate_percent: f64) -> Result<f64, AnalyticsError> {
    validate_growth_rate(entity, annual_rate_percent)?;
    let r = (1.0 + annual_rate_percent / 100.0).powf(1.0 / 12.0) - 1.0;
    if !r.is_finite() {
        return Err(AnalyticsError::NonFinite);
    }
    Ok(r)
}

/// Compounded growth after `periods` months.
pub fn growth_factor(monthly_rate: f64, periods: f64) -> f64 {
    (1.0 + monthly_rate).powf(periods)
}

/// Months elapsed at bucket `index`.
///
/// Monthly buckets count whole steps; daily and weekly buckets convert the
/// elapsed days so the same annual rate yields the same curve at any
/// granularity.
pub fn growth_periods(
    first: NaiveDate,
    bucket_start: NaiveDate,
    index: usize,
    granularity: Granularity,
) -> f64 {
    match granularity {
        Granularity::Month => index as f64,
        Granularity::Day | Granularity::Week => {
            (bucket_start - first).num_days() as f64 / DAYS_PER_MONTH
        }
    }
}

/// Seasonal multiplier for a calendar month (1..=12).
///
/// Oct-Dec are boosted, Jan-Mar are damped, other months are neutral.
/// Draws from `rng` only for boosted or damped months.
pub fn seasonal_factor<R: Rng + ?Sized>(month: u32, cfg: &SeasonalCfg, rng: &mut R) -> f64 {
    match month {
        10..=12 => rng.gen_range(cfg.q4_min..=cfg.q4_max),
        1..=3 => rng.gen_range(cfg.q1_min..=cfg.q1_max),
        _ => 1.0,
    }
}

/// Full-precision forecast values for one entity.
///
/// value_i = base_i * growth(i) * seasonal(month_i), with base_i re-drawn
/// from the configured range at every step.
pub fn forecast_values<R: Rng + ?Sized>(
    entity: &EntityId,
    annual_rate_percent: f64,
    buckets: &[NaiveDate],
    granularity: Granularity,
    cfg: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<f64>, AnalyticsError> {
    let rate = monthly_rate(entity, annual_rate_percent)?;
    let Some(&first) = buckets.first() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(buckets.len());
    for (i, &start) in buckets.iter().enumerate() {
        let base: f64 = rng.gen_range(cfg.forecast.base_min..=cfg.forecast.base_max);
        let growth = growth_factor(rate, growth_periods(first, start, i, granularity));
        let seasonal = seasonal_factor(start.month(), &cfg.seasonal, rng);
        let v = base * growth * seasonal;
        if !v.is_finite() {
            return Err(AnalyticsError::NonFinite);
        }
        out.push(v);
    }
    Ok(out)
}

/// Full-precision historical backfill for one entity.
///
/// The walk starts at `anchor * start_fraction` and moves linearly toward
/// the anchor; intermediate points get a bounded relative perturbation. The
/// last point is the anchor itself.
pub fn historical_values<R: Rng + ?Sized>(
    anchor: f64,
    len: usize,
    cfg: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<f64>, AnalyticsError> {
    if !anchor.is_finite() {
        return Err(AnalyticsError::NonFinite);
    }
    let band = cfg.historical.noise_band;
    let start = anchor * cfg.historical.start_fraction;
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if i + 1 == len {
            out.push(anchor);
            break;
        }
        let t = i as f64 / (len - 1) as f64;
        let trend = start + (anchor - start) * t;
        let u: f64 = rng.gen_range(-band..=band);
        out.push(trend * (1.0 + u));
    }
    Ok(out)
}

/// Generate an entity's series over the given bucket starts.
///
/// Historical mode pins the last value to `entity.current_value` (or a
/// single baseline draw when the entity has none); forecast mode compounds
/// the entity's own growth rate.
pub fn generate_series<R: Rng + ?Sized>(
    entity: &Entity,
    buckets: &[NaiveDate],
    granularity: Granularity,
    mode: SeriesMode,
    cfg: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<SeriesPoint>, AnalyticsError> {
    let values = match mode {
        SeriesMode::Historical => {
            validate_growth_rate(&entity.id, entity.annual_growth_rate_percent)?;
            let anchor = match entity.current_value {
                Some(v) => v,
                None => rng.gen_range(cfg.forecast.base_min..=cfg.forecast.base_max),
            };
            historical_values(anchor, buckets.len(), cfg, rng)?
        }
        SeriesMode::Forecast => forecast_values(
            &entity.id,
            entity.annual_growth_rate_percent,
            buckets,
            granularity,
            cfg,
            rng,
        )?,
    };
    buckets
        .iter()
        .zip(values)
        .map(|(&start, v)| -> Result<SeriesPoint, AnalyticsError> {
            Ok(SeriesPoint {
                start,
                value: to_money(v)?,
            })
        })
        .collect()
}
