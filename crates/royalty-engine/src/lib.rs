#![deny(warnings)]

//! Royalty analytics engine: turns per-project growth assumptions into
//! bucketed series, rollups, scenario projections and breakdowns.
//!
//! [`run`] is the single entry point. It is pure and stateless: all history
//! and project metadata arrive in the [`AnalyticsRequest`], and the
//! [`AnalyticsResponse`] is returned without being stored anywhere.

pub mod aggregate;
pub mod distribution;
pub mod scenario;
pub mod summary;

use chrono::NaiveDate;
use rayon::prelude::*;
use royalty_core::calendar::{build_buckets, nth_step, select_granularity};
use royalty_core::config::EngineConfig;
use royalty_core::{
    to_money, validate_entity, validate_window, AnalyticsError, Bucket, DistributionSlice, Entity,
    EntityValues, Granularity, PeriodSummary, RollupPeriod, ScenarioResult, ScenarioSpec,
    SeriesMode, WeightedValue,
};
use royalty_series::{entity_stream, generate_series, SeriesPoint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use aggregate::{fill_buckets, grand_total, rollup, RollupGranularity};
pub use distribution::{by_category, distribute, SliceOrder};
pub use scenario::{expected_projection, run_scenarios};
pub use summary::summarize;

/// Input of one analytics computation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Picked from the window span when absent.
    #[serde(default)]
    pub granularity: Option<Granularity>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub mode: SeriesMode,
    /// Forecasts fall back to the configured scenarios when absent;
    /// historical runs only project scenarios that are asked for.
    #[serde(default)]
    pub scenarios: Option<Vec<ScenarioSpec>>,
    #[serde(default)]
    pub platform_weights: Vec<WeightedValue>,
    #[serde(default)]
    pub territory_weights: Vec<WeightedValue>,
    /// Total of the comparison period, resolved by the caller.
    #[serde(default)]
    pub previous_total: Option<f64>,
    /// Overrides the configured seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Whether the response carries data or is the legitimate "nothing yet" state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Populated,
    NoEntities,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rollups {
    pub quarterly: Vec<RollupPeriod>,
    pub annual: Vec<RollupPeriod>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub category: Vec<DistributionSlice>,
    pub platform: Vec<DistributionSlice>,
    pub territory: Vec<DistributionSlice>,
}

/// Output of one analytics computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub status: DataStatus,
    pub granularity: Granularity,
    pub buckets: Vec<Bucket>,
    pub rollups: Rollups,
    /// Per-entity totals over the whole window.
    pub totals: EntityValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<ScenarioResult>>,
    pub distributions: Distributions,
    pub summary: PeriodSummary,
}

/// First month of the scenario horizon: the window start for forecasts,
/// the month after the window for historical backfills.
fn scenario_start(req: &AnalyticsRequest) -> Result<NaiveDate, AnalyticsError> {
    match req.mode {
        SeriesMode::Forecast => Ok(req.window_start),
        SeriesMode::Historical => {
            nth_step(req.window_end, Granularity::Month, 1).ok_or(AnalyticsError::DateOutOfRange)
        }
    }
}

/// Run the full pipeline for one request.
pub fn run(req: &AnalyticsRequest, cfg: &EngineConfig) -> Result<AnalyticsResponse, AnalyticsError> {
    cfg.validate()?;
    validate_window(req.window_start, req.window_end)?;
    for e in &req.entities {
        validate_entity(e)?;
    }

    let granularity = req
        .granularity
        .unwrap_or_else(|| select_granularity(req.window_start, req.window_end));
    let starts = build_buckets(req.window_start, req.window_end, Some(granularity))?;
    let seed = req.seed.unwrap_or(cfg.seed);
    debug!(
        ?granularity,
        buckets = starts.len(),
        entities = req.entities.len(),
        seed,
        "buckets built"
    );

    let series = req
        .entities
        .par_iter()
        .enumerate()
        .map(|(idx, e)| {
            let mut rng = entity_stream(seed, 0, idx as u32);
            generate_series(e, &starts, granularity, req.mode, cfg, &mut rng)
        })
        .collect::<Result<Vec<Vec<SeriesPoint>>, AnalyticsError>>()?;

    let buckets = fill_buckets(&starts, granularity, &req.entities, &series)?;
    let rollups = Rollups {
        quarterly: rollup(&buckets, RollupGranularity::Quarter)?,
        annual: rollup(&buckets, RollupGranularity::Year)?,
    };
    let totals = grand_total(&buckets)?;
    debug!(total = %totals.total(), quarters = rollups.quarterly.len(), "series aggregated");

    let specs = match (&req.scenarios, req.mode) {
        (Some(specs), _) => Some(specs.clone()),
        (None, SeriesMode::Forecast) => Some(cfg.scenarios.clone()),
        (None, SeriesMode::Historical) => None,
    };
    let scenarios = match specs {
        Some(specs) => {
            let months = build_buckets(req.window_start, req.window_end, Some(Granularity::Month))?
                .len() as u32;
            let start = scenario_start(req)?;
            Some(run_scenarios(&req.entities, start, months, &specs, cfg, seed)?)
        }
        None => None,
    };

    let distributions = Distributions {
        category: by_category(&req.entities, &totals)?,
        platform: distribute(&req.platform_weights, SliceOrder::Input)?,
        territory: distribute(&req.territory_weights, SliceOrder::Input)?,
    };
    let previous = to_money(req.previous_total.unwrap_or(0.0))?;
    let summary = summarize(totals.total(), previous)?;

    let status = if req.entities.is_empty() {
        DataStatus::NoEntities
    } else {
        DataStatus::Populated
    };
    info!(
        ?status,
        mode = ?req.mode,
        buckets = buckets.len(),
        scenarios = scenarios.as_ref().map_or(0, Vec::len),
        current_total = %summary.current_total,
        "analytics run complete"
    );

    Ok(AnalyticsResponse {
        status,
        granularity,
        buckets,
        rollups,
        totals,
        scenarios,
        distributions,
        summary,
    })
}
