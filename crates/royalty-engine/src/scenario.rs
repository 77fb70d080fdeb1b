//! Multi-scenario forward projections.

use chrono::NaiveDate;
use rayon::prelude::*;
use royalty_core::calendar::nth_step;
use royalty_core::config::EngineConfig;
use royalty_core::{
    money_add, to_money, AnalyticsError, Entity, EntityId, EntityValues, Granularity, ScenarioResult, ScenarioSpec,
};
use royalty_series::{entity_stream, forecast_values};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

/// Project every entity `months` monthly steps from `start` under each
/// scenario's growth multiplier.
///
/// Scenario `k` draws from RNG slot `k + 1`, so scenarios never share noise
/// and the probability weight has no influence on the projection.
pub fn run_scenarios(
    entities: &[Entity],
    start: NaiveDate,
    months: u32,
    scenarios: &[ScenarioSpec],
    cfg: &EngineConfig,
    seed: u64,
) -> Result<Vec<ScenarioResult>, AnalyticsError> {
    let steps = (0..months)
        .map(|k| nth_step(start, Granularity::Month, k).ok_or(AnalyticsError::DateOutOfRange))
        .collect::<Result<Vec<_>, _>>()?;

    scenarios
        .iter()
        .enumerate()
        .map(|(slot, spec)| -> Result<ScenarioResult, AnalyticsError> {
            let per_entity = entities
                .par_iter()
                .enumerate()
                .map(|(idx, e)| -> Result<(EntityId, Decimal), AnalyticsError> {
                    let adjusted = e.annual_growth_rate_percent * spec.growth_adjustment_factor;
                    let mut rng = entity_stream(seed, slot as u32 + 1, idx as u32);
                    let values = forecast_values(
                        &e.id,
                        adjusted,
                        &steps,
                        Granularity::Month,
                        cfg,
                        &mut rng,
                    )?;
                    Ok((e.id.clone(), to_money(values.iter().sum())?))
                })
                .collect::<Result<Vec<_>, AnalyticsError>>()?;

            let mut values = EntityValues::new();
            for (id, v) in per_entity {
                values.add(id, v)?;
            }
            debug!(scenario = %spec.name, total = %values.total(), "scenario projected");
            Ok(ScenarioResult {
                name: spec.name.clone(),
                probability_weight: spec.probability_weight,
                growth_adjustment_factor: spec.growth_adjustment_factor,
                total_projection: values.total(),
                per_entity: values,
            })
        })
        .collect()
}

/// Σ weight × total across scenarios. Weights are taken as given.
pub fn expected_projection(results: &[ScenarioResult]) -> Result<Decimal, AnalyticsError> {
    let mut acc = Decimal::ZERO;
    for r in results {
        let w = Decimal::from_f64(r.probability_weight).ok_or(AnalyticsError::NonFinite)?;
        let weighted = w
            .checked_mul(r.total_projection)
            .ok_or(AnalyticsError::NonFinite)?;
        acc = money_add(acc, weighted)?;
    }
    Ok(acc.round_dp(2))
}
