#![deny(warnings)]

//! Core domain models and invariants for the royalty analytics engine.
//!
//! This crate defines the serializable types shared by the series generator
//! and the aggregation engine, plus validation helpers that guarantee the
//! numeric and calendar contracts before any computation starts.

pub mod calendar;
pub mod config;

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use calendar::Granularity;
pub use config::EngineConfig;

/// Unique identifier for a royalty-bearing project, e.g. "p1".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked royalty-bearing project.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    /// Project identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Category used for the category distribution (e.g. "music").
    pub category: String,
    /// Annual growth rate in percent (12.0 = 12%). May be negative, must be > -100.
    pub annual_growth_rate_percent: f64,
    /// Known current value; the last historical bucket is pinned to it.
    #[serde(default)]
    pub current_value: Option<f64>,
}

/// Whether the series is a backfill of the past or a projection forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesMode {
    Historical,
    #[default]
    Forecast,
}

/// Per-entity money values with a total that is reconciled on every mutation.
///
/// The fields are private so the only way to change the contents is through
/// [`EntityValues::add`] and [`EntityValues::merge`], which keep
/// `total == Σ values` exact in decimal arithmetic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntityValues")]
pub struct EntityValues {
    per_entity: BTreeMap<EntityId, Decimal>,
    total: Decimal,
}

#[derive(Deserialize)]
struct RawEntityValues {
    per_entity: BTreeMap<EntityId, Decimal>,
}

impl TryFrom<RawEntityValues> for EntityValues {
    type Error = AnalyticsError;

    fn try_from(raw: RawEntityValues) -> Result<Self, Self::Error> {
        let mut values = EntityValues::default();
        for (id, v) in raw.per_entity {
            values.add(id, v)?;
        }
        Ok(values)
    }
}

impl EntityValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the entity's value, creating the entry if absent.
    ///
    /// Fails with [`AnalyticsError::NonFinite`] when either the entry or the
    /// total would leave the decimal range; `self` is left untouched then.
    pub fn add(&mut self, id: EntityId, amount: Decimal) -> Result<(), AnalyticsError> {
        let updated = money_add(self.get(&id), amount)?;
        let total = money_add(self.total, amount)?;
        self.per_entity.insert(id, updated);
        self.total = total;
        Ok(())
    }

    /// Add every entry of `other` into `self`.
    pub fn merge(&mut self, other: &EntityValues) -> Result<(), AnalyticsError> {
        for (id, v) in &other.per_entity {
            self.add(id.clone(), *v)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &EntityId) -> Decimal {
        self.per_entity.get(id).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn per_entity(&self) -> &BTreeMap<EntityId, Decimal> {
        &self.per_entity
    }

    pub fn is_empty(&self) -> bool {
        self.per_entity.is_empty()
    }
}

/// The finest time unit of a series: one bucket start plus per-entity values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(rename = "date")]
    pub start: NaiveDate,
    pub granularity: Granularity,
    #[serde(flatten)]
    pub values: EntityValues,
}

impl Bucket {
    pub fn empty(start: NaiveDate, granularity: Granularity) -> Self {
        Self {
            start,
            granularity,
            values: EntityValues::new(),
        }
    }
}

/// A quarter or year aggregated from buckets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollupPeriod {
    /// "2025-Q1" for quarters, "2025" for years.
    pub label: String,
    pub year: i32,
    /// 1..=4 for quarterly rollups, `None` for annual ones.
    pub quarter: Option<u8>,
    /// First calendar day of the period (not of the first contributing bucket).
    pub start: NaiveDate,
    #[serde(flatten)]
    pub values: EntityValues,
}

/// A named what-if growth assumption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    /// Informational likelihood in [0, 1]; not normalized across scenarios.
    pub probability_weight: f64,
    /// Multiplier applied to every entity's annual growth rate.
    pub growth_adjustment_factor: f64,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, probability_weight: f64, factor: f64) -> Self {
        Self {
            name: name.into(),
            probability_weight,
            growth_adjustment_factor: factor,
        }
    }
}

/// Projection produced for one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub probability_weight: f64,
    pub growth_adjustment_factor: f64,
    pub total_projection: Decimal,
    pub per_entity: EntityValues,
}

/// A labelled value fed into the distribution analyzer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub label: String,
    pub value: f64,
}

impl WeightedValue {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// One slice of a percentage-of-total breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionSlice {
    pub label: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

/// Current-vs-previous comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub current_total: Decimal,
    pub previous_total: Decimal,
    pub absolute_change: Decimal,
    pub percentage_change: Decimal,
}

/// Errors raised by the analytics engine.
#[derive(Debug, Error, PartialEq)]
pub enum AnalyticsError {
    /// Window start is after window end.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// Annual growth rate makes monthly compounding undefined (<= -100% or non-finite).
    #[error("invalid growth rate {rate}% for entity {entity}")]
    InvalidGrowthRate { entity: EntityId, rate: f64 },
    /// A computed value was NaN, infinite or outside the decimal money range.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Calendar arithmetic left the representable date range.
    #[error("date arithmetic out of range")]
    DateOutOfRange,
    /// Engine configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Overflow-checked money addition.
pub fn money_add(a: Decimal, b: Decimal) -> Result<Decimal, AnalyticsError> {
    a.checked_add(b).ok_or(AnalyticsError::NonFinite)
}

/// Validate a window: `start <= end`.
pub fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<(), AnalyticsError> {
    if start > end {
        return Err(AnalyticsError::InvalidRange { start, end });
    }
    Ok(())
}

/// Validate an annual growth rate for monthly compounding.
pub fn validate_growth_rate(entity: &EntityId, rate: f64) -> Result<(), AnalyticsError> {
    if !rate.is_finite() || rate <= -100.0 {
        return Err(AnalyticsError::InvalidGrowthRate {
            entity: entity.clone(),
            rate,
        });
    }
    Ok(())
}

/// Validate an entity's growth rate and optional anchor value.
pub fn validate_entity(e: &Entity) -> Result<(), AnalyticsError> {
    validate_growth_rate(&e.id, e.annual_growth_rate_percent)?;
    if let Some(v) = e.current_value {
        if !v.is_finite() {
            return Err(AnalyticsError::NonFinite);
        }
    }
    Ok(())
}

/// Convert a full-precision float into money rounded to 2 decimal places.
pub fn to_money(value: f64) -> Result<Decimal, AnalyticsError> {
    if !value.is_finite() {
        return Err(AnalyticsError::NonFinite);
    }
    let d = Decimal::from_f64(value).ok_or(AnalyticsError::NonFinite)?;
    Ok(d.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entity(id: &str, rate: f64) -> Entity {
        Entity {
            id: EntityId::new(id),
            name: format!("Project {id}"),
            category: "music".to_string(),
            annual_growth_rate_percent: rate,
            current_value: None,
        }
    }

    #[test]
    fn window_order_is_enforced() {
        let a = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(validate_window(a, b).is_ok());
        assert!(validate_window(a, a).is_ok());
        assert_eq!(
            validate_window(b, a),
            Err(AnalyticsError::InvalidRange { start: b, end: a })
        );
    }

    #[test]
    fn growth_rate_floor() {
        assert!(validate_entity(&entity("p1", -99.9)).is_ok());
        assert!(validate_entity(&entity("p1", -100.0)).is_err());
        assert!(validate_entity(&entity("p1", -150.0)).is_err());
        assert!(validate_entity(&entity("p1", f64::NAN)).is_err());
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(to_money(12.345678).unwrap(), Decimal::new(1235, 2));
        assert_eq!(to_money(-0.004).unwrap(), Decimal::ZERO);
        assert_eq!(to_money(f64::INFINITY), Err(AnalyticsError::NonFinite));
    }

    #[test]
    fn entity_values_deserialize_recomputes_total() {
        let json = r#"{"per_entity":{"a":"1.50","b":"2.25"},"total":"999"}"#;
        let v: EntityValues = serde_json::from_str(json).unwrap();
        assert_eq!(v.total(), Decimal::new(375, 2));
    }

    #[test]
    fn overflowing_add_is_rejected_without_mutation() {
        let big = Decimal::from_f64(5e28).unwrap();
        let mut v = EntityValues::new();
        v.add(EntityId::new("a"), big).unwrap();
        assert_eq!(v.add(EntityId::new("b"), big), Err(AnalyticsError::NonFinite));
        assert_eq!(v.total(), big);
        assert_eq!(v.get(&EntityId::new("b")), Decimal::ZERO);

        let mut other = EntityValues::new();
        other.add(EntityId::new("a"), big).unwrap();
        assert_eq!(v.merge(&other), Err(AnalyticsError::NonFinite));
    }

    #[test]
    fn overflowing_payload_fails_to_deserialize() {
        let json = r#"{"per_entity":{"a":"50000000000000000000000000000","b":"50000000000000000000000000000"}}"#;
        assert!(serde_json::from_str::<EntityValues>(json).is_err());
    }

    #[test]
    fn bucket_serializes_start_as_date() {
        let b = Bucket::empty(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), Granularity::Month);
        let text = serde_json::to_string(&b).unwrap();
        assert!(text.contains(r#""date":"2025-04-01""#));
        let back: Bucket = serde_json::from_str(&text).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn serde_roundtrip_entity() {
        let e = entity("p7", 12.0);
        let s = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&s).unwrap();
        assert_eq!(back.id, EntityId::new("p7"));
        assert_eq!(back.current_value, None);
    }

    proptest! {
        #[test]
        fn entity_values_total_matches_sum(cents in proptest::collection::vec((0usize..5, -100_000i64..100_000), 0..40)) {
            let mut v = EntityValues::new();
            for (idx, c) in &cents {
                v.add(EntityId(format!("e{idx}")), Decimal::new(*c, 2)).unwrap();
            }
            let sum: Decimal = v.per_entity().values().copied().sum();
            prop_assert_eq!(v.total(), sum);

            let mut merged = EntityValues::new();
            merged.merge(&v).unwrap();
            merged.merge(&v).unwrap();
            prop_assert_eq!(merged.total(), sum * Decimal::from(2));
        }
    }
}
