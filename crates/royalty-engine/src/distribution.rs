//! Percentage-of-total breakdowns.

use royalty_core::{to_money, AnalyticsError, DistributionSlice, Entity, EntityValues, WeightedValue};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 100% expressed in hundredths of a percent.
const HUNDREDTHS: i64 = 10_000;
/// Bound on a single share before the integer conversion.
const MAX_HUNDREDTHS: f64 = 1e15;

/// Output ordering of slices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceOrder {
    /// Keep the caller's order.
    #[default]
    Input,
    /// Largest value first; ties keep input order.
    ByValueDesc,
}

/// Share of each value in the sum, as a percentage with 2 decimal places.
///
/// Shares are apportioned in hundredths of a percent by largest remainder:
/// every slice is floored, then the leftover hundredths go to the slices
/// with the largest fractional parts (earlier slices win ties). One
/// distribution therefore sums to exactly 100.00 and each slice is within
/// 0.01 of its exact share. A zero sum yields 0% everywhere.
pub fn distribute(
    slices: &[WeightedValue],
    order: SliceOrder,
) -> Result<Vec<DistributionSlice>, AnalyticsError> {
    if slices.iter().any(|s| !s.value.is_finite()) {
        return Err(AnalyticsError::NonFinite);
    }
    let sum: f64 = slices.iter().map(|s| s.value).sum();
    if !sum.is_finite() {
        return Err(AnalyticsError::NonFinite);
    }
    let hundredths = if sum == 0.0 {
        vec![0; slices.len()]
    } else {
        apportion(slices, sum)?
    };
    let mut out = slices
        .iter()
        .zip(hundredths)
        .map(|(s, h)| -> Result<DistributionSlice, AnalyticsError> {
            Ok(DistributionSlice {
                label: s.label.clone(),
                value: to_money(s.value)?,
                percentage: Decimal::new(h, 2),
            })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;
    if order == SliceOrder::ByValueDesc {
        out.sort_by(|a, b| b.value.cmp(&a.value));
    }
    Ok(out)
}

/// Hamilton apportionment of 10 000 hundredths over `slices`.
fn apportion(slices: &[WeightedValue], sum: f64) -> Result<Vec<i64>, AnalyticsError> {
    let mut floors = Vec::with_capacity(slices.len());
    let mut remainders = Vec::with_capacity(slices.len());
    for s in slices {
        let exact = s.value * HUNDREDTHS as f64 / sum;
        if !exact.is_finite() || exact.abs() >= MAX_HUNDREDTHS {
            return Err(AnalyticsError::NonFinite);
        }
        let floor = exact.floor();
        floors.push(floor as i64);
        remainders.push(exact - floor);
    }

    let mut by_remainder: Vec<usize> = (0..slices.len()).collect();
    by_remainder.sort_by(|&a, &b| remainders[b].total_cmp(&remainders[a]));

    // Float error can leave the floors a unit off in either direction.
    let leftover = HUNDREDTHS - floors.iter().sum::<i64>();
    let n = by_remainder.len();
    for k in 0..leftover.unsigned_abs() as usize {
        if leftover > 0 {
            floors[by_remainder[k % n]] += 1;
        } else {
            floors[by_remainder[n - 1 - k % n]] -= 1;
        }
    }
    Ok(floors)
}

/// Category breakdown of per-entity totals, categories in first-seen order.
pub fn by_category(
    entities: &[Entity],
    totals: &EntityValues,
) -> Result<Vec<DistributionSlice>, AnalyticsError> {
    let mut weights: Vec<WeightedValue> = Vec::new();
    for e in entities {
        let v = totals.get(&e.id).to_f64().ok_or(AnalyticsError::NonFinite)?;
        match weights.iter_mut().find(|w| w.label == e.category) {
            Some(w) => w.value += v,
            None => weights.push(WeightedValue::new(e.category.clone(), v)),
        }
    }
    distribute(&weights, SliceOrder::Input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use royalty_core::EntityId;

    #[test]
    fn platform_split() {
        let out = distribute(
            &[
                WeightedValue::new("Spotify", 600.0),
                WeightedValue::new("Apple Music", 300.0),
                WeightedValue::new("YouTube", 100.0),
            ],
            SliceOrder::Input,
        )
        .unwrap();
        let pcts: Vec<Decimal> = out.iter().map(|s| s.percentage).collect();
        assert_eq!(pcts, vec![Decimal::new(60, 0), Decimal::new(30, 0), Decimal::new(10, 0)]);
        assert_eq!(out[0].label, "Spotify");
    }

    #[test]
    fn zero_sum_is_all_zero() {
        let out = distribute(
            &[WeightedValue::new("US", 0.0), WeightedValue::new("EU", 0.0)],
            SliceOrder::Input,
        )
        .unwrap();
        assert!(out.iter().all(|s| s.percentage == Decimal::ZERO));
        assert!(distribute(&[], SliceOrder::Input).unwrap().is_empty());
    }

    #[test]
    fn sort_is_opt_in() {
        let input = [
            WeightedValue::new("small", 1.0),
            WeightedValue::new("big", 9.0),
        ];
        let kept = distribute(&input, SliceOrder::Input).unwrap();
        assert_eq!(kept[0].label, "small");
        let sorted = distribute(&input, SliceOrder::ByValueDesc).unwrap();
        assert_eq!(sorted[0].label, "big");
    }

    #[test]
    fn seven_equal_slices_sum_to_exactly_hundred() {
        let input: Vec<WeightedValue> = (0..7)
            .map(|i| WeightedValue::new(format!("t{i}"), 1.0))
            .collect();
        let out = distribute(&input, SliceOrder::Input).unwrap();
        let pcts: Vec<Decimal> = out.iter().map(|s| s.percentage).collect();
        let hi = Decimal::new(1429, 2);
        let lo = Decimal::new(1428, 2);
        assert_eq!(pcts, vec![hi, hi, hi, hi, lo, lo, lo]);
        assert_eq!(pcts.iter().copied().sum::<Decimal>(), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn leftover_goes_to_largest_remainder() {
        // Floors leave two hundredths; c (.95) and a (.68) take them.
        let out = distribute(
            &[
                WeightedValue::new("a", 1.0),
                WeightedValue::new("b", 2.0),
                WeightedValue::new("c", 2.999_94),
            ],
            SliceOrder::Input,
        )
        .unwrap();
        let total: Decimal = out.iter().map(|s| s.percentage).sum();
        assert_eq!(total, Decimal::ONE_HUNDRED);
        assert_eq!(out[0].percentage, Decimal::new(1667, 2));
    }

    #[test]
    fn nan_rejected() {
        assert_eq!(
            distribute(&[WeightedValue::new("x", f64::NAN)], SliceOrder::Input),
            Err(AnalyticsError::NonFinite)
        );
    }

    #[test]
    fn categories_merge_entities() {
        let mk = |id: &str, cat: &str| Entity {
            id: EntityId::new(id),
            name: id.into(),
            category: cat.into(),
            annual_growth_rate_percent: 0.0,
            current_value: None,
        };
        let entities = vec![mk("a", "music"), mk("b", "film"), mk("c", "music")];
        let mut totals = EntityValues::new();
        totals.add(EntityId::new("a"), Decimal::new(100, 0)).unwrap();
        totals.add(EntityId::new("b"), Decimal::new(100, 0)).unwrap();
        totals.add(EntityId::new("c"), Decimal::new(200, 0)).unwrap();
        let out = by_category(&entities, &totals).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, "music");
        assert_eq!(out[0].percentage, Decimal::new(75, 0));
        assert_eq!(out[1].percentage, Decimal::new(25, 0));
    }

    proptest! {
        #[test]
        fn percentages_sum_to_hundred(values in proptest::collection::vec(0.0f64..1e6, 1..50)) {
            let input: Vec<WeightedValue> = values
                .iter()
                .enumerate()
                .map(|(i, v)| WeightedValue::new(format!("s{i}"), *v))
                .collect();
            let out = distribute(&input, SliceOrder::Input).unwrap();
            let total: Decimal = out.iter().map(|s| s.percentage).sum();
            let sum: f64 = values.iter().sum();
            if sum > 0.0 {
                prop_assert_eq!(total, Decimal::ONE_HUNDRED);
                for (slice, v) in out.iter().zip(&values) {
                    let exact = v / sum * 100.0;
                    prop_assert!((slice.percentage.to_f64().unwrap() - exact).abs() <= 0.01 + 1e-9);
                }
            } else {
                prop_assert_eq!(total, Decimal::ZERO);
            }
        }

        #[test]
        fn equal_slices_always_balance(n in 1usize..60) {
            let input: Vec<WeightedValue> = (0..n)
                .map(|i| WeightedValue::new(format!("s{i}"), 3.0))
                .collect();
            let out = distribute(&input, SliceOrder::Input).unwrap();
            let total: Decimal = out.iter().map(|s| s.percentage).sum();
            prop_assert_eq!(total, Decimal::ONE_HUNDRED);
        }
    }
}
