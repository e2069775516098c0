//! Factor/target correlation
//!
//! This module estimates how each factor moves with the two targets:
//! - Pearson correlation for numeric factors
//! - Point-biserial correlation for boolean factors
//!
//! Every (factor, target) pair is gated independently. Short samples,
//! degenerate variance and non-finite results are dropped without error.

use crate::catalog::{FactorCatalog, FactorRef};
use crate::extractor::FactorExtractor;
use crate::types::{CorrelationResult, DailyRecord, FactorKind, FactorValue, Target};
use std::cmp::Ordering;
use tracing::{debug, trace};

/// Default minimum number of valid pairs per (factor, target)
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// A single (factor, target) estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub r: f64,
    pub samples: usize,
}

/// Correlation engine over one record snapshot
#[derive(Debug, Clone, Copy)]
pub struct CorrelationEngine {
    min_samples: usize,
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAMPLES)
    }
}

impl CorrelationEngine {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// Correlate every correlatable factor in the catalog with both targets.
    ///
    /// A result is emitted when the happiness correlation exists; the stress
    /// correlation is attached when it exists on its own. Output follows
    /// catalog discovery order.
    pub fn correlate(
        &self,
        records: &[DailyRecord],
        catalog: &FactorCatalog,
    ) -> Vec<CorrelationResult> {
        let extractor = FactorExtractor::new(catalog);
        let mut results = Vec::new();

        for factor in catalog.correlatable() {
            let happiness = self.estimate(records, &extractor, &factor, Target::Happiness);
            let stress = self.estimate(records, &extractor, &factor, Target::Stress);

            let Some(happiness) = happiness else {
                continue;
            };

            results.push(CorrelationResult {
                factor_id: catalog.id(&factor).to_string(),
                display_name: catalog.display_name(&factor),
                kind: catalog.kind(&factor),
                correlation_with_happiness: happiness.r,
                correlation_with_stress: stress.map(|s| s.r),
                happiness_samples: happiness.samples,
                stress_samples: stress.map(|s| s.samples),
            });
        }

        debug!(
            factors = results.len(),
            records = records.len(),
            "computed correlations"
        );

        results
    }

    /// Estimate the correlation of one factor with one target
    pub fn estimate(
        &self,
        records: &[DailyRecord],
        extractor: &FactorExtractor<'_>,
        factor: &FactorRef,
        target: Target,
    ) -> Option<Estimate> {
        let catalog = extractor.catalog();
        let factor_id = catalog.id(factor);

        let pairs: Vec<(FactorValue, f64)> = records
            .iter()
            .filter_map(|record| {
                let x = extractor.value(record, factor);
                let y = extractor.target(record, target).as_f64()?;
                if x.is_missing() {
                    return None;
                }
                Some((x, y))
            })
            .collect();

        if pairs.len() < self.min_samples {
            trace!(
                factor = factor_id,
                target = target.as_str(),
                samples = pairs.len(),
                "insufficient sample"
            );
            return None;
        }

        let r = match catalog.kind(factor) {
            FactorKind::Numeric => {
                let (xs, ys): (Vec<f64>, Vec<f64>) = pairs
                    .iter()
                    .filter_map(|(x, y)| x.as_f64().map(|x| (x, *y)))
                    .unzip();
                if !has_variance(&xs) {
                    trace!(factor = factor_id, "zero factor variance");
                    return None;
                }
                pearson(&xs, &ys)
            }
            FactorKind::Boolean => {
                let (flags, ys): (Vec<bool>, Vec<f64>) = pairs
                    .iter()
                    .filter_map(|(x, y)| match x {
                        FactorValue::Boolean(b) => Some((*b, *y)),
                        _ => None,
                    })
                    .unzip();
                point_biserial(&flags, &ys)
            }
        };

        match r.and_then(finite_correlation) {
            Some(r) => Some(Estimate {
                r,
                samples: pairs.len(),
            }),
            None => {
                trace!(
                    factor = factor_id,
                    target = target.as_str(),
                    "degenerate or non-finite correlation"
                );
                None
            }
        }
    }
}

/// Pearson correlation coefficient
///
/// Formula: `(nΣxy − ΣxΣy) / sqrt((nΣx² − (Σx)²)(nΣy² − (Σy)²))`
///
/// Returns `None` for mismatched or empty inputs and a zero denominator.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.is_empty() {
        return None;
    }

    let n = xs.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
        syy += y * y;
    }

    let numerator = n * sxy - sx * sy;
    let spread = (n * sxx - sx * sx) * (n * syy - sy * sy);
    if spread <= 0.0 {
        return None;
    }

    Some(numerator / spread.sqrt())
}

/// Point-biserial correlation between a binary and a continuous sample
///
/// Formula: `(mean(y|true) − mean(y|false)) · sqrt(p·q) / s_y`
/// Where `p` is the share of `true`, `q = 1 − p`, and `s_y` is the sample
/// standard deviation (n − 1) of `y`.
///
/// Returns `None` unless both classes are present and `s_y > 0`.
pub fn point_biserial(flags: &[bool], ys: &[f64]) -> Option<f64> {
    if flags.len() != ys.len() || ys.len() < 2 {
        return None;
    }

    let (mut n1, mut sum1, mut sum0) = (0usize, 0.0, 0.0);
    for (&flag, &y) in flags.iter().zip(ys) {
        if flag {
            n1 += 1;
            sum1 += y;
        } else {
            sum0 += y;
        }
    }
    let n = ys.len();
    let n0 = n - n1;
    if n1 == 0 || n0 == 0 {
        return None;
    }

    let mean1 = sum1 / n1 as f64;
    let mean0 = sum0 / n0 as f64;
    let mean = ys.iter().sum::<f64>() / n as f64;
    let variance = ys.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }

    let p = n1 as f64 / n as f64;
    let q = 1.0 - p;
    Some((mean1 - mean0) * (p * q).sqrt() / std_dev)
}

/// Rank results by |r| against `target`, strongest first.
///
/// The sort is stable, so ties keep discovery order. Results without a
/// correlation for `target` go last.
pub fn rank_by_strength(
    mut results: Vec<CorrelationResult>,
    target: Target,
) -> Vec<CorrelationResult> {
    results.sort_by(|a, b| {
        match (a.correlation(target), b.correlation(target)) {
            (Some(ra), Some(rb)) => rb.abs().total_cmp(&ra.abs()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    results
}

fn has_variance(xs: &[f64]) -> bool {
    match xs.first() {
        Some(first) => xs.iter().any(|x| x != first),
        None => false,
    }
}

/// Drop non-finite estimates and absorb floating error past ±1
fn finite_correlation(r: f64) -> Option<f64> {
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinFactor;
    use crate::types::{CategoryKind, CustomCategoryValue};
    use chrono::{Duration, TimeZone, Utc};

    fn day(i: usize) -> DailyRecord {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(i as i64);
        DailyRecord::new(format!("r{i}"), date)
    }

    fn sleep_records(sleep: &[f64], happiness: &[f64]) -> Vec<DailyRecord> {
        sleep
            .iter()
            .zip(happiness)
            .enumerate()
            .map(|(i, (s, h))| {
                let mut record = day(i);
                record.sleep_hours = Some(*s);
                record.happiness = Some(*h);
                record
            })
            .collect()
    }

    fn find<'a>(results: &'a [CorrelationResult], id: &str) -> Option<&'a CorrelationResult> {
        results.iter().find(|r| r.factor_id == id)
    }

    #[test]
    fn test_sleep_tracks_happiness() {
        let records = sleep_records(
            &[4.0, 5.0, 6.0, 7.0, 8.0, 8.0, 8.0, 9.0, 10.0, 12.0],
            &[3.0, 4.0, 4.0, 5.0, 6.0, 6.0, 7.0, 7.0, 8.0, 9.0],
        );
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        let sleep = find(&results, "sleep_hours").unwrap();
        assert!(sleep.correlation_with_happiness > 0.8);
        assert_eq!(sleep.happiness_samples, 10);
        assert_eq!(sleep.kind, FactorKind::Numeric);
        // No stress readings at all
        assert_eq!(sleep.correlation_with_stress, None);
        assert_eq!(sleep.stress_samples, None);
    }

    #[test]
    fn test_exercise_point_biserial_positive() {
        let happiness = [7.0, 8.0, 7.0, 8.0, 7.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let records: Vec<DailyRecord> = happiness
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let mut record = day(i);
                record.exercise = i < 5;
                record.happiness = Some(*h);
                record
            })
            .collect();
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        let exercise = find(&results, "exercise").unwrap();
        assert_eq!(exercise.kind, FactorKind::Boolean);
        assert!(exercise.correlation_with_happiness > 0.0);
        assert!(exercise.correlation_with_happiness <= 1.0);
    }

    #[test]
    fn test_insufficient_sample_is_absent() {
        let records = sleep_records(&[5.0, 6.0, 7.0, 8.0], &[4.0, 5.0, 6.0, 8.0]);
        let catalog = FactorCatalog::build(&records);

        let results = CorrelationEngine::default().correlate(&records, &catalog);
        assert!(find(&results, "sleep_hours").is_none());

        let results = CorrelationEngine::new(4).correlate(&records, &catalog);
        assert!(find(&results, "sleep_hours").is_some());
    }

    #[test]
    fn test_zero_variance_factor_is_absent() {
        let records = sleep_records(&[7.0; 8], &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 2.0]);
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        assert!(find(&results, "sleep_hours").is_none());
        // Meditation is false everywhere, a single class
        assert!(find(&results, "meditation").is_none());
    }

    #[test]
    fn test_constant_target_is_absent() {
        let records = sleep_records(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], &[6.0; 6]);
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        assert!(results.is_empty());
    }

    #[test]
    fn test_boolean_with_constant_target_is_absent() {
        let records: Vec<DailyRecord> = (0..8)
            .map(|i| {
                let mut record = day(i);
                record.exercise = i % 2 == 0;
                record.happiness = Some(6.0);
                record
            })
            .collect();
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        assert!(find(&results, "exercise").is_none());
        assert!(results.is_empty());
        assert_eq!(point_biserial(&[true, false, true, false], &[6.0; 4]), None);
    }

    #[test]
    fn test_overflowing_readings_are_absent() {
        let sleep: Vec<f64> = (0..8).map(|i| 1e200 * (i + 1) as f64).collect();
        let records = sleep_records(&sleep, &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 2.0]);
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        assert!(find(&results, "sleep_hours").is_none());
    }

    #[test]
    fn test_targets_are_gated_independently() {
        let mut records = sleep_records(
            &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            &[3.0, 4.0, 5.0, 6.0, 7.0, 9.0],
        );
        for (i, record) in records.iter_mut().enumerate() {
            record.stress_level = if i < 3 { Some(8.0 - i as f64) } else { None };
        }
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        let sleep = find(&results, "sleep_hours").unwrap();
        assert!(sleep.correlation_with_happiness > 0.9);
        assert!(sleep.correlation_with_stress.is_none());

        let results = CorrelationEngine::new(3).correlate(&records, &catalog);
        let sleep = find(&results, "sleep_hours").unwrap();
        assert!(sleep.correlation_with_stress.unwrap() < -0.99);
        assert_eq!(sleep.stress_samples, Some(3));
    }

    #[test]
    fn test_missing_values_are_dropped_per_pair() {
        let mut records = sleep_records(
            &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        );
        records[1].sleep_hours = Some(f64::NAN);
        records[2].happiness = None;
        records[3].sleep_hours = Some(-2.0);
        let catalog = FactorCatalog::build(&records);

        let results = CorrelationEngine::new(3).correlate(&records, &catalog);
        let sleep = find(&results, "sleep_hours").unwrap();
        assert_eq!(sleep.happiness_samples, 4);
        assert!((sleep.correlation_with_happiness - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_boolean_absent_reads_false() {
        let happiness = [8.0, 9.0, 8.0, 4.0, 5.0, 4.0];
        let records: Vec<DailyRecord> = happiness
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let mut record = day(i);
                record.happiness = Some(*h);
                if i < 3 {
                    record.custom_values.push(CustomCategoryValue {
                        category_id: "journal".to_string(),
                        name: Some("Journaling".to_string()),
                        value: Some(1.0),
                        kind: CategoryKind::Boolean,
                    });
                }
                record
            })
            .collect();
        let catalog = FactorCatalog::build(&records);
        let results = CorrelationEngine::default().correlate(&records, &catalog);

        let journal = find(&results, "journal").unwrap();
        assert_eq!(journal.display_name.as_deref(), Some("Journaling"));
        assert_eq!(journal.happiness_samples, 6);
        assert!(journal.correlation_with_happiness > 0.8);
    }

    #[test]
    fn test_pearson_is_symmetric() {
        let xs = [1.0, 2.5, 3.0, 4.5, 7.0, 7.5];
        let ys = [2.0, 2.0, 3.5, 6.0, 6.5, 9.0];
        let a = pearson(&xs, &ys).unwrap();
        let b = pearson(&ys, &xs).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_estimators_stay_in_range() {
        // Perfect separation still stays below 1 with the n - 1 deviation
        let flags = [true, true, true, false, false, false];
        let ys = [10.0, 10.0, 10.0, 1.0, 1.0, 1.0];
        let r = point_biserial(&flags, &ys).unwrap();
        assert!(r > 0.9 && r <= 1.0);

        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);

        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(point_biserial(&[true, true], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_rank_by_strength_is_stable() {
        let result = |id: &str, h: f64, s: Option<f64>| CorrelationResult {
            factor_id: id.to_string(),
            display_name: None,
            kind: FactorKind::Numeric,
            correlation_with_happiness: h,
            correlation_with_stress: s,
            happiness_samples: 5,
            stress_samples: s.map(|_| 5),
        };
        let results = vec![
            result("a", 0.2, None),
            result("b", -0.7, Some(0.1)),
            result("c", 0.7, Some(-0.9)),
            result("d", 0.5, Some(0.3)),
        ];

        let by_happiness: Vec<String> = rank_by_strength(results.clone(), Target::Happiness)
            .into_iter()
            .map(|r| r.factor_id)
            .collect();
        assert_eq!(by_happiness, vec!["b", "c", "d", "a"]);

        let by_stress: Vec<String> = rank_by_strength(results, Target::Stress)
            .into_iter()
            .map(|r| r.factor_id)
            .collect();
        assert_eq!(by_stress, vec!["c", "d", "b", "a"]);
    }

    #[test]
    fn test_gated_amount_uses_zero_when_flag_cleared() {
        let records: Vec<DailyRecord> = (0..6)
            .map(|i| {
                let mut record = day(i);
                record.alcohol = i % 2 == 0;
                // Stale amounts linger on days without alcohol
                record.alcohol_units = Some(3.0);
                record.happiness = Some(if i % 2 == 0 { 4.0 } else { 7.0 });
                record
            })
            .collect();
        let catalog = FactorCatalog::build(&records);
        let engine = CorrelationEngine::default();
        let extractor = FactorExtractor::new(&catalog);
        let estimate = engine
            .estimate(
                &records,
                &extractor,
                &FactorRef::Builtin(BuiltinFactor::AlcoholUnits),
                Target::Happiness,
            )
            .unwrap();

        assert!((estimate.r + 1.0).abs() < 1e-9);
    }
}
