//! Daily factor series
//!
//! Collapses a factor onto one point per calendar day for time-series display.
//! Numeric readings are averaged. Boolean readings are averaged and the mean
//! rounded to 0/1; the unrounded share is kept in `true_fraction` because the
//! rounding hides mixed days (2 of 5 entries true reads as 0).

use crate::catalog::{FactorCatalog, FactorRef};
use crate::extractor::FactorExtractor;
use crate::types::{DailyPoint, DailyRecord, FactorKind};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One point per day present in `records`, ascending by date
pub fn daily_series(
    records: &[DailyRecord],
    catalog: &FactorCatalog,
    factor: &FactorRef,
) -> Vec<DailyPoint> {
    let extractor = FactorExtractor::new(catalog);
    let kind = catalog.kind(factor);

    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for record in records {
        let readings = by_day.entry(record.day()).or_default();
        if let Some(v) = extractor.value(record, factor).as_f64() {
            readings.push(v);
        }
    }

    by_day
        .into_iter()
        .map(|(date, readings)| {
            let samples = readings.len();
            let mean = if samples > 0 {
                Some(readings.iter().sum::<f64>() / samples as f64)
            } else {
                None
            };

            match kind {
                FactorKind::Numeric => DailyPoint {
                    date,
                    value: mean,
                    samples,
                    true_fraction: None,
                },
                FactorKind::Boolean => DailyPoint {
                    date,
                    value: mean.map(f64::round),
                    samples,
                    true_fraction: mean,
                },
            }
        })
        .collect()
}
