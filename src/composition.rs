//! Daily composition of lifestyle metrics
//!
//! Turns incommensurate metrics (hours, minutes, 1-10 ratings) into one
//! per-day composition whose proportions sum to 1, for stacked display:
//! - Pass 1: per-record score on a 0-10 scale against a typical maximum
//! - Pass 2: per-metric rescale against the metric's own observed peak
//! - Pass 3: per-day division by the day's total
//!
//! Missing readings count as zero here, unlike in correlation.

use crate::catalog::FactorCatalog;
use crate::error::AnalyticsError;
use crate::extractor::FactorExtractor;
use crate::types::{CompositionFrame, DailyRecord, MetricProportion};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Tolerance on a composed day's total
pub const COMPOSITION_TOLERANCE: f64 = 1e-4;

/// Top of the pass-1 score range
const SCORE_CEILING: f64 = 10.0;

/// How a raw reading maps onto the 0-10 pass-1 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationRule {
    /// `clamp(v, 0, max) / max * 10`
    Linear,
    /// `(v - 1) / (max - 1) * 10` for 1-based rating scales
    Scale,
}

/// One metric of the composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub factor_id: String,
    pub typical_max: f64,
    pub rule: NormalizationRule,
}

impl MetricSpec {
    pub fn linear(factor_id: &str, typical_max: f64) -> Self {
        Self {
            factor_id: factor_id.to_string(),
            typical_max,
            rule: NormalizationRule::Linear,
        }
    }

    pub fn scale(factor_id: &str, typical_max: f64) -> Self {
        Self {
            factor_id: factor_id.to_string(),
            typical_max,
            rule: NormalizationRule::Scale,
        }
    }

    /// Pass-1 score of a raw reading, in `[0, 10]`
    pub fn score(&self, raw: Option<f64>) -> f64 {
        let value = match raw {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => return 0.0,
        };

        match self.rule {
            NormalizationRule::Linear => {
                value.clamp(0.0, self.typical_max) / self.typical_max * SCORE_CEILING
            }
            NormalizationRule::Scale => {
                ((value - 1.0) / (self.typical_max - 1.0) * SCORE_CEILING)
                    .clamp(0.0, SCORE_CEILING)
            }
        }
    }

    fn validate(&self) -> Result<(), AnalyticsError> {
        let minimum = match self.rule {
            NormalizationRule::Linear => 0.0,
            NormalizationRule::Scale => 1.0,
        };
        if !self.typical_max.is_finite() || self.typical_max <= minimum {
            return Err(AnalyticsError::InvalidConfig(format!(
                "metric {} needs a typical max above {}, got {}",
                self.factor_id, minimum, self.typical_max
            )));
        }
        Ok(())
    }
}

/// Default lifestyle metrics, in composition order.
///
/// The two targets are not part of the composition. The last entry absorbs
/// the floating-point residual of each composed day.
pub fn lifestyle_metrics() -> Vec<MetricSpec> {
    vec![
        MetricSpec::linear("sleep_hours", 12.0),
        MetricSpec::scale("sleep_quality", 10.0),
        MetricSpec::linear("exercise_minutes", 120.0),
        MetricSpec::linear("meditation_minutes", 60.0),
        MetricSpec::linear("social_hours", 12.0),
        MetricSpec::linear("work_hours", 14.0),
        MetricSpec::linear("meals", 6.0),
        MetricSpec::scale("food_quality", 10.0),
        MetricSpec::linear("alcohol_units", 10.0),
        MetricSpec::linear("substance_amount", 1.0),
    ]
}

/// Per-day metric values, rows in ascending date order and columns in metric order
#[derive(Debug, Clone, PartialEq)]
pub struct DailyScores {
    pub days: Vec<NaiveDate>,
    pub values: Vec<Vec<f64>>,
}

/// Composition normalizer over an explicit, ordered metric list
#[derive(Debug, Clone)]
pub struct CompositionNormalizer {
    metrics: Vec<MetricSpec>,
}

impl Default for CompositionNormalizer {
    fn default() -> Self {
        Self {
            metrics: lifestyle_metrics(),
        }
    }
}

impl CompositionNormalizer {
    /// Create a normalizer; the last metric takes the pass-3 residual
    pub fn new(metrics: Vec<MetricSpec>) -> Result<Self, AnalyticsError> {
        validate_metrics(&metrics)?;
        Ok(Self { metrics })
    }

    pub fn metrics(&self) -> &[MetricSpec] {
        &self.metrics
    }

    /// Compose every day present in `records`
    pub fn compose_daily(
        &self,
        records: &[DailyRecord],
        catalog: &FactorCatalog,
    ) -> Vec<CompositionFrame> {
        let mut scores = self.raw_scores(records, catalog);
        rescale(&mut scores);
        self.compose(&scores)
    }

    /// Pass 1: mean per-day score of each metric
    pub fn raw_scores(&self, records: &[DailyRecord], catalog: &FactorCatalog) -> DailyScores {
        let extractor = FactorExtractor::new(catalog);
        let factors: Vec<_> = self
            .metrics
            .iter()
            .map(|metric| {
                let factor = catalog.resolve(&metric.factor_id);
                if factor.is_none() {
                    debug!(metric = %metric.factor_id, "metric not in catalog, scoring as zero");
                }
                factor
            })
            .collect();

        let mut by_day: BTreeMap<NaiveDate, (Vec<f64>, usize)> = BTreeMap::new();
        for record in records {
            let (sums, count) = by_day
                .entry(record.day())
                .or_insert_with(|| (vec![0.0; self.metrics.len()], 0));
            *count += 1;

            for ((metric, factor), sum) in self.metrics.iter().zip(&factors).zip(sums.iter_mut()) {
                let raw = factor
                    .as_ref()
                    .and_then(|f| extractor.value(record, f).as_f64());
                *sum += metric.score(raw);
            }
        }

        let mut days = Vec::with_capacity(by_day.len());
        let mut values = Vec::with_capacity(by_day.len());
        for (date, (sums, count)) in by_day {
            days.push(date);
            values.push(sums.into_iter().map(|s| s / count as f64).collect());
        }

        DailyScores { days, values }
    }

    /// Pass 3: divide each day by its total; the last metric absorbs the residual
    fn compose(&self, scores: &DailyScores) -> Vec<CompositionFrame> {
        let last = self.metrics.len() - 1;

        scores
            .days
            .iter()
            .zip(&scores.values)
            .map(|(date, row)| {
                let total: f64 = row.iter().sum();
                let mut shares = vec![0.0; row.len()];
                let has_data = total > 0.0;

                if has_data {
                    for (share, value) in shares.iter_mut().zip(row) {
                        *share = value / total;
                    }
                    let residual = 1.0 - shares.iter().sum::<f64>();
                    shares[last] += residual;
                } else {
                    debug!(%date, "no lifestyle readings, leaving day empty");
                }

                CompositionFrame {
                    date: *date,
                    has_data,
                    proportions: self
                        .metrics
                        .iter()
                        .zip(shares)
                        .map(|(metric, proportion)| MetricProportion {
                            metric_id: metric.factor_id.clone(),
                            proportion,
                        })
                        .collect(),
                }
            })
            .collect()
    }
}

/// Pass 2: rescale each metric so its own peak day reads 1.0.
///
/// The floor is fixed at 0, so only a zero reading maps to 0. A metric that
/// never rose above 0 stays 0 on every day.
pub fn rescale(scores: &mut DailyScores) {
    let width = scores.values.first().map_or(0, Vec::len);

    for metric in 0..width {
        let observed_max = scores
            .values
            .iter()
            .map(|row| row[metric])
            .fold(0.0_f64, f64::max);

        for row in scores.values.iter_mut() {
            row[metric] = if observed_max > 0.0 {
                row[metric] / observed_max
            } else {
                0.0
            };
        }
    }
}

pub(crate) fn validate_metrics(metrics: &[MetricSpec]) -> Result<(), AnalyticsError> {
    if metrics.is_empty() {
        return Err(AnalyticsError::InvalidConfig(
            "composition needs at least one metric".to_string(),
        ));
    }
    metrics.iter().try_for_each(MetricSpec::validate)
}
