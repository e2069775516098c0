//! Pipeline orchestration
//!
//! This module provides the public API for Lifestyle Insights. It runs the
//! three analyses over one record snapshot and assembles a single report.

use crate::catalog::{FactorCatalog, FactorRef};
use crate::composition::CompositionNormalizer;
use crate::config::AnalyticsConfig;
use crate::correlation::{rank_by_strength, CorrelationEngine};
use crate::distribution::{factor_histogram, factor_histogram_with};
use crate::error::AnalyticsError;
use crate::ingest::RecordAdapter;
use crate::series::daily_series;
use crate::types::{
    CompositionFrame, CorrelationResult, DailyPoint, DailyRecord, Histogram, InsightsReport,
    ReportProducer, Target,
};
use crate::{INSIGHTS_VERSION, PRODUCER_NAME};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

/// Convert a JSON array (or NDJSON) of daily records into an insights report.
///
/// # Arguments
/// * `raw_json` - Records as a JSON array or newline-delimited JSON
///
/// # Returns
/// The report serialized as JSON
///
/// # Example
/// ```ignore
/// let report_json = records_to_insights(records_json)?;
/// ```
pub fn records_to_insights(raw_json: String) -> Result<String, AnalyticsError> {
    InsightsProcessor::new().analyze_json(&raw_json)
}

/// Runs every analysis with one configuration.
///
/// Holds no per-snapshot state; each call builds its own catalog.
pub struct InsightsProcessor {
    config: AnalyticsConfig,
    normalizer: CompositionNormalizer,
    instance_id: String,
}

impl Default for InsightsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsProcessor {
    /// Create a processor with default settings
    pub fn new() -> Self {
        Self {
            config: AnalyticsConfig::default(),
            normalizer: CompositionNormalizer::default(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: AnalyticsConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let normalizer = CompositionNormalizer::new(config.composition_metrics.clone())?;
        Ok(Self {
            config,
            normalizer,
            instance_id: Uuid::new_v4().to_string(),
        })
    }

    /// Correlations ranked by the strength of their happiness correlation
    pub fn correlations(&self, records: &[DailyRecord]) -> Vec<CorrelationResult> {
        let catalog = FactorCatalog::build(records);
        let results = CorrelationEngine::new(self.config.min_samples).correlate(records, &catalog);
        rank_by_strength(results, Target::Happiness)
    }

    /// Daily composition frames in date order
    pub fn composition(&self, records: &[DailyRecord]) -> Vec<CompositionFrame> {
        let catalog = FactorCatalog::build(records);
        self.normalizer.compose_daily(records, &catalog)
    }

    /// Histogram of one factor by id
    pub fn histogram(
        &self,
        records: &[DailyRecord],
        factor_id: &str,
    ) -> Result<Histogram, AnalyticsError> {
        let catalog = FactorCatalog::build(records);
        let factor = resolve(&catalog, factor_id)?;
        self.histogram_for(records, &catalog, &factor)
    }

    /// Daily series of one factor by id
    pub fn series(
        &self,
        records: &[DailyRecord],
        factor_id: &str,
    ) -> Result<Vec<DailyPoint>, AnalyticsError> {
        let catalog = FactorCatalog::build(records);
        let factor = resolve(&catalog, factor_id)?;
        Ok(daily_series(records, &catalog, &factor))
    }

    /// Run every analysis over the snapshot
    pub fn analyze(&self, records: &[DailyRecord]) -> InsightsReport {
        let catalog = FactorCatalog::build(records);

        let correlations = rank_by_strength(
            CorrelationEngine::new(self.config.min_samples).correlate(records, &catalog),
            Target::Happiness,
        );
        let composition = self.normalizer.compose_daily(records, &catalog);
        let histograms: Vec<Histogram> = catalog
            .factors()
            .iter()
            .filter(|factor| catalog.binning(factor).is_some())
            .filter_map(|factor| self.histogram_for(records, &catalog, factor).ok())
            .collect();

        let day_count = records
            .iter()
            .map(DailyRecord::day)
            .collect::<BTreeSet<_>>()
            .len();

        info!(
            records = records.len(),
            days = day_count,
            correlations = correlations.len(),
            histograms = histograms.len(),
            "analyzed record snapshot"
        );

        InsightsReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: INSIGHTS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            record_count: records.len(),
            day_count,
            correlations,
            composition,
            histograms,
        }
    }

    /// Parse, validate and analyze serialized records, returning the report as JSON
    pub fn analyze_json(&self, raw: &str) -> Result<String, AnalyticsError> {
        let records = RecordAdapter::parse_auto(raw)?;
        RecordAdapter::ensure_valid(&records)?;

        let report = self.analyze(&records);
        serde_json::to_string(&report).map_err(|e| AnalyticsError::EncodingError(e.to_string()))
    }

    fn histogram_for(
        &self,
        records: &[DailyRecord],
        catalog: &FactorCatalog,
        factor: &FactorRef,
    ) -> Result<Histogram, AnalyticsError> {
        match self.config.histogram_overrides.get(catalog.id(factor)) {
            Some(spec) => factor_histogram_with(records, catalog, factor, *spec),
            None => factor_histogram(records, catalog, factor),
        }
    }
}

fn resolve(catalog: &FactorCatalog, factor_id: &str) -> Result<FactorRef, AnalyticsError> {
    catalog
        .resolve(factor_id)
        .ok_or_else(|| AnalyticsError::UnknownFactor(factor_id.to_string()))
}
