//! Engine configuration
//!
//! All fields have defaults, so an empty JSON object is a valid configuration.

use crate::catalog::BinningSpec;
use crate::composition::{lifestyle_metrics, validate_metrics, MetricSpec};
use crate::correlation::DEFAULT_MIN_SAMPLES;
use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunables for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Minimum valid pairs per (factor, target) correlation
    pub min_samples: usize,
    /// Ordered composition metrics; the last absorbs the rounding residual
    pub composition_metrics: Vec<MetricSpec>,
    /// Histogram layouts replacing the catalog default, keyed by factor id
    pub histogram_overrides: BTreeMap<String, BinningSpec>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            composition_metrics: lifestyle_metrics(),
            histogram_overrides: BTreeMap::new(),
        }
    }
}

impl AnalyticsConfig {
    /// Check the configuration for contract violations
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.min_samples < 2 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "min_samples must be at least 2, got {}",
                self.min_samples
            )));
        }

        validate_metrics(&self.composition_metrics)?;

        for (factor_id, spec) in &self.histogram_overrides {
            if spec.bin_count == 0 || !spec.domain_max.is_finite() || spec.domain_max <= 0.0 {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "histogram override for {} needs bins >= 1 and a positive domain max",
                    factor_id
                )));
            }
        }

        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
