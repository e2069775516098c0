//! Lifestyle Insights - On-device analytics engine for daily lifestyle records
//!
//! Insights turns a snapshot of user-entered daily records into three views:
//! factor correlations with happiness and stress, per-day composition of
//! lifestyle metrics, and fixed-bin distributions of a single factor.
//!
//! ## Modules
//!
//! - **Catalog**: Built-in and user-defined factors and their display layout
//! - **Correlation**: Pearson and point-biserial coefficients per factor
//! - **Composition**: Three-pass normalization into per-day proportions
//! - **Distribution**: Equal-width histograms with midpoint labels

pub mod catalog;
pub mod composition;
pub mod config;
pub mod correlation;
pub mod distribution;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod pipeline;
pub mod series;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use catalog::{BinningSpec, BuiltinFactor, FactorCatalog, FactorRef};
pub use composition::{CompositionNormalizer, MetricSpec, NormalizationRule};
pub use config::AnalyticsConfig;
pub use correlation::{CorrelationEngine, DEFAULT_MIN_SAMPLES};
pub use distribution::{factor_histogram, histogram};
pub use error::AnalyticsError;
pub use extractor::FactorExtractor;
pub use ingest::{RecordAdapter, ValidationError};
pub use pipeline::{records_to_insights, InsightsProcessor};
pub use series::daily_series;
pub use types::{
    CompositionFrame, CorrelationResult, DailyPoint, DailyRecord, Histogram, InsightsReport,
};

/// Engine version embedded in every report
pub const INSIGHTS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "lifestyle-insights";
