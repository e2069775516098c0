//! Fixed-bin distributions
//!
//! Bins one factor's valid readings into equal-width bins over `[0, domain_max]`.
//! Readings at or above `domain_max` land in the last bin.

use crate::catalog::{BinningSpec, FactorCatalog, FactorRef};
use crate::error::AnalyticsError;
use crate::extractor::FactorExtractor;
use crate::types::{DailyRecord, Histogram};

/// Bin a sequence of readings; `None`, NaN, infinite and negative readings are skipped
pub fn histogram<I>(
    values: I,
    bin_count: usize,
    domain_max: f64,
    decimal_places: usize,
) -> Result<Histogram, AnalyticsError>
where
    I: IntoIterator<Item = Option<f64>>,
{
    if bin_count == 0 {
        return Err(AnalyticsError::InvalidBinning(
            "bin count must be at least 1".to_string(),
        ));
    }
    if !domain_max.is_finite() || domain_max <= 0.0 {
        return Err(AnalyticsError::InvalidBinning(format!(
            "domain max must be positive and finite, got {}",
            domain_max
        )));
    }

    let bin_width = domain_max / bin_count as f64;
    let mut counts = vec![0u32; bin_count];

    for value in values.into_iter().flatten() {
        if !value.is_finite() || value < 0.0 {
            continue;
        }
        let index = ((value / bin_width).floor() as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    let labels = (0..bin_count)
        .map(|i| {
            let midpoint = i as f64 * bin_width + bin_width / 2.0;
            format!("{:.*}", decimal_places, midpoint)
        })
        .collect();
    let total = counts.iter().sum();

    Ok(Histogram {
        factor_id: None,
        labels,
        counts,
        total,
    })
}

/// Bin a factor across a record snapshot with an explicit layout
pub fn factor_histogram_with(
    records: &[DailyRecord],
    catalog: &FactorCatalog,
    factor: &FactorRef,
    spec: BinningSpec,
) -> Result<Histogram, AnalyticsError> {
    let extractor = FactorExtractor::new(catalog);
    let values = records
        .iter()
        .map(|record| extractor.value(record, factor).as_f64());

    let mut result = histogram(values, spec.bin_count, spec.domain_max, spec.decimal_places)?;
    result.factor_id = Some(catalog.id(factor).to_string());
    Ok(result)
}

/// Bin a factor using the catalog's layout for it
pub fn factor_histogram(
    records: &[DailyRecord],
    catalog: &FactorCatalog,
    factor: &FactorRef,
) -> Result<Histogram, AnalyticsError> {
    let spec = catalog
        .binning(factor)
        .ok_or_else(|| AnalyticsError::UnsupportedFactor(catalog.id(factor).to_string()))?;
    factor_histogram_with(records, catalog, factor, spec)
}
