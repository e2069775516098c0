//! Core types for the Lifestyle Insights engine
//!
//! This module defines the data structures that flow through the engine: the
//! daily records handed in by the caller, the typed factor values extracted
//! from them, and the analytical results handed back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind tag carried by a user-defined category value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Numeric,
    Scale,
    Boolean,
}

/// One value of a user-defined category on a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCategoryValue {
    /// Stable identifier of the category
    pub category_id: String,
    /// Display name of the category, if the caller supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw numeric reading (booleans are encoded as 0/1)
    #[serde(default)]
    pub value: Option<f64>,
    /// Kind of the category
    pub kind: CategoryKind,
}

/// One logged day of lifestyle factors and subjective targets.
///
/// Multiple records may share a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Record identifier
    pub id: String,
    /// Calendar timestamp of the logged day
    #[serde(with = "calendar_date")]
    pub date: DateTime<Utc>,
    /// Hours slept
    pub sleep_hours: Option<f64>,
    /// Subjective sleep quality (1-10)
    pub sleep_quality: Option<f64>,
    /// Whether the user exercised
    pub exercise: bool,
    /// Minutes of exercise
    pub exercise_minutes: Option<f64>,
    /// Whether the user drank alcohol
    pub alcohol: bool,
    /// Units of alcohol
    pub alcohol_units: Option<f64>,
    /// Whether the user took the tracked second substance
    pub substance: bool,
    /// Amount of the second substance
    pub substance_amount: Option<f64>,
    /// Whether the user meditated
    pub meditation: bool,
    /// Minutes of meditation
    pub meditation_minutes: Option<f64>,
    /// Hours spent socializing
    pub social_hours: Option<f64>,
    /// Hours worked
    pub work_hours: Option<f64>,
    /// Number of meals
    pub meals: Option<f64>,
    /// Subjective food quality (1-10)
    pub food_quality: Option<f64>,
    /// Stress level (1-10)
    pub stress_level: Option<f64>,
    /// Happiness rating (1-10)
    pub happiness: Option<f64>,
    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Values of user-defined categories
    #[serde(default)]
    pub custom_values: Vec<CustomCategoryValue>,
}

impl DailyRecord {
    /// Create an empty record for the given day (all flags false, all readings null)
    pub fn new(id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            date,
            sleep_hours: None,
            sleep_quality: None,
            exercise: false,
            exercise_minutes: None,
            alcohol: false,
            alcohol_units: None,
            substance: false,
            substance_amount: None,
            meditation: false,
            meditation_minutes: None,
            social_hours: None,
            work_hours: None,
            meals: None,
            food_quality: None,
            stress_level: None,
            happiness: None,
            notes: None,
            custom_values: Vec::new(),
        }
    }

    /// Calendar day this record belongs to
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// First value logged for a custom category, if any
    pub fn custom_value(&self, category_id: &str) -> Option<&CustomCategoryValue> {
        self.custom_values
            .iter()
            .find(|v| v.category_id == category_id)
    }
}

/// Kind of a factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorKind {
    Numeric,
    Boolean,
}

/// Typed value of one factor on one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorValue {
    Numeric(f64),
    Boolean(bool),
    Missing,
}

impl FactorValue {
    /// Numeric view of the value (booleans coded 0/1), `None` when missing
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FactorValue::Numeric(v) => Some(v),
            FactorValue::Boolean(b) => Some(if b { 1.0 } else { 0.0 }),
            FactorValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FactorValue::Missing)
    }
}

/// Subjective outcome that factors are correlated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Happiness,
    Stress,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Happiness, Target::Stress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Happiness => "happiness",
            Target::Stress => "stress",
        }
    }
}

/// Correlation of one factor with both targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub factor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub kind: FactorKind,
    pub correlation_with_happiness: f64,
    pub correlation_with_stress: Option<f64>,
    /// Valid pairs behind the happiness correlation
    pub happiness_samples: usize,
    /// Valid pairs behind the stress correlation, when it exists
    pub stress_samples: Option<usize>,
}

impl CorrelationResult {
    /// Correlation with the given target, if computed
    pub fn correlation(&self, target: Target) -> Option<f64> {
        match target {
            Target::Happiness => Some(self.correlation_with_happiness),
            Target::Stress => self.correlation_with_stress,
        }
    }
}

/// Share of one metric within a day's composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricProportion {
    pub metric_id: String,
    pub proportion: f64,
}

/// Normalized composition of lifestyle metrics for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionFrame {
    pub date: NaiveDate,
    /// False when every metric read zero that day
    pub has_data: bool,
    /// Proportions in metric catalog order
    pub proportions: Vec<MetricProportion>,
}

impl CompositionFrame {
    pub fn total(&self) -> f64 {
        self.proportions.iter().map(|p| p.proportion).sum()
    }

    pub fn proportion(&self, metric_id: &str) -> Option<f64> {
        self.proportions
            .iter()
            .find(|p| p.metric_id == metric_id)
            .map(|p| p.proportion)
    }
}

/// Fixed-bin distribution of one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_id: Option<String>,
    /// Bin midpoint labels
    pub labels: Vec<String>,
    /// Bin counts, parallel to `labels`
    pub counts: Vec<u32>,
    /// Number of values that landed in a bin
    pub total: u32,
}

impl Histogram {
    pub fn bins(&self) -> impl Iterator<Item = (&str, u32)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.counts.iter().copied())
    }
}

/// One day of an aggregated factor series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Aggregated value, `None` when no valid reading that day
    pub value: Option<f64>,
    /// Number of valid readings behind `value`
    pub samples: usize,
    /// Unrounded share of `true` readings (boolean factors only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_fraction: Option<f64>,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete analytics report for one record snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsReport {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub record_count: usize,
    pub day_count: usize,
    /// Correlations ranked by strength of the happiness correlation
    pub correlations: Vec<CorrelationResult>,
    pub composition: Vec<CompositionFrame>,
    pub histograms: Vec<Histogram>,
}

/// Serde helpers accepting either an RFC 3339 timestamp or a bare `YYYY-MM-DD`
pub mod calendar_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Parse a calendar timestamp
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let trimmed = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("invalid date '{}'", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_deserializes_bare_date() {
        let json = r#"{
            "id": "r1",
            "date": "2024-03-02",
            "sleep_hours": 7.5,
            "sleep_quality": null,
            "exercise": true,
            "exercise_minutes": 30,
            "alcohol": false,
            "alcohol_units": null,
            "substance": false,
            "substance_amount": null,
            "meditation": false,
            "meditation_minutes": null,
            "social_hours": 2,
            "work_hours": 8,
            "meals": 3,
            "food_quality": 7,
            "stress_level": 4,
            "happiness": 7
        }"#;

        let record: DailyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.day(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(record.sleep_hours, Some(7.5));
        assert!(record.custom_values.is_empty());
    }

    #[test]
    fn test_record_deserializes_rfc3339_date() {
        let parsed = calendar_date::parse("2024-03-02T21:15:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 2, 21, 15, 0).unwrap());
        assert!(calendar_date::parse("yesterday").is_err());
    }

    #[test]
    fn test_factor_value_numeric_view() {
        assert_eq!(FactorValue::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(FactorValue::Boolean(false).as_f64(), Some(0.0));
        assert_eq!(FactorValue::Numeric(3.5).as_f64(), Some(3.5));
        assert_eq!(FactorValue::Missing.as_f64(), None);
    }

    #[test]
    fn test_custom_value_lookup_takes_first() {
        let mut record = DailyRecord::new("r", Utc::now());
        record.custom_values.push(CustomCategoryValue {
            category_id: "water".to_string(),
            name: None,
            value: Some(2.0),
            kind: CategoryKind::Numeric,
        });
        record.custom_values.push(CustomCategoryValue {
            category_id: "water".to_string(),
            name: None,
            value: Some(5.0),
            kind: CategoryKind::Numeric,
        });

        assert_eq!(record.custom_value("water").unwrap().value, Some(2.0));
        assert!(record.custom_value("coffee").is_none());
    }
}
