//! Record ingestion
//!
//! Parses daily records from JSON arrays or NDJSON and checks their shape at
//! the boundary. The analytics components assume records that pass
//! [`DailyRecord::validate`], but still treat any single bad reading as missing.

use crate::error::AnalyticsError;
use crate::types::DailyRecord;
use thiserror::Error;

/// Inclusive range of the two subjective ratings
const RATING_RANGE: (f64, f64) = (1.0, 10.0);

/// Record shape violations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Record id must not be empty")]
    EmptyId,

    #[error("{field} must be between {min} and {max}, got {actual}")]
    RatingOutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        actual: f64,
    },

    #[error("{field} must not be negative, got {actual}")]
    NegativeAmount { field: &'static str, actual: f64 },

    #[error("Custom value at position {position} has an empty category id")]
    EmptyCategoryId { position: usize },
}

impl DailyRecord {
    /// Validate the record shape
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }

        for (field, value) in [("happiness", self.happiness), ("stress_level", self.stress_level)] {
            if let Some(actual) = value.filter(|v| v.is_finite()) {
                let (min, max) = RATING_RANGE;
                if actual < min || actual > max {
                    return Err(ValidationError::RatingOutOfRange {
                        field,
                        min,
                        max,
                        actual,
                    });
                }
            }
        }

        let amounts = [
            ("sleep_hours", self.sleep_hours),
            ("exercise_minutes", self.exercise_minutes),
            ("alcohol_units", self.alcohol_units),
            ("substance_amount", self.substance_amount),
            ("meditation_minutes", self.meditation_minutes),
            ("social_hours", self.social_hours),
            ("work_hours", self.work_hours),
            ("meals", self.meals),
        ];
        for (field, value) in amounts {
            if let Some(actual) = value.filter(|v| *v < 0.0) {
                return Err(ValidationError::NegativeAmount { field, actual });
            }
        }

        if let Some(position) = self
            .custom_values
            .iter()
            .position(|v| v.category_id.trim().is_empty())
        {
            return Err(ValidationError::EmptyCategoryId { position });
        }

        Ok(())
    }
}

/// Adapter for reading records from serialized input
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<DailyRecord>, AnalyticsError> {
        let records: Vec<DailyRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<DailyRecord>, AnalyticsError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<DailyRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(AnalyticsError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either a JSON array or NDJSON, sniffing the first non-blank character
    pub fn parse_auto(input: &str) -> Result<Vec<DailyRecord>, AnalyticsError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[DailyRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    record_id: record.id.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Reject the batch on the first invalid record
    pub fn ensure_valid(records: &[DailyRecord]) -> Result<(), AnalyticsError> {
        match Self::validate_records(records).into_iter().next() {
            Some(failure) => Err(AnalyticsError::InvalidRecord(format!(
                "record {} (index {}): {}",
                failure.record_id, failure.index, failure.error
            ))),
            None => Ok(()),
        }
    }
}

/// Result of record validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub record_id: String,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryKind, CustomCategoryValue};
    use chrono::Utc;

    fn sample_line(id: &str, happiness: &str) -> String {
        format!(
            r#"{{"id":"{id}","date":"2024-04-01","sleep_hours":7,"sleep_quality":6,"exercise":false,"exercise_minutes":null,"alcohol":false,"alcohol_units":null,"substance":false,"substance_amount":null,"meditation":true,"meditation_minutes":15,"social_hours":1,"work_hours":8,"meals":3,"food_quality":7,"stress_level":3,"happiness":{happiness}}}"#
        )
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let input = format!("{}\n\n{}\n", sample_line("a", "7"), sample_line("b", "null"));
        let records = RecordAdapter::parse_ndjson(&input).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].meditation_minutes, Some(15.0));
        assert_eq!(records[1].happiness, None);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let input = format!("{}\n{{not json}}\n", sample_line("a", "7"));
        let err = RecordAdapter::parse_ndjson(&input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_auto_accepts_both_layouts() {
        let array = format!("[{},{}]", sample_line("a", "7"), sample_line("b", "8"));
        assert_eq!(RecordAdapter::parse_auto(&array).unwrap().len(), 2);

        let ndjson = format!("{}\n{}", sample_line("a", "7"), sample_line("b", "8"));
        assert_eq!(RecordAdapter::parse_auto(&ndjson).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_rating_range() {
        let mut record = DailyRecord::new("r", Utc::now());
        record.happiness = Some(11.0);
        assert!(matches!(
            record.validate(),
            Err(ValidationError::RatingOutOfRange { field: "happiness", .. })
        ));

        record.happiness = Some(10.0);
        record.stress_level = Some(0.0);
        assert!(matches!(
            record.validate(),
            Err(ValidationError::RatingOutOfRange { field: "stress_level", .. })
        ));
    }

    #[test]
    fn test_validate_batch() {
        let good = DailyRecord::new("good", Utc::now());
        let mut negative = DailyRecord::new("neg", Utc::now());
        negative.work_hours = Some(-1.0);
        let mut unnamed = DailyRecord::new("unnamed", Utc::now());
        unnamed.custom_values.push(CustomCategoryValue {
            category_id: " ".to_string(),
            name: None,
            value: Some(1.0),
            kind: CategoryKind::Numeric,
        });
        let blank = DailyRecord::new("", Utc::now());

        let records = vec![good, negative, unnamed, blank];
        let failures = RecordAdapter::validate_records(&records);

        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].index, 1);
        assert!(matches!(failures[0].error, ValidationError::NegativeAmount { field: "work_hours", .. }));
        assert_eq!(failures[1].error, ValidationError::EmptyCategoryId { position: 0 });
        assert_eq!(failures[2].error, ValidationError::EmptyId);

        assert!(RecordAdapter::ensure_valid(&records[..1]).is_ok());
        assert!(matches!(
            RecordAdapter::ensure_valid(&records),
            Err(AnalyticsError::InvalidRecord(_))
        ));
    }
}
