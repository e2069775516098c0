//! Factor extraction
//!
//! Projects a record onto one factor as a typed value. Built-in factors are a
//! fixed dispatch over record fields; custom factors resolve through the
//! catalog slot assigned when the snapshot was scanned.

use crate::catalog::{BuiltinFactor, FactorCatalog, FactorRef};
use crate::types::{CategoryKind, DailyRecord, FactorValue, Target};

/// Extractor bound to the catalog of one record snapshot
#[derive(Debug, Clone, Copy)]
pub struct FactorExtractor<'a> {
    catalog: &'a FactorCatalog,
}

impl<'a> FactorExtractor<'a> {
    pub fn new(catalog: &'a FactorCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a FactorCatalog {
        self.catalog
    }

    /// Value of `factor` on `record`
    pub fn value(&self, record: &DailyRecord, factor: &FactorRef) -> FactorValue {
        match factor {
            FactorRef::Builtin(builtin) => builtin_value(record, *builtin),
            FactorRef::Custom(slot) => {
                let category = self.catalog.custom(*slot);
                let logged = record.custom_value(&category.id);

                match category.kind {
                    // Absent boolean readings count as "did not happen"
                    CategoryKind::Boolean => match logged.and_then(|v| v.value) {
                        Some(v) if v.is_finite() => FactorValue::Boolean(v != 0.0),
                        Some(_) => FactorValue::Missing,
                        None => FactorValue::Boolean(false),
                    },
                    CategoryKind::Numeric | CategoryKind::Scale => {
                        numeric(logged.and_then(|v| v.value))
                    }
                }
            }
        }
    }

    /// Value of a correlation target on `record`
    pub fn target(&self, record: &DailyRecord, target: Target) -> FactorValue {
        match target {
            Target::Happiness => builtin_value(record, BuiltinFactor::Happiness),
            Target::Stress => builtin_value(record, BuiltinFactor::StressLevel),
        }
    }
}

fn builtin_value(record: &DailyRecord, factor: BuiltinFactor) -> FactorValue {
    match factor {
        BuiltinFactor::SleepHours => numeric(record.sleep_hours),
        BuiltinFactor::SleepQuality => numeric(record.sleep_quality),
        BuiltinFactor::Exercise => FactorValue::Boolean(record.exercise),
        BuiltinFactor::ExerciseMinutes => gated(record.exercise, record.exercise_minutes),
        BuiltinFactor::Alcohol => FactorValue::Boolean(record.alcohol),
        BuiltinFactor::AlcoholUnits => gated(record.alcohol, record.alcohol_units),
        BuiltinFactor::Substance => FactorValue::Boolean(record.substance),
        BuiltinFactor::SubstanceAmount => gated(record.substance, record.substance_amount),
        BuiltinFactor::Meditation => FactorValue::Boolean(record.meditation),
        BuiltinFactor::MeditationMinutes => gated(record.meditation, record.meditation_minutes),
        BuiltinFactor::SocialHours => numeric(record.social_hours),
        BuiltinFactor::WorkHours => numeric(record.work_hours),
        BuiltinFactor::Meals => numeric(record.meals),
        BuiltinFactor::FoodQuality => numeric(record.food_quality),
        BuiltinFactor::StressLevel => numeric(record.stress_level),
        BuiltinFactor::Happiness => numeric(record.happiness),
    }
}

/// Amount field that only counts when its companion flag is set.
/// A cleared flag reads 0 so stale amounts left in the field are ignored.
fn gated(flag: bool, amount: Option<f64>) -> FactorValue {
    if flag {
        numeric(amount)
    } else {
        FactorValue::Numeric(0.0)
    }
}

fn numeric(raw: Option<f64>) -> FactorValue {
    match raw {
        Some(v) if v.is_finite() && v >= 0.0 => FactorValue::Numeric(v),
        _ => FactorValue::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CustomCategoryValue;
    use chrono::Utc;

    fn custom(id: &str, value: Option<f64>, kind: CategoryKind) -> CustomCategoryValue {
        CustomCategoryValue {
            category_id: id.to_string(),
            name: None,
            value,
            kind,
        }
    }

    #[test]
    fn test_gated_minutes_ignore_stale_value() {
        let mut record = DailyRecord::new("r", Utc::now());
        record.exercise = false;
        record.exercise_minutes = Some(45.0);

        let catalog = FactorCatalog::build(&[]);
        let extractor = FactorExtractor::new(&catalog);
        let minutes = FactorRef::Builtin(BuiltinFactor::ExerciseMinutes);

        assert_eq!(extractor.value(&record, &minutes), FactorValue::Numeric(0.0));

        record.exercise = true;
        assert_eq!(extractor.value(&record, &minutes), FactorValue::Numeric(45.0));

        record.exercise_minutes = None;
        assert_eq!(extractor.value(&record, &minutes), FactorValue::Missing);
    }

    #[test]
    fn test_invalid_numeric_readings_are_missing() {
        let mut record = DailyRecord::new("r", Utc::now());
        let catalog = FactorCatalog::build(&[]);
        let extractor = FactorExtractor::new(&catalog);
        let sleep = FactorRef::Builtin(BuiltinFactor::SleepHours);

        for raw in [None, Some(f64::NAN), Some(f64::INFINITY), Some(-1.0)] {
            record.sleep_hours = raw;
            assert_eq!(extractor.value(&record, &sleep), FactorValue::Missing);
        }

        record.sleep_hours = Some(0.0);
        assert_eq!(extractor.value(&record, &sleep), FactorValue::Numeric(0.0));
    }

    #[test]
    fn test_builtin_flags_read_directly() {
        let mut record = DailyRecord::new("r", Utc::now());
        record.meditation = true;
        let catalog = FactorCatalog::build(&[]);
        let extractor = FactorExtractor::new(&catalog);

        assert_eq!(
            extractor.value(&record, &FactorRef::Builtin(BuiltinFactor::Meditation)),
            FactorValue::Boolean(true)
        );
        assert_eq!(
            extractor.value(&record, &FactorRef::Builtin(BuiltinFactor::Alcohol)),
            FactorValue::Boolean(false)
        );
    }

    #[test]
    fn test_absent_custom_values() {
        let mut tagged = DailyRecord::new("a", Utc::now());
        tagged.custom_values = vec![
            custom("journal", Some(1.0), CategoryKind::Boolean),
            custom("water", Some(2.5), CategoryKind::Numeric),
        ];
        let empty = DailyRecord::new("b", Utc::now());

        let records = vec![tagged.clone(), empty.clone()];
        let catalog = FactorCatalog::build(&records);
        let extractor = FactorExtractor::new(&catalog);
        let journal = catalog.resolve("journal").unwrap();
        let water = catalog.resolve("water").unwrap();

        assert_eq!(extractor.value(&tagged, &journal), FactorValue::Boolean(true));
        assert_eq!(extractor.value(&empty, &journal), FactorValue::Boolean(false));
        assert_eq!(extractor.value(&tagged, &water), FactorValue::Numeric(2.5));
        assert_eq!(extractor.value(&empty, &water), FactorValue::Missing);
    }

    #[test]
    fn test_targets() {
        let mut record = DailyRecord::new("r", Utc::now());
        record.happiness = Some(8.0);
        record.stress_level = Some(f64::NAN);
        let catalog = FactorCatalog::build(&[]);
        let extractor = FactorExtractor::new(&catalog);

        assert_eq!(extractor.target(&record, Target::Happiness), FactorValue::Numeric(8.0));
        assert!(extractor.target(&record, Target::Stress).is_missing());
    }
}
