//! Factor catalog
//!
//! The catalog is built once per record snapshot. It holds the fixed table of
//! built-in factors plus every user-defined category discovered in the
//! snapshot, each assigned a stable slot in discovery order. Factor lookups
//! elsewhere in the crate go through [`FactorRef`] instead of string keys.

use crate::types::{CategoryKind, DailyRecord, FactorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed-bin layout used to build a histogram for a factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinningSpec {
    pub bin_count: usize,
    pub domain_max: f64,
    pub decimal_places: usize,
}

impl BinningSpec {
    pub const fn new(bin_count: usize, domain_max: f64, decimal_places: usize) -> Self {
        Self {
            bin_count,
            domain_max,
            decimal_places,
        }
    }
}

/// Built-in factors derived from fixed record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinFactor {
    SleepHours,
    SleepQuality,
    Exercise,
    ExerciseMinutes,
    Alcohol,
    AlcoholUnits,
    Substance,
    SubstanceAmount,
    Meditation,
    MeditationMinutes,
    SocialHours,
    WorkHours,
    Meals,
    FoodQuality,
    StressLevel,
    Happiness,
}

impl BuiltinFactor {
    /// Every built-in factor in catalog order
    pub const ALL: [BuiltinFactor; 16] = [
        BuiltinFactor::SleepHours,
        BuiltinFactor::SleepQuality,
        BuiltinFactor::Exercise,
        BuiltinFactor::ExerciseMinutes,
        BuiltinFactor::Alcohol,
        BuiltinFactor::AlcoholUnits,
        BuiltinFactor::Substance,
        BuiltinFactor::SubstanceAmount,
        BuiltinFactor::Meditation,
        BuiltinFactor::MeditationMinutes,
        BuiltinFactor::SocialHours,
        BuiltinFactor::WorkHours,
        BuiltinFactor::Meals,
        BuiltinFactor::FoodQuality,
        BuiltinFactor::StressLevel,
        BuiltinFactor::Happiness,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BuiltinFactor::SleepHours => "sleep_hours",
            BuiltinFactor::SleepQuality => "sleep_quality",
            BuiltinFactor::Exercise => "exercise",
            BuiltinFactor::ExerciseMinutes => "exercise_minutes",
            BuiltinFactor::Alcohol => "alcohol",
            BuiltinFactor::AlcoholUnits => "alcohol_units",
            BuiltinFactor::Substance => "substance",
            BuiltinFactor::SubstanceAmount => "substance_amount",
            BuiltinFactor::Meditation => "meditation",
            BuiltinFactor::MeditationMinutes => "meditation_minutes",
            BuiltinFactor::SocialHours => "social_hours",
            BuiltinFactor::WorkHours => "work_hours",
            BuiltinFactor::Meals => "meals",
            BuiltinFactor::FoodQuality => "food_quality",
            BuiltinFactor::StressLevel => "stress_level",
            BuiltinFactor::Happiness => "happiness",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BuiltinFactor::SleepHours => "Sleep Hours",
            BuiltinFactor::SleepQuality => "Sleep Quality",
            BuiltinFactor::Exercise => "Exercise",
            BuiltinFactor::ExerciseMinutes => "Exercise Minutes",
            BuiltinFactor::Alcohol => "Alcohol",
            BuiltinFactor::AlcoholUnits => "Alcohol Units",
            BuiltinFactor::Substance => "Substance",
            BuiltinFactor::SubstanceAmount => "Substance Amount",
            BuiltinFactor::Meditation => "Meditation",
            BuiltinFactor::MeditationMinutes => "Meditation Minutes",
            BuiltinFactor::SocialHours => "Social Hours",
            BuiltinFactor::WorkHours => "Work Hours",
            BuiltinFactor::Meals => "Meals",
            BuiltinFactor::FoodQuality => "Food Quality",
            BuiltinFactor::StressLevel => "Stress Level",
            BuiltinFactor::Happiness => "Happiness",
        }
    }

    pub fn kind(&self) -> FactorKind {
        match self {
            BuiltinFactor::Exercise
            | BuiltinFactor::Alcohol
            | BuiltinFactor::Substance
            | BuiltinFactor::Meditation => FactorKind::Boolean,
            _ => FactorKind::Numeric,
        }
    }

    /// Whether this factor is one of the two correlation targets
    pub fn is_target(&self) -> bool {
        matches!(self, BuiltinFactor::StressLevel | BuiltinFactor::Happiness)
    }

    /// Histogram layout; boolean factors have none
    pub fn binning(&self) -> Option<BinningSpec> {
        match self {
            BuiltinFactor::SleepHours => Some(BinningSpec::new(12, 12.0, 1)),
            BuiltinFactor::SleepQuality => Some(BinningSpec::new(10, 10.0, 1)),
            BuiltinFactor::ExerciseMinutes => Some(BinningSpec::new(12, 120.0, 1)),
            BuiltinFactor::AlcoholUnits => Some(BinningSpec::new(10, 10.0, 1)),
            // Small natural scale, labels need the extra precision
            BuiltinFactor::SubstanceAmount => Some(BinningSpec::new(10, 1.0, 3)),
            BuiltinFactor::MeditationMinutes => Some(BinningSpec::new(12, 60.0, 1)),
            BuiltinFactor::SocialHours => Some(BinningSpec::new(12, 12.0, 1)),
            BuiltinFactor::WorkHours => Some(BinningSpec::new(14, 14.0, 1)),
            BuiltinFactor::Meals => Some(BinningSpec::new(6, 6.0, 1)),
            BuiltinFactor::FoodQuality => Some(BinningSpec::new(10, 10.0, 1)),
            BuiltinFactor::StressLevel => Some(BinningSpec::new(10, 10.0, 1)),
            BuiltinFactor::Happiness => Some(BinningSpec::new(10, 10.0, 1)),
            BuiltinFactor::Exercise
            | BuiltinFactor::Alcohol
            | BuiltinFactor::Substance
            | BuiltinFactor::Meditation => None,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.id() == id)
    }
}

/// Stable slot of a discovered custom category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomSlot(usize);

/// Reference to a factor in a [`FactorCatalog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorRef {
    Builtin(BuiltinFactor),
    Custom(CustomSlot),
}

/// A user-defined category discovered in the snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CustomCategory {
    pub id: String,
    pub name: Option<String>,
    /// Resolved kind: boolean if any record tagged it boolean
    pub kind: CategoryKind,
    /// Largest valid reading seen for the category (0 if none)
    pub observed_max: f64,
}

impl CustomCategory {
    pub fn factor_kind(&self) -> FactorKind {
        match self.kind {
            CategoryKind::Boolean => FactorKind::Boolean,
            CategoryKind::Numeric | CategoryKind::Scale => FactorKind::Numeric,
        }
    }
}

/// Built-in plus discovered custom factors for one record snapshot
#[derive(Debug, Clone, Default)]
pub struct FactorCatalog {
    custom: Vec<CustomCategory>,
    slots: HashMap<String, CustomSlot>,
}

impl FactorCatalog {
    /// Scan the snapshot once and resolve every custom category
    pub fn build(records: &[DailyRecord]) -> Self {
        let mut catalog = Self::default();

        for record in records {
            for value in &record.custom_values {
                if value.category_id.is_empty() {
                    continue;
                }

                let slot = match catalog.slots.get(&value.category_id) {
                    Some(slot) => *slot,
                    None => {
                        let slot = CustomSlot(catalog.custom.len());
                        catalog.custom.push(CustomCategory {
                            id: value.category_id.clone(),
                            name: None,
                            kind: value.kind,
                            observed_max: 0.0,
                        });
                        catalog.slots.insert(value.category_id.clone(), slot);
                        slot
                    }
                };

                let category = &mut catalog.custom[slot.0];
                category.kind = merge_kind(category.kind, value.kind);
                if category.name.is_none() {
                    category.name = value.name.clone().filter(|n| !n.trim().is_empty());
                }
                if let Some(v) = value.value.filter(|v| v.is_finite() && *v >= 0.0) {
                    category.observed_max = category.observed_max.max(v);
                }
            }
        }

        tracing::trace!(
            custom_categories = catalog.custom.len(),
            records = records.len(),
            "built factor catalog"
        );

        catalog
    }

    /// Resolve a factor id; custom categories shadow built-ins of the same id
    pub fn resolve(&self, id: &str) -> Option<FactorRef> {
        if let Some(slot) = self.slots.get(id) {
            return Some(FactorRef::Custom(*slot));
        }
        BuiltinFactor::from_id(id).map(FactorRef::Builtin)
    }

    /// All factors: unshadowed built-ins first, then custom factors by slot
    pub fn factors(&self) -> Vec<FactorRef> {
        BuiltinFactor::ALL
            .iter()
            .filter(|f| !self.slots.contains_key(f.id()))
            .map(|f| FactorRef::Builtin(*f))
            .chain((0..self.custom.len()).map(|i| FactorRef::Custom(CustomSlot(i))))
            .collect()
    }

    /// Factors that are correlated against the targets
    pub fn correlatable(&self) -> Vec<FactorRef> {
        self.factors()
            .into_iter()
            .filter(|f| !BuiltinFactor::from_id(self.id(f)).is_some_and(|b| b.is_target()))
            .collect()
    }

    pub fn custom_categories(&self) -> &[CustomCategory] {
        &self.custom
    }

    pub fn custom(&self, slot: CustomSlot) -> &CustomCategory {
        &self.custom[slot.0]
    }

    pub fn id<'a>(&'a self, factor: &FactorRef) -> &'a str {
        match factor {
            FactorRef::Builtin(b) => b.id(),
            FactorRef::Custom(slot) => &self.custom(*slot).id,
        }
    }

    pub fn display_name(&self, factor: &FactorRef) -> Option<String> {
        match factor {
            FactorRef::Builtin(b) => Some(b.display_name().to_string()),
            FactorRef::Custom(slot) => self.custom(*slot).name.clone(),
        }
    }

    pub fn kind(&self, factor: &FactorRef) -> FactorKind {
        match factor {
            FactorRef::Builtin(b) => b.kind(),
            FactorRef::Custom(slot) => self.custom(*slot).factor_kind(),
        }
    }

    /// Histogram layout for a factor; `None` for boolean factors
    pub fn binning(&self, factor: &FactorRef) -> Option<BinningSpec> {
        match factor {
            FactorRef::Builtin(b) => b.binning(),
            FactorRef::Custom(slot) => {
                let category = self.custom(*slot);
                match category.kind {
                    CategoryKind::Boolean => None,
                    CategoryKind::Scale => Some(BinningSpec::new(10, 10.0, 1)),
                    CategoryKind::Numeric => {
                        let domain_max = if category.observed_max > 0.0 {
                            category.observed_max
                        } else {
                            1.0
                        };
                        let decimal_places = if domain_max <= 2.0 { 3 } else { 1 };
                        Some(BinningSpec::new(10, domain_max, decimal_places))
                    }
                }
            }
        }
    }
}

fn merge_kind(current: CategoryKind, seen: CategoryKind) -> CategoryKind {
    match (current, seen) {
        (CategoryKind::Boolean, _) | (_, CategoryKind::Boolean) => CategoryKind::Boolean,
        (CategoryKind::Scale, _) | (_, CategoryKind::Scale) => CategoryKind::Scale,
        _ => CategoryKind::Numeric,
    }
}
