//! Start-up configuration tables: which series holds each plant category's
//! generation, and which attribute and scale each element class expects.
//!
//! Both tables are plain values. They are built once (defaults, optionally
//! overridden from configuration) and handed to the dispatch computer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PdsError, PdsResult};
use crate::keys::PlantCategory;

/// Well-known name of the interval-duration series.
pub const DURATION_SERIES: &str = "duraci";

/// Active-power setpoint attribute of generator-like element classes.
pub const ACTIVE_POWER_ATTRIBUTE: &str = "pgini";

/// Attribute to write and scale to apply for one element class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConversion {
    pub attribute: String,
    pub factor: f64,
}

impl ClassConversion {
    pub fn new(attribute: impl Into<String>, factor: f64) -> Self {
        Self {
            attribute: attribute.into(),
            factor,
        }
    }
}

/// Element class → attribute/factor lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable {
    classes: BTreeMap<String, ClassConversion>,
}

impl Default for ClassTable {
    /// Generator-like classes take MW; photovoltaic systems take the
    /// setpoint in thousandths of that unit.
    fn default() -> Self {
        let mut classes = BTreeMap::new();
        for class in ["ElmSym", "ElmAsm", "ElmGenstat", "ElmAsmsc", "ElmXnet"] {
            classes.insert(
                class.to_string(),
                ClassConversion::new(ACTIVE_POWER_ATTRIBUTE, 1.0),
            );
        }
        classes.insert(
            "ElmPvsys".to_string(),
            ClassConversion::new(ACTIVE_POWER_ATTRIBUTE, 0.001),
        );
        Self { classes }
    }
}

impl ClassTable {
    pub fn empty() -> Self {
        Self {
            classes: BTreeMap::new(),
        }
    }

    /// Add or replace the conversion for a class.
    pub fn with_class(mut self, class: impl Into<String>, conversion: ClassConversion) -> Self {
        self.classes.insert(class.into(), conversion);
        self
    }

    pub fn get(&self, class: &str) -> Option<&ClassConversion> {
        self.classes.get(class)
    }

    /// Conversion for `unit`'s class, or [`PdsError::UnknownClass`].
    pub fn conversion_for(&self, unit: &str, class: &str) -> PdsResult<&ClassConversion> {
        self.get(class).ok_or_else(|| PdsError::UnknownClass {
            unit: unit.to_string(),
            class: class.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassConversion)> {
        self.classes
            .iter()
            .map(|(class, conversion)| (class.as_str(), conversion))
    }
}

/// Plant category → generation series name, plus the duration series name.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesNames {
    duration: String,
    categories: BTreeMap<PlantCategory, String>,
}

impl Default for SeriesNames {
    fn default() -> Self {
        let categories = PlantCategory::ALL
            .into_iter()
            .map(|category| {
                let name = match category {
                    PlantCategory::Hydro => "gerhid",
                    PlantCategory::Thermal => "gerter",
                    PlantCategory::Renewable => "gergnd",
                    PlantCategory::Battery => "gerbat",
                    PlantCategory::Csp => "cspgen",
                    PlantCategory::Injection => "powinj",
                };
                (category, name.to_string())
            })
            .collect();
        Self {
            duration: DURATION_SERIES.to_string(),
            categories,
        }
    }
}

impl SeriesNames {
    pub fn with_duration(mut self, name: impl Into<String>) -> Self {
        self.duration = name.into();
        self
    }

    pub fn with_category(mut self, category: PlantCategory, name: impl Into<String>) -> Self {
        self.categories.insert(category, name.into());
        self
    }

    pub fn duration(&self) -> &str {
        &self.duration
    }

    /// Series holding the generation of plants in `category`.
    pub fn series_for(&self, category: PlantCategory) -> &str {
        // Every category has an entry: defaults cover the whole enum and
        // overrides only replace values.
        self.categories
            .get(&category)
            .map(String::as_str)
            .unwrap_or_else(|| category.as_str())
    }
}
