//! Value identities for plants and scenario coordinates.
//!
//! Both key types compare and hash structurally over their fields. Two plant
//! keys whose fields concatenate to the same text (`("ab", "c")` and
//! `("a", "bc")`) are different keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PdsError;

/// Kind of simulated resource. Each category has its own generation series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantCategory {
    Hydro,
    Thermal,
    Renewable,
    Battery,
    Csp,
    Injection,
}

impl PlantCategory {
    pub const ALL: [PlantCategory; 6] = [
        PlantCategory::Hydro,
        PlantCategory::Thermal,
        PlantCategory::Renewable,
        PlantCategory::Battery,
        PlantCategory::Csp,
        PlantCategory::Injection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlantCategory::Hydro => "hydro",
            PlantCategory::Thermal => "thermal",
            PlantCategory::Renewable => "renewable",
            PlantCategory::Battery => "battery",
            PlantCategory::Csp => "csp",
            PlantCategory::Injection => "injection",
        }
    }
}

impl fmt::Display for PlantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantCategory {
    type Err = PdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        PlantCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| {
                PdsError::Format(format!(
                    "unknown plant category '{}'; expected one of hydro, thermal, renewable, battery, csp, injection",
                    s.trim()
                ))
            })
    }
}

/// Identity of a simulated plant.
///
/// `system` is trimmed and lower-cased on construction; `name` is trimmed and
/// otherwise kept exactly as written, since result series address plants by
/// their literal agent name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlantKey {
    system: String,
    category: PlantCategory,
    name: String,
}

impl PlantKey {
    pub fn new(system: &str, category: PlantCategory, name: &str) -> Self {
        Self {
            system: system.trim().to_lowercase(),
            category,
            name: name.trim().to_string(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn category(&self) -> PlantCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PlantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.system, self.category, self.name)
    }
}

/// One (stage, run, interval) coordinate of the stochastic case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ScenarioKey {
    pub stage: u32,
    pub run: u32,
    pub interval: u32,
}

impl ScenarioKey {
    #[inline]
    pub const fn new(stage: u32, run: u32, interval: u32) -> Self {
        Self {
            stage,
            run,
            interval,
        }
    }

    /// The coordinate with its run dimension dropped, as used by series that
    /// do not vary across runs.
    #[inline]
    pub const fn stage_interval(&self) -> (u32, u32) {
        (self.stage, self.interval)
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(stage {}, run {}, interval {})",
            self.stage, self.run, self.interval
        )
    }
}

/// Binding of a plant to one target unit with its share of the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub target_unit: String,
    pub weight: f64,
}

impl MapEntry {
    pub fn new(target_unit: impl Into<String>, weight: f64) -> Self {
        Self {
            target_unit: target_unit.into(),
            weight,
        }
    }
}
