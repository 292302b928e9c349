//! # pds-core: plant dispatch mapping core
//!
//! Value types and in-memory tables for turning stochastic dispatch results
//! into per-unit setpoints of a power-flow model.
//!
//! ## Data model
//!
//! - [`PlantKey`] identifies a simulated plant by `(system, category, name)`.
//! - [`ScenarioKey`] identifies a `(stage, run, interval)` coordinate.
//! - [`PlantRegistry`] maps each plant to the target units it feeds, with
//!   weights normalized to sum to one per plant.
//! - [`ScenarioCatalog`] lists the scenarios to process, in table order, with
//!   their labels.
//! - [`ClassTable`] and [`SeriesNames`] are the start-up lookup tables
//!   (element class → attribute/factor, plant category → series name).
//!
//! ## Quick start
//!
//! ```
//! use pds_core::*;
//!
//! let mut registry = PlantRegistry::new();
//! let plant = PlantKey::new("main", PlantCategory::Hydro, "Itaipu");
//! registry.add(plant.clone(), MapEntry::new("G1", 3.0)).unwrap();
//! registry.add(plant.clone(), MapEntry::new("G2", 1.0)).unwrap();
//! registry.normalize().unwrap();
//!
//! let (found, weight) = registry.find_plant_for_target("G1").unwrap();
//! assert_eq!(found, &plant);
//! assert_eq!(weight, 0.75);
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - soft warnings collected during loads and runs
//! - [`error`] - the [`PdsError`] taxonomy
//! - [`units`] - energy, duration and power newtypes

pub mod catalog;
pub mod diagnostics;
pub mod error;
pub mod keys;
pub mod registry;
pub mod tables;
pub mod units;

pub use catalog::ScenarioCatalog;
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{PdsError, PdsResult};
pub use keys::{MapEntry, PlantCategory, PlantKey, ScenarioKey};
pub use registry::{PlantRegistry, WEIGHT_TOLERANCE};
pub use tables::{
    ClassConversion, ClassTable, SeriesNames, ACTIVE_POWER_ATTRIBUTE, DURATION_SERIES,
};
pub use units::{GigawattHours, Hours, Megawatts};
