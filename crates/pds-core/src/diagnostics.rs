//! Non-fatal issues collected while loading tables and applying scenarios.
//!
//! Hard failures are [`crate::PdsError`]s; everything the pipeline can
//! continue past (a target unit with no plant, a unit claimed by several
//! plants) lands here so it can be logged and written to the run report.
//!
//! # Example
//!
//! ```
//! use pds_core::diagnostics::{Diagnostics, CATEGORY_UNMAPPED};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity(CATEGORY_UNMAPPED, "no plant maps to this unit", "G7");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.summary(), "1 warning");
//! ```

use serde::{Deserialize, Serialize};

/// Target unit known to the model but absent from the plant map.
pub const CATEGORY_UNMAPPED: &str = "unmapped";
/// Target unit bound to more than one plant.
pub const CATEGORY_AMBIGUOUS: &str = "ambiguous";
/// Plant-map target that the model does not expose.
pub const CATEGORY_MISSING_UNIT: &str = "missing-unit";

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but processing continued
    Warning,
    /// An element or scenario could not be completed
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (see the `CATEGORY_*` constants)
    pub category: String,
    pub message: String,
    /// Optional entity reference (unit or plant name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one load or one scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Entities of every issue in `category`, in insertion order.
    pub fn entities_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a str> {
        self.issues_by_category(category)
            .filter_map(|i| i.entity.as_deref())
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning(CATEGORY_AMBIGUOUS, "G1 claimed twice");
        diag.add_error_with_entity(CATEGORY_UNMAPPED, "hard stop", "G2");
        diag.add_warning_with_entity(CATEGORY_UNMAPPED, "skipped", "G3");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_issues());
        assert!(diag.has_errors());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add(
            DiagnosticIssue::new(Severity::Warning, CATEGORY_UNMAPPED, "no plant").with_entity("G1"),
        );

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"entity\": \"G1\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let mut keys: Vec<_> = value["issues"][0].as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["category", "entity", "message", "severity"]);
    }

    #[test]
    fn test_diagnostic_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Warning, CATEGORY_AMBIGUOUS, "bound twice")
            .with_entity("G4");

        let display = format!("{}", issue);
        assert_eq!(display, "[warning:ambiguous] bound twice (G4)");
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning(CATEGORY_UNMAPPED, "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error_with_entity(CATEGORY_UNMAPPED, "error", "G1");
        assert_eq!(diag.summary(), "1 warning, 1 error");

        diag.add_warning(CATEGORY_UNMAPPED, "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn test_entities_in_category() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity(CATEGORY_UNMAPPED, "no plant", "G2");
        diag.add_warning_with_entity(CATEGORY_AMBIGUOUS, "two plants", "G1");
        diag.add_warning_with_entity(CATEGORY_UNMAPPED, "no plant", "G5");

        let unmapped: Vec<_> = diag.entities_in(CATEGORY_UNMAPPED).collect();
        assert_eq!(unmapped, vec!["G2", "G5"]);
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut diag1 = Diagnostics::new();
        diag1.add_warning(CATEGORY_UNMAPPED, "warning 1");

        let mut diag2 = Diagnostics::new();
        diag2.add_warning(CATEGORY_AMBIGUOUS, "warning 2");

        diag1.merge(diag2);
        assert_eq!(diag1.warning_count(), 2);
    }
}
