//! Collected warnings and errors from topology validation.
//!
//! Checks push issues into a [`Diagnostics`] instead of failing on the first
//! problem, so a single pass reports every defect. Callers that need a hard
//! failure convert with [`Diagnostics::into_result`].
//!
//! ```
//! use hubflow_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("topology", "expected exactly one storage link, found 2");
//! assert_eq!(diag.warning_count(), 1);
//! assert!(diag.into_result().is_ok());
//! ```

use serde::Serialize;

use crate::error::{DispatchError, HubflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One issue found during a check
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Check that raised the issue
    pub category: String,
    pub message: String,
    /// Node or link the issue refers to
    #[serde(skip_serializing_if = "Option::is_none")]
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

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
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
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    /// Emit warnings through `tracing` and fail on the first error.
    pub fn into_result(self) -> HubflowResult<()> {
        for warning in self.warnings() {
            tracing::warn!("{}", warning);
        }
        match self.errors().next() {
            None => Ok(()),
            Some(first) => {
                let mut message = first.to_string();
                let more = self.error_count() - 1;
                if more > 0 {
                    message.push_str(&format!(" (and {more} more)"));
                }
                Err(DispatchError::Configuration(message))
            }
        }
    }

    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
        }
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
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
    fn issue_display_includes_entity() {
        let issue = DiagnosticIssue::new(Severity::Error, "topology", "hub has no inflow links")
            .with_entity("lv");
        assert_eq!(
            issue.to_string(),
            "[error:topology] hub has no inflow links (lv)"
        );
    }

    #[test]
    fn summary_pluralizes() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");
        diag.add_warning("topology", "a");
        diag.add_warning("topology", "b");
        diag.add_error("topology", "c");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn into_result_fails_on_errors_only() {
        let mut diag = Diagnostics::new();
        diag.add_warning("topology", "expected exactly one storage link, found 2");
        assert!(diag.clone().into_result().is_ok());

        diag.add_error_with_entity("topology", "hub has no inflow links", "lv");
        diag.add_error("topology", "disconnected");
        let err = diag.into_result().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("hub has no inflow links"));
        assert!(text.contains("and 1 more"));
    }

    #[test]
    fn serializes_without_empty_fields() {
        let mut diag = Diagnostics::new();
        diag.add_warning("topology", "x");
        let json = serde_json::to_value(&diag).unwrap();
        let issue = &json["issues"][0];
        assert_eq!(issue["severity"], "warning");
        assert!(issue.get("entity").is_none());
    }
}
