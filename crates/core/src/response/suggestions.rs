//! Remediation suggestions
//!
//! Two tiers: generic suggestions per category, always listed first in a
//! fixed order, then code-specific suggestions for well-known codes. New
//! codes are added to the specific tier without touching the generic one.

use std::collections::BTreeMap;

use faultline_domain::constants::{
    CODE_CIRCUIT_BREAKER_OPEN, CODE_CONFIGURATION_FILE_MISSING, CODE_DATA_CONNECTION_FAILED,
};
use faultline_domain::ErrorCategory;

/// Suggestions keyed by category and by code
#[derive(Debug, Clone)]
pub struct SuggestionCatalog {
    generic: BTreeMap<ErrorCategory, Vec<String>>,
    specific: BTreeMap<i32, Vec<String>>,
}

impl Default for SuggestionCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();

        catalog.generic.insert(
            ErrorCategory::Configuration,
            strings(&[
                "Verify that the application configuration files are present and valid",
                "Check the environment variables and settings this endpoint depends on",
            ]),
        );
        catalog.generic.insert(
            ErrorCategory::Data,
            strings(&[
                "Check connectivity to the underlying data store",
                "Verify that the request data is well-formed and complete",
            ]),
        );
        catalog.generic.insert(
            ErrorCategory::Logical,
            strings(&[
                "Review the request against the documented business rules",
                "Check the request parameters and their allowed values",
            ]),
        );
        catalog.generic.insert(
            ErrorCategory::System,
            strings(&[
                "Retry the request after a short delay",
                "Contact support with the correlation id if the problem persists",
            ]),
        );

        catalog
            .with_code_suggestion(
                CODE_CONFIGURATION_FILE_MISSING,
                "Ensure the configuration file exists at the expected path and is readable",
            )
            .with_code_suggestion(
                CODE_DATA_CONNECTION_FAILED,
                "Confirm the database server is running and reachable",
            )
            .with_code_suggestion(
                CODE_DATA_CONNECTION_FAILED,
                "Check the connection string and credentials",
            )
            .with_code_suggestion(
                CODE_CIRCUIT_BREAKER_OPEN,
                "The service is shedding load after repeated failures; wait before retrying",
            )
            .with_code_suggestion(
                CODE_CIRCUIT_BREAKER_OPEN,
                "Check the service health endpoint for the circuit breaker state",
            )
    }
}

impl SuggestionCatalog {
    /// Catalog with no suggestions at all
    pub fn empty() -> Self {
        Self { generic: BTreeMap::new(), specific: BTreeMap::new() }
    }

    /// Append a suggestion for a specific code
    pub fn with_code_suggestion(mut self, code: i32, suggestion: impl Into<String>) -> Self {
        self.specific.entry(code).or_default().push(suggestion.into());
        self
    }

    /// Generic suggestions for the code's category, then code-specific ones
    pub fn suggestions_for(&self, code: i32) -> Vec<String> {
        let generic = ErrorCategory::from_code(code)
            .and_then(|category| self.generic.get(&category))
            .into_iter()
            .flatten();
        let specific = self.specific.get(&code).into_iter().flatten();

        generic.chain(specific).cloned().collect()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_suggestions_come_first() {
        let catalog = SuggestionCatalog::default();
        let suggestions = catalog.suggestions_for(CODE_DATA_CONNECTION_FAILED);

        assert_eq!(suggestions.len(), 4);
        assert_eq!(suggestions[0], "Check connectivity to the underlying data store");
        assert_eq!(suggestions[2], "Confirm the database server is running and reachable");
        assert_eq!(suggestions[3], "Check the connection string and credentials");
    }

    #[test]
    fn test_codes_without_specific_entries_get_generic_only() {
        let catalog = SuggestionCatalog::default();
        assert_eq!(catalog.suggestions_for(3050).len(), 2);
        assert_eq!(catalog.suggestions_for(4000).len(), 2);
        assert!(catalog.suggestions_for(42).is_empty());
    }

    /// Extending the specific tier leaves the generic tier untouched.
    #[test]
    fn test_extension_appends_after_generic() {
        let catalog = SuggestionCatalog::default().with_code_suggestion(3007, "Refresh the quote");

        let suggestions = catalog.suggestions_for(3007);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions.last().map(String::as_str), Some("Refresh the quote"));
        assert_eq!(catalog.suggestions_for(3008).len(), 2);
    }
}
