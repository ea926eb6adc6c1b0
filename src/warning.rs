//! Warnings: the diagnostic currency of the analyzer.
//!
//! Scanning and resolution never abort on recoverable problems; they attach
//! a [`Warning`] to the feature or document that exhibits it.

use std::fmt;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::source::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningCode {
    /// The URL could not be fetched from the loader.
    UnableToLoad,
    /// The document's parser reported a syntax error.
    ParseError,
    /// `get_document` was called for a URL that was never scanned.
    UnableToAnalyze,
    /// A superclass, mixin, or behavior reference did not resolve.
    CouldNotResolveReference,
    /// A scanner could not determine a feature's name.
    AmbiguousName,
    /// A published property name cannot be mapped to an attribute name.
    InvalidPropertyName,
    /// A behavior declaration was not in a recognized shape.
    InvalidBehaviorShape,
    /// A class-like feature participates in its own prototype chain.
    CyclicInheritance,
}

impl WarningCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            WarningCode::UnableToLoad => "unable-to-load",
            WarningCode::ParseError => "parse-error",
            WarningCode::UnableToAnalyze => "unable-to-analyze",
            WarningCode::CouldNotResolveReference => "could-not-resolve-reference",
            WarningCode::AmbiguousName => "ambiguous-name",
            WarningCode::InvalidPropertyName => "invalid-property-name",
            WarningCode::InvalidBehaviorShape => "invalid-behavior-shape",
            WarningCode::CyclicInheritance => "cyclic-inheritance",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
    pub range: SourceRange,
}

impl Warning {
    pub fn new(
        code: WarningCode,
        severity: Severity,
        message: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            range,
        }
    }

    pub fn error(code: WarningCode, message: impl Into<String>, range: SourceRange) -> Self {
        Self::new(code, Severity::Error, message, range)
    }

    pub fn warning(code: WarningCode, message: impl Into<String>, range: SourceRange) -> Self {
        Self::new(code, Severity::Warning, message, range)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self.severity {
            Severity::Error => self.code.as_str().red().bold(),
            Severity::Warning => self.code.as_str().yellow().bold(),
            Severity::Info => self.code.as_str().cyan(),
        };
        write!(
            f,
            "{}{}{}{}{}{} {} {}",
            self.range.file.white().bold(),
            ":".cyan(),
            self.range.start.line + 1,
            ":".cyan(),
            self.range.start.column + 1,
            ":".cyan(),
            code,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Severity, Warning, WarningCode};
    use crate::source::SourceRange;

    #[test]
    fn code_serializes_kebab_case() {
        let json = serde_json::to_string(&WarningCode::CouldNotResolveReference).unwrap();
        assert_eq!(json, "\"could-not-resolve-reference\"");
        assert_eq!(
            WarningCode::CouldNotResolveReference.as_str(),
            "could-not-resolve-reference"
        );
    }

    #[test]
    fn display_includes_one_based_position() {
        colored::control::set_override(false);
        let warning = Warning::new(
            WarningCode::UnableToLoad,
            Severity::Error,
            "no such document",
            SourceRange::empty("a.html"),
        );
        assert_eq!(format!("{warning}"), "a.html:1:1: unable-to-load no such document");
    }
}
