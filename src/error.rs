//! Error types of the analysis.

use std::fmt;

/// Failure reported by a numeric domain backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The variable is not part of the environment.
    UnknownVariable(String),
    /// The same name was declared twice while building an environment.
    DuplicateVariable(String),
    /// Two elements over different environments were combined.
    EnvironmentMismatch,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::UnknownVariable(name) => write!(f, "unknown variable `{}`", name),
            DomainError::DuplicateVariable(name) => write!(f, "duplicate variable `{}`", name),
            DomainError::EnvironmentMismatch => write!(f, "elements live in different environments"),
        }
    }
}

impl std::error::Error for DomainError {}

/// Failure while analyzing one statement or one call site.
///
/// None of these abort a whole run: the driver records them per program point
/// and the verifier applies its [`ErrorPolicy`][crate::config::ErrorPolicy].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A statement, expression or comparison kind the evaluator does not model.
    UnsupportedConstruct(String),
    /// The numeric backend rejected an operation.
    DomainOperationFailure(DomainError),
    /// A constructor invocation or an aliased allocation site has no matching
    /// construction record.
    MissingAllocationRecord(String),
    /// The fixpoint hit the iteration cap before stabilizing; its states are partial.
    IterationLimit(usize),
}

impl From<DomainError> for AnalysisError {
    fn from(e: DomainError) -> Self {
        AnalysisError::DomainOperationFailure(e)
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::UnsupportedConstruct(what) => write!(f, "unsupported construct: {}", what),
            AnalysisError::DomainOperationFailure(e) => write!(f, "domain operation failed: {}", e),
            AnalysisError::MissingAllocationRecord(what) => write!(f, "missing allocation record: {}", what),
            AnalysisError::IterationLimit(n) => write!(f, "no fixpoint after {} iterations", n),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::DomainOperationFailure(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::error::Error;

    use test_log::test;

    use super::*;

    #[test]
    fn test_display() {
        let e = AnalysisError::UnsupportedConstruct("i0 / i1".to_string());
        assert_eq!(e.to_string(), "unsupported construct: i0 / i1");
        let e: AnalysisError = DomainError::UnknownVariable("x".to_string()).into();
        assert_eq!(e.to_string(), "domain operation failed: unknown variable `x`");
        assert!(e.source().is_some());
    }
}
