//! Analysis configuration.

use std::fmt;

/// How the verifier treats internal analysis failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// A failing call site or procedure contributes no constraint; the failure
    /// is logged and kept as a diagnostic.
    #[default]
    Lenient,
    /// A failure makes the affected verdict NOT_OK.
    Strict,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Lenient => write!(f, "lenient"),
            ErrorPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Knobs of one analysis run.
///
/// ## Example
///
/// ```rust
/// use weld_verifier::config::{AnalysisConfig, ErrorPolicy};
///
/// let config = AnalysisConfig::default()
///     .with_widening_threshold(3)
///     .with_error_policy(ErrorPolicy::Strict);
/// assert_eq!(config.widening_threshold, 3);
/// assert_eq!(config.point_operation, "weldAt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Number of merges at a loop header after which join is replaced by widening.
    pub widening_threshold: usize,
    /// Upper bound on point visits per procedure.
    pub max_iterations: usize,
    /// Method name of the single-point check (`r.weldAt(p)`).
    pub point_operation: String,
    /// Method name of the range check (`r.weldBetween(lo, hi)`).
    pub range_operation: String,
    pub error_policy: ErrorPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            widening_threshold: 6,
            max_iterations: 10_000,
            point_operation: "weldAt".to_string(),
            range_operation: "weldBetween".to_string(),
            error_policy: ErrorPolicy::Lenient,
        }
    }
}

impl AnalysisConfig {
    pub fn with_widening_threshold(mut self, threshold: usize) -> Self {
        self.widening_threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_operations(mut self, point: impl Into<String>, range: impl Into<String>) -> Self {
        self.point_operation = point.into();
        self.range_operation = range.into();
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}
