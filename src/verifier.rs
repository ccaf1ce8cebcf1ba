//! Weld-range verification.
//!
//! For every non-constructor method of a class, the verifier runs the interval
//! [`Analysis`] and then inspects each call site of the two weld operations:
//!
//! - `r.weldAt(p)` passes if, for every allocation site `r` may refer to, the
//!   interval of `p` before the call overlaps the site's `[left, right]`;
//! - `r.weldBetween(lo, hi)` passes if the hull of `lo` and `hi` is contained
//!   in every aliased site's `[left, right]`.
//!
//! An argument whose interval is ⊥ sits in unreachable code and passes. The
//! per-class verdicts are the conjunction over all call sites of all methods.

use std::fmt;

use crate::alias::{AliasOracle, LocalPointsTo};
use crate::allocation::AllocationRecorder;
use crate::config::{AnalysisConfig, ErrorPolicy};
use crate::domain::{IntervalBoxes, NumericDomain};
use crate::error::{AnalysisError, Result};
use crate::fixpoint::Analysis;
use crate::interval::Interval;
use crate::ir::{AllocSite, Call, Class, Method, MethodId, PointId, Stmt, Value};
use crate::transfer::Evaluator;

/// The two checked properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    PointInRange,
    RangeContained,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::PointInRange => write!(f, "point-in-range"),
            Check::RangeContained => write!(f, "range-contained"),
        }
    }
}

/// A call site that breaks a check, with the witnessing allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub method: String,
    pub point: PointId,
    pub check: Check,
    /// Interval of the checked argument (or hull of both arguments).
    pub value: Interval,
    pub site: AllocSite,
    /// Recorded `[left, right]` of the allocation.
    pub range: Interval,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = match self.check {
            Check::PointInRange => "does not overlap",
            Check::RangeContained => "is not contained in",
        };
        write!(
            f,
            "{} {}: {} {} {} of {}",
            self.method, self.point, self.value, relation, self.range, self.site
        )
    }
}

/// Internal failure that prevented a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub method: String,
    pub point: Option<PointId>,
    /// `None` when the failure affects both checks.
    pub check: Option<Check>,
    pub error: AnalysisError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method)?;
        if let Some(point) = self.point {
            write!(f, " {}", point)?;
        }
        if let Some(check) = self.check {
            write!(f, " ({})", check)?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Verdicts for one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReport {
    pub class: String,
    pub point_in_range: bool,
    pub range_contained: bool,
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ClassReport {
    fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            point_in_range: true,
            range_contained: true,
            violations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn verdict(&self, check: Check) -> bool {
        match check {
            Check::PointInRange => self.point_in_range,
            Check::RangeContained => self.range_contained,
        }
    }

    fn fail(&mut self, check: Option<Check>) {
        match check {
            Some(Check::PointInRange) => self.point_in_range = false,
            Some(Check::RangeContained) => self.range_contained = false,
            None => {
                self.point_in_range = false;
                self.range_contained = false;
            }
        }
    }
}

impl fmt::Display for ClassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ok = |b: bool| if b { "OK" } else { "NOT_OK" };
        writeln!(f, "{} WELD_AT_{}", self.class, ok(self.point_in_range))?;
        write!(f, "{} WELD_BETWEEN_{}", self.class, ok(self.range_contained))
    }
}

/// Allocation bounds `[left, right]` from the first two constructor arguments.
pub fn allocation_range(allocations: &AllocationRecorder, site: AllocSite) -> Result<Interval> {
    let args = allocations
        .args(site)
        .ok_or_else(|| AnalysisError::MissingAllocationRecord(format!("no constructor arguments for {}", site)))?;
    match args {
        [Value::Const(left), Value::Const(right), ..] => Ok(Interval::finite(*left, *right)),
        _ => Err(AnalysisError::UnsupportedConstruct(format!(
            "non-literal bounds for {}",
            site
        ))),
    }
}

/// Second pass over the call sites of analyzed methods.
pub struct Verifier<'a, D: NumericDomain> {
    domain: &'a D,
    config: &'a AnalysisConfig,
}

impl<'a, D: NumericDomain> Verifier<'a, D> {
    pub fn new(domain: &'a D, config: &'a AnalysisConfig) -> Self {
        Self { domain, config }
    }

    /// Analyze and verify every non-constructor method of `class`.
    pub fn verify_class<A: AliasOracle>(&self, class: &Class, alias: &A) -> ClassReport {
        let mut report = ClassReport::new(&class.name);
        for (id, method) in class.indexed_methods().filter(|(_, m)| !m.is_constructor()) {
            self.verify_method(class, id, method, alias, &mut report);
        }
        log::info!(
            "{}: point-in-range={}, range-contained={} ({} violations, {} diagnostics)",
            class.name,
            report.point_in_range,
            report.range_contained,
            report.violations.len(),
            report.diagnostics.len()
        );
        report
    }

    fn verify_method<A: AliasOracle>(
        &self,
        class: &Class,
        id: MethodId,
        method: &Method,
        alias: &A,
        report: &mut ClassReport,
    ) {
        log::debug!("Verifying {}.{}", class.name, method.name);
        let mut analysis = match Analysis::new(self.domain, class, method, self.config) {
            Ok(analysis) => analysis,
            Err(error) => {
                self.record_failure(report, method, None, None, error);
                return;
            }
        };
        analysis.run();
        if !analysis.converged() {
            let error = AnalysisError::IterationLimit(self.config.max_iterations);
            self.record_failure(report, method, None, None, error);
            return;
        }
        for (&point, error) in analysis.failures() {
            self.record_failure(report, method, Some(point), None, error.clone());
        }

        for (point, stmt) in method.points() {
            let Stmt::Invoke(call) = stmt else {
                continue;
            };
            let Some(receiver) = &call.receiver else {
                continue;
            };
            let (check, outcome) = if call.method == self.config.point_operation && call.args.len() == 1 {
                (Check::PointInRange, self.check_point(&analysis, alias, id, point, receiver, call))
            } else if call.method == self.config.range_operation && call.args.len() == 2 {
                (Check::RangeContained, self.check_range(&analysis, alias, id, point, receiver, call))
            } else {
                continue;
            };
            match outcome {
                Ok(None) => log::trace!("{}.{} {} `{}`: ok", class.name, method.name, point, call),
                Ok(Some(violation)) => {
                    log::info!("{}.{}: {} violated: {}", class.name, method.name, check, violation);
                    report.fail(Some(check));
                    report.violations.push(violation);
                }
                Err(error) => self.record_failure(report, method, Some(point), Some(check), error),
            }
        }
    }

    fn record_failure(
        &self,
        report: &mut ClassReport,
        method: &Method,
        point: Option<PointId>,
        check: Option<Check>,
        error: AnalysisError,
    ) {
        let diagnostic = Diagnostic {
            method: method.name.clone(),
            point,
            check,
            error,
        };
        log::warn!("{}.{}", report.class, diagnostic);
        if self.config.error_policy == ErrorPolicy::Strict {
            report.fail(check);
        }
        report.diagnostics.push(diagnostic);
    }

    fn check_point<A: AliasOracle>(
        &self,
        analysis: &Analysis<'_, D>,
        alias: &A,
        id: MethodId,
        point: PointId,
        receiver: &str,
        call: &Call,
    ) -> Result<Option<Violation>> {
        let evaluator = Evaluator::new(self.domain, analysis.class(), analysis.method());
        let value = evaluator.coerce(analysis.flow_before(point), &call.args[0])?;
        if value.is_bottom() {
            return Ok(None);
        }
        for site in alias.reaching_allocations(id, receiver, point) {
            let range = allocation_range(analysis.allocations(), site)?;
            if !value.overlaps(&range) {
                return Ok(Some(self.violation(analysis, point, Check::PointInRange, value, site, range)));
            }
        }
        Ok(None)
    }

    fn check_range<A: AliasOracle>(
        &self,
        analysis: &Analysis<'_, D>,
        alias: &A,
        id: MethodId,
        point: PointId,
        receiver: &str,
        call: &Call,
    ) -> Result<Option<Violation>> {
        let evaluator = Evaluator::new(self.domain, analysis.class(), analysis.method());
        let state = analysis.flow_before(point);
        let lo = evaluator.coerce(state, &call.args[0])?;
        let hi = evaluator.coerce(state, &call.args[1])?;
        if lo.is_bottom() || hi.is_bottom() {
            return Ok(None);
        }
        let hull = lo.join(&hi);
        for site in alias.reaching_allocations(id, receiver, point) {
            let range = allocation_range(analysis.allocations(), site)?;
            if !hull.is_subset_of(&range) {
                return Ok(Some(self.violation(analysis, point, Check::RangeContained, hull, site, range)));
            }
        }
        Ok(None)
    }

    fn violation(
        &self,
        analysis: &Analysis<'_, D>,
        point: PointId,
        check: Check,
        value: Interval,
        site: AllocSite,
        range: Interval,
    ) -> Violation {
        Violation {
            method: analysis.method().name.clone(),
            point,
            check,
            value,
            site,
            range,
        }
    }
}

/// Verify `class` with interval boxes and [`LocalPointsTo`] aliasing.
pub fn verify_class(class: &Class, config: &AnalysisConfig) -> ClassReport {
    let alias = LocalPointsTo::analyze(class);
    Verifier::new(&IntervalBoxes, config).verify_class(class, &alias)
}
