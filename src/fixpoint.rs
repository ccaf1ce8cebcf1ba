//! Forward, branch-sensitive fixpoint driver.
//!
//! The driver keeps one in-state ("flow before") and one [`Flow`] ("flow
//! after") per program point and iterates a worklist until no state changes:
//!
//! - the entry point starts from ⊤, every other point from ⊥;
//! - the in-state of a point is the join of the states flowing along its
//!   incoming edges (the taken state along branch edges, the fallthrough state
//!   along the others);
//! - at loop headers the new in-state is combined with the previous one, by
//!   join for the first merges and by widening once the header's counter
//!   reaches the widening threshold.
//!
//! A statement whose transfer fails is recorded in [`Analysis::failures`] and
//! produces ⊥, so one bad statement never pollutes the states of other points.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::allocation::AllocationRecorder;
use crate::cfg::ControlFlowGraph;
use crate::config::AnalysisConfig;
use crate::domain::{IntervalBoxes, NumericDomain};
use crate::env::Environment;
use crate::error::{AnalysisError, DomainError, Result};
use crate::ir::{Class, Method, PointId, Stmt};
use crate::loops::{widening_points, LoopDetector, LoopInfo};
use crate::state::AbstractState;
use crate::transfer::{Evaluator, Flow};

/// Environment of a procedure: its integral locals, the integral fields of
/// its class, and the scratch real.
pub fn build_environment(class: &Class, method: &Method) -> Result<Environment, DomainError> {
    let locals = method
        .locals
        .iter()
        .filter(|v| v.ty.is_integral())
        .map(|v| v.name.as_str());
    Environment::with_scratch(locals.chain(class.integral_fields()))
}

/// Interval analysis of one method.
pub struct Analysis<'a, D: NumericDomain> {
    domain: &'a D,
    class: &'a Class,
    method: &'a Method,
    config: &'a AnalysisConfig,
    env: Rc<Environment>,
    cfg: ControlFlowGraph,
    loops: Vec<LoopInfo>,
    widening_points: BTreeSet<PointId>,
    /// Merge counter per widening point.
    counters: BTreeMap<PointId, usize>,
    before: Vec<AbstractState<D>>,
    after: Vec<Option<Flow<AbstractState<D>>>>,
    failures: BTreeMap<PointId, AnalysisError>,
    allocations: AllocationRecorder,
    iterations: usize,
    converged: bool,
}

impl<'a, D: NumericDomain> Analysis<'a, D> {
    /// Prepare the analysis of `method`: build its environment, CFG and loop
    /// structure, and initialize every point to ⊥.
    pub fn new(domain: &'a D, class: &'a Class, method: &'a Method, config: &'a AnalysisConfig) -> Result<Self> {
        let env = Rc::new(build_environment(class, method)?);
        let cfg = ControlFlowGraph::from_method(method)?;
        let loops = LoopDetector::detect(&cfg);
        let widening_points = widening_points(&cfg, &loops);
        let counters = widening_points.iter().map(|&p| (p, 0)).collect();
        let bottom = AbstractState::bottom(domain, &env)?;

        log::debug!(
            "Analysis of {}.{}: {} points, {} loops, env {}",
            class.name,
            method.name,
            cfg.len(),
            loops.len(),
            env
        );

        Ok(Self {
            domain,
            class,
            method,
            config,
            env,
            before: vec![bottom; cfg.len()],
            after: vec![None; cfg.len()],
            cfg,
            loops,
            widening_points,
            counters,
            failures: BTreeMap::new(),
            allocations: AllocationRecorder::new(),
            iterations: 0,
            converged: false,
        })
    }

    /// Iterate to a fixpoint.
    ///
    /// Calling `run` again on a stabilized analysis leaves every state unchanged.
    pub fn run(&mut self) {
        let evaluator = Evaluator::new(self.domain, self.class, self.method);
        let mut worklist: VecDeque<PointId> = self.cfg.reverse_postorder().into();
        let mut queued = vec![true; self.cfg.len()];
        self.iterations = 0;
        self.converged = true;

        while let Some(point) = worklist.pop_front() {
            queued[point.0] = false;
            self.iterations += 1;
            if self.iterations > self.config.max_iterations {
                log::warn!(
                    "Fixpoint of {}.{} did not converge after {} iterations",
                    self.class.name,
                    self.method.name,
                    self.config.max_iterations
                );
                self.converged = false;
                break;
            }

            let state_in = match self.merge(point) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("{}.{} {}: merge failed: {}", self.class.name, self.method.name, point, e);
                    self.failures.insert(point, e.into());
                    continue;
                }
            };
            if self.after[point.0].is_some() && state_in == self.before[point.0] {
                continue;
            }
            self.before[point.0] = state_in;

            let stmt = self.method.stmt(point);
            let flow = match evaluator.transfer(stmt, &self.before[point.0], &mut self.allocations) {
                Ok(flow) => {
                    self.failures.remove(&point);
                    flow
                }
                Err(e) => {
                    log::warn!("{}.{} {} `{}`: {}", self.class.name, self.method.name, point, stmt, e);
                    self.failures.insert(point, e);
                    match self.bottom_flow(stmt) {
                        Ok(flow) => flow,
                        Err(e) => {
                            self.failures.insert(point, e.into());
                            continue;
                        }
                    }
                }
            };
            log::trace!("Flowing through {} `{}`", point, stmt);

            if self.after[point.0].as_ref() != Some(&flow) {
                self.after[point.0] = Some(flow);
                for succ in self.cfg.successors(point) {
                    if !queued[succ.0] {
                        queued[succ.0] = true;
                        worklist.push_back(succ);
                    }
                }
            }
        }

        if self.converged {
            log::debug!(
                "Fixpoint of {}.{} converged after {} iterations",
                self.class.name,
                self.method.name,
                self.iterations
            );
        }
    }

    /// In-state of `point` from the current states of its predecessors.
    fn merge(&mut self, point: PointId) -> Result<AbstractState<D>, DomainError> {
        let mut incoming = if point == self.cfg.entry {
            AbstractState::top(self.domain, &self.env)?
        } else {
            AbstractState::bottom(self.domain, &self.env)?
        };
        for edge in self.cfg.incoming(point) {
            if let Some(flow) = &self.after[edge.from.0] {
                incoming = incoming.join(self.domain, flow.on_edge(edge.kind))?;
            }
        }

        let Some(counter) = self.counters.get_mut(&point) else {
            return Ok(incoming);
        };
        *counter += 1;
        let previous = &self.before[point.0];
        if *counter < self.config.widening_threshold {
            previous.join(self.domain, &incoming)
        } else {
            log::trace!("Widening at {} (merge {})", point, counter);
            previous.widen(self.domain, &incoming)
        }
    }

    fn bottom_flow(&self, stmt: &Stmt) -> Result<Flow<AbstractState<D>>, DomainError> {
        let bottom = AbstractState::bottom(self.domain, &self.env)?;
        Ok(match stmt {
            Stmt::If { .. } => Flow::Branch {
                taken: bottom.clone(),
                fallthrough: bottom,
            },
            _ => Flow::Single(bottom),
        })
    }

    pub fn domain(&self) -> &'a D {
        self.domain
    }

    pub fn class(&self) -> &'a Class {
        self.class
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    pub fn cfg(&self) -> &ControlFlowGraph {
        &self.cfg
    }

    pub fn loops(&self) -> &[LoopInfo] {
        &self.loops
    }

    /// Loop headers and other targets of retreating edges.
    pub fn widening_points(&self) -> &BTreeSet<PointId> {
        &self.widening_points
    }

    /// State immediately before `point`.
    pub fn flow_before(&self, point: PointId) -> &AbstractState<D> {
        &self.before[point.0]
    }

    /// Outgoing state(s) of `point`; `None` before the first visit.
    pub fn flow_after(&self, point: PointId) -> Option<&Flow<AbstractState<D>>> {
        self.after[point.0].as_ref()
    }

    /// Statements whose transfer failed in the latest visit.
    pub fn failures(&self) -> &BTreeMap<PointId, AnalysisError> {
        &self.failures
    }

    /// Point visits performed by the latest [`run`](Self::run).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn allocations(&self) -> &AllocationRecorder {
        &self.allocations
    }

    /// Merge counter of a widening point; `None` for other points.
    pub fn loop_counter(&self, point: PointId) -> Option<usize> {
        self.counters.get(&point).copied()
    }
}

impl fmt::Display for Analysis<'_, IntervalBoxes> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}.{}:", self.class.name, self.method.name)?;
        for (point, stmt) in self.method.points() {
            write!(f, "  {:>4}: {:<40} {}", point, stmt.to_string(), self.flow_before(point))?;
            if let Some(e) = self.failures.get(&point) {
                write!(f, "  !! {}", e)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::ClassBuilder;
    use crate::condition::CmpOp;
    use crate::interval::{Bound, Interval};
    use crate::ir::{BinOp, Type, Value};

    fn class_with<F: FnOnce(&mut crate::builder::MethodBuilder)>(body: F) -> Class {
        let mut class = ClassBuilder::new("C");
        class.method("run", body);
        class.build()
    }

    fn bound(analysis: &Analysis<'_, IntervalBoxes>, point: usize, var: &str) -> Interval {
        analysis.flow_before(PointId(point)).bound(&IntervalBoxes, var).unwrap()
    }

    #[test]
    fn test_straight_line() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            m.local("i1", Type::Int);
            m.assign("i0", 3); // #0
            m.binary("i1", BinOp::Mul, Value::local("i0"), 4); // #1
            m.ret(); // #2
        });
        let config = AnalysisConfig::default();
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        assert!(analysis.converged());
        assert!(analysis.failures().is_empty());
        assert!(analysis.flow_before(PointId(0)).element().bindings().len() == 3);
        assert_eq!(bound(&analysis, 0, "i0"), Interval::top());
        assert_eq!(bound(&analysis, 2, "i0"), Interval::constant(3));
        assert_eq!(bound(&analysis, 2, "i1"), Interval::constant(12));
    }

    #[test]
    fn test_counting_loop_widens_and_refines() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            let head = m.label();
            let exit = m.label();
            m.assign("i0", 0); // #0
            m.bind(head);
            m.branch(CmpOp::Ge, Value::local("i0"), 10, exit); // #1
            m.binary("i0", BinOp::Add, Value::local("i0"), 1); // #2
            m.goto(head); // #3
            m.bind(exit);
            m.ret(); // #4
        });
        let config = AnalysisConfig::default();
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        assert!(analysis.converged());

        let head = bound(&analysis, 1, "i0");
        assert_eq!(head.low, Bound::Finite(0));
        assert_eq!(bound(&analysis, 2, "i0"), Interval::new(Bound::Finite(0), Bound::Finite(9)));
        assert_eq!(bound(&analysis, 4, "i0").low, Bound::Finite(10));
        assert!(analysis.loop_counter(PointId(1)).unwrap() >= 1);
        assert_eq!(analysis.loop_counter(PointId(2)), None);
    }

    #[test]
    fn test_unbounded_loop_terminates() {
        // while (p > 0) i0 = i0 + 1;  with p unknown
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            m.local("i1", Type::Int);
            let head = m.label();
            let exit = m.label();
            m.assign("i0", 0); // #0
            m.param("i1", 0); // #1
            m.bind(head);
            m.branch(CmpOp::Le, Value::local("i1"), 0, exit); // #2
            m.binary("i0", BinOp::Add, Value::local("i0"), 1); // #3
            m.goto(head); // #4
            m.bind(exit);
            m.ret(); // #5
        });
        let config = AnalysisConfig::default().with_max_iterations(200);
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        assert!(analysis.converged());
        assert!(analysis.iterations() < 200);
        assert_eq!(bound(&analysis, 5, "i0"), Interval::new(Bound::Finite(0), Bound::PosInf));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            let head = m.label();
            let exit = m.label();
            m.assign("i0", 0);
            m.bind(head);
            m.branch(CmpOp::Ge, Value::local("i0"), 100, exit);
            m.binary("i0", BinOp::Add, Value::local("i0"), 2);
            m.goto(head);
            m.bind(exit);
            m.ret();
        });
        let config = AnalysisConfig::default();
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        let before: Vec<_> = (0..5).map(|p| analysis.flow_before(PointId(p)).clone()).collect();
        let after: Vec<_> = (0..5).map(|p| analysis.flow_after(PointId(p)).cloned()).collect();
        analysis.run();
        assert!(analysis.converged());
        for p in 0..5 {
            assert_eq!(analysis.flow_before(PointId(p)), &before[p]);
            assert_eq!(analysis.flow_after(PointId(p)).cloned(), after[p]);
        }
    }

    #[test]
    fn test_failure_is_local() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            m.local("i1", Type::Int);
            m.assign("i0", 4); // #0
            m.binary("i1", BinOp::Div, Value::local("i0"), 2); // #1
            m.assign("i1", 7); // #2
            m.ret(); // #3
        });
        let config = AnalysisConfig::default();
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        assert_eq!(analysis.failures().len(), 1);
        assert!(matches!(
            analysis.failures().get(&PointId(1)),
            Some(AnalysisError::UnsupportedConstruct(_))
        ));
        assert_eq!(bound(&analysis, 1, "i0"), Interval::constant(4));
        assert!(analysis.flow_before(PointId(2)).is_bottom(&IntervalBoxes));
    }

    #[test]
    fn test_branch_feeds_correct_successors() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            let big = m.label();
            let join = m.label();
            m.param("i0", 0); // #0
            m.branch(CmpOp::Gt, Value::local("i0"), 5, big); // #1
            m.assign("i0", 0); // #2 (i0 <= 5)
            m.goto(join); // #3
            m.bind(big);
            m.nop(); // #4 (i0 > 5)
            m.bind(join);
            m.ret(); // #5
        });
        let config = AnalysisConfig::default();
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        assert_eq!(bound(&analysis, 2, "i0"), Interval::new(Bound::NegInf, Bound::Finite(5)));
        assert_eq!(bound(&analysis, 4, "i0"), Interval::new(Bound::Finite(6), Bound::PosInf));
        assert_eq!(bound(&analysis, 5, "i0"), Interval::new(Bound::Finite(0), Bound::PosInf));
    }

    #[test]
    fn test_iteration_cap() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            let head = m.label();
            m.assign("i0", 0);
            m.bind(head);
            m.binary("i0", BinOp::Add, Value::local("i0"), 1);
            m.goto(head);
        });
        let config = AnalysisConfig::default().with_max_iterations(3);
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        assert!(!analysis.converged());
    }

    #[test]
    fn test_bad_environment() {
        let mut class = ClassBuilder::new("C");
        class.field("i0", Type::Int);
        class.method("run", |m| {
            m.local("i0", Type::Int);
            m.ret();
        });
        let class = class.build();
        let config = AnalysisConfig::default();
        let err = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).err().unwrap();
        assert_eq!(
            err,
            AnalysisError::DomainOperationFailure(DomainError::DuplicateVariable("i0".to_string()))
        );
    }

    #[test]
    fn test_display() {
        let class = class_with(|m| {
            m.local("i0", Type::Int);
            m.assign("i0", 1);
            m.ret();
        });
        let config = AnalysisConfig::default();
        let mut analysis = Analysis::new(&IntervalBoxes, &class, &class.methods[0], &config).unwrap();
        analysis.run();
        let text = analysis.to_string();
        assert!(text.starts_with("C.run:"));
        assert!(text.contains("{i0 ∈ [1, 1]}"));
    }
}
