//! Loop detection over the statement-level CFG.
//!
//! Natural loops are found with dominator analysis: an edge `tail -> header`
//! is a back edge when `header` dominates `tail`. The analysis widens at loop
//! headers, so [`widening_points`] also adds targets of retreating edges that
//! are not dominated back edges (irreducible cycles).
//!
//! ## Example
//!
//! ```rust
//! use weld_verifier::builder::ClassBuilder;
//! use weld_verifier::cfg::ControlFlowGraph;
//! use weld_verifier::condition::CmpOp;
//! use weld_verifier::ir::{PointId, Type, Value};
//! use weld_verifier::loops::LoopDetector;
//!
//! let mut class = ClassBuilder::new("Spin");
//! class.method("run", |m| {
//!     m.local("i0", Type::Int);
//!     let head = m.label();
//!     m.assign("i0", 0);
//!     m.bind(head);
//!     m.branch(CmpOp::Lt, Value::local("i0"), 3, head);
//!     m.ret();
//! });
//! let method = class.build().methods.remove(0);
//! let cfg = ControlFlowGraph::from_method(&method).unwrap();
//! let loops = LoopDetector::detect(&cfg);
//! assert_eq!(loops.len(), 1);
//! assert_eq!(loops[0].header, PointId(1));
//! ```

use std::collections::{BTreeSet, VecDeque};

use crate::cfg::ControlFlowGraph;
use crate::ir::PointId;

/// Information about a natural loop.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    /// Target of the back edges.
    pub header: PointId,
    /// Sources of the back edges.
    pub latches: Vec<PointId>,
    /// All points of the loop except the header.
    pub body: BTreeSet<PointId>,
    /// Points outside the loop reached from inside it.
    pub exit_targets: Vec<PointId>,
    /// Nesting depth (0 = outermost).
    pub nesting_depth: usize,
    /// Header of the enclosing loop, if nested.
    pub parent: Option<PointId>,
}

impl LoopInfo {
    /// Check if a point is part of this loop (header or body).
    pub fn contains(&self, point: PointId) -> bool {
        point == self.header || self.body.contains(&point)
    }

    pub fn is_back_edge(&self, from: PointId, to: PointId) -> bool {
        to == self.header && self.latches.contains(&from)
    }
}

/// Detector for natural loops in a CFG.
pub struct LoopDetector {
    /// `dominators[p]` is `None` for points unreachable from the entry.
    dominators: Vec<Option<BTreeSet<PointId>>>,
    loops: Vec<LoopInfo>,
}

impl LoopDetector {
    /// Detect all natural loops, one [`LoopInfo`] per header.
    pub fn detect(cfg: &ControlFlowGraph) -> Vec<LoopInfo> {
        let mut detector = Self {
            dominators: Vec::new(),
            loops: Vec::new(),
        };

        detector.compute_dominators(cfg);
        detector.find_back_edges(cfg);
        detector.compute_loop_bodies(cfg);
        detector.compute_nesting();

        detector.loops
    }

    /// Iterative dataflow: `Dom(p) = {p} ∪ ⋂ Dom(pred)`.
    fn compute_dominators(&mut self, cfg: &ControlFlowGraph) {
        let n = cfg.len();
        self.dominators = vec![None; n];
        if n == 0 {
            return;
        }

        let order = cfg.reverse_postorder();
        let reachable = reachable_from_entry(cfg);
        let all: BTreeSet<PointId> = cfg.points().filter(|p| reachable[p.0]).collect();
        for p in cfg.points().filter(|p| reachable[p.0]) {
            self.dominators[p.0] = Some(if p == cfg.entry {
                BTreeSet::from([cfg.entry])
            } else {
                all.clone()
            });
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &p in order.iter().filter(|p| reachable[p.0]) {
                if p == cfg.entry {
                    continue;
                }
                let mut new_dom: Option<BTreeSet<PointId>> = None;
                for pred in cfg.predecessors(p) {
                    let Some(pred_dom) = &self.dominators[pred.0] else {
                        continue;
                    };
                    new_dom = Some(match new_dom {
                        None => pred_dom.clone(),
                        Some(acc) => acc.intersection(pred_dom).copied().collect(),
                    });
                }
                let mut new_dom = new_dom.unwrap_or_default();
                new_dom.insert(p);
                if self.dominators[p.0].as_ref() != Some(&new_dom) {
                    self.dominators[p.0] = Some(new_dom);
                    changed = true;
                }
            }
        }
    }

    fn dominates(&self, a: PointId, b: PointId) -> bool {
        self.dominators[b.0].as_ref().is_some_and(|doms| doms.contains(&a))
    }

    fn find_back_edges(&mut self, cfg: &ControlFlowGraph) {
        for p in cfg.points() {
            for succ in cfg.successors(p) {
                if !self.dominates(succ, p) {
                    continue;
                }
                match self.loops.iter_mut().find(|l| l.header == succ) {
                    Some(info) => {
                        if !info.latches.contains(&p) {
                            info.latches.push(p);
                        }
                    }
                    None => self.loops.push(LoopInfo {
                        header: succ,
                        latches: vec![p],
                        body: BTreeSet::new(),
                        exit_targets: Vec::new(),
                        nesting_depth: 0,
                        parent: None,
                    }),
                }
            }
        }
    }

    /// Backward reachability from the latches without crossing the header.
    fn compute_loop_bodies(&mut self, cfg: &ControlFlowGraph) {
        for info in &mut self.loops {
            let mut body = BTreeSet::from([info.header]);
            let mut worklist = VecDeque::new();
            for &latch in &info.latches {
                if body.insert(latch) {
                    worklist.push_back(latch);
                }
            }

            while let Some(p) = worklist.pop_front() {
                for pred in cfg.predecessors(p) {
                    if body.insert(pred) {
                        worklist.push_back(pred);
                    }
                }
            }

            for &p in &body {
                for succ in cfg.successors(p) {
                    if !body.contains(&succ) && !info.exit_targets.contains(&succ) {
                        info.exit_targets.push(succ);
                    }
                }
            }

            body.remove(&info.header);
            info.body = body;
        }
    }

    fn compute_nesting(&mut self) {
        // Smaller bodies are nested deeper.
        self.loops.sort_by_key(|l| (l.body.len(), l.header));

        for i in (0..self.loops.len()).rev() {
            let header = self.loops[i].header;
            let parent = (i + 1..self.loops.len()).find(|&j| self.loops[j].body.contains(&header));
            if let Some(j) = parent {
                self.loops[i].parent = Some(self.loops[j].header);
                self.loops[i].nesting_depth = self.loops[j].nesting_depth + 1;
            }
        }
    }
}

fn reachable_from_entry(cfg: &ControlFlowGraph) -> Vec<bool> {
    let mut seen = vec![false; cfg.len()];
    if cfg.is_empty() {
        return seen;
    }
    let mut stack = vec![cfg.entry];
    seen[cfg.entry.0] = true;
    while let Some(p) = stack.pop() {
        for succ in cfg.successors(p) {
            if !seen[succ.0] {
                seen[succ.0] = true;
                stack.push(succ);
            }
        }
    }
    seen
}

/// Innermost loop containing `point`.
pub fn find_containing_loop(point: PointId, loops: &[LoopInfo]) -> Option<&LoopInfo> {
    loops.iter().filter(|l| l.contains(point)).min_by_key(|l| l.body.len())
}

pub fn is_back_edge(from: PointId, to: PointId, loops: &[LoopInfo]) -> bool {
    loops.iter().any(|l| l.is_back_edge(from, to))
}

/// Points where the analysis applies widening: loop headers, plus targets of
/// edges that go backwards in reverse postorder.
pub fn widening_points(cfg: &ControlFlowGraph, loops: &[LoopInfo]) -> BTreeSet<PointId> {
    let mut points: BTreeSet<PointId> = loops.iter().map(|l| l.header).collect();
    let order = cfg.reverse_postorder();
    let mut rank = vec![0usize; cfg.len()];
    for (i, p) in order.iter().enumerate() {
        rank[p.0] = i;
    }
    for p in cfg.points() {
        for succ in cfg.successors(p) {
            if rank[succ.0] <= rank[p.0] {
                points.insert(succ);
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::ClassBuilder;
    use crate::condition::CmpOp;
    use crate::ir::{BinOp, Method, Type, Value};

    fn simple_loop() -> Method {
        let mut class = ClassBuilder::new("C");
        class.method("run", |m| {
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
        class.build().methods.remove(0)
    }

    fn nested_loops() -> Method {
        let mut class = ClassBuilder::new("C");
        class.method("run", |m| {
            m.local("i0", Type::Int);
            m.local("i1", Type::Int);
            let outer = m.label();
            let inner = m.label();
            let inner_exit = m.label();
            let exit = m.label();
            m.assign("i0", 0); // #0
            m.bind(outer);
            m.branch(CmpOp::Ge, Value::local("i0"), 3, exit); // #1
            m.assign("i1", 0); // #2
            m.bind(inner);
            m.branch(CmpOp::Ge, Value::local("i1"), 3, inner_exit); // #3
            m.binary("i1", BinOp::Add, Value::local("i1"), 1); // #4
            m.goto(inner); // #5
            m.bind(inner_exit);
            m.binary("i0", BinOp::Add, Value::local("i0"), 1); // #6
            m.goto(outer); // #7
            m.bind(exit);
            m.ret(); // #8
        });
        class.build().methods.remove(0)
    }

    #[test]
    fn test_loop_detection() {
        let method = simple_loop();
        let cfg = ControlFlowGraph::from_method(&method).unwrap();
        let loops = LoopDetector::detect(&cfg);

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header, PointId(1));
        assert_eq!(loops[0].latches, vec![PointId(3)]);
        assert_eq!(loops[0].body, BTreeSet::from([PointId(2), PointId(3)]));
        assert_eq!(loops[0].exit_targets, vec![PointId(4)]);
        assert!(is_back_edge(PointId(3), PointId(1), &loops));
        assert!(!is_back_edge(PointId(0), PointId(1), &loops));
    }

    #[test]
    fn test_nested_loops() {
        let method = nested_loops();
        let cfg = ControlFlowGraph::from_method(&method).unwrap();
        let loops = LoopDetector::detect(&cfg);

        assert_eq!(loops.len(), 2);
        let inner = find_containing_loop(PointId(4), &loops).unwrap();
        assert_eq!(inner.header, PointId(3));
        assert_eq!(inner.parent, Some(PointId(1)));
        assert_eq!(inner.nesting_depth, 1);
        let outer = find_containing_loop(PointId(6), &loops).unwrap();
        assert_eq!(outer.header, PointId(1));
        assert_eq!(outer.parent, None);
        assert!(outer.contains(PointId(4)));
    }

    #[test]
    fn test_no_loops() {
        let mut class = ClassBuilder::new("C");
        class.method("m", |m| {
            m.local("i0", Type::Int);
            let skip = m.label();
            m.branch(CmpOp::Eq, Value::local("i0"), 0, skip);
            m.assign("i0", 1);
            m.bind(skip);
            m.ret();
        });
        let method = class.build().methods.remove(0);
        let cfg = ControlFlowGraph::from_method(&method).unwrap();
        assert!(LoopDetector::detect(&cfg).is_empty());
        assert!(widening_points(&cfg, &[]).is_empty());
    }

    #[test]
    fn test_self_loop() {
        let mut class = ClassBuilder::new("C");
        class.method("m", |m| {
            let spin = m.label();
            m.bind(spin);
            m.goto(spin);
        });
        let method = class.build().methods.remove(0);
        let cfg = ControlFlowGraph::from_method(&method).unwrap();
        let loops = LoopDetector::detect(&cfg);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header, PointId(0));
        assert!(loops[0].body.is_empty());
    }

    #[test]
    fn test_widening_points_cover_headers() {
        let method = nested_loops();
        let cfg = ControlFlowGraph::from_method(&method).unwrap();
        let loops = LoopDetector::detect(&cfg);
        assert_eq!(widening_points(&cfg, &loops), BTreeSet::from([PointId(1), PointId(3)]));
    }
}
