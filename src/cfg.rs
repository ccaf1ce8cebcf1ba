//! Statement-level control flow graph.
//!
//! Every statement of a method is one node. Edges carry an [`EdgeKind`] so that
//! the analysis can route the two outputs of a conditional branch to the right
//! successors.

use std::fmt::Write as _;

use crate::error::{AnalysisError, Result};
use crate::ir::{Method, PointId, Stmt};

/// Kind of a control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Sequential flow to the next statement, including the not-taken side of a branch.
    Fallthrough,
    /// Unconditional jump.
    Jump,
    /// Taken side of a conditional branch.
    Branch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: PointId,
    pub to: PointId,
    pub kind: EdgeKind,
}

/// Control flow graph over the program points of one method.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub entry: PointId,
    outgoing: Vec<Vec<Edge>>,
    incoming: Vec<Vec<Edge>>,
}

impl ControlFlowGraph {
    /// Build the graph of `method`.
    ///
    /// Fails with [`AnalysisError::UnsupportedConstruct`] on an empty body or a
    /// jump whose target lies outside the body.
    pub fn from_method(method: &Method) -> Result<Self> {
        let n = method.body.len();
        if n == 0 {
            return Err(AnalysisError::UnsupportedConstruct(format!(
                "method `{}` has no statements",
                method.name
            )));
        }
        for (point, stmt) in method.points() {
            if let Stmt::If { target, .. } | Stmt::Goto(target) = stmt {
                if target.0 >= n {
                    return Err(AnalysisError::UnsupportedConstruct(format!(
                        "jump from {} to {} outside `{}` ({} statements)",
                        point, target, method.name, n
                    )));
                }
            }
        }

        let mut outgoing: Vec<Vec<Edge>> = vec![Vec::new(); n];
        let mut incoming: Vec<Vec<Edge>> = vec![Vec::new(); n];

        for (point, stmt) in method.points() {
            let next = PointId(point.0 + 1);
            let has_next = next.0 < n;
            let mut add = |to: PointId, kind: EdgeKind| {
                let edge = Edge { from: point, to, kind };
                outgoing[point.0].push(edge);
                incoming[to.0].push(edge);
            };
            match stmt {
                Stmt::If { target, .. } => {
                    add(*target, EdgeKind::Branch);
                    if has_next {
                        add(next, EdgeKind::Fallthrough);
                    }
                }
                Stmt::Goto(target) => add(*target, EdgeKind::Jump),
                Stmt::Return => {}
                Stmt::Assign { .. } | Stmt::New { .. } | Stmt::Construct { .. } | Stmt::Invoke(_) | Stmt::Nop => {
                    if has_next {
                        add(next, EdgeKind::Fallthrough);
                    }
                }
            }
        }

        Ok(Self {
            entry: PointId(0),
            outgoing,
            incoming,
        })
    }

    /// Number of program points.
    pub fn len(&self) -> usize {
        self.outgoing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = PointId> {
        (0..self.len()).map(PointId)
    }

    pub fn outgoing(&self, point: PointId) -> &[Edge] {
        &self.outgoing[point.0]
    }

    pub fn incoming(&self, point: PointId) -> &[Edge] {
        &self.incoming[point.0]
    }

    /// Distinct successor points.
    pub fn successors(&self, point: PointId) -> Vec<PointId> {
        let mut succs: Vec<PointId> = self.outgoing[point.0].iter().map(|e| e.to).collect();
        succs.dedup();
        succs
    }

    /// Distinct predecessor points.
    pub fn predecessors(&self, point: PointId) -> Vec<PointId> {
        let mut preds: Vec<PointId> = self.incoming[point.0].iter().map(|e| e.from).collect();
        preds.sort();
        preds.dedup();
        preds
    }

    pub fn num_edges(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    /// Points in reverse postorder of a depth-first search from the entry,
    /// followed by unreachable points in index order.
    pub fn reverse_postorder(&self) -> Vec<PointId> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        let mut visited = vec![false; n];
        let mut postorder = Vec::with_capacity(n);
        // (point, index of the next successor to visit)
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.0] = true;

        while let Some((point, i)) = stack.pop() {
            let succs = self.successors(point);
            if i < succs.len() {
                stack.push((point, i + 1));
                let succ = succs[i];
                if !visited[succ.0] {
                    visited[succ.0] = true;
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(point);
            }
        }

        postorder.reverse();
        postorder.extend((0..n).filter(|&i| !visited[i]).map(PointId));
        postorder
    }

    /// Render the graph in DOT format, labelling nodes with their statements.
    pub fn to_dot(&self, method: &Method) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph \"{}\" {{", method.name)?;
        writeln!(dot, "  node [shape=box, fontname=\"monospace\"];")?;
        for (point, stmt) in method.points() {
            let label = format!("{}: {}", point, stmt).replace('"', "\\\"");
            writeln!(dot, "  p{} [label=\"{}\"];", point.0, label)?;
        }
        for edges in &self.outgoing {
            for edge in edges {
                let style = match edge.kind {
                    EdgeKind::Fallthrough => "solid",
                    EdgeKind::Jump => "dashed",
                    EdgeKind::Branch => "bold",
                };
                writeln!(dot, "  p{} -> p{} [style={}];", edge.from.0, edge.to.0, style)?;
            }
        }
        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
