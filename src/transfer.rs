//! Interval coercion and the per-statement transfer function.
//!
//! [`Evaluator::transfer`] computes `⟦stmt⟧♯(state)` for one statement: a single
//! outgoing state for straight-line statements, or a taken/fallthrough pair
//! for conditional branches.

use crate::allocation::AllocationRecorder;
use crate::cfg::EdgeKind;
use crate::condition::CmpOp;
use crate::domain::NumericDomain;
use crate::error::{AnalysisError, Result};
use crate::interval::Interval;
use crate::ir::{BinOp, Class, Condition, Expr, Method, Place, Stmt, Type, Value};
use crate::state::AbstractState;

/// Outgoing state(s) of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<S> {
    Single(S),
    Branch { taken: S, fallthrough: S },
}

impl<S> Flow<S> {
    /// State flowing along an edge of the given kind.
    pub fn on_edge(&self, kind: EdgeKind) -> &S {
        match self {
            Flow::Single(s) => s,
            Flow::Branch { taken, .. } if kind == EdgeKind::Branch => taken,
            Flow::Branch { fallthrough, .. } => fallthrough,
        }
    }

    pub fn states(&self) -> Vec<&S> {
        match self {
            Flow::Single(s) => vec![s],
            Flow::Branch { taken, fallthrough } => vec![taken, fallthrough],
        }
    }
}

/// Transfer function evaluator for one method of one class.
pub struct Evaluator<'a, D: NumericDomain> {
    domain: &'a D,
    class: &'a Class,
    method: &'a Method,
}

impl<'a, D: NumericDomain> Evaluator<'a, D> {
    pub fn new(domain: &'a D, class: &'a Class, method: &'a Method) -> Self {
        Self { domain, class, method }
    }

    fn declared_type(&self, value: &Value) -> Option<&'a Type> {
        match value {
            Value::Local(name) => self.method.local(name).map(|v| &v.ty),
            Value::Field(name) => self.class.field(name).map(|v| &v.ty),
            _ => None,
        }
    }

    fn place_type(&self, place: &Place) -> Option<&'a Type> {
        match place {
            Place::Local(name) => self.method.local(name).map(|v| &v.ty),
            Place::Field(name) => self.class.field(name).map(|v| &v.ty),
        }
    }

    /// Current interval of a program value.
    ///
    /// Declared variables of non-integral type have no slot in the environment
    /// and are approximated by ⊤.
    pub fn coerce(&self, state: &AbstractState<D>, value: &Value) -> Result<Interval> {
        match value {
            Value::Const(n) => Ok(Interval::constant(*n)),
            Value::Param(_) => Ok(Interval::top()),
            Value::Local(name) | Value::Field(name) => match self.declared_type(value) {
                Some(ty) if !ty.is_integral() => Ok(Interval::top()),
                _ => Ok(state.bound(self.domain, name)?),
            },
            Value::This => Err(AnalysisError::UnsupportedConstruct(format!(
                "`{}` used as a number",
                value
            ))),
        }
    }

    /// Interval of the right-hand side of an assignment.
    pub fn eval(&self, state: &AbstractState<D>, expr: &Expr) -> Result<Interval> {
        match expr {
            Expr::Use(value) => self.coerce(state, value),
            Expr::Binary(op, lhs, rhs) => {
                let left = self.coerce(state, lhs)?;
                let right = self.coerce(state, rhs)?;
                match op {
                    BinOp::Add => Ok(left.add(&right)),
                    BinOp::Sub => Ok(left.sub(&right)),
                    BinOp::Mul => Ok(left.mul(&right)),
                    _ => Err(AnalysisError::UnsupportedConstruct(format!("operator in `{}`", expr))),
                }
            }
            Expr::Invoke(_) => Err(AnalysisError::UnsupportedConstruct(format!("call result `{}`", expr))),
        }
    }

    /// Apply the transfer function of `stmt` to `state`.
    ///
    /// Object construction and constructor invocation are recorded in
    /// `allocations` even when `state` is ⊥.
    pub fn transfer(
        &self,
        stmt: &Stmt,
        state: &AbstractState<D>,
        allocations: &mut AllocationRecorder,
    ) -> Result<Flow<AbstractState<D>>> {
        match stmt {
            Stmt::New { target, site, class } => {
                allocations.bind(target, *site, class);
                return Ok(Flow::Single(state.clone()));
            }
            Stmt::Construct { receiver, args, .. } => {
                allocations.construct(receiver, args)?;
                return Ok(Flow::Single(state.clone()));
            }
            _ => {}
        }

        if state.is_bottom(self.domain) {
            return Ok(match stmt {
                Stmt::If { .. } => Flow::Branch {
                    taken: state.clone(),
                    fallthrough: state.clone(),
                },
                _ => Flow::Single(state.clone()),
            });
        }

        match stmt {
            Stmt::Assign { target, value } => self.assign(state, target, value).map(Flow::Single),
            Stmt::If { cond, .. } => {
                let taken = self.assume(state, cond.op, cond)?;
                let fallthrough = self.assume(state, cond.op.negate(), cond)?;
                Ok(Flow::Branch { taken, fallthrough })
            }
            Stmt::Invoke(_) | Stmt::Goto(_) | Stmt::Return | Stmt::Nop => Ok(Flow::Single(state.clone())),
            Stmt::New { .. } | Stmt::Construct { .. } => Ok(Flow::Single(state.clone())),
        }
    }

    fn assign(&self, state: &AbstractState<D>, target: &Place, value: &Expr) -> Result<AbstractState<D>> {
        match self.place_type(target) {
            Some(ty) if ty.is_tracked_numeric() => {
                let interval = self.eval(state, value)?;
                Ok(state.assign(self.domain, target.name(), interval)?)
            }
            // Booleans and chars keep their slot but are not modelled.
            Some(ty) if ty.is_integral() => Ok(state.assign(self.domain, target.name(), Interval::top())?),
            Some(_) => Ok(state.clone()),
            None => Err(AnalysisError::UnsupportedConstruct(format!(
                "assignment to undeclared `{}`",
                target
            ))),
        }
    }

    /// Refine `state` under `lhs op rhs`, using operand intervals from `state`.
    fn assume(&self, state: &AbstractState<D>, op: CmpOp, cond: &Condition) -> Result<AbstractState<D>> {
        let left = self.coerce(state, &cond.lhs)?;
        let right = self.coerce(state, &cond.rhs)?;
        let mut out = state.clone();
        if let Some(name) = self.refinable(&cond.lhs) {
            out = out.assign(self.domain, name, op.refine(left, right))?;
        }
        if let Some(name) = self.refinable(&cond.rhs) {
            out = out.assign(self.domain, name, op.mirror().refine(right, left))?;
        }
        Ok(out)
    }

    /// Name of an operand whose interval can be narrowed: integral locals and fields.
    fn refinable<'v>(&self, value: &'v Value) -> Option<&'v str> {
        match value {
            Value::Local(name) | Value::Field(name) => match self.declared_type(value) {
                Some(ty) if ty.is_integral() => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }
}
