//! Comparison operators and branch refinement.
//!
//! For a branch condition `left OP right`, [`CmpOp::refine`] narrows the interval
//! of `left` to the values that can satisfy the relation against some value of
//! `right`. The fallthrough branch uses [`CmpOp::negate`], and the right operand
//! is refined with the [mirrored](CmpOp::mirror) operator and the operands
//! swapped.

use std::fmt;

use crate::interval::{Bound, Interval};

/// Relational operator of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub const ALL: [CmpOp; 6] = [CmpOp::Eq, CmpOp::Ne, CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge];

    /// Logical negation, used for the fallthrough branch: `!(x < y) == (x >= y)`.
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// Operand swap: `x < y == y > x`.
    pub fn mirror(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }

    /// Concrete semantics.
    pub fn holds(self, x: i64, y: i64) -> bool {
        match self {
            CmpOp::Eq => x == y,
            CmpOp::Ne => x != y,
            CmpOp::Lt => x < y,
            CmpOp::Le => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Ge => x >= y,
        }
    }

    /// Refines `left` under the assumption `left OP right`.
    ///
    /// Returns ⊥ when no value of `left` can satisfy the relation, which marks the
    /// branch as infeasible.
    ///
    /// `!=` has no exact interval representation; `left` only shrinks when
    /// `right` is a single value sitting on one of its endpoints.
    pub fn refine(self, left: Interval, right: Interval) -> Interval {
        if left.is_bottom() || right.is_bottom() {
            return Interval::bottom();
        }
        let one = Bound::Finite(1);
        match self {
            CmpOp::Eq => left.meet(&right),
            CmpOp::Ne => match right.as_constant() {
                Some(k) if left.as_constant() == Some(k) => Interval::bottom(),
                Some(k) if left.low == Bound::Finite(k) => Interval::new(left.low.add(one), left.high),
                Some(k) if left.high == Bound::Finite(k) => Interval::new(left.low, left.high.sub(one)),
                _ => left,
            },
            CmpOp::Lt => left.meet(&Interval::new(Bound::NegInf, right.high.sub(one))),
            CmpOp::Le => left.meet(&Interval::new(Bound::NegInf, right.high)),
            CmpOp::Gt => left.meet(&Interval::new(right.low.add(one), Bound::PosInf)),
            CmpOp::Ge => left.meet(&Interval::new(right.low, Bound::PosInf)),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}
