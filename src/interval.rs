//! Intervals over the extended integer line.
//!
//! An [`Interval`] is a pair of [`Bound`]s. The empty interval (⊥) has a single
//! canonical representation, `[+∞, -∞]`, which [`Interval::new`] produces for any
//! pair with `low > high`. Every operation treats ⊥ as absorbing, so callers never
//! have to reason about "how empty" an interval is.
//!
//! Arithmetic follows classic interval semantics:
//!
//! ```text
//! [a, b] + [c, d] = [a + c, b + d]
//! [a, b] - [c, d] = [a - d, b - c]
//! [a, b] * [c, d] = [min(ac, ad, bc, bd), max(ac, ad, bc, bd)]
//! ```
//!
//! Finite overflow is pushed to the matching infinity, so results stay sound
//! over-approximations of the mathematical integers.

use std::cmp::{max, min, Ordering};
use std::fmt;

/// Bound of an interval: -∞, a finite value, or +∞.
///
/// The total order is `-∞ < finite values < +∞`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    /// Negative infinity (`-∞`).
    NegInf,
    /// Finite integer value.
    Finite(i64),
    /// Positive infinity (`+∞`).
    PosInf,
}

impl Bound {
    /// Extract the finite value, if any.
    pub fn as_finite(self) -> Option<i64> {
        match self {
            Bound::Finite(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_finite(self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    /// Addition of bounds.
    ///
    /// `+∞ + -∞` is undefined; callers only combine like-signed infinities
    /// (lower with lower, upper with upper), so we pick `+∞` arbitrarily.
    pub fn add(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => match a.checked_add(b) {
                Some(n) => Bound::Finite(n),
                None if b > 0 => Bound::PosInf,
                None => Bound::NegInf,
            },
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::PosInf,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        }
    }

    /// Subtraction of bounds.
    pub fn sub(self, other: Bound) -> Bound {
        self.add(other.neg())
    }

    /// Multiplication of bounds, with `0 * ∞ = 0`.
    pub fn mul(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => match a.checked_mul(b) {
                Some(n) => Bound::Finite(n),
                None if (a < 0) == (b < 0) => Bound::PosInf,
                None => Bound::NegInf,
            },
            (Bound::Finite(0), _) | (_, Bound::Finite(0)) => Bound::Finite(0),
            _ => {
                if self.signum() == other.signum() {
                    Bound::PosInf
                } else {
                    Bound::NegInf
                }
            }
        }
    }

    pub fn neg(self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::Finite(n) => match n.checked_neg() {
                Some(m) => Bound::Finite(m),
                None => Bound::PosInf,
            },
            Bound::PosInf => Bound::NegInf,
        }
    }

    fn signum(self) -> i64 {
        match self {
            Bound::NegInf => -1,
            Bound::Finite(n) => n.signum(),
            Bound::PosInf => 1,
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Bound::NegInf, Bound::NegInf) => Ordering::Equal,
            (Bound::NegInf, _) => Ordering::Less,
            (_, Bound::NegInf) => Ordering::Greater,
            (Bound::PosInf, Bound::PosInf) => Ordering::Equal,
            (Bound::PosInf, _) => Ordering::Greater,
            (_, Bound::PosInf) => Ordering::Less,
            (Bound::Finite(a), Bound::Finite(b)) => a.cmp(b),
        }
    }
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Bound::Finite(value)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-∞"),
            Bound::Finite(n) => write!(f, "{}", n),
            Bound::PosInf => write!(f, "+∞"),
        }
    }
}

/// Interval: `[low, high]`, or ⊥ when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub low: Bound,
    pub high: Bound,
}

impl Interval {
    /// Creates `[low, high]`, normalizing empty pairs to ⊥.
    pub fn new(low: Bound, high: Bound) -> Self {
        if low > high {
            Self::bottom()
        } else {
            Self { low, high }
        }
    }

    /// Creates a finite interval `[low, high]`.
    pub fn finite(low: i64, high: i64) -> Self {
        Self::new(Bound::Finite(low), Bound::Finite(high))
    }

    /// Creates the point interval `[value, value]`.
    pub fn constant(value: i64) -> Self {
        Self::finite(value, value)
    }

    pub fn top() -> Self {
        Self {
            low: Bound::NegInf,
            high: Bound::PosInf,
        }
    }

    pub fn bottom() -> Self {
        Self {
            low: Bound::PosInf,
            high: Bound::NegInf,
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.low > self.high
    }

    pub fn is_top(&self) -> bool {
        self.low == Bound::NegInf && self.high == Bound::PosInf
    }

    /// Returns the single value of a point interval.
    pub fn as_constant(&self) -> Option<i64> {
        match (self.low, self.high) {
            (Bound::Finite(l), Bound::Finite(h)) if l == h => Some(l),
            _ => None,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        !self.is_bottom() && self.low <= Bound::Finite(value) && Bound::Finite(value) <= self.high
    }

    /// Two intervals overlap iff both are non-empty and neither lies strictly
    /// below the other.
    pub fn overlaps(&self, other: &Interval) -> bool {
        if self.is_bottom() || other.is_bottom() {
            return false;
        }
        !(self.high < other.low || other.high < self.low)
    }

    /// Containment: `self ⊆ other`. The empty interval is contained in everything.
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        other.low <= self.low && self.high <= other.high
    }

    /// Least upper bound (interval hull).
    pub fn join(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Interval {
            low: min(self.low, other.low),
            high: max(self.high, other.high),
        }
    }

    /// Greatest lower bound (intersection).
    pub fn meet(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval::new(max(self.low, other.low), min(self.high, other.high))
    }

    /// Standard interval widening: unstable bounds jump to infinity.
    pub fn widen(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        let low = if other.low < self.low { Bound::NegInf } else { self.low };
        let high = if other.high > self.high { Bound::PosInf } else { self.high };
        Interval { low, high }
    }

    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval::new(self.low.add(other.low), self.high.add(other.high))
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval::new(self.low.sub(other.high), self.high.sub(other.low))
    }

    /// Multiplication evaluates all four corner products: with mixed signs the
    /// extremes can come from any pair of bounds.
    pub fn mul(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        let corners = [
            self.low.mul(other.low),
            self.low.mul(other.high),
            self.high.mul(other.low),
            self.high.mul(other.high),
        ];
        let low = corners.iter().min().copied().unwrap_or(Bound::NegInf);
        let high = corners.iter().max().copied().unwrap_or(Bound::PosInf);
        Interval::new(low, high)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::top()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "⊥")
        } else {
            write!(f, "[{}, {}]", self.low, self.high)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use test_log::test;

    use super::*;

    fn random_interval(rng: &mut ChaCha8Rng) -> (i64, i64) {
        let a = rng.random_range(-30..=30);
        let b = rng.random_range(-30..=30);
        (min(a, b), max(a, b))
    }

    #[test]
    fn test_bound_ordering() {
        assert!(Bound::NegInf < Bound::Finite(i64::MIN));
        assert!(Bound::Finite(i64::MAX) < Bound::PosInf);
        assert!(Bound::Finite(-1) < Bound::Finite(1));
    }

    #[test]
    fn test_bound_arithmetic() {
        assert_eq!(Bound::Finite(3).add(Bound::Finite(4)), Bound::Finite(7));
        assert_eq!(Bound::PosInf.add(Bound::Finite(-4)), Bound::PosInf);
        assert_eq!(Bound::Finite(3).sub(Bound::PosInf), Bound::NegInf);
        assert_eq!(Bound::Finite(-2).mul(Bound::PosInf), Bound::NegInf);
        assert_eq!(Bound::NegInf.mul(Bound::NegInf), Bound::PosInf);
        assert_eq!(Bound::Finite(0).mul(Bound::NegInf), Bound::Finite(0));
    }

    #[test]
    fn test_bound_overflow_goes_to_infinity() {
        assert_eq!(Bound::Finite(i64::MAX).add(Bound::Finite(1)), Bound::PosInf);
        assert_eq!(Bound::Finite(i64::MIN).sub(Bound::Finite(1)), Bound::NegInf);
        assert_eq!(Bound::Finite(i64::MAX).mul(Bound::Finite(-2)), Bound::NegInf);
        assert_eq!(Bound::Finite(i64::MIN).neg(), Bound::PosInf);
    }

    #[test]
    fn test_bottom_is_canonical() {
        assert_eq!(Interval::finite(5, 3), Interval::bottom());
        assert_eq!(Interval::new(Bound::PosInf, Bound::Finite(0)), Interval::bottom());
        assert!(Interval::bottom().is_bottom());
        assert!(!Interval::constant(0).is_bottom());
    }

    #[test]
    fn test_overlap_and_containment() {
        let range = Interval::finite(0, 10);
        assert!(Interval::constant(5).overlaps(&range));
        assert!(Interval::finite(-5, 0).overlaps(&range));
        assert!(!Interval::constant(20).overlaps(&range));
        assert!(!Interval::bottom().overlaps(&range));

        assert!(Interval::finite(2, 8).is_subset_of(&range));
        assert!(!Interval::finite(2, 11).is_subset_of(&range));
        assert!(Interval::bottom().is_subset_of(&range));
        assert!(!range.is_subset_of(&Interval::bottom()));
    }

    #[test]
    fn test_lattice_operations() {
        let i1 = Interval::finite(0, 10);
        let i2 = Interval::finite(5, 15);

        assert_eq!(i1.join(&i2), Interval::finite(0, 15));
        assert_eq!(i1.meet(&i2), Interval::finite(5, 10));
        assert_eq!(i1.widen(&i2), Interval::new(Bound::Finite(0), Bound::PosInf));
        assert_eq!(i2.widen(&i1), Interval::new(Bound::NegInf, Bound::Finite(15)));
        assert_eq!(i1.join(&Interval::bottom()), i1);
        assert_eq!(Interval::bottom().widen(&i1), i1);
    }

    #[test]
    fn test_subtraction_uses_opposite_bounds() {
        let x = Interval::finite(0, 10);
        let y = Interval::finite(0, 10);
        assert_eq!(x.sub(&y), Interval::finite(-10, 10));
    }

    #[test]
    fn test_multiplication_mixed_signs() {
        let x = Interval::finite(-3, 2);
        let y = Interval::finite(-4, 5);
        assert_eq!(x.mul(&y), Interval::finite(-15, 12));
        let unbounded = Interval::new(Bound::Finite(1), Bound::PosInf);
        assert_eq!(
            unbounded.mul(&Interval::finite(-1, -1)),
            Interval::new(Bound::NegInf, Bound::Finite(-1))
        );
    }

    #[test]
    fn test_arithmetic_soundness_random() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let (a, b) = random_interval(&mut rng);
            let (c, d) = random_interval(&mut rng);
            let xs = Interval::finite(a, b);
            let ys = Interval::finite(c, d);
            let sum = xs.add(&ys);
            let diff = xs.sub(&ys);
            let prod = xs.mul(&ys);
            for x in a..=b {
                for y in c..=d {
                    assert!(sum.contains(x + y), "{} + {} not in {}", x, y, sum);
                    assert!(diff.contains(x - y), "{} - {} not in {}", x, y, diff);
                    assert!(prod.contains(x * y), "{} * {} not in {}", x, y, prod);
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::finite(-1, 4).to_string(), "[-1, 4]");
        assert_eq!(Interval::top().to_string(), "[-∞, +∞]");
        assert_eq!(Interval::bottom().to_string(), "⊥");
    }
}
