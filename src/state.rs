//! Abstract states: one numeric-domain element per program point.

use std::fmt;
use std::rc::Rc;

use crate::domain::{BoxElement, NumericDomain};
use crate::env::Environment;
use crate::error::DomainError;
use crate::interval::Interval;

/// Wrapper around one element of a numeric domain `D`.
///
/// States are values: every operation returns a new state and leaves its
/// inputs untouched, and cloning a state produces an independent copy of the
/// underlying element.
pub struct AbstractState<D: NumericDomain> {
    elem: D::Element,
}

impl<D: NumericDomain> AbstractState<D> {
    pub fn from_element(elem: D::Element) -> Self {
        Self { elem }
    }

    pub fn top(domain: &D, env: &Rc<Environment>) -> Result<Self, DomainError> {
        Ok(Self::from_element(domain.top(env)?))
    }

    pub fn bottom(domain: &D, env: &Rc<Environment>) -> Result<Self, DomainError> {
        Ok(Self::from_element(domain.bottom(env)?))
    }

    pub fn element(&self) -> &D::Element {
        &self.elem
    }

    pub fn is_bottom(&self, domain: &D) -> bool {
        domain.is_bottom(&self.elem)
    }

    /// Copy of `self` with `var` bound to `value`.
    pub fn assign(&self, domain: &D, var: &str, value: Interval) -> Result<Self, DomainError> {
        Ok(Self::from_element(domain.assign(&self.elem, var, value)?))
    }

    pub fn bound(&self, domain: &D, var: &str) -> Result<Interval, DomainError> {
        domain.bound(&self.elem, var)
    }

    pub fn join(&self, domain: &D, other: &Self) -> Result<Self, DomainError> {
        Ok(Self::from_element(domain.join(&self.elem, &other.elem)?))
    }

    pub fn widen(&self, domain: &D, other: &Self) -> Result<Self, DomainError> {
        Ok(Self::from_element(domain.widen(&self.elem, &other.elem)?))
    }
}

impl<D: NumericDomain> Clone for AbstractState<D> {
    fn clone(&self) -> Self {
        Self { elem: self.elem.clone() }
    }
}

impl<D: NumericDomain> PartialEq for AbstractState<D> {
    fn eq(&self, other: &Self) -> bool {
        self.elem == other.elem
    }
}

impl<D: NumericDomain> fmt::Debug for AbstractState<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AbstractState").field(&self.elem).finish()
    }
}

impl<D> fmt::Display for AbstractState<D>
where
    D: NumericDomain<Element = BoxElement>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.elem.bindings();
        if bindings.is_empty() {
            return write!(f, "⊥");
        }
        let parts: Vec<String> = bindings
            .iter()
            .filter(|(_, interval)| !interval.is_top())
            .map(|(name, interval)| format!("{} ∈ {}", name, interval))
            .collect();
        if parts.is_empty() {
            write!(f, "⊤")
        } else {
            write!(f, "{{{}}}", parts.join(", "))
        }
    }
}
