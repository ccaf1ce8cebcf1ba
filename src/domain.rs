//! Numeric domain backends.
//!
//! The analysis talks to its numeric domain only through [`NumericDomain`]:
//! construction of ⊤/⊥ over an [`Environment`], assignment of an interval
//! constant to a variable, bound queries, join, widening and emptiness tests.
//! Every operation may fail with a [`DomainError`].
//!
//! Elements are plain values: operations take their inputs by reference and
//! return freshly built elements, so two abstract states never share mutable
//! storage.
//!
//! [`IntervalBoxes`] is the interval (box) backend used by default. A richer
//! relational backend can be plugged in by implementing the same trait.

use std::fmt::Debug;
use std::rc::Rc;

use crate::env::Environment;
use crate::error::DomainError;
use crate::interval::Interval;

/// Contract of a numeric abstract domain backend.
///
/// A backend value plays the role of a domain manager: it is created once per
/// run and reused sequentially for every analyzed procedure.
pub trait NumericDomain: Debug {
    /// Abstract element over a fixed environment.
    type Element: Clone + Debug + PartialEq;

    /// Create the top element (⊤) over `env`.
    fn top(&self, env: &Rc<Environment>) -> Result<Self::Element, DomainError>;

    /// Create the bottom element (⊥) over `env`.
    fn bottom(&self, env: &Rc<Environment>) -> Result<Self::Element, DomainError>;

    /// Assign the interval constant `value` to `var`, returning a new element.
    ///
    /// Assigning ⊥ yields the bottom element.
    fn assign(&self, elem: &Self::Element, var: &str, value: Interval) -> Result<Self::Element, DomainError>;

    /// Bounds of `var` in `elem`; ⊥ when `elem` is bottom.
    fn bound(&self, elem: &Self::Element, var: &str) -> Result<Interval, DomainError>;

    /// Join (`⊔`).
    fn join(&self, elem1: &Self::Element, elem2: &Self::Element) -> Result<Self::Element, DomainError>;

    /// Widening (`∇`) of `elem1` by `elem2`.
    fn widen(&self, elem1: &Self::Element, elem2: &Self::Element) -> Result<Self::Element, DomainError>;

    fn is_bottom(&self, elem: &Self::Element) -> bool;
}

/// Interval (box) domain: one interval per environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalBoxes;

/// Element of [`IntervalBoxes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxElement {
    env: Rc<Environment>,
    /// `None` is the bottom element; otherwise one entry per variable, none empty.
    bounds: Option<Vec<Interval>>,
}

impl BoxElement {
    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    /// Non-bottom bindings in environment order.
    pub fn bindings(&self) -> Vec<(&str, Interval)> {
        match &self.bounds {
            Some(bounds) => self.env.names().zip(bounds.iter().copied()).collect(),
            None => Vec::new(),
        }
    }

    fn check_env(&self, other: &BoxElement) -> Result<(), DomainError> {
        if Rc::ptr_eq(&self.env, &other.env) || self.env == other.env {
            Ok(())
        } else {
            Err(DomainError::EnvironmentMismatch)
        }
    }

    fn combine<F>(&self, other: &BoxElement, f: F) -> Result<BoxElement, DomainError>
    where
        F: Fn(&Interval, &Interval) -> Interval,
    {
        self.check_env(other)?;
        let bounds = match (&self.bounds, &other.bounds) {
            (None, None) => None,
            (Some(b), None) | (None, Some(b)) => Some(b.clone()),
            (Some(b1), Some(b2)) => Some(b1.iter().zip(b2).map(|(i1, i2)| f(i1, i2)).collect()),
        };
        Ok(BoxElement {
            env: Rc::clone(&self.env),
            bounds,
        })
    }
}

impl NumericDomain for IntervalBoxes {
    type Element = BoxElement;

    fn top(&self, env: &Rc<Environment>) -> Result<Self::Element, DomainError> {
        Ok(BoxElement {
            env: Rc::clone(env),
            bounds: Some(vec![Interval::top(); env.len()]),
        })
    }

    fn bottom(&self, env: &Rc<Environment>) -> Result<Self::Element, DomainError> {
        Ok(BoxElement {
            env: Rc::clone(env),
            bounds: None,
        })
    }

    fn assign(&self, elem: &Self::Element, var: &str, value: Interval) -> Result<Self::Element, DomainError> {
        let pos = elem
            .env
            .position(var)
            .ok_or_else(|| DomainError::UnknownVariable(var.to_string()))?;
        let bounds = match &elem.bounds {
            Some(bounds) if !value.is_bottom() => {
                let mut bounds = bounds.clone();
                bounds[pos] = value;
                Some(bounds)
            }
            _ => None,
        };
        Ok(BoxElement {
            env: Rc::clone(&elem.env),
            bounds,
        })
    }

    fn bound(&self, elem: &Self::Element, var: &str) -> Result<Interval, DomainError> {
        let pos = elem
            .env
            .position(var)
            .ok_or_else(|| DomainError::UnknownVariable(var.to_string()))?;
        Ok(match &elem.bounds {
            Some(bounds) => bounds[pos],
            None => Interval::bottom(),
        })
    }

    fn join(&self, elem1: &Self::Element, elem2: &Self::Element) -> Result<Self::Element, DomainError> {
        elem1.combine(elem2, Interval::join)
    }

    fn widen(&self, elem1: &Self::Element, elem2: &Self::Element) -> Result<Self::Element, DomainError> {
        elem1.combine(elem2, Interval::widen)
    }

    fn is_bottom(&self, elem: &Self::Element) -> bool {
        elem.bounds.is_none()
    }
}
