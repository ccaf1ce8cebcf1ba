//! Variable environments of the numeric domain.

use std::collections::HashMap;
use std::fmt;

use crate::error::DomainError;

/// Name of the synthetic real variable every environment carries as scratch space.
pub const SCRATCH_REAL: &str = "x";

/// Ordered set of domain variables: integer variables first, then reals.
///
/// An environment is fixed for the lifetime of one procedure's analysis; every
/// abstract element of that analysis lives over exactly this environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    names: Vec<String>,
    int_count: usize,
    index: HashMap<String, usize>,
}

impl Environment {
    /// Builds an environment from integer and real variable names.
    ///
    /// Fails with [`DomainError::DuplicateVariable`] if a name appears twice.
    pub fn new<I, R>(ints: I, reals: R) -> Result<Self, DomainError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let mut names: Vec<String> = ints.into_iter().map(Into::into).collect();
        let int_count = names.len();
        names.extend(reals.into_iter().map(Into::into));

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(DomainError::DuplicateVariable(name.clone()));
            }
        }

        Ok(Self { names, int_count, index })
    }

    /// Environment over `ints` plus the [scratch real](SCRATCH_REAL).
    pub fn with_scratch<I>(ints: I) -> Result<Self, DomainError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(ints, [SCRATCH_REAL])
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `name`, if declared.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn is_int(&self, name: &str) -> bool {
        self.position(name).is_some_and(|i| i < self.int_count)
    }

    pub fn ints(&self) -> &[String] {
        &self.names[..self.int_count]
    }

    pub fn reals(&self) -> &[String] {
        &self.names[self.int_count..]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ints={{{}}} reals={{{}}}", self.ints().join(", "), self.reals().join(", "))
    }
}
