//! Allocation-site recorder.
//!
//! Object creation is split over two statements: `r = new C` binds a local to
//! a fresh site, and a later `r.<init>(args)` supplies the constructor
//! arguments. The recorder correlates the two through the pending binding of
//! the receiver local.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{AnalysisError, Result};
use crate::ir::{AllocSite, Value};

/// Constructor arguments observed for one allocation site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub site: AllocSite,
    pub class: String,
    /// `None` until the matching constructor invocation has been seen.
    pub args: Option<Vec<Value>>,
}

impl fmt::Display for AllocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            Some(args) => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{} = new {}({})", self.site, self.class, args.join(", "))
            }
            None => write!(f, "{} = new {}(?)", self.site, self.class),
        }
    }
}

/// Side table of allocation records, owned by one analysis run.
#[derive(Debug, Default, Clone)]
pub struct AllocationRecorder {
    /// Local most recently bound to each site by a `New` statement.
    pending: HashMap<String, AllocSite>,
    records: BTreeMap<AllocSite, AllocationRecord>,
}

impl AllocationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `target` now holds a fresh object from `site`.
    pub fn bind(&mut self, target: &str, site: AllocSite, class: &str) {
        self.pending.insert(target.to_string(), site);
        self.records.entry(site).or_insert_with(|| AllocationRecord {
            site,
            class: class.to_string(),
            args: None,
        });
    }

    /// Store the constructor arguments for the site pending on `receiver`.
    ///
    /// Fails with [`AnalysisError::MissingAllocationRecord`] if no `New`
    /// statement bound `receiver` before.
    pub fn construct(&mut self, receiver: &str, args: &[Value]) -> Result<AllocSite> {
        let site = *self
            .pending
            .get(receiver)
            .ok_or_else(|| AnalysisError::MissingAllocationRecord(format!("no pending object for `{}`", receiver)))?;
        let record = self
            .records
            .get_mut(&site)
            .ok_or_else(|| AnalysisError::MissingAllocationRecord(site.to_string()))?;
        record.args = Some(args.to_vec());
        Ok(site)
    }

    pub fn get(&self, site: AllocSite) -> Option<&AllocationRecord> {
        self.records.get(&site)
    }

    /// Recorded constructor arguments of `site`, if its constructor was seen.
    pub fn args(&self, site: AllocSite) -> Option<&[Value]> {
        self.records.get(&site).and_then(|r| r.args.as_deref())
    }

    pub fn records(&self) -> impl Iterator<Item = &AllocationRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
