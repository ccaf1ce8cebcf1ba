//! Alias (points-to) information for receiver locals.
//!
//! The verifier only needs to know which allocation sites a receiver may refer
//! to at a call site; [`AliasOracle`] is that query. [`LocalPointsTo`] answers
//! it with a flow-insensitive, subset-based (Andersen-style) analysis over the
//! reference locals of each method:
//!
//! ```text
//! r = new C      (site s)   ⇒  s ∈ pts(r)
//! r = q                     ⇒  pts(q) ⊆ pts(r)
//! ```
//!
//! Fields, parameters and call results point to nothing.

use std::collections::{BTreeSet, HashMap};

use crate::ir::{AllocSite, Class, Expr, Method, MethodId, Place, PointId, Stmt, Value};

/// May-point-to oracle.
pub trait AliasOracle {
    /// Allocation sites `variable` may refer to at `point` of the method at position `method`.
    fn reaching_allocations(&self, method: MethodId, variable: &str, point: PointId) -> BTreeSet<AllocSite>;
}

/// Flow-insensitive points-to sets of the reference locals of every method of a class.
#[derive(Debug, Default, Clone)]
pub struct LocalPointsTo {
    /// Indexed by [`MethodId`]; local → sites.
    sets: Vec<HashMap<String, BTreeSet<AllocSite>>>,
}

impl LocalPointsTo {
    pub fn analyze(class: &Class) -> Self {
        let sets = class.methods.iter().map(Self::analyze_method).collect();
        Self { sets }
    }

    fn analyze_method(method: &Method) -> HashMap<String, BTreeSet<AllocSite>> {
        let mut pts: HashMap<String, BTreeSet<AllocSite>> = HashMap::new();
        // (src, dst): pts(src) ⊆ pts(dst)
        let mut copies: Vec<(&str, &str)> = Vec::new();

        for (_, stmt) in method.points() {
            match stmt {
                Stmt::New { target, site, .. } => {
                    pts.entry(target.clone()).or_default().insert(*site);
                }
                Stmt::Assign {
                    target: Place::Local(dst),
                    value: Expr::Use(Value::Local(src)),
                } if method.local(dst).is_some_and(|v| v.ty.is_reference()) => {
                    copies.push((src.as_str(), dst.as_str()));
                }
                _ => {}
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &(src, dst) in &copies {
                let Some(from) = pts.get(src).cloned() else {
                    continue;
                };
                let to = pts.entry(dst.to_string()).or_default();
                let before = to.len();
                to.extend(from);
                changed |= to.len() != before;
            }
        }

        log::trace!("Points-to sets of {}: {:?}", method.name, pts);
        pts
    }

    /// Points-to set of `variable` in `method`.
    pub fn points_to(&self, method: MethodId, variable: &str) -> BTreeSet<AllocSite> {
        self.sets
            .get(method.0)
            .and_then(|locals| locals.get(variable))
            .cloned()
            .unwrap_or_default()
    }

    pub fn may_alias(&self, method: MethodId, var1: &str, var2: &str) -> bool {
        let p1 = self.points_to(method, var1);
        let p2 = self.points_to(method, var2);
        !p1.is_disjoint(&p2)
    }
}

impl AliasOracle for LocalPointsTo {
    fn reaching_allocations(&self, method: MethodId, variable: &str, _point: PointId) -> BTreeSet<AllocSite> {
        self.points_to(method, variable)
    }
}
