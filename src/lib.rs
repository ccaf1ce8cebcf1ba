//! # weld-verifier: interval analysis for robot welding programs
//!
//! **`weld-verifier`** computes, for every program point of a method, a sound
//! over-approximation of the integer values of its numeric variables, and uses
//! it to check that robots only weld inside the range they were built for.
//!
//! ## How it works
//!
//! A robot is constructed with a range, `new Robot(left, right)`, and later
//! asked to weld at a point, `r.weldAt(p)`, or along a segment,
//! `r.weldBetween(lo, hi)`. Verification happens in two phases:
//!
//! 1. **Fixpoint** ([`fixpoint`]): a forward, branch-sensitive dataflow analysis
//!    over the interval domain. Branch conditions refine both operands, loop
//!    headers switch from join to widening after a fixed number of merges, and
//!    constructor arguments are recorded per allocation site on the way.
//! 2. **Verification** ([`verifier`]): every weld call is checked against all
//!    allocation sites its receiver may point to, using the interval of the
//!    arguments immediately before the call.
//!
//! ## Basic Usage
//!
//! ```rust
//! use weld_verifier::builder::ClassBuilder;
//! use weld_verifier::config::AnalysisConfig;
//! use weld_verifier::ir::{Type, Value};
//! use weld_verifier::verifier::verify_class;
//!
//! let mut class = ClassBuilder::new("Demo");
//! class.method("run", |m| {
//!     m.local("r1", Type::Ref("Robot".to_string()));
//!     m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
//!     m.invoke("r1", "weldAt", vec![Value::Const(5)]);
//!     m.invoke("r1", "weldBetween", vec![Value::Const(2), Value::Const(12)]);
//!     m.ret();
//! });
//!
//! let report = verify_class(&class.build(), &AnalysisConfig::default());
//! assert!(report.point_in_range);
//! assert!(!report.range_contained);
//! assert_eq!(report.to_string(), "Demo WELD_AT_OK\nDemo WELD_BETWEEN_NOT_OK");
//! ```
//!
//! ## Core Components
//!
//! - **[`interval`]**, **[`condition`]**: intervals over `i64 ∪ {±∞}` and branch refinement.
//! - **[`domain`]**, **[`state`]**, **[`env`]**: the numeric domain contract and abstract states.
//! - **[`ir`]**, **[`builder`]**, **[`cfg`]**, **[`loops`]**: program representation and structure.
//! - **[`transfer`]**, **[`allocation`]**, **[`fixpoint`]**: the analysis itself.
//! - **[`alias`]**, **[`verifier`]**: the weld checks.
//! - **[`catalog`]**: built-in example classes used by the command-line tool.

pub mod alias;
pub mod allocation;
pub mod builder;
pub mod catalog;
pub mod cfg;
pub mod condition;
pub mod config;
pub mod domain;
pub mod env;
pub mod error;
pub mod fixpoint;
pub mod interval;
pub mod ir;
pub mod loops;
pub mod state;
pub mod transfer;
pub mod verifier;
