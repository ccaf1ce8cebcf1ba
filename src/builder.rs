//! Builders for classes and methods.
//!
//! ## Example
//!
//! ```rust
//! use weld_verifier::builder::ClassBuilder;
//! use weld_verifier::condition::CmpOp;
//! use weld_verifier::ir::{Type, Value};
//!
//! let mut class = ClassBuilder::new("Counter");
//! class.method("run", |m| {
//!     m.local("i0", Type::Int);
//!     let head = m.label();
//!     let exit = m.label();
//!     m.assign("i0", 0);
//!     m.bind(head);
//!     m.branch(CmpOp::Ge, Value::local("i0"), 10, exit);
//!     m.binary("i0", weld_verifier::ir::BinOp::Add, Value::local("i0"), 1);
//!     m.goto(head);
//!     m.bind(exit);
//!     m.ret();
//! });
//! let class = class.build();
//! assert_eq!(class.methods[0].body.len(), 5);
//! ```

use crate::condition::CmpOp;
use crate::error::{AnalysisError, Result};
use crate::ir::{AllocSite, BinOp, Call, Class, Condition, Expr, Method, Place, PointId, Stmt, Type, Value, Variable};

/// Forward-declarable jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Incremental builder for a [`Class`].
///
/// Allocation sites are numbered across all methods of the class.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    fields: Vec<Variable>,
    methods: Vec<Method>,
    next_site: u32,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            next_site: 0,
        }
    }

    pub fn field(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.fields.push(Variable::new(name, ty));
        self
    }

    /// Adds a method whose body is produced by `body`.
    ///
    /// # Panics
    ///
    /// Panics if the body misuses labels; see [`MethodBuilder::try_build`].
    pub fn method<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut MethodBuilder),
    {
        if let Err(e) = self.try_method(name, body) {
            panic!("{}", e);
        }
        self
    }

    /// Like [`method`](Self::method), but reports label misuse as an error.
    /// On error the class is left unchanged.
    pub fn try_method<F>(&mut self, name: impl Into<String>, body: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut MethodBuilder),
    {
        let mut builder = MethodBuilder::new(name, self.next_site);
        body(&mut builder);
        let next_site = builder.next_site;
        let method = builder.try_build()?;
        self.next_site = next_site;
        self.methods.push(method);
        Ok(self)
    }

    pub fn build(self) -> Class {
        Class {
            name: self.name,
            fields: self.fields,
            methods: self.methods,
        }
    }
}

/// Builder for a single [`Method`] with label-based jumps.
#[derive(Debug)]
pub struct MethodBuilder {
    name: String,
    locals: Vec<Variable>,
    body: Vec<Stmt>,
    labels: Vec<Option<usize>>,
    /// Jumps waiting for label resolution: (statement index, label).
    fixups: Vec<(usize, Label)>,
    /// Labels bound more than once.
    rebound: Vec<Label>,
    next_site: u32,
}

impl MethodBuilder {
    fn new(name: impl Into<String>, next_site: u32) -> Self {
        Self {
            name: name.into(),
            locals: Vec::new(),
            body: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            rebound: Vec::new(),
            next_site,
        }
    }

    pub fn local(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.locals.push(Variable::new(name, ty));
        self
    }

    /// Creates a label to be [bound](Self::bind) later.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds `label` to the next emitted statement.
    ///
    /// Binding a label twice keeps the first position and fails the build.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        let slot = &mut self.labels[label.0];
        if slot.is_some() {
            self.rebound.push(label);
        } else {
            *slot = Some(self.body.len());
        }
        self
    }

    pub fn push(&mut self, stmt: Stmt) -> PointId {
        self.body.push(stmt);
        PointId(self.body.len() - 1)
    }

    /// `target = value` for a local `target`.
    pub fn assign(&mut self, target: &str, value: impl Into<Value>) -> PointId {
        self.push(Stmt::Assign {
            target: Place::Local(target.to_string()),
            value: Expr::Use(value.into()),
        })
    }

    pub fn assign_expr(&mut self, target: &str, value: Expr) -> PointId {
        self.push(Stmt::Assign {
            target: Place::Local(target.to_string()),
            value,
        })
    }

    /// `this.field = value`.
    pub fn store_field(&mut self, field: &str, value: impl Into<Value>) -> PointId {
        self.push(Stmt::Assign {
            target: Place::Field(field.to_string()),
            value: Expr::Use(value.into()),
        })
    }

    /// `target = lhs op rhs`.
    pub fn binary(&mut self, target: &str, op: BinOp, lhs: impl Into<Value>, rhs: impl Into<Value>) -> PointId {
        self.assign_expr(target, Expr::Binary(op, lhs.into(), rhs.into()))
    }

    /// `target := @parameter<index>`.
    pub fn param(&mut self, target: &str, index: usize) -> PointId {
        self.assign(target, Value::Param(index))
    }

    /// `target := @this`.
    pub fn this(&mut self, target: &str) -> PointId {
        self.assign(target, Value::This)
    }

    /// Emits `target = new class` followed by `target.<init>(args)` and returns
    /// the allocation site.
    pub fn new_object(&mut self, target: &str, class: &str, args: Vec<Value>) -> AllocSite {
        let site = AllocSite(self.next_site);
        self.next_site += 1;
        self.push(Stmt::New {
            target: target.to_string(),
            site,
            class: class.to_string(),
        });
        self.push(Stmt::Construct {
            receiver: target.to_string(),
            class: class.to_string(),
            args,
        });
        site
    }

    /// `receiver.method(args)` with the result discarded.
    pub fn invoke(&mut self, receiver: &str, method: &str, args: Vec<Value>) -> PointId {
        self.push(Stmt::Invoke(Call {
            receiver: Some(receiver.to_string()),
            method: method.to_string(),
            args,
        }))
    }

    /// `if lhs op rhs goto target`.
    pub fn branch(&mut self, op: CmpOp, lhs: impl Into<Value>, rhs: impl Into<Value>, target: Label) -> PointId {
        let cond = Condition {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        };
        self.fixups.push((self.body.len(), target));
        self.push(Stmt::If {
            cond,
            target: PointId(usize::MAX),
        })
    }

    pub fn goto(&mut self, target: Label) -> PointId {
        self.fixups.push((self.body.len(), target));
        self.push(Stmt::Goto(PointId(usize::MAX)))
    }

    pub fn ret(&mut self) -> PointId {
        self.push(Stmt::Return)
    }

    pub fn nop(&mut self) -> PointId {
        self.push(Stmt::Nop)
    }

    /// Resolves labels and produces the method.
    ///
    /// # Panics
    ///
    /// Panics where [`try_build`](Self::try_build) would fail.
    pub fn build(self) -> Method {
        match self.try_build() {
            Ok(method) => method,
            Err(e) => panic!("{}", e),
        }
    }

    /// Resolves labels and produces the method.
    ///
    /// Fails with [`AnalysisError::UnsupportedConstruct`] if a label is bound
    /// twice, a jump refers to an unbound label, or a label is bound past the
    /// last statement.
    pub fn try_build(mut self) -> Result<Method> {
        if let Some(label) = self.rebound.first() {
            return Err(AnalysisError::UnsupportedConstruct(format!(
                "{:?} bound twice in `{}`",
                label, self.name
            )));
        }
        for &(index, label) in &self.fixups {
            let target = self.labels[label.0].ok_or_else(|| {
                AnalysisError::UnsupportedConstruct(format!("{:?} is never bound in `{}`", label, self.name))
            })?;
            if target >= self.body.len() {
                return Err(AnalysisError::UnsupportedConstruct(format!(
                    "{:?} is bound past the end of `{}`",
                    label, self.name
                )));
            }
            match &mut self.body[index] {
                Stmt::If { target: t, .. } | Stmt::Goto(t) => *t = PointId(target),
                other => unreachable!("fixup on non-jump statement {}", other),
            }
        }
        Ok(Method {
            name: self.name,
            locals: self.locals,
            body: self.body,
        })
    }
}
