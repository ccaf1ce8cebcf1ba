//! Built-in class catalog.
//!
//! The analysis never parses source code; classes come from a
//! [`ProgramProvider`]. [`Catalog`] is an in-memory provider pre-loaded with a
//! set of small robot-welding programs that exercise the verifier.

use std::collections::BTreeMap;

use crate::builder::{ClassBuilder, MethodBuilder};
use crate::condition::CmpOp;
use crate::ir::{BinOp, Class, ProgramProvider, Type, Value, CONSTRUCTOR_NAME};

/// In-memory [`ProgramProvider`].
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    classes: BTreeMap<String, Class>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every built-in class.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for class in [
            weld_in_range(),
            weld_out_of_range(),
            range_too_wide(),
            loop_weld(),
            loop_overrun(),
            branch_on_parameter(),
            aliased_robots(),
            field_weld(),
            two_methods(),
            unsupported_division(),
        ] {
            catalog.insert(class);
        }
        catalog
    }

    pub fn insert(&mut self, class: Class) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ProgramProvider for Catalog {
    fn load_class(&self, name: &str) -> Option<Class> {
        self.classes.get(name).cloned()
    }

    fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }
}

fn robot() -> Type {
    Type::Ref("Robot".to_string())
}

fn new_class(name: &str) -> ClassBuilder {
    let mut class = ClassBuilder::new(name);
    class.method(CONSTRUCTOR_NAME, |m| {
        m.local("r0", Type::Ref(name.to_string()));
        m.this("r0");
        m.ret();
    });
    class
}

fn new_robot(m: &mut MethodBuilder, target: &str, left: i64, right: i64) {
    m.new_object(target, "Robot", vec![Value::Const(left), Value::Const(right)]);
}

/// `Robot(0, 10)`: `weldAt(5)`, `weldBetween(2, 8)`.
fn weld_in_range() -> Class {
    let mut class = new_class("WeldInRange");
    class.method("run", |m| {
        m.local("r1", robot());
        new_robot(m, "r1", 0, 10);
        m.invoke("r1", "weldAt", vec![Value::Const(5)]);
        m.invoke("r1", "weldBetween", vec![Value::Const(2), Value::Const(8)]);
        m.ret();
    });
    class.build()
}

/// `Robot(0, 10)`: `weldAt(20)`.
fn weld_out_of_range() -> Class {
    let mut class = new_class("WeldOutOfRange");
    class.method("run", |m| {
        m.local("r1", robot());
        new_robot(m, "r1", 0, 10);
        m.invoke("r1", "weldAt", vec![Value::Const(20)]);
        m.invoke("r1", "weldBetween", vec![Value::Const(2), Value::Const(8)]);
        m.ret();
    });
    class.build()
}

/// `Robot(0, 5)`: `weldAt(3)`, `weldBetween(2, 8)`.
fn range_too_wide() -> Class {
    let mut class = new_class("RangeTooWide");
    class.method("run", |m| {
        m.local("r1", robot());
        new_robot(m, "r1", 0, 5);
        m.invoke("r1", "weldAt", vec![Value::Const(3)]);
        m.invoke("r1", "weldBetween", vec![Value::Const(2), Value::Const(8)]);
        m.ret();
    });
    class.build()
}

/// `for (i = 0; i < 10; i++) { r.weldAt(i); r.weldBetween(i, 9); }` on `Robot(0, 10)`.
fn loop_weld() -> Class {
    let mut class = new_class("LoopWeld");
    class.method("run", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        let head = m.label();
        let exit = m.label();
        new_robot(m, "r1", 0, 10);
        m.assign("i0", 0);
        m.bind(head);
        m.branch(CmpOp::Ge, Value::local("i0"), 10, exit);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.invoke("r1", "weldBetween", vec![Value::local("i0"), Value::Const(9)]);
        m.binary("i0", BinOp::Add, Value::local("i0"), 1);
        m.goto(head);
        m.bind(exit);
        m.ret();
    });
    class.build()
}

/// `for (i = 0; i < 20; i++) { r.weldAt(i); r.weldBetween(0, i); }` on `Robot(0, 10)`.
fn loop_overrun() -> Class {
    let mut class = new_class("LoopOverrun");
    class.method("run", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        let head = m.label();
        let exit = m.label();
        new_robot(m, "r1", 0, 10);
        m.assign("i0", 0);
        m.bind(head);
        m.branch(CmpOp::Ge, Value::local("i0"), 20, exit);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.invoke("r1", "weldBetween", vec![Value::Const(0), Value::local("i0")]);
        m.binary("i0", BinOp::Add, Value::local("i0"), 1);
        m.goto(head);
        m.bind(exit);
        m.ret();
    });
    class.build()
}

/// `run(int p)`: welds at `p` only when `0 <= p <= 10`.
fn branch_on_parameter() -> Class {
    let mut class = new_class("BranchOnParameter");
    class.method("run", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        let done = m.label();
        m.param("i0", 0);
        new_robot(m, "r1", 0, 10);
        m.branch(CmpOp::Lt, Value::local("i0"), 0, done);
        m.branch(CmpOp::Gt, Value::local("i0"), 10, done);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.invoke("r1", "weldBetween", vec![Value::local("i0"), Value::Const(10)]);
        m.bind(done);
        m.ret();
    });
    class.build()
}

/// `r3` may be `Robot(0, 10)` or `Robot(20, 30)`; `r3.weldAt(5)`.
fn aliased_robots() -> Class {
    let mut class = new_class("AliasedRobots");
    class.method("run", |m| {
        m.local("i0", Type::Int);
        m.local("r1", robot());
        m.local("r2", robot());
        m.local("r3", robot());
        let second = m.label();
        let join = m.label();
        m.param("i0", 0);
        new_robot(m, "r1", 0, 10);
        new_robot(m, "r2", 20, 30);
        m.branch(CmpOp::Eq, Value::local("i0"), 0, second);
        m.assign("r3", Value::local("r1"));
        m.goto(join);
        m.bind(second);
        m.assign("r3", Value::local("r2"));
        m.bind(join);
        m.invoke("r3", "weldAt", vec![Value::Const(5)]);
        m.ret();
    });
    class.build()
}

/// Weld point read back from an `int` field.
fn field_weld() -> Class {
    let mut class = new_class("FieldWeld");
    class.field("offset", Type::Int);
    class.method("run", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        new_robot(m, "r1", 0, 10);
        m.store_field("offset", 4);
        m.binary("i0", BinOp::Add, Value::Field("offset".to_string()), 2);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.invoke("r1", "weldBetween", vec![Value::Field("offset".to_string()), Value::local("i0")]);
        m.ret();
    });
    class.build()
}

/// One safe method and one that welds past the end.
fn two_methods() -> Class {
    let mut class = new_class("TwoMethods");
    class.method("safe", |m| {
        m.local("r1", robot());
        new_robot(m, "r1", 0, 10);
        m.invoke("r1", "weldAt", vec![Value::Const(10)]);
        m.ret();
    });
    class.method("unsafe", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        new_robot(m, "r1", 0, 10);
        m.assign("i0", 7);
        m.binary("i0", BinOp::Mul, Value::local("i0"), 2);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.ret();
    });
    class.build()
}

/// Integer division is not modelled; the weld after it cannot be checked.
fn unsupported_division() -> Class {
    let mut class = new_class("UnsupportedDivision");
    class.method("run", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        new_robot(m, "r1", 0, 10);
        m.binary("i0", BinOp::Div, 40, 2);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.ret();
    });
    class.build()
}
