//! Program representation consumed by the analysis.
//!
//! The IR is a flat, three-address statement list per method, in the spirit of
//! a typed stack-less bytecode: every operand of an expression is a [`Value`]
//! (constant, local, field, parameter), and control flow is expressed with
//! explicit `If`/`Goto` jumps to statement indices.
//!
//! Statement and expression kinds are closed enums, so every consumer matches
//! them exhaustively.

use std::fmt;

use crate::condition::CmpOp;

/// Index of a statement within a method body. Each statement is one program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(pub usize);

impl PointId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a method in [`Class::methods`].
///
/// Overloads share a name, so per-method side tables are keyed by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(pub usize);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}", self.0)
    }
}

/// Identity of an object-creation site, unique within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AllocSite(pub u32);

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new#{}", self.0)
    }
}

/// Static type of a local or field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Ref(String),
}

impl Type {
    /// Integral types occupy a slot in the numeric environment.
    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Boolean | Type::Byte | Type::Char | Type::Short | Type::Int)
    }

    /// Types whose assignments the transfer function models.
    pub fn is_tracked_numeric(&self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Int)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Ref(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Byte => write!(f, "byte"),
            Type::Char => write!(f, "char"),
            Type::Short => write!(f, "short"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Ref(class) => write!(f, "{}", class),
        }
    }
}

/// A named, typed variable (method local or class field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Operand of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer literal.
    Const(i64),
    /// Method local.
    Local(String),
    /// Field of the enclosing class.
    Field(String),
    /// Formal parameter; its value is statically unknown.
    Param(usize),
    /// The receiver of the current method.
    This,
}

impl Value {
    pub fn local(name: impl Into<String>) -> Self {
        Value::Local(name.into())
    }

    pub fn as_local(&self) -> Option<&str> {
        match self {
            Value::Local(name) => Some(name),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Const(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Const(value as i64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(n) => write!(f, "{}", n),
            Value::Local(name) => write!(f, "{}", name),
            Value::Field(name) => write!(f, "this.{}", name),
            Value::Param(i) => write!(f, "@parameter{}", i),
            Value::This => write!(f, "@this"),
        }
    }
}

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        };
        write!(f, "{}", s)
    }
}

/// Method call: `receiver.method(args)`, or a static call without receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub receiver: Option<String>,
    pub method: String,
    pub args: Vec<Value>,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        match &self.receiver {
            Some(receiver) => write!(f, "{}.{}({})", receiver, self.method, args.join(", ")),
            None => write!(f, "{}({})", self.method, args.join(", ")),
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Use(Value),
    Binary(BinOp, Value, Value),
    Invoke(Call),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Use(v) => write!(f, "{}", v),
            Expr::Binary(op, lhs, rhs) => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Invoke(call) => write!(f, "{}", call),
        }
    }
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    Local(String),
    Field(String),
}

impl Place {
    pub fn name(&self) -> &str {
        match self {
            Place::Local(name) | Place::Field(name) => name,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Local(name) => write!(f, "{}", name),
            Place::Field(name) => write!(f, "this.{}", name),
        }
    }
}

/// Branch condition `lhs OP rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub op: CmpOp,
    pub lhs: Value,
    pub rhs: Value,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// One statement, i.e. one program point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `target = value`.
    Assign { target: Place, value: Expr },
    /// `target = new class`: object construction bound to a local.
    New { target: String, site: AllocSite, class: String },
    /// `receiver.<init>(args)`: constructor invocation on a freshly created object.
    Construct { receiver: String, class: String, args: Vec<Value> },
    /// Call whose result is discarded.
    Invoke(Call),
    /// `if cond goto target`.
    If { cond: Condition, target: PointId },
    Goto(PointId),
    Return,
    Nop,
}

/// Classification of statements at the analysis boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Assignment,
    ObjectConstruction,
    ConstructorInvocation,
    ConditionalBranch,
    OtherCall,
    Unclassified,
}

impl Stmt {
    pub fn kind(&self) -> StmtKind {
        match self {
            Stmt::Assign { .. } => StmtKind::Assignment,
            Stmt::New { .. } => StmtKind::ObjectConstruction,
            Stmt::Construct { .. } => StmtKind::ConstructorInvocation,
            Stmt::If { .. } => StmtKind::ConditionalBranch,
            Stmt::Invoke(_) => StmtKind::OtherCall,
            Stmt::Goto(_) | Stmt::Return | Stmt::Nop => StmtKind::Unclassified,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { target, value } => write!(f, "{} = {}", target, value),
            Stmt::New { target, site, class } => write!(f, "{} = new {} ({})", target, class, site),
            Stmt::Construct { receiver, class, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}.<{}: init>({})", receiver, class, args.join(", "))
            }
            Stmt::Invoke(call) => write!(f, "{}", call),
            Stmt::If { cond, target } => write!(f, "if {} goto {}", cond, target),
            Stmt::Goto(target) => write!(f, "goto {}", target),
            Stmt::Return => write!(f, "return"),
            Stmt::Nop => write!(f, "nop"),
        }
    }
}

/// Name of constructor methods.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// A method: typed locals and a statement list.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub locals: Vec<Variable>,
    pub body: Vec<Stmt>,
}

impl Method {
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn local(&self, name: &str) -> Option<&Variable> {
        self.locals.iter().find(|v| v.name == name)
    }

    pub fn stmt(&self, point: PointId) -> &Stmt {
        &self.body[point.0]
    }

    /// Iterator over `(point, statement)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (PointId, &Stmt)> {
        self.body.iter().enumerate().map(|(i, s)| (PointId(i), s))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}() {{", self.name)?;
        for local in &self.locals {
            writeln!(f, "    {} {};", local.ty, local.name)?;
        }
        for (point, stmt) in self.points() {
            writeln!(f, "  {:>4}: {}", point, stmt)?;
        }
        write!(f, "}}")
    }
}

/// A class: fields and methods.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub fields: Vec<Variable>,
    pub methods: Vec<Method>,
}

impl Class {
    /// First method called `name`.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Methods paired with their positions.
    pub fn indexed_methods(&self) -> impl Iterator<Item = (MethodId, &Method)> {
        self.methods.iter().enumerate().map(|(i, m)| (MethodId(i), m))
    }

    /// Names of integral fields, in declaration order.
    pub fn integral_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.ty.is_integral()).map(|f| f.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Source of classes to analyze.
pub trait ProgramProvider {
    /// Loads the class named `name`, or `None` if the provider does not know it.
    fn load_class(&self, name: &str) -> Option<Class>;

    /// Names of all classes the provider can load.
    fn class_names(&self) -> Vec<String>;
}
