//! Predicate expression trees and their fluent builder
//!
//! Predicates name entity properties, never SQL columns; the translator
//! resolves each [`Expr::Member`] through the entity's metadata.
//!
//! # Examples
//! ```
//! use predisql_core::predicate::field;
//!
//! let adults_named_bob = field("Age").ge(18).and(field("Name").eq("Bob"));
//! let short_names = field("Name").len().lt(4);
//! let no_email = field("Email").is_null();
//! # let _ = (adults_named_bob, short_names, no_email);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Not, Rem, Sub};

use crate::dialect::functions;
use crate::operator::{ArithOp, CompareOp};
use crate::{Entity, Result, Value};

/// Function applied in a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `target LIKE '%pattern%'`
    Contains,
    /// `target LIKE 'pattern%'`
    StartsWith,
    /// `target LIKE '%pattern'`
    EndsWith,
    /// Logical scalar function resolved through the dialect
    Named(String),
}

/// Node of a predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Entity property
    Member(String),
    /// Constant, always bound as a parameter
    Literal(Value),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Call {
        function: Function,
        args: Vec<Expr>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `expr IN (values...)`
    InList {
        expr: Box<Expr>,
        values: Vec<Value>,
    },
}

/// Reference an entity property
pub fn field(property: &str) -> Expr {
    Expr::Member(property.to_string())
}

/// A constant operand
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Call a logical function (see [`functions`])
pub fn call(function: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        function: Function::Named(function.to_string()),
        args,
    }
}

impl Expr {
    /// Node kind, as reported by translation errors
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Member(_) => "Member",
            Expr::Literal(_) => "Literal",
            Expr::Compare { .. } => "Compare",
            Expr::And(_, _) => "And",
            Expr::Or(_, _) => "Or",
            Expr::Not(_) => "Not",
            Expr::Call { .. } => "Call",
            Expr::Arith { .. } => "Arith",
            Expr::InList { .. } => "InList",
        }
    }

    pub fn compare(self, op: CompareOp, rhs: Expr) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Compare against a literal using an operator spelled as a string
    pub fn op(self, op: &str, value: impl Into<Value>) -> Result<Expr> {
        Ok(self.compare(op.parse()?, lit(value)))
    }

    pub fn eq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Eq, lit(value))
    }

    pub fn ne(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Ne, lit(value))
    }

    pub fn lt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lt, lit(value))
    }

    pub fn le(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Le, lit(value))
    }

    pub fn gt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gt, lit(value))
    }

    pub fn ge(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Ge, lit(value))
    }

    /// Column-to-expression equality, e.g. `field("A").eq_expr(field("B"))`
    pub fn eq_expr(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne_expr(self, rhs: Expr) -> Expr {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn is_null(self) -> Expr {
        self.eq(Value::Null)
    }

    pub fn is_not_null(self) -> Expr {
        self.ne(Value::Null)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }

    pub fn contains(self, pattern: &str) -> Expr {
        self.like(Function::Contains, pattern)
    }

    pub fn starts_with(self, pattern: &str) -> Expr {
        self.like(Function::StartsWith, pattern)
    }

    pub fn ends_with(self, pattern: &str) -> Expr {
        self.like(Function::EndsWith, pattern)
    }

    fn like(self, function: Function, pattern: &str) -> Expr {
        Expr::Call {
            function,
            args: vec![self, lit(pattern)],
        }
    }

    pub fn len(self) -> Expr {
        call(functions::LENGTH, vec![self])
    }

    pub fn upper(self) -> Expr {
        call(functions::UPPER, vec![self])
    }

    pub fn lower(self) -> Expr {
        call(functions::LOWER, vec![self])
    }

    pub fn trim(self) -> Expr {
        call(functions::TRIM, vec![self])
    }

    pub fn in_list<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::InList {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn arith(self, op: ArithOp, rhs: Expr) -> Expr {
        Expr::Arith {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::Not(Box::new(self))
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Self::Output {
        self.arith(ArithOp::Add, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Self::Output {
        self.arith(ArithOp::Sub, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Self::Output {
        self.arith(ArithOp::Mul, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Self::Output {
        self.arith(ArithOp::Div, rhs)
    }
}

impl Rem for Expr {
    type Output = Expr;

    fn rem(self, rhs: Expr) -> Self::Output {
        self.arith(ArithOp::Rem, rhs)
    }
}

/// A boolean expression over the properties of entity `T`
pub struct Predicate<T> {
    expr: Expr,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Predicate<T> {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            _entity: PhantomData,
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn and(self, other: Predicate<T>) -> Self {
        Self::new(self.expr.and(other.expr))
    }

    pub fn or(self, other: Predicate<T>) -> Self {
        Self::new(self.expr.or(other.expr))
    }
}

impl<T: Entity> From<Expr> for Predicate<T> {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("entity", &std::any::type_name::<T>())
            .field("expr", &self.expr)
            .finish()
    }
}
