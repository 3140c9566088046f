//! Typed expression trees that are compiled into circuits.
//!
//! Expressions are built explicitly, either through the enum variants or through the helper
//! functions and operator overloads in this module:
//!
//! ```
//! use gatevm::{
//!     ast::{var, Param, Program},
//!     circuit::{Party, RevealPolicy},
//!     types::IntType,
//! };
//!
//! let program = Program {
//!     params: vec![
//!         Param::new("a", IntType::U8, Party::Garbler),
//!         Param::new("b", IntType::U8, Party::Evaluator),
//!     ],
//!     ret: IntType::U8,
//!     reveal: RevealPolicy::EvaluatorOnly,
//!     body: var("a") + var("b"),
//! };
//! let compiled = gatevm::compile(&program).unwrap();
//! assert_eq!(compiled.circuit.inputs().len(), 16);
//! ```

use std::{fmt, ops};

use serde::{Deserialize, Serialize};

use crate::{
    circuit::{Party, RevealPolicy},
    types::{IntType, Literal},
};

/// An input parameter of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// The variable name the parameter is bound to in the body.
    pub name: String,
    /// The type of the parameter.
    pub ty: IntType,
    /// The party providing the value.
    pub party: Party,
}

impl Param {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, ty: IntType, party: Party) -> Self {
        Self {
            name: name.into(),
            ty,
            party,
        }
    }
}

/// A function over the private inputs of both parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// The parameters, in the order of the circuit's primary inputs.
    pub params: Vec<Param>,
    /// The declared return type.
    pub ret: IntType,
    /// Who learns the result.
    pub reveal: RevealPolicy,
    /// The expression computing the result.
    pub body: Expr,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise (or, for `bool`, logical) negation.
    Not,
    /// Two's complement negation, signed types only.
    Neg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("!"),
            UnaryOp::Neg => f.write_str("-"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `+`, wrapping.
    Add,
    /// `-`, wrapping.
    Sub,
    /// `*`, wrapping.
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`, on `bool` only.
    And,
    /// `||`, on `bool` only.
    Or,
}

impl BinOp {
    /// Whether the operator compares its operands and produces a `bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(symbol)
    }
}

/// A range `start..end` or `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePattern {
    /// Inclusive lower bound.
    pub start: Literal,
    /// Upper bound, inclusive or exclusive depending on `inclusive`.
    pub end: Literal,
    /// `true` for `start..=end`.
    pub inclusive: bool,
}

impl RangePattern {
    /// `start..end`
    pub fn exclusive(start: Literal, end: Literal) -> Self {
        Self {
            start,
            end,
            inclusive: false,
        }
    }

    /// `start..=end`
    pub fn inclusive(start: Literal, end: Literal) -> Self {
        Self {
            start,
            end,
            inclusive: true,
        }
    }
}

/// The pattern of a match arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// Matches exactly this value.
    Literal(Literal),
    /// Matches all values in the range.
    Range(RangePattern),
    /// Matches everything, the default arm.
    Wildcard,
}

/// An arm of a match expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arm {
    /// The pattern tested against the scrutinee.
    pub pattern: Pattern,
    /// The value of the match if the pattern is the first one to match.
    pub body: Expr,
}

impl Arm {
    /// Creates an arm.
    pub fn new(pattern: Pattern, body: Expr) -> Self {
        Self { pattern, body }
    }
}

/// A statement inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    /// `let name = expr;`, visible until the end of the block.
    Let(String, Expr),
    /// `name = expr;`, the new value must have the type of the variable.
    Assign(String, Expr),
    /// `name op= expr;`, shorthand for `name = name op expr;`.
    CompoundAssign(String, BinOp, Expr),
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// A variable bound by a parameter or a `let`.
    Var(String),
    /// A constant.
    Lit(Literal),
    /// A unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// An explicit conversion to another type.
    Cast(IntType, Box<Expr>),
    /// `if cond { then } else { otherwise }`
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Tests whether the value lies in the range, producing a `bool`.
    InRange(Box<Expr>, RangePattern),
    /// Selects the body of the first matching arm; requires a wildcard arm.
    Match(Box<Expr>, Vec<Arm>),
    /// Statements followed by the value of the block.
    Block(Vec<Stmt>, Box<Expr>),
}

/// A variable reference.
pub fn var(name: impl Into<String>) -> Expr {
    Expr::Var(name.into())
}

/// A constant.
pub fn lit(literal: Literal) -> Expr {
    Expr::Lit(literal)
}

/// `if cond { then } else { otherwise }`
pub fn if_else(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::If(Box::new(cond), Box::new(then), Box::new(otherwise))
}

/// A match over `scrutinee`.
pub fn match_on(scrutinee: Expr, arms: Vec<Arm>) -> Expr {
    Expr::Match(Box::new(scrutinee), arms)
}

/// A block of statements ending in `result`.
pub fn block(stmts: Vec<Stmt>, result: Expr) -> Expr {
    Expr::Block(stmts, Box::new(result))
}

impl Expr {
    /// A binary operation.
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// `self == rhs`
    pub fn equals(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Eq, self, rhs)
    }

    /// `self != rhs`
    pub fn not_equals(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Ne, self, rhs)
    }

    /// `self < rhs`
    pub fn less_than(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Lt, self, rhs)
    }

    /// `self <= rhs`
    pub fn less_eq(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Le, self, rhs)
    }

    /// `self > rhs`
    pub fn greater_than(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Gt, self, rhs)
    }

    /// `self >= rhs`
    pub fn greater_eq(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Ge, self, rhs)
    }

    /// `self && rhs`
    pub fn and(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::And, self, rhs)
    }

    /// `self || rhs`
    pub fn or(self, rhs: Expr) -> Expr {
        Self::binary(BinOp::Or, self, rhs)
    }

    /// `self as ty`
    pub fn cast(self, ty: IntType) -> Expr {
        Expr::Cast(ty, Box::new(self))
    }

    /// Tests whether `self` lies in `range`.
    pub fn in_range(self, range: RangePattern) -> Expr {
        Expr::InRange(Box::new(self), range)
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinOp::Add);
binary_operator!(Sub, sub, BinOp::Sub);
binary_operator!(Mul, mul, BinOp::Mul);
binary_operator!(Div, div, BinOp::Div);
binary_operator!(Rem, rem, BinOp::Rem);
binary_operator!(BitAnd, bitand, BinOp::BitAnd);
binary_operator!(BitOr, bitor, BinOp::BitOr);
binary_operator!(BitXor, bitxor, BinOp::BitXor);
binary_operator!(Shl, shl, BinOp::Shl);
binary_operator!(Shr, shr, BinOp::Shr);

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary(UnaryOp::Not, Box::new(self))
    }
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary(UnaryOp::Neg, Box::new(self))
    }
}
