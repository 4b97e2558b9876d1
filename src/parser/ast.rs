// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Formula AST.
//!
//! Formulas combine named queries with arithmetic and function calls, for
//! instance `(abs(cpu) * 2 - reqs) / log2(cpu)`. Codegen is the [Display]
//! impl: binary operators are always fully parenthesized, except the comma
//! operator which renders as `lhs, rhs`.

use std::fmt::{self, Display};
use std::ops::{Add, Div, Mul, Sub};

use crate::error::FormulaError;
use crate::parser::Function;
use crate::util::number::format_float;
use crate::util::{join_vector, Keyword};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Comma,
}

impl Keyword for BinaryOp {
    const LABEL: &'static str = "Operator";
    const ALL: &'static [Self] = &[
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Comma,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Comma => ",",
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub val: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub val: f64,
}

/// Only legal as a function argument, e.g. the `'max'` in `top(q, 5, 'max', 'desc')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub val: String,
}

/// Reference to a named query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArgs {
    pub args: Vec<Expr>,
}

impl FunctionArgs {
    pub fn new(args: Vec<Expr>) -> Self {
        Self { args }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.args.iter()
    }
}

impl Display for FunctionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join_vector(&self.args, ", ", false))
    }
}

/// A validated call of one of the closed set of [Function]s. The only way to
/// build one is [Call::new], which enforces arity, argument types and domains.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    func: Function,
    args: FunctionArgs,
}

impl Call {
    pub fn new(func: Function, args: Vec<Expr>) -> Result<Self, FormulaError> {
        let args = func.check_args(args)?;
        Ok(Self {
            func,
            args: FunctionArgs::new(args),
        })
    }

    pub fn func(&self) -> Function {
        self.func
    }

    pub fn args(&self) -> &FunctionArgs {
        &self.args
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(IntLiteral),
    FloatLiteral(FloatLiteral),
    StringLiteral(StringLiteral),
    Identifier(Identifier),
    Binary(BinaryExpr),
    Call(Call),
}

impl Expr {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier(Identifier { name: name.into() })
    }

    pub fn string(val: impl Into<String>) -> Self {
        Expr::StringLiteral(StringLiteral { val: val.into() })
    }

    pub fn new_binary_expr(lhs: Expr, op: BinaryOp, rhs: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// `lhs, rhs`: the comma operator has no infix sugar in Rust.
    pub fn comma(lhs: Expr, rhs: Expr) -> Self {
        Expr::new_binary_expr(lhs, BinaryOp::Comma, rhs)
    }

    pub fn new_call(func: Function, args: Vec<Expr>) -> Result<Self, FormulaError> {
        Call::new(func, args).map(Expr::Call)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Expr::StringLiteral(_))
    }

    /// True when `self` can stand where a series is expected: no strings and
    /// no comma lists anywhere outside the arguments of a call.
    pub fn is_series(&self) -> bool {
        match self {
            Expr::StringLiteral(_) => false,
            Expr::Binary(BinaryExpr { op, lhs, rhs }) => {
                *op != BinaryOp::Comma && lhs.is_series() && rhs.is_series()
            }
            Expr::IntLiteral(_) | Expr::FloatLiteral(_) | Expr::Identifier(_) | Expr::Call(_) => true,
        }
    }
}

impl From<i64> for Expr {
    fn from(val: i64) -> Self {
        Expr::IntLiteral(IntLiteral { val })
    }
}

impl From<f64> for Expr {
    fn from(val: f64) -> Self {
        Expr::FloatLiteral(FloatLiteral { val })
    }
}

impl From<Identifier> for Expr {
    fn from(ident: Identifier) -> Self {
        Expr::Identifier(ident)
    }
}

macro_rules! binary_sugar {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::new_binary_expr(self, $op, rhs)
            }
        }
    };
}

binary_sugar!(Add, add, BinaryOp::Add);
binary_sugar!(Sub, sub, BinaryOp::Sub);
binary_sugar!(Mul, mul, BinaryOp::Mul);
binary_sugar!(Div, div, BinaryOp::Div);

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntLiteral(IntLiteral { val }) => write!(f, "{val}"),
            Expr::FloatLiteral(FloatLiteral { val }) => write!(f, "{}", format_float(*val)),
            Expr::StringLiteral(StringLiteral { val }) => write!(f, "{}", quote_string(val)),
            Expr::Identifier(Identifier { name }) => write!(f, "{name}"),
            Expr::Binary(BinaryExpr {
                op: BinaryOp::Comma,
                lhs,
                rhs,
            }) => write!(f, "{lhs}, {rhs}"),
            Expr::Binary(BinaryExpr { op, lhs, rhs }) => write!(f, "({lhs} {op} {rhs})"),
            Expr::Call(Call { func, args }) => write!(f, "{func}({args})"),
        }
    }
}
