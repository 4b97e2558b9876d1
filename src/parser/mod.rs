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

mod ast;
mod function;
pub mod lex;
mod parse;
pub(crate) mod production;
pub mod token;
mod tree;
mod visitor;

pub use ast::{
    BinaryExpr, BinaryOp, Call, Expr, FloatLiteral, FunctionArgs, Identifier, IntLiteral,
    StringLiteral,
};
pub use function::{get_function, ArgType, Function, Param, ANOMALIES_DEFAULT_BOUNDS};
pub use lex::{is_valid_token, Syntax, TokenRule};
pub use parse::{parse, parse_formula, parse_query};
pub use tree::{ParseTree, Rule};
pub use visitor::{visit_formula, visit_query};
