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

use crate::parser::{BinaryExpr, Expr};

/// Callbacks for a depth first walk over a formula [Expr].
///
/// `pre_visit` runs on a node before its operands or call arguments,
/// `post_visit` after them. Either one stops the walk by returning `Ok(false)`.
pub trait ExprVisitor {
    type Error;

    fn pre_visit(&mut self, expr: &Expr) -> Result<bool, Self::Error>;

    fn post_visit(&mut self, _expr: &Expr) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Walks `expr` with `visitor`. `Ok(false)` means a callback stopped the walk
/// early.
pub fn walk_expr<V: ExprVisitor>(visitor: &mut V, expr: &Expr) -> Result<bool, V::Error> {
    if !visitor.pre_visit(expr)? {
        return Ok(false);
    }

    let recurse = match expr {
        Expr::Binary(BinaryExpr { lhs, rhs, .. }) => {
            walk_expr(visitor, lhs)? && walk_expr(visitor, rhs)?
        }
        Expr::Call(call) => {
            let mut all = true;
            for arg in call.args().iter() {
                if !walk_expr(visitor, arg)? {
                    all = false;
                    break;
                }
            }
            all
        }
        Expr::IntLiteral(_)
        | Expr::FloatLiteral(_)
        | Expr::StringLiteral(_)
        | Expr::Identifier(_) => true,
    };

    if !recurse {
        return Ok(false);
    }
    visitor.post_visit(expr)
}
