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

//! Turns a [ParseTree] into a [QueryState] or a formula [Expr].
//!
//! The transform is a recursive match on node labels. Keywords are resolved
//! against their closed sets here, not in the grammar, so that errors can
//! name the offending token and its alternatives.

use tracing::trace;

use crate::error::ParseError;
use crate::filter::{Filter, FilterCond, FilterOp, Tag, TmplVar};
use crate::parser::{get_function, BinaryOp, Expr, ParseTree, Rule};
use crate::query::{
    AggFunc, AsModifier, Fill, FillFunc, Metric, QueryState, Rollup, RollupFunc,
};
use crate::util::number::{parse_number, Number};
use crate::util::Keyword;

fn invalid(node: &ParseTree, message: impl Into<String>) -> ParseError {
    ParseError::Invalid {
        position: node.start,
        message: message.into(),
    }
}

fn unexpected(node: &ParseTree) -> ParseError {
    invalid(node, format!("unexpected {} '{}'", node.rule, node.text))
}

fn expect_rule(node: &ParseTree, rule: Rule) -> Result<(), ParseError> {
    if node.rule != rule {
        return Err(invalid(
            node,
            format!("expected {rule}, found {} '{}'", node.rule, node.text),
        ));
    }
    Ok(())
}

fn nth_child(node: &ParseTree, n: usize) -> Result<&ParseTree, ParseError> {
    node.children
        .get(n)
        .ok_or_else(|| invalid(node, format!("malformed {} '{}'", node.rule, node.text)))
}

/// resolves a keyword leaf, positioning the error on that leaf
fn keyword<K: Keyword>(node: &ParseTree) -> Result<K, ParseError> {
    K::from_keyword(&node.text).map_err(|e| invalid(node, e.message()))
}

fn unsigned(node: &ParseTree) -> Result<u64, ParseError> {
    node.text
        .parse()
        .map_err(|_| invalid(node, format!("{} '{}' is out of range", node.rule, node.text)))
}

pub fn visit_query(tree: &ParseTree) -> Result<QueryState, ParseError> {
    expect_rule(tree, Rule::Query)?;
    trace!(tree = %tree, "visiting query");

    let metric = tree
        .child(Rule::Metric)
        .ok_or_else(|| invalid(tree, "query without a metric"))?;
    let mut state = QueryState::new(Metric::new(&metric.text), None);

    for child in &tree.children {
        match child.rule {
            Rule::Metric => {}
            Rule::AggFunc => state.set_agg(keyword::<AggFunc>(child)?)?,
            Rule::Filter => state.filter = visit_filter(child)?,
            Rule::Grouping => {
                let tags = child
                    .children
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>();
                state.add_by(&tags)?;
            }
            Rule::AsCount => state.set_modifier(AsModifier::Count)?,
            Rule::AsRate => state.set_modifier(AsModifier::Rate)?,
            Rule::Rollup => state.push_rollup(visit_rollup(child)?)?,
            Rule::Fill => state.push_fill(visit_fill(child)?)?,
            _ => return Err(unexpected(child)),
        }
    }
    Ok(state)
}

/// `{*}` yields no filter at all
fn visit_filter(node: &ParseTree) -> Result<Option<Filter>, ParseError> {
    let mut filter = Filter::empty();
    for child in &node.children {
        match child.rule {
            Rule::Wildcard => return Ok(None),
            _ => filter = filter.append(visit_condition(child, FilterOp::Equal)?),
        }
    }
    Ok(Some(filter))
}

fn visit_condition(node: &ParseTree, op: FilterOp) -> Result<FilterCond, ParseError> {
    match node.rule {
        Rule::Negation => visit_condition(nth_child(node, 0)?, FilterOp::NotEqual),
        Rule::TemplateVariable => Ok(TmplVar::new(op, &node.text).into()),
        Rule::Tag => {
            let name = nth_child(node, 0)?;
            let value = node.child(Rule::TagValue).map(|v| v.text.as_str());
            Ok(Tag::new(op, &name.text, value).into())
        }
        _ => Err(unexpected(node)),
    }
}

/// A missing function is the default rollup, not `avg`.
fn visit_rollup(node: &ParseTree) -> Result<Rollup, ParseError> {
    let func = match node.child(Rule::RollupFunc) {
        Some(func) => keyword::<RollupFunc>(func)?,
        None => RollupFunc::Default,
    };
    let period = node.child(Rule::Period).map(unsigned).transpose()?;
    Ok(Rollup { func, period })
}

fn visit_fill(node: &ParseTree) -> Result<Fill, ParseError> {
    let func = keyword::<FillFunc>(nth_child(node, 0)?)?;
    let limit = node.child(Rule::Limit).map(unsigned).transpose()?;
    Ok(Fill { func, limit })
}

/// Where a formula sub-expression sits; decides whether commas and strings
/// are legal there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// top level of the formula, where `a, b` lists several series
    Root,
    Operand,
    Argument,
}

pub fn visit_formula(tree: &ParseTree) -> Result<Expr, ParseError> {
    expect_rule(tree, Rule::Formula)?;
    trace!(tree = %tree, "visiting formula");
    visit_expr(nth_child(tree, 0)?, Scope::Root)
}

fn visit_expr(node: &ParseTree, scope: Scope) -> Result<Expr, ParseError> {
    match node.rule {
        Rule::ParenExpr => {
            let inner = if scope == Scope::Root {
                Scope::Root
            } else {
                Scope::Operand
            };
            visit_expr(nth_child(node, 0)?, inner)
        }
        Rule::BinaryExpr => {
            let op = keyword::<BinaryOp>(nth_child(node, 1)?)?;
            let (lhs, rhs) = (nth_child(node, 0)?, nth_child(node, 2)?);
            match op {
                BinaryOp::Comma if scope != Scope::Root => {
                    Err(invalid(node, format!("nested comma expression '{}'", node.text)))
                }
                BinaryOp::Comma => Ok(Expr::comma(
                    visit_expr(lhs, Scope::Root)?,
                    visit_expr(rhs, Scope::Operand)?,
                )),
                _ => Ok(Expr::new_binary_expr(
                    visit_expr(lhs, Scope::Operand)?,
                    op,
                    visit_expr(rhs, Scope::Operand)?,
                )),
            }
        }
        Rule::Call => visit_call(node),
        Rule::Identifier => Ok(Expr::identifier(node.text.as_str())),
        Rule::Number => match parse_number(&node.text).map_err(|e| invalid(node, e))? {
            Number::Int(val) => Ok(Expr::from(val)),
            Number::Float(val) => Ok(Expr::from(val)),
        },
        Rule::String if scope == Scope::Argument => {
            let raw = &node.text;
            let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
            let val = unescaper::unescape(inner)
                .map_err(|e| invalid(node, format!("invalid string {raw}: {e}")))?;
            Ok(Expr::string(val))
        }
        Rule::String => Err(invalid(
            node,
            format!("string {} is only allowed as a function argument", node.text),
        )),
        _ => Err(unexpected(node)),
    }
}

fn visit_call(node: &ParseTree) -> Result<Expr, ParseError> {
    let name = nth_child(node, 0)?;
    let func = get_function(&name.text)
        .ok_or_else(|| invalid(name, format!("unknown function '{}'", name.text)))?;

    let mut args = vec![];
    for arg in flatten_arguments(nth_child(node, 1)?)? {
        args.push(visit_expr(arg, Scope::Argument)?);
    }
    Ok(Expr::new_call(func, args)?)
}

/// The grammar reads `f(a, b, c)` as `f(((a, b), c))`, a left leaning chain
/// of comma nodes. Unroll it into `[a, b, c]`.
fn flatten_arguments(node: &ParseTree) -> Result<Vec<&ParseTree>, ParseError> {
    if node.rule == Rule::BinaryExpr && keyword::<BinaryOp>(nth_child(node, 1)?)? == BinaryOp::Comma {
        let mut args = flatten_arguments(nth_child(node, 0)?)?;
        args.push(nth_child(node, 2)?);
        return Ok(args);
    }
    Ok(vec![node])
}
