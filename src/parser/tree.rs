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

use std::fmt::{self, Display};

/// Label of a [ParseTree] node. Every grammar production that survives into
/// the tree is tagged with one of these, and the visitor dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Query,
    AggFunc,
    Metric,
    Filter,
    Wildcard,
    Negation,
    Tag,
    TagName,
    TagValue,
    TemplateVariable,
    Grouping,
    AsCount,
    AsRate,
    Rollup,
    RollupFunc,
    Period,
    Fill,
    FillFunc,
    Limit,

    Formula,
    BinaryExpr,
    Operator,
    ParenExpr,
    Call,
    FunctionName,
    Identifier,
    Number,
    String,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Query => "query",
            Rule::AggFunc => "agg_func",
            Rule::Metric => "metric",
            Rule::Filter => "filter",
            Rule::Wildcard => "wildcard",
            Rule::Negation => "negation",
            Rule::Tag => "tag",
            Rule::TagName => "tag_name",
            Rule::TagValue => "tag_value",
            Rule::TemplateVariable => "template_variable",
            Rule::Grouping => "grouping",
            Rule::AsCount => "as_count",
            Rule::AsRate => "as_rate",
            Rule::Rollup => "rollup",
            Rule::RollupFunc => "rollup_func",
            Rule::Period => "period",
            Rule::Fill => "fill",
            Rule::FillFunc => "fill_func",
            Rule::Limit => "limit",
            Rule::Formula => "formula",
            Rule::BinaryExpr => "binary_expr",
            Rule::Operator => "operator",
            Rule::ParenExpr => "paren_expr",
            Rule::Call => "call",
            Rule::FunctionName => "function_name",
            Rule::Identifier => "identifier",
            Rule::Number => "number",
            Rule::String => "string",
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete parse tree. Leaves carry the matched source text; inner nodes
/// carry the text of the whole production they span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub rule: Rule,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    pub fn new(rule: Rule, text: String, start: usize, end: usize) -> Self {
        Self {
            rule,
            text,
            start,
            end,
            children: vec![],
        }
    }

    pub fn with_children(mut self, children: Vec<ParseTree>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// the first direct child labelled `rule`
    pub fn child(&self, rule: Rule) -> Option<&ParseTree> {
        self.children.iter().find(|c| c.rule == rule)
    }
}

/// S-expression rendering, handy when eyeballing what the grammar produced:
/// `(query (agg_func "avg") (metric "svcname"))`
impl Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            return write!(f, "({} {:?})", self.rule, self.text);
        }
        write!(f, "({}", self.rule)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        write!(f, ")")
    }
}
