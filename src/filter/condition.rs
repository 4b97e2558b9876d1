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

use std::fmt;
use std::ops::BitAnd;

use crate::util::join_vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Equal,
    NotEqual,
}

/// Rendered as a prefix of the condition: nothing, or `!`.
impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Equal => Ok(()),
            FilterOp::NotEqual => write!(f, "!"),
        }
    }
}

/// `role:cache`, `!role:cache`, or a bare `role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub name: String,
    pub value: Option<String>,
    pub op: FilterOp,
}

impl Tag {
    pub fn new(op: FilterOp, name: &str, value: Option<&str>) -> Self {
        Self {
            op,
            name: name.into(),
            value: value.map(String::from),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.name)?;
        if let Some(value) = &self.value {
            write!(f, ":{value}")?;
        }
        Ok(())
    }
}

/// Reference to a dashboard template variable, stored without its `$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TmplVar {
    pub name: String,
    pub op: FilterOp,
}

impl TmplVar {
    pub fn new(op: FilterOp, name: &str) -> Self {
        Self {
            op,
            name: name.trim_start_matches('$').into(),
        }
    }
}

impl fmt::Display for TmplVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}", self.op, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterCond {
    Tag(Tag),
    TmplVar(TmplVar),
}

impl From<Tag> for FilterCond {
    fn from(tag: Tag) -> Self {
        FilterCond::Tag(tag)
    }
}

impl From<TmplVar> for FilterCond {
    fn from(tvar: TmplVar) -> Self {
        FilterCond::TmplVar(tvar)
    }
}

impl fmt::Display for FilterCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterCond::Tag(t) => write!(f, "{t}"),
            FilterCond::TmplVar(t) => write!(f, "{t}"),
        }
    }
}

/// Ordered filter conditions. Order is kept as given, it is part of the
/// generated query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Filter {
    pub conds: Vec<FilterCond>,
}

impl Filter {
    pub fn empty() -> Self {
        Self { conds: vec![] }
    }

    pub fn one(cond: FilterCond) -> Self {
        Self { conds: vec![cond] }
    }

    pub fn append(mut self, cond: FilterCond) -> Self {
        self.conds.push(cond);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
    }

    pub fn contains(&self, cond: &FilterCond) -> bool {
        self.conds.contains(cond)
    }

    /// Appends `cond` unless an identical condition is already present.
    /// Returns whether it was added.
    pub fn push_unique(&mut self, cond: FilterCond) -> bool {
        if self.contains(&cond) {
            return false;
        }
        self.conds.push(cond);
        true
    }
}

/// An empty filter matches everything and renders as `{*}`.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conds.is_empty() {
            return write!(f, "{{*}}");
        }
        write!(f, "{{{}}}", join_vector(&self.conds, ", ", false))
    }
}

/// Concatenation, keeping the conditions of both sides in order.
impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(mut self, rhs: Filter) -> Filter {
        self.conds.extend(rhs.conds);
        self
    }
}

impl BitAnd<Option<Filter>> for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Option<Filter>) -> Filter {
        match rhs {
            Some(rhs) => self & rhs,
            None => self,
        }
    }
}
