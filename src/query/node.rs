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

//! Query AST. Codegen is the [Display] impl of each node.

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::QueryValidationError;
use crate::filter::Filter;
use crate::parser::Expr;
use crate::util::Keyword;

pub const DATA_SOURCE: &str = "metrics";
/// aggregator reported for queries without an aggregation function
pub const DEFAULT_AGGREGATOR: &str = "avg";

static QUERY_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Process wide unique query names: `q1`, `q2`, ...
pub fn next_query_name() -> String {
    format!("q{}", QUERY_COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Metric {
    pub name: String,
}

impl Metric {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Avg,
    Min,
    Max,
    Sum,
}

impl Keyword for AggFunc {
    const LABEL: &'static str = "Aggregation function";
    const ALL: &'static [Self] = &[AggFunc::Avg, AggFunc::Min, AggFunc::Max, AggFunc::Sum];

    fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Sum => "sum",
        }
    }
}

/// Grouping tags, duplicate free, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct By {
    pub tags: Vec<String>,
}

impl By {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    pub fn push_unique(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.into());
        }
    }
}

impl Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " by {{{}}}", self.tags.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsModifier {
    Rate,
    Count,
}

impl Display for AsModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsModifier::Rate => write!(f, ".as_rate()"),
            AsModifier::Count => write!(f, ".as_count()"),
        }
    }
}

/// `by` and the rate/count modifier hang off the aggregation, so they cannot
/// exist without an aggregation function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregation {
    pub func: AggFunc,
    pub by: Option<By>,
    pub modifier: Option<AsModifier>,
}

impl Aggregation {
    pub fn new(func: AggFunc) -> Self {
        Self {
            func,
            by: None,
            modifier: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollupFunc {
    Avg,
    Min,
    Max,
    Sum,
    Count,
    /// the backend's default rollup, written as `.rollup(<period>)` or omitted
    Default,
}

impl Keyword for RollupFunc {
    const LABEL: &'static str = "Rollup function";
    const ALL: &'static [Self] = &[
        RollupFunc::Avg,
        RollupFunc::Min,
        RollupFunc::Max,
        RollupFunc::Sum,
        RollupFunc::Count,
        RollupFunc::Default,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            RollupFunc::Avg => "avg",
            RollupFunc::Min => "min",
            RollupFunc::Max => "max",
            RollupFunc::Sum => "sum",
            RollupFunc::Count => "count",
            RollupFunc::Default => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rollup {
    pub func: RollupFunc,
    pub period: Option<u64>,
}

impl Display for Rollup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args = vec![];
        if self.func != RollupFunc::Default {
            args.push(self.func.as_str().to_string());
        }
        if let Some(period) = self.period {
            args.push(period.to_string());
        }
        if args.is_empty() {
            return Ok(());
        }
        write!(f, ".rollup({})", args.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillFunc {
    Linear,
    Last,
    Zero,
    Null,
}

impl Keyword for FillFunc {
    const LABEL: &'static str = "Fill function";
    const ALL: &'static [Self] = &[FillFunc::Linear, FillFunc::Last, FillFunc::Zero, FillFunc::Null];

    fn as_str(&self) -> &'static str {
        match self {
            FillFunc::Linear => "linear",
            FillFunc::Last => "last",
            FillFunc::Zero => "zero",
            FillFunc::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fill {
    pub func: FillFunc,
    pub limit: Option<u64>,
}

impl Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, ".fill({}, {limit})", self.func.as_str()),
            None => write!(f, ".fill({})", self.func.as_str()),
        }
    }
}

/// Post processing functions, rendered in the order they were attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostFunction {
    Rollup(Rollup),
    Fill(Fill),
}

impl Display for PostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostFunction::Rollup(r) => write!(f, "{r}"),
            PostFunction::Fill(fill) => write!(f, "{fill}"),
        }
    }
}

/// Dictionary form of a query, as handed to dashboard definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ser", derive(serde::Serialize))]
pub struct QueryDefinition {
    pub aggregator: String,
    pub data_source: String,
    pub name: String,
    pub query: String,
}

#[cfg(feature = "ser")]
impl QueryDefinition {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub metric: Metric,
    pub filter: Option<Filter>,
    pub agg: Option<Aggregation>,
    pub funcs: Vec<PostFunction>,
    pub name: String,
    pub data_source: String,
}

impl QueryState {
    /// A query over `metric`, named `name` or else auto-named.
    pub fn new(metric: Metric, name: Option<&str>) -> Self {
        Self {
            metric,
            filter: None,
            agg: None,
            funcs: vec![],
            name: name.map_or_else(next_query_name, String::from),
            data_source: DATA_SOURCE.into(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    /// Formula identifier referring to this query.
    pub fn identifier(&self) -> Expr {
        Expr::identifier(self.name.as_str())
    }

    pub fn rollup(&self) -> Option<&Rollup> {
        self.funcs.iter().find_map(|f| match f {
            PostFunction::Rollup(r) => Some(r),
            PostFunction::Fill(_) => None,
        })
    }

    pub fn fill(&self) -> Option<&Fill> {
        self.funcs.iter().find_map(|f| match f {
            PostFunction::Fill(fill) => Some(fill),
            PostFunction::Rollup(_) => None,
        })
    }

    pub fn set_agg(&mut self, func: AggFunc) -> Result<(), QueryValidationError> {
        if let Some(existing) = &self.agg {
            return Err(QueryValidationError::new(format!(
                "Cannot set aggregation function '{}' because query already contains aggregation function '{}'",
                func.as_str(),
                existing.func.as_str()
            )));
        }
        self.agg = Some(Aggregation::new(func));
        Ok(())
    }

    pub fn add_by(&mut self, tags: &[&str]) -> Result<(), QueryValidationError> {
        let Some(agg) = self.agg.as_mut() else {
            let tags = tags
                .iter()
                .map(|t| format!("'{t}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(QueryValidationError::new(format!(
                "Cannot set aggregation by {tags} because aggregation function is not set yet"
            )));
        };
        let by = agg.by.get_or_insert_with(By::default);
        for tag in tags {
            by.push_unique(tag);
        }
        Ok(())
    }

    pub fn set_modifier(&mut self, modifier: AsModifier) -> Result<(), QueryValidationError> {
        let call = modifier.to_string();
        let Some(agg) = self.agg.as_mut() else {
            return Err(QueryValidationError::new(format!(
                "Cannot set {} because aggregation function is not set yet",
                &call[1..]
            )));
        };
        if let Some(existing) = agg.modifier.filter(|m| *m != modifier) {
            return Err(QueryValidationError::new(format!(
                "Cannot set {} because query already contains {}",
                &call[1..],
                &existing.to_string()[1..]
            )));
        }
        agg.modifier = Some(modifier);
        Ok(())
    }

    pub fn push_rollup(&mut self, rollup: Rollup) -> Result<(), QueryValidationError> {
        if let Some(existing) = self.rollup() {
            return Err(QueryValidationError::new(format!(
                "Cannot set rollup function '{}' because query already contains rollup function '{}'",
                rollup.func.as_str(),
                existing.func.as_str()
            )));
        }
        self.funcs.push(PostFunction::Rollup(rollup));
        Ok(())
    }

    pub fn push_fill(&mut self, fill: Fill) -> Result<(), QueryValidationError> {
        if let Some(existing) = self.fill() {
            return Err(QueryValidationError::new(format!(
                "Cannot set fill function '{}' because query already contains fill function '{}'",
                fill.func.as_str(),
                existing.func.as_str()
            )));
        }
        self.funcs.push(PostFunction::Fill(fill));
        Ok(())
    }

    pub fn as_dict(&self) -> QueryDefinition {
        QueryDefinition {
            aggregator: self
                .agg
                .as_ref()
                .map_or(DEFAULT_AGGREGATOR, |agg| agg.func.as_str())
                .into(),
            data_source: self.data_source.clone(),
            name: self.name.clone(),
            query: self.to_string(),
        }
    }
}

/// `<agg>:<metric>{<filter>} by {<tags>}.as_<modifier>()<post functions>`
impl Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(agg) = &self.agg {
            write!(f, "{}:", agg.func.as_str())?;
        }
        write!(f, "{}", self.metric)?;
        match &self.filter {
            Some(filter) => write!(f, "{filter}")?,
            None => write!(f, "{{*}}")?,
        }
        if let Some(agg) = &self.agg {
            if let Some(by) = &agg.by {
                write!(f, "{by}")?;
            }
            if let Some(modifier) = &agg.modifier {
                write!(f, "{modifier}")?;
            }
        }
        for func in &self.funcs {
            write!(f, "{func}")?;
        }
        Ok(())
    }
}
