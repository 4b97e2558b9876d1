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

use crate::error::QueryValidationError;
use crate::filter::{Filter, FilterCond, FilterOp, Tag, TmplVar};
use crate::parser::{is_valid_token, Expr, TokenRule};
use crate::query::{
    AggFunc, AsModifier, Fill, FillFunc, Metric, QueryDefinition, QueryState, Rollup, RollupFunc,
};
use crate::util::Keyword;

/// Fluent, validating query builder.
///
/// Every call leaves `self` untouched and returns a new builder that owns a
/// modified copy of the state, so several queries can branch off a shared
/// prefix:
///
/// ```rust
/// use mql_parser::query::Query;
///
/// let base = Query::new("aws.ec2.cpuutilization").agg("avg").unwrap();
/// let by_az = base.by(["az"]).unwrap();
/// let by_role = base.by(["role"]).unwrap();
///
/// assert_eq!(by_az.to_string(), "avg:aws.ec2.cpuutilization{*} by {az}");
/// assert_eq!(by_role.to_string(), "avg:aws.ec2.cpuutilization{*} by {role}");
/// assert_eq!(base.to_string(), "avg:aws.ec2.cpuutilization{*}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    state: QueryState,
}

impl Query {
    /// Starts an auto-named query over `metric`.
    pub fn new(metric: &str) -> Self {
        Self::from_state(QueryState::new(Metric::new(metric), None))
    }

    pub fn named(metric: &str, name: &str) -> Self {
        Self::from_state(QueryState::new(Metric::new(metric), Some(name)))
    }

    pub fn from_state(state: QueryState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn into_state(self) -> QueryState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn identifier(&self) -> Expr {
        self.state.identifier()
    }

    pub fn as_dict(&self) -> QueryDefinition {
        self.state.as_dict()
    }

    fn update(
        &self,
        f: impl FnOnce(&mut QueryState) -> Result<(), QueryValidationError>,
    ) -> Result<Self, QueryValidationError> {
        let mut state = self.state.clone();
        f(&mut state)?;
        Ok(Self { state })
    }

    /// Adds equality conditions: template variables (`$az`) and
    /// `(tag, value)` pairs. Conditions already present are skipped.
    pub fn filter<'a>(
        &self,
        tmpl_vars: impl IntoIterator<Item = &'a str>,
        tags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, QueryValidationError> {
        self.add_conditions(FilterOp::Equal, tmpl_vars, tags)
    }

    /// Same as [Query::filter] but with negated conditions (`!role:cache`).
    pub fn filter_ne<'a>(
        &self,
        tmpl_vars: impl IntoIterator<Item = &'a str>,
        tags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, QueryValidationError> {
        self.add_conditions(FilterOp::NotEqual, tmpl_vars, tags)
    }

    fn add_conditions<'a>(
        &self,
        op: FilterOp,
        tmpl_vars: impl IntoIterator<Item = &'a str>,
        tags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, QueryValidationError> {
        let mut conds: Vec<FilterCond> = vec![];
        for tvar in tmpl_vars {
            conds.push(TmplVar::new(op, check_template_variable(tvar)?).into());
        }
        for (tag, value) in tags {
            conds.push(Tag::new(op, check_tag(tag)?, Some(check_tag_value(value)?)).into());
        }

        self.update(|state| {
            let filter = state.filter.get_or_insert_with(Filter::empty);
            for cond in conds {
                filter.push_unique(cond);
            }
            if filter.is_empty() {
                state.filter = None;
            }
            Ok(())
        })
    }

    pub fn agg(&self, func: &str) -> Result<Self, QueryValidationError> {
        self.update(|state| {
            if let Some(existing) = &state.agg {
                return Err(QueryValidationError::new(format!(
                    "Cannot set aggregation function '{func}' because query already contains aggregation function '{}'",
                    existing.func.as_str()
                )));
            }
            state.set_agg(AggFunc::from_keyword(func)?)
        })
    }

    /// Groups by tags or template variables; tags already grouped by are skipped.
    pub fn by<'a>(&self, tags: impl IntoIterator<Item = &'a str>) -> Result<Self, QueryValidationError> {
        let tags = tags.into_iter().collect::<Vec<_>>();
        self.update(|state| {
            state.add_by(&tags)?;
            for tag in &tags {
                if tag.starts_with('$') {
                    check_template_variable(tag)?;
                } else {
                    check_tag(tag)?;
                }
            }
            Ok(())
        })
    }

    pub fn as_count(&self) -> Result<Self, QueryValidationError> {
        self.update(|state| state.set_modifier(AsModifier::Count))
    }

    pub fn as_rate(&self) -> Result<Self, QueryValidationError> {
        self.update(|state| state.set_modifier(AsModifier::Rate))
    }

    /// `func` is one of `avg`, `min`, `max`, `sum`, `count`, or `""` for the
    /// backend default.
    pub fn rollup(&self, func: &str, period: Option<u64>) -> Result<Self, QueryValidationError> {
        self.update(|state| {
            if let Some(existing) = state.rollup() {
                return Err(QueryValidationError::new(format!(
                    "Cannot set rollup function '{func}' because query already contains rollup function '{}'",
                    existing.func.as_str()
                )));
            }
            let func = RollupFunc::from_keyword(func)?;
            state.push_rollup(Rollup { func, period })
        })
    }

    pub fn fill(&self, func: &str, limit: Option<u64>) -> Result<Self, QueryValidationError> {
        self.update(|state| {
            if let Some(existing) = state.fill() {
                return Err(QueryValidationError::new(format!(
                    "Cannot set fill function '{func}' because query already contains fill function '{}'",
                    existing.func.as_str()
                )));
            }
            let func = FillFunc::from_keyword(func)?;
            state.push_fill(Fill { func, limit })
        })
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)
    }
}

impl From<Query> for QueryState {
    fn from(query: Query) -> Self {
        query.state
    }
}

/// Returns the name without its `$`.
fn check_template_variable(tvar: &str) -> Result<&str, QueryValidationError> {
    let Some(name) = tvar.strip_prefix('$') else {
        return Err(QueryValidationError::new(format!(
            "Template variable '{tvar}' must start with '$'"
        )));
    };
    if !is_valid_token(TokenRule::TemplateVariable, name) {
        return Err(QueryValidationError::new(format!(
            "Invalid template variable '{tvar}'"
        )));
    }
    Ok(name)
}

fn check_tag(tag: &str) -> Result<&str, QueryValidationError> {
    if tag.starts_with('$') {
        return Err(QueryValidationError::new(format!(
            "Tag '{tag}' must not start with '$'"
        )));
    }
    if !is_valid_token(TokenRule::TagName, tag) {
        return Err(QueryValidationError::new(format!("Invalid tag name '{tag}'")));
    }
    Ok(tag)
}

fn check_tag_value(value: &str) -> Result<&str, QueryValidationError> {
    if !is_valid_token(TokenRule::TagValue, value) {
        return Err(QueryValidationError::new(format!(
            "Invalid tag value '{value}'"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_TAGS: [(&str, &str); 0] = [];
    const NO_TVARS: [&str; 0] = [];

    fn query() -> Query {
        Query::named("aws.ec2.cpuutilization", "cpu")
    }

    #[test]
    fn test_full_chain() {
        let q = query()
            .filter(["$az"], [("role", "cache")])
            .and_then(|q| q.agg("avg"))
            .and_then(|q| q.by(["az", "role"]))
            .and_then(|q| q.as_count())
            .and_then(|q| q.rollup("max", Some(110)))
            .and_then(|q| q.fill("last", Some(112)))
            .unwrap();
        assert_eq!(
            q.to_string(),
            "avg:aws.ec2.cpuutilization{$az, role:cache} by {az, role}.as_count().rollup(max, 110).fill(last, 112)"
        );
    }

    #[test]
    fn test_value_semantics() {
        let base = query().agg("sum").unwrap();
        let rate = base.as_rate().unwrap();
        let count = base.as_count().unwrap();
        assert_eq!(base.to_string(), "sum:aws.ec2.cpuutilization{*}");
        assert_eq!(rate.to_string(), "sum:aws.ec2.cpuutilization{*}.as_rate()");
        assert_eq!(count.to_string(), "sum:aws.ec2.cpuutilization{*}.as_count()");
    }

    #[test]
    fn test_ordering() {
        let cases: Vec<(Result<Query, QueryValidationError>, &str)> = vec![
            (
                query().by(["az"]),
                "Cannot set aggregation by 'az' because aggregation function is not set yet",
            ),
            (
                query().as_count(),
                "Cannot set as_count() because aggregation function is not set yet",
            ),
            (
                query().as_rate(),
                "Cannot set as_rate() because aggregation function is not set yet",
            ),
            (
                query().agg("sum").and_then(|q| q.agg("avg")),
                "Cannot set aggregation function 'avg' because query already contains aggregation function 'sum'",
            ),
            (
                query().agg("sum").and_then(|q| q.agg("bogus")),
                "Cannot set aggregation function 'bogus' because query already contains aggregation function 'sum'",
            ),
            (
                query().rollup("max", None).and_then(|q| q.rollup("avg", Some(60))),
                "Cannot set rollup function 'avg' because query already contains rollup function 'max'",
            ),
            (
                query().fill("zero", None).and_then(|q| q.fill("null", None)),
                "Cannot set fill function 'null' because query already contains fill function 'zero'",
            ),
        ];
        for (result, expected) in cases {
            assert_eq!(result.unwrap_err().to_string(), expected);
        }
    }

    #[test]
    fn test_keyword_errors() {
        assert_eq!(
            query().agg("bogus").unwrap_err().to_string(),
            "Aggregation function 'bogus' must be one of 'avg', 'max', 'min', 'sum'"
        );
        assert_eq!(
            query().rollup("median", None).unwrap_err().to_string(),
            "Rollup function 'median' must be one of '', 'avg', 'count', 'max', 'min', 'sum'"
        );
        assert_eq!(
            query().fill("previous", None).unwrap_err().to_string(),
            "Fill function 'previous' must be one of 'last', 'linear', 'null', 'zero'"
        );
    }

    #[test]
    fn test_filter_validation() {
        assert_eq!(
            query().filter(["az"], NO_TAGS).unwrap_err().to_string(),
            "Template variable 'az' must start with '$'"
        );
        assert_eq!(
            query().filter(NO_TVARS, [("$role", "cache")]).unwrap_err().to_string(),
            "Tag '$role' must not start with '$'"
        );
        assert_eq!(
            query().filter(NO_TVARS, [("role", "ca che")]).unwrap_err().to_string(),
            "Invalid tag value 'ca che'"
        );
        assert!(query().filter(["$"], NO_TAGS).is_err());
    }

    #[test]
    fn test_idempotence() {
        let q = query()
            .filter(NO_TVARS, [("role", "cache")])
            .and_then(|q| q.filter(NO_TVARS, [("role", "cache")]))
            .and_then(|q| q.agg("avg"))
            .and_then(|q| q.by(["az"]))
            .and_then(|q| q.by(["az"]))
            .unwrap();
        assert_eq!(q.to_string(), "avg:aws.ec2.cpuutilization{role:cache} by {az}");

        let q = query()
            .filter(NO_TVARS, [("role", "cache")])
            .and_then(|q| q.filter(NO_TVARS, [("role", "db")]))
            .unwrap();
        assert_eq!(q.to_string(), "aws.ec2.cpuutilization{role:cache, role:db}");
    }

    #[test]
    fn test_filter_ne() {
        let q = query()
            .filter_ne(["$az"], [("role", "cache")])
            .and_then(|q| q.filter(NO_TVARS, [("role", "cache")]))
            .unwrap();
        assert_eq!(
            q.to_string(),
            "aws.ec2.cpuutilization{!$az, !role:cache, role:cache}"
        );
    }

    #[test]
    fn test_by_template_variable() {
        let q = query().agg("max").and_then(|q| q.by(["db", "$region"])).unwrap();
        assert_eq!(q.to_string(), "max:aws.ec2.cpuutilization{*} by {db, $region}");
        assert_eq!(
            query().agg("max").and_then(|q| q.by(["9db"])).unwrap_err().to_string(),
            "Invalid tag name '9db'"
        );
    }

    #[test]
    fn test_dict() {
        let dict = query().agg("max").unwrap().as_dict();
        assert_eq!(dict.aggregator, "max");
        assert_eq!(dict.name, "cpu");
        assert_eq!(dict.query, "max:aws.ec2.cpuutilization{*}");
    }
}
