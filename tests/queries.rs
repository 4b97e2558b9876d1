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

use mql_parser::error::ParseError;
use mql_parser::parser::parse_query;
use mql_parser::query::{Query, QueryDefinition, QueryState, DATA_SOURCE};

const NO_TVARS: [&str; 0] = [];

const SCENARIO: &str = "avg:aws.ec2.cpuutilization{$az,role:cache} by {az,role}.as_count().rollup(max,110).fill(last,112)";
const SCENARIO_CODEGEN: &str = "avg:aws.ec2.cpuutilization{$az, role:cache} by {az, role}.as_count().rollup(max, 110).fill(last, 112)";

fn build_scenario() -> Result<Query, mql_parser::QueryValidationError> {
    Query::new("aws.ec2.cpuutilization")
        .filter(["$az"], [("role", "cache")])?
        .agg("avg")?
        .by(["az", "role"])?
        .as_count()?
        .rollup("max", Some(110))?
        .fill("last", Some(112))
}

#[test]
fn test_parsed_scenario_dict() {
    let state = parse_query(SCENARIO).expect("scenario parses");
    assert_eq!(
        state.as_dict(),
        QueryDefinition {
            aggregator: "avg".into(),
            data_source: DATA_SOURCE.into(),
            name: state.name.clone(),
            query: SCENARIO_CODEGEN.into(),
        }
    );
    assert!(state.name.starts_with('q'));
}

#[test]
fn test_built_scenario_matches_parsed() {
    let built = build_scenario().expect("scenario builds");
    let parsed = parse_query(SCENARIO).expect("scenario parses");

    assert_eq!(built.to_string(), SCENARIO_CODEGEN);
    assert_eq!(built.to_string(), parsed.to_string());
    assert_eq!(
        built.state().clone().with_name("x"),
        parsed.with_name("x")
    );
}

#[test]
fn test_auto_names_are_unique() {
    let a = Query::new("system.load.1");
    let b = Query::new("system.load.1");
    assert_ne!(a.name(), b.name());
    assert_eq!(Query::named("system.load.1", "load").name(), "load");
}

#[test]
fn test_round_trip() {
    let corpus = [
        "svcname",
        "avg:svcname",
        "avg:svcname.s3.95percentile",
        "avg:svcname.s3.",
        "sum:svcname{*}",
        "avg:svcname{$region,box:blue,$db,name:bob}",
        "avg:svcname{  $region  ,   box:blue  }",
        "min:svcname{!region:us-east-1,!$db}",
        "avg:svcname{region}",
        "avg:svcname{$}",
        "avg:svcname{kubernetes.io/namespace:db}",
        "avg:svcname{region:*-east-1}",
        "avg:svcname{db:arn:aws:rds}",
        "avg:svcname{*}by{  db  ,   $region  }",
        "max:svcname{*}.as_rate()",
        "avg:svcname{*}.rollup(  sum   ,  13   )",
        "avg:svcname{*}.rollup(60)",
        "avg:svcname{*}.rollup(count)",
        "avg:svcname{*}.fill(  zero   ,  4   )",
        "avg:svcname{db:toys} by {az}.as_rate().rollup(sum).fill(zero)",
        "avg:svcname{db:toys}.fill(linear).rollup(avg, 30)",
        "svcname{db:toys}.rollup(sum)",
    ];

    for input in corpus {
        let first = parse_query(input).unwrap_or_else(|e| panic!("{input:?}: {e}"));
        let codegen = first.to_string();
        let second = parse_query(&codegen)
            .unwrap_or_else(|e| panic!("{input:?} generated {codegen:?}: {e}"));
        assert_eq!(
            second.with_name(&first.name),
            first,
            "round trip of {input:?} through {codegen:?}"
        );
        assert_eq!(parse_query(&codegen).map(|s| s.to_string()), Ok(codegen));
    }
}

#[test]
fn test_parse_errors() {
    let cases = [
        (
            "weekly:svcname",
            "Aggregation function 'weekly' must be one of 'avg', 'max', 'min', 'sum' (at position 0)",
        ),
        (
            "avg:svcname.rollup(median)",
            "Rollup function 'median' must be one of '', 'avg', 'count', 'max', 'min', 'sum' (at position 19)",
        ),
        (
            "svcname by {az}",
            "Cannot set aggregation by 'az' because aggregation function is not set yet",
        ),
        (
            "avg:svcname.rollup(sum).rollup(max)",
            "Cannot set rollup function 'max' because query already contains rollup function 'sum'",
        ),
    ];
    for (input, expected) in cases {
        let err = parse_query(input).unwrap_err();
        assert_eq!(err.to_string(), expected, "error of {input:?}");
    }

    assert!(matches!(
        parse_query("avg:svcname{$9lives}"),
        Err(ParseError::Syntax { position: 12, .. })
    ));
    assert!(matches!(
        parse_query("avg:svcname{*} xyz"),
        Err(ParseError::IncompletelyConsumed { position: 15, .. })
    ));
    assert!(matches!(
        parse_query("avg:svcname{*}.fill(0)"),
        Err(ParseError::Invalid { position: 20, .. })
    ));
    assert!(matches!(
        parse_query("avg:svcname{*} {*}"),
        Err(ParseError::IncompletelyConsumed { position: 15, .. })
    ));
}

#[test]
fn test_bare_template_variable() {
    let state = parse_query("avg:svcname{$}").expect("bare '$' parses");
    assert_eq!(state.to_string(), "avg:svcname{$}");
    assert!(Query::new("svcname").filter(["$"], [("role", "cache")]).is_err());
}

#[test]
fn test_builder_ordering_and_idempotence() {
    let q = Query::new("system.cpu.user");
    assert_eq!(
        q.by(["az"]).unwrap_err().to_string(),
        "Cannot set aggregation by 'az' because aggregation function is not set yet"
    );
    assert!(q.as_count().is_err());
    assert!(q.as_rate().is_err());

    let q = q.agg("sum").unwrap();
    assert_eq!(
        q.agg("avg").unwrap_err().to_string(),
        "Cannot set aggregation function 'avg' because query already contains aggregation function 'sum'"
    );
    assert_eq!(
        Query::new("system.cpu.user").agg("weekly").unwrap_err().to_string(),
        "Aggregation function 'weekly' must be one of 'avg', 'max', 'min', 'sum'"
    );

    let q = q
        .filter(NO_TVARS, [("role", "cache")])
        .and_then(|q| q.filter(NO_TVARS, [("role", "cache")]))
        .and_then(|q| q.by(["az"]))
        .and_then(|q| q.by(["az"]))
        .unwrap();
    assert_eq!(q.to_string(), "sum:system.cpu.user{role:cache} by {az}");

    let state: QueryState = q.into();
    assert_eq!(state.filter.map(|f| f.conds.len()), Some(1));
}

#[test]
fn test_sibling_builders_do_not_interfere() {
    let base = Query::new("system.cpu.user").agg("avg").unwrap();
    let left = base.by(["az"]).unwrap();
    let right = base.rollup("max", Some(60)).unwrap();

    assert_eq!(base.to_string(), "avg:system.cpu.user{*}");
    assert_eq!(left.to_string(), "avg:system.cpu.user{*} by {az}");
    assert_eq!(right.to_string(), "avg:system.cpu.user{*}.rollup(max, 60)");
}
