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

//! # Metrics Query Language Parser
//!
//! A lexer, parser and builder for the compact metrics query syntax used by
//! dashboard definitions, e.g.
//! `avg:aws.ec2.cpuutilization{$az, role:cache} by {az}.rollup(max, 60)`,
//! and for the formula sub-language that combines named queries, e.g.
//! `(abs(cpu) * 2 - reqs) / log2(cpu)`.
//!
//! ## Example
//!
//! Queries are parsed with [`parser::parse_query()`] or built with the
//! fluent [`query::Query`] builder. Both produce a [`query::QueryState`],
//! whose `Display` form is the canonical query string.
//!
//! ``` rust
//! use mql_parser::parser;
//! use mql_parser::query::Query;
//!
//! let parsed = parser::parse_query("avg:system.cpu.user{$az, role:cache} by {az}").unwrap();
//! let built = Query::new("system.cpu.user")
//!     .filter(["$az"], [("role", "cache")])
//!     .and_then(|q| q.agg("avg"))
//!     .and_then(|q| q.by(["az"]))
//!     .unwrap();
//!
//! assert_eq!(parsed.to_string(), built.to_string());
//! ```
//!
//! Formulas are validated against the queries they refer to:
//!
//! ``` rust
//! use mql_parser::formula::Formula;
//! use mql_parser::query::Query;
//!
//! let cpu = Query::named("system.cpu.user", "cpu");
//! let formula = Formula::parse("cpu * 2").unwrap();
//!
//! assert!(formula.validate(&[cpu.into_state()]).is_ok());
//! assert_eq!(formula.as_dict().formula, "(cpu * 2)");
//! ```

#![allow(clippy::let_unit_value)]
lrpar::lrpar_mod!("parser/query.y");

pub mod error;
pub mod filter;
pub mod formula;
pub mod parser;
pub mod query;
pub mod util;

pub use error::{FormulaError, ParseError, QueryValidationError};
