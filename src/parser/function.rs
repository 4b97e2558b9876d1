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

use std::collections::HashMap;
use std::fmt::{self, Display};

use lazy_static::lazy_static;

use crate::error::FormulaError;
use crate::parser::{Expr, IntLiteral, StringLiteral};

/// Type of a function argument as it may appear in formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// any formula expression: an identifier, a literal, arithmetic or a call
    Series,
    Int,
    /// an integer or a float literal
    Number,
    Str,
}

impl Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Series => write!(f, "a series expression"),
            ArgType::Int => write!(f, "an integer"),
            ArgType::Number => write!(f, "a number"),
            ArgType::Str => write!(f, "a string"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub arg_type: ArgType,
}

const NODE: Param = Param { name: "node", arg_type: ArgType::Series };

/// Every function the formula language knows. The set is closed: a name not
/// listed here fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Abs,
    Log2,
    Log10,
    Cumsum,
    Integral,
    DefaultZero,
    HourBefore,
    DayBefore,
    WeekBefore,
    MonthBefore,
    Timeshift,
    PerSecond,
    PerMinute,
    PerHour,
    Dt,
    Diff,
    MonotonicDiff,
    Derivative,
    Autosmooth,
    Ewma3,
    Ewma5,
    Ewma10,
    Ewma20,
    Median3,
    Median5,
    Median7,
    Median9,
    MovingRollup,
    Top,
    CountNonzero,
    CountNotNull,
    RobustTrend,
    TrendLine,
    PiecewiseConstant,
    Outliers,
    Anomalies,
    Forecast,
    ExcludeNull,
    CutoffMax,
    CutoffMin,
    ClampMax,
    ClampMin,
}

const TOP_LIMIT_TO: [i64; 5] = [5, 10, 25, 50, 100];
const TOP_BY: [&str; 7] = ["max", "mean", "min", "sum", "last", "l2norm", "area"];
const TOP_DIR: [&str; 2] = ["asc", "desc"];
const MOVING_ROLLUP_METHODS: [&str; 5] = ["avg", "min", "max", "sum", "count"];
const OUTLIERS_ALGORITHMS: [&str; 4] = ["DBSCAN", "MAD", "scaledDBSCAN", "scaledMAD"];
const OUTLIERS_PCT_ALGORITHMS: [&str; 2] = ["MAD", "scaledMAD"];
const ANOMALIES_ALGORITHMS: [&str; 3] = ["basic", "agile", "robust"];
const FORECAST_ALGORITHMS: [&str; 2] = ["linear", "seasonal"];

pub const ANOMALIES_DEFAULT_BOUNDS: i64 = 2;

impl Function {
    pub const ALL: &'static [Function] = &[
        Function::Abs,
        Function::Log2,
        Function::Log10,
        Function::Cumsum,
        Function::Integral,
        Function::DefaultZero,
        Function::HourBefore,
        Function::DayBefore,
        Function::WeekBefore,
        Function::MonthBefore,
        Function::Timeshift,
        Function::PerSecond,
        Function::PerMinute,
        Function::PerHour,
        Function::Dt,
        Function::Diff,
        Function::MonotonicDiff,
        Function::Derivative,
        Function::Autosmooth,
        Function::Ewma3,
        Function::Ewma5,
        Function::Ewma10,
        Function::Ewma20,
        Function::Median3,
        Function::Median5,
        Function::Median7,
        Function::Median9,
        Function::MovingRollup,
        Function::Top,
        Function::CountNonzero,
        Function::CountNotNull,
        Function::RobustTrend,
        Function::TrendLine,
        Function::PiecewiseConstant,
        Function::Outliers,
        Function::Anomalies,
        Function::Forecast,
        Function::ExcludeNull,
        Function::CutoffMax,
        Function::CutoffMin,
        Function::ClampMax,
        Function::ClampMin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Log2 => "log2",
            Function::Log10 => "log10",
            Function::Cumsum => "cumsum",
            Function::Integral => "integral",
            Function::DefaultZero => "default_zero",
            Function::HourBefore => "hour_before",
            Function::DayBefore => "day_before",
            Function::WeekBefore => "week_before",
            Function::MonthBefore => "month_before",
            Function::Timeshift => "timeshift",
            Function::PerSecond => "per_second",
            Function::PerMinute => "per_minute",
            Function::PerHour => "per_hour",
            Function::Dt => "dt",
            Function::Diff => "diff",
            Function::MonotonicDiff => "monotonic_diff",
            Function::Derivative => "derivative",
            Function::Autosmooth => "autosmooth",
            Function::Ewma3 => "ewma_3",
            Function::Ewma5 => "ewma_5",
            Function::Ewma10 => "ewma_10",
            Function::Ewma20 => "ewma_20",
            Function::Median3 => "median_3",
            Function::Median5 => "median_5",
            Function::Median7 => "median_7",
            Function::Median9 => "median_9",
            Function::MovingRollup => "moving_rollup",
            Function::Top => "top",
            Function::CountNonzero => "count_nonzero",
            Function::CountNotNull => "count_not_null",
            Function::RobustTrend => "robust_trend",
            Function::TrendLine => "trend_line",
            Function::PiecewiseConstant => "piecewise_constant",
            Function::Outliers => "outliers",
            Function::Anomalies => "anomalies",
            Function::Forecast => "forecast",
            Function::ExcludeNull => "exclude_null",
            Function::CutoffMax => "cutoff_max",
            Function::CutoffMin => "cutoff_min",
            Function::ClampMax => "clamp_max",
            Function::ClampMin => "clamp_min",
        }
    }

    /// Positional parameters, the series argument first.
    pub fn params(&self) -> &'static [Param] {
        match self {
            Function::Timeshift => &[NODE, Param { name: "time_s", arg_type: ArgType::Int }],
            Function::MovingRollup => &[
                NODE,
                Param { name: "period_s", arg_type: ArgType::Int },
                Param { name: "method", arg_type: ArgType::Str },
            ],
            Function::Top => &[
                NODE,
                Param { name: "limit_to", arg_type: ArgType::Int },
                Param { name: "by", arg_type: ArgType::Str },
                Param { name: "dir", arg_type: ArgType::Str },
            ],
            Function::Outliers => &[
                NODE,
                Param { name: "algorithm", arg_type: ArgType::Str },
                Param { name: "tolerance", arg_type: ArgType::Number },
                Param { name: "pct", arg_type: ArgType::Int },
            ],
            Function::Anomalies => &[
                NODE,
                Param { name: "algorithm", arg_type: ArgType::Str },
                Param { name: "bounds", arg_type: ArgType::Int },
            ],
            Function::Forecast => &[
                NODE,
                Param { name: "algorithm", arg_type: ArgType::Str },
                Param { name: "deviations", arg_type: ArgType::Int },
            ],
            Function::ExcludeNull => &[NODE, Param { name: "by", arg_type: ArgType::Str }],
            Function::CutoffMax | Function::CutoffMin | Function::ClampMax | Function::ClampMin => {
                &[NODE, Param { name: "threshold", arg_type: ArgType::Number }]
            }
            _ => &[NODE],
        }
    }

    /// Number of parameters that must be given; the rest may be omitted.
    pub fn required_params(&self) -> usize {
        match self {
            Function::Outliers => 3,
            Function::Anomalies => 2,
            _ => self.params().len(),
        }
    }

    /// Validates arity, argument types and argument domains, filling in
    /// defaults for omitted optional parameters that are always rendered.
    pub fn check_args(&self, mut args: Vec<Expr>) -> Result<Vec<Expr>, FormulaError> {
        let params = self.params();
        let required = self.required_params();
        if args.len() < required || args.len() > params.len() {
            let expected = if required == params.len() {
                format!("{required}")
            } else {
                format!("{required} to {}", params.len())
            };
            return Err(FormulaError::InvalidArgument(format!(
                "function '{self}' expects {expected} argument(s), got {}",
                args.len()
            )));
        }

        for (arg, p) in args.iter().zip(params) {
            if !type_matches(arg, p.arg_type) {
                return Err(FormulaError::InvalidArgument(format!(
                    "function '{self}' argument '{}' must be {}, got: {arg}",
                    p.name, p.arg_type
                )));
            }
        }

        if *self == Function::Anomalies && args.len() == 2 {
            args.push(Expr::from(ANOMALIES_DEFAULT_BOUNDS));
        }

        self.check_domain(&args)?;
        Ok(args)
    }

    fn check_domain(&self, args: &[Expr]) -> Result<(), FormulaError> {
        match self {
            Function::Timeshift => {
                if let Some(time_s) = int_arg(args, 1).filter(|t| *t >= 0) {
                    return Err(FormulaError::InvalidArgument(format!(
                        "timeshift interval must be below zero: {time_s}"
                    )));
                }
            }
            Function::MovingRollup => {
                check_one_of("moving_rollup method", str_arg(args, 2), &MOVING_ROLLUP_METHODS)?
            }
            Function::Top => {
                if let Some(limit_to) = int_arg(args, 1) {
                    if !TOP_LIMIT_TO.contains(&limit_to) {
                        let alternatives = TOP_LIMIT_TO.map(|l| l.to_string()).join(", ");
                        return Err(FormulaError::InvalidArgument(format!(
                            "top limit_to {limit_to} must be one of: {alternatives}"
                        )));
                    }
                }
                check_one_of("top by", str_arg(args, 2), &TOP_BY)?;
                check_one_of("top dir", str_arg(args, 3), &TOP_DIR)?;
            }
            Function::Outliers => {
                let algorithm = str_arg(args, 1);
                check_one_of("outliers algorithm", algorithm, &OUTLIERS_ALGORITHMS)?;
                let allows_pct = algorithm.is_some_and(|a| OUTLIERS_PCT_ALGORITHMS.contains(&a));
                if args.len() > 3 && !allows_pct {
                    return Err(FormulaError::InvalidArgument(format!(
                        "outliers pct only valid for algorithms: {}",
                        quoted_sorted(&OUTLIERS_PCT_ALGORITHMS)
                    )));
                }
            }
            Function::Anomalies => {
                check_one_of("anomalies algorithm", str_arg(args, 1), &ANOMALIES_ALGORITHMS)?
            }
            Function::Forecast => {
                check_one_of("forecast algorithm", str_arg(args, 1), &FORECAST_ALGORITHMS)?
            }
            _ => {}
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn type_matches(arg: &Expr, arg_type: ArgType) -> bool {
    match arg_type {
        ArgType::Series => arg.is_series(),
        ArgType::Int => matches!(arg, Expr::IntLiteral(_)),
        ArgType::Number => matches!(arg, Expr::IntLiteral(_) | Expr::FloatLiteral(_)),
        ArgType::Str => arg.is_string(),
    }
}

fn int_arg(args: &[Expr], i: usize) -> Option<i64> {
    match args.get(i) {
        Some(Expr::IntLiteral(IntLiteral { val })) => Some(*val),
        _ => None,
    }
}

fn str_arg(args: &[Expr], i: usize) -> Option<&str> {
    match args.get(i) {
        Some(Expr::StringLiteral(StringLiteral { val })) => Some(val),
        _ => None,
    }
}

fn quoted_sorted(values: &[&str]) -> String {
    let mut values = values.to_vec();
    values.sort_unstable();
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_one_of(label: &str, value: Option<&str>, valid: &[&str]) -> Result<(), FormulaError> {
    match value {
        Some(v) if !valid.contains(&v) => Err(FormulaError::InvalidArgument(format!(
            "{label} '{v}' must be one of: {}",
            quoted_sorted(valid)
        ))),
        _ => Ok(()),
    }
}

lazy_static! {
    static ref FUNCTIONS: HashMap<&'static str, Function> =
        Function::ALL.iter().map(|f| (f.name(), *f)).collect();
}

/// Resolves a function name through the closed registry.
pub fn get_function(name: &str) -> Option<Function> {
    FUNCTIONS.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q() -> Expr {
        Expr::identifier("q")
    }

    fn check(func: Function, args: Vec<Expr>) -> Result<String, String> {
        func.check_args(args)
            .map(|args| args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", "))
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_function_is_registered() {
        assert_eq!(get_function("abs"), Some(Function::Abs));
        assert_eq!(get_function("ewma_10"), Some(Function::Ewma10));
        assert_eq!(get_function("clamp_min"), Some(Function::ClampMin));
        assert_eq!(get_function("top10"), None);
        assert_eq!(get_function("Abs"), None);
        assert_eq!(FUNCTIONS.len(), Function::ALL.len());
    }

    #[test]
    fn test_params() {
        let names = |f: Function| f.params().iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names(Function::Abs), ["node"]);
        assert_eq!(names(Function::Top), ["node", "limit_to", "by", "dir"]);
        assert_eq!(names(Function::ClampMin), ["node", "threshold"]);
        assert_eq!(Function::Outliers.params()[2].arg_type, ArgType::Number);
        for f in Function::ALL {
            assert_eq!(f.params()[0], NODE, "first parameter of {f}");
            assert!(f.required_params() <= f.params().len());
        }
    }

    #[test]
    fn test_arity() {
        assert_eq!(
            check(Function::Abs, vec![q(), q()]),
            Err("function 'abs' expects 1 argument(s), got 2".into())
        );
        assert_eq!(
            check(Function::Outliers, vec![q()]),
            Err("function 'outliers' expects 3 to 4 argument(s), got 1".into())
        );
        assert_eq!(
            check(Function::Top, vec![q(), Expr::from(5i64), Expr::string("max"), q()]),
            Err("function 'top' argument 'dir' must be a string, got: q".into())
        );
        assert_eq!(
            check(Function::Abs, vec![Expr::string("q")]),
            Err("function 'abs' argument 'node' must be a series expression, got: 'q'".into())
        );
        assert!(check(Function::Abs, vec![Expr::comma(q(), q())]).is_err());
    }

    #[test]
    fn test_domains() {
        let cases = vec![
            (
                Function::Timeshift,
                vec![q(), Expr::from(10i64)],
                Err("timeshift interval must be below zero: 10"),
            ),
            (Function::Timeshift, vec![q(), Expr::from(-3600i64)], Ok("q, -3600")),
            (
                Function::MovingRollup,
                vec![q(), Expr::from(60i64), Expr::string("median")],
                Err("moving_rollup method 'median' must be one of: 'avg', 'count', 'max', 'min', 'sum'"),
            ),
            (
                Function::Top,
                vec![q(), Expr::from(6i64), Expr::string("sum"), Expr::string("asc")],
                Err("top limit_to 6 must be one of: 5, 10, 25, 50, 100"),
            ),
            (
                Function::Top,
                vec![q(), Expr::from(5i64), Expr::string("avg"), Expr::string("asc")],
                Err("top by 'avg' must be one of: 'area', 'l2norm', 'last', 'max', 'mean', 'min', 'sum'"),
            ),
            (
                Function::Top,
                vec![q(), Expr::from(5i64), Expr::string("sum"), Expr::string("up")],
                Err("top dir 'up' must be one of: 'asc', 'desc'"),
            ),
            (
                Function::Outliers,
                vec![q(), Expr::string("knn"), Expr::from(3i64)],
                Err("outliers algorithm 'knn' must be one of: 'DBSCAN', 'MAD', 'scaledDBSCAN', 'scaledMAD'"),
            ),
            (
                Function::Outliers,
                vec![q(), Expr::string("DBSCAN"), Expr::from(3.0), Expr::from(20i64)],
                Err("outliers pct only valid for algorithms: 'MAD', 'scaledMAD'"),
            ),
            (
                Function::Outliers,
                vec![q(), Expr::string("MAD"), Expr::from(3.0), Expr::from(20i64)],
                Ok("q, 'MAD', 3.0, 20"),
            ),
            (
                Function::Anomalies,
                vec![q(), Expr::string("basic")],
                Ok("q, 'basic', 2"),
            ),
            (
                Function::Anomalies,
                vec![q(), Expr::string("fuzzy")],
                Err("anomalies algorithm 'fuzzy' must be one of: 'agile', 'basic', 'robust'"),
            ),
            (
                Function::Forecast,
                vec![q(), Expr::string("cubic"), Expr::from(1i64)],
                Err("forecast algorithm 'cubic' must be one of: 'linear', 'seasonal'"),
            ),
            (
                Function::ClampMax,
                vec![q(), Expr::from(0.5)],
                Ok("q, 0.5"),
            ),
            (
                Function::ExcludeNull,
                vec![q(), Expr::string("host")],
                Ok("q, 'host'"),
            ),
        ];

        for (func, args, expected) in cases {
            assert_eq!(
                check(func, args),
                expected.map(String::from).map_err(String::from),
                "\n<check_args> <{func}> does not match"
            );
        }
    }
}
