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

//! Typed constructors for formula function calls.
//!
//! Every constructor checks its arguments with the same rules the formula
//! parser applies, so whatever it returns renders to parsable text. Functions
//! over a single series only fail on a string or a bare comma list.

use crate::error::FormulaError;
use crate::parser::{Expr, Function};

macro_rules! series_functions {
    ($($name:ident => $func:ident),* $(,)?) => {
        $(
            pub fn $name(node: Expr) -> Result<Expr, FormulaError> {
                Expr::new_call(Function::$func, vec![node])
            }
        )*
    };
}

series_functions! {
    abs => Abs,
    log2 => Log2,
    log10 => Log10,
    cumsum => Cumsum,
    integral => Integral,
    default_zero => DefaultZero,
    hour_before => HourBefore,
    day_before => DayBefore,
    week_before => WeekBefore,
    month_before => MonthBefore,
    per_second => PerSecond,
    per_minute => PerMinute,
    per_hour => PerHour,
    dt => Dt,
    diff => Diff,
    monotonic_diff => MonotonicDiff,
    derivative => Derivative,
    autosmooth => Autosmooth,
    ewma_3 => Ewma3,
    ewma_5 => Ewma5,
    ewma_10 => Ewma10,
    ewma_20 => Ewma20,
    median_3 => Median3,
    median_5 => Median5,
    median_7 => Median7,
    median_9 => Median9,
    count_nonzero => CountNonzero,
    count_not_null => CountNotNull,
    robust_trend => RobustTrend,
    trend_line => TrendLine,
    piecewise_constant => PiecewiseConstant,
}

/// `time_s` must be negative.
pub fn timeshift(node: Expr, time_s: i64) -> Result<Expr, FormulaError> {
    Expr::new_call(Function::Timeshift, vec![node, time_s.into()])
}

pub fn moving_rollup(node: Expr, period_s: i64, method: &str) -> Result<Expr, FormulaError> {
    Expr::new_call(
        Function::MovingRollup,
        vec![node, period_s.into(), Expr::string(method)],
    )
}

pub fn top(node: Expr, limit_to: i64, by: &str, dir: &str) -> Result<Expr, FormulaError> {
    Expr::new_call(
        Function::Top,
        vec![node, limit_to.into(), Expr::string(by), Expr::string(dir)],
    )
}

/// `pct` is only accepted by the MAD family of algorithms.
pub fn outliers(
    node: Expr,
    algorithm: &str,
    tolerance: impl Into<Expr>,
    pct: Option<i64>,
) -> Result<Expr, FormulaError> {
    let mut args = vec![node, Expr::string(algorithm), tolerance.into()];
    args.extend(pct.map(Expr::from));
    Expr::new_call(Function::Outliers, args)
}

/// `bounds` defaults to 2 and is always rendered.
pub fn anomalies(node: Expr, algorithm: &str, bounds: Option<i64>) -> Result<Expr, FormulaError> {
    let mut args = vec![node, Expr::string(algorithm)];
    args.extend(bounds.map(Expr::from));
    Expr::new_call(Function::Anomalies, args)
}

pub fn forecast(node: Expr, algorithm: &str, deviations: i64) -> Result<Expr, FormulaError> {
    Expr::new_call(
        Function::Forecast,
        vec![node, Expr::string(algorithm), deviations.into()],
    )
}

pub fn exclude_null(node: Expr, by: &str) -> Result<Expr, FormulaError> {
    Expr::new_call(Function::ExcludeNull, vec![node, Expr::string(by)])
}

pub fn cutoff_max(node: Expr, threshold: impl Into<Expr>) -> Result<Expr, FormulaError> {
    Expr::new_call(Function::CutoffMax, vec![node, threshold.into()])
}

pub fn cutoff_min(node: Expr, threshold: impl Into<Expr>) -> Result<Expr, FormulaError> {
    Expr::new_call(Function::CutoffMin, vec![node, threshold.into()])
}

pub fn clamp_max(node: Expr, threshold: impl Into<Expr>) -> Result<Expr, FormulaError> {
    Expr::new_call(Function::ClampMax, vec![node, threshold.into()])
}

pub fn clamp_min(node: Expr, threshold: impl Into<Expr>) -> Result<Expr, FormulaError> {
    Expr::new_call(Function::ClampMin, vec![node, threshold.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_formula, BinaryOp};

    fn q() -> Expr {
        Expr::identifier("q")
    }

    struct Case {
        actual: Result<Expr, FormulaError>,
        expected: Result<&'static str, &'static str>,
    }

    fn assert_cases(cases: Vec<Case>) {
        for Case { actual, expected } in cases {
            let actual = actual.map(|e| e.to_string()).map_err(|e| e.to_string());
            let expected = expected.map(String::from).map_err(String::from);
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_series_functions() {
        assert_eq!(abs(q()).unwrap().to_string(), "abs(q)");
        assert_eq!(ewma_20(q()).unwrap().to_string(), "ewma_20(q)");
        assert_eq!(
            abs(q()).and_then(|a| log2(a * Expr::from(2i64))).unwrap().to_string(),
            "log2((abs(q) * 2))"
        );
        assert_eq!(
            per_second(q()),
            Expr::new_call(Function::PerSecond, vec![q()])
        );
    }

    #[test]
    fn test_series_functions_reject_unparsable_nodes() {
        let cases = vec![
            Case {
                actual: abs(Expr::comma(q(), Expr::identifier("r"))),
                expected: Err("function 'abs' argument 'node' must be a series expression, got: q, r"),
            },
            Case {
                actual: cumsum(Expr::string("x")),
                expected: Err("function 'cumsum' argument 'node' must be a series expression, got: 'x'"),
            },
            Case {
                actual: abs(Expr::comma(q(), Expr::identifier("r")) * Expr::from(2i64)),
                expected: Err("function 'abs' argument 'node' must be a series expression, got: (q, r * 2)"),
            },
        ];
        assert_cases(cases);
    }

    #[test]
    fn test_operator_sugar() {
        let abs_q = abs(q()).unwrap();
        let log2_q = log2(q()).unwrap();
        let sugar = (abs_q.clone() * Expr::from(2i64) - Expr::identifier("reqs")) / log2_q.clone();
        let explicit = Expr::new_binary_expr(
            Expr::new_binary_expr(
                Expr::new_binary_expr(abs_q, BinaryOp::Mul, Expr::from(2i64)),
                BinaryOp::Sub,
                Expr::identifier("reqs"),
            ),
            BinaryOp::Div,
            log2_q,
        );
        assert_eq!(sugar, explicit);
        assert_eq!(sugar, parse_formula("(abs(q) * 2 - reqs) / log2(q)").unwrap());
    }

    #[test]
    fn test_checked_functions() {
        let cases = vec![
            Case {
                actual: timeshift(q(), -3600),
                expected: Ok("timeshift(q, -3600)"),
            },
            Case {
                actual: timeshift(q(), 0),
                expected: Err("timeshift interval must be below zero: 0"),
            },
            Case {
                actual: moving_rollup(q(), 300, "sum"),
                expected: Ok("moving_rollup(q, 300, 'sum')"),
            },
            Case {
                actual: moving_rollup(q(), 300, "median"),
                expected: Err("moving_rollup method 'median' must be one of: 'avg', 'count', 'max', 'min', 'sum'"),
            },
            Case {
                actual: top(q(), 10, "mean", "desc"),
                expected: Ok("top(q, 10, 'mean', 'desc')"),
            },
            Case {
                actual: top(q(), 6, "mean", "desc"),
                expected: Err("top limit_to 6 must be one of: 5, 10, 25, 50, 100"),
            },
            Case {
                actual: top(q(), 5, "mean", "up"),
                expected: Err("top dir 'up' must be one of: 'asc', 'desc'"),
            },
            Case {
                actual: outliers(q(), "MAD", 3.0, Some(20)),
                expected: Ok("outliers(q, 'MAD', 3.0, 20)"),
            },
            Case {
                actual: outliers(q(), "DBSCAN", 2i64, None),
                expected: Ok("outliers(q, 'DBSCAN', 2)"),
            },
            Case {
                actual: outliers(q(), "DBSCAN", 2i64, Some(20)),
                expected: Err("outliers pct only valid for algorithms: 'MAD', 'scaledMAD'"),
            },
            Case {
                actual: anomalies(q(), "agile", None),
                expected: Ok("anomalies(q, 'agile', 2)"),
            },
            Case {
                actual: anomalies(q(), "robust", Some(3)),
                expected: Ok("anomalies(q, 'robust', 3)"),
            },
            Case {
                actual: forecast(q(), "seasonal", 1),
                expected: Ok("forecast(q, 'seasonal', 1)"),
            },
            Case {
                actual: forecast(q(), "arima", 1),
                expected: Err("forecast algorithm 'arima' must be one of: 'linear', 'seasonal'"),
            },
            Case {
                actual: exclude_null(q(), "host"),
                expected: Ok("exclude_null(q, 'host')"),
            },
            Case {
                actual: clamp_min(q(), 0i64),
                expected: Ok("clamp_min(q, 0)"),
            },
            Case {
                actual: cutoff_max(q(), 99.5),
                expected: Ok("cutoff_max(q, 99.5)"),
            },
            Case {
                actual: clamp_max(q(), Expr::identifier("limit")),
                expected: Err("function 'clamp_max' argument 'threshold' must be a number, got: limit"),
            },
        ];
        assert_cases(cases);
    }
}
