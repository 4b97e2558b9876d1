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

//! Number literals of the formula language.

/// A numeric literal as written in a formula. Integers keep their integer
/// identity so that `2` does not come back as `2.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Parses a formula number literal, optionally with a leading `-`. Anything
/// with a decimal point or an exponent is a float. Floats must be finite.
pub fn parse_number(s: &str) -> Result<Number, String> {
    let st: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if st.contains(['.', 'e', 'E']) {
        match st.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Number::Float(v)),
            Ok(_) => Err(format!("{s} is out of range for a float")),
            Err(_) => Err(format!("{s} can't be parsed into a float")),
        }
    } else {
        st.parse()
            .map(Number::Int)
            .map_err(|_| format!("{s} can't be parsed into an integer"))
    }
}

/// Shortest representation that reads back as the same float, always with a
/// decimal point or an exponent: `2.1`, `4.0`, `1e-7`. Locale independent.
pub fn format_float(v: f64) -> String {
    format!("{v:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12"), Ok(Number::Int(12)));
        assert_eq!(parse_number("-12"), Ok(Number::Int(-12)));
        assert_eq!(parse_number("- 12"), Ok(Number::Int(-12)));
        assert_eq!(parse_number("2.5"), Ok(Number::Float(2.5)));
        assert_eq!(parse_number("5."), Ok(Number::Float(5.0)));
        assert_eq!(parse_number(".5"), Ok(Number::Float(0.5)));
        assert_eq!(parse_number("5e3"), Ok(Number::Float(5000.0)));
        assert_eq!(parse_number("-1.5e-3"), Ok(Number::Float(-0.0015)));

        assert!(parse_number("99999999999999999999").is_err());
        assert!(parse_number("rust").is_err());
        assert_eq!(
            parse_number("1e400"),
            Err("1e400 is out of range for a float".to_string())
        );
        assert!(parse_number("-1e400").is_err());
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.1), "2.1");
        assert_eq!(format_float(4.0), "4.0");
        assert_eq!(format_float(-0.5), "-0.5");
        assert_eq!(format_float(1e-7), "1e-7");
        assert_eq!(parse_number(&format_float(1e300)), Ok(Number::Float(1e300)));
    }
}
