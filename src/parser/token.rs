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

lrlex::lrlex_mod!("token_map");
pub use token_map::*;

pub type TokenId = u8;

/// Human readable name of a token, used in syntax error messages.
pub fn token_display(id: TokenId) -> &'static str {
    match id {
        T_START_QUERY | T_START_FORMULA => "start of input",
        T_METRIC_NAME => "metric name",
        T_IDENTIFIER => "identifier",
        T_NUMBER => "number",
        T_STRING => "string",
        T_TAG_NAME => "tag name",
        T_TAG_VALUE => "tag value",
        T_TMPL_VAR => "template variable",
        T_WILDCARD => "*",
        T_NOT => "!",
        T_COLON => ":",
        T_COMMA => ",",
        T_LEFT_BRACE => "{",
        T_RIGHT_BRACE => "}",
        T_LEFT_PAREN => "(",
        T_RIGHT_PAREN => ")",
        T_BY => "by",
        T_AS_COUNT => ".as_count",
        T_AS_RATE => ".as_rate",
        T_ROLLUP => ".rollup",
        T_FILL => ".fill",
        T_ADD => "+",
        T_SUB => "-",
        T_MUL => "*",
        T_DIV => "/",
        _ => "unknown token",
    }
}
