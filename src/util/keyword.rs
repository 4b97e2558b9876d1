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

use crate::error::QueryValidationError;

/// A closed set of keywords with a fixed textual form, such as aggregation
/// or rollup functions. Lookup is by exact match of that form.
pub trait Keyword: Copy + Sized + 'static {
    /// what the keyword is, as it appears in error messages
    const LABEL: &'static str;
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_keyword(literal: &str) -> Result<Self, QueryValidationError> {
        reverse_lookup(literal)
    }
}

/// Resolves `literal` against `K::ALL`. On failure the message lists every
/// alternative, sorted: `Rollup function 'x' must be one of '', 'avg', ...`.
pub fn reverse_lookup<K: Keyword>(literal: &str) -> Result<K, QueryValidationError> {
    K::ALL
        .iter()
        .find(|k| k.as_str() == literal)
        .copied()
        .ok_or_else(|| {
            QueryValidationError::new(format!(
                "{} '{literal}' must be one of {}",
                K::LABEL,
                alternatives::<K>()
            ))
        })
}

pub fn alternatives<K: Keyword>() -> String {
    let mut values: Vec<_> = K::ALL.iter().map(|k| k.as_str()).collect();
    values.sort_unstable();
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
