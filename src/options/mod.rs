/*
 *
 *  * Copyright (c) 2025 Couchbase, Inc.
 *  *
 *  * Licensed under the Apache License, Version 2.0 (the "License");
 *  * you may not use this file except in compliance with the License.
 *  * You may obtain a copy of the License at
 *  *
 *  *    http://www.apache.org/licenses/LICENSE-2.0
 *  *
 *  * Unless required by applicable law or agreed to in writing, software
 *  * distributed under the License is distributed on an "AS IS" BASIS,
 *  * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  * See the License for the specific language governing permissions and
 *  * limitations under the License.
 *
 */

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod user_mgmt_options;

pub const TIMEOUT_PARAM: &str = "timeout";

/// A call-scoped setting forwarded to the admin client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParamValue {
    Duration(Duration),
    String(String),
    Bool(bool),
    Int(i64),
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Duration(d) => write!(f, "{}ms", d.as_millis()),
            ParamValue::String(s) => write!(f, "{s}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<Duration> for ParamValue {
    fn from(value: Duration) -> Self {
        ParamValue::Duration(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

/// Parameters as handed to the admin client. Every key has a value.
pub type Params = BTreeMap<String, ParamValue>;

/// Parameters as a caller supplies them. `None` means "not provided".
pub type RawParams = BTreeMap<String, Option<ParamValue>>;

/// A reusable bag of named call settings.
pub trait OptionBlock {
    fn params(&self) -> RawParams;
}

impl OptionBlock for RawParams {
    fn params(&self) -> RawParams {
        self.clone()
    }
}

/// Merges option blocks, in order, and then keyword overrides into one
/// parameter set. Later sources win over earlier ones; a `None` value never
/// overrides anything and never reaches the output. Inputs are not modified.
pub fn compose<'a>(
    overrides: &RawParams,
    blocks: impl IntoIterator<Item = &'a dyn OptionBlock>,
) -> Params {
    let mut params = Params::new();

    let sources = blocks
        .into_iter()
        .map(|block| block.params())
        .chain(std::iter::once(overrides.clone()));

    for source in sources {
        for (key, value) in source {
            if let Some(value) = value {
                params.insert(key, value);
            }
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, Option<ParamValue>)]) -> RawParams {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn secs(s: u64) -> Option<ParamValue> {
        Some(Duration::from_secs(s).into())
    }

    #[test]
    fn keyword_overrides_block() {
        let block = raw(&[(TIMEOUT_PARAM, secs(5))]);
        let params = compose(&raw(&[(TIMEOUT_PARAM, secs(10))]), [&block as &dyn OptionBlock]);

        assert_eq!(Some(&ParamValue::Duration(Duration::from_secs(10))), params.get(TIMEOUT_PARAM));
    }

    #[test]
    fn none_is_not_provided() {
        let block = raw(&[(TIMEOUT_PARAM, None)]);
        let params = compose(&RawParams::new(), [&block as &dyn OptionBlock]);
        assert!(!params.contains_key(TIMEOUT_PARAM));

        let block = raw(&[(TIMEOUT_PARAM, secs(5))]);
        let params = compose(&raw(&[(TIMEOUT_PARAM, None)]), [&block as &dyn OptionBlock]);
        assert_eq!(Some(&ParamValue::Duration(Duration::from_secs(5))), params.get(TIMEOUT_PARAM));
    }

    #[test]
    fn later_blocks_win() {
        let first = raw(&[(TIMEOUT_PARAM, secs(1)), ("a", Some("first".into()))]);
        let second = raw(&[(TIMEOUT_PARAM, secs(2)), ("b", Some(true.into()))]);

        let params = compose(
            &RawParams::new(),
            [&first as &dyn OptionBlock, &second as &dyn OptionBlock],
        );

        assert_eq!(3, params.len());
        assert_eq!(Some(&ParamValue::Duration(Duration::from_secs(2))), params.get(TIMEOUT_PARAM));
        assert_eq!(Some(&ParamValue::String("first".to_string())), params.get("a"));
        assert_eq!(Some(&ParamValue::Bool(true)), params.get("b"));
    }

    #[test]
    fn no_sources() {
        assert!(compose(&RawParams::new(), []).is_empty());
    }

    #[test]
    fn inputs_are_untouched() {
        let block = raw(&[(TIMEOUT_PARAM, secs(5)), ("unset", None)]);
        let overrides = raw(&[(TIMEOUT_PARAM, secs(7))]);
        let before = (block.clone(), overrides.clone());

        compose(&overrides, [&block as &dyn OptionBlock]);

        assert_eq!(before, (block, overrides));
    }
}
