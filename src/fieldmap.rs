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

//! Declarative mapping between wire key/value data and named entity
//! attributes.
//!
//! An entity declares a [`FieldSpec`]: which wire keys alias which
//! attributes, what an attribute falls back to when its key is absent, and
//! the attribute order used when the wire form is positional. [`Fields`]
//! then keeps the raw wire data and resolves attribute reads through that
//! table.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

#[derive(thiserror::Error, Debug)]
pub enum FieldError {
    #[error("expected {entity} as an object or array, got {found}")]
    UnexpectedShape {
        entity: &'static str,
        found: &'static str,
    },
    #[error("too many positional values for {entity}: expected at most {expected}, got {actual}")]
    TooManyPositions {
        entity: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("missing field {attr} in {entity}")]
    MissingField { entity: &'static str, attr: String },
    #[error("field {attr} in {entity} has an unexpected type: {source}")]
    InvalidField {
        entity: &'static str,
        attr: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fallback for an attribute whose wire key is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Null,
    Bool(bool),
    Str(&'static str),
    EmptyList,
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Null => Value::Null,
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Str(s) => Value::String(s.to_string()),
            FieldDefault::EmptyList => Value::Array(vec![]),
        }
    }
}

pub trait FieldSpec {
    /// Entity name used in decode errors.
    const ENTITY: &'static str;

    /// `(wire key, attribute)` pairs. Several wire keys may alias one
    /// attribute; they are tried in table order and the first one is the
    /// key used when writing the attribute.
    const RENAMES: &'static [(&'static str, &'static str)] = &[];

    /// `(attribute, fallback)` pairs.
    const DEFAULTS: &'static [(&'static str, FieldDefault)] = &[];

    /// Attribute order of the positional (tuple) representation.
    const POSITIONS: &'static [&'static str] = &[];
}

/// Whether a wire value counts as set: null, `false`, zero and empty values
/// do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Raw wire data viewed through a [`FieldSpec`].
pub struct Fields<S: FieldSpec> {
    raw: Map<String, Value>,
    explicit: BTreeSet<String>,
    _spec: PhantomData<fn() -> S>,
}

impl<S: FieldSpec> Fields<S> {
    pub fn new() -> Self {
        Self::from_wire(Map::new())
    }

    /// Wraps data received from the server. Nothing counts as explicitly
    /// set.
    pub fn from_wire(raw: Map<String, Value>) -> Self {
        Self {
            raw,
            explicit: BTreeSet::new(),
            _spec: PhantomData,
        }
    }

    /// Accepts either the named (object) or positional (array) wire form.
    pub fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Object(raw) => Ok(Self::from_wire(raw)),
            Value::Array(items) => {
                if items.len() > S::POSITIONS.len() {
                    return Err(FieldError::TooManyPositions {
                        entity: S::ENTITY,
                        expected: S::POSITIONS.len(),
                        actual: items.len(),
                    });
                }

                let raw = S::POSITIONS
                    .iter()
                    .zip(items)
                    .map(|(attr, value)| (Self::wire_key(attr).to_string(), value))
                    .collect();

                Ok(Self::from_wire(raw))
            }
            other => Err(FieldError::UnexpectedShape {
                entity: S::ENTITY,
                found: shape_name(&other),
            }),
        }
    }

    /// Builds from attribute-named values, storing each under its wire key.
    /// Every value given here counts as explicitly set.
    pub fn of<K: AsRef<str>>(attrs: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut fields = Self::new();
        for (attr, value) in attrs {
            fields.set(attr.as_ref(), value);
        }
        fields
    }

    /// The key an attribute is written under.
    pub fn wire_key(attr: &str) -> &str {
        S::RENAMES
            .iter()
            .find(|(_, a)| *a == attr)
            .map(|(wire, _)| *wire)
            .unwrap_or(attr)
    }

    fn default_for(attr: &str) -> Option<Value> {
        S::DEFAULTS
            .iter()
            .find(|(a, _)| *a == attr)
            .map(|(_, default)| default.to_value())
    }

    /// The raw value of an attribute, ignoring defaults. Renamed wire keys are
    /// tried first, then the attribute's own name. `null` counts as absent.
    pub fn lookup(&self, attr: &str) -> Option<&Value> {
        S::RENAMES
            .iter()
            .filter(|(_, a)| *a == attr)
            .map(|(wire, _)| *wire)
            .chain(std::iter::once(attr))
            .filter_map(|key| self.raw.get(key))
            .find(|value| !value.is_null())
    }

    /// Resolves an attribute, falling back to its declared default.
    pub fn get(&self, attr: &str) -> Option<Cow<'_, Value>> {
        match self.lookup(attr) {
            Some(value) => Some(Cow::Borrowed(value)),
            None => Self::default_for(attr)
                .filter(|value| !value.is_null())
                .map(Cow::Owned),
        }
    }

    pub fn get_str(&self, attr: &str) -> Option<&str> {
        self.lookup(attr).and_then(Value::as_str)
    }

    /// Resolves and deserializes an attribute. A value of the wrong shape is
    /// an error, never coerced.
    pub fn get_as<T: DeserializeOwned>(&self, attr: &str) -> Result<Option<T>, FieldError> {
        match self.get(attr) {
            Some(value) => serde_json::from_value(value.into_owned())
                .map(Some)
                .map_err(|source| FieldError::InvalidField {
                    entity: S::ENTITY,
                    attr: attr.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, attr: &str) -> Result<T, FieldError> {
        self.get_as(attr)?.ok_or_else(|| FieldError::MissingField {
            entity: S::ENTITY,
            attr: attr.to_string(),
        })
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.raw.contains_key(Self::wire_key(attr))
    }

    pub fn set(&mut self, attr: &str, value: Value) {
        let key = Self::wire_key(attr).to_string();
        self.explicit.insert(key.clone());
        self.raw.insert(key, value);
    }

    pub fn remove(&mut self, attr: &str) -> Option<Value> {
        let key = Self::wire_key(attr);
        self.explicit.remove(key);
        self.raw.shift_remove(key)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Wire form for sending back to the server. Falsy values are dropped
    /// unless they were explicitly set.
    pub fn as_dict(&self) -> Map<String, Value> {
        self.raw
            .iter()
            .filter(|(key, value)| is_truthy(value) || self.explicit.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<S: FieldSpec> Default for Fields<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FieldSpec> Clone for Fields<S> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            explicit: self.explicit.clone(),
            _spec: PhantomData,
        }
    }
}

// Equality is over the wire data only.
impl<S: FieldSpec> PartialEq for Fields<S> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<S: FieldSpec> Debug for Fields<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(S::ENTITY).field("raw", &self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct DescSpec;

    impl FieldSpec for DescSpec {
        const ENTITY: &'static str = "description";
        const RENAMES: &'static [(&'static str, &'static str)] =
            &[("desc", "description"), ("name", "display_name")];
        const DEFAULTS: &'static [(&'static str, FieldDefault)] =
            &[("ce", FieldDefault::Bool(true)), ("bucket_name", FieldDefault::Null)];
        const POSITIONS: &'static [&'static str] = &["display_name", "description"];
    }

    fn wire(value: Value) -> Fields<DescSpec> {
        Fields::from_value(value).unwrap()
    }

    #[test]
    fn renamed_key_resolves_attribute() {
        let fields = wire(json!({"name": "Full Admin", "desc": "Everything"}));

        assert_eq!(Some("Full Admin"), fields.get_str("display_name"));
        assert_eq!(Some("Everything"), fields.get_str("description"));
    }

    #[test]
    fn attribute_name_is_tried_after_renames() {
        let fields = wire(json!({"description": "own name"}));

        assert_eq!(Some("own name"), fields.get_str("description"));
    }

    #[test]
    fn default_used_when_key_absent() {
        let fields = wire(json!({}));

        assert_eq!(Some(true), fields.get_as::<bool>("ce").unwrap());
        assert_eq!(Some(false), wire(json!({"ce": false})).get_as("ce").unwrap());
    }

    #[test]
    fn absent_without_default_is_none() {
        let fields = wire(json!({}));

        assert!(fields.get("missing").is_none());
        assert!(fields.get("bucket_name").is_none());
        assert!(fields.get_as::<String>("missing").unwrap().is_none());
    }

    #[test]
    fn wrong_type_is_an_error() {
        let fields = wire(json!({"ce": "yes"}));

        assert!(matches!(
            fields.get_as::<bool>("ce"),
            Err(FieldError::InvalidField { .. })
        ));
        assert!(matches!(
            fields.require::<String>("display_name"),
            Err(FieldError::MissingField { .. })
        ));
    }

    #[test]
    fn of_stores_under_wire_keys() {
        let fields = Fields::<DescSpec>::of([
            ("display_name", json!("Admin")),
            ("description", json!("")),
        ]);

        assert_eq!(Some(&json!("Admin")), fields.raw().get("name"));
        assert_eq!(Some(&json!("")), fields.raw().get("desc"));
        assert!(fields.raw().get("display_name").is_none());
    }

    #[test]
    fn as_dict_drops_falsy_unless_explicit() {
        let mut fields = wire(json!({"name": "", "desc": "kept", "ce": false}));
        let dict = fields.as_dict();
        assert_eq!(1, dict.len());
        assert_eq!(Some(&json!("kept")), dict.get("desc"));

        fields.set("display_name", json!(""));
        let dict = fields.as_dict();
        assert_eq!(Some(&json!("")), dict.get("name"));
        assert!(dict.get("ce").is_none());
    }

    #[test]
    fn positional_form() {
        let fields = wire(json!(["Admin", "Everything"]));

        assert_eq!(Some("Admin"), fields.get_str("display_name"));
        assert_eq!(Some("Everything"), fields.get_str("description"));

        assert!(matches!(
            Fields::<DescSpec>::from_value(json!(["a", "b", "c"])),
            Err(FieldError::TooManyPositions { actual: 3, .. })
        ));
        assert!(matches!(
            Fields::<DescSpec>::from_value(json!("admin")),
            Err(FieldError::UnexpectedShape { found: "string", .. })
        ));
    }

    #[test]
    fn remove_forgets_explicit_set() {
        let mut fields = Fields::<DescSpec>::new();
        fields.set("description", json!(""));
        assert!(fields.contains("description"));

        fields.remove("description");
        assert!(!fields.contains("description"));
        assert!(fields.as_dict().is_empty());
    }
}
