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

use crate::error;
use crate::error::Error;
use crate::fieldmap::{FieldDefault, FieldSpec, Fields};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A permission, either cluster-wide or scoped to a single bucket.
///
/// The string form is `name` or `name[bucket]`; the structured form is an
/// object with a `role` key and an optional `bucket` (or `bucket_name`) key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role {
    name: String,
    bucket: Option<String>,
}

pub(crate) struct RoleSpec;

impl FieldSpec for RoleSpec {
    const ENTITY: &'static str = "role";
    const RENAMES: &'static [(&'static str, &'static str)] = &[
        ("role", "name"),
        ("bucket", "bucket"),
        ("bucket_name", "bucket"),
    ];
    const DEFAULTS: &'static [(&'static str, FieldDefault)] = &[("bucket", FieldDefault::Null)];
    const POSITIONS: &'static [&'static str] = &["name", "bucket"];
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket: None,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// `name`, or `name[bucket]` for a bucket-scoped role.
    pub fn encode(&self) -> String {
        match &self.bucket {
            Some(bucket) => format!("{}[{}]", self.name, bucket),
            None => self.name.clone(),
        }
    }

    /// Parses the string form. Everything before the first `[` is the name and
    /// everything between it and the trailing `]` is the bucket.
    pub fn parse(value: &str) -> error::Result<Self> {
        let role = match value.find('[') {
            Some(open) => {
                let bucket = value[open + 1..].strip_suffix(']').ok_or_else(|| {
                    Error::invalid_argument("role", format!("unterminated bucket in {value:?}"))
                })?;

                Self::new(&value[..open]).with_bucket(bucket)
            }
            None if value.ends_with(']') => {
                return Err(Error::invalid_argument(
                    "role",
                    format!("unbalanced bracket in {value:?}"),
                ));
            }
            None => Self::new(value),
        };

        if role.name.is_empty() {
            return Err(Error::invalid_argument("role", "role name cannot be empty"));
        }

        Ok(role)
    }

    /// Checks that the role can be sent: its string form must parse back to
    /// the same role and it must not contain the `,` that separates role
    /// lists.
    pub fn validate(&self) -> error::Result<()> {
        let encoded = self.encode();
        if encoded.contains(',') {
            return Err(Error::invalid_argument(
                "role",
                format!("{encoded:?} contains a comma"),
            ));
        }

        match Self::parse(&encoded) {
            Ok(parsed) if parsed == *self => Ok(()),
            _ => Err(Error::invalid_argument(
                "role",
                format!("{encoded:?} does not form a valid role string"),
            )),
        }
    }

    /// Normalises any wire representation of a role: the string form, an
    /// object with `role`/`bucket` keys or a `[name, bucket]` pair.
    pub fn decode(value: &Value) -> error::Result<Self> {
        if let Value::String(s) = value {
            return Self::parse(s).map_err(Error::decoding_failure);
        }

        let fields = Fields::<RoleSpec>::from_value(value.clone())?;
        let name: String = fields.require("name")?;
        if name.is_empty() {
            return Err(Error::decoding_failure("role name cannot be empty"));
        }

        Ok(Self {
            name,
            bucket: fields.get_as("bucket")?,
        })
    }

    /// The structured form, `{"role": .., "bucket": ..}`.
    pub fn to_structured(&self) -> Map<String, Value> {
        let mut fields = Fields::<RoleSpec>::of([("name", Value::String(self.name.clone()))]);
        if let Some(bucket) = &self.bucket {
            fields.set("bucket", Value::String(bucket.clone()));
        }

        fields.as_dict()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub(crate) fn validate_roles<'a>(roles: impl IntoIterator<Item = &'a Role>) -> error::Result<()> {
    roles.into_iter().try_for_each(Role::validate)
}

/// Comma separated role list as the management endpoints expect it in form
/// bodies. Percent-escaping happens when the list is written into the form;
/// [`Role::validate`] keeps `,` out of the individual roles.
pub(crate) fn encode_role_list<'a>(roles: impl IntoIterator<Item = &'a Role>) -> String {
    roles
        .into_iter()
        .map(Role::encode)
        .collect::<Vec<String>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn encode_unscoped_and_scoped() {
        assert_eq!("admin", Role::new("admin").encode());
        assert_eq!(
            "bucket_full_access[default]",
            Role::new("bucket_full_access")
                .with_bucket("default")
                .encode()
        );
        assert_eq!(
            "bucket_admin[*]",
            Role::new("bucket_admin").with_bucket("*").to_string()
        );
    }

    #[test]
    fn string_round_trip() {
        let roles = vec![
            Role::new("admin"),
            Role::new("bucket_full_access").with_bucket("travel-sample"),
            Role::new("data_reader").with_bucket("my bucket&co=1%"),
            Role::new("data_writer").with_bucket("odd]name"),
            Role::new("ro_admin").with_bucket(""),
        ];

        for role in roles {
            assert_eq!(role, Role::decode(&Value::String(role.encode())).unwrap());
            assert_eq!(role, role.encode().parse::<Role>().unwrap());
        }
    }

    #[test]
    fn round_trip_through_form_encoding() {
        let role = Role::new("data_reader").with_bucket("b&c=d;e f%[x]");
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("roles", &encode_role_list([&role]))
            .finish();

        let (_, value) = url::form_urlencoded::parse(body.as_bytes())
            .next()
            .unwrap();
        assert_eq!(role, Role::parse(&value).unwrap());
    }

    #[test]
    fn decode_structured_forms() {
        assert_eq!(
            Role::new("bucket_admin").with_bucket("default"),
            Role::decode(&json!({"role": "bucket_admin", "bucket": "default"})).unwrap()
        );
        assert_eq!(
            Role::new("bucket_admin").with_bucket("default"),
            Role::decode(&json!({"role": "bucket_admin", "bucket_name": "default"})).unwrap()
        );
        assert_eq!(
            Role::new("admin"),
            Role::decode(&json!({"role": "admin"})).unwrap()
        );
        assert_eq!(
            Role::new("admin"),
            Role::decode(&json!({"role": "admin", "bucket": null})).unwrap()
        );
    }

    #[test]
    fn decode_positional_form() {
        assert_eq!(
            Role::new("views_admin").with_bucket("beer"),
            Role::decode(&json!(["views_admin", "beer"])).unwrap()
        );
        assert_eq!(
            Role::new("admin"),
            Role::decode(&json!(["admin", null])).unwrap()
        );
        assert_eq!(Role::new("admin"), Role::decode(&json!(["admin"])).unwrap());
    }

    #[test]
    fn structured_encoding_omits_absent_bucket() {
        assert_eq!(json!({"role": "admin"}), Value::Object(Role::new("admin").to_structured()));

        let scoped = Role::new("bucket_admin").with_bucket("b1");
        assert_eq!(
            json!({"role": "bucket_admin", "bucket": "b1"}),
            Value::Object(scoped.to_structured())
        );
        assert_eq!(scoped, Role::decode(&Value::Object(scoped.to_structured())).unwrap());
    }

    #[test]
    fn malformed_strings_are_invalid_arguments() {
        for bad in ["", "admin[", "admin]", "[default]", "bucket_admin[default"] {
            let err = Role::parse(bad).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::InvalidArgument(_)),
                "{bad:?} gave {err}"
            );
        }
    }

    #[test]
    fn malformed_payloads_are_decode_failures() {
        for bad in [json!(42), json!({"bucket": "b"}), json!({"role": 7}), json!(["a", "b", "c"])] {
            let err = Role::decode(&bad).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::DecodingFailure(_)),
                "{bad} gave {err}"
            );
        }
    }

    #[test]
    fn validate_accepts_round_trippable_roles() {
        let roles = [
            Role::new("admin"),
            Role::new("bucket_full_access").with_bucket("travel-sample"),
            Role::new("data_writer").with_bucket("odd]name"),
            Role::new("ro_admin").with_bucket(""),
        ];

        assert!(validate_roles(&roles).is_ok());
    }

    #[test]
    fn validate_rejects_roles_without_a_string_form() {
        let bad = [
            Role::new(""),
            Role::new("admin]"),
            Role::new("a[b"),
            Role::new("weird[x"),
            Role::new("a[b").with_bucket("c"),
            Role::new("admin,ro_admin"),
            Role::new("data_reader").with_bucket("b1,b2"),
        ];

        for role in bad {
            let err = role.validate().unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::InvalidArgument(_)),
                "{role:?} gave {err}"
            );
        }

        let roles = [Role::new("admin"), Role::new("admin]")];
        assert!(validate_roles(&roles).is_err());
    }

    #[test]
    fn role_list() {
        let roles = [Role::new("admin"), Role::new("bucket_full_access").with_bucket("b1")];

        assert_eq!("admin,bucket_full_access[b1]", encode_role_list(&roles));
        assert_eq!("", encode_role_list(&[]));
    }
}
