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
use crate::fieldmap::{is_truthy, FieldDefault, FieldSpec, Fields};
use crate::management::users::role::{encode_role_list, validate_roles, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The identity store a user belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthDomain {
    #[default]
    Local,
    External,
}

impl AuthDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthDomain::Local => "local",
            AuthDomain::External => "external",
        }
    }
}

impl Display for AuthDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuthDomain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthDomain::Local),
            "external" => Ok(AuthDomain::External),
            other => Err(Error::invalid_argument(
                "domain",
                format!("unknown auth domain {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginType {
    User,
    Group,
}

/// Why a user holds a role: assigned directly, or inherited from the group
/// named by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "type")]
    origin_type: OriginType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Origin {
    pub fn user() -> Self {
        Self {
            origin_type: OriginType::User,
            name: None,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            origin_type: OriginType::Group,
            name: Some(name.into()),
        }
    }

    pub fn origin_type(&self) -> OriginType {
        self.origin_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleAndOrigins {
    role: Role,
    origins: Vec<Origin>,
}

struct RoleAndOriginsSpec;

impl FieldSpec for RoleAndOriginsSpec {
    const ENTITY: &'static str = "role and origins";
}

impl RoleAndOrigins {
    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    pub(crate) fn from_json(value: &Value) -> error::Result<Self> {
        let role = Role::decode(value)?;

        // Servers before 6.5 send no origins; those roles are direct grants.
        let origins = match value {
            Value::Object(raw) => Fields::<RoleAndOriginsSpec>::from_wire(raw.clone())
                .get_as::<Vec<Origin>>("origins")?
                .unwrap_or_default(),
            _ => vec![],
        };
        let origins = if origins.is_empty() {
            vec![Origin::user()]
        } else {
            origins
        };

        Ok(Self { role, origins })
    }

    fn is_direct(&self) -> bool {
        self.origins
            .iter()
            .any(|origin| origin.origin_type == OriginType::User)
    }
}

/// An entry of the "list available roles" response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAndDescription {
    role: Role,
    display_name: String,
    description: String,
    ce: bool,
    bucket_name: Option<String>,
}

struct RoleAndDescriptionSpec;

impl FieldSpec for RoleAndDescriptionSpec {
    const ENTITY: &'static str = "role and description";
    const RENAMES: &'static [(&'static str, &'static str)] =
        &[("desc", "description"), ("name", "display_name")];
    const DEFAULTS: &'static [(&'static str, FieldDefault)] = &[
        ("ce", FieldDefault::Bool(true)),
        ("bucket_name", FieldDefault::Null),
    ];
}

impl RoleAndDescription {
    /// Builds from one entry of the roles listing.
    pub fn of(raw: Map<String, Value>) -> error::Result<Self> {
        let role = Role::decode(&Value::Object(raw.clone()))?;
        let fields = Fields::<RoleAndDescriptionSpec>::from_wire(raw);

        Ok(Self {
            role,
            display_name: fields.require("display_name")?,
            description: fields.require("description")?,
            ce: fields.require("ce")?,
            bucket_name: fields.get_as("bucket_name")?,
        })
    }

    pub(crate) fn from_json(value: Value) -> error::Result<Self> {
        match value {
            Value::Object(raw) => Self::of(raw),
            other => Err(Error::decoding_failure(format!(
                "expected role description object, got {other}"
            ))),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the role is available in Community Edition.
    pub fn ce(&self) -> bool {
        self.ce
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }
}

pub(crate) struct UserSpec;

impl FieldSpec for UserSpec {
    const ENTITY: &'static str = "user";
    const RENAMES: &'static [(&'static str, &'static str)] =
        &[("id", "username"), ("name", "display_name")];
    const DEFAULTS: &'static [(&'static str, FieldDefault)] =
        &[("groups", FieldDefault::EmptyList)];
}

/// Wire keys a user upsert may carry.
const UPSERT_USER_KEYS: [&str; 4] = ["name", "password", "roles", "groups"];

/// The mutable properties of a user.
///
/// Only keys that were actually set are sent on upsert: a user whose
/// password was never set keeps its stored password.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    fields: Fields<UserSpec>,
    // None until set; an explicitly empty set is still sent on upsert.
    roles: Option<BTreeSet<Role>>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            fields: Fields::of([("username", Value::String(username.into()))]),
            roles: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.set_display_name(display_name);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.set_roles(roles);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.get_or_insert_with(BTreeSet::new).insert(role);
        self
    }

    pub fn with_groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.set_groups(groups);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let mut groups = self.groups();
        groups.insert(group.into());
        self.set_groups(groups);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.set_password(password);
        self
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.fields
            .set("display_name", Value::String(display_name.into()));
    }

    pub fn set_roles(&mut self, roles: impl IntoIterator<Item = Role>) {
        self.roles = Some(roles.into_iter().collect());
    }

    pub fn set_groups<S: Into<String>>(&mut self, groups: impl IntoIterator<Item = S>) {
        let groups: BTreeSet<String> = groups.into_iter().map(Into::into).collect();
        self.fields.set(
            "groups",
            Value::Array(groups.into_iter().map(Value::String).collect()),
        );
    }

    /// Sets a new password to be sent with the next upsert. The password is
    /// never read back from the server.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.fields.set("password", Value::String(password.into()));
    }

    pub fn username(&self) -> &str {
        self.fields.get_str("username").unwrap_or_default()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.fields.get_str("display_name")
    }

    /// Names of the groups the user belongs to.
    pub fn groups(&self) -> BTreeSet<String> {
        self.fields
            .get("groups")
            .and_then(|groups| groups.as_array().cloned())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|group| group.as_str().map(str::to_string))
            .collect()
    }

    /// Roles assigned directly to the user, not those inherited from groups.
    pub fn roles(&self) -> BTreeSet<Role> {
        self.roles.clone().unwrap_or_default()
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.fields.get_str("password")
    }

    pub fn as_dict(&self) -> Map<String, Value> {
        let mut dict = self.fields.as_dict();
        if let Some(roles) = &self.roles {
            dict.insert(
                "roles".to_string(),
                Value::Array(
                    roles
                        .iter()
                        .map(|role| Value::String(role.encode()))
                        .collect(),
                ),
            );
        }

        dict
    }

    /// The subset of the wire data an upsert sends. `groups` is left out when
    /// empty since servers before 6.5 treat an empty value differently from
    /// an absent one. Fails when a role cannot be written in its string form.
    pub(crate) fn upsert_fields(&self) -> error::Result<Map<String, Value>> {
        validate_roles(self.roles.iter().flatten())?;

        Ok(self
            .as_dict()
            .into_iter()
            .filter(|(key, _)| UPSERT_USER_KEYS.contains(&key.as_str()))
            .filter(|(key, value)| {
                key != "groups" || value.as_array().map(|g| !g.is_empty()).unwrap_or(true)
            })
            .collect())
    }
}

pub(crate) struct UserAndMetadataSpec;

impl FieldSpec for UserAndMetadataSpec {
    const ENTITY: &'static str = "user and metadata";
    const RENAMES: &'static [(&'static str, &'static str)] = &[
        ("id", "username"),
        ("name", "display_name"),
        ("roles", "effective_roles_and_origins"),
        ("password_change_date", "password_changed"),
    ];
    const DEFAULTS: &'static [(&'static str, FieldDefault)] = &[
        ("groups", FieldDefault::EmptyList),
        ("external_groups", FieldDefault::EmptyList),
        ("effective_roles_and_origins", FieldDefault::EmptyList),
    ];
}

/// A user as returned by the server, together with the properties derived
/// from its group memberships.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAndMetadata {
    domain: AuthDomain,
    user: User,
    effective_roles: BTreeSet<Role>,
    effective_roles_and_origins: Vec<RoleAndOrigins>,
    password_changed: Option<f64>,
    external_groups: BTreeSet<String>,
}

impl UserAndMetadata {
    pub(crate) fn from_json(value: Value) -> error::Result<Self> {
        let fields = Fields::<UserAndMetadataSpec>::from_value(value)?;

        let domain: AuthDomain = fields.require("domain")?;
        let username: String = fields.require("username")?;
        let display_name: Option<String> = fields.get_as("display_name")?;
        let groups: BTreeSet<String> = fields.get_as("groups")?.unwrap_or_default();
        let external_groups: BTreeSet<String> =
            fields.get_as("external_groups")?.unwrap_or_default();

        let effective_roles_and_origins = fields
            .get_as::<Vec<Value>>("effective_roles_and_origins")?
            .unwrap_or_default()
            .iter()
            .map(RoleAndOrigins::from_json)
            .collect::<error::Result<Vec<_>>>()?;

        let password_changed = fields
            .lookup("password_changed")
            .map(parse_password_changed)
            .transpose()?;

        let mut user = User::new(username)
            .with_groups(groups)
            .with_roles(
                effective_roles_and_origins
                    .iter()
                    .filter(|r| r.is_direct())
                    .map(|r| r.role.clone()),
            );
        if let Some(display_name) = display_name {
            user.set_display_name(display_name);
        }

        Ok(Self {
            domain,
            user,
            effective_roles: effective_roles_and_origins
                .iter()
                .map(|r| r.role.clone())
                .collect(),
            effective_roles_and_origins,
            password_changed,
            external_groups,
        })
    }

    pub fn domain(&self) -> AuthDomain {
        self.domain
    }

    /// A fresh copy of the user on every call; changing it has no effect on
    /// this value.
    pub fn user(&self) -> User {
        self.user.clone()
    }

    /// All roles, regardless of origin.
    pub fn effective_roles(&self) -> &BTreeSet<Role> {
        &self.effective_roles
    }

    pub fn effective_roles_and_origins(&self) -> &[RoleAndOrigins] {
        &self.effective_roles_and_origins
    }

    /// Seconds since the Unix epoch.
    pub fn password_changed(&self) -> Option<f64> {
        self.password_changed
    }

    pub fn password_changed_at(&self) -> Option<DateTime<Utc>> {
        self.password_changed.and_then(|secs| {
            DateTime::from_timestamp(
                secs.trunc() as i64,
                (secs.fract() * 1_000_000_000.0).round() as u32,
            )
        })
    }

    pub fn external_groups(&self) -> &BTreeSet<String> {
        &self.external_groups
    }
}

fn parse_password_changed(value: &Value) -> error::Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::decoding_failure(format!("invalid timestamp {n}"))),
        Value::String(s) => {
            let date = DateTime::parse_from_rfc3339(s)
                .map_err(|e| Error::decoding_failure(format!("failed to parse date: {e}")))?;

            Ok(date.timestamp() as f64 + f64::from(date.timestamp_subsec_nanos()) / 1e9)
        }
        other => Err(Error::decoding_failure(format!(
            "expected password change date, got {other}"
        ))),
    }
}

pub(crate) struct GroupSpec;

impl FieldSpec for GroupSpec {
    const ENTITY: &'static str = "group";
    const RENAMES: &'static [(&'static str, &'static str)] =
        &[("ldap_group_ref", "ldap_group_reference")];
    const DEFAULTS: &'static [(&'static str, FieldDefault)] = &[
        ("description", FieldDefault::Str("")),
        ("ldap_group_reference", FieldDefault::Str("")),
    ];
}

/// A named set of roles. Users inherit the roles of the groups they belong
/// to.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    name: String,
    fields: Fields<GroupSpec>,
    roles: BTreeSet<Role>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Fields::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.set_roles(roles);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_ldap_group_reference(mut self, reference: impl Into<String>) -> Self {
        self.set_ldap_group_reference(reference);
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.fields
            .set("description", Value::String(description.into()));
    }

    pub fn set_roles(&mut self, roles: impl IntoIterator<Item = Role>) {
        self.roles = roles.into_iter().collect();
    }

    pub fn set_ldap_group_reference(&mut self, reference: impl Into<String>) {
        self.fields
            .set("ldap_group_reference", Value::String(reference.into()));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> String {
        self.get_string("description")
    }

    pub fn ldap_group_reference(&self) -> String {
        self.get_string("ldap_group_reference")
    }

    pub fn roles(&self) -> BTreeSet<Role> {
        self.roles.clone()
    }

    fn get_string(&self, attr: &str) -> String {
        self.fields
            .get(attr)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Decodes a group payload. The server's `id` becomes the name and the
    /// roles are decoded from whatever wire form they arrive in.
    pub(crate) fn from_json(value: Value) -> error::Result<Self> {
        let mut raw = match value {
            Value::Object(raw) => raw,
            other => {
                return Err(Error::decoding_failure(format!(
                    "expected group object, got {other}"
                )))
            }
        };

        let name = match raw.shift_remove("id") {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(Error::decoding_failure(format!(
                    "expected group id string, got {other}"
                )))
            }
            None => return Err(Error::decoding_failure("group payload has no id")),
        };

        let roles = match raw.shift_remove("roles") {
            Some(Value::Array(items)) => items
                .iter()
                .map(Role::decode)
                .collect::<error::Result<BTreeSet<Role>>>()?,
            Some(Value::Null) | None => BTreeSet::new(),
            Some(other) => {
                return Err(Error::decoding_failure(format!(
                    "expected group roles array, got {other}"
                )))
            }
        };

        Ok(Self {
            name,
            fields: Fields::from_wire(raw),
            roles,
        })
    }

    /// Wire form for an upsert: falsy fields are left out, even when set
    /// explicitly, except `roles`, which is always present because an absent
    /// value would mean "no change". The name travels in the path, never in
    /// the body.
    pub fn as_dict(&self) -> Map<String, Value> {
        let mut dict: Map<String, Value> = self
            .fields
            .raw()
            .iter()
            .filter(|(_, value)| is_truthy(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let roles = if self.roles.is_empty() {
            Value::Array(vec![])
        } else {
            Value::String(encode_role_list(&self.roles))
        };
        dict.insert("roles".to_string(), roles);

        dict
    }

    /// [`Group::as_dict`], after checking every role can be written in its
    /// string form.
    pub(crate) fn upsert_fields(&self) -> error::Result<Map<String, Value>> {
        validate_roles(&self.roles)?;

        Ok(self.as_dict())
    }
}
