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
use crate::management::users::user::AuthDomain;
use crate::options::Params;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use serde_json::{Map, Value};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const ROLES_PATH: &str = "/settings/rbac/roles/";
pub const GROUPS_PATH: &str = "/settings/rbac/groups/";
pub const CHANGE_PASSWORD_PATH: &str = "/controller/changePassword";

pub fn group_path(name: &str) -> String {
    format!("{}{}", GROUPS_PATH, urlencoding::encode(name))
}

pub fn users_path(domain: AuthDomain) -> String {
    format!("/settings/rbac/users/{}", urlencoding::encode(domain.as_str()))
}

pub fn user_path(domain: AuthDomain, username: &str) -> String {
    format!("{}/{}", users_path(domain), urlencoding::encode(username))
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct AdminRequest {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub body: Option<Bytes>,
    pub content_type: Option<String>,
}

impl AdminRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            body: None,
            content_type: None,
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn form_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Bytes::from(body.into()));
        self.content_type = Some(FORM_CONTENT_TYPE.to_string());
        self
    }
}

/// A completed 2xx response. `value` is the decoded JSON body, or the raw
/// text as a JSON string when the body was not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminResponse {
    pub value: Value,
}

impl AdminResponse {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Value::Null)
    }
}

/// The HTTP transport to the cluster management service.
///
/// Implementations own authentication, connection handling and timeout
/// enforcement (`timeout` arrives in [`AdminRequest::params`]). Non-2xx
/// responses must be reported as [`Error::http_failure`](crate::error::Error::http_failure)
/// with the response text, which is what fault classification inspects.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn http_request(&self, req: AdminRequest) -> error::Result<AdminResponse>;

    async fn user_get(
        &self,
        domain: AuthDomain,
        username: &str,
        params: Params,
    ) -> error::Result<AdminResponse> {
        self.http_request(AdminRequest::new(Method::GET, user_path(domain, username)).params(params))
            .await
    }

    async fn users_get(&self, domain: AuthDomain, params: Params) -> error::Result<AdminResponse> {
        self.http_request(AdminRequest::new(Method::GET, users_path(domain)).params(params))
            .await
    }

    async fn user_upsert(
        &self,
        domain: AuthDomain,
        username: &str,
        user_fields: Map<String, Value>,
        params: Params,
    ) -> error::Result<AdminResponse> {
        self.http_request(
            AdminRequest::new(Method::PUT, user_path(domain, username))
                .params(params)
                .form_body(encode_form(&user_fields)),
        )
        .await
    }

    async fn user_remove(
        &self,
        domain: AuthDomain,
        username: &str,
        params: Params,
    ) -> error::Result<AdminResponse> {
        self.http_request(
            AdminRequest::new(Method::DELETE, user_path(domain, username)).params(params),
        )
        .await
    }
}

/// Form-encodes wire data. Arrays become comma separated lists.
pub fn encode_form(fields: &Map<String, Value>) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());

    for (key, value) in fields {
        form.append_pair(key, &form_value(value));
    }

    form.finish()
}

fn form_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(form_value)
            .collect::<Vec<String>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_are_escaped() {
        assert_eq!(
            "/settings/rbac/users/local/jo%20smith",
            user_path(AuthDomain::Local, "jo smith")
        );
        assert_eq!("/settings/rbac/users/external", users_path(AuthDomain::External));
        assert_eq!("/settings/rbac/groups/a%2Fb", group_path("a/b"));
    }

    #[test]
    fn form_encoding() {
        let fields = json!({
            "name": "Jo Smith",
            "roles": ["admin", "bucket_admin[b1]"],
            "groups": [],
            "ce": true
        });

        assert_eq!(
            "name=Jo+Smith&roles=admin%2Cbucket_admin%5Bb1%5D&groups=&ce=true",
            encode_form(fields.as_object().unwrap())
        );
    }
}
