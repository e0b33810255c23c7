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

use crate::clients::admin_client::{
    encode_form, group_path, AdminClient, AdminRequest, CHANGE_PASSWORD_PATH, GROUPS_PATH,
    ROLES_PATH,
};
use crate::error;
use crate::error::{Error, ErrorKind, USER_ERROR_MAP};
use crate::management::users::user::{
    AuthDomain, Group, RoleAndDescription, User, UserAndMetadata,
};
use crate::options::user_mgmt_options::{
    ChangePasswordOptions, DropGroupOptions, DropUserOptions, GetAllGroupsOptions,
    GetAllUsersOptions, GetGroupOptions, GetRolesOptions, GetUserOptions, UpsertGroupOptions,
    UpsertUserOptions, UserManagerConfig,
};
use crate::options::{compose, OptionBlock, Params, RawParams};
use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) struct UserMgmtClient {
    admin: Arc<dyn AdminClient>,
    config: UserManagerConfig,
}

impl UserMgmtClient {
    pub fn new(admin: Arc<dyn AdminClient>, config: UserManagerConfig) -> Self {
        Self { admin, config }
    }

    fn compose(&self, overrides: &RawParams, opts: &dyn OptionBlock) -> Params {
        let params = compose(overrides, [&self.config as &dyn OptionBlock, opts]);
        trace!("composed call parameters: {:?}", params);

        params
    }

    fn domain(&self, domain: Option<AuthDomain>) -> AuthDomain {
        domain.unwrap_or(self.config.default_auth_domain)
    }

    pub async fn get_user(
        &self,
        username: String,
        domain: Option<AuthDomain>,
        opts: GetUserOptions,
    ) -> error::Result<UserAndMetadata> {
        require_non_empty("username", &username)?;
        let domain = self.domain(domain);
        let params = self.compose(&opts.overrides, &opts);

        debug!("getting user {} in domain {}", username, domain);
        let resp = self
            .admin
            .user_get(domain, &username, params)
            .await
            .map_err(|e| e.classify(&USER_ERROR_MAP))?;

        UserAndMetadata::from_json(resp.value)
    }

    pub async fn get_all_users(
        &self,
        domain: Option<AuthDomain>,
        opts: GetAllUsersOptions,
    ) -> error::Result<Vec<UserAndMetadata>> {
        let domain = self.domain(domain);
        let params = self.compose(&opts.overrides, &opts);

        debug!("getting all users in domain {}", domain);
        let resp = self
            .admin
            .users_get(domain, params)
            .await
            .map_err(|e| e.classify(&USER_ERROR_MAP))?;

        into_array(resp.value, "users")?
            .into_iter()
            .map(UserAndMetadata::from_json)
            .collect()
    }

    pub async fn upsert_user(
        &self,
        user: User,
        domain: Option<AuthDomain>,
        opts: UpsertUserOptions,
    ) -> error::Result<()> {
        require_non_empty("username", user.username())?;
        let fields = user.upsert_fields()?;
        let domain = self.domain(domain);
        let params = self.compose(&opts.overrides, &opts);

        debug!("upserting user {} in domain {}", user.username(), domain);
        self.admin
            .user_upsert(domain, user.username(), fields, params)
            .await
            .map_err(|e| e.classify(&USER_ERROR_MAP))?;

        Ok(())
    }

    pub async fn drop_user(
        &self,
        username: String,
        domain: Option<AuthDomain>,
        opts: DropUserOptions,
    ) -> error::Result<()> {
        require_non_empty("username", &username)?;
        let domain = self.domain(domain);
        let params = self.compose(&opts.overrides, &opts);

        debug!("dropping user {} in domain {}", username, domain);
        self.admin
            .user_remove(domain, &username, params)
            .await
            .map_err(|e| e.classify(&USER_ERROR_MAP))?;

        Ok(())
    }

    pub async fn get_roles(&self, opts: GetRolesOptions) -> error::Result<Vec<RoleAndDescription>> {
        let params = self.compose(&opts.overrides, &opts);

        let resp = self
            .http_request(AdminRequest::new(Method::GET, ROLES_PATH).params(params))
            .await?;

        into_array(resp, "roles")?
            .into_iter()
            .map(RoleAndDescription::from_json)
            .collect()
    }

    pub async fn get_group(&self, group_name: String, opts: GetGroupOptions) -> error::Result<Group> {
        require_non_empty("group_name", &group_name)?;
        let params = self.compose(&opts.overrides, &opts);

        debug!("getting group {}", group_name);
        let resp = self
            .http_request(AdminRequest::new(Method::GET, group_path(&group_name)).params(params))
            .await?;

        Group::from_json(resp)
    }

    pub async fn get_all_groups(&self, opts: GetAllGroupsOptions) -> error::Result<Vec<Group>> {
        let params = self.compose(&opts.overrides, &opts);

        // A 404 here means the server predates groups, whatever its text says.
        let resp = match self
            .admin
            .http_request(AdminRequest::new(Method::GET, GROUPS_PATH).params(params))
            .await
            .map_err(|e| {
                e.not_found_means_unsupported("rbac groups")
                    .classify(&USER_ERROR_MAP)
            }) {
            Ok(resp) => resp.value,
            Err(e) if matches!(e.kind(), ErrorKind::FeatureNotAvailable(_)) => {
                debug!("groups are not supported by this server, returning no groups: {}", e);
                return Ok(vec![]);
            }
            Err(e) => return Err(e),
        };

        into_array(resp, "groups")?
            .into_iter()
            .map(Group::from_json)
            .collect()
    }

    pub async fn upsert_group(&self, group: Group, opts: UpsertGroupOptions) -> error::Result<()> {
        require_non_empty("group_name", group.name())?;
        let body = encode_form(&group.upsert_fields()?);
        let params = self.compose(&opts.overrides, &opts);

        debug!("upserting group {}", group.name());
        self.http_request(
            AdminRequest::new(Method::PUT, group_path(group.name()))
                .params(params)
                .form_body(body),
        )
        .await?;

        Ok(())
    }

    pub async fn drop_group(&self, group_name: String, opts: DropGroupOptions) -> error::Result<()> {
        require_non_empty("group_name", &group_name)?;
        let params = self.compose(&opts.overrides, &opts);

        debug!("dropping group {}", group_name);
        self.http_request(AdminRequest::new(Method::DELETE, group_path(&group_name)).params(params))
            .await?;

        Ok(())
    }

    pub async fn change_password(
        &self,
        new_password: String,
        opts: ChangePasswordOptions,
    ) -> error::Result<()> {
        require_non_empty("password", &new_password)?;
        let params = self.compose(&opts.overrides, &opts);

        let mut form = Map::new();
        form.insert("password".to_string(), Value::String(new_password));

        debug!("changing password of the authenticated user");
        self.http_request(
            AdminRequest::new(Method::POST, CHANGE_PASSWORD_PATH)
                .params(params)
                .form_body(encode_form(&form)),
        )
        .await?;

        Ok(())
    }

    async fn http_request(&self, req: AdminRequest) -> error::Result<Value> {
        let resp = self
            .admin
            .http_request(req)
            .await
            .map_err(|e| e.classify(&USER_ERROR_MAP))?;

        Ok(resp.value)
    }
}

fn require_non_empty(arg: &str, value: &str) -> error::Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_argument(arg, "cannot be empty"));
    }

    Ok(())
}

fn into_array(value: Value, what: &str) -> error::Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::decoding_failure(format!(
            "expected {what} to be an array, got {other}"
        ))),
    }
}
