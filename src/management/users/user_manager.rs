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

use crate::clients::admin_client::AdminClient;
use crate::clients::user_mgmt_client::UserMgmtClient;
use crate::error;
use crate::management::users::user::{
    AuthDomain, Group, RoleAndDescription, User, UserAndMetadata,
};
use crate::options::user_mgmt_options::{
    ChangePasswordOptions, DropGroupOptions, DropUserOptions, GetAllGroupsOptions,
    GetAllUsersOptions, GetGroupOptions, GetRolesOptions, GetUserOptions, UpsertGroupOptions,
    UpsertUserOptions, UserManagerConfig,
};
use crate::tracing::{
    SERVICE_VALUE_MANAGEMENT, SPAN_ATTRIB_DB_SYSTEM_VALUE, SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
};
use std::sync::Arc;
use tracing::{instrument, Level};

/// Manages the users, groups and roles of a cluster.
///
/// Operations that take a `domain` fall back to
/// [`UserManagerConfig::default_auth_domain`] when given `None`.
#[derive(Clone)]
pub struct UserManager {
    client: Arc<UserMgmtClient>,
}

impl UserManager {
    pub fn new(admin: Arc<dyn AdminClient>, config: UserManagerConfig) -> Self {
        Self {
            client: Arc::new(UserMgmtClient::new(admin, config)),
        }
    }

    pub async fn get_all_users(
        &self,
        domain: impl Into<Option<AuthDomain>>,
        opts: impl Into<Option<GetAllUsersOptions>>,
    ) -> error::Result<Vec<UserAndMetadata>> {
        self.get_all_users_internal(domain.into(), opts).await
    }

    pub async fn get_user(
        &self,
        username: impl Into<String>,
        domain: impl Into<Option<AuthDomain>>,
        opts: impl Into<Option<GetUserOptions>>,
    ) -> error::Result<UserAndMetadata> {
        self.get_user_internal(username, domain.into(), opts).await
    }

    /// Creates or replaces a user. The password is only sent when one was set
    /// on `settings`; otherwise an existing user keeps its password.
    pub async fn upsert_user(
        &self,
        settings: User,
        domain: impl Into<Option<AuthDomain>>,
        opts: impl Into<Option<UpsertUserOptions>>,
    ) -> error::Result<()> {
        self.upsert_user_internal(settings, domain.into(), opts)
            .await
    }

    pub async fn drop_user(
        &self,
        username: impl Into<String>,
        domain: impl Into<Option<AuthDomain>>,
        opts: impl Into<Option<DropUserOptions>>,
    ) -> error::Result<()> {
        self.drop_user_internal(username, domain.into(), opts).await
    }

    pub async fn get_roles(
        &self,
        opts: impl Into<Option<GetRolesOptions>>,
    ) -> error::Result<Vec<RoleAndDescription>> {
        self.get_roles_internal(opts).await
    }

    pub async fn get_group(
        &self,
        group_name: impl Into<String>,
        opts: impl Into<Option<GetGroupOptions>>,
    ) -> error::Result<Group> {
        self.get_group_internal(group_name, opts).await
    }

    /// Lists all groups. Servers without group support yield an empty list.
    pub async fn get_all_groups(
        &self,
        opts: impl Into<Option<GetAllGroupsOptions>>,
    ) -> error::Result<Vec<Group>> {
        self.get_all_groups_internal(opts).await
    }

    pub async fn upsert_group(
        &self,
        group: Group,
        opts: impl Into<Option<UpsertGroupOptions>>,
    ) -> error::Result<()> {
        self.upsert_group_internal(group, opts).await
    }

    pub async fn drop_group(
        &self,
        group_name: impl Into<String>,
        opts: impl Into<Option<DropGroupOptions>>,
    ) -> error::Result<()> {
        self.drop_group_internal(group_name, opts).await
    }

    /// Changes the password of the user the admin client authenticates as.
    pub async fn change_password(
        &self,
        password: impl Into<String>,
        opts: impl Into<Option<ChangePasswordOptions>>,
    ) -> error::Result<()> {
        self.change_password_internal(password, opts).await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_get_all_users",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_get_all_users",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn get_all_users_internal(
        &self,
        domain: Option<AuthDomain>,
        opts: impl Into<Option<GetAllUsersOptions>>,
    ) -> error::Result<Vec<UserAndMetadata>> {
        self.client
            .get_all_users(domain, opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_get_user",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_get_user",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn get_user_internal(
        &self,
        username: impl Into<String>,
        domain: Option<AuthDomain>,
        opts: impl Into<Option<GetUserOptions>>,
    ) -> error::Result<UserAndMetadata> {
        self.client
            .get_user(username.into(), domain, opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_upsert_user",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_upsert_user",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn upsert_user_internal(
        &self,
        settings: User,
        domain: Option<AuthDomain>,
        opts: impl Into<Option<UpsertUserOptions>>,
    ) -> error::Result<()> {
        self.client
            .upsert_user(settings, domain, opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_drop_user",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_drop_user",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn drop_user_internal(
        &self,
        username: impl Into<String>,
        domain: Option<AuthDomain>,
        opts: impl Into<Option<DropUserOptions>>,
    ) -> error::Result<()> {
        self.client
            .drop_user(username.into(), domain, opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_get_roles",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_get_roles",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn get_roles_internal(
        &self,
        opts: impl Into<Option<GetRolesOptions>>,
    ) -> error::Result<Vec<RoleAndDescription>> {
        self.client
            .get_roles(opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_get_group",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_get_group",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn get_group_internal(
        &self,
        group_name: impl Into<String>,
        opts: impl Into<Option<GetGroupOptions>>,
    ) -> error::Result<Group> {
        self.client
            .get_group(group_name.into(), opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_get_all_groups",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_get_all_groups",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn get_all_groups_internal(
        &self,
        opts: impl Into<Option<GetAllGroupsOptions>>,
    ) -> error::Result<Vec<Group>> {
        self.client
            .get_all_groups(opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_upsert_group",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_upsert_group",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn upsert_group_internal(
        &self,
        group: Group,
        opts: impl Into<Option<UpsertGroupOptions>>,
    ) -> error::Result<()> {
        self.client
            .upsert_group(group, opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_drop_group",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_drop_group",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn drop_group_internal(
        &self,
        group_name: impl Into<String>,
        opts: impl Into<Option<DropGroupOptions>>,
    ) -> error::Result<()> {
        self.client
            .drop_group(group_name.into(), opts.into().unwrap_or_default())
            .await
    }

    #[instrument(
        skip_all,
        level = Level::TRACE,
        name = "manager_users_change_password",
        fields(
        otel.kind = SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE,
        db.operation.name = "manager_users_change_password",
        db.system.name = SPAN_ATTRIB_DB_SYSTEM_VALUE,
        couchbase.service = SERVICE_VALUE_MANAGEMENT,
        couchbase.retries = 0,
        ))]
    async fn change_password_internal(
        &self,
        password: impl Into<String>,
        opts: impl Into<Option<ChangePasswordOptions>>,
    ) -> error::Result<()> {
        self.client
            .change_password(password.into(), opts.into().unwrap_or_default())
            .await
    }
}
