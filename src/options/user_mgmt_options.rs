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

use crate::management::users::user::AuthDomain;
use crate::options::{OptionBlock, ParamValue, RawParams, TIMEOUT_PARAM};
use std::time::Duration;

/// Declares the options block of one operation. Each block carries a
/// timeout plus free-form keyword overrides set through `param`.
macro_rules! timeout_options {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Default, Debug, Clone)]
        #[non_exhaustive]
        pub struct $name {
            pub timeout: Option<Duration>,
            pub(crate) overrides: RawParams,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn timeout(mut self, timeout: Duration) -> Self {
                self.timeout = Some(timeout);
                self
            }

            /// Sets a named call parameter. It takes precedence over the
            /// typed settings of this block; `None` leaves the key unset.
            pub fn param(
                mut self,
                key: impl Into<String>,
                value: impl Into<Option<ParamValue>>,
            ) -> Self {
                self.overrides.insert(key.into(), value.into());
                self
            }
        }

        impl OptionBlock for $name {
            fn params(&self) -> RawParams {
                RawParams::from([(
                    TIMEOUT_PARAM.to_string(),
                    self.timeout.map(ParamValue::Duration),
                )])
            }
        }
    };
}

timeout_options!(GetUserOptions);
timeout_options!(GetAllUsersOptions);
timeout_options!(UpsertUserOptions);
timeout_options!(DropUserOptions);
timeout_options!(GetRolesOptions);
timeout_options!(GetGroupOptions);
timeout_options!(GetAllGroupsOptions);
timeout_options!(UpsertGroupOptions);
timeout_options!(DropGroupOptions);
timeout_options!(
    /// Options for changing the password of the authenticated user.
    ChangePasswordOptions
);

/// Settings shared by every call a [`UserManager`](crate::management::users::user_manager::UserManager)
/// makes.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct UserManagerConfig {
    /// Applied when neither the options block nor a keyword override sets a
    /// timeout. When unset the admin client's own default applies.
    pub default_timeout: Option<Duration>,
    /// Used when a user operation is given no domain.
    pub default_auth_domain: AuthDomain,
}

impl UserManagerConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn default_auth_domain(mut self, domain: AuthDomain) -> Self {
        self.default_auth_domain = domain;
        self
    }
}

impl OptionBlock for UserManagerConfig {
    fn params(&self) -> RawParams {
        RawParams::from([(
            TIMEOUT_PARAM.to_string(),
            self.default_timeout.map(ParamValue::Duration),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::compose;

    fn compose_call(config: &UserManagerConfig, opts: &GetUserOptions) -> crate::options::Params {
        compose(&opts.overrides, [config as &dyn OptionBlock, opts as &dyn OptionBlock])
    }

    #[test]
    fn unset_timeout_is_omitted() {
        let params = compose_call(&UserManagerConfig::new(), &GetUserOptions::new());

        assert!(params.is_empty());
    }

    #[test]
    fn block_timeout_beats_config_default() {
        let config = UserManagerConfig::new().default_timeout(Duration::from_secs(75));

        let params = compose_call(&config, &GetUserOptions::new());
        assert_eq!(
            Some(&ParamValue::Duration(Duration::from_secs(75))),
            params.get(TIMEOUT_PARAM)
        );

        let params = compose_call(
            &config,
            &GetUserOptions::new().timeout(Duration::from_secs(5)),
        );
        assert_eq!(
            Some(&ParamValue::Duration(Duration::from_secs(5))),
            params.get(TIMEOUT_PARAM)
        );
    }

    #[test]
    fn param_overrides_typed_timeout() {
        let opts = GetUserOptions::new()
            .timeout(Duration::from_secs(5))
            .param(TIMEOUT_PARAM, ParamValue::Duration(Duration::from_secs(10)))
            .param("unset", None);

        let params = compose_call(&UserManagerConfig::new(), &opts);

        assert_eq!(
            Some(&ParamValue::Duration(Duration::from_secs(10))),
            params.get(TIMEOUT_PARAM)
        );
        assert!(!params.contains_key("unset"));
        assert_eq!(Some(Duration::from_secs(5)), opts.timeout);
    }
}
