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

use crate::fieldmap::FieldError;
use http::{Method, StatusCode};
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Error {
    kind: Box<ErrorKind>,
    context: Box<Option<HttpErrorContext>>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn context(&self) -> Option<&HttpErrorContext> {
        (*self.context).as_ref()
    }

    /// Builds the generic fault an [`AdminClient`](crate::clients::admin_client::AdminClient)
    /// reports for a non-2xx response.
    pub fn http_failure(
        status_code: StatusCode,
        method: Method,
        path: impl Into<String>,
        error_text: impl Into<Option<String>>,
    ) -> Self {
        Self::new(ErrorKind::HttpFailure).with_context(HttpErrorContext {
            status_code,
            method,
            path: path.into(),
            error_text: error_text.into(),
        })
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    pub fn other_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::OtherFailure(msg.into()))
    }

    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            context: Box::new(None),
        }
    }

    pub(crate) fn invalid_argument(arg: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(InvalidArgumentErrorKind {
            msg: msg.into(),
            arg: Some(arg.into()),
        }))
    }

    pub(crate) fn feature_not_available(feature: impl Into<String>) -> Self {
        Self::new(ErrorKind::FeatureNotAvailable(FeatureNotAvailableErrorKind {
            feature: feature.into(),
        }))
    }

    pub(crate) fn decoding_failure(msg: impl Display) -> Self {
        Self::new(ErrorKind::DecodingFailure(format!("decoding failed: {msg}")))
    }

    pub(crate) fn with_context(mut self, context: HttpErrorContext) -> Self {
        self.context = Box::new(Some(context));
        self
    }

    /// Remaps a generic HTTP fault to a more specific kind by looking for a
    /// known substring in the response text. Any other error is returned
    /// untouched.
    pub(crate) fn classify(self, table: &[(&str, ErrorKind)]) -> Self {
        if *self.kind != ErrorKind::HttpFailure {
            return self;
        }

        let text = match self.context().and_then(|ctx| ctx.error_text.as_deref()) {
            Some(text) => text,
            None => return self,
        };

        match table.iter().find(|(needle, _)| text.contains(needle)) {
            Some((_, kind)) => Self {
                kind: Box::new(kind.clone()),
                context: self.context,
            },
            None => self,
        }
    }

    /// Converts a 404 answer into [`ErrorKind::FeatureNotAvailable`]; the
    /// endpoint does not exist on the target server.
    pub(crate) fn not_found_means_unsupported(self, feature: &str) -> Self {
        let is_404 = *self.kind == ErrorKind::HttpFailure
            && self
                .context()
                .map(|ctx| ctx.status_code == StatusCode::NOT_FOUND)
                .unwrap_or_default();

        if is_404 {
            let context = self.context;
            let mut err = Self::feature_not_available(feature);
            err.context = context;
            return err;
        }

        self
    }
}

/// Response-text substrings mapped to the fault kinds of the user
/// management endpoints. Checked in order.
pub(crate) const USER_ERROR_MAP: [(&str, ErrorKind); 2] = [
    ("Unknown group", ErrorKind::GroupNotFound),
    ("Unknown user", ErrorKind::UserNotFound),
];

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(ctx) = self.context() {
            write!(f, "{}, {}", self.kind, ctx)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl StdError for Error {}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Self::decoding_failure(err)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    OtherFailure(String),
    Timeout,
    HttpFailure,
    InvalidArgument(InvalidArgumentErrorKind),
    FeatureNotAvailable(FeatureNotAvailableErrorKind),
    DecodingFailure(String),
    UserNotFound,
    GroupNotFound,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ErrorKind::OtherFailure(msg) => {
                return write!(f, "{msg}");
            }
            ErrorKind::InvalidArgument(e) => {
                return write!(f, "{e}");
            }
            ErrorKind::FeatureNotAvailable(e) => {
                return write!(f, "{e}");
            }
            ErrorKind::DecodingFailure(msg) => {
                return write!(f, "{msg}");
            }
            ErrorKind::Timeout => "operation timed out",
            ErrorKind::HttpFailure => "http request failed",
            ErrorKind::UserNotFound => "user not found",
            ErrorKind::GroupNotFound => "group not found",
        };

        write!(f, "{msg}")
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub struct InvalidArgumentErrorKind {
    pub msg: String,
    pub arg: Option<String>,
}

impl Display for InvalidArgumentErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(arg) = &self.arg {
            write!(f, "invalid argument: {}: {}", arg, self.msg)
        } else {
            write!(f, "invalid argument: {}", self.msg)
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub struct FeatureNotAvailableErrorKind {
    pub feature: String,
}

impl Display for FeatureNotAvailableErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "feature not available: {}", self.feature)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HttpErrorContext {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub error_text: Option<String>,
}

impl Display for HttpErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "method: {}, path: {}, status code: {}",
            self.method, self.path, self.status_code
        )?;

        if let Some(text) = &self.error_text {
            write!(f, ", error text: {text}")?;
        }

        Ok(())
    }
}
