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

use async_trait::async_trait;
use couchbase_rbac::clients::admin_client::{AdminClient, AdminRequest, AdminResponse};
use couchbase_rbac::error;
use couchbase_rbac::error::Error;
use http::{Method, StatusCode};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// An admin client that records every request and answers from a queue of
/// scripted replies. An empty queue answers with an empty 200.
#[derive(Default)]
pub struct MockAdminClient {
    requests: Mutex<Vec<AdminRequest>>,
    replies: Mutex<VecDeque<Reply>>,
}

enum Reply {
    Value(Value),
    Status(StatusCode, String),
    Fault(Error),
}

impl MockAdminClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, value: Value) {
        self.replies.lock().unwrap().push_back(Reply::Value(value));
    }

    pub fn respond_status(&self, status: StatusCode, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Status(status, text.into()));
    }

    pub fn fail(&self, err: Error) {
        self.replies.lock().unwrap().push_back(Reply::Fault(err));
    }

    pub fn requests(&self) -> Vec<AdminRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> AdminRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl AdminClient for MockAdminClient {
    async fn http_request(&self, req: AdminRequest) -> error::Result<AdminResponse> {
        let method = req.method.clone();
        let path = req.path.clone();
        self.requests.lock().unwrap().push(req);

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(AdminResponse::empty()),
            Some(Reply::Value(value)) => Ok(AdminResponse::new(value)),
            Some(Reply::Status(status, text)) => {
                Err(Error::http_failure(status, method, path, text))
            }
            Some(Reply::Fault(err)) => Err(err),
        }
    }
}

/// Decodes a form-encoded request body into its fields.
pub fn form_fields(req: &AdminRequest) -> BTreeMap<String, String> {
    let body = req.body.as_ref().expect("request has no body");

    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn form_text(req: &AdminRequest) -> String {
    let body = req.body.as_ref().expect("request has no body");

    String::from_utf8(body.to_vec()).unwrap()
}

pub fn assert_request(req: &AdminRequest, method: Method, path: &str) {
    assert_eq!(method, req.method);
    assert_eq!(path, req.path);
}
