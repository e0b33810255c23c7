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

pub(crate) const SPAN_ATTRIB_OTEL_KIND_CLIENT_VALUE: &str = "client";
pub(crate) const SPAN_ATTRIB_DB_SYSTEM_VALUE: &str = "couchbase";
pub(crate) const SERVICE_VALUE_MANAGEMENT: &str = "management";
