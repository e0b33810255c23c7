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

use log::LevelFilter;
use std::env;
use std::io::Write;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn setup_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}:{} [{}] - {}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.level(),
                    record.args()
                )
            })
            .filter_level(
                env::var("RUST_LOG")
                    .unwrap_or("TRACE".to_string())
                    .parse()
                    .unwrap_or(LevelFilter::Trace),
            )
            .is_test(true)
            .try_init();
    });
}
