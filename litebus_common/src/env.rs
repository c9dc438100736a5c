/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “litebus” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! typed access to the LITEBUS_* environment variables. Malformed values are treated
//! as unset (with a log line) rather than as hard errors - a bad env var should never
//! keep the process from coming up with its configured defaults

use std::env;
use std::time::Duration;
use tracing::warn;

/// max length of the thread label prefix (longer prefixes are truncated)
pub const MAX_THREAD_LABEL_LEN: usize = 12;

pub fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

pub fn env_usize(key: &str) -> Option<usize> {
    env_string(key).and_then(|v| match v.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("ignoring malformed env var {}={}", key, v);
            None
        }
    })
}

pub fn env_u16(key: &str) -> Option<u16> {
    env_string(key).and_then(|v| match v.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("ignoring malformed env var {}={}", key, v);
            None
        }
    })
}

/// env var holding a millisecond count
pub fn env_millis(key: &str) -> Option<Duration> {
    env_usize(key).map(|ms| Duration::from_millis(ms as u64))
}

/// the thread label prefix used for worker threads, truncated to [`MAX_THREAD_LABEL_LEN`]
pub fn thread_label(key: &str, default: &str) -> String {
    let mut label = env_string(key).unwrap_or_else(|| default.to_string());
    if label.len() > MAX_THREAD_LABEL_LEN {
        label.truncate(MAX_THREAD_LABEL_LEN);
    }
    label
}
