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

//! client-side error codes surfaced through futures. These are errno-aligned where an
//! errno exists so that socket errors can be passed through unchanged.

pub const MEMORY_ALLOCATION_FAILED: i32 = 12;
pub const CONNECTION_MEET_MAXIMUM: i32 = 48;
pub const INVALID_REQUEST: i32 = 53;
pub const CONNECTION_RESET_BY_PEER: i32 = 104;
pub const CANNOT_SEND_AFTER_SHUTDOWN: i32 = 108;
pub const CONNECTION_TIMEOUT: i32 = 110;
pub const CONNECTION_REFUSED: i32 = 111;

pub fn describe(code: i32) -> &'static str {
    match code {
        MEMORY_ALLOCATION_FAILED => "memory allocation failed",
        CONNECTION_MEET_MAXIMUM => "connection limit reached",
        INVALID_REQUEST => "invalid request",
        CONNECTION_RESET_BY_PEER => "connection reset by peer",
        CANNOT_SEND_AFTER_SHUTDOWN => "cannot send after shutdown",
        CONNECTION_TIMEOUT => "connection timed out",
        CONNECTION_REFUSED => "connection refused",
        _ => "unknown error",
    }
}
