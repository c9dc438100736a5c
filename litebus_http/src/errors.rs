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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("parse error {0}")]
    ParseError(String),

    #[error("invalid request {0}")]
    InvalidRequest(String),

    #[error("connection {0} not found")]
    ConnectionNotFound(i32),

    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("actor error {0}")]
    ActorError(#[from] litebus_actor::ActorError),

    #[error("operation failed {0}")]
    OpFailed(String),
}

pub fn parse_error(msg: impl ToString) -> HttpError {
    HttpError::ParseError(msg.to_string())
}

pub fn invalid_request(msg: impl ToString) -> HttpError {
    HttpError::InvalidRequest(msg.to_string())
}

pub fn op_failed(msg: impl ToString) -> HttpError {
    HttpError::OpFailed(msg.to_string())
}
