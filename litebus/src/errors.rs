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

pub type Result<T> = std::result::Result<T, BusError>;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("config error {0}")]
    ConfigError(String),

    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("common error {0}")]
    CommonError(#[from] litebus_common::LitebusCommonError),

    #[error("timer error {0}")]
    TimerError(#[from] litebus_timer::TimerError),

    #[error("actor error {0}")]
    ActorError(#[from] litebus_actor::ActorError),

    #[error("http error {0}")]
    HttpError(#[from] litebus_http::HttpError),

    #[error("operation failed {0}")]
    OpFailed(String),
}

pub fn config_error(msg: impl ToString) -> BusError {
    BusError::ConfigError(msg.to_string())
}

pub fn op_failed(msg: impl ToString) -> BusError {
    BusError::OpFailed(msg.to_string())
}
