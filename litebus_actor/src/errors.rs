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

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActorError>;

#[derive(Error, Debug)]
pub enum ActorError {
    #[error("actor name already spawned: {0}")]
    DuplicateActor(String),

    #[error("no such local actor: {0}")]
    ActorNotFound(String),

    #[error("no transport registered for protocol: {0}")]
    IoNotFound(String),

    #[error("invalid parameter: {0}")]
    ParamInvalid(String),

    #[error("receiver closed")]
    ReceiverClosed,

    #[error("receiver queue full")]
    ReceiverFull,

    #[error("timeout error: {0:?}")]
    Timeout(Duration),

    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("timer error {0}")]
    TimerError(#[from] litebus_timer::TimerError),

    #[error("poisoned lock error {0}")]
    PoisonedLockError(String),

    // a generic error
    #[error("operation failed {0}")]
    OpFailed(String),
}

pub fn op_failed(msg: impl ToString) -> ActorError {
    ActorError::OpFailed(msg.to_string())
}

pub fn param_invalid(msg: impl ToString) -> ActorError {
    ActorError::ParamInvalid(msg.to_string())
}

pub fn poisoned_lock(op: impl ToString) -> ActorError {
    ActorError::PoisonedLockError(op.to_string())
}
