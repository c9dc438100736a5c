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
#![allow(unused)]

//! common utility modules shared by the litebus crates. Nothing in here knows about
//! actors, futures or transports - this is the bottom of the dependency order.

pub mod collections;
pub mod net;
pub mod env;
pub mod sensitive;
pub mod process;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LitebusCommonError {
    #[error("parse error {0}")]
    ParseError(String),

    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("operation failed {0}")]
    OpFailed(String),
}

pub type Result<T> = std::result::Result<T, LitebusCommonError>;

pub fn parse_error(msg: impl ToString) -> LitebusCommonError {
    LitebusCommonError::ParseError(msg.to_string())
}
