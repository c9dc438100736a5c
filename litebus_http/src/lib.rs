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

//! litebus_http is the HTTP/1.1 transport of litebus. It serves three purposes at once:
//! a pipelined http client with keep-alive connections, a server that maps requests to
//! actor messages (responses released strictly in request order by per-connection
//! pipeline proxy actors), and the inter-process actor transport - both as the framed
//! TCP kmsg protocol and as its legacy HTTP-kmsg encoding.
//!
//! Sockets are owned by the IO tasks in here; actors refer to connections only through
//! process-unique sequence ids.

/// read chunk size for both client and server sockets
pub const RECV_BUFFER_SIZE: usize = 8192;

/// maximum number of concurrent server connections. Connections accepted beyond the
/// limit have their requests dropped and are closed
pub const MAX_CON_NUM: usize = 10000;

pub mod errors;
pub use errors::{HttpError, Result};

pub mod codes;

mod url;
pub use url::*;

mod types;
pub use types::*;

mod codec;
pub use codec::*;

mod client;
pub use client::*;

mod server;
pub use server::*;

mod http_actor;
pub use http_actor::*;

mod sysmgr;
pub use sysmgr::*;

mod kmsg;
pub use kmsg::*;
