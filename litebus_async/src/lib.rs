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

//! litebus_async provides the single-assignment asynchronous value of litebus: a
//! [`Promise`]/[`Future`] pair with completion and abandonment callbacks, chaining,
//! delegation ([`Promise::associate`]), blocking and timed waits, deadline rescue
//! ([`Future::after`]) and list aggregation ([`collect`]).
//!
//! A future terminates at most once - the observable transitions are exactly one of
//! OK, error or abandoned, and all of them are permanent. Abandonment is reached when
//! the last producer ([`Promise`]) goes away without having set a value or associated
//! another future.
//!
//! Our [`Future`] also implements [`std::future::Future`] so transport internals can
//! `.await` it from within tokio tasks; the blocking wait entry points are meant for
//! code *outside* the worker pool.

mod status;
pub use status::*;

mod future;
pub use future::*;

mod collect;
pub use collect::*;
