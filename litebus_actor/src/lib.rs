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

//! litebus_actor is the actor runtime of litebus: named, single-consumer actors whose
//! mailboxes are drained on a shared worker pool (the tokio multi-thread runtime), with
//! per-message-name handler dispatch, runnable gating, clean termination and an
//! asynchronous dispatch primitive ([`async_call`]/[`defer`]) that bridges into the
//! future/promise layer.
//!
//! The only addressing scheme is the [`Aid`]: local actors are reached by name, remote
//! actors through a registered [`Transport`] for the protocol carried in the Aid.

use std::time::Duration;

pub mod errors;
pub use errors::{op_failed, param_invalid, poisoned_lock, ActorError, Result};

mod aid;
pub use aid::*;

mod message;
pub use message::*;

mod actor;
pub use actor::*;

mod system;
pub use system::*;

mod dispatch;
pub use dispatch::*;

mod timer;
pub use timer::*;

/// number of recently dequeued message names kept per actor for diagnostic dumps.
/// Should be at least greater than 1
pub const MAX_ACTOR_RECORD_SIZE: usize = 3;

#[inline] pub fn days (n: u64)->Duration { Duration::from_secs(n*60*60*24) }
#[inline] pub fn hours (n: u64)->Duration { Duration::from_secs(n*60*60) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n*60) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn micros (n: u64)->Duration { Duration::from_micros(n) }

/*
 * we intercept logging/tracing macros here to have a central place where we can remove/replace them
 */

#[macro_export]
macro_rules! trace {
    ( $( $id:ident = $e:expr ),* ) => { tracing::trace!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::trace!( $( $e ),* ) }
}

#[macro_export]
macro_rules! debug {
    ( $( $id:ident = $e:expr ),* ) => { tracing::debug!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::debug!( $( $e ),* ) }
}

#[macro_export]
macro_rules! info {
    ( $( $id:ident = $e:expr ),* ) => { tracing::info!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::info!( $( $e ),* ) }
}

#[macro_export]
macro_rules! warn {
    ( $( $id:ident = $e:expr ),* ) => { tracing::warn!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::warn!( $( $e ),* ) }
}

#[macro_export]
macro_rules! error {
    ( $( $id:ident = $e:expr ),* ) => { tracing::error!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::error!( $( $e ),* ) }
}
