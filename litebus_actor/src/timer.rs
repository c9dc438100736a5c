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

//! actor-targeted timers. The timer service itself only runs bare closures; here we
//! wrap the callable into an AsyncThunk message so it executes on the target actor's
//! task. A fired timer whose target already went away is logged and dropped - the
//! callable must not rely on the actor still existing.

use crate::{
    actor::{ActorBehavior, ActorContext},
    debug,
    errors::Result,
    Aid, ActorSystemHandle, Message, Thunk,
};
use litebus_timer::Timer;
use std::time::Duration;

/// deliver `f` to the actor `aid` after `delay`. Returns the timer handle for
/// advisory cancellation
pub fn add_timer<F>(hsys: &ActorSystemHandle, delay: Duration, aid: &Aid, f: F) -> Result<Timer>
where
    F: FnOnce(&mut dyn ActorBehavior, &mut ActorContext) + Send + 'static,
{
    let hsys2 = hsys.clone();
    let aid = aid.clone();

    let timer = hsys.timer().schedule(delay, move || {
        let thunk: Thunk = Box::new(f);
        if let Err(e) = hsys2.send(&aid, Message::thunk(aid.clone(), thunk)) {
            debug!("timer target {} is gone: {}", aid, e);
        }
    })?;
    Ok(timer)
}

/// advisory: false once the timer fired, in which case the callable runs (or ran).
/// Cancellation after dispatch but before the actor processes the thunk is impossible
pub fn cancel_timer(hsys: &ActorSystemHandle, timer: &Timer) -> bool {
    hsys.timer().cancel(timer)
}
