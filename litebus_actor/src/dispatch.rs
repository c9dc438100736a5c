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

//! asynchronous dispatch into actors: run a closure on the target actor's task and
//! observe its result through a future. This is the only bridge between the
//! future/promise layer and actor state - the closure is packed into an AsyncThunk
//! message, so it takes its place in the target's FIFO like any other message.

use crate::{
    actor::{ActorBehavior, ActorContext, AsAnyActor},
    debug, Aid, ActorSystemHandle, Message, Thunk,
};
use litebus_async::{Future, Promise};

/// invoke `f` with the target actor and fulfill the returned future with its result.
/// If the Aid does not resolve to a live actor (or the actor has a different concrete
/// type) the returned future is abandoned - the promise rides inside the thunk and is
/// dropped unfulfilled
pub fn async_call<A, R, F>(hsys: &ActorSystemHandle, aid: &Aid, f: F) -> Future<R>
where
    A: ActorBehavior,
    R: Clone + Send + 'static,
    F: FnOnce(&mut A, &mut ActorContext) -> R + Send + 'static,
{
    let promise = Promise::new();
    let result = promise.future();

    let thunk: Thunk = Box::new(move |behavior, ctx| {
        match behavior.as_any_actor().downcast_mut::<A>() {
            Some(actor) => promise.set_value(f(actor, ctx)),
            None => debug!("async target type mismatch, a={}", ctx.aid().name()),
            // promise dropped on mismatch - the caller sees abandonment
        }
    });

    if let Err(e) = hsys.send(aid, Message::thunk(aid.clone(), thunk)) {
        debug!("async dispatch to {} failed: {}", aid, e);
        // the message (and with it the promise) is gone - the future is abandoned
    }
    result
}

/// like [`async_call`] for members that return a future themselves - the result is
/// associated with it instead of being set directly
pub fn async_call_future<A, R, F>(hsys: &ActorSystemHandle, aid: &Aid, f: F) -> Future<R>
where
    A: ActorBehavior,
    R: Clone + Send + 'static,
    F: FnOnce(&mut A, &mut ActorContext) -> Future<R> + Send + 'static,
{
    let promise = Promise::new();
    let result = promise.future();

    let thunk: Thunk = Box::new(move |behavior, ctx| {
        match behavior.as_any_actor().downcast_mut::<A>() {
            Some(actor) => promise.associate(&f(actor, ctx)),
            None => debug!("async target type mismatch, a={}", ctx.aid().name()),
        }
    });

    if let Err(e) = hsys.send(aid, Message::thunk(aid.clone(), thunk)) {
        debug!("async dispatch to {} failed: {}", aid, e);
    }
    result
}

/// adapt an actor member into a completion callback: the returned closure can be
/// handed to `Future::on_complete` and runs `f` on the target actor's task, with the
/// completed future as argument
pub fn defer<A, T, F>(hsys: &ActorSystemHandle, aid: &Aid, f: F) -> impl FnOnce(&Future<T>) + Send + 'static
where
    A: ActorBehavior,
    T: Clone + Send + 'static,
    F: FnOnce(&mut A, &mut ActorContext, Future<T>) + Send + 'static,
{
    let hsys = hsys.clone();
    let aid = aid.clone();

    move |ft: &Future<T>| {
        let ft = ft.clone();
        let thunk: Thunk = Box::new(move |behavior, ctx| {
            match behavior.as_any_actor().downcast_mut::<A>() {
                Some(actor) => f(actor, ctx, ft),
                None => debug!("defer target type mismatch, a={}", ctx.aid().name()),
            }
        });
        if let Err(e) = hsys.send(&aid, Message::thunk(aid.clone(), thunk)) {
            debug!("deferred dispatch to {} failed: {}", aid, e);
        }
    }
}
