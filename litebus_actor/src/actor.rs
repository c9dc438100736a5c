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

use crate::{
    errors::Result, error, info, warn, Aid, ActorSystemHandle, Message, MAX_ACTOR_RECORD_SIZE,
};
use litebus_common::{collections::RingBuffer, process};
use litebus_timer::Timer;
use std::{any::Any, collections::HashMap, time::Duration};

/// helper supertrait so that thunks and handlers can downcast a `dyn ActorBehavior`
/// back to the concrete actor type they were created for
pub trait AsAnyActor {
    fn as_any_actor(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AsAnyActor for T {
    fn as_any_actor(&mut self) -> &mut dyn Any {
        self
    }
}

/// the behavior of a named actor. All methods run on the actor's own task - no two of
/// them execute concurrently for the same actor, and they must not block (compose with
/// futures instead). Handlers must not panic; a panicking handler aborts the process
/// after dumping the recent message names
pub trait ActorBehavior: AsAnyActor + Send + 'static {
    /// the actor name this behavior is spawned under
    fn name(&self) -> String;

    /// called on the actor task before the first message is processed. This is where
    /// KMSG handlers are registered via [`ActorContext::receive`]
    fn init(&mut self, ctx: &mut ActorContext) {}

    /// called when the Terminate message is processed, before the actor is dropped
    fn finalize(&mut self, ctx: &mut ActorContext) {}

    /// HTTP message handler
    fn handle_http(&mut self, ctx: &mut ActorContext, msg: Message) {
        error!("actor handle_http() is not implemented, a={}", ctx.aid().name());
    }

    /// local message handler
    fn handle_local(&mut self, ctx: &mut ActorContext, msg: Message) {
        error!("actor handle_local() is not implemented, a={}", ctx.aid().name());
    }

    /// a peer link went away
    fn exited(&mut self, ctx: &mut ActorContext, peer: &Aid) {
        error!("actor exited() is not implemented, a={}", ctx.aid().name());
    }

    /// return true to drop the wire message before handler dispatch
    fn filter(&self, msg: &Message) -> bool {
        false
    }
}

pub(crate) type HandlerFn = Box<dyn FnMut(&mut dyn ActorBehavior, &mut ActorContext, Message) + Send>;

/// per-actor runtime context handed to every behavior callback. Owns the name→handler
/// table and the diagnostic record of recently dequeued message names
pub struct ActorContext {
    aid: Aid,
    hsys: ActorSystemHandle,
    pub(crate) handlers: HashMap<String, HandlerFn>,
    pub(crate) records: RingBuffer<String>,
}

impl ActorContext {
    pub(crate) fn new(aid: Aid, hsys: ActorSystemHandle) -> Self {
        ActorContext {
            aid,
            hsys,
            handlers: HashMap::new(),
            records: RingBuffer::new(MAX_ACTOR_RECORD_SIZE),
        }
    }

    pub fn aid(&self) -> &Aid {
        &self.aid
    }

    pub fn hsys(&self) -> &ActorSystemHandle {
        &self.hsys
    }

    /// register a handler for wire messages with the given name. Registering the same
    /// name twice for one actor is a configuration error and fatal
    pub fn receive<A, F>(&mut self, msg_name: impl ToString, f: F)
    where
        A: ActorBehavior,
        F: Fn(&mut A, &mut ActorContext, Message) + Send + 'static,
    {
        let msg_name = msg_name.to_string();
        if self.handlers.contains_key(&msg_name) {
            error!("actor handler name conflicts, a={},f={}", self.aid.name(), msg_name);
            process::fatal_abort();
        }

        let wrapped: HandlerFn = Box::new(move |behavior, ctx, msg| {
            match behavior.as_any_actor().downcast_mut::<A>() {
                Some(actor) => f(actor, ctx, msg),
                None => error!("handler downcast failed, a={},m={}", ctx.aid().name(), msg.name),
            }
        });
        self.handlers.insert(msg_name, wrapped);
    }

    /// send a wire message on behalf of this actor (the from field is our own Aid)
    pub fn send(&self, to: &Aid, msg_name: impl ToString, body: Vec<u8>) -> Result<()> {
        self.hsys.send(to, Message::kmsg(self.aid.clone(), to.clone(), msg_name, body))
    }

    pub fn send_msg(&self, to: &Aid, mut msg: Message) -> Result<()> {
        msg.from = self.aid.clone();
        self.hsys.send(to, msg)
    }

    /// enqueue our own Terminate message - it is observed after everything already queued
    pub fn terminate_self(&self) -> Result<()> {
        self.hsys.terminate(&self.aid)
    }

    /// watch a remote peer - we receive an Exit message (dispatched to
    /// [`ActorBehavior::exited`]) when the link to it goes away
    pub fn link(&self, to: &Aid) -> Result<()> {
        self.hsys.link(&self.aid, to)
    }

    pub fn unlink(&self, to: &Aid) -> Result<()> {
        self.hsys.unlink(&self.aid, to)
    }

    /// start a timer that delivers `f` to this actor after `delay`
    pub fn add_timer<F>(&self, delay: Duration, f: F) -> Result<Timer>
    where
        F: FnOnce(&mut dyn ActorBehavior, &mut ActorContext) + Send + 'static,
    {
        crate::add_timer(&self.hsys, delay, &self.aid, f)
    }

    pub fn cancel_timer(&self, timer: &Timer) -> bool {
        self.hsys.timer().cancel(timer)
    }

    pub(crate) fn record_msg(&mut self, msg_name: &str) {
        self.records.push(msg_name.to_string());
    }

    /// diagnostic dump of the most recently dequeued message names, newest first
    pub(crate) fn dump_records(&self) {
        for name in self.records.iter_newest_first() {
            info!("actor message dump, actor:{},msg:{}", self.aid.name(), name);
        }
    }

    /// dispatch a wire message to its registered handler
    pub(crate) fn dispatch_named(&mut self, behavior: &mut Box<dyn ActorBehavior>, msg: Message) {
        let msg_name = msg.name.clone();
        // the handler is temporarily taken out of the table so it can receive &mut self
        if let Some(mut handler) = self.handlers.remove(&msg_name) {
            handler(behavior.as_mut(), self, msg);
            self.handlers.entry(msg_name).or_insert(handler);
        } else {
            warn!("actor can not find function for message, a={},m={}", self.aid.name(), msg_name);
        }
    }
}
