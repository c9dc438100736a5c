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
    actor::{ActorBehavior, ActorContext},
    debug, error,
    errors::{op_failed, param_invalid, ActorError, Result},
    info, warn, Aid, Message, MessageKind,
};
use dashmap::DashMap;
use kanal::{AsyncReceiver, AsyncSender};
use litebus_common::process;
use litebus_timer::TimerService;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};
use tokio::sync::{watch, Notify};

/// the advertise endpoint attached to outgoing Aids of one transport protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusAddress {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl BusAddress {
    pub fn new(protocol: impl ToString, host: impl ToString, port: u16) -> Self {
        BusAddress { protocol: protocol.to_string(), host: host.to_string(), port }
    }

    pub fn aid_for(&self, name: &str) -> Aid {
        Aid::with_address(name, &self.protocol, &self.host, self.port)
    }
}

/// transport abstraction for remote sends. Implementations own their sockets and are
/// registered per protocol; `send` is an enqueue, delivery is best-effort
pub trait Transport: Send + Sync + 'static {
    fn send(&self, msg: Message) -> Result<()>;

    /// register interest in peer lifetime - the transport delivers an Exit message to
    /// `who` when the link to `to` goes away
    fn link(&self, who: &Aid, to: &Aid) -> Result<()> {
        Ok(())
    }

    fn unlink(&self, who: &Aid, to: &Aid) -> Result<()> {
        Ok(())
    }
}

/// gate released once an actor has processed Terminate and ran its finalizer.
/// Supports both blocking waiters (condvar) and async waiters (notify)
pub(crate) struct TermGate {
    done: Mutex<bool>,
    cvar: Condvar,
    notify: Notify,
}

impl TermGate {
    fn new() -> Self {
        TermGate { done: Mutex::new(false), cvar: Condvar::new(), notify: Notify::new() }
    }

    pub(crate) fn signal(&self) {
        *self.done.lock().unwrap() = true;
        self.cvar.notify_all();
        self.notify.notify_waiters();
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if *self.done.lock().unwrap() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn wait_blocking(&self) {
        let mut done = self.done.lock().unwrap();
        while !*done {
            done = self.cvar.wait(done).unwrap();
        }
    }
}

struct ActorEntry {
    aid: Aid,
    tx: AsyncSender<Message>,
    running_tx: watch::Sender<bool>,
    gate: Arc<TermGate>,
}

struct ActorSystemInner {
    id: String,
    addresses: DashMap<String, BusAddress>, // protocol → advertise endpoint
    actors: DashMap<String, ActorEntry>,
    transports: DashMap<String, Arc<dyn Transport>>,
    delegate: Mutex<String>,
    timer: Arc<TimerService>,
}

/// cloneable handle to the actor system. This is what gets captured by transports,
/// timers and async dispatch - there is no hidden global
#[derive(Clone)]
pub struct ActorSystemHandle {
    inner: Arc<ActorSystemInner>,
}

/// the owning side of the actor system. Everything of substance lives in the shared
/// inner state; the owner only adds lifecycle entry points
pub struct ActorSystem {
    handle: ActorSystemHandle,
}

impl ActorSystem {
    pub fn new(id: impl ToString, timer: Arc<TimerService>) -> Self {
        debug!("actor system '{}' created", id.to_string());
        ActorSystem {
            handle: ActorSystemHandle {
                inner: Arc::new(ActorSystemInner {
                    id: id.to_string(),
                    addresses: DashMap::new(),
                    actors: DashMap::new(),
                    transports: DashMap::new(),
                    delegate: Mutex::new(String::new()),
                    timer,
                }),
            },
        }
    }

    /// convenience constructor that initializes tracing from the environment first
    pub fn with_env_tracing(id: impl ToString, timer: Arc<TimerService>) -> Self {
        let _ = tracing_subscriber::fmt::try_init();
        Self::new(id, timer)
    }

    pub fn handle(&self) -> &ActorSystemHandle {
        &self.handle
    }

    pub fn clone_handle(&self) -> ActorSystemHandle {
        self.handle.clone()
    }

    /// send Terminate to all live actors and wait until they are gone
    pub async fn terminate_and_wait(&self) -> Result<()> {
        self.handle.terminate_all().await
    }

    /// set a ctrl-c signal handler that terminates all actors instead of just bluntly
    /// exiting the process. To be used if actors need to shut down gracefully
    pub fn terminate_on_ctrlc(&self) {
        let hsys = self.clone_handle();
        process::set_ctrlc_handler(move || {
            for entry in hsys.inner.actors.iter() {
                let _ = entry.tx.try_send(Message::terminate(entry.aid.clone()));
            }
        });
    }
}

impl ActorSystemHandle {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn timer(&self) -> &Arc<TimerService> {
        &self.inner.timer
    }

    /// the advertise endpoint for a protocol (attached to Aids of spawned actors)
    pub fn set_address(&self, address: BusAddress) {
        self.inner.addresses.insert(address.protocol.clone(), address);
    }

    pub fn address(&self, protocol: &str) -> Option<BusAddress> {
        self.inner.addresses.get(protocol).map(|a| a.clone())
    }

    pub fn register_transport(&self, protocol: impl ToString, transport: Arc<dyn Transport>) {
        self.inner.transports.insert(protocol.to_string(), transport);
    }

    pub fn set_delegate(&self, name: impl ToString) {
        *self.inner.delegate.lock().unwrap() = name.to_string();
    }

    pub fn delegate(&self) -> String {
        self.inner.delegate.lock().unwrap().clone()
    }

    pub fn has_actor(&self, name: &str) -> bool {
        self.inner.actors.contains_key(name)
    }

    /// register and start an actor. With `shared_thread` its mailbox is drained on the
    /// shared worker pool, otherwise on a private OS thread. With `start=false` the
    /// actor enqueues but does not dispatch until [`set_actor_status`] enables it
    pub fn spawn<B>(&self, behavior: B, shared_thread: bool, start: bool) -> Result<Aid>
    where
        B: ActorBehavior,
    {
        self.spawn_dyn(Box::new(behavior), shared_thread, start)
    }

    pub fn spawn_dyn(&self, behavior: Box<dyn ActorBehavior>, shared_thread: bool, start: bool) -> Result<Aid> {
        let name = behavior.name();
        if name.is_empty() {
            return Err(param_invalid("empty actor name"));
        }

        let aid = match self.address(crate::BUS_TCP) {
            Some(addr) => addr.aid_for(&name),
            None => Aid::new(&name),
        };

        let (tx, rx) = kanal::unbounded_async::<Message>();
        let (running_tx, running_rx) = watch::channel(start);
        let gate = Arc::new(TermGate::new());

        match self.inner.actors.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                warn!("duplicate actor name: {}", name);
                return Err(ActorError::DuplicateActor(name));
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(ActorEntry { aid: aid.clone(), tx, running_tx, gate: gate.clone() });
            }
        }

        let ctx = ActorContext::new(aid.clone(), self.clone());

        if shared_thread {
            tokio::spawn(run_actor(behavior, rx, running_rx, ctx, gate));
        } else {
            let thread_name = format!("actor-{}", aid.name());
            let res = std::thread::Builder::new().name(thread_name).spawn(move || {
                match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt.block_on(run_actor(behavior, rx, running_rx, ctx, gate)),
                    Err(e) => error!("cannot build actor thread runtime: {}", e),
                }
            });
            if let Err(e) = res {
                self.inner.actors.remove(&name);
                return Err(op_failed(format!("cannot spawn actor thread: {e}")));
            }
        }

        debug!("actor '{}' spawned", aid);
        Ok(aid)
    }

    fn is_local(&self, to: &Aid) -> bool {
        if !to.is_ok() {
            return true;
        }
        match self.address(to.protocol()) {
            Some(addr) => addr.host == to.host() && addr.port == to.port(),
            None => false,
        }
    }

    /// route a message: local recipients get it appended to their mailbox, remote ones
    /// are handed to the transport registered for their protocol
    pub fn send(&self, to: &Aid, msg: Message) -> Result<()> {
        if to.name().is_empty() {
            return Err(param_invalid("message without recipient name"));
        }

        if self.is_local(to) {
            match self.inner.actors.get(to.name()) {
                Some(entry) => match entry.tx.try_send(msg) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(ActorError::ReceiverFull),
                    Err(_) => Err(ActorError::ReceiverClosed),
                },
                None => Err(ActorError::ActorNotFound(to.name().to_string())),
            }
        } else {
            match self.inner.transports.get(to.protocol()) {
                Some(transport) => transport.send(msg),
                None => Err(ActorError::IoNotFound(to.protocol().to_string())),
            }
        }
    }

    /// enqueue the Terminate message - it is not reordered past queued messages.
    /// Termination overrides a closed runnable gate, otherwise a paused actor could
    /// never drain
    pub fn terminate(&self, aid: &Aid) -> Result<()> {
        match self.inner.actors.get(aid.name()) {
            Some(entry) => {
                let _ = entry.tx.try_send(Message::terminate(aid.clone()));
                let _ = entry.running_tx.send(true);
                Ok(())
            }
            None => Err(ActorError::ActorNotFound(aid.name().to_string())),
        }
    }

    /// toggle whether the actor's mailbox is considered for dispatch. While false,
    /// enqueues continue but nothing is processed
    pub fn set_actor_status(&self, aid: &Aid, running: bool) -> Result<()> {
        match self.inner.actors.get(aid.name()) {
            Some(entry) => {
                let _ = entry.running_tx.send(running);
                Ok(())
            }
            None => Err(ActorError::ActorNotFound(aid.name().to_string())),
        }
    }

    /// wait until the actor has drained to Terminate and its finalizer ran. Returns
    /// immediately if the actor is already gone
    pub async fn await_actor(&self, aid: &Aid) {
        let gate = match self.inner.actors.get(aid.name()) {
            Some(entry) => entry.gate.clone(),
            None => return,
        };
        gate.wait().await;
    }

    /// blocking variant of [`await_actor`] for callers outside the worker pool
    pub fn await_actor_blocking(&self, aid: &Aid) {
        let gate = match self.inner.actors.get(aid.name()) {
            Some(entry) => entry.gate.clone(),
            None => return,
        };
        gate.wait_blocking();
    }

    /// register interest in a remote peer's lifetime: `who` receives an Exit message
    /// when the link to `to` goes away
    pub fn link(&self, who: &Aid, to: &Aid) -> Result<()> {
        if !to.is_ok() {
            return Err(param_invalid(format!("cannot link to addressless aid {to}")));
        }
        match self.inner.transports.get(to.protocol()) {
            Some(transport) => transport.link(who, to),
            None => Err(ActorError::IoNotFound(to.protocol().to_string())),
        }
    }

    pub fn unlink(&self, who: &Aid, to: &Aid) -> Result<()> {
        if !to.is_ok() {
            return Err(param_invalid(format!("cannot unlink addressless aid {to}")));
        }
        match self.inner.transports.get(to.protocol()) {
            Some(transport) => transport.unlink(who, to),
            None => Err(ActorError::IoNotFound(to.protocol().to_string())),
        }
    }

    /// terminate all actors and wait for them to finish
    pub async fn terminate_all(&self) -> Result<()> {
        let gates: Vec<(Aid, Arc<TermGate>)> = self
            .inner
            .actors
            .iter()
            .map(|e| (e.aid.clone(), e.gate.clone()))
            .collect();

        for (aid, _) in &gates {
            let _ = self.terminate(aid);
        }
        for (_, gate) in gates {
            gate.wait().await;
        }
        Ok(())
    }

    pub(crate) fn remove_actor(&self, name: &str) {
        self.inner.actors.remove(name);
    }
}

/// the per-actor dispatch loop. Exactly one instance runs per live actor, which is
/// what establishes the single-consumer FIFO guarantee
async fn run_actor(
    mut behavior: Box<dyn ActorBehavior>,
    rx: AsyncReceiver<Message>,
    mut running_rx: watch::Receiver<bool>,
    mut ctx: ActorContext,
    gate: Arc<TermGate>,
) {
    debug!("actor '{}' running", ctx.aid());

    behavior.init(&mut ctx);

    loop {
        // runnable gating: enqueues continue while dispatch is held
        while !*running_rx.borrow() {
            if running_rx.changed().await.is_err() {
                break;
            }
        }

        let msg = match rx.recv().await {
            Ok(msg) => msg,
            Err(_) => break, // all senders gone
        };

        debug!("dequeue message, actor={},msg={}", ctx.aid().name(), msg.name);
        ctx.record_msg(&msg.name);

        let terminate = dispatch_protected(&mut behavior, &mut ctx, msg);
        if terminate {
            break;
        }
    }

    rx.close();
    let name = ctx.aid().name().to_string();
    ctx.hsys().remove_actor(&name);
    gate.signal();

    debug!("actor '{}' terminated", ctx.aid());
}

/// dispatch one message; returns true when the actor should stop. A panic escaping a
/// handler is unrecoverable - we dump the recent message names and abort, since a
/// corrupted mailbox would cascade
fn dispatch_protected(behavior: &mut Box<dyn ActorBehavior>, ctx: &mut ActorContext, msg: Message) -> bool {
    let result = catch_unwind(AssertUnwindSafe(|| dispatch(behavior, ctx, msg)));
    match result {
        Ok(terminate) => terminate,
        Err(_) => {
            error!("actor handler panicked, a={}", ctx.aid().name());
            ctx.dump_records();
            process::fatal_abort();
        }
    }
}

fn dispatch(behavior: &mut Box<dyn ActorBehavior>, ctx: &mut ActorContext, mut msg: Message) -> bool {
    match std::mem::replace(&mut msg.kind, MessageKind::Local) {
        MessageKind::Kmsg => {
            msg.kind = MessageKind::Kmsg;
            if !behavior.filter(&msg) {
                ctx.dispatch_named(behavior, msg);
            }
        }
        MessageKind::Udp => {
            msg.kind = MessageKind::Udp;
            if !behavior.filter(&msg) {
                ctx.dispatch_named(behavior, msg);
            }
        }
        kind @ MessageKind::Http(_) => {
            msg.kind = kind;
            behavior.handle_http(ctx, msg);
        }
        MessageKind::AsyncThunk(thunk) => {
            thunk(behavior.as_mut(), ctx);
        }
        MessageKind::Local => {
            behavior.handle_local(ctx, msg);
        }
        MessageKind::Exit => {
            behavior.exited(ctx, &msg.from);
        }
        MessageKind::Terminate => {
            behavior.finalize(ctx);
            return true;
        }
    }
    false
}
