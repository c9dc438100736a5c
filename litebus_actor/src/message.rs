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

use crate::{actor::ActorBehavior, actor::ActorContext, Aid};
use std::{any::Any, fmt};

// per-field caps for wire messages. Oversize messages are dropped and the carrying
// connection is marked for disconnect
pub const MAX_KMSG_NAME_LEN: usize = 255;
pub const MAX_KMSG_TO_LEN: usize = 255;
pub const MAX_KMSG_FROM_LEN: usize = 255;
pub const MAX_KMSG_SIGNATURE_LEN: usize = 4096;
pub const MAX_KMSG_BODY_LEN: usize = 100 * 1024 * 1024;

/// a callable that the dispatch loop invokes on the target actor's task - the sole
/// mechanism by which futures and timers reach actors
pub type Thunk = Box<dyn FnOnce(&mut dyn ActorBehavior, &mut ActorContext) + Send>;

/// discriminates how the dispatch loop delivers a [`Message`]
pub enum MessageKind {
    /// process-local message delivered through `handle_local`
    Local,
    /// wire message (TCP framed protocol or HTTP-kmsg) dispatched by handler name
    Kmsg,
    /// datagram wire message dispatched by handler name
    Udp,
    /// http request envelope delivered through `handle_http`. The payload is opaque
    /// at this level - the http layer downcasts it
    Http(Box<dyn Any + Send>),
    /// embedded closure invoked on the target actor's task
    AsyncThunk(Thunk),
    /// a peer link went away - delivered through `exited`
    Exit,
    /// drains the mailbox in FIFO order, then finalizes and stops the actor
    Terminate,
}

impl MessageKind {
    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::Local => "LOCAL",
            MessageKind::Kmsg => "KMSG",
            MessageKind::Udp => "KUDP",
            MessageKind::Http(_) => "HTTP",
            MessageKind::AsyncThunk(_) => "ASYNC",
            MessageKind::Exit => "EXIT",
            MessageKind::Terminate => "TERMINATE",
        }
    }
}

/// the message envelope. All delivery - wire, http, timers, async dispatch - funnels
/// through this one type so that the per-actor FIFO order is total
pub struct Message {
    pub from: Aid,
    pub to: Aid,
    pub name: String,
    pub body: Vec<u8>,
    pub signature: Vec<u8>,
    pub kind: MessageKind,
}

impl Message {
    pub fn kmsg(from: Aid, to: Aid, name: impl ToString, body: Vec<u8>) -> Self {
        Message { from, to, name: name.to_string(), body, signature: Vec::new(), kind: MessageKind::Kmsg }
    }

    pub fn udp(from: Aid, to: Aid, name: impl ToString, body: Vec<u8>) -> Self {
        Message { from, to, name: name.to_string(), body, signature: Vec::new(), kind: MessageKind::Udp }
    }

    pub fn local(from: Aid, to: Aid, name: impl ToString, body: Vec<u8>) -> Self {
        Message { from, to, name: name.to_string(), body, signature: Vec::new(), kind: MessageKind::Local }
    }

    pub fn http(to: Aid, name: impl ToString, payload: Box<dyn Any + Send>) -> Self {
        Message {
            from: Aid::new(""),
            to,
            name: name.to_string(),
            body: Vec::new(),
            signature: Vec::new(),
            kind: MessageKind::Http(payload),
        }
    }

    pub fn thunk(to: Aid, f: Thunk) -> Self {
        Message {
            from: Aid::new(""),
            to,
            name: "Async".to_string(),
            body: Vec::new(),
            signature: Vec::new(),
            kind: MessageKind::AsyncThunk(f),
        }
    }

    pub fn exit(peer: Aid, to: Aid) -> Self {
        Message { from: peer, to, name: "Exit".to_string(), body: Vec::new(), signature: Vec::new(), kind: MessageKind::Exit }
    }

    pub fn terminate(to: Aid) -> Self {
        Message {
            from: Aid::new(""),
            to,
            name: "Terminate".to_string(),
            body: Vec::new(),
            signature: Vec::new(),
            kind: MessageKind::Terminate,
        }
    }

    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }

    /// check the envelope against the wire caps. The from/to fields are checked in
    /// their string form since that is what goes on the wire
    pub fn within_caps(&self) -> bool {
        self.name.len() <= MAX_KMSG_NAME_LEN
            && self.to.to_string().len() <= MAX_KMSG_TO_LEN
            && self.from.to_string().len() <= MAX_KMSG_FROM_LEN
            && self.signature.len() <= MAX_KMSG_SIGNATURE_LEN
            && self.body.len() <= MAX_KMSG_BODY_LEN
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message({} from:{} to:{} name:{} body:{}B)",
            self.kind.tag(),
            self.from,
            self.to,
            self.name,
            self.body.len()
        )
    }
}
