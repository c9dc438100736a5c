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

//! the framed actor protocol over TCP. An outgoing KMSG is a fixed header of five
//! big-endian u32 lengths (name, to, from, signature, body) followed by the five
//! segments. The receiver validates every length against the configured caps before
//! assembling; oversize or malformed frames drop the connection.
//!
//! [`TcpTransport`] is the [`Transport`] registered for protocol "tcp". A per-process
//! flag flips remote KMSG emission to the legacy HTTP-kmsg encoding, in which case
//! messages travel through the http client over a cached keep-alive connection.

use crate::{
    client::{HttpClient, HttpConnect},
    codec::encode_kmsg_request,
    HttpUrl, HTTP_SCHEME, RECV_BUFFER_SIZE,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use kanal::AsyncSender;
use litebus_actor::{
    param_invalid, ActorError, ActorSystemHandle, Aid, Message, Transport, MAX_KMSG_BODY_LEN, MAX_KMSG_FROM_LEN,
    MAX_KMSG_NAME_LEN, MAX_KMSG_SIGNATURE_LEN, MAX_KMSG_TO_LEN,
};
use litebus_async::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, Weak,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tracing::{debug, warn};

const FRAME_HEADER_LEN: usize = 20;

/* #region frame codec *****************************************************************************************/

/// encode a KMSG into its wire frame; None if any field exceeds its cap
pub fn encode_frame(msg: &Message) -> Option<Bytes> {
    let name = msg.name.as_bytes();
    let to = msg.to.to_string();
    let from = msg.from.to_string();

    if name.len() > MAX_KMSG_NAME_LEN
        || to.len() > MAX_KMSG_TO_LEN
        || from.len() > MAX_KMSG_FROM_LEN
        || msg.signature.len() > MAX_KMSG_SIGNATURE_LEN
        || msg.body.len() > MAX_KMSG_BODY_LEN
    {
        warn!("message exceeds wire caps, to={},name={}", to, msg.name);
        return None;
    }

    let mut out =
        BytesMut::with_capacity(FRAME_HEADER_LEN + name.len() + to.len() + from.len() + msg.signature.len() + msg.body.len());

    out.put_u32(name.len() as u32);
    out.put_u32(to.len() as u32);
    out.put_u32(from.len() as u32);
    out.put_u32(msg.signature.len() as u32);
    out.put_u32(msg.body.len() as u32);

    out.put_slice(name);
    out.put_slice(to.as_bytes());
    out.put_slice(from.as_bytes());
    out.put_slice(&msg.signature);
    out.put_slice(&msg.body);

    Some(out.freeze())
}

/// incremental decoder for inbound frames. A cap violation or malformed segment is
/// sticky - the carrying connection must be closed
pub struct FrameDecoder {
    buf: BytesMut,
    failed: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder { buf: BytesMut::with_capacity(RECV_BUFFER_SIZE), failed: false }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn decode(&mut self, data: &[u8]) -> Vec<Message> {
        let mut out = Vec::new();
        if self.failed {
            return out;
        }
        self.buf.extend_from_slice(data);

        while !self.failed {
            match self.try_parse() {
                Some(msg) => out.push(msg),
                None => break,
            }
        }
        out
    }

    fn try_parse(&mut self) -> Option<Message> {
        if self.buf.len() < FRAME_HEADER_LEN {
            return None;
        }

        let name_len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        let to_len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
        let from_len = u32::from_be_bytes([self.buf[8], self.buf[9], self.buf[10], self.buf[11]]) as usize;
        let signature_len = u32::from_be_bytes([self.buf[12], self.buf[13], self.buf[14], self.buf[15]]) as usize;
        let body_len = u32::from_be_bytes([self.buf[16], self.buf[17], self.buf[18], self.buf[19]]) as usize;

        if name_len > MAX_KMSG_NAME_LEN
            || to_len > MAX_KMSG_TO_LEN
            || from_len > MAX_KMSG_FROM_LEN
            || signature_len > MAX_KMSG_SIGNATURE_LEN
            || body_len > MAX_KMSG_BODY_LEN
        {
            warn!("inbound frame exceeds caps, dropping connection");
            self.failed = true;
            return None;
        }

        let total = FRAME_HEADER_LEN + name_len + to_len + from_len + signature_len + body_len;
        if self.buf.len() < total {
            return None;
        }

        let mut pos = FRAME_HEADER_LEN;
        let name = String::from_utf8_lossy(&self.buf[pos..pos + name_len]).into_owned();
        pos += name_len;
        let to_str = String::from_utf8_lossy(&self.buf[pos..pos + to_len]).into_owned();
        pos += to_len;
        let from_str = String::from_utf8_lossy(&self.buf[pos..pos + from_len]).into_owned();
        pos += from_len;
        let signature = self.buf[pos..pos + signature_len].to_vec();
        pos += signature_len;
        let body = self.buf[pos..pos + body_len].to_vec();

        let to = match Aid::parse(&to_str) {
            Ok(aid) => aid,
            Err(_) => {
                warn!("inbound frame with bad to address: {}", to_str);
                self.failed = true;
                return None;
            }
        };
        let from = match Aid::parse(&from_str) {
            Ok(aid) => aid,
            Err(_) => {
                warn!("inbound frame with bad from address: {}", from_str);
                self.failed = true;
                return None;
            }
        };

        self.buf.advance(total);
        Some(Message::kmsg(from, to, name, body).with_signature(signature))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        FrameDecoder::new()
    }
}

/* #endregion frame codec */

/* #region tcp transport ***************************************************************************************/

struct TcpInner {
    hsys: ActorSystemHandle,
    links: DashMap<String, AsyncSender<Message>>,
    watchers: DashMap<String, Vec<(Aid, Aid)>>, // peer endpoint → (who, to) pairs
    listener_task: Mutex<Option<JoinHandle<()>>>,
    http_kmsg: AtomicBool,
    http_client: Mutex<Option<HttpClient>>,
    http_links: DashMap<String, Future<HttpConnect>>,
}

#[derive(Clone)]
pub struct TcpTransport {
    inner: Arc<TcpInner>,
}

impl TcpTransport {
    pub fn new(hsys: ActorSystemHandle) -> Self {
        TcpTransport {
            inner: Arc::new(TcpInner {
                hsys,
                links: DashMap::new(),
                watchers: DashMap::new(),
                listener_task: Mutex::new(None),
                http_kmsg: AtomicBool::new(false),
                http_client: Mutex::new(None),
                http_links: DashMap::new(),
            }),
        }
    }

    /// required for the HTTP-kmsg encoding; without it the flag is ignored
    pub fn set_http_client(&self, client: HttpClient) {
        *self.inner.http_client.lock().unwrap() = Some(client);
    }

    /// per-process switch between the framed TCP encoding and HTTP-kmsg
    pub fn set_http_kmsg(&self, enabled: bool) {
        self.inner.http_kmsg.store(enabled, Ordering::Relaxed);
    }

    pub fn http_kmsg(&self) -> bool {
        self.inner.http_kmsg.load(Ordering::Relaxed)
    }

    /// accept inbound framed connections on the bind endpoint; returns the bound
    /// address (useful with port 0)
    pub async fn serve(&self, host: &str, port: u16) -> crate::Result<std::net::SocketAddr> {
        // don't hold the lock across the bind await
        if self.inner.listener_task.lock().unwrap().is_some() {
            return Err(crate::errors::op_failed("tcp transport already serving"));
        }

        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        debug!("kmsg transport listening on {}", local_addr);

        let transport = self.clone();
        *self.inner.listener_task.lock().unwrap() = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let transport = transport.clone();
                        tokio::spawn(async move {
                            transport.run_inbound(stream, peer.to_string()).await;
                        });
                    }
                    Err(e) => warn!("kmsg accept failed: {}", e),
                }
            }
        }));
        Ok(local_addr)
    }

    /// hand over an already accepted stream (used when the process multiplexes http
    /// and the framed kmsg protocol on one listener)
    pub fn serve_stream(&self, stream: TcpStream, peer: String) {
        let transport = self.clone();
        tokio::spawn(async move {
            transport.run_inbound(stream, peer).await;
        });
    }

    pub fn stop(&self) {
        if let Some(task) = self.inner.listener_task.lock().unwrap().take() {
            task.abort();
        }
        self.inner.links.clear();
        self.inner.http_links.clear();
    }

    async fn run_inbound(&self, mut stream: TcpStream, peer: String) {
        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    for msg in decoder.decode(&buf[..n]) {
                        self.deliver_local(msg);
                    }
                    if decoder.failed() {
                        warn!("dropping inbound kmsg connection from {}", peer);
                        break;
                    }
                }
                Err(e) => {
                    debug!("kmsg recv error from {}: {}", peer, e);
                    break;
                }
            }
        }
    }

    /// a wire message addressed to us - retarget to the local name and enqueue
    fn deliver_local(&self, mut msg: Message) {
        let local_to = Aid::new(msg.to.name());
        msg.to = local_to.clone();
        if let Err(e) = self.inner.hsys.send(&local_to, msg) {
            warn!("cannot deliver inbound kmsg to {}: {}", local_to, e);
        }
    }

    /// lazily established outbound link per peer endpoint. The link task owns the
    /// socket; losing it notifies the registered watchers with Exit messages
    fn link_sender(&self, peer: String) -> AsyncSender<Message> {
        // atomic get-or-create so concurrent first sends share one link
        let (tx, rx) = match self.inner.links.entry(peer.clone()) {
            dashmap::mapref::entry::Entry::Occupied(e) => return e.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let (tx, rx) = kanal::unbounded_async::<Message>();
                e.insert(tx.clone());
                (tx, rx)
            }
        };

        let transport = self.clone();
        tokio::spawn(async move {
            match TcpStream::connect(peer.as_str()).await {
                Ok(stream) => {
                    let (mut read_half, mut write_half) = stream.into_split();

                    // inbound frames on an outbound link (peers reply over the same
                    // connection)
                    let rx_transport = transport.clone();
                    let reader = tokio::spawn(async move {
                        let mut decoder = FrameDecoder::new();
                        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
                        loop {
                            match read_half.read(&mut buf).await {
                                Ok(0) => break,
                                Ok(n) => {
                                    for msg in decoder.decode(&buf[..n]) {
                                        rx_transport.deliver_local(msg);
                                    }
                                    if decoder.failed() {
                                        break;
                                    }
                                }
                                Err(_) => break,
                            }
                        }
                    });

                    while let Ok(msg) = rx.recv().await {
                        let Some(bytes) = encode_frame(&msg) else {
                            continue; // oversize - drop the message, keep the link
                        };
                        if let Err(e) = write_half.write_all(&bytes).await {
                            debug!("kmsg send to {} failed: {}", peer, e);
                            break;
                        }
                    }

                    reader.abort();
                }
                Err(e) => {
                    warn!("kmsg connect to {} failed: {}", peer, e);
                }
            }
            transport.on_link_down(&peer);
        });

        tx
    }

    fn on_link_down(&self, peer: &str) {
        self.inner.links.remove(peer);
        if let Some((_, watchers)) = self.inner.watchers.remove(peer) {
            for (who, to) in watchers {
                debug!("notifying {} that {} exited", who, to);
                let _ = self.inner.hsys.send(&who, Message::exit(to, who.clone()));
            }
        }
    }

    /// send one KMSG as an HTTP-kmsg POST over a cached keep-alive connection
    fn send_http_kmsg(&self, msg: Message) -> litebus_actor::Result<()> {
        let client = match self.inner.http_client.lock().unwrap().clone() {
            Some(client) => client,
            None => return Err(ActorError::IoNotFound("http".to_string())),
        };

        let peer = msg.to.url();
        let bytes = encode_kmsg_request(&msg);

        let conn_future = match self.inner.http_links.entry(peer.clone()) {
            dashmap::mapref::entry::Entry::Occupied(e) => e.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let url = HttpUrl::new(HTTP_SCHEME, msg.to.host(), msg.to.port(), "/");
                let future = client.connect(&url);
                e.insert(future.clone());

                // purge the cache once the link goes away (or never came up)
                let weak: Weak<TcpInner> = Arc::downgrade(&self.inner);
                let purge_peer = peer.clone();
                future.on_complete(move |ft| match ft.value() {
                    Some(connect) => {
                        let weak = weak.clone();
                        let purge_peer = purge_peer.clone();
                        connect.disconnected().on_complete(move |_| {
                            if let Some(inner) = weak.upgrade() {
                                inner.http_links.remove(&purge_peer);
                            }
                        });
                    }
                    None => {
                        if let Some(inner) = weak.upgrade() {
                            inner.http_links.remove(&purge_peer);
                        }
                    }
                });
                future
            }
        };

        conn_future.on_complete(move |ft| {
            if let Some(connect) = ft.value() {
                connect.send_kmsg(bytes);
            }
        });
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn send(&self, msg: Message) -> litebus_actor::Result<()> {
        if !msg.within_caps() {
            warn!("outbound message exceeds wire caps, to={},name={}", msg.to, msg.name);
            return Err(param_invalid("message exceeds wire caps"));
        }

        // explicit http:// Aids always take the HTTP-kmsg encoding; tcp:// Aids only
        // when the per-process flag is set
        if self.http_kmsg() || msg.to.protocol() == "http" {
            return self.send_http_kmsg(msg);
        }

        let peer = msg.to.url();
        let tx = self.link_sender(peer);
        match tx.try_send(msg) {
            Ok(true) => Ok(()),
            _ => Err(ActorError::ReceiverClosed),
        }
    }

    fn link(&self, who: &Aid, to: &Aid) -> litebus_actor::Result<()> {
        self.inner.watchers.entry(to.url()).or_default().push((who.clone(), to.clone()));
        Ok(())
    }

    fn unlink(&self, who: &Aid, to: &Aid) -> litebus_actor::Result<()> {
        if let Some(mut watchers) = self.inner.watchers.get_mut(&to.url()) {
            watchers.retain(|(w, t)| !(w == who && t == to));
        }
        Ok(())
    }
}

/* #endregion tcp transport */
