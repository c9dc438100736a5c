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

//! the http server side of the transport. Decoded requests either carry an
//! actor-framing header (Litebus-From / legacy Libprocess-From) and become KMSG
//! messages, or they are ordinary RPCs routed to an actor by the first path segment
//! (falling back to the process delegate). RPC responses are released strictly in
//! request order by a per-connection pipeline proxy actor.

use crate::{
    codec::{encode_response, RequestDecoder},
    types::{HttpMsg, Request, Response},
    HttpUrl, MAX_CON_NUM, RECV_BUFFER_SIZE,
};
use bytes::Bytes;
use dashmap::DashMap;
use http::header;
use kanal::AsyncSender;
use litebus_actor::{async_call, defer, ActorBehavior, ActorContext, ActorSystemHandle, Aid, BusAddress, Message};
use litebus_async::{Future, Promise};
use litebus_common::process;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicI32, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Notify,
    task::JoinHandle,
};
use tracing::{debug, warn};

const HTTP_PIPELINE_PROXY_NAME: &str = "HTTP_PIPELINE_PROXY";
const HTTP_URL_DELIMITER: &str = "/";

/// default idle window for the connection recycler when enabled without a period
pub const DEFAULT_RECYCLE_PERIOD_MS: u64 = 5000;

fn now_millis() -> u64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap().as_millis() as u64
}

struct ServerConn {
    writer_tx: AsyncSender<Bytes>,
    proxy: Mutex<Option<Aid>>,
    last_activity: Arc<AtomicU64>,
    close: Arc<Notify>,
}

struct ServerInner {
    hsys: ActorSystemHandle,
    advertise: BusAddress,
    next_seq: AtomicI32,
    conns: DashMap<i32, ServerConn>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    recycle_task: Mutex<Option<JoinHandle<()>>>,
    recycle_period_ms: Option<u64>,
}

/// per-connection decode state that never leaves the reader task
struct ConnState {
    meet_max_clients: bool,
    parse_failed: bool,
    peer: String,
}

#[derive(Clone)]
pub struct HttpServer {
    inner: Arc<ServerInner>,
}

impl HttpServer {
    /// `advertise` is the address decoded request targets are completed with;
    /// `recycle_period_ms` enables the idle-connection reaper
    pub fn new(hsys: ActorSystemHandle, advertise: BusAddress, recycle_period_ms: Option<u64>) -> Self {
        HttpServer {
            inner: Arc::new(ServerInner {
                hsys,
                advertise,
                next_seq: AtomicI32::new(1),
                conns: DashMap::new(),
                accept_task: Mutex::new(None),
                recycle_task: Mutex::new(None),
                recycle_period_ms,
            }),
        }
    }

    /// bind and start accepting; returns the bound address (useful with port 0).
    /// Starting twice is an error
    pub async fn start(&self, host: &str, port: u16) -> crate::Result<std::net::SocketAddr> {
        // don't hold the lock across the bind await
        if self.inner.accept_task.lock().unwrap().is_some() {
            return Err(crate::errors::op_failed("http server already running"));
        }

        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        debug!("http server listening on {}", local_addr);

        let server = self.clone();
        *self.inner.accept_task.lock().unwrap() = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => server.start_conn(stream, peer.to_string()),
                    Err(e) => warn!("accept failed: {}", e),
                }
            }
        }));

        self.start_recycler();
        Ok(local_addr)
    }

    /// hand over an already accepted stream (used when the process multiplexes http
    /// and the framed kmsg protocol on one listener)
    pub fn serve_stream(&self, stream: TcpStream, peer: String) {
        self.start_conn(stream, peer);
    }

    /// start the idle-connection reaper without the accept loop
    pub fn start_recycler(&self) {
        if let Some(period) = self.inner.recycle_period_ms {
            let period = if period == 0 { DEFAULT_RECYCLE_PERIOD_MS } else { period };
            let server = self.clone();
            *self.inner.recycle_task.lock().unwrap() = Some(tokio::spawn(async move {
                server.recycle_loop(period).await;
            }));
        }
    }

    pub fn stop(&self) {
        if let Some(task) = self.inner.accept_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(task) = self.inner.recycle_task.lock().unwrap().take() {
            task.abort();
        }
        let seqs: Vec<i32> = self.inner.conns.iter().map(|e| *e.key()).collect();
        for seq in seqs {
            self.close_conn(seq);
        }
    }

    fn start_conn(&self, stream: TcpStream, peer: String) {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let meet_max_clients = self.inner.conns.len() >= MAX_CON_NUM;
        if meet_max_clients {
            warn!("connection limit reached, dropping requests of conSeq={}", seq);
        }

        let (read_half, mut write_half) = stream.into_split();
        let (writer_tx, writer_rx) = kanal::unbounded_async::<Bytes>();

        tokio::spawn(async move {
            while let Ok(bytes) = writer_rx.recv().await {
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let close = Arc::new(Notify::new());
        self.inner.conns.insert(
            seq,
            ServerConn {
                writer_tx,
                proxy: Mutex::new(None),
                last_activity: Arc::new(AtomicU64::new(now_millis())),
                close: close.clone(),
            },
        );

        let server = self.clone();
        tokio::spawn(async move {
            server.run_conn(seq, read_half, peer, meet_max_clients, close).await;
        });
    }

    async fn run_conn(
        &self,
        seq: i32,
        mut read_half: tokio::net::tcp::OwnedReadHalf,
        peer: String,
        meet_max_clients: bool,
        close: Arc<Notify>,
    ) {
        let mut decoder = RequestDecoder::new(Some(self.inner.advertise.clone()));
        let mut state = ConnState { meet_max_clients, parse_failed: false, peer };
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let n = tokio::select! {
                _ = close.notified() => break,
                res = read_half.read(&mut buf) => match res {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        debug!("recv error, conSeq={}: {}", seq, e);
                        break;
                    }
                }
            };

            if let Some(conn) = self.inner.conns.get(&seq) {
                conn.last_activity.store(now_millis(), Ordering::Relaxed);
            }

            let requests = decoder.decode(&buf[..n]);
            for request in requests {
                self.handle_request(seq, request, &mut state);
            }

            if decoder.failed() || state.parse_failed || state.meet_max_clients {
                warn!(
                    "failed to decode data while receiving, conSeq={}, meetMax={}, parseFailed={}",
                    seq, state.meet_max_clients, state.parse_failed
                );
                break;
            }
        }

        self.on_conn_closed(seq);
    }

    /// connection teardown: remove the proxy from the table, release the decoder
    /// (dropped with the reader task) and close the socket
    fn on_conn_closed(&self, seq: i32) {
        if let Some((_, conn)) = self.inner.conns.remove(&seq) {
            if let Some(proxy) = conn.proxy.lock().unwrap().take() {
                debug!("remove proxy, conSeq={}", seq);
                let _ = self.inner.hsys.terminate(&proxy);
            }
        }
    }

    fn handle_request(&self, seq: i32, mut request: Request, state: &mut ConnState) {
        debug!(
            "url,method,client,body size, u:{},m:{},c:{},s:{}",
            request.url.path,
            request.method,
            state.peer,
            request.body.len()
        );
        request.client = Some(state.peer.clone());

        let is_kmsg = request.headers.contains_key("Libprocess-From") || request.headers.contains_key("Litebus-From");
        if is_kmsg {
            self.handle_kmsg_request(request, state);
        } else {
            self.handle_default_request(seq, request, state);
        }
    }

    /// actor-framed request: convert into a KMSG message and deliver. The server does
    /// not reply on this path
    fn handle_kmsg_request(&self, request: Request, state: &mut ConnState) {
        if state.parse_failed {
            warn!("drop http message with url={}", request.url.path);
            return;
        }

        let url_path = &request.url.path;
        if url_path.len() <= HTTP_URL_DELIMITER.len() || !url_path.starts_with(HTTP_URL_DELIMITER) {
            warn!("receive http message with invalid url={}", url_path);
            state.parse_failed = true;
            return;
        }

        let (actor_name, msg_name) = parse_kmsg_url(url_path);

        let mut from = String::new();
        if let Some(v) = request.headers.get("Libprocess-From") {
            from = v.to_str().unwrap_or("").to_string();
        }
        if let Some(v) = request.headers.get("Litebus-From") {
            from = v.to_str().unwrap_or("").to_string();
        }

        debug!("receive message (from, to, toMsgName)=({}, {}, {})", from, actor_name, msg_name);

        let from_aid = match Aid::parse(&from) {
            Ok(aid) if aid.is_ok() => aid,
            _ => {
                warn!("receive http message with invalid from, url:{},from:{}", url_path, from);
                state.parse_failed = true;
                return;
            }
        };

        if actor_name.is_empty() || actor_name == HTTP_URL_DELIMITER {
            warn!("receive http message with invalid url, url:{}", url_path);
            state.parse_failed = true;
            return;
        }

        let to = Aid::new(&actor_name);
        let mut message = Message::kmsg(from_aid, to.clone(), msg_name, request.body);
        if let Some(auth) = request.headers.get(header::AUTHORIZATION) {
            message = message.with_signature(auth.as_bytes().to_vec());
        }

        if let Err(e) = self.inner.hsys.send(&to, message) {
            warn!("cannot deliver kmsg to {}: {}", actor_name, e);
        }
    }

    /// ordinary RPC: route by first path segment or delegate, and thread the response
    /// future through the connection's pipeline proxy
    fn handle_default_request(&self, seq: i32, mut request: Request, state: &mut ConnState) {
        debug!("receive http message with url={}", request.url.path);
        if state.meet_max_clients {
            warn!("drop http message with url={}", request.url.path);
            return;
        }

        let receiver = self.resolve_receiver(&mut request);

        let proxy = match self.ensure_proxy(seq) {
            Some(aid) => aid,
            None => {
                state.meet_max_clients = true;
                return;
            }
        };

        if receiver.name().is_empty() || !self.inner.hsys.has_actor(receiver.name()) {
            // actor does not exist, return 404 - still through the proxy for ordering
            let response_future = Future::from_value(Response::not_found());
            async_call::<HttpPipelineProxy, (), _>(&self.inner.hsys, &proxy, move |actor, ctx| {
                actor.process(ctx, request, response_future);
            });
            return;
        }

        let promise: Promise<Response> = Promise::new();
        let response_future = promise.future();

        let proxy_request = request.clone();
        async_call::<HttpPipelineProxy, (), _>(&self.inner.hsys, &proxy, move |actor, ctx| {
            actor.process(ctx, proxy_request, response_future);
        });

        let name = request.url.path.clone();
        let message = Message::http(receiver.clone(), name, Box::new(HttpMsg { request, promise }));
        if let Err(e) = self.inner.hsys.send(&receiver, message) {
            warn!("cannot deliver http message to {}: {}", receiver, e);
        }
    }

    /// the target actor is the first URL path segment, or the configured delegate if
    /// no such actor exists (in which case the path is rewritten to carry the
    /// delegate prefix)
    fn resolve_receiver(&self, request: &mut Request) -> Aid {
        let tokens: Vec<String> = request
            .url
            .path
            .split('/')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();

        let delegate = self.inner.hsys.delegate();
        let first_is_actor = tokens.first().map(|t| self.inner.hsys.has_actor(t)).unwrap_or(false);

        if !delegate.is_empty() && !first_is_actor {
            request.url.path = if tokens.is_empty() {
                format!("/{}", delegate)
            } else {
                format!("/{}{}", delegate, request.url.path)
            };
            Aid::new(delegate)
        } else {
            Aid::new(tokens.first().cloned().unwrap_or_default())
        }
    }

    fn ensure_proxy(&self, seq: i32) -> Option<Aid> {
        let conn = self.inner.conns.get(&seq)?;
        let mut proxy = conn.proxy.lock().unwrap();
        if let Some(aid) = proxy.as_ref() {
            return Some(aid.clone());
        }

        let behavior = HttpPipelineProxy { seq, server: self.clone(), items: VecDeque::new() };
        match self.inner.hsys.spawn(behavior, true, true) {
            Ok(aid) => {
                debug!("create a new http pipeline proxy, conSeq={}", seq);
                *proxy = Some(aid.clone());
                Some(aid)
            }
            Err(e) => {
                warn!("cannot spawn pipeline proxy for conSeq={}: {}", seq, e);
                None
            }
        }
    }

    pub(crate) fn send_bytes(&self, seq: i32, bytes: Bytes) {
        match self.inner.conns.get(&seq) {
            Some(conn) => {
                conn.last_activity.store(now_millis(), Ordering::Relaxed);
                if !matches!(conn.writer_tx.try_send(bytes), Ok(true)) {
                    warn!("response write failed, conSeq={}", seq);
                }
            }
            None => warn!("response for closed connection, conSeq={}", seq),
        }
    }

    pub(crate) fn close_conn(&self, seq: i32) {
        if let Some(conn) = self.inner.conns.get(&seq) {
            conn.close.notify_one();
        }
    }

    /// close connections that were quiescent for a full period
    async fn recycle_loop(&self, period_ms: u64) {
        loop {
            tokio::time::sleep(Duration::from_millis(period_ms)).await;
            let now = now_millis();
            let idle: Vec<i32> = self
                .inner
                .conns
                .iter()
                .filter(|e| now.saturating_sub(e.last_activity.load(Ordering::Relaxed)) > period_ms)
                .map(|e| *e.key())
                .collect();
            for seq in idle {
                debug!("recycling idle connection, conSeq={}", seq);
                self.close_conn(seq);
            }
        }
    }
}

/// split `/actor/rest...` into the actor name and the remainder message name
fn parse_kmsg_url(url_path: &str) -> (String, String) {
    let rest = &url_path[HTTP_URL_DELIMITER.len()..];
    match rest.find('/') {
        Some(idx) => (rest[..idx].to_string(), rest[idx + 1..].to_string()),
        None => (String::new(), rest.to_string()),
    }
}

/* #region pipeline proxy **************************************************************************************/

/// per-connection ordering actor: responses leave in request order no matter in which
/// order the application futures complete. Being an actor makes the state naturally
/// serial - no locks needed
pub(crate) struct HttpPipelineProxy {
    seq: i32,
    server: HttpServer,
    items: VecDeque<(Request, Future<Response>)>,
}

impl HttpPipelineProxy {
    fn process(&mut self, ctx: &mut ActorContext, request: Request, response_future: Future<Response>) {
        self.items.push_back((request, response_future));
        if self.items.len() == 1 {
            self.handle_next(ctx);
        }
    }

    fn handle_next(&mut self, ctx: &mut ActorContext) {
        if let Some((_, fut)) = self.items.front() {
            fut.on_complete(defer::<HttpPipelineProxy, Response, _>(ctx.hsys(), ctx.aid(), |actor, ctx, ft| {
                actor.receive_response(ctx, ft);
            }));
        }
    }

    fn receive_response(&mut self, ctx: &mut ActorContext, completed: Future<Response>) {
        debug!("handle response from application layer.");

        let Some((request, fut)) = self.items.pop_front() else {
            tracing::error!("pipeline is empty.");
            process::fatal_abort();
        };
        if completed != fut {
            tracing::error!("pipeline is error.");
            process::fatal_abort();
        }

        let response = match completed.value() {
            Some(resp) => resp,
            None => Response::internal_error(format!("request failed: {}", completed.error_code())),
        };

        debug!(
            "encode msg, url:{},code:{},size:{}",
            request.url.path,
            response.code.as_u16(),
            response.body.len()
        );

        let closing = !request.keep_alive || response.wants_close();
        let bytes = encode_response(&response, request.keep_alive);
        self.server.send_bytes(self.seq, bytes);

        if closing {
            // the peer demanded teardown - everything still queued is moot
            self.items.clear();
            self.server.close_conn(self.seq);
        } else {
            self.handle_next(ctx);
        }
    }
}

impl ActorBehavior for HttpPipelineProxy {
    fn name(&self) -> String {
        format!("{}({})", HTTP_PIPELINE_PROXY_NAME, self.seq)
    }
}

/* #endregion pipeline proxy */
