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

//! the pipelined http client. Each established connection is managed by its own
//! `CONNECT_<seq>` actor which owns the FIFO of pending response promises - the
//! single-consumer guarantee of the actor runtime is what serializes the pipeline
//! state, there are no locks in here. The IO tasks own the socket; actors refer to
//! the connection by sequence id only.

use crate::{
    codec::{encode_request, ResponseDecoder},
    codes,
    types::{method_allowed, Request, Response},
    HttpUrl, HTTPS_SCHEME, HTTP_SCHEME, MAX_CON_NUM, RECV_BUFFER_SIZE,
};
use bytes::Bytes;
use dashmap::DashMap;
use http::{header, Method};
use kanal::AsyncSender;
use litebus_actor::{
    async_call, async_call_future, ActorBehavior, ActorContext, ActorSystemHandle, Aid, AsAnyActor,
};
use litebus_async::{Future, Promise, Status};
use litebus_timer::Timer;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI32, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    task::JoinHandle,
};
use tracing::{debug, warn};

const CONNECT_PREFIX: &str = "CONNECT_";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 90_000;

fn errno_of(e: &std::io::Error) -> i32 {
    e.raw_os_error().unwrap_or(codes::CONNECTION_REFUSED)
}

struct ConnIo {
    writer_tx: AsyncSender<Bytes>,
    reader_task: JoinHandle<()>,
}

struct ClientInner {
    hsys: ActorSystemHandle,
    conns: DashMap<i32, ConnIo>,
    next_seq: AtomicI32,
    request_timeout_ms: AtomicU64,
}

/// shared client context - one per process, explicitly passed around (no hidden
/// singleton). Cloning is cheap
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    pub fn new(hsys: ActorSystemHandle) -> Self {
        HttpClient {
            inner: Arc::new(ClientInner {
                hsys,
                conns: DashMap::new(),
                next_seq: AtomicI32::new(1),
                request_timeout_ms: AtomicU64::new(DEFAULT_REQUEST_TIMEOUT_MS),
            }),
        }
    }

    pub fn hsys(&self) -> &ActorSystemHandle {
        &self.inner.hsys
    }

    /// process-wide default for per-request timeouts (ms)
    pub fn set_request_timeout(&self, ms: u64) {
        self.inner.request_timeout_ms.store(ms, Ordering::Relaxed);
    }

    pub fn request_timeout(&self) -> u64 {
        self.inner.request_timeout_ms.load(Ordering::Relaxed)
    }

    /// open a connection to `url`. The returned future completes with a
    /// reference-counted [`HttpConnect`] handle (or fails with the connect errno)
    pub fn connect(&self, url: &HttpUrl) -> Future<HttpConnect> {
        if url.host.is_empty() || url.port == 0 || url.scheme.is_empty() {
            warn!("couldn't connect with no ip,port,scheme.");
            return Future::from_error(codes::INVALID_REQUEST);
        }
        if url.scheme != HTTP_SCHEME && url.scheme != HTTPS_SCHEME {
            warn!("only support 'http' and 'https'");
            return Future::from_error(codes::INVALID_REQUEST);
        }
        if url.scheme == HTTPS_SCHEME {
            // TLS channels come from the external context factory, which is not wired
            // up in this build
            warn!("couldn't connect to url with 'https' while ssl is not enabled.");
            return Future::from_error(codes::INVALID_REQUEST);
        }
        if self.inner.conns.len() >= MAX_CON_NUM {
            warn!("connection limit reached ({})", MAX_CON_NUM);
            return Future::from_error(codes::CONNECTION_MEET_MAXIMUM);
        }

        let promise: Promise<HttpConnect> = Promise::new();
        let result = promise.future();

        let client = self.clone();
        let url = url.clone();
        tokio::spawn(async move {
            match TcpStream::connect((url.host.as_str(), url.port)).await {
                Ok(stream) => {
                    let seq = client.inner.next_seq.fetch_add(1, Ordering::Relaxed);
                    debug!("connect succeed, conSeq={}", seq);
                    client.start_io(seq, stream);
                    match HttpConnect::create(&client, seq, url) {
                        Ok(connect) => promise.set_value(connect),
                        Err(e) => {
                            warn!("cannot spawn connection actor: {}", e);
                            client.close_link(seq);
                            promise.set_failed(codes::CONNECTION_REFUSED);
                        }
                    }
                }
                Err(e) => {
                    warn!("connect failed, errCode={}", errno_of(&e));
                    promise.set_failed(errno_of(&e));
                }
            }
        });

        result
    }

    /// attach reader/writer tasks to an established stream
    fn start_io(&self, seq: i32, stream: TcpStream) {
        let (mut read_half, mut write_half) = stream.into_split();
        let (writer_tx, writer_rx) = kanal::unbounded_async::<Bytes>();

        tokio::spawn(async move {
            while let Ok(bytes) = writer_rx.recv().await {
                if let Err(e) = write_half.write_all(&bytes).await {
                    debug!("send failed, conSeq={}: {}", seq, e);
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let client = self.clone();
        let reader_task = tokio::spawn(async move {
            let mut decoder = ResponseDecoder::new();
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        client.on_link_down(seq, 0);
                        break;
                    }
                    Ok(n) => {
                        let responses = decoder.decode(&buf[..n]);
                        for resp in responses {
                            client.on_response(seq, resp);
                        }
                        if decoder.failed() {
                            warn!("response parse failed, conSeq={}", seq);
                            client.on_link_down(seq, codes::CONNECTION_RESET_BY_PEER);
                            break;
                        }
                    }
                    Err(e) => {
                        client.on_link_down(seq, errno_of(&e));
                        break;
                    }
                }
            }
        });

        self.inner.conns.insert(seq, ConnIo { writer_tx, reader_task });
    }

    fn connect_aid(seq: i32) -> Aid {
        Aid::new(format!("{}{}", CONNECT_PREFIX, seq))
    }

    /// a decoded response frame - matched head-first by the connection actor
    fn on_response(&self, seq: i32, resp: Response) {
        async_call::<HttpConnectionActor, (), _>(&self.inner.hsys, &Self::connect_aid(seq), move |actor, ctx| {
            actor.handle_response(ctx, resp);
        });
    }

    /// the socket went away (peer close, recv error or parse failure)
    fn on_link_down(&self, seq: i32, err_code: i32) {
        self.close_link(seq);
        async_call_future::<HttpConnectionActor, bool, _>(&self.inner.hsys, &Self::connect_aid(seq), move |actor, ctx| {
            actor.handle_disconnect(ctx, err_code)
        });
    }

    /// enqueue bytes on the connection's writer
    pub(crate) fn send_bytes(&self, seq: i32, bytes: Bytes) -> std::result::Result<(), i32> {
        match self.inner.conns.get(&seq) {
            Some(conn) => match conn.writer_tx.try_send(bytes) {
                Ok(true) => Ok(()),
                _ => Err(codes::CONNECTION_REFUSED),
            },
            None => Err(codes::CONNECTION_REFUSED),
        }
    }

    /// drop the io side of a connection; the writer channel closes, which shuts the
    /// socket down and ends the reader
    pub(crate) fn close_link(&self, seq: i32) {
        if let Some((_, conn)) = self.inner.conns.remove(&seq) {
            conn.reader_task.abort();
        }
    }
}

/* #region connection actor ************************************************************************************/

type Pipeline = std::collections::VecDeque<Promise<Response>>;

/// per-connection manager actor. Owns the pending-request FIFO; responses are matched
/// head-first, which is the HTTP/1.1 pipelining invariant
pub(crate) struct HttpConnectionActor {
    seq: i32,
    client: HttpClient,
    connect_url: HttpUrl,
    pipeline: Option<Pipeline>,
    send_failed: bool,
    with_timeout: bool,
    disconnection: Promise<bool>,
    disconnection_future: Future<bool>,
    response_timer: Timer,
}

impl HttpConnectionActor {
    fn new(seq: i32, client: HttpClient, connect_url: HttpUrl) -> Self {
        let disconnection = Promise::new();
        let disconnection_future = disconnection.future();
        HttpConnectionActor {
            seq,
            client,
            connect_url,
            pipeline: Some(Pipeline::new()),
            send_failed: false,
            with_timeout: false,
            disconnection,
            disconnection_future,
            response_timer: Timer::none(),
        }
    }

    fn launch_request(&mut self, ctx: &mut ActorContext, request: Request, with_timeout: bool) -> Future<Response> {
        if !request.url.same_domain(&self.connect_url) {
            return Future::from_error(codes::INVALID_REQUEST);
        }
        if self.pipeline.is_none() {
            warn!("connection has been closed, conSeq={}", self.seq);
            return Future::from_error(codes::CONNECTION_REFUSED);
        }
        if self.disconnection_future.is_ok() {
            warn!("connection is closing, conSeq={}", self.seq);
            return Future::from_error(codes::CONNECTION_REFUSED);
        }
        if self.send_failed {
            warn!("launch request failed before, conSeq={}", self.seq);
            return Future::from_error(codes::CONNECTION_REFUSED);
        }

        self.with_timeout = with_timeout;

        // the promise must be queued before the bytes can hit the wire
        let promise: Promise<Response> = Promise::new();
        let result = promise.future();
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.push_back(promise);
        }

        let timeout_ms = request.timeout.unwrap_or_else(|| self.client.request_timeout());
        let bytes = encode_request(&request);

        match self.client.send_bytes(self.seq, bytes) {
            Ok(()) => {
                if with_timeout {
                    self.arm_response_timer(ctx, timeout_ms);
                }
            }
            Err(_) => {
                warn!("request send failed, conSeq={}", self.seq);
                self.send_failed = true;
                self.handle_disconnect(ctx, codes::CONNECTION_REFUSED);
            }
        }

        result
    }

    fn arm_response_timer(&mut self, ctx: &ActorContext, timeout_ms: u64) {
        let timer = ctx.add_timer(Duration::from_millis(timeout_ms), |behavior, ctx| {
            if let Some(actor) = behavior.as_any_actor().downcast_mut::<HttpConnectionActor>() {
                actor.handle_request_timeout(ctx);
            }
        });
        self.response_timer = timer.unwrap_or_else(|_| Timer::none());
    }

    fn handle_response(&mut self, ctx: &mut ActorContext, response: Response) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            warn!("connection has been closed, conSeq={}", self.seq);
            return;
        };

        if pipeline.is_empty() {
            // a response nobody asked for - tear the connection down
            self.disconnect(ctx);
            return;
        }

        if self.with_timeout {
            ctx.cancel_timer(&self.response_timer);
        }

        let promise = match pipeline.pop_front() {
            Some(p) => p,
            None => return,
        };

        // keep-alive only if the peer said so; a missing Connection header closes
        let close_flag = match response.headers.get(header::CONNECTION) {
            Some(v) => v.to_str().map(|s| s.eq_ignore_ascii_case("close")).unwrap_or(true),
            None => true,
        };

        promise.set_value(response);

        if close_flag {
            debug!("this is the last response, close the connection, conSeq:{}", self.seq);
            while let Some(p) = pipeline.pop_front() {
                p.set_failed(codes::CANNOT_SEND_AFTER_SHUTDOWN);
            }
            self.disconnect(ctx);
        }
    }

    fn handle_request_timeout(&mut self, ctx: &mut ActorContext) {
        warn!("launch request timeout, conSeq={}", self.seq);
        self.client.close_link(self.seq);
        self.handle_disconnect(ctx, codes::CONNECTION_TIMEOUT);
    }

    fn disconnect(&mut self, ctx: &mut ActorContext) -> Future<bool> {
        self.client.close_link(self.seq);
        self.handle_disconnect(ctx, codes::CANNOT_SEND_AFTER_SHUTDOWN)
    }

    fn disconnected(&self) -> Future<bool> {
        self.disconnection_future.clone()
    }

    /// fail everything still pending and resolve the disconnection future. Idempotent
    fn handle_disconnect(&mut self, ctx: &mut ActorContext, err_code: i32) -> Future<bool> {
        let Some(mut pipeline) = self.pipeline.take() else {
            debug!("connection has been closed, conSeq={}", self.seq);
            return Future::from_value(true);
        };

        if self.with_timeout {
            ctx.cancel_timer(&self.response_timer);
        }

        while let Some(promise) = pipeline.pop_front() {
            promise.set_failed(if err_code == 0 { codes::CONNECTION_REFUSED } else { err_code });
        }

        self.disconnection.set_value(true);
        Future::from_value(true)
    }

    /// raw write for the HTTP-kmsg encoding - fire and forget, no pipeline entry
    /// (the peer does not reply on the kmsg path)
    fn send_kmsg(&mut self, ctx: &mut ActorContext, bytes: Bytes) {
        if self.pipeline.is_none() || self.send_failed {
            warn!("kmsg send on closed connection, conSeq={}", self.seq);
            return;
        }
        if self.client.send_bytes(self.seq, bytes).is_err() {
            self.send_failed = true;
            self.handle_disconnect(ctx, codes::CONNECTION_REFUSED);
        }
    }
}

impl ActorBehavior for HttpConnectionActor {
    fn name(&self) -> String {
        format!("{}{}", CONNECT_PREFIX, self.seq)
    }

    fn finalize(&mut self, ctx: &mut ActorContext) {
        // a handle drop without explicit disconnect still releases the io side and
        // fails whatever is still pending
        self.client.close_link(self.seq);
        self.handle_disconnect(ctx, codes::CANNOT_SEND_AFTER_SHUTDOWN);
    }
}

/* #endregion connection actor */

/* #region connection handle ***********************************************************************************/

struct ConnectHandle {
    aid: Aid,
    hsys: ActorSystemHandle,
}

impl Drop for ConnectHandle {
    fn drop(&mut self) {
        debug!("http connection is destroying, aid={}", self.aid);
        let _ = self.hsys.terminate(&self.aid);
    }
}

/// reference-counted handle for an established client connection. The last clone
/// going away terminates the connection actor. Callers that need the connection to
/// outlive their scope (one-shot requests) capture a clone in a completion handler
/// of the disconnected future
#[derive(Clone)]
pub struct HttpConnect {
    inner: Arc<ConnectHandle>,
}

impl HttpConnect {
    fn create(client: &HttpClient, seq: i32, url: HttpUrl) -> litebus_actor::Result<HttpConnect> {
        let actor = HttpConnectionActor::new(seq, client.clone(), url);
        let aid = client.hsys().spawn(actor, true, true)?;
        Ok(HttpConnect { inner: Arc::new(ConnectHandle { aid, hsys: client.hsys().clone() }) })
    }

    /// queue a request on the pipeline. With `with_timeout` the configured per-request
    /// timer disconnects the whole connection when it fires
    pub fn launch_request(&self, request: Request, with_timeout: bool) -> Future<Response> {
        async_call_future::<HttpConnectionActor, Response, _>(&self.inner.hsys, &self.inner.aid, move |actor, ctx| {
            actor.launch_request(ctx, request, with_timeout)
        })
    }

    pub fn disconnect(&self) -> Future<bool> {
        async_call_future::<HttpConnectionActor, bool, _>(&self.inner.hsys, &self.inner.aid, |actor, ctx| {
            actor.disconnect(ctx)
        })
    }

    /// completes once the connection is gone (peer close, error, timeout or explicit
    /// disconnect)
    pub fn disconnected(&self) -> Future<bool> {
        async_call_future::<HttpConnectionActor, bool, _>(&self.inner.hsys, &self.inner.aid, |actor, _ctx| {
            actor.disconnected()
        })
    }

    pub(crate) fn send_kmsg(&self, bytes: Bytes) {
        async_call::<HttpConnectionActor, (), _>(&self.inner.hsys, &self.inner.aid, move |actor, ctx| {
            actor.send_kmsg(ctx, bytes);
        });
    }
}

/* #endregion connection handle */

/* #region one-shot requests ***********************************************************************************/

fn check_request_url(url: &HttpUrl) -> bool {
    if url.scheme.is_empty() {
        warn!("couldn't create http request with no scheme.");
        return false;
    }
    if url.scheme != HTTP_SCHEME && url.scheme != HTTPS_SCHEME {
        warn!("only support 'http' and 'https'");
        return false;
    }
    if url.scheme == HTTPS_SCHEME {
        warn!("couldn't create http request with 'https' while ssl is not enabled.");
        return false;
    }
    if url.host.is_empty() {
        warn!("couldn't create http request with no ip.");
        return false;
    }
    if url.port == 0 {
        warn!("couldn't create http request with no port.");
        return false;
    }
    true
}

/// connect, send one request, await the response and mark the connection for close.
/// Keep-alive requests must use the explicit [`HttpClient::connect`] +
/// [`HttpConnect::launch_request`] path instead
pub fn launch_request(client: &HttpClient, request: Request) -> Future<Response> {
    if !check_request_url(&request.url) {
        return Future::from_error(codes::INVALID_REQUEST);
    }
    if request.keep_alive {
        warn!("couldn't create keep-alive request normally.");
        return Future::from_error(codes::INVALID_REQUEST);
    }
    if let Some(v) = request.headers.get(header::CONNECTION) {
        if !v.to_str().map(|s| s.eq_ignore_ascii_case("close")).unwrap_or(false) {
            warn!("only 'Connection:close' is allowed in headers.");
            return Future::from_error(codes::INVALID_REQUEST);
        }
    }
    if !method_allowed(&request.method) {
        warn!("only 'POST GET PUT DELETE PATCH' are allowed.");
        return Future::from_error(codes::INVALID_REQUEST);
    }

    debug!("launch request, ip:{},port:{},path:{}", request.url.host, request.url.port, request.url.path);

    client.connect(&request.url).then_future(move |connect: &HttpConnect| {
        let response = connect.launch_request(request.clone(), true);

        // we must maintain a copy of the (reference-counted) connection handle until
        // the disconnection promise has been set
        let keep = connect.clone();
        connect.disconnected().on_complete(move |_| {
            let _ = &keep;
        });

        response
    })
}

/// one-shot POST
pub fn post(
    client: &HttpClient,
    url: &HttpUrl,
    headers: Option<HashMap<String, String>>,
    body: Option<Vec<u8>>,
    content_type: Option<String>,
    timeout_ms: Option<u64>,
) -> Future<Response> {
    if body.is_none() && content_type.is_some() {
        warn!("couldn't create post request with a content-type but no body.");
        return Future::from_error(codes::INVALID_REQUEST);
    }

    let mut request = Request::new(Method::POST, url.clone());
    apply_headers(&mut request, headers);

    if let Some(body) = body {
        request.body = body;
    }
    if let Some(ct) = content_type {
        if let Ok(v) = http::HeaderValue::from_str(&ct) {
            request.headers.insert(header::CONTENT_TYPE, v);
        }
    }
    request.timeout = Some(timeout_ms.unwrap_or_else(|| client.request_timeout()));

    launch_request(client, request)
}

/// one-shot GET
pub fn get(
    client: &HttpClient,
    url: &HttpUrl,
    headers: Option<HashMap<String, String>>,
    timeout_ms: Option<u64>,
) -> Future<Response> {
    let mut request = Request::new(Method::GET, url.clone());
    apply_headers(&mut request, headers);
    request.timeout = Some(timeout_ms.unwrap_or_else(|| client.request_timeout()));

    launch_request(client, request)
}

fn apply_headers(request: &mut Request, headers: Option<HashMap<String, String>>) {
    if let Some(headers) = headers {
        for (k, v) in headers {
            if let (Ok(name), Ok(value)) = (
                http::HeaderName::from_bytes(k.as_bytes()),
                http::HeaderValue::from_str(&v),
            ) {
                request.headers.insert(name, value);
            }
        }
    }
}

/* #endregion one-shot requests */
