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

//! the litebus facade: process configuration, runtime bootstrap and the top-level
//! lifecycle (initialize/finalize). A [`Litebus`] instance owns the worker pool (a
//! tokio multi-thread runtime), the timer service, the actor system and the network
//! transports, and multiplexes http and the framed kmsg protocol on the configured
//! bind endpoint.
//!
//! ```no_run
//! use litebus::{BusConfig, Litebus};
//!
//! let bus = Litebus::initialize(BusConfig::new("tcp://127.0.0.1:2225")).unwrap();
//! // ... spawn actors, send messages ...
//! bus.finalize();
//! ```

use std::{future::Future as StdFuture, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt};

pub mod errors;
pub use errors::{BusError, Result};

mod config;
pub use config::{BusConfig, SslConfig};

pub use litebus_actor::{
    async_call, async_call_future, defer, Aid, ActorBehavior, ActorContext, ActorError, ActorSystem,
    ActorSystemHandle, BusAddress, Message, MessageKind, Transport,
};
pub use litebus_async::{collect, Future, Promise, Status};
pub use litebus_http::{
    codes, HttpActor, HttpClient, HttpConnect, HttpMsg, HttpServer, HttpUrl, LogControl, Request, Response,
    SysManager, TcpTransport, SYSMGR_ACTOR_NAME,
};
pub use litebus_timer::{Timer, TimerService};

use litebus_common::{env::thread_label, net::parse_bind_url, process};

const DEFAULT_THREAD_COUNT: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 90_000;

/// the owning handle of one litebus process instance
pub struct Litebus {
    runtime: Option<tokio::runtime::Runtime>,
    system: ActorSystem,
    hsys: ActorSystemHandle,
    timer: Arc<TimerService>,
    client: HttpClient,
    server: HttpServer,
    transport: TcpTransport,
    address: BusAddress,
    log: Arc<LogControl>,
}

impl Litebus {
    /// bring the bus up: build the worker pool, start the timer service, the actor
    /// system and the transports, bind the configured endpoint and spawn the built-in
    /// SysManager actor
    pub fn initialize(mut config: BusConfig) -> Result<Litebus> {
        config.apply_env();

        if config.tcp_bind_url.is_empty() {
            return Err(errors::config_error("tcp-bind-url is required (or LITEBUS_IP/LITEBUS_PORT)"));
        }

        let (_, bind_host, bind_port) = parse_bind_url(&config.tcp_bind_url)?;
        let (adv_host, adv_port) = match &config.tcp_advertise_url {
            Some(url) => {
                let (_, host, port) = parse_bind_url(url)?;
                (host, port)
            }
            None => (bind_host.clone(), bind_port),
        };

        let threads = config.thread_count.unwrap_or(DEFAULT_THREAD_COUNT).max(1);
        let label = thread_label("LITEBUS_THREAD_NAME", "litebus");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(label)
            .enable_all()
            .build()?;

        let log = init_tracing();

        let guard = runtime.enter();

        let timer = Arc::new(TimerService::new());
        timer.run()?;

        let system = ActorSystem::new("litebus", timer.clone());
        let hsys = system.clone_handle();

        let address = BusAddress::new("tcp", &adv_host, adv_port);
        hsys.set_address(address.clone());
        hsys.set_address(BusAddress::new("http", &adv_host, adv_port));

        let client = HttpClient::new(hsys.clone());
        client.set_request_timeout(config.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS));

        let server = HttpServer::new(hsys.clone(), BusAddress::new("http", &adv_host, adv_port), config.link_recycle_ms);
        server.start_recycler();

        let transport = TcpTransport::new(hsys.clone());
        transport.set_http_client(client.clone());
        hsys.register_transport("tcp", Arc::new(transport.clone()));
        hsys.register_transport("http", Arc::new(transport.clone()));

        if let Some(udp_url) = &config.udp_bind_url {
            // the datagram transport comes from an external collaborator and is not
            // part of this build - sends to udp:// surface IoNotFound
            warn!("udp transport not available, ignoring udp-bind-url {}", udp_url);
        }

        hsys.spawn(SysManager::new(log.clone()), true, true)?;

        drop(guard);

        // one listener serves both protocols: a frame header starts with a zero
        // length byte, an http request line never does
        let listener = runtime.block_on(TcpListener::bind((bind_host.as_str(), bind_port)))?;
        info!("litebus listening on {}:{} (advertising {}:{})", bind_host, bind_port, adv_host, adv_port);
        runtime.spawn(serve_dual(listener, server.clone(), transport.clone()));

        Ok(Litebus { runtime: Some(runtime), system, hsys, timer, client, server, transport, address, log })
    }

    fn rt(&self) -> &tokio::runtime::Runtime {
        self.runtime.as_ref().expect("litebus already finalized")
    }

    pub fn address(&self) -> &BusAddress {
        &self.address
    }

    pub fn hsys(&self) -> &ActorSystemHandle {
        &self.hsys
    }

    pub fn timer(&self) -> &Arc<TimerService> {
        &self.timer
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn server(&self) -> &HttpServer {
        &self.server
    }

    pub fn transport(&self) -> &TcpTransport {
        &self.transport
    }

    /// spawn an actor on the shared worker pool (or a private thread)
    pub fn spawn<B: ActorBehavior>(&self, behavior: B, shared_thread: bool, start: bool) -> Result<Aid> {
        let _guard = self.rt().enter();
        Ok(self.hsys.spawn(behavior, shared_thread, start)?)
    }

    pub fn send(&self, to: &Aid, msg: Message) -> Result<()> {
        let _guard = self.rt().enter();
        Ok(self.hsys.send(to, msg)?)
    }

    pub fn terminate(&self, aid: &Aid) -> Result<()> {
        Ok(self.hsys.terminate(aid)?)
    }

    /// block until the actor has drained to Terminate and finalized
    pub fn await_actor(&self, aid: &Aid) {
        self.hsys.await_actor_blocking(aid);
    }

    pub fn set_actor_status(&self, aid: &Aid, running: bool) -> Result<()> {
        Ok(self.hsys.set_actor_status(aid, running)?)
    }

    /// the process-wide fallback actor for http requests matching no other actor
    pub fn set_delegate(&self, delegate: impl ToString) {
        self.hsys.set_delegate(delegate);
    }

    pub fn delegate(&self) -> String {
        self.hsys.delegate()
    }

    /// switch remote KMSG emission between the framed TCP protocol and HTTP-kmsg
    pub fn set_http_kmsg_flag(&self, enabled: bool) {
        self.transport.set_http_kmsg(enabled);
    }

    pub fn http_kmsg_flag(&self) -> bool {
        self.transport.http_kmsg()
    }

    /// run a future to completion on the bus runtime (for callers outside of it)
    pub fn block_on<F: StdFuture>(&self, fut: F) -> F::Output {
        self.rt().block_on(fut)
    }

    /// terminate all actors and wait for them to finish
    pub fn terminate_all(&self) -> Result<()> {
        self.rt().block_on(self.hsys.terminate_all())?;
        Ok(())
    }

    /// request termination on ctrl-c instead of bluntly exiting
    pub fn terminate_on_ctrlc(&self) {
        self.system.terminate_on_ctrlc();
    }

    /// orderly shutdown: drain the actors, stop transports and timer, tear down the
    /// worker pool. Idempotent through Drop
    pub fn finalize(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = runtime.block_on(self.hsys.terminate_all());
            self.server.stop();
            self.transport.stop();
            self.timer.shutdown();
            runtime.shutdown_timeout(Duration::from_secs(5));
            info!("litebus finalized");
        }
    }
}

impl Drop for Litebus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// install the process subscriber with a reloadable level filter so that SysManager
/// can toggle verbosity for a bounded period. If another subscriber is already
/// installed (tests, embedding applications) the toggle becomes a no-op
fn init_tracing() -> Arc<LogControl> {
    let (filter, handle) = reload::Layer::new(LevelFilter::INFO);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        Arc::new(LogControl::new(LevelFilter::INFO, move |level| {
            let _ = handle.reload(level);
        }))
    } else {
        Arc::new(LogControl::noop())
    }
}

/// accept loop that sniffs the first byte to route a connection: frame headers start
/// with a zero byte (the name length high byte), http request lines with an ASCII
/// method character
async fn serve_dual(listener: TcpListener, server: HttpServer, transport: TcpTransport) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let server = server.clone();
                let transport = transport.clone();
                tokio::spawn(async move {
                    let mut first = [0u8; 1];
                    match stream.peek(&mut first).await {
                        Ok(n) if n > 0 => {
                            if first[0] == 0 {
                                transport.serve_stream(stream, peer.to_string());
                            } else {
                                server.serve_stream(stream, peer.to_string());
                            }
                        }
                        _ => {} // peer went away before sending anything
                    }
                });
            }
            Err(e) => warn!("accept failed: {}", e),
        }
    }
}
