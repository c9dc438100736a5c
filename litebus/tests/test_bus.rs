#![allow(unused)]

/// end-to-end tests for the litebus facade: initialize/finalize, config handling and
/// remote kmsg echo between two bus instances over the framed TCP transport.
/// run with "cargo test --test test_bus -- --nocapture"

use litebus::{
    Aid, ActorBehavior, ActorContext, BusConfig, Future, Litebus, Message, Promise, Request, Response,
};
use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

/// grab an ephemeral port the OS considers free right now
fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

struct EchoActor;

impl ActorBehavior for EchoActor {
    fn name(&self) -> String {
        "Echo".to_string()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<EchoActor, _>("ping", |_actor, ctx, msg| {
            let _ = ctx.send(&msg.from, "pong", msg.body);
        });
    }
}

struct PongSink {
    received: Promise<String>,
}

impl ActorBehavior for PongSink {
    fn name(&self) -> String {
        "Client".to_string()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<PongSink, _>("pong", |actor, _ctx, msg| {
            actor.received.set_value(String::from_utf8_lossy(&msg.body).to_string());
        });
    }
}

#[test]
fn test_initialize_finalize() {
    let port = free_port();
    let bus = Litebus::initialize(BusConfig::new(format!("tcp://127.0.0.1:{port}"))).unwrap();

    assert_eq!(bus.address().host, "127.0.0.1");
    assert_eq!(bus.address().port, port);
    assert!(!bus.http_kmsg_flag());

    // the built-in SysManager actor is up
    assert!(bus.hsys().has_actor("SysManager"));

    bus.finalize();
}

#[test]
fn test_config_requires_bind_url() {
    assert!(Litebus::initialize(BusConfig::default()).is_err());
}

#[test]
fn test_local_roundtrip_via_facade() {
    let port = free_port();
    let bus = Litebus::initialize(BusConfig::new(format!("tcp://127.0.0.1:{port}"))).unwrap();

    let echo = bus.spawn(EchoActor, true, true).unwrap();

    let received = Promise::new();
    let result = received.future();
    let client = bus.spawn(PongSink { received }, true, true).unwrap();

    bus.send(&echo, Message::kmsg(client.clone(), echo.clone(), "ping", b"local".to_vec()))
        .unwrap();

    assert_eq!(result.get_timeout(5000), Some("local".to_string()));
    bus.finalize();
}

#[test]
fn test_remote_kmsg_echo() {
    println!("--- testing remote echo between two bus instances");
    let port_a = free_port();
    let port_b = free_port();

    let bus_a = Litebus::initialize(BusConfig::new(format!("tcp://127.0.0.1:{port_a}"))).unwrap();
    let bus_b = Litebus::initialize(BusConfig::new(format!("tcp://127.0.0.1:{port_b}"))).unwrap();

    // Echo lives on bus B, the requester on bus A
    bus_b.spawn(EchoActor, true, true).unwrap();

    let received = Promise::new();
    let result = received.future();
    let client_aid = bus_a.spawn(PongSink { received }, true, true).unwrap();

    // the spawned Aid carries bus A's advertise address, so Echo's reply finds its
    // way back over the wire
    assert!(client_aid.is_ok());

    let remote_echo = Aid::with_address("Echo", "tcp", "127.0.0.1", port_b);
    bus_a
        .send(&remote_echo, Message::kmsg(client_aid.clone(), remote_echo.clone(), "ping", b"remote".to_vec()))
        .unwrap();

    assert_eq!(result.get_timeout(10_000), Some("remote".to_string()));

    bus_a.finalize();
    bus_b.finalize();
}

#[test]
fn test_http_rpc_through_facade() {
    println!("--- testing http rpc on the multiplexed bind port");
    let port = free_port();
    let bus = Litebus::initialize(BusConfig::new(format!("tcp://127.0.0.1:{port}"))).unwrap();

    let api = litebus::HttpActor::new("API").with_route("/v1", |_req: &Request| {
        Future::from_value(Response::ok_text("hello"))
    });
    bus.spawn(api, true, true).unwrap();
    bus.set_delegate("API");

    let url = litebus::HttpUrl::new("http", "127.0.0.1", port, "/v1");
    let response = bus
        .block_on(litebus_http::get(bus.client(), &url, None, Some(5000)))
        .expect("get failed");
    assert_eq!(response.code.as_u16(), 200);
    assert_eq!(response.body, b"hello");

    bus.finalize();
}

#[test]
fn test_env_overrides() {
    // malformed values are ignored, valid ones win
    unsafe {
        std::env::set_var("LITEBUS_THREADS", "2");
        std::env::set_var("LITEBUS_LINK_RECYCLE_PERIOD", "not-a-number");
    }

    let mut config = BusConfig::new("tcp://127.0.0.1:1");
    config.apply_env();
    assert_eq!(config.thread_count, Some(2));
    assert_eq!(config.link_recycle_ms, None);

    unsafe {
        std::env::remove_var("LITEBUS_THREADS");
        std::env::remove_var("LITEBUS_LINK_RECYCLE_PERIOD");
    }
}
