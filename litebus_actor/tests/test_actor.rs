#![allow(unused)]

/// integration tests for the actor runtime.
/// run with "cargo test --test test_actor -- --nocapture"

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use litebus_actor::{
    add_timer, async_call, async_call_future, cancel_timer, defer, Aid, ActorBehavior, ActorContext, ActorError,
    ActorSystem, ActorSystemHandle, AsAnyActor, Message,
};
use litebus_async::{Future, Promise};
use litebus_timer::TimerService;

fn new_system(id: &str) -> (ActorSystem, Arc<TimerService>) {
    let timer = Arc::new(TimerService::new());
    timer.run().unwrap();
    let sys = ActorSystem::new(id, timer.clone());
    (sys, timer)
}

//--- test actors

struct Echo;

impl ActorBehavior for Echo {
    fn name(&self) -> String {
        "Echo".to_string()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<Echo, _>("ping", |_actor, ctx, msg| {
            ctx.send(&msg.from, "pong", msg.body).unwrap();
        });
    }
}

struct Client {
    received: Promise<String>,
}

impl ActorBehavior for Client {
    fn name(&self) -> String {
        "Client".to_string()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<Client, _>("pong", |actor, _ctx, msg| {
            actor.received.set_value(String::from_utf8_lossy(&msg.body).to_string());
        });
    }
}

struct Collector {
    expected: usize,
    bodies: Vec<String>,
    done: Promise<Vec<String>>,
}

impl ActorBehavior for Collector {
    fn name(&self) -> String {
        "Collector".to_string()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<Collector, _>("m", |actor, _ctx, msg| {
            actor.bodies.push(String::from_utf8_lossy(&msg.body).to_string());
            if actor.bodies.len() == actor.expected {
                actor.done.set_value(actor.bodies.clone());
            }
        });
    }
}

struct Counter {
    n: i32,
    finalized: Option<Promise<bool>>,
}

impl Counter {
    fn new() -> Self {
        Counter { n: 0, finalized: None }
    }
}

impl ActorBehavior for Counter {
    fn name(&self) -> String {
        "Counter".to_string()
    }

    fn finalize(&mut self, _ctx: &mut ActorContext) {
        if let Some(p) = self.finalized.take() {
            p.set_value(true);
        }
    }
}

//--- tests

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_local_echo() {
    println!("--- testing local echo");
    let (sys, timer) = new_system("echo-test");
    let hsys = sys.clone_handle();

    let echo = hsys.spawn(Echo, true, true).unwrap();

    let received = Promise::new();
    let result = received.future();
    let client = hsys.spawn(Client { received }, true, true).unwrap();

    hsys.send(&echo, Message::kmsg(client.clone(), echo.clone(), "ping", b"hello".to_vec()))
        .unwrap();

    assert_eq!(result.await, Ok("hello".to_string()));

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fifo_order() {
    println!("--- testing per-sender FIFO order");
    let (sys, timer) = new_system("fifo-test");
    let hsys = sys.clone_handle();

    let n = 200;
    let done = Promise::new();
    let result = done.future();
    let aid = hsys
        .spawn(Collector { expected: n, bodies: Vec::new(), done }, true, true)
        .unwrap();

    let from = Aid::new("test-sender");
    for i in 0..n {
        hsys.send(&aid, Message::kmsg(from.clone(), aid.clone(), "m", format!("{i}").into_bytes()))
            .unwrap();
    }

    let bodies = result.await.unwrap();
    let expected: Vec<String> = (0..n).map(|i| format!("{i}")).collect();
    assert_eq!(bodies, expected);

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_spawn_rejected() {
    let (sys, timer) = new_system("dup-test");
    let hsys = sys.clone_handle();

    hsys.spawn(Echo, true, true).unwrap();
    match hsys.spawn(Echo, true, true) {
        Err(ActorError::DuplicateActor(name)) => assert_eq!(name, "Echo"),
        other => panic!("expected DuplicateActor, got {other:?}"),
    }

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_send_errors() {
    let (sys, timer) = new_system("err-test");
    let hsys = sys.clone_handle();

    // unknown local name
    let nope = Aid::new("nope");
    match hsys.send(&nope, Message::kmsg(Aid::new("x"), nope.clone(), "m", Vec::new())) {
        Err(ActorError::ActorNotFound(_)) => {}
        other => panic!("expected ActorNotFound, got {other:?}"),
    }

    // remote protocol without a registered transport
    let remote = Aid::with_address("peer", "udp", "127.0.0.1", 9999);
    match hsys.send(&remote, Message::udp(Aid::new("x"), remote.clone(), "m", Vec::new())) {
        Err(ActorError::IoNotFound(proto)) => assert_eq!(proto, "udp"),
        other => panic!("expected IoNotFound, got {other:?}"),
    }

    // malformed recipient
    let anon = Aid::new("");
    match hsys.send(&anon, Message::kmsg(Aid::new("x"), anon.clone(), "m", Vec::new())) {
        Err(ActorError::ParamInvalid(_)) => {}
        other => panic!("expected ParamInvalid, got {other:?}"),
    }

    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_runnable_gating() {
    println!("--- testing pause/resume gating");
    let (sys, timer) = new_system("gate-test");
    let hsys = sys.clone_handle();

    let done = Promise::new();
    let result = done.future();

    // spawned held - enqueues continue but dispatch is gated
    let aid = hsys
        .spawn(Collector { expected: 1, bodies: Vec::new(), done }, true, false)
        .unwrap();

    hsys.send(&aid, Message::kmsg(Aid::new("s"), aid.clone(), "m", b"x".to_vec()))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(result.is_init()); // still held

    hsys.set_actor_status(&aid, true).unwrap();
    assert_eq!(result.await.unwrap(), vec!["x".to_string()]);

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminate_and_await() {
    println!("--- testing terminate/await");
    let (sys, timer) = new_system("term-test");
    let hsys = sys.clone_handle();

    let finalized = Promise::new();
    let fin = finalized.future();
    let mut counter = Counter::new();
    counter.finalized = Some(finalized);

    let aid = hsys.spawn(counter, true, true).unwrap();

    hsys.terminate(&aid).unwrap();
    hsys.await_actor(&aid).await;

    assert_eq!(fin.value(), Some(true)); // finalizer ran before the awaiter was released
    assert!(!hsys.has_actor("Counter"));

    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dedicated_thread_actor() {
    let (sys, timer) = new_system("thread-test");
    let hsys = sys.clone_handle();

    let aid = hsys.spawn(Counter::new(), false, true).unwrap();

    let f = async_call::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| {
        actor.n += 7;
        actor.n
    });
    assert_eq!(f.await, Ok(7));

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_call() {
    println!("--- testing async dispatch");
    let (sys, timer) = new_system("async-test");
    let hsys = sys.clone_handle();

    let aid = hsys.spawn(Counter::new(), true, true).unwrap();

    let f1 = async_call::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| {
        actor.n += 1;
        actor.n
    });
    let f2 = async_call::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| {
        actor.n += 1;
        actor.n
    });

    // dispatched in send order on the same target
    assert_eq!(f1.await, Ok(1));
    assert_eq!(f2.await, Ok(2));

    // future-returning member - the result is associated
    let f3 = async_call_future::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| Future::from_value(actor.n * 10));
    assert_eq!(f3.await, Ok(20));

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_call_unknown_actor_abandons() {
    let (sys, timer) = new_system("async-miss-test");
    let hsys = sys.clone_handle();

    let f = async_call::<Counter, i32, _>(&hsys, &Aid::new("ghost"), |actor, _ctx| actor.n);
    assert!(f.is_abandoned());
    assert!(f.is_init());

    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_defer_runs_on_actor() {
    println!("--- testing deferred continuation");
    let (sys, timer) = new_system("defer-test");
    let hsys = sys.clone_handle();

    let aid = hsys.spawn(Counter::new(), true, true).unwrap();

    let p: Promise<i32> = Promise::new();
    p.future().on_complete(defer::<Counter, i32, _>(&hsys, &aid, |actor, _ctx, ft| {
        actor.n = ft.value().unwrap_or(0);
    }));

    p.set_value(9);

    // the deferred thunk is FIFO-ordered before this read on the same actor
    let f = async_call::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| actor.n);
    assert_eq!(f.await, Ok(9));

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_actor_timer() {
    println!("--- testing actor-targeted timers");
    let (sys, timer) = new_system("timer-test");
    let hsys = sys.clone_handle();

    let aid = hsys.spawn(Counter::new(), true, true).unwrap();

    // fires - the callable runs on the actor task
    add_timer(&hsys, Duration::from_millis(40), &aid, |behavior, ctx| {
        if let Some(actor) = behavior.as_any_actor().downcast_mut::<Counter>() {
            actor.n = 42;
        }
    })
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let f = async_call::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| actor.n);
    assert_eq!(f.await, Ok(42));

    // canceled before fire - callable never runs, cancel is true exactly once
    let t = add_timer(&hsys, Duration::from_millis(500), &aid, |behavior, _ctx| {
        if let Some(actor) = behavior.as_any_actor().downcast_mut::<Counter>() {
            actor.n = -1;
        }
    })
    .unwrap();

    assert!(cancel_timer(&hsys, &t));
    assert!(!cancel_timer(&hsys, &t)); // second cancel fails

    tokio::time::sleep(Duration::from_millis(700)).await;
    let f = async_call::<Counter, i32, _>(&hsys, &aid, |actor, _ctx| actor.n);
    assert_eq!(f.await, Ok(42)); // unchanged

    hsys.terminate_all().await.unwrap();
    timer.shutdown();
}
