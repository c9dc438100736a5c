#![allow(unused)]

/// unit tests for the future/promise core.
/// run with "cargo test --test test_future -- --nocapture"

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use litebus_async::{collect, Future, Promise, Status};
use litebus_timer::TimerService;

#[test]
fn test_set_value_and_get() {
    let p: Promise<i32> = Promise::new();
    let f = p.future();

    assert!(f.is_init());
    assert!(!f.is_abandoned());

    p.set_value(42);
    assert!(f.is_ok());
    assert_eq!(f.get(), Some(42));
    assert_eq!(f.error_code(), 0);
}

#[test]
fn test_terminal_state_is_idempotent() {
    let p: Promise<i32> = Promise::new();
    let f = p.future();

    p.set_value(1);
    p.set_value(2); // no-op
    p.set_failed(99); // no-op
    assert_eq!(f.get(), Some(1));

    let p: Promise<i32> = Promise::new();
    let f = p.future();
    p.set_failed(53);
    p.set_value(7); // no-op
    assert!(f.is_error());
    assert_eq!(f.error_code(), 53);
    assert_eq!(f.get(), None);
}

#[test]
fn test_then_chain() {
    println!("--- testing then chain");
    let p: Promise<i32> = Promise::new();
    let f = p.future().then(|x| x + 1).then(|x| x * 2);

    p.set_value(3);
    assert!(f.is_ok());
    assert_eq!(f.get(), Some(8));
}

#[test]
fn test_then_error_short_circuit() {
    let invoked = Arc::new(AtomicBool::new(false));
    let invoked2 = invoked.clone();

    let p: Promise<i32> = Promise::new();
    let f = p.future().then(move |x| {
        invoked2.store(true, Ordering::SeqCst);
        x + 1
    });

    p.set_failed(110);
    assert!(f.is_error());
    assert_eq!(f.error_code(), 110); // same code downstream
    assert!(!invoked.load(Ordering::SeqCst)); // continuation not invoked
}

#[test]
fn test_then_future() {
    let p: Promise<i32> = Promise::new();
    let f = p.future().then_future(|x| Future::from_value(x * 10));

    p.set_value(4);
    assert_eq!(f.get(), Some(40));

    // future-returning continuation that itself fails
    let p: Promise<i32> = Promise::new();
    let f = p.future().then_future(|_| Future::<i32>::from_error(111));
    p.set_value(1);
    assert!(f.is_error());
    assert_eq!(f.error_code(), 111);
}

#[test]
fn test_association_symmetry() {
    println!("--- testing association");
    let a: Promise<String> = Promise::new();
    let b: Promise<String> = Promise::new();
    let fa = a.future();

    a.associate(&b.future());

    // an associated promise no longer fulfills its own future directly
    a.set_value("ignored".to_string());
    assert!(fa.is_init());

    b.set_value("driven".to_string());
    assert_eq!(fa.get(), Some("driven".to_string()));
}

#[test]
fn test_association_error_mirror() {
    let a: Promise<i32> = Promise::new();
    let b: Promise<i32> = Promise::new();
    let fa = a.future();

    a.associate(&b.future());
    b.set_failed(104);

    assert!(fa.is_error());
    assert_eq!(fa.error_code(), 104);
}

#[test]
fn test_abandonment() {
    println!("--- testing abandonment");
    let abandoned = Arc::new(AtomicUsize::new(0));
    let abandoned2 = abandoned.clone();

    let f = {
        let p: Promise<i32> = Promise::new();
        let f = p.future();
        f.on_abandoned(move |_| {
            abandoned2.fetch_add(1, Ordering::SeqCst);
        });
        f
        // last producer dropped without a value
    };

    assert!(f.is_abandoned());
    assert!(f.is_init()); // abandoned futures stay INIT status-wise
    assert_eq!(abandoned.load(Ordering::SeqCst), 1);

    // registering on an already abandoned future fires immediately
    let late = Arc::new(AtomicUsize::new(0));
    let late2 = late.clone();
    f.on_abandoned(move |_| {
        late2.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(late.load(Ordering::SeqCst), 1);
}

#[test]
fn test_abandonment_propagates_through_then() {
    let chained = {
        let p: Promise<i32> = Promise::new();
        p.future().then(|x| x + 1)
    };
    assert!(chained.is_abandoned());
}

#[test]
fn test_callback_on_terminal_future_runs_inline() {
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Future::from_value(5);

    let hits2 = hits.clone();
    f.on_complete(move |ft| {
        assert_eq!(ft.value(), Some(5));
        hits2.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_wait_for_zero() {
    let p: Promise<i32> = Promise::new();
    let f = p.future();

    assert!(f.wait_for(0).is_error()); // not terminal yet

    p.set_value(1);
    assert!(f.wait_for(0).is_ok()); // already terminal
}

#[test]
fn test_wait_across_threads() {
    let p: Promise<i32> = Promise::new();
    let f = p.future();

    let t = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        p.set_value(11);
    });

    assert!(f.wait_for(2000).is_ok());
    assert_eq!(f.value(), Some(11));
    t.join().unwrap();
}

#[test]
fn test_get_timeout() {
    let p: Promise<i32> = Promise::new();
    let f = p.future();
    assert_eq!(f.get_timeout(20), None);

    p.set_value(3);
    assert_eq!(f.get_timeout(20), Some(3));
}

#[test]
fn test_callbacks_fire_in_registration_order() {
    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    let p: Promise<i32> = Promise::new();
    let f = p.future();
    for tag in 1..=3u32 {
        let order = order.clone();
        f.on_complete(move |_| {
            order.lock().unwrap().push(tag);
        });
    }

    p.set_value(0);
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_associate_with_terminal_future() {
    // associating with an already completed future mirrors it immediately
    let a: Promise<i32> = Promise::new();
    let fa = a.future();
    a.associate(&Future::from_value(17));
    assert_eq!(fa.value(), Some(17));

    let b: Promise<i32> = Promise::new();
    let fb = b.future();
    b.associate(&Future::from_error(53));
    assert_eq!(fb.error_code(), 53);
}

#[test]
fn test_associate_abandonment_mirror() {
    // abandonment of the driving future abandons the associated one, even though it
    // still has a live promise
    let a: Promise<i32> = Promise::new();
    let fa = a.future();

    {
        let b: Promise<i32> = Promise::new();
        a.associate(&b.future());
        // b dropped without value
    }

    assert!(fa.is_abandoned());
    drop(a);
}

#[test]
fn test_collect_order() {
    println!("--- testing collect");
    let promises: Vec<Promise<i32>> = (0..5).map(|_| Promise::new()).collect();
    let futures: Vec<Future<i32>> = promises.iter().map(|p| p.future()).collect();

    let all = collect(&futures);

    // complete out of order, expect input order in the result
    for idx in [3usize, 0, 4, 1, 2] {
        assert!(all.is_init());
        promises[idx].set_value(idx as i32 * 10);
    }

    assert_eq!(all.get(), Some(vec![0, 10, 20, 30, 40]));
}

#[test]
fn test_collect_first_error() {
    let promises: Vec<Promise<i32>> = (0..3).map(|_| Promise::new()).collect();
    let futures: Vec<Future<i32>> = promises.iter().map(|p| p.future()).collect();

    let all = collect(&futures);
    promises[0].set_value(1);
    promises[2].set_failed(48);
    assert!(all.is_error());
    assert_eq!(all.error_code(), 48);
}

#[test]
fn test_collect_empty() {
    let all: Future<Vec<i32>> = collect(&[]);
    assert_eq!(all.get(), Some(Vec::new()));
}

#[test]
fn test_collect_abandoned_input() {
    let keep: Promise<i32> = Promise::new();
    let all = {
        let dropped: Promise<i32> = Promise::new();
        collect(&[keep.future(), dropped.future()])
        // `dropped` goes away without a value
    };
    assert!(all.is_abandoned());
    keep.set_value(1); // too late to matter
    assert!(all.is_init());
}

#[tokio::test]
async fn test_after_rescue_fires() {
    println!("--- testing after (rescue path)");
    let timers = Arc::new(TimerService::new());
    timers.run().unwrap();

    let p: Promise<i32> = Promise::new();
    let f = p.future().after(Duration::from_millis(100), &timers, |_| Future::from_value(42));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(f.value(), Some(42));

    drop(p); // upstream never resolved
    timers.shutdown();
}

#[tokio::test]
async fn test_after_upstream_wins() {
    println!("--- testing after (upstream path)");
    let timers = Arc::new(TimerService::new());
    timers.run().unwrap();

    let rescued = Arc::new(AtomicBool::new(false));
    let rescued2 = rescued.clone();

    let p: Promise<i32> = Promise::new();
    let f = p.future().after(Duration::from_millis(300), &timers, move |_| {
        rescued2.store(true, Ordering::SeqCst);
        Future::from_value(42)
    });

    p.set_value(7);
    assert_eq!(f.get(), Some(7));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(f.value(), Some(7));
    assert!(!rescued.load(Ordering::SeqCst)); // rescue never invoked

    timers.shutdown();
}

#[tokio::test]
async fn test_std_future_await() {
    let p: Promise<i32> = Promise::new();
    let f = p.future();

    let waiter = tokio::spawn(async move { f.await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    p.set_value(99);

    assert_eq!(waiter.await.unwrap(), Ok(99));
}

#[tokio::test]
async fn test_std_future_await_abandoned() {
    let f = {
        let p: Promise<i32> = Promise::new();
        p.future()
    };
    let res = f.await;
    assert!(res.is_err());
}
