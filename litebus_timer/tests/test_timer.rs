#![allow(unused)]

/// unit tests for the timer service.
/// run with "cargo test --test test_timer -- --nocapture"

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use litebus_timer::{Timer, TimerService};

#[tokio::test]
async fn test_fire_order() {
    println!("--- testing fire order");
    let service = TimerService::new();
    service.run().unwrap();

    let fired: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    // schedule out of order, expect deadline order
    for (delay_ms, tag) in [(120u64, 3u32), (40, 1), (80, 2)] {
        let fired = fired.clone();
        service
            .schedule(Duration::from_millis(delay_ms), move || {
                fired.lock().unwrap().push(tag);
            })
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(*fired.lock().unwrap(), vec![1, 2, 3]);

    service.shutdown();
}

#[tokio::test]
async fn test_cancel_before_fire() {
    println!("--- testing cancel before fire");
    let service = TimerService::new();
    service.run().unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let ran2 = ran.clone();
    let timer = service
        .schedule(Duration::from_millis(200), move || {
            ran2.store(true, Ordering::SeqCst);
        })
        .unwrap();

    assert!(service.is_pending(&timer));
    assert!(service.cancel(&timer)); // still pending - cancel succeeds
    assert!(!service.is_pending(&timer));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!ran.load(Ordering::SeqCst)); // and the action never ran

    service.shutdown();
}

#[tokio::test]
async fn test_cancel_after_fire() {
    println!("--- testing cancel after fire");
    let service = TimerService::new();
    service.run().unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let count2 = count.clone();
    let timer = service
        .schedule(Duration::from_millis(20), move || {
            count2.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!service.cancel(&timer)); // already fired - advisory cancel fails

    service.shutdown();
}

#[tokio::test]
async fn test_zero_delay_and_none_handle() {
    println!("--- testing zero delay");
    let service = TimerService::new();
    service.run().unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let ran2 = ran.clone();
    service
        .schedule(Duration::ZERO, move || {
            ran2.store(true, Ordering::SeqCst);
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ran.load(Ordering::SeqCst));

    assert!(!service.cancel(&Timer::none()));
    assert!(Timer::none().is_none());

    service.shutdown();
}

#[test]
fn test_not_running() {
    let service = TimerService::new();
    assert!(service.schedule(Duration::from_millis(10), || {}).is_err());
}
