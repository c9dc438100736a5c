#![allow(unused)]

/// unit tests for endpoint/bind-url parsing and the ring deque.
/// run with "cargo test --test test_net -- --nocapture"

use litebus_common::collections::RingBuffer;
use litebus_common::net::{parse_bind_url, parse_endpoint};

#[test]
fn test_endpoint() {
    println!("--- testing endpoint parsing");

    assert_eq!(parse_endpoint("127.0.0.1:2225").unwrap(), ("127.0.0.1".to_string(), 2225));
    assert_eq!(parse_endpoint("localhost:80").unwrap(), ("localhost".to_string(), 80));
    assert_eq!(parse_endpoint("[::1]:8080").unwrap(), ("::1".to_string(), 8080));
    assert_eq!(
        parse_endpoint("[fe80::1%eth0]:443").unwrap(),
        ("fe80::1%eth0".to_string(), 443)
    );

    assert!(parse_endpoint("127.0.0.1").is_err()); // no port
    assert!(parse_endpoint(":80").is_err()); // empty host
    assert!(parse_endpoint("h:").is_err()); // empty port
    assert!(parse_endpoint("h:0").is_err()); // port 0
    assert!(parse_endpoint("h:65536").is_err()); // port out of range
    assert!(parse_endpoint("[::1]8080").is_err()); // missing ':' after bracket
}

#[test]
fn test_bind_url() {
    println!("--- testing bind url parsing");

    assert_eq!(
        parse_bind_url("tcp://127.0.0.1:2225").unwrap(),
        ("tcp".to_string(), "127.0.0.1".to_string(), 2225)
    );
    assert_eq!(
        parse_bind_url("http://0.0.0.0:8080").unwrap(),
        ("http".to_string(), "0.0.0.0".to_string(), 8080)
    );
    assert_eq!(
        parse_bind_url("udp://[::]:9000").unwrap(),
        ("udp".to_string(), "::".to_string(), 9000)
    );

    // bare host:port defaults to tcp
    assert_eq!(
        parse_bind_url("127.0.0.1:2225").unwrap(),
        ("tcp".to_string(), "127.0.0.1".to_string(), 2225)
    );

    assert!(parse_bind_url("://h:1").is_err());
    assert!(parse_bind_url("tcp://h").is_err());
}

#[test]
fn test_ringbuffer() {
    println!("--- testing ringbuffer push");
    let mut ring: RingBuffer<usize> = RingBuffer::new(3);

    assert_eq!(ring.push(1), None);
    assert_eq!(ring.push(2), None);
    assert_eq!(ring.push(3), None);
    assert_eq!(ring.push(4), Some(1)); // wrapped - oldest dropped
    assert_eq!(ring.push(5), Some(2));

    assert_eq!(vec![3, 4, 5], ring.to_vec());
    assert_eq!(vec![&5, &4, &3], ring.iter_newest_first().collect::<Vec<_>>());
}
