#![allow(unused)]

/// unit tests for actor addressing.
/// run with "cargo test --test test_aid -- --nocapture"

use litebus_actor::{Aid, Message, MAX_KMSG_NAME_LEN};

#[test]
fn test_local_aid() {
    let aid = Aid::new("worker");
    assert_eq!(aid.name(), "worker");
    assert_eq!(aid.protocol(), "tcp");
    assert!(!aid.is_ok()); // no transport address
    assert_eq!(aid.to_string(), "worker");
}

#[test]
fn test_parse_forms() {
    println!("--- testing aid string forms");

    let aid = Aid::parse("worker").unwrap();
    assert!(!aid.is_ok());

    let aid = Aid::parse("worker@10.0.0.1:2225").unwrap();
    assert!(aid.is_ok());
    assert_eq!(aid.protocol(), "tcp"); // protocol defaulted
    assert_eq!(aid.host(), "10.0.0.1");
    assert_eq!(aid.port(), 2225);
    assert_eq!(aid.to_string(), "worker@10.0.0.1:2225");

    let aid = Aid::parse("worker@http://10.0.0.1:8080").unwrap();
    assert_eq!(aid.protocol(), "http");
    assert_eq!(aid.to_string(), "worker@http://10.0.0.1:8080");

    // bracketed IPv6 endpoint
    let aid = Aid::parse("worker@[::1]:9000").unwrap();
    assert_eq!(aid.host(), "::1");
    assert_eq!(aid.url(), "[::1]:9000");
}

#[test]
fn test_parse_roundtrip() {
    for s in ["a", "a@1.2.3.4:5", "a@udp://1.2.3.4:5"] {
        let aid = Aid::parse(s).unwrap();
        assert_eq!(aid.to_string(), s);
        assert_eq!(Aid::parse(&aid.to_string()).unwrap(), aid);
    }
}

#[test]
fn test_parse_errors() {
    assert!(Aid::parse("").is_err());
    assert!(Aid::parse("@h:1").is_err()); // empty name
    assert!(Aid::parse("a@").is_err()); // missing endpoint
    assert!(Aid::parse("a@h").is_err()); // missing port
    assert!(Aid::parse("a@h:0").is_err()); // port 0
    assert!(Aid::parse("a@://h:1").is_err()); // empty protocol
}

#[test]
fn test_equality_and_order() {
    println!("--- testing aid value semantics");

    let a = Aid::with_address("a", "tcp", "h", 1);
    let b = Aid::with_address("a", "tcp", "h", 1);
    assert_eq!(a, b);

    // equality is over the full tuple
    assert_ne!(a, Aid::with_address("a", "tcp", "h", 2));
    assert_ne!(a, Aid::with_address("a", "udp", "h", 1));
    assert_ne!(a, Aid::new("a"));

    // ordering is lexicographic over the tuple, name first
    let mut aids = vec![
        Aid::with_address("b", "tcp", "h", 1),
        Aid::with_address("a", "tcp", "h", 2),
        Aid::with_address("a", "tcp", "h", 1),
    ];
    aids.sort();
    assert_eq!(aids[0].name(), "a");
    assert_eq!(aids[0].port(), 1);
    assert_eq!(aids[2].name(), "b");
}

#[test]
fn test_message_caps() {
    let from = Aid::with_address("a", "tcp", "h", 1);
    let to = Aid::with_address("b", "tcp", "h", 2);

    assert!(Message::kmsg(from.clone(), to.clone(), "m", vec![0u8; 64]).within_caps());

    let long_name = "x".repeat(MAX_KMSG_NAME_LEN + 1);
    assert!(!Message::kmsg(from, to, long_name, Vec::new()).within_caps());
}
