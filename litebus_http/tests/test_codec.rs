#![allow(unused)]

/// unit tests for the h1 and frame codecs.
/// run with "cargo test --test test_codec -- --nocapture"

use http::{header, HeaderValue, Method, StatusCode};
use litebus_actor::{Aid, Message, MAX_KMSG_NAME_LEN};
use litebus_http::{
    encode_frame, encode_kmsg_request, encode_request, encode_response, FrameDecoder, HttpUrl, Request,
    RequestDecoder, Response, ResponseDecoder,
};

#[test]
fn test_request_roundtrip() {
    println!("--- testing request encode/decode roundtrip");

    let mut url = HttpUrl::new("http", "127.0.0.1", 8080, "/Echo/run");
    url.query.insert("k".to_string(), "v 1".to_string());

    let mut request = Request::post(url, b"payload bytes".to_vec()).with_keep_alive(true);
    request.headers.insert("x-custom", HeaderValue::from_static("yes"));

    let bytes = encode_request(&request);

    let mut decoder = RequestDecoder::new(None);
    let decoded = decoder.decode(&bytes);
    assert_eq!(decoded.len(), 1);
    assert!(!decoder.failed());

    let got = &decoded[0];
    assert_eq!(got.method, Method::POST);
    assert_eq!(got.url.path, "/Echo/run");
    assert_eq!(got.url.query.get("k"), Some(&"v 1".to_string()));
    assert_eq!(got.body, b"payload bytes");
    assert!(got.keep_alive);

    // header lookup is case-insensitive
    assert_eq!(got.headers.get("X-CUSTOM"), Some(&HeaderValue::from_static("yes")));
}

#[test]
fn test_pipelined_requests_in_one_feed() {
    println!("--- testing pipelined decode");

    let r1 = encode_request(&Request::get(HttpUrl::new("http", "h", 1, "/a")).with_keep_alive(true));
    let r2 = encode_request(&Request::post(HttpUrl::new("http", "h", 1, "/b"), b"x".to_vec()).with_keep_alive(true));

    let mut all = Vec::new();
    all.extend_from_slice(&r1);
    all.extend_from_slice(&r2);

    let mut decoder = RequestDecoder::new(None);
    let decoded = decoder.decode(&all);
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].url.path, "/a");
    assert_eq!(decoded[1].url.path, "/b");
}

#[test]
fn test_incremental_feed() {
    println!("--- testing byte-wise decode");

    let bytes = encode_request(&Request::post(HttpUrl::new("http", "h", 1, "/inc"), b"body".to_vec()));

    let mut decoder = RequestDecoder::new(None);
    let mut decoded = Vec::new();
    for b in bytes.iter() {
        decoded.extend(decoder.decode(std::slice::from_ref(b)));
    }
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].body, b"body");
}

#[test]
fn test_parse_failure_is_sticky() {
    let mut decoder = RequestDecoder::new(None);
    let decoded = decoder.decode(b"NOT A REQUEST\r\n\r\n");
    assert!(decoded.is_empty());
    assert!(decoder.failed());

    // once failed, later (even valid) bytes are ignored
    let bytes = encode_request(&Request::get(HttpUrl::new("http", "h", 1, "/ok")));
    assert!(decoder.decode(&bytes).is_empty());
}

#[test]
fn test_response_roundtrip() {
    println!("--- testing response encode/decode roundtrip");

    let response = Response::ok_text("hello back");
    let bytes = encode_response(&response, true);

    let mut decoder = ResponseDecoder::new();
    let decoded = decoder.decode(&bytes);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].code, StatusCode::OK);
    assert_eq!(decoded[0].body, b"hello back");
    assert_eq!(
        decoded[0].headers.get(header::CONNECTION),
        Some(&HeaderValue::from_static("Keep-Alive"))
    );

    // a non-keep-alive request always gets close
    let bytes = encode_response(&Response::ok(), false);
    let mut decoder = ResponseDecoder::new();
    let decoded = decoder.decode(&bytes);
    assert_eq!(decoded[0].headers.get(header::CONNECTION), Some(&HeaderValue::from_static("close")));
}

#[test]
fn test_kmsg_request_chunked() {
    println!("--- testing http-kmsg encode/decode");

    let from = Aid::with_address("Sender", "tcp", "10.0.0.1", 2000);
    let to = Aid::with_address("Receiver", "http", "10.0.0.2", 2001);
    let msg = Message::kmsg(from, to, "hello", b"kmsg body".to_vec()).with_signature(b"sig".to_vec());

    let bytes = encode_kmsg_request(&msg);

    let mut decoder = RequestDecoder::new(None);
    let decoded = decoder.decode(&bytes);
    assert_eq!(decoded.len(), 1);

    let got = &decoded[0];
    assert_eq!(got.method, Method::POST);
    assert_eq!(got.url.path, "/Receiver/hello");
    assert_eq!(got.body, b"kmsg body");
    assert_eq!(
        got.headers.get("Litebus-From").and_then(|v| v.to_str().ok()),
        Some("Sender@10.0.0.1:2000")
    );
    assert_eq!(
        got.headers.get(header::AUTHORIZATION),
        Some(&HeaderValue::from_static("sig"))
    );
}

#[test]
fn test_empty_chunked_body() {
    let from = Aid::with_address("S", "tcp", "h", 1);
    let to = Aid::with_address("R", "tcp", "h", 2);
    let msg = Message::kmsg(from, to, "ping", Vec::new());

    let bytes = encode_kmsg_request(&msg);
    let mut decoder = RequestDecoder::new(None);
    let decoded = decoder.decode(&bytes);
    assert_eq!(decoded.len(), 1);
    assert!(decoded[0].body.is_empty());
}

#[test]
fn test_frame_roundtrip() {
    println!("--- testing kmsg frame roundtrip");

    let from = Aid::with_address("Client", "tcp", "127.0.0.1", 3000);
    let to = Aid::with_address("Server", "tcp", "127.0.0.1", 3001);
    let msg = Message::kmsg(from.clone(), to.clone(), "work", b"frame body".to_vec()).with_signature(b"s1".to_vec());

    let bytes = encode_frame(&msg).unwrap();

    let mut decoder = FrameDecoder::new();
    let decoded = decoder.decode(&bytes);
    assert_eq!(decoded.len(), 1);

    let got = &decoded[0];
    assert_eq!(got.from, from);
    assert_eq!(got.to, to);
    assert_eq!(got.name, "work");
    assert_eq!(got.body, b"frame body");
    assert_eq!(got.signature, b"s1");
}

#[test]
fn test_frame_split_feed() {
    let from = Aid::with_address("C", "tcp", "h", 1);
    let to = Aid::with_address("S", "tcp", "h", 2);
    let bytes = encode_frame(&Message::kmsg(from, to, "m", vec![7u8; 100])).unwrap();

    let mut decoder = FrameDecoder::new();
    let (a, b) = bytes.split_at(23);
    assert!(decoder.decode(a).is_empty());
    let decoded = decoder.decode(b);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].body.len(), 100);
}

#[test]
fn test_frame_caps() {
    println!("--- testing frame caps");

    // oversize name refuses to encode
    let from = Aid::with_address("C", "tcp", "h", 1);
    let to = Aid::with_address("S", "tcp", "h", 2);
    let long_name = "n".repeat(MAX_KMSG_NAME_LEN + 1);
    assert!(encode_frame(&Message::kmsg(from, to, long_name, Vec::new())).is_none());

    // an inbound frame with an oversize header field poisons the decoder
    let mut bogus = Vec::new();
    bogus.extend_from_slice(&(5000u32).to_be_bytes()); // name len way over cap
    bogus.extend_from_slice(&0u32.to_be_bytes());
    bogus.extend_from_slice(&0u32.to_be_bytes());
    bogus.extend_from_slice(&0u32.to_be_bytes());
    bogus.extend_from_slice(&0u32.to_be_bytes());

    let mut decoder = FrameDecoder::new();
    assert!(decoder.decode(&bogus).is_empty());
    assert!(decoder.failed());
}
