#![allow(unused)]

/// unit tests for URL decoding and query parsing.
/// run with "cargo test --test test_url -- --nocapture"

use litebus_http::{decode_query, percent_decode, HttpUrl};

#[test]
fn test_full_url_decode() {
    println!("--- testing full URL decoding");

    let url = HttpUrl::decode("http://127.0.0.1:8080/a/b?x=1&y=2").unwrap();
    assert_eq!(url.scheme, "http");
    assert_eq!(url.host, "127.0.0.1");
    assert_eq!(url.port, 8080);
    assert_eq!(url.path, "/a/b");
    assert_eq!(url.query.get("x"), Some(&"1".to_string()));
    assert_eq!(url.query.get("y"), Some(&"2".to_string()));
}

#[test]
fn test_default_ports() {
    assert_eq!(HttpUrl::decode("http://h.example/x").unwrap().port, 80);
    assert_eq!(HttpUrl::decode("https://h.example/x").unwrap().port, 443);
}

#[test]
fn test_ipv6_host() {
    let url = HttpUrl::decode("http://[::1]:9000/x").unwrap();
    assert_eq!(url.host, "::1");
    assert_eq!(url.port, 9000);
    assert_eq!(url.endpoint(), "[::1]:9000");

    // bracketed host without explicit port gets the scheme default
    let url = HttpUrl::decode("http://[::1]/x").unwrap();
    assert_eq!(url.host, "::1");
    assert_eq!(url.port, 80);
}

#[test]
fn test_bad_urls() {
    assert!(HttpUrl::decode("ftp://h:1/x").is_err()); // scheme
    assert!(HttpUrl::decode("http://h:1").is_err()); // no path
    assert!(HttpUrl::decode("http://:80/x").is_err()); // empty host
    assert!(HttpUrl::decode("http://h:99999/x").is_err()); // port out of range
    assert!(HttpUrl::decode("no-scheme").is_err());
}

#[test]
fn test_percent_decode() {
    println!("--- testing percent decoding");

    assert_eq!(percent_decode("abc").unwrap(), "abc");
    assert_eq!(percent_decode("%25").unwrap(), "%");
    assert_eq!(percent_decode("a+b").unwrap(), "a b");
    assert_eq!(percent_decode("%41%42").unwrap(), "AB");

    assert!(percent_decode("%XY").is_err()); // non-hex digits
    assert!(percent_decode("%4").is_err()); // truncated escape
    assert!(percent_decode("a%").is_err());
}

#[test]
fn test_query_decode() {
    println!("--- testing query decoding");

    let (flat, raw) = decode_query("a=%25").unwrap();
    assert_eq!(flat.get("a"), Some(&"%".to_string()));
    assert_eq!(raw.get("a"), Some(&vec!["%".to_string()]));

    // a key without '=' yields an empty value
    let (flat, _) = decode_query("a&b=1").unwrap();
    assert_eq!(flat.get("a"), Some(&"".to_string()));
    assert_eq!(flat.get("b"), Some(&"1".to_string()));

    // both ',' and '&' separate tokens
    let (flat, _) = decode_query("a=1,b=2&c=3").unwrap();
    assert_eq!(flat.len(), 3);
    assert_eq!(flat.get("c"), Some(&"3".to_string()));

    // repeated keys: last wins in the flat map, all kept in the raw map
    let (flat, raw) = decode_query("k=1&k=2&k=3").unwrap();
    assert_eq!(flat.get("k"), Some(&"3".to_string()));
    assert_eq!(raw.get("k"), Some(&vec!["1".to_string(), "2".to_string(), "3".to_string()]));

    assert!(decode_query("a=%XY").is_err());
}

#[test]
fn test_bad_query_drops_query_not_url() {
    // a malformed query leaves the URL valid but query-less
    let url = HttpUrl::decode("http://h.example:1/p?a=%XY").unwrap();
    assert_eq!(url.path, "/p");
    assert!(url.query.is_empty());
    assert!(url.raw_query.is_empty());
}

#[test]
fn test_path_only_decode() {
    let url = HttpUrl::decode_path("/API/v1?q=1", None).unwrap();
    assert_eq!(url.path, "/API/v1");
    assert_eq!(url.query.get("q"), Some(&"1".to_string()));

    assert!(HttpUrl::decode_path("no-slash", None).is_err());
}

#[test]
fn test_request_target_roundtrip() {
    let mut url = HttpUrl::new("http", "h", 80, "/p");
    url.query.insert("a b".to_string(), "c%d".to_string());

    let target = url.request_target();
    let round = HttpUrl::decode_path(&target, None).unwrap();
    assert_eq!(round.query.get("a b"), Some(&"c%d".to_string()));
}
