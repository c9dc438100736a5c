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

use crate::errors::{parse_error, Result};
use litebus_actor::BusAddress;
use litebus_common::net::parse_endpoint;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

pub const HTTP_SCHEME: &str = "http";
pub const HTTPS_SCHEME: &str = "https";

/// decoded URL. Both the flattened query map (last value wins) and the multi-valued
/// raw map are kept - handlers pick whichever shape they need
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: HashMap<String, String>,
    pub raw_query: HashMap<String, Vec<String>>,
}

impl HttpUrl {
    pub fn new(scheme: impl ToString, host: impl ToString, port: u16, path: impl ToString) -> Self {
        HttpUrl {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            query: HashMap::new(),
            raw_query: HashMap::new(),
        }
    }

    /// decode a full URL of the form `scheme://host[:port]/path[?query]`. The scheme
    /// must be http or https; a missing port defaults to 80/443
    pub fn decode(url: &str) -> Result<HttpUrl> {
        let scheme_idx = url
            .find("://")
            .ok_or_else(|| parse_error(format!("no scheme in '{url}'")))?;
        let scheme = &url[..scheme_idx];
        if scheme != HTTP_SCHEME && scheme != HTTPS_SCHEME {
            return Err(parse_error(format!("illegal scheme: {scheme}")));
        }

        let full = &url[scheme_idx + 3..];
        let path_idx = full
            .find('/')
            .ok_or_else(|| parse_error(format!("not found path from {full}")))?;

        let path_part = &full[path_idx..];
        let mut host_part = full[..path_idx].to_string();
        if host_part.is_empty() {
            return Err(parse_error("host is empty!"));
        }

        // bracketed IPv6 hosts carry ':' - only treat the endpoint as portless if no
        // colon follows the closing bracket (or no colon at all for plain hosts)
        let has_port = match host_part.rfind(']') {
            Some(idx) => host_part[idx..].contains(':'),
            None => host_part.contains(':'),
        };
        if !has_port {
            if scheme == HTTPS_SCHEME {
                host_part.push_str(":443");
            } else {
                host_part.push_str(":80");
            }
        }

        let (host, port) = parse_endpoint(&host_part).map_err(|e| parse_error(format!("bad host: {e}")))?;

        Self::decode_path_with(scheme, &host, port, path_part)
    }

    /// decode a path-only request target (`/path?query`), borrowing the process
    /// advertise address for the domain part
    pub fn decode_path(target: &str, local: Option<&BusAddress>) -> Result<HttpUrl> {
        if !target.starts_with('/') {
            return Err(parse_error(format!("request target must start with '/': {target}")));
        }
        match local {
            Some(addr) => Self::decode_path_with(HTTP_SCHEME, &addr.host, addr.port, target),
            None => Self::decode_path_with(HTTP_SCHEME, "", 0, target),
        }
    }

    fn decode_path_with(scheme: &str, host: &str, port: u16, path_part: &str) -> Result<HttpUrl> {
        let mut url = HttpUrl::new(scheme, host, port, "");

        match path_part.find('?') {
            Some(idx) => {
                url.path = path_part[..idx].to_string();
                // a malformed query drops the whole query, not the URL
                if let Ok((query, raw_query)) = decode_query(&path_part[idx + 1..]) {
                    url.query = query;
                    url.raw_query = raw_query;
                }
            }
            None => {
                url.path = path_part.to_string();
            }
        }
        Ok(url)
    }

    /// scheme/host/port equality - requests may only be launched on a connection to
    /// the same domain
    pub fn same_domain(&self, other: &HttpUrl) -> bool {
        self.scheme == other.scheme && self.host == other.host && self.port == other.port
    }

    /// the request target for the wire: path plus re-encoded query
    pub fn request_target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            let mut out = String::with_capacity(self.path.len() + 16);
            out.push_str(&self.path);
            let mut sep = '?';
            for (k, v) in &self.query {
                out.push(sep);
                out.push_str(&percent_encode(k));
                out.push('=');
                out.push_str(&percent_encode(v));
                sep = '&';
            }
            out
        }
    }

    /// the `host:port` endpoint with IPv6 hosts in brackets
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.endpoint(), self.request_target())
    }
}

/// percent-decode a query component: `%XX` with two strict hex digits decodes to the
/// byte value, `+` decodes to space. Anything else is passed through. Decoded byte
/// sequences that are not valid utf8 are lossily converted
pub fn percent_decode(s: &str) -> Result<String> {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());

    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'%' => {
                // we expect two hexadecimal digits behind '%', as '%XX'
                if index + 2 >= bytes.len() {
                    warn!("decode query failed, query string:{}", s);
                    return Err(parse_error(format!("truncated escape in '{s}'")));
                }
                let hi = hex_val(bytes[index + 1]);
                let lo = hex_val(bytes[index + 2]);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        index += 2;
                    }
                    _ => {
                        warn!("decode query failed, query string:{}", s);
                        return Err(parse_error(format!("bad escape in '{s}'")));
                    }
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        index += 1;
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// minimal percent-encoding for query components
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

pub type QueryMaps = (HashMap<String, String>, HashMap<String, Vec<String>>);

/// split a query string on `,` or `&` into `k[=v]` tokens and decode both maps.
/// A token without `=` yields an empty value; any decode failure fails the whole
/// query (the caller then drops it)
pub fn decode_query(query: &str) -> Result<QueryMaps> {
    let mut query_map: HashMap<String, String> = HashMap::new();
    let mut raw_query_map: HashMap<String, Vec<String>> = HashMap::new();

    for token in query.split(|c| c == ',' || c == '&').filter(|t| !t.is_empty()) {
        let parts: Vec<&str> = token.split('=').collect();

        let field = percent_decode(parts[0])?;
        let value = if parts.len() > 1 { percent_decode(parts[1])? } else { String::new() };

        debug!("decode query, key:{},value:{}", field, value);
        raw_query_map.entry(field.clone()).or_default().push(value.clone());
        query_map.insert(field, value); // last one wins in the flattened map
    }

    Ok((query_map, raw_query_map))
}
