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

//! common utility functions for parsing network endpoints. These are deliberately free of
//! any socket code - they only normalize the string forms we accept in configurations
//! and actor addresses

use crate::{parse_error, Result};

/// parse a `host:port` endpoint into its components. The host part can be an IPv6
/// address in brackets (`[::1]:8080`), in which case the brackets are stripped.
/// An empty host, a missing/empty port or a port that does not fit into u16 are errors
pub fn parse_endpoint(s: &str) -> Result<(String, u16)> {
    let s = s.trim();

    let (host, port_str) = if let Some(rest) = s.strip_prefix('[') {
        // bracketed IPv6 form
        let close = rest
            .find(']')
            .ok_or_else(|| parse_error(format!("unterminated IPv6 host in '{s}'")))?;
        let host = &rest[..close];
        let after = &rest[close + 1..];
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| parse_error(format!("missing port in '{s}'")))?;
        (host, port)
    } else {
        let idx = s
            .rfind(':')
            .ok_or_else(|| parse_error(format!("missing port in '{s}'")))?;
        (&s[..idx], &s[idx + 1..])
    };

    if host.is_empty() {
        return Err(parse_error(format!("empty host in '{s}'")));
    }

    let port: u16 = port_str
        .parse()
        .map_err(|_| parse_error(format!("illegal port '{port_str}' in '{s}'")))?;
    if port == 0 {
        return Err(parse_error(format!("illegal port 0 in '{s}'")));
    }

    Ok((host.to_string(), port))
}

/// parse a bind/advertise URL of the form `proto://host:port` or bare `host:port`
/// (in which case the protocol defaults to "tcp"). Returns (protocol,host,port)
pub fn parse_bind_url(s: &str) -> Result<(String, String, u16)> {
    let s = s.trim();

    let (proto, endpoint) = match s.find("://") {
        Some(idx) => (&s[..idx], &s[idx + 3..]),
        None => ("tcp", s),
    };

    if proto.is_empty() {
        return Err(parse_error(format!("empty protocol in '{s}'")));
    }

    let (host, port) = parse_endpoint(endpoint)?;
    Ok((proto.to_string(), host, port))
}
