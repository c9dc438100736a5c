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

use crate::errors::{param_invalid, ActorError, Result};
use litebus_common::net::parse_endpoint;
use std::fmt;

pub const BUS_TCP: &str = "tcp";
pub const BUS_UDP: &str = "udp";

/// actor identifier - the sole routing key of litebus. An Aid is an immutable value
/// type `{name, protocol, host, port}`; a local Aid has no address, a remote one
/// carries the advertise endpoint of its process.
///
/// String forms accepted by [`Aid::parse`] and produced by Display:
/// - `name` (local)
/// - `name@host:port` (remote, protocol defaults to tcp)
/// - `name@proto://host:port` (remote with explicit protocol)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Aid {
    name: String,
    protocol: String,
    host: String,
    port: u16,
}

impl Aid {
    /// a local Aid with no transport address
    pub fn new(name: impl ToString) -> Self {
        Aid {
            name: name.to_string(),
            protocol: BUS_TCP.to_string(),
            host: String::new(),
            port: 0,
        }
    }

    pub fn with_address(name: impl ToString, protocol: impl ToString, host: impl ToString, port: u16) -> Self {
        Aid {
            name: name.to_string(),
            protocol: protocol.to_string(),
            host: host.to_string(),
            port,
        }
    }

    pub fn parse(s: &str) -> Result<Aid> {
        let s = s.trim();
        match s.find('@') {
            None => {
                if s.is_empty() {
                    Err(param_invalid("empty actor name"))
                } else {
                    Ok(Aid::new(s))
                }
            }
            Some(idx) => {
                let name = &s[..idx];
                let rest = &s[idx + 1..];
                if name.is_empty() {
                    return Err(param_invalid(format!("empty actor name in '{s}'")));
                }

                let (protocol, endpoint) = match rest.find("://") {
                    Some(pidx) => (&rest[..pidx], &rest[pidx + 3..]),
                    None => (BUS_TCP, rest),
                };
                if protocol.is_empty() {
                    return Err(param_invalid(format!("empty protocol in '{s}'")));
                }

                let (host, port) =
                    parse_endpoint(endpoint).map_err(|e| param_invalid(format!("bad address in '{s}': {e}")))?;
                Ok(Aid::with_address(name, protocol, host, port))
            }
        }
    }

    /// true iff this Aid carries a usable transport address
    pub fn is_ok(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_name(&mut self, name: impl ToString) {
        self.name = name.to_string();
    }

    pub fn set_address(&mut self, protocol: impl ToString, host: impl ToString, port: u16) {
        self.protocol = protocol.to_string();
        self.host = host.to_string();
        self.port = port;
    }

    /// the `host:port` endpoint, with IPv6 hosts in brackets
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_ok() {
            write!(f, "{}", self.name)
        } else if self.protocol == BUS_TCP {
            write!(f, "{}@{}", self.name, self.url())
        } else {
            write!(f, "{}@{}://{}", self.name, self.protocol, self.url())
        }
    }
}

impl std::str::FromStr for Aid {
    type Err = ActorError;

    fn from_str(s: &str) -> Result<Self> {
        Aid::parse(s)
    }
}
