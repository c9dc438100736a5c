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

use crate::errors::{config_error, Result};
use litebus_common::{
    env::{env_millis, env_string, env_u16, env_usize},
    sensitive::SensitiveBytes,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// TLS settings carried for the external TLS context factory. This crate only loads
/// and transports them - certificate handling itself is out of scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub verify_peer: bool,
    pub require_peer_cert: bool,
    pub decrypt_type: Option<String>,
    pub load_from_pem: bool,
}

impl SslConfig {
    /// read the key material into a scrubbed buffer. Callers must not copy it out of
    /// the SensitiveBytes wrapper
    pub fn load_key(&self) -> Result<Option<SensitiveBytes>> {
        match &self.key_file {
            Some(path) => {
                let data = std::fs::read(path).map_err(|e| config_error(format!("cannot read key file {path}: {e}")))?;
                Ok(Some(SensitiveBytes::new(data)))
            }
            None => Ok(None),
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_string("LITEBUS_SSL_CA") {
            self.ca_file = Some(v);
        }
        if let Some(v) = env_string("LITEBUS_SSL_CERT") {
            self.cert_file = Some(v);
        }
        if let Some(v) = env_string("LITEBUS_SSL_KEY") {
            self.key_file = Some(v);
        }
        if let Some(v) = env_string("LITEBUS_SSL_VERIFY") {
            self.verify_peer = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = env_string("LITEBUS_SSL_REQUIRE") {
            self.require_peer_cert = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = env_string("LITEBUS_SSL_DECRYPT_TYPE") {
            self.decrypt_type = Some(v);
        }
        if let Some(v) = env_string("LITEBUS_SSL_LOAD_FROM_PEM") {
            self.load_from_pem = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}

/// process configuration. Only the tcp bind URL is required; everything else has
/// workable defaults and can be overridden through LITEBUS_* environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// `tcp://host:port`, `http://host:port` or bare `host:port` (tcp assumed)
    pub tcp_bind_url: String,
    /// the address put into outgoing Aids; defaults to the bind address
    pub tcp_advertise_url: Option<String>,
    pub udp_bind_url: Option<String>,
    pub udp_advertise_url: Option<String>,
    /// worker pool size; default from LITEBUS_THREADS, else a small constant
    pub thread_count: Option<usize>,
    /// default per-request timeout of the http client (ms)
    pub request_timeout_ms: Option<u64>,
    /// idle-connection reaper period (ms); None disables the reaper
    pub link_recycle_ms: Option<u64>,
    pub ssl: Option<SslConfig>,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            tcp_bind_url: String::new(),
            tcp_advertise_url: None,
            udp_bind_url: None,
            udp_advertise_url: None,
            thread_count: None,
            request_timeout_ms: None,
            link_recycle_ms: None,
            ssl: None,
        }
    }
}

impl BusConfig {
    pub fn new(tcp_bind_url: impl ToString) -> Self {
        BusConfig { tcp_bind_url: tcp_bind_url.to_string(), ..Default::default() }
    }

    pub fn from_ron(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("cannot read config {}: {e}", path.display())))?;
        ron::from_str(&input).map_err(|e| config_error(format!("cannot parse config {}: {e}", path.display())))
    }

    /// fold the recognized environment variables into this configuration. Explicit
    /// config fields win except for the bind fallback, which only fills a blank url
    pub fn apply_env(&mut self) {
        if self.tcp_bind_url.is_empty() {
            if let (Some(ip), Some(port)) = (env_string("LITEBUS_IP"), env_u16("LITEBUS_PORT")) {
                info!("bind address from environment: {}:{}", ip, port);
                self.tcp_bind_url = format!("tcp://{ip}:{port}");
            }
        }

        if self.thread_count.is_none() {
            self.thread_count = env_usize("LITEBUS_THREADS");
        }

        if self.link_recycle_ms.is_none() {
            self.link_recycle_ms = env_millis("LITEBUS_LINK_RECYCLE_PERIOD").map(|d| d.as_millis() as u64);
        }

        let mut ssl = self.ssl.take().unwrap_or_default();
        ssl.apply_env();
        // only keep an ssl section if anything is actually configured
        if ssl.ca_file.is_some() || ssl.cert_file.is_some() || ssl.key_file.is_some() {
            self.ssl = Some(ssl);
        }
    }
}
