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

//! incremental HTTP/1.1 codecs. Bytes are fed in as they arrive from the socket; each
//! feed yields the messages that became complete, which is what makes pipelining work
//! (one read may surface several requests). Framing supports Content-Length and
//! chunked bodies; a parse failure is sticky and the connection gets torn down.

use crate::{types::Request, types::Response, HttpUrl};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use litebus_actor::{Aid, BusAddress, Message, MAX_KMSG_BODY_LEN};
use tracing::{debug, warn};

const MAX_HEADERS: usize = 64;

enum ChunkParse {
    Complete(Vec<u8>, usize),
    Partial,
    Error,
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn find_double_crlf(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

/// parse a complete chunked body from the start of `data`. Returns the assembled body
/// and the number of consumed bytes (including the terminating chunk and trailers)
fn parse_chunked(data: &[u8]) -> ChunkParse {
    let mut body: Vec<u8> = Vec::new();
    let mut pos = 0;

    loop {
        let line_end = match find_crlf(&data[pos..]) {
            Some(idx) => idx,
            None => return ChunkParse::Partial,
        };

        let size_line = &data[pos..pos + line_end];
        let size_str = match size_line.iter().position(|b| *b == b';') {
            Some(idx) => &size_line[..idx], // ignore chunk extensions
            None => size_line,
        };
        let size_str = match std::str::from_utf8(size_str) {
            Ok(s) => s.trim(),
            Err(_) => return ChunkParse::Error,
        };
        let size = match usize::from_str_radix(size_str, 16) {
            Ok(n) => n,
            Err(_) => return ChunkParse::Error,
        };

        pos += line_end + 2;

        if size == 0 {
            // last chunk - skip (empty) trailer section
            if data.len() < pos + 2 {
                return ChunkParse::Partial;
            }
            if &data[pos..pos + 2] == b"\r\n" {
                return ChunkParse::Complete(body, pos + 2);
            }
            return match find_double_crlf(&data[pos..]) {
                Some(idx) => ChunkParse::Complete(body, pos + idx + 4),
                None => ChunkParse::Partial,
            };
        }

        if body.len() + size > MAX_KMSG_BODY_LEN {
            return ChunkParse::Error;
        }
        if data.len() < pos + size + 2 {
            return ChunkParse::Partial;
        }
        body.extend_from_slice(&data[pos..pos + size]);
        if &data[pos + size..pos + size + 2] != b"\r\n" {
            return ChunkParse::Error;
        }
        pos += size + 2;
    }
}

struct HeaderScan {
    map: HeaderMap,
    content_length: Option<usize>,
    chunked: bool,
    connection: Option<String>,
}

fn scan_headers(headers: &[httparse::Header<'_>]) -> Option<HeaderScan> {
    let mut scan = HeaderScan { map: HeaderMap::new(), content_length: None, chunked: false, connection: None };

    for h in headers {
        let name = HeaderName::from_bytes(h.name.as_bytes()).ok()?;
        let value = HeaderValue::from_bytes(h.value).ok()?;

        if name == header::CONTENT_LENGTH {
            scan.content_length = value.to_str().ok().and_then(|s| s.trim().parse().ok());
            match scan.content_length {
                // an announced oversize body drops the connection before buffering it
                Some(len) if len <= MAX_KMSG_BODY_LEN => {}
                _ => return None,
            }
        } else if name == header::TRANSFER_ENCODING {
            if value.to_str().map(|s| s.to_ascii_lowercase().contains("chunked")).unwrap_or(false) {
                scan.chunked = true;
            }
        } else if name == header::CONNECTION {
            scan.connection = value.to_str().ok().map(|s| s.to_string());
        }

        scan.map.append(name, value);
    }
    Some(scan)
}

fn keep_alive_for(version11: bool, connection: &Option<String>) -> bool {
    match connection {
        Some(c) if c.eq_ignore_ascii_case("close") => false,
        Some(c) if c.eq_ignore_ascii_case("keep-alive") => true,
        _ => version11,
    }
}

/* #region request decoder *************************************************************************************/

/// incremental decoder for the server side. `local` is the advertise address used to
/// complete the domain part of decoded request targets
pub struct RequestDecoder {
    buf: BytesMut,
    failed: bool,
    local: Option<BusAddress>,
}

impl RequestDecoder {
    pub fn new(local: Option<BusAddress>) -> Self {
        RequestDecoder { buf: BytesMut::with_capacity(crate::RECV_BUFFER_SIZE), failed: false, local }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// feed received bytes, returning every request that became complete
    pub fn decode(&mut self, data: &[u8]) -> Vec<Request> {
        let mut out = Vec::new();
        if self.failed {
            return out;
        }
        self.buf.extend_from_slice(data);

        while !self.failed {
            match self.try_parse() {
                Some(req) => out.push(req),
                None => break,
            }
        }
        out
    }

    fn try_parse(&mut self) -> Option<Request> {
        if self.buf.is_empty() {
            return None;
        }

        let (request, consumed) = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut preq = httparse::Request::new(&mut headers);

            let header_len = match preq.parse(&self.buf) {
                Ok(httparse::Status::Complete(n)) => n,
                Ok(httparse::Status::Partial) => return None,
                Err(e) => {
                    warn!("http request parse error: {}", e);
                    self.failed = true;
                    return None;
                }
            };

            let method = match preq.method.and_then(|m| Method::from_bytes(m.as_bytes()).ok()) {
                Some(m) => m,
                None => {
                    self.failed = true;
                    return None;
                }
            };
            let target = preq.path.unwrap_or("/").to_string();
            let version11 = preq.version == Some(1);

            let scan = match scan_headers(preq.headers) {
                Some(s) => s,
                None => {
                    self.failed = true;
                    return None;
                }
            };

            let (body, consumed) = if scan.chunked {
                match parse_chunked(&self.buf[header_len..]) {
                    ChunkParse::Complete(body, used) => (body, header_len + used),
                    ChunkParse::Partial => return None,
                    ChunkParse::Error => {
                        self.failed = true;
                        return None;
                    }
                }
            } else {
                let len = scan.content_length.unwrap_or(0);
                if self.buf.len() < header_len + len {
                    return None;
                }
                (self.buf[header_len..header_len + len].to_vec(), header_len + len)
            };

            let url = match HttpUrl::decode_path(&target, self.local.as_ref()) {
                Ok(url) => url,
                Err(e) => {
                    warn!("bad request target '{}': {}", target, e);
                    self.failed = true;
                    return None;
                }
            };

            let request = Request {
                method,
                keep_alive: keep_alive_for(version11, &scan.connection),
                url,
                headers: scan.map,
                body,
                client: None,
                timeout: None,
            };
            (request, consumed)
        };

        self.buf.advance(consumed);
        Some(request)
    }
}

/* #endregion request decoder */

/* #region response decoder ************************************************************************************/

/// incremental decoder for the client side
pub struct ResponseDecoder {
    buf: BytesMut,
    failed: bool,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        ResponseDecoder { buf: BytesMut::with_capacity(crate::RECV_BUFFER_SIZE), failed: false }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn decode(&mut self, data: &[u8]) -> Vec<Response> {
        let mut out = Vec::new();
        if self.failed {
            return out;
        }
        self.buf.extend_from_slice(data);

        while !self.failed {
            match self.try_parse() {
                Some(resp) => out.push(resp),
                None => break,
            }
        }
        out
    }

    fn try_parse(&mut self) -> Option<Response> {
        if self.buf.is_empty() {
            return None;
        }

        let (response, consumed) = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut presp = httparse::Response::new(&mut headers);

            let header_len = match presp.parse(&self.buf) {
                Ok(httparse::Status::Complete(n)) => n,
                Ok(httparse::Status::Partial) => return None,
                Err(e) => {
                    warn!("http response parse error: {}", e);
                    self.failed = true;
                    return None;
                }
            };

            let code = match presp.code.and_then(|c| StatusCode::from_u16(c).ok()) {
                Some(c) => c,
                None => {
                    self.failed = true;
                    return None;
                }
            };

            let scan = match scan_headers(presp.headers) {
                Some(s) => s,
                None => {
                    self.failed = true;
                    return None;
                }
            };

            let (body, consumed) = if scan.chunked {
                match parse_chunked(&self.buf[header_len..]) {
                    ChunkParse::Complete(body, used) => (body, header_len + used),
                    ChunkParse::Partial => return None,
                    ChunkParse::Error => {
                        self.failed = true;
                        return None;
                    }
                }
            } else {
                let len = scan.content_length.unwrap_or(0);
                if self.buf.len() < header_len + len {
                    return None;
                }
                (self.buf[header_len..header_len + len].to_vec(), header_len + len)
            };

            (Response { code, headers: scan.map, body }, consumed)
        };

        self.buf.advance(consumed);
        Some(response)
    }
}

/* #endregion response decoder */

/* #region encoders ********************************************************************************************/

/// encode a client request with Content-Length framing. Host and Connection headers
/// are synthesized unless the caller set them explicitly
pub fn encode_request(req: &Request) -> Bytes {
    let mut out = BytesMut::with_capacity(256 + req.body.len());

    out.put_slice(req.method.as_str().as_bytes());
    out.put_slice(b" ");
    out.put_slice(req.url.request_target().as_bytes());
    out.put_slice(b" HTTP/1.1\r\n");

    if !req.headers.contains_key(header::HOST) {
        out.put_slice(b"Host: ");
        out.put_slice(req.url.endpoint().as_bytes());
        out.put_slice(b"\r\n");
    }

    for (name, value) in req.headers.iter() {
        if name == header::CONTENT_LENGTH || name == header::CONNECTION {
            continue;
        }
        out.put_slice(name.as_str().as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }

    if req.keep_alive {
        out.put_slice(b"Connection: Keep-Alive\r\n");
    } else {
        out.put_slice(b"Connection: close\r\n");
    }

    out.put_slice(format!("Content-Length: {}\r\n", req.body.len()).as_bytes());
    out.put_slice(b"\r\n");
    out.put_slice(&req.body);

    out.freeze()
}

/// encode a KMSG as the legacy HTTP/1.1 POST form with a chunked body. The server
/// side recognizes it by the Litebus-From header and does not reply on this path
pub fn encode_kmsg_request(msg: &Message) -> Bytes {
    let from = msg.from.to_string();
    let mut out = BytesMut::with_capacity(256 + msg.body.len());

    out.put_slice(format!("POST /{}/{} HTTP/1.1\r\n", msg.to.name(), msg.name).as_bytes());
    out.put_slice(format!("User-Agent: libprocess/{}\r\n", from).as_bytes());
    out.put_slice(format!("Litebus-From: {}\r\n", from).as_bytes());
    out.put_slice(b"Connection: Keep-Alive\r\n");
    out.put_slice(b"Host: \r\n");
    if !msg.signature.is_empty() {
        out.put_slice(b"Authorization: ");
        out.put_slice(&msg.signature);
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"Transfer-Encoding: chunked\r\n");
    out.put_slice(b"\r\n");

    if !msg.body.is_empty() {
        out.put_slice(format!("{:x}\r\n", msg.body.len()).as_bytes());
        out.put_slice(&msg.body);
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"0\r\n\r\n");

    out.freeze()
}

/// encode a server response. Only fixed-length bodies are sent - chunked responses
/// are not supported. The Connection header is decided here: a non-keep-alive request
/// always gets close, a keep-alive request gets what the response demands
pub fn encode_response(resp: &Response, request_keep_alive: bool) -> Bytes {
    let mut out = BytesMut::with_capacity(256 + resp.body.len());

    let reason = resp.code.canonical_reason().unwrap_or("Unknown");
    out.put_slice(format!("HTTP/1.1 {} {}\r\n", resp.code.as_u16(), reason).as_bytes());

    for (name, value) in resp.headers.iter() {
        if name == header::CONTENT_LENGTH || name == header::CONNECTION {
            continue;
        }
        out.put_slice(name.as_str().as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }

    if request_keep_alive && !resp.wants_close() {
        out.put_slice(b"Connection: Keep-Alive\r\n");
    } else {
        out.put_slice(b"Connection: close\r\n");
    }

    out.put_slice(format!("Content-Length: {}\r\n", resp.body.len()).as_bytes());
    out.put_slice(b"\r\n");
    out.put_slice(&resp.body);

    out.freeze()
}

/* #endregion encoders */
