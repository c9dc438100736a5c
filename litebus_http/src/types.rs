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

use crate::HttpUrl;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use litebus_async::Promise;
use std::fmt;

/// the set of request methods we accept
pub fn method_allowed(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE | Method::PATCH)
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// HTTP/1.1 requests default to true unless the peer demanded close
    pub keep_alive: bool,
    pub url: HttpUrl,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// peer endpoint as seen by the server
    pub client: Option<String>,
    /// per-request timeout override (ms)
    pub timeout: Option<u64>,
}

impl Request {
    pub fn new(method: Method, url: HttpUrl) -> Self {
        Request {
            method,
            keep_alive: false,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
            client: None,
            timeout: None,
        }
    }

    pub fn get(url: HttpUrl) -> Self {
        Request::new(Method::GET, url)
    }

    pub fn post(url: HttpUrl, body: Vec<u8>) -> Self {
        let mut req = Request::new(Method::POST, url);
        req.body = body;
        req
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.insert(name, v);
        }
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub code: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(code: StatusCode) -> Self {
        Response { code, headers: HeaderMap::new(), body: Vec::new() }
    }

    pub fn with_text(code: StatusCode, body: impl ToString) -> Self {
        let mut resp = Response::new(code);
        resp.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        resp.body = body.to_string().into_bytes();
        resp
    }

    pub fn with_json(code: StatusCode, body: impl ToString) -> Self {
        let mut resp = Response::new(code);
        resp.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp.body = body.to_string().into_bytes();
        resp
    }

    pub fn ok() -> Self {
        Response::new(StatusCode::OK)
    }

    pub fn ok_text(body: impl ToString) -> Self {
        Response::with_text(StatusCode::OK, body)
    }

    pub fn accepted() -> Self {
        Response::new(StatusCode::ACCEPTED)
    }

    pub fn bad_request(body: impl ToString) -> Self {
        Response::with_text(StatusCode::BAD_REQUEST, body)
    }

    pub fn not_found() -> Self {
        Response::new(StatusCode::NOT_FOUND)
    }

    pub fn internal_error(body: impl ToString) -> Self {
        Response::with_text(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.insert(name, v);
        }
        self
    }

    /// true iff the response demands connection teardown
    pub fn wants_close(&self) -> bool {
        match self.headers.get(header::CONNECTION) {
            Some(v) => v.to_str().map(|s| s.eq_ignore_ascii_case("close")).unwrap_or(true),
            None => false,
        }
    }
}

/// the envelope that rides a Message of kind HTTP to the target actor: the decoded
/// request plus the promise whose future is queued on the connection's pipeline proxy
pub struct HttpMsg {
    pub request: Request,
    pub promise: Promise<Response>,
}

impl fmt::Debug for HttpMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpMsg({} {})", self.request.method, self.request.url.path)
    }
}
