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

use crate::types::{HttpMsg, Request, Response};
use litebus_actor::{ActorBehavior, ActorContext, Message, MessageKind};
use litebus_async::Future;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub type HttpRequestHandler = Box<dyn FnMut(&Request) -> Future<Response> + Send>;

/// reusable behavior for actors that serve HTTP routes. Routes are registered
/// relative to the actor name prefix: an actor "API" spawned with a route "/v1"
/// answers "/API/v1". Matching walks from the full remainder up to shorter prefixes,
/// with "/" as the catch-all route
pub struct HttpActor {
    name: String,
    routes: HashMap<String, HttpRequestHandler>,
}

impl HttpActor {
    pub fn new(name: impl ToString) -> Self {
        HttpActor { name: name.to_string(), routes: HashMap::new() }
    }

    pub fn add_route<F>(&mut self, route: impl ToString, handler: F)
    where
        F: FnMut(&Request) -> Future<Response> + Send + 'static,
    {
        let route = route.to_string();
        info!("add endpoint, name:{}", route);
        self.routes.insert(route, Box::new(handler));
    }

    pub fn with_route<F>(mut self, route: impl ToString, handler: F) -> Self
    where
        F: FnMut(&Request) -> Future<Response> + Send + 'static,
    {
        self.add_route(route, handler);
        self
    }

    /// strip the actor-name prefix off the request path; "/API/v1/x" becomes "/v1/x"
    fn function_name(&self, path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        let name = match trimmed.find('/') {
            Some(idx) => trimmed[idx..].to_string(),
            None => String::new(),
        };
        if name.is_empty() {
            debug!("set default handle name as '/'.");
            "/".to_string()
        } else {
            name
        }
    }

    /// the catch-all: a registered "/" route accepts any name, otherwise 404
    fn done(&mut self, name: &str, request: &Request) -> Future<Response> {
        if let Some(handler) = self.routes.get_mut("/") {
            handler(request)
        } else {
            warn!("can not find this handle, name: {}", name);
            Future::from_value(Response::not_found())
        }
    }

    fn route(&mut self, request: &Request) -> Future<Response> {
        let mut name = format!("/{}", self.function_name(&request.url.path).trim_start_matches('/'));

        // a trailing-slash name that would only match after stripping is refused
        // (matches the catch-all instead)
        if name.len() > 1 && name.ends_with('/') {
            let stripped = name.trim_end_matches('/').to_string();
            if self.routes.contains_key(&stripped) {
                return self.done(&stripped, request);
            }
        }

        // best (longest) prefix match: "/a/b/c" falls back to "/a/b", then "/a"
        while name != "/" && !name.is_empty() {
            let candidate = name.trim_end_matches('/').to_string();

            if self.routes.contains_key(&candidate) {
                let handler = self.routes.get_mut(&candidate);
                if let Some(handler) = handler {
                    return handler(request);
                }
            }

            match candidate.rfind('/') {
                Some(0) | None => break,
                Some(idx) => name = candidate[..idx].to_string(),
            }
        }

        self.done(&name, request)
    }
}

impl ActorBehavior for HttpActor {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn handle_http(&mut self, _ctx: &mut ActorContext, msg: Message) {
        let MessageKind::Http(payload) = msg.kind else {
            return;
        };
        let Ok(http_msg) = payload.downcast::<HttpMsg>() else {
            warn!("can't transform to HttpMessage.");
            return;
        };
        let HttpMsg { request, promise } = *http_msg;

        debug!("handle name, name={}, urlfrom={}", self.function_name(&request.url.path), request.url.path);
        let response = self.route(&request);
        promise.associate(&response);
    }
}
