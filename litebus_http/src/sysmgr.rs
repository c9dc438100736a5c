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

//! the built-in SysManager actor: `POST /SysManager/toggle?level=N&duration=MS`
//! raises the log verbosity for a bounded period, after which the base level is
//! restored by a timer.

use crate::types::{HttpMsg, Request, Response};
use litebus_actor::{ActorBehavior, ActorContext, AsAnyActor, Message, MessageKind};
use litebus_async::Future;
use http::Method;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

pub const SYSMGR_ACTOR_NAME: &str = "SysManager";

const DURATION_MAX: i64 = 24 * 3600 * 1000;

/// verbosity numbers as exposed on the toggle route: higher is chattier
pub fn verbosity_to_filter(v: i64) -> LevelFilter {
    match v {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn verbosity_of(filter: LevelFilter) -> i64 {
    if filter >= LevelFilter::TRACE {
        2
    } else if filter >= LevelFilter::DEBUG {
        1
    } else {
        0
    }
}

/// handle through which the process log level can be adjusted at runtime. The setter
/// is provided by whoever installed the subscriber (usually the litebus facade with a
/// reload layer)
pub struct LogControl {
    setter: Box<dyn Fn(LevelFilter) + Send + Sync>,
    base: LevelFilter,
}

impl LogControl {
    pub fn new<F>(base: LevelFilter, setter: F) -> Self
    where
        F: Fn(LevelFilter) + Send + Sync + 'static,
    {
        LogControl { setter: Box::new(setter), base }
    }

    /// a control that ignores adjustments (used when no reloadable subscriber is installed)
    pub fn noop() -> Self {
        LogControl { setter: Box::new(|_| {}), base: LevelFilter::INFO }
    }

    pub fn set(&self, level: LevelFilter) {
        (self.setter)(level);
    }

    pub fn restore(&self) {
        (self.setter)(self.base);
    }

    pub fn base_verbosity(&self) -> i64 {
        verbosity_of(self.base)
    }
}

pub struct SysManager {
    control: Arc<LogControl>,
    org_level: i64,
}

impl SysManager {
    pub fn new(control: Arc<LogControl>) -> Self {
        let org_level = control.base_verbosity();
        SysManager { control, org_level }
    }

    fn vlog_toggle(&mut self, ctx: &mut ActorContext, request: &Request) -> Future<Response> {
        info!(
            "url,method,body size, u:{},m:{},s:{}",
            request.url.path,
            request.method,
            request.body.len()
        );

        if request.method != Method::POST {
            return Future::from_value(Response::bad_request(format!("Invalid method '{}'.\n", request.method)));
        }

        let (level, duration) = match (request.url.query.get("level"), request.url.query.get("duration")) {
            (Some(l), Some(d)) => (l.clone(), d.clone()),
            _ => {
                return Future::from_value(Response::ok_text(format!(
                    "level or duration is null. orgLevel={}\n",
                    self.org_level
                )));
            }
        };

        let v: i64 = match level.parse() {
            Ok(v) => v,
            Err(_) => return Future::from_value(Response::bad_request(format!("Invalid level '{level}'.\n"))),
        };
        if v < 0 {
            return Future::from_value(Response::bad_request(format!("Invalid level '{level}'.\n")));
        }
        if v < self.org_level {
            return Future::from_value(Response::bad_request(format!("'{level}' < orgLevel level.\n")));
        }

        let d: i64 = match duration.parse() {
            Ok(d) => d,
            Err(_) => return Future::from_value(Response::bad_request(format!("Invalid duration '{duration}'.\n"))),
        };
        if d <= 0 || d > DURATION_MAX {
            return Future::from_value(Response::bad_request(format!("Invalid duration '{duration}'.\n")));
        }

        info!("set vlog level, level:{},duration:{}", v, d);
        self.set_vlog(ctx, v, d as u64);

        Future::from_value(Response::ok_text(format!("vlog set success!v={level}, d={duration}")))
    }

    fn set_vlog(&mut self, ctx: &ActorContext, level: i64, duration_ms: u64) {
        self.control.set(verbosity_to_filter(level));

        if level != self.org_level {
            let timer = ctx.add_timer(Duration::from_millis(duration_ms), |behavior, _ctx| {
                if let Some(actor) = behavior.as_any_actor().downcast_mut::<SysManager>() {
                    info!("vlog level restored");
                    actor.control.restore();
                }
            });
            if timer.is_err() {
                warn!("cannot schedule vlog restore - restoring immediately");
                self.control.restore();
            }
        }
    }
}

impl ActorBehavior for SysManager {
    fn name(&self) -> String {
        SYSMGR_ACTOR_NAME.to_string()
    }

    fn handle_http(&mut self, ctx: &mut ActorContext, msg: Message) {
        let MessageKind::Http(payload) = msg.kind else {
            return;
        };
        let Ok(http_msg) = payload.downcast::<HttpMsg>() else {
            warn!("can't transform to HttpMessage.");
            return;
        };
        let HttpMsg { request, promise } = *http_msg;

        let response = if request.url.path.trim_end_matches('/').ends_with("/toggle") {
            self.vlog_toggle(ctx, &request)
        } else {
            Future::from_value(Response::not_found())
        };
        promise.associate(&response);
    }
}
