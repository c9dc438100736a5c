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

use crate::Status;
use litebus_timer::TimerService;
use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Condvar, Mutex},
    task::{Context, Poll, Waker},
    time::{Duration, Instant},
};
use tracing::warn;

type CompleteFn<T> = Box<dyn FnOnce(&Future<T>) + Send>;

struct Inner<T> {
    status: Status,
    value: Option<T>,
    associated: bool,
    abandoned: bool,
    on_complete: Vec<CompleteFn<T>>,
    on_abandoned: Vec<CompleteFn<T>>,
    wakers: Vec<Waker>,
}

impl<T> Inner<T> {
    fn new(abandoned: bool) -> Self {
        Inner {
            status: Status::default(),
            value: None,
            associated: false,
            abandoned,
            on_complete: Vec::new(),
            on_abandoned: Vec::new(),
            wakers: Vec::new(),
        }
    }
}

struct SharedState<T> {
    inner: Mutex<Inner<T>>,
    resolved: Condvar,
}

/// the consumer side of a single-assignment asynchronous value. Futures are cheap
/// clones of the same shared state; completion callbacks always run *outside* the
/// state lock (they commonly dispatch to actors, which must not re-enter)
pub struct Future<T> {
    data: Arc<SharedState<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Future { data: self.data.clone() }
    }
}

impl<T> PartialEq for Future<T> {
    /// identity - two futures are equal iff they share the same state
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.data.inner.lock().unwrap();
        write!(f, "Future({}{})", inner.status, if inner.abandoned { ",abandoned" } else { "" })
    }
}

impl<T> Future<T>
where
    T: Clone + Send + 'static,
{
    /// a future without a producer - it starts out abandoned. Use [`Promise::new`]
    /// to create a producible future
    pub fn new() -> Self {
        Future {
            data: Arc::new(SharedState { inner: Mutex::new(Inner::new(true)), resolved: Condvar::new() }),
        }
    }

    pub(crate) fn with_producer() -> Self {
        Future {
            data: Arc::new(SharedState { inner: Mutex::new(Inner::new(false)), resolved: Condvar::new() }),
        }
    }

    /// an already completed future
    pub fn from_value(v: T) -> Self {
        let f = Self::with_producer();
        f.resolve(v);
        f
    }

    /// an already failed future (any status that is not an error is coerced to KERROR)
    pub fn from_error(code: i32) -> Self {
        let f = Self::with_producer();
        f.fail(code);
        f
    }

    pub fn from_status(status: Status) -> Self {
        Self::from_error(status.code())
    }

    //--- state inspection

    pub fn status(&self) -> Status {
        self.data.inner.lock().unwrap().status
    }

    pub fn is_init(&self) -> bool {
        self.status().is_init()
    }

    pub fn is_ok(&self) -> bool {
        self.status().is_ok()
    }

    pub fn is_error(&self) -> bool {
        self.status().is_error()
    }

    pub fn is_abandoned(&self) -> bool {
        self.data.inner.lock().unwrap().abandoned
    }

    /// the error code, or 0 if this future did not fail
    pub fn error_code(&self) -> i32 {
        let status = self.status();
        if status.is_error() { status.code() } else { 0 }
    }

    /// non-blocking value access - Some iff the future completed OK
    pub fn value(&self) -> Option<T> {
        let inner = self.data.inner.lock().unwrap();
        if inner.status.is_ok() { inner.value.clone() } else { None }
    }

    //--- transitions (crate internal - producers go through Promise)

    /// first terminal transition wins; all later ones are no-ops
    pub(crate) fn resolve(&self, v: T) {
        self.complete(Status::ok(), Some(v));
    }

    pub(crate) fn fail(&self, code: i32) {
        let mut status = Status::new(code);
        if !status.is_error() {
            // INIT/OK are not failure codes - keep the transition total
            warn!("SetFailed with non-error code {}, using KERROR", code);
            status = Status::error();
        }
        self.complete(status, None);
    }

    fn complete(&self, status: Status, value: Option<T>) {
        let (callbacks, wakers) = {
            let mut inner = self.data.inner.lock().unwrap();
            if !inner.status.is_init() {
                return; // idempotent terminal state
            }
            inner.status = status;
            inner.value = value;

            // splice the callback list out of the state and run it after unlocking -
            // completion handlers routinely dispatch to other actors
            let callbacks = std::mem::take(&mut inner.on_complete);
            inner.on_abandoned.clear();
            let wakers = std::mem::take(&mut inner.wakers);
            (callbacks, wakers)
        };

        self.data.resolved.notify_all();
        for w in wakers {
            w.wake();
        }
        for cb in callbacks {
            cb(self);
        }
    }

    /// transition an unresolved future to abandoned. `force` is used by association
    /// mirrors - a regular producer drop does not abandon an associated future
    pub(crate) fn abandon_with(&self, force: bool) {
        let (callbacks, dropped, wakers) = {
            let mut inner = self.data.inner.lock().unwrap();
            if inner.abandoned || !inner.status.is_init() || (inner.associated && !force) {
                return;
            }
            inner.abandoned = true;

            let callbacks = std::mem::take(&mut inner.on_abandoned);
            // dropping the completion callbacks releases any chained promises they
            // captured, which cascades abandonment down the chain
            let dropped = std::mem::take(&mut inner.on_complete);
            let wakers = std::mem::take(&mut inner.wakers);
            (callbacks, dropped, wakers)
        };

        self.data.resolved.notify_all();
        for w in wakers {
            w.wake();
        }
        drop(dropped);
        for cb in callbacks {
            cb(self);
        }
    }

    pub fn abandon(&self) {
        self.abandon_with(false);
    }

    pub(crate) fn mark_associated(&self) -> bool {
        let mut inner = self.data.inner.lock().unwrap();
        if inner.status.is_init() && !inner.associated {
            inner.associated = true;
            true
        } else {
            false
        }
    }

    //--- callbacks

    /// register a completion callback. Runs immediately on the caller thread if the
    /// future is already terminal; is silently dropped if the future is abandoned
    /// (which releases anything it captured)
    pub fn on_complete<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Future<T>) + Send + 'static,
    {
        let mut cb: Option<CompleteFn<T>> = Some(Box::new(f));
        {
            let mut inner = self.data.inner.lock().unwrap();
            if inner.status.is_init() && !inner.abandoned {
                inner.on_complete.push(cb.take().unwrap());
            }
        }
        if let Some(cb) = cb {
            if !self.is_init() {
                cb(self); // already terminal
            }
            // otherwise already abandoned - drop cb
        }
        self
    }

    /// register an abandonment callback. Runs immediately if the future is already
    /// abandoned; is dropped if the future is already terminal
    pub fn on_abandoned<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Future<T>) + Send + 'static,
    {
        let mut cb: Option<CompleteFn<T>> = Some(Box::new(f));
        {
            let mut inner = self.data.inner.lock().unwrap();
            if inner.status.is_init() && !inner.abandoned {
                inner.on_abandoned.push(cb.take().unwrap());
            }
        }
        if let Some(cb) = cb {
            if self.is_abandoned() {
                cb(self);
            }
        }
        self
    }

    //--- chaining

    /// chain a value-returning continuation. Errors short-circuit with the same code,
    /// abandonment of the upstream abandons the result
    pub fn then<R, F>(&self, f: F) -> Future<R>
    where
        R: Clone + Send + 'static,
        F: FnOnce(&T) -> R + Send + 'static,
    {
        let promise = Promise::new();
        let result = promise.future();
        self.on_complete(move |ft| {
            if ft.is_error() {
                promise.set_failed(ft.error_code());
            } else if let Some(v) = ft.value() {
                promise.set_value(f(&v));
            }
        });
        result
    }

    /// chain a future-returning continuation - the result is associated with whatever
    /// `f` returns (Rust cannot overload `then` on the return type)
    pub fn then_future<R, F>(&self, f: F) -> Future<R>
    where
        R: Clone + Send + 'static,
        F: FnOnce(&T) -> Future<R> + Send + 'static,
    {
        let promise = Promise::new();
        let result = promise.future();
        self.on_complete(move |ft| {
            if ft.is_error() {
                promise.set_failed(ft.error_code());
            } else if let Some(v) = ft.value() {
                promise.associate(&f(&v));
            }
        });
        result
    }

    //--- waiting

    /// block the caller thread until this future is terminal (completed or abandoned).
    /// Not for use inside actor handlers - compose with `then`/`on_complete` there
    pub fn wait(&self) {
        let mut inner = self.data.inner.lock().unwrap();
        while inner.status.is_init() && !inner.abandoned {
            inner = self.data.resolved.wait(inner).unwrap();
        }
    }

    /// block for at most `time_ms`. KOK iff the future completed within the window,
    /// KERROR on timeout or abandonment. `wait_for(0)` only succeeds on an already
    /// terminal future
    pub fn wait_for(&self, time_ms: u64) -> Status {
        let deadline = Instant::now() + Duration::from_millis(time_ms);

        let mut inner = self.data.inner.lock().unwrap();
        while inner.status.is_init() && !inner.abandoned {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self.data.resolved.wait_timeout(inner, deadline - now).unwrap();
            inner = guard;
        }

        if !inner.status.is_init() { Status::ok() } else { Status::error() }
    }

    /// blocking get - waits until terminal, Some iff completed OK
    pub fn get(&self) -> Option<T> {
        self.wait();
        self.value()
    }

    /// timed blocking get
    pub fn get_timeout(&self, time_ms: u64) -> Option<T> {
        if self.wait_for(time_ms).is_error() {
            return None;
        }
        self.value()
    }

    //--- deadline rescue

    /// bound this future by a deadline: the returned future mirrors this one if it
    /// completes within `delay`, otherwise it is associated with `rescue(self)`.
    /// The rescue closure runs only if the timer actually fires, i.e. the upstream
    /// was still unresolved
    pub fn after<F>(&self, delay: Duration, timers: &Arc<TimerService>, rescue: F) -> Future<T>
    where
        F: FnOnce(&Future<T>) -> Future<T> + Send + 'static,
    {
        let promise = Arc::new(Promise::new());
        let result = promise.future();

        let orig = self.clone();
        let timer_promise = promise.clone();
        let timer = match timers.schedule(delay, move || {
            timer_promise.associate(&rescue(&orig));
        }) {
            Ok(timer) => timer,
            Err(e) => {
                warn!("cannot schedule rescue timer: {e}");
                promise.associate(self);
                return result;
            }
        };

        let timers = timers.clone();
        self.on_complete(move |ft| {
            timers.cancel(&timer);
            promise.associate(ft);
        });

        result
    }
}

/// awaiting a litebus future from within a tokio task yields its terminal state;
/// abandonment surfaces as a KERROR status
impl<T> std::future::Future for Future<T>
where
    T: Clone + Send + 'static,
{
    type Output = std::result::Result<T, Status>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.data.inner.lock().unwrap();
        if inner.status.is_ok() {
            match inner.value.clone() {
                Some(v) => Poll::Ready(Ok(v)),
                None => Poll::Ready(Err(Status::error())),
            }
        } else if inner.status.is_error() {
            Poll::Ready(Err(inner.status))
        } else if inner.abandoned {
            Poll::Ready(Err(Status::error()))
        } else {
            let w = cx.waker();
            if !inner.wakers.iter().any(|x| x.will_wake(w)) {
                inner.wakers.push(w.clone());
            }
            Poll::Pending
        }
    }
}

/// the producer side. A freshly constructed Promise starts its future non-abandoned;
/// dropping the promise without having set a value or associated another future
/// abandons it. Promises are single-owner - share the [`Future`], not the producer
pub struct Promise<T>
where
    T: Clone + Send + 'static,
{
    future: Future<T>,
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Promise { future: Future::with_producer() }
    }

    pub fn future(&self) -> Future<T> {
        self.future.clone()
    }

    /// no-op if the future is already terminal or was associated
    pub fn set_value(&self, v: T) {
        if !self.is_associated() {
            self.future.resolve(v);
        }
    }

    /// no-op if the future is already terminal or was associated
    pub fn set_failed(&self, code: i32) {
        if !self.is_associated() {
            self.future.fail(code);
        }
    }

    /// transfer ownership of the result: our future mirrors `other`, including its
    /// abandonment. A promise that associated never fulfills its own future directly
    pub fn associate(&self, other: &Future<T>) {
        if self.future.mark_associated() {
            let target = self.future.clone();
            other.on_complete(move |ft| {
                if ft.is_error() {
                    target.fail(ft.error_code());
                } else if let Some(v) = ft.value() {
                    target.resolve(v);
                }
            });

            let target = self.future.clone();
            other.on_abandoned(move |_| {
                target.abandon_with(true);
            });
        }
    }

    fn is_associated(&self) -> bool {
        self.future.data.inner.lock().unwrap().associated
    }
}

impl<T> Drop for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.future.abandon_with(false);
    }
}

impl<T> Default for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Promise::new()
    }
}

impl<T> fmt::Debug for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise({})", self.future.status())
    }
}
