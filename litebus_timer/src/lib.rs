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
#![allow(unused)]

//! litebus_timer is the process-wide timer service of litebus, scheduling sendable
//! `FnOnce` actions with millisecond resolution (which is more than most operating
//! systems provide anyways). Pending timers live in a deadline-sorted deque that is
//! drained by a single service task; scheduling a new front entry interrupts the
//! current sleep through a wakeup channel.
//!
//! Cancellation is advisory: once a timer has fired its action runs (or already ran)
//! and [`TimerService::cancel`] returns false. Actions execute on the service task -
//! anything that is not trivial should immediately re-dispatch (the actor layer wraps
//! actions into mailbox messages for exactly that reason).

use kanal::{AsyncReceiver, AsyncSender};
use std::{
    cmp::max,
    collections::VecDeque,
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime},
};
use thiserror::Error;
use tokio::{
    select,
    task::JoinHandle,
    time::{sleep, Sleep},
};
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TimerError {
    #[error("timer service not running")]
    NotRunning,

    #[error("timer service already running")]
    AlreadyRunning,

    #[error("max number of pending timers exceeded")]
    MaxPendingTimers,

    #[error("spawn failed {0}")]
    SpawnFailed(String),
}

pub type Result<T> = std::result::Result<T, TimerError>;

/// opaque handle for a scheduled timer. Id 0 means "no timer" so that owners can keep
/// a default handle around without an Option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer(u64);

impl Timer {
    pub fn none() -> Self {
        Timer(0)
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Timer::none()
    }
}

struct Entry {
    id: u64,
    deadline_millis: u64,
    action: Box<dyn FnOnce() + Send>,
}

impl Entry {
    fn delay(&self) -> Sleep {
        let now = now_epoch_millis();
        let wait_millis = if now >= self.deadline_millis { 0 } else { self.deadline_millis - now };
        sleep(Duration::from_millis(wait_millis))
    }
}

impl Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let abbrv_deadline = self.deadline_millis & 0x0000ffff;
        write!(f, "Entry(id:{},deadline_millis:…{})", self.id, abbrv_deadline)
    }
}

struct WakeUp {}

/// the shared timer service. All methods take &self so that the service can be handed
/// around in an Arc (the actor system, the future layer and the http transport all
/// schedule timers on the same instance)
pub struct TimerService {
    next_id: AtomicU64,
    queue: Arc<Mutex<VecDeque<Entry>>>,
    max_pending: usize,
    tx: Mutex<Option<AsyncSender<WakeUp>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::with_max_pending(usize::MAX)
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        TimerService {
            next_id: AtomicU64::new(1), // note we start at id 1 (0 means no timer)
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(32))),
            max_pending,
            tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// start the service task. Must be called from within a tokio runtime context
    pub fn run(&self) -> Result<()> {
        let mut task = self.task.lock().unwrap();
        if task.is_some() {
            return Err(TimerError::AlreadyRunning);
        }

        let (tx, rx) = kanal::unbounded_async::<WakeUp>();
        *self.tx.lock().unwrap() = Some(tx);

        let queue = self.queue.clone();
        *task = Some(tokio::spawn(async move {
            loop {
                let next_delay: Option<Sleep> = {
                    let queue = queue.lock().unwrap();
                    queue.front().map(|entry| entry.delay())
                };

                if let Some(delay) = next_delay {
                    tokio::pin!(delay);

                    select! {
                        _ = rx.recv() => {} // just a wakeup interrupt to re-evaluate the front entry
                        () = &mut delay => {
                            let fired = {
                                let mut queue = queue.lock().unwrap();
                                queue.pop_front()
                            };
                            if let Some(entry) = fired {
                                debug!("timer {} fired", entry.id);
                                (entry.action)();
                            }
                        }
                    }
                } else {
                    // queue is empty - wait for the next schedule()
                    if rx.recv().await.is_err() {
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().unwrap().is_some()
    }

    /// schedule `action` to run once after `delay`. Returns the handle to cancel with
    pub fn schedule(&self, delay: Duration, action: impl FnOnce() + Send + 'static) -> Result<Timer> {
        let tx_guard = self.tx.lock().unwrap();
        let tx = tx_guard.as_ref().ok_or(TimerError::NotRunning)?;

        let mut queue = self.queue.lock().unwrap();
        if queue.len() >= self.max_pending {
            return Err(TimerError::MaxPendingTimers);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline_millis = now_epoch_millis() + delay.as_millis() as u64;
        let entry = Entry { id, deadline_millis, action: Box::new(action) };

        if sort_in(entry, &mut queue) == 0 {
            let _ = tx.try_send(WakeUp {});
        }

        Ok(Timer(id))
    }

    /// advisory cancellation: true iff the timer was still pending and got removed.
    /// A timer that already fired (or was never scheduled) returns false and its
    /// action runs / has run
    pub fn cancel(&self, timer: &Timer) -> bool {
        let mut queue = self.queue.lock().unwrap();
        let id = timer.0;

        if id > 0 && id < self.next_id.load(Ordering::Relaxed) {
            for (idx, entry) in queue.iter().enumerate() {
                if entry.id == id {
                    queue.remove(idx);
                    return true;
                }
            }
        }
        false
    }

    pub fn is_pending(&self, timer: &Timer) -> bool {
        let queue = self.queue.lock().unwrap();
        queue.iter().any(|entry| entry.id == timer.0 && timer.0 > 0)
    }

    pub fn clear(&self) {
        let mut queue = self.queue.lock().unwrap();
        queue.clear();
    }

    // don't block here - this should be infallible
    pub fn shutdown(&self) {
        let mut task = self.task.lock().unwrap();
        if let Some(task) = task.take() {
            task.abort(); // this will stop pending timers from being executed
            *self.tx.lock().unwrap() = None;
            self.clear();
        }
    }
}

impl Default for TimerService {
    fn default() -> Self {
        TimerService::new()
    }
}

// ensure this is only called after acquiring the queue lock
fn sort_in(entry: Entry, queue: &mut VecDeque<Entry>) -> usize {
    if queue.is_empty() {
        queue.push_front(entry);
        0
    } else {
        // since queue is not empty we can safely unwrap front()/back()
        if entry.deadline_millis >= queue.back().unwrap().deadline_millis {
            queue.push_back(entry);
            queue.len() - 1
        } else if entry.deadline_millis >= queue.front().unwrap().deadline_millis {
            for idx in 0..queue.len() {
                if entry.deadline_millis < queue[idx].deadline_millis {
                    queue.insert(idx, entry);
                    return idx;
                }
            }
            queue.len() - 1 // can't happen
        } else {
            queue.push_front(entry);
            0
        }
    }
}

#[inline]
fn now_epoch_millis() -> u64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap().as_millis() as u64
}
