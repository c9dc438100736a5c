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

use std::collections::VecDeque;

/// bounded ring buffer on top of a [`VecDeque`] - once `max_len` elements are stored
/// each push drops (and returns) the oldest one. We use this for per-actor message
/// diagnostics (keep the last N message names without ever growing).
/// Note we keep our own bound instead of relying on VecDeque::capacity(), which is
/// only a lower-bound guarantee
#[derive(Debug, Clone)]
pub struct RingBuffer<E> {
    max_len: usize,
    buf: VecDeque<E>,
}

impl<E> RingBuffer<E> {
    pub fn new(max_len: usize) -> Self {
        RingBuffer {
            max_len,
            buf: VecDeque::with_capacity(max_len),
        }
    }

    /// push to the back, returning the dropped front element once we wrapped around
    pub fn push(&mut self, e: E) -> Option<E> {
        let dropped = if self.buf.len() >= self.max_len {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(e);
        dropped
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// newest-first iteration (diagnostic dumps want the most recent entry on top)
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &E> {
        self.buf.iter().rev()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.buf.iter()
    }

    pub fn to_vec(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.buf.iter().cloned().collect()
    }
}
