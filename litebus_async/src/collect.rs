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

use crate::{Future, Promise};
use std::sync::{Arc, Mutex};

struct CollectState<T>
where
    T: Clone + Send + 'static,
{
    results: Vec<Option<T>>,
    remaining: usize,
    promise: Option<Promise<Vec<T>>>,
}

/// aggregate a list of futures into a future of the value list, preserving input
/// order. The first observed error fails the collection with the same code; an
/// abandoned input abandons it. An empty input completes immediately
pub fn collect<T>(futures: &[Future<T>]) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let n = futures.len();
    if n == 0 {
        return Future::from_value(Vec::new());
    }

    let promise = Promise::new();
    let result = promise.future();

    let state = Arc::new(Mutex::new(CollectState {
        results: (0..n).map(|_| None).collect(),
        remaining: n,
        promise: Some(promise),
    }));

    for (idx, fut) in futures.iter().enumerate() {
        let complete_state = state.clone();
        fut.on_complete(move |ft| {
            let mut s = complete_state.lock().unwrap();
            if ft.is_error() {
                if let Some(p) = s.promise.take() {
                    p.set_failed(ft.error_code());
                }
            } else if let Some(v) = ft.value() {
                if s.results[idx].is_none() {
                    s.results[idx] = Some(v);
                    s.remaining -= 1;
                }
                if s.remaining == 0 {
                    if let Some(p) = s.promise.take() {
                        let mut values = Vec::with_capacity(s.results.len());
                        for slot in s.results.iter_mut() {
                            if let Some(v) = slot.take() {
                                values.push(v);
                            }
                        }
                        p.set_value(values);
                    }
                }
            }
        });

        let abandon_state = state.clone();
        fut.on_abandoned(move |_| {
            let mut s = abandon_state.lock().unwrap();
            s.promise.take(); // dropping the producer abandons the collection
        });
    }

    result
}
