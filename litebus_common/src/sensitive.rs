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

use std::fmt;

/// owned byte buffer for credentials (TLS keys, pass phrases). The buffer is scrubbed
/// with volatile writes before it is freed, and it never appears in Debug/Display output.
/// Cloning is supported but deliberately explicit - prefer passing references around
pub struct SensitiveBytes {
    data: Vec<u8>,
}

impl SensitiveBytes {
    pub fn new(data: Vec<u8>) -> Self {
        SensitiveBytes { data }
    }

    pub fn from_str(s: &str) -> Self {
        SensitiveBytes { data: s.as_bytes().to_vec() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for SensitiveBytes {
    fn drop(&mut self) {
        for b in self.data.iter_mut() {
            // volatile so the scrub is not optimized away
            unsafe { std::ptr::write_volatile(b, 0) };
        }
        std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clone for SensitiveBytes {
    fn clone(&self) -> Self {
        SensitiveBytes { data: self.data.clone() }
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes(<{} bytes>)", self.data.len())
    }
}

impl fmt::Display for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted>")
    }
}
