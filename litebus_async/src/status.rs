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

/// tri-state status of an asynchronous value: INIT (not yet resolved), OK, or an
/// arbitrary error code. Any code outside {KINIT,KOK} is an error - producers carry
/// their own code spaces (the http layer uses errno-style codes, for instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    code: i32,
}

impl Status {
    pub const KINIT: i32 = 1;
    pub const KOK: i32 = 0;
    pub const KERROR: i32 = -1;

    pub fn new(code: i32) -> Self {
        Status { code }
    }

    pub fn ok() -> Self {
        Status { code: Self::KOK }
    }

    pub fn error() -> Self {
        Status { code: Self::KERROR }
    }

    pub fn is_init(&self) -> bool {
        self.code == Self::KINIT
    }

    pub fn is_ok(&self) -> bool {
        self.code == Self::KOK
    }

    pub fn is_error(&self) -> bool {
        self.code != Self::KINIT && self.code != Self::KOK
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn set_ok(&mut self) {
        self.code = Self::KOK;
    }

    pub fn set_error(&mut self) {
        self.code = Self::KERROR;
    }

    pub fn set_code(&mut self, code: i32) {
        self.code = code;
    }
}

impl Default for Status {
    fn default() -> Self {
        Status { code: Self::KINIT }
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status { code }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_init() {
            write!(f, "INIT")
        } else if self.is_ok() {
            write!(f, "OK")
        } else {
            write!(f, "ERROR({})", self.code)
        }
    }
}
