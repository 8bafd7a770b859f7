// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Specifies the sequence number condition that a backend write must satisfy to take effect.
///
/// Every item stored in the backend carries the sequence number (`seq`) of the write that
/// produced it; an absent item has `seq == 0`. The document store relies on two uses:
///
/// - `Exact(0)`: insert only if the key is absent. Revision log entries are written this way
///   so that an existing revision is never overwritten.
/// - `Exact(s)`: compare-and-swap. The latest-revision pointer of a document is advanced only
///   if nobody else advanced it since it was read at `s`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MatchSeq {
    /// Any value is acceptable, i.e. does not check seq at all.
    Any,

    /// To match an exact value of seq.
    Exact(u64),

    /// To match a seq that is greater-or-equal some value.
    ///
    /// E.g., GE(1) matches any existent item.
    GE(u64),
}

impl MatchSeq {
    /// Condition for creating an item that must not exist yet.
    pub const fn absent() -> Self {
        MatchSeq::Exact(0)
    }
}

impl fmt::Display for MatchSeq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchSeq::Any => write!(f, "is any value"),
            MatchSeq::Exact(s) => write!(f, "== {}", s),
            MatchSeq::GE(s) => write!(f, ">= {}", s),
        }
    }
}
