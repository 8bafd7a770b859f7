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

use crate::seq_value::SeqValue;

/// A value together with the sequence number assigned by the backend when it was written.
///
/// The backend keeps a single counter that strictly increases on every successful write,
/// so the `seq` of an item changes whenever the item changes.
/// An absent item is treated as having `seq == 0`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SeqV<T = Vec<u8>> {
    pub seq: u64,
    pub data: T,
}

impl<T> SeqV<T> {
    pub fn new(seq: u64, data: T) -> Self {
        Self { seq, data }
    }

    /// Transform the data with a fallible function, keeping the sequence number.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<SeqV<U>, E> {
        Ok(SeqV {
            seq: self.seq,
            data: f(self.data)?,
        })
    }
}

impl<T> SeqValue<T> for SeqV<T> {
    fn seq(&self) -> u64 {
        self.seq
    }

    fn into_value(self) -> Option<T> {
        Some(self.data)
    }
}

impl<T> fmt::Display for SeqV<T>
where T: fmt::Debug
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(seq={} {:?})", self.seq, self.data)
    }
}
