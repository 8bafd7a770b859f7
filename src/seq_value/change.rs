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


use crate::seq_value::SeqV;
use crate::seq_value::SeqValue;

/// The outcome of a conditional write to one item.
///
/// `before` is the item as the backend found it, `after` is the item as the backend left it.
/// If the write condition was not met, nothing is written and `after == before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<V = Vec<u8>> {
    pub key: String,
    pub before: Option<SeqV<V>>,
    pub after: Option<SeqV<V>>,
}

impl<V> Change<V> {
    pub fn new(key: impl ToString, before: Option<SeqV<V>>, after: Option<SeqV<V>>) -> Self {
        Self {
            key: key.to_string(),
            before,
            after,
        }
    }

    /// Build the reply of a write whose condition did not hold.
    pub fn unchanged(key: impl ToString, current: Option<SeqV<V>>) -> Self
    where V: Clone {
        Self::new(key, current.clone(), current)
    }

    /// Whether the write took effect.
    ///
    /// Every applied write is assigned a new seq, thus comparing seq is enough.
    pub fn is_changed(&self) -> bool {
        self.before.seq() != self.after.seq()
    }
}
