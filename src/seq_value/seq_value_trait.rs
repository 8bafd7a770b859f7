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


/// Trait for some value with sequence number.
pub trait SeqValue<V = Vec<u8>> {
    /// Return the sequence number of the value.
    fn seq(&self) -> u64;

    /// Consume the value and return the value.
    fn into_value(self) -> Option<V>;
}

/// An absent item has seq 0 and no value.
impl<V, T> SeqValue<V> for Option<T>
where T: SeqValue<V>
{
    fn seq(&self) -> u64 {
        self.as_ref().map_or(0, |x| x.seq())
    }

    fn into_value(self) -> Option<V> {
        self.and_then(|x| x.into_value())
    }
}
