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


use crate::match_seq::MatchSeq;

/// The seq of an item does not satisfy the [`MatchSeq`] condition of a write.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum ConflictSeq {
    #[error("ConflictSeq: want seq {want}, but got: {got}")]
    NotMatch { want: MatchSeq, got: u64 },
}
