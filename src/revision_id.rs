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


//! Revision identifiers and the policies generating them.

use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Width of a sequence id: enough digits for `u64::MAX`.
const SEQUENCE_WIDTH: usize = 20;

/// Fixed-width UTC rendering; lexicographic order is chronological order.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.9fZ";

/// Identifies a revision within the revision sequence of one document.
///
/// Ids produced by either [`RevisionIdPolicy`] are fixed-width, so comparing them as strings
/// orders revisions by creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(id: impl ToString) -> Self {
        RevisionId(id.to_string())
    }

    /// The id of the `n`-th revision of a document, 1-based.
    pub fn sequence(n: u64) -> Self {
        RevisionId(format!("{:0width$}", n, width = SEQUENCE_WIDTH))
    }

    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        RevisionId(ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a new revision id is derived when the latest-revision pointer is advanced.
///
/// Both policies produce ids that sort strictly after every earlier id of the same document.
/// The pointer advance rejects an id that does not, so a document's chain never cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionIdPolicy {
    /// A per-document counter, incremented by the same atomic step that moves the pointer.
    ///
    /// Unique regardless of clock resolution.
    #[default]
    Sequence,

    /// The wall-clock time of the advance.
    ///
    /// Two writes to one document within the clock resolution produce the same id; the second
    /// one is rejected as a collision before the pointer moves.
    Timestamp,
}

impl RevisionIdPolicy {
    /// Generate the id for the next revision of a document that has had `revision_count`
    /// revisions so far, at time `now`.
    pub fn next_id(&self, revision_count: u64, now: DateTime<Utc>) -> RevisionId {
        match self {
            RevisionIdPolicy::Sequence => RevisionId::sequence(revision_count + 1),
            RevisionIdPolicy::Timestamp => RevisionId::from_timestamp(now),
        }
    }
}
