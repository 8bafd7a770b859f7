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


use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::doc_id::DocId;
use crate::revision_id::RevisionId;

/// The document index record: one per document, pointing at its latest revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub id: DocId,

    /// The most recently published revision. `None` only for a document whose first write was
    /// rolled back by a repair.
    pub latest_revision: Option<RevisionId>,

    /// The back-link of `latest_revision`, kept here so that a pointer to a revision that never
    /// reached the log can be rolled back.
    pub previous_revision: Option<RevisionId>,

    /// Number of pointer advances so far, including ones later rolled back.
    ///
    /// A repair never decrements it, so a sequence id is never handed out twice.
    pub revision_count: u64,

    /// When the pointer was last advanced.
    pub updated_at: DateTime<Utc>,
}

/// One page of documents returned by [`DocStore::list_docs`](crate::DocStore::list_docs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocPage {
    pub docs: Vec<Doc>,

    /// Pass it to the next `list_docs` call to continue after this page.
    pub next_token: String,

    /// True if there are more docs after this page.
    pub more: bool,
}
