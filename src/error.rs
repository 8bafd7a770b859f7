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


use std::io;

use crate::doc_id::InvalidDocId;
use crate::revision::PendingRevision;
use crate::revision_id::RevisionId;

/// Errors returned by [`DocStore`](crate::DocStore) operations.
///
/// Write errors tell apart "nothing happened" from "partially happened", see
/// [`DocStoreError::partially_applied`].
#[derive(Debug, thiserror::Error)]
pub enum DocStoreError {
    /// The doc id failed validation; the backend was not contacted.
    #[error(transparent)]
    Validation(#[from] InvalidDocId),

    #[error("Doc not found: {doc_id}")]
    DocumentNotFound { doc_id: String },

    #[error("Revision not found: {doc_id}@{revision_id}")]
    RevisionNotFound {
        doc_id: String,
        revision_id: RevisionId,
    },

    /// A backend call failed before anything was changed by this operation.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[source] io::Error),

    /// The body of a new revision could not be read to the end; the backend was not contacted.
    #[error("Failed to read revision body: {0}")]
    ReadBody(#[source] io::Error),

    /// The operation ran out of time before `stage`; nothing was changed.
    #[error("Deadline exceeded before {stage}")]
    DeadlineExceeded { stage: &'static str },

    /// The pointer write of an advance failed without a reply: the pointer may or may not have
    /// moved to `revision_id`. Use [`DocStore::verify`](crate::DocStore::verify) before
    /// writing again.
    #[error("Unconfirmed advance of {doc_id} to {revision_id}: {source}")]
    AdvanceUnconfirmed {
        doc_id: String,
        revision_id: RevisionId,
        #[source]
        source: io::Error,
    },

    /// Other writers kept winning the pointer compare-and-swap; nothing was changed.
    #[error("Gave up advancing the latest revision of {doc_id} after {attempts} attempts")]
    AdvanceConflict { doc_id: String, attempts: u32 },

    /// The generated revision id is already taken; no history was overwritten.
    ///
    /// `unwritten` is `None` if the collision was found before the pointer moved. It is `Some`
    /// if the pointer had already been advanced onto the existing entry, which is now the
    /// latest revision; it then holds the content that was not written.
    #[error("Revision id collision: {doc_id}@{revision_id} already exists")]
    RevisionCollision {
        doc_id: String,
        revision_id: RevisionId,
        unwritten: Option<Box<PendingRevision>>,
    },

    /// A pending revision can not be completed because the document no longer references it:
    /// its pointer was rolled back by a repair.
    #[error("Revision {doc_id}@{revision_id} was abandoned by a rollback")]
    RevisionAbandoned {
        doc_id: String,
        revision_id: RevisionId,
    },

    /// The latest-revision pointer was advanced, but the revision log entry it points at was not
    /// confirmed written. Until it is, readers of the latest revision get `RevisionNotFound`.
    ///
    /// Nothing is retried automatically. Finish the write with
    /// [`DocStore::complete_pending`](crate::DocStore::complete_pending), or roll the pointer back
    /// with [`DocStore::repair`](crate::DocStore::repair).
    #[error(
        "Inconsistent write: {}@{} is published but its log entry is not written: {source}",
        .pending.metadata.doc_id,
        .pending.metadata.id
    )]
    InconsistentWrite {
        pending: Box<PendingRevision>,
        #[source]
        source: io::Error,
    },

    /// A stored item could not be decoded.
    #[error("Corrupt item {table}/{key}: {source}")]
    Corrupt {
        table: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid page token {token:?}: {reason}")]
    InvalidPageToken { token: String, reason: String },
}

impl DocStoreError {
    /// Whether the failed operation left the store changed.
    ///
    /// An inconsistent write did: its pointer is published without the log entry.
    /// A collision found after the advance did: the pointer moved onto an existing entry.
    /// An unconfirmed advance may have, and is counted as if it did.
    pub fn partially_applied(&self) -> bool {
        matches!(
            self,
            DocStoreError::InconsistentWrite { .. }
                | DocStoreError::RevisionCollision {
                    unwritten: Some(_),
                    ..
                }
                | DocStoreError::AdvanceUnconfirmed { .. }
        )
    }

    /// Whether this is one of the not-found kinds.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocStoreError::DocumentNotFound { .. } | DocStoreError::RevisionNotFound { .. }
        )
    }

    /// Whether retrying the whole operation from scratch is safe and may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocStoreError::BackendUnavailable(_)
                | DocStoreError::DeadlineExceeded { .. }
                | DocStoreError::AdvanceConflict { .. }
                | DocStoreError::RevisionCollision {
                    unwritten: None,
                    ..
                }
        )
    }
}
