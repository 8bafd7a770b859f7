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


//! The document index accessor.
//!
//! Reads and atomically advances the latest-revision pointer of a document. The advance is a
//! compare-and-swap loop over [`KvApi::upsert`]: read the pointer at seq `s`, derive the new
//! record from it, and write it on condition that the seq is still `s`. When the condition fails
//! another writer has advanced the pointer in between; the loop continues from the record that
//! writer installed. Each successful advance therefore observes a distinct previous pointer.

use chrono::DateTime;
use chrono::Utc;
use log::debug;
use log::warn;

use crate::deadline::Deadline;
use crate::doc::Doc;
use crate::doc_id::DocId;
use crate::error::DocStoreError;
use crate::match_seq::MatchSeq;
use crate::revision_id::RevisionId;
use crate::revision_id::RevisionIdPolicy;
use crate::seq_value::SeqV;
use crate::seq_value::SeqValue;
use crate::KvApi;

/// The result of a successful pointer advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// The pointer value replaced by this advance; `None` for the first revision.
    pub previous: Option<RevisionId>,

    /// The id the pointer now holds.
    pub current: RevisionId,

    pub timestamp: DateTime<Utc>,

    /// The index record as installed, with its backend seq.
    pub doc: SeqV<Doc>,

    /// How many compare-and-swap rounds it took, `1` if uncontended.
    pub attempts: u32,
}

/// Accesses the document index table of a backend.
pub struct DocIndex<'a, KV> {
    kv: &'a KV,
    table: &'a str,
}

impl<'a, KV> DocIndex<'a, KV>
where KV: KvApi
{
    pub fn new(kv: &'a KV, table: &'a str) -> Self {
        Self { kv, table }
    }

    /// Point lookup of the index record of `doc_id`.
    pub async fn fetch(&self, doc_id: &DocId) -> Result<Option<SeqV<Doc>>, DocStoreError> {
        let got = self
            .kv
            .get(self.table, doc_id.as_str())
            .await
            .map_err(DocStoreError::BackendUnavailable)?;

        got.map(|sv| sv.try_map(|bytes| self.decode(doc_id, &bytes)))
            .transpose()
    }

    /// Atomically move the latest-revision pointer of `doc_id` to a new revision id generated
    /// by `policy`, returning the pointer value it replaced.
    ///
    /// Creates the index record if the document does not exist yet.
    ///
    /// Nothing is changed if this returns an error other than
    /// [`DocStoreError::AdvanceUnconfirmed`].
    pub async fn advance(
        &self,
        doc_id: &DocId,
        policy: RevisionIdPolicy,
        now: &(dyn Fn() -> DateTime<Utc> + Send + Sync),
        max_attempts: u32,
        deadline: &Deadline,
    ) -> Result<Advance, DocStoreError> {
        deadline.check("fetching the doc index")?;
        let mut current = self.fetch(doc_id).await?;

        for attempt in 1..=max_attempts {
            let (seq, latest, count) = match &current {
                Some(sv) => (
                    sv.seq,
                    sv.data.latest_revision.clone(),
                    sv.data.revision_count,
                ),
                None => (0, None, 0),
            };

            let timestamp = now();
            let next = policy.next_id(count, timestamp);

            if let Some(latest) = &latest {
                if next <= *latest {
                    // The clock did not move past the latest revision: installing `next` would
                    // reuse an id or break the ordering of the chain.
                    return Err(DocStoreError::RevisionCollision {
                        doc_id: doc_id.to_string(),
                        revision_id: next,
                        unwritten: None,
                    });
                }
            }

            let doc = Doc {
                id: doc_id.clone(),
                latest_revision: Some(next.clone()),
                previous_revision: latest.clone(),
                revision_count: count + 1,
                updated_at: timestamp,
            };

            deadline.check("advancing the doc index")?;

            let change = self
                .kv
                .upsert(
                    self.table,
                    doc_id.as_str(),
                    self.encode(doc_id, &doc)?,
                    MatchSeq::Exact(seq),
                )
                .await
                .map_err(|e| DocStoreError::AdvanceUnconfirmed {
                    doc_id: doc_id.to_string(),
                    revision_id: next.clone(),
                    source: e,
                })?;

            if change.is_changed() {
                let new_seq = change.after.seq();
                debug!(
                    "advanced {} from {:?} to {} at seq {}, attempt {}",
                    doc_id, latest, next, new_seq, attempt
                );

                return Ok(Advance {
                    previous: latest,
                    current: next,
                    timestamp,
                    doc: SeqV::new(new_seq, doc),
                    attempts: attempt,
                });
            }

            debug!(
                "advance of {} lost the race at seq {}, attempt {}/{}",
                doc_id, seq, attempt, max_attempts
            );

            // The rejected write returns the record that won; continue from it.
            current = change
                .after
                .map(|sv| sv.try_map(|bytes| self.decode(doc_id, &bytes)))
                .transpose()?;
        }

        warn!(
            "giving up advancing {} after {} attempts",
            doc_id, max_attempts
        );

        Err(DocStoreError::AdvanceConflict {
            doc_id: doc_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Overwrite the index record of `doc_id` with `doc` if its seq is still `expected_seq`.
    ///
    /// Returns whether the record was written.
    pub async fn restore(
        &self,
        doc_id: &DocId,
        expected_seq: u64,
        doc: &Doc,
    ) -> Result<bool, DocStoreError> {
        let change = self
            .kv
            .upsert(
                self.table,
                doc_id.as_str(),
                self.encode(doc_id, doc)?,
                MatchSeq::Exact(expected_seq),
            )
            .await
            .map_err(DocStoreError::BackendUnavailable)?;

        Ok(change.is_changed())
    }

    fn encode(&self, doc_id: &DocId, doc: &Doc) -> Result<Vec<u8>, DocStoreError> {
        serde_json::to_vec(doc).map_err(|e| self.corrupt(doc_id, e))
    }

    fn decode(&self, doc_id: &DocId, bytes: &[u8]) -> Result<Doc, DocStoreError> {
        serde_json::from_slice(bytes).map_err(|e| self.corrupt(doc_id, e))
    }

    fn corrupt(&self, doc_id: &DocId, e: serde_json::Error) -> DocStoreError {
        DocStoreError::Corrupt {
            table: self.table.to_string(),
            key: doc_id.to_string(),
            source: e,
        }
    }
}
