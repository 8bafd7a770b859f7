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


//! The revision log accessor: immutable revision records keyed by `(doc id, revision id)`.

use std::io;

use log::debug;

use crate::doc_id::DocId;
use crate::error::DocStoreError;
use crate::match_seq::MatchSeq;
use crate::revision::RevisionRecord;
use crate::revision_id::RevisionId;
use crate::seq_value::SeqValue;
use crate::util::revision_key;
use crate::KvApi;

/// What an insert found at the key of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,

    /// The key is taken. The stored record is returned; it was not overwritten.
    Exists(Box<RevisionRecord>),
}

/// Accesses the revision log table of a backend.
pub struct RevisionLog<'a, KV> {
    kv: &'a KV,
    table: &'a str,
}

impl<'a, KV> RevisionLog<'a, KV>
where KV: KvApi
{
    pub fn new(kv: &'a KV, table: &'a str) -> Self {
        Self { kv, table }
    }

    /// Point lookup of one revision.
    pub async fn get(
        &self,
        doc_id: &DocId,
        revision_id: &RevisionId,
    ) -> Result<Option<RevisionRecord>, DocStoreError> {
        let key = revision_key(doc_id, revision_id);

        let got = self
            .kv
            .get(self.table, &key)
            .await
            .map_err(DocStoreError::BackendUnavailable)?;

        let Some(sv) = got else {
            return Ok(None);
        };

        let record = serde_json::from_slice(&sv.data).map_err(|e| DocStoreError::Corrupt {
            table: self.table.to_string(),
            key,
            source: e,
        })?;

        Ok(Some(record))
    }

    /// Insert `record` only if no record exists at its key.
    ///
    /// Every failure is reported as `io::Error`: the caller has usually already published the
    /// pointer to this record and reports any failure as an inconsistency.
    pub async fn insert(&self, record: &RevisionRecord) -> Result<InsertOutcome, io::Error> {
        let meta = &record.metadata;
        let key = revision_key(&meta.doc_id, &meta.id);

        let value = serde_json::to_vec(record)?;
        let change = self
            .kv
            .upsert(self.table, &key, value, MatchSeq::absent())
            .await?;

        if change.is_changed() {
            debug!("inserted revision {}", key);
            return Ok(InsertOutcome::Inserted);
        }

        let existing = change.after.into_value().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("insert of {} rejected, but no existing item returned", key),
            )
        })?;
        let existing: RevisionRecord = serde_json::from_slice(&existing)?;

        Ok(InsertOutcome::Exists(Box::new(existing)))
    }
}
