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


use log::info;
use log::warn;

use crate::doc::Doc;
use crate::doc_id::DocId;
use crate::error::DocStoreError;
use crate::revision_id::RevisionId;
use crate::seq_value::SeqV;
use crate::DocStore;
use crate::KvApi;

/// Whether the latest-revision pointer of a document resolves to a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The latest revision is in the log, or the document has no revision.
    Consistent { latest: Option<RevisionId> },

    /// The latest revision is not in the log, but the pointer was advanced less than
    /// `repair_grace` ago: its writer may still be inserting it.
    Pending { doc: SeqV<Doc> },

    /// The latest revision is not in the log and its writer is assumed gone.
    Dangling { doc: SeqV<Doc> },
}

/// What [`DocStore::repair`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    AlreadyConsistent,

    /// The pointer is younger than `repair_grace`; nothing was changed.
    StillPending,

    /// The pointer was moved back from the missing revision to its predecessor.
    RolledBack {
        from: RevisionId,
        to: Option<RevisionId>,
    },
}

impl<KV> DocStore<KV>
where KV: KvApi
{
    /// Check that the latest-revision pointer of `doc_id` resolves to a revision in the log.
    pub async fn verify(&self, doc_id: &str) -> Result<Verification, DocStoreError> {
        let doc_id = DocId::new(doc_id)?;
        let doc = self.fetch_existing(&doc_id).await?;
        self.verify_doc(&doc_id, doc).await
    }

    /// Roll back a dangling latest-revision pointer of `doc_id` to the previous revision.
    ///
    /// The rollback is a compare-and-swap on the index record: if another writer advanced the
    /// pointer since it was verified, nothing is changed and
    /// [`DocStoreError::AdvanceConflict`] is returned.
    ///
    /// To keep the revision instead, complete it with
    /// [`complete_pending`](Self::complete_pending) before the grace period ends. Once rolled
    /// back, the revision is abandoned: completing it is refused, and its id is not generated
    /// again.
    pub async fn repair(&self, doc_id: &str) -> Result<RepairOutcome, DocStoreError> {
        let doc_id = DocId::new(doc_id)?;
        let doc = self.fetch_existing(&doc_id).await?;

        let doc = match self.verify_doc(&doc_id, doc).await? {
            Verification::Consistent { .. } => return Ok(RepairOutcome::AlreadyConsistent),
            Verification::Pending { .. } => return Ok(RepairOutcome::StillPending),
            Verification::Dangling { doc } => doc,
        };

        let Some(from) = doc.data.latest_revision.clone() else {
            return Ok(RepairOutcome::AlreadyConsistent);
        };
        let to = doc.data.previous_revision.clone();

        // The rolled back record needs the back-link of the new latest revision.
        let previous_of_to = match &to {
            None => None,
            Some(to) => match self.log().get(&doc_id, to).await? {
                Some(record) => record.metadata.previous_revision,
                None => {
                    warn!(
                        "cannot roll back {} from {}: previous revision {} is missing too",
                        doc_id, from, to
                    );
                    return Err(DocStoreError::RevisionNotFound {
                        doc_id: doc_id.to_string(),
                        revision_id: to.clone(),
                    });
                }
            },
        };

        let restored = Doc {
            id: doc_id.clone(),
            latest_revision: to.clone(),
            previous_revision: previous_of_to,
            revision_count: doc.data.revision_count,
            updated_at: self.now(),
        };

        let written = self.index().restore(&doc_id, doc.seq, &restored).await?;
        if !written {
            warn!(
                "rollback of {} from {} lost the race with a concurrent writer",
                doc_id, from
            );
            return Err(DocStoreError::AdvanceConflict {
                doc_id: doc_id.to_string(),
                attempts: 1,
            });
        }

        info!("rolled back {} from {} to {:?}", doc_id, from, to);
        Ok(RepairOutcome::RolledBack { from, to })
    }

    async fn fetch_existing(&self, doc_id: &DocId) -> Result<SeqV<Doc>, DocStoreError> {
        self.deadline().check("fetching the doc index")?;

        self.index()
            .fetch(doc_id)
            .await?
            .ok_or_else(|| DocStoreError::DocumentNotFound {
                doc_id: doc_id.to_string(),
            })
    }

    async fn verify_doc(
        &self,
        doc_id: &DocId,
        doc: SeqV<Doc>,
    ) -> Result<Verification, DocStoreError> {
        let Some(latest) = doc.data.latest_revision.clone() else {
            return Ok(Verification::Consistent { latest: None });
        };

        if self.log().get(doc_id, &latest).await?.is_some() {
            return Ok(Verification::Consistent {
                latest: Some(latest),
            });
        }

        // A negative age means the clock moved back; treat it as young.
        let age = (self.now() - doc.data.updated_at).to_std();
        let dangling = matches!(age, Ok(age) if age >= self.config.repair_grace());

        if dangling {
            warn!("latest revision {} of {} is dangling", latest, doc_id);
            Ok(Verification::Dangling { doc })
        } else {
            Ok(Verification::Pending { doc })
        }
    }
}
