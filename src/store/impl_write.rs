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

use futures::AsyncRead;
use futures::AsyncReadExt;
use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::deadline::Deadline;
use crate::doc_id::DocId;
use crate::error::DocStoreError;
use crate::revision::PendingRevision;
use crate::revision::RevisionMetadata;
use crate::revision::RevisionRecord;
use crate::revision_log::InsertOutcome;
use crate::DocStore;
use crate::KvApi;

impl<KV> DocStore<KV>
where KV: KvApi
{
    /// Publish a new revision of `doc_id` with the content read from `body`.
    ///
    /// The document is created if it does not exist. The write happens in two phases:
    ///
    /// 1. the latest-revision pointer is advanced to a new id, which yields the previous id;
    /// 2. the revision is inserted into the log with the previous id as its back-link.
    ///
    /// The pointer advance is the publish point. If phase 2 fails after phase 1 succeeded, the
    /// pointer references a revision absent from the log and
    /// [`DocStoreError::InconsistentWrite`] is returned with the revision to complete.
    pub async fn put_revision<R>(
        &self,
        doc_id: &str,
        mut body: R,
    ) -> Result<RevisionMetadata, DocStoreError>
    where R: AsyncRead + Unpin + Send {
        let doc_id = DocId::new(doc_id)?;
        let deadline = self.deadline();

        let mut buf = Vec::new();
        body.read_to_end(&mut buf)
            .await
            .map_err(DocStoreError::ReadBody)?;

        let advance = self
            .index()
            .advance(
                &doc_id,
                self.config.id_policy,
                &*self.clock,
                self.config.max_advance_attempts,
                &deadline,
            )
            .await?;

        let record = RevisionRecord {
            metadata: RevisionMetadata {
                doc_id,
                id: advance.current,
                previous_revision: advance.previous,
                timestamp: advance.timestamp,
            },
            body: buf,
        };

        // From here on the pointer is published: every failure is an inconsistency.
        let inserted = match deadline.check_io("writing the revision log") {
            Ok(()) => self.log().insert(&record).await,
            Err(e) => Err(e),
        };

        let meta = &record.metadata;
        match inserted {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    "published {}@{} previous={:?} size={}",
                    meta.doc_id,
                    meta.id,
                    meta.previous_revision,
                    record.body.len()
                );
                Ok(record.metadata)
            }
            Ok(InsertOutcome::Exists(_)) => {
                error!(
                    "revision id collision after advance: {}@{} already in the log; \
                     the pointer now references the existing entry",
                    meta.doc_id, meta.id
                );
                Err(DocStoreError::RevisionCollision {
                    doc_id: meta.doc_id.to_string(),
                    revision_id: meta.id.clone(),
                    unwritten: Some(Box::new(record)),
                })
            }
            Err(e) => {
                error!(
                    "inconsistent write: {}@{} is published but the log write failed: {}",
                    meta.doc_id, meta.id, e
                );
                Err(DocStoreError::InconsistentWrite {
                    pending: Box::new(record),
                    source: e,
                })
            }
        }
    }

    /// Finish a write that failed with [`DocStoreError::InconsistentWrite`], by inserting the
    /// same revision again under the same id.
    ///
    /// It is idempotent: if the identical revision is already in the log, it succeeds.
    ///
    /// A revision that the document no longer references, because [`repair`](Self::repair)
    /// rolled its pointer back, is refused with [`DocStoreError::RevisionAbandoned`].
    pub async fn complete_pending(
        &self,
        pending: PendingRevision,
    ) -> Result<RevisionMetadata, DocStoreError> {
        let deadline = self.deadline();

        let referenced = match self.is_referenced(&pending.metadata, &deadline).await {
            Ok(x) => x,
            Err(e) => {
                let source = match e {
                    DocStoreError::BackendUnavailable(e) => e,
                    DocStoreError::DeadlineExceeded { stage } => io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("deadline exceeded before {}", stage),
                    ),
                    other => return Err(other),
                };
                return Err(DocStoreError::InconsistentWrite {
                    pending: Box::new(pending),
                    source,
                });
            }
        };

        let meta = &pending.metadata;

        if !referenced {
            warn!(
                "refusing to complete {}@{}: the document no longer references it",
                meta.doc_id, meta.id
            );
            return Err(DocStoreError::RevisionAbandoned {
                doc_id: meta.doc_id.to_string(),
                revision_id: meta.id.clone(),
            });
        }

        // A rollback racing with this insert leaves an unreachable entry; its id is never
        // generated again.
        let inserted = match deadline.check_io("writing the revision log") {
            Ok(()) => self.log().insert(&pending).await,
            Err(e) => Err(e),
        };

        match inserted {
            Ok(InsertOutcome::Inserted) => {
                info!("completed pending revision {}@{}", meta.doc_id, meta.id);
                Ok(pending.metadata)
            }
            Ok(InsertOutcome::Exists(existing)) if *existing == pending => {
                info!("pending revision {}@{} was already written", meta.doc_id, meta.id);
                Ok(pending.metadata)
            }
            Ok(InsertOutcome::Exists(_)) => Err(DocStoreError::RevisionCollision {
                doc_id: meta.doc_id.to_string(),
                revision_id: meta.id.clone(),
                unwritten: None,
            }),
            Err(e) => {
                error!(
                    "pending revision {}@{} still not written: {}",
                    meta.doc_id, meta.id, e
                );
                Err(DocStoreError::InconsistentWrite {
                    pending: Box::new(pending),
                    source: e,
                })
            }
        }
    }

    /// Whether the document still references revision `meta.id`: either the pointer names it,
    /// or the back-links from the latest revision reach it.
    ///
    /// Ids grow along the chain, so the walk stops at the first id not greater than `meta.id`.
    async fn is_referenced(
        &self,
        meta: &RevisionMetadata,
        deadline: &Deadline,
    ) -> Result<bool, DocStoreError> {
        deadline.check("fetching the doc index")?;

        let Some(doc) = self.index().fetch(&meta.doc_id).await? else {
            return Ok(false);
        };

        if doc.data.latest_revision.as_ref() == Some(&meta.id) {
            return Ok(true);
        }

        let mut back = doc.data.previous_revision;
        loop {
            let prev = match back {
                Some(prev) if prev > meta.id => prev,
                Some(prev) => return Ok(prev == meta.id),
                None => return Ok(false),
            };

            deadline.check("walking the revision chain")?;

            // A missing entry on the way is another pending write; the chain can not be
            // followed past it.
            let Some(record) = self.log().get(&meta.doc_id, &prev).await? else {
                debug!(
                    "cannot follow the chain of {} past missing {}",
                    meta.doc_id, prev
                );
                return Ok(false);
            };
            back = record.metadata.previous_revision;
        }
    }
}
