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


use log::debug;
use log::warn;

use crate::deadline::Deadline;
use crate::doc_id::DocId;
use crate::error::DocStoreError;
use crate::revision::Revision;
use crate::revision_id::RevisionId;
use crate::DocStore;
use crate::KvApi;

impl<KV> DocStore<KV>
where KV: KvApi
{
    /// Get the latest revision of a document.
    ///
    /// Returns [`DocStoreError::DocumentNotFound`] if the document was never written.
    /// If the latest pointer references a revision missing from the log, an inconsistent
    /// write is pending and [`DocStoreError::RevisionNotFound`] is returned.
    pub async fn get_doc(&self, doc_id: &str) -> Result<Revision, DocStoreError> {
        let doc_id = DocId::new(doc_id)?;
        let deadline = self.deadline();

        deadline.check("fetching the doc index")?;
        let doc = self.index().fetch(&doc_id).await?;

        let latest = doc.and_then(|sv| sv.data.latest_revision);
        let Some(latest) = latest else {
            return Err(DocStoreError::DocumentNotFound {
                doc_id: doc_id.to_string(),
            });
        };

        let res = self.read_revision(&doc_id, &latest, &deadline).await;

        if let Err(DocStoreError::RevisionNotFound { .. }) = &res {
            warn!(
                "latest revision of {} is {} but it is not in the log; verify/repair the document",
                doc_id, latest
            );
        }
        res
    }

    /// Get a specific revision of a document.
    pub async fn get_revision(
        &self,
        doc_id: &str,
        revision_id: &RevisionId,
    ) -> Result<Revision, DocStoreError> {
        let doc_id = DocId::new(doc_id)?;
        let deadline = self.deadline();

        self.read_revision(&doc_id, revision_id, &deadline).await
    }

    async fn read_revision(
        &self,
        doc_id: &DocId,
        revision_id: &RevisionId,
        deadline: &Deadline,
    ) -> Result<Revision, DocStoreError> {
        deadline.check("fetching the revision")?;

        let record = self.log().get(doc_id, revision_id).await?;

        let Some(record) = record else {
            debug!("revision not found: {}@{}", doc_id, revision_id);
            return Err(DocStoreError::RevisionNotFound {
                doc_id: doc_id.to_string(),
                revision_id: revision_id.clone(),
            });
        };

        Ok(Revision::from(record))
    }
}
