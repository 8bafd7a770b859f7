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


use std::ops::Bound;

use futures_util::StreamExt;
use futures_util::TryStreamExt;
use log::debug;

use crate::deadline::Deadline;
use crate::doc::Doc;
use crate::doc::DocPage;
use crate::doc_id::DocId;
use crate::error::DocStoreError;
use crate::revision::RevisionPage;
use crate::revision::RevisionRecord;
use crate::util::page_token;
use crate::util::revision_id_of_key;
use crate::util::revision_range;
use crate::DocStore;
use crate::KvApi;
use crate::KvPair;

impl<KV> DocStore<KV>
where KV: KvApi
{
    /// List documents in id order, at most `page_size` of them per call.
    ///
    /// Pass an empty `token` for the first page and the returned `next_token` for the
    /// following ones, until `more` is false.
    pub async fn list_docs(&self, token: &str) -> Result<DocPage, DocStoreError> {
        let after = self.decode_token(token)?;
        let deadline = self.deadline();

        let start = match after {
            Some(doc_id) => Bound::Excluded(doc_id),
            None => Bound::Unbounded,
        };

        let table = &self.config.doc_table;
        let (items, more) = self
            .scan_page(table, (start, Bound::Unbounded), &deadline)
            .await?;

        let next_token = match items.last() {
            Some((key, _)) => page_token::encode(key),
            None => token.to_string(),
        };

        let docs = items
            .into_iter()
            .map(|(key, sv)| {
                serde_json::from_slice::<Doc>(&sv.data).map_err(|e| DocStoreError::Corrupt {
                    table: table.clone(),
                    key,
                    source: e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocPage {
            docs,
            next_token,
            more,
        })
    }

    /// List the metadata of the revisions of one document in id order, which is creation
    /// order, at most `page_size` of them per call.
    ///
    /// Paginated like [`list_docs`](Self::list_docs).
    pub async fn list_revisions(
        &self,
        doc_id: &str,
        token: &str,
    ) -> Result<RevisionPage, DocStoreError> {
        let doc_id = DocId::new(doc_id)?;
        let after = self.decode_token(token)?;
        let deadline = self.deadline();

        let table = &self.config.revision_table;
        let range = revision_range(&doc_id, after.as_deref());
        let (items, more) = self.scan_page(table, range, &deadline).await?;

        let next_token = match items.last() {
            Some((key, _)) => page_token::encode(revision_id_of_key(&doc_id, key).unwrap_or(key)),
            None => token.to_string(),
        };

        let revisions = items
            .into_iter()
            .map(|(key, sv)| {
                serde_json::from_slice::<RevisionRecord>(&sv.data)
                    .map(|r| r.metadata)
                    .map_err(|e| DocStoreError::Corrupt {
                        table: table.clone(),
                        key,
                        source: e,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RevisionPage {
            revisions,
            next_token,
            more,
        })
    }

    fn decode_token(&self, token: &str) -> Result<Option<String>, DocStoreError> {
        page_token::decode(token).map_err(|reason| DocStoreError::InvalidPageToken {
            token: token.to_string(),
            reason,
        })
    }

    /// Read at most `page_size` items of `range`, and tell whether more items follow.
    async fn scan_page(
        &self,
        table: &str,
        range: (Bound<String>, Bound<String>),
        deadline: &Deadline,
    ) -> Result<(Vec<KvPair>, bool), DocStoreError> {
        let page_size = self.config.page_size.max(1);

        deadline.check("scanning")?;

        let strm = self
            .kv
            .range(table, range)
            .await
            .map_err(DocStoreError::BackendUnavailable)?;

        // One extra item tells whether there is a next page.
        let mut items = strm
            .take(page_size + 1)
            .try_collect::<Vec<_>>()
            .await
            .map_err(DocStoreError::BackendUnavailable)?;

        let more = items.len() > page_size;
        items.truncate(page_size);

        debug!(
            "scanned {} items from {}, more: {}",
            items.len(),
            table,
            more
        );

        Ok((items, more))
    }
}
