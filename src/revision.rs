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
use std::io::Read;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::doc_id::DocId;
use crate::revision_id::RevisionId;
use crate::util::hex_bytes;

/// Everything about a revision except its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    pub doc_id: DocId,
    pub id: RevisionId,

    /// The revision that was the latest immediately before this one was published;
    /// `None` for the first revision of a document.
    pub previous_revision: Option<RevisionId>,

    /// When the latest-revision pointer was advanced to this revision.
    pub timestamp: DateTime<Utc>,
}

/// A revision log entry as stored in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    #[serde(flatten)]
    pub metadata: RevisionMetadata,

    #[serde(with = "hex_bytes")]
    pub body: Vec<u8>,
}

/// A revision whose pointer has been published but whose log entry is not confirmed written.
///
/// Returned inside [`DocStoreError::InconsistentWrite`](crate::DocStoreError::InconsistentWrite);
/// pass it to [`DocStore::complete_pending`](crate::DocStore::complete_pending) to finish the
/// write with the same id.
pub type PendingRevision = RevisionRecord;

/// A revision read from the store.
///
/// The body is fully buffered. Reading it through [`io::Read`] or
/// [`futures::io::AsyncRead`] advances a forward-only cursor; to read it again, fetch the
/// revision again.
#[derive(Debug)]
pub struct Revision {
    metadata: RevisionMetadata,
    reader: io::Cursor<Vec<u8>>,
}

impl Revision {
    pub fn metadata(&self) -> &RevisionMetadata {
        &self.metadata
    }

    pub fn doc_id(&self) -> &DocId {
        &self.metadata.doc_id
    }

    pub fn id(&self) -> &RevisionId {
        &self.metadata.id
    }

    pub fn previous_revision(&self) -> Option<&RevisionId> {
        self.metadata.previous_revision.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    /// The complete body, regardless of how much has been read.
    pub fn body(&self) -> &[u8] {
        self.reader.get_ref()
    }

    pub fn into_parts(self) -> (RevisionMetadata, Vec<u8>) {
        (self.metadata, self.reader.into_inner())
    }
}

impl From<RevisionRecord> for Revision {
    fn from(record: RevisionRecord) -> Self {
        Revision {
            metadata: record.metadata,
            reader: io::Cursor::new(record.body),
        }
    }
}

impl Read for Revision {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl futures::io::AsyncRead for Revision {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        // The body is in memory, a read never blocks.
        Poll::Ready(self.get_mut().reader.read(buf))
    }
}

/// One page of revision metadata returned by
/// [`DocStore::list_revisions`](crate::DocStore::list_revisions).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionPage {
    pub revisions: Vec<RevisionMetadata>,

    /// Pass it to the next `list_revisions` call to continue after this page.
    pub next_token: String,

    /// True if there are more revisions after this page.
    pub more: bool,
}
