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


//! # docstore
//!
//! A versioned document store: callers write immutable revisions of named documents and read
//! back either the latest revision or any historical one.
//!
//! The store turns an unordered key-value backend into an append-only, linearizable history
//! per document. Two tables are kept in the backend:
//!
//! - the document index, one record per document holding its latest-revision pointer;
//! - the revision log, one immutable record per revision, linked to its predecessor.
//!
//! A write first advances the pointer with an atomic compare-and-swap, learning the previous
//! pointer in the same step, then inserts the log entry carrying that previous pointer as its
//! back-link. The compare-and-swap is the only coordination point: concurrent writers to one
//! document are serialized by the backend and each receives a distinct predecessor.
//!
//! ## Core Components
//!
//! - [`KvApiRO`] / [`KvApi`]: the capabilities required from a backend
//! - [`MatchSeq`]: the condition of a backend write
//! - [`DocStore`]: the write, read, list and repair operations
//! - [`MemKv`](impls::mem_kv::MemKv): an in-process backend
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use docstore::impls::mem_kv::MemKv;
//! use docstore::DocStore;
//! use docstore::StoreConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = DocStore::new(MemKv::default(), StoreConfig::default());
//!
//!     let r1 = store.put_revision("readme", &b"v1"[..]).await?;
//!     let r2 = store.put_revision("readme", &b"v2"[..]).await?;
//!     assert_eq!(r2.previous_revision, Some(r1.id.clone()));
//!
//!     let latest = store.get_doc("readme").await?;
//!     assert_eq!(latest.body(), b"v2");
//!
//!     Ok(())
//! }
//! ```

use std::io;

use futures_util::stream::BoxStream;

pub mod config;
pub mod deadline;
pub mod doc;
pub mod doc_id;
pub mod error;
pub mod impls;
pub mod index;
pub mod kv_api;
pub mod kv_api_ro;
pub mod match_seq;
pub mod revision;
pub mod revision_id;
pub mod revision_log;
pub mod seq_value;
pub mod store;

mod util;

pub use crate::config::StoreConfig;
pub use crate::doc::Doc;
pub use crate::doc::DocPage;
pub use crate::doc_id::validate_doc_id;
pub use crate::doc_id::DocId;
pub use crate::doc_id::InvalidDocId;
pub use crate::error::DocStoreError;
pub use crate::kv_api::KvApi;
pub use crate::kv_api_ro::KvApiRO;
pub use crate::match_seq::MatchSeq;
pub use crate::revision::PendingRevision;
pub use crate::revision::Revision;
pub use crate::revision::RevisionMetadata;
pub use crate::revision::RevisionPage;
pub use crate::revision_id::RevisionId;
pub use crate::revision_id::RevisionIdPolicy;
pub use crate::seq_value::SeqV;
pub use crate::store::DocStore;
pub use crate::store::RepairOutcome;
pub use crate::store::Verification;

/// A boxed stream that yields `Result` of items or an `io::Error`.
/// The stream is 'static so that it does not borrow the backend it was read from.
pub type IOResultStream<T> = BoxStream<'static, Result<T, io::Error>>;

/// A key and the item stored under it.
pub type KvPair = (String, SeqV);

/// A stream of result of key-value returned by `range()`.
pub type KVResultStream = IOResultStream<KvPair>;
