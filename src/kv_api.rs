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


//! Defines the read-write backend interface.
//!
//! The [`KvApi`] trait extends [`KvApiRO`] with the single write primitive the document store
//! is built on: an atomic, conditional upsert of one item.

use std::io;
use std::sync::Arc;

use crate::kv_api_ro::KvApiRO;
use crate::match_seq::MatchSeq;
use crate::seq_value::Change;

/// Provides a read-write key-value backend API.
///
/// # Atomicity
///
/// `upsert` must be a single atomic operation on the backend side: the condition is evaluated
/// against the current item and the new value is installed in the same step. This is the only
/// coordination point of the document store; no lock is taken in process.
///
/// # Examples
///
/// ```rust,no_run
/// use std::io;
///
/// use docstore::impls::mem_kv::MemKv;
/// use docstore::KvApi;
/// use docstore::MatchSeq;
///
/// #[tokio::main]
/// async fn main() -> io::Result<()> {
///     let kv = MemKv::default();
///
///     // Insert only if absent
///     let change = kv
///         .upsert("docs", "readme", b"v1".to_vec(), MatchSeq::absent())
///         .await?;
///     assert!(change.is_changed());
///
///     // Compare-and-swap on the seq just written
///     let seq = change.after.map(|sv| sv.seq).unwrap_or_default();
///     kv.upsert("docs", "readme", b"v2".to_vec(), MatchSeq::Exact(seq))
///         .await?;
///
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait KvApi: KvApiRO {
    /// Write `value` to `key` if the current item satisfies `match_seq`.
    ///
    /// Returns a [`Change`] with the item before and after the operation.
    /// An unmet condition is not an error: nothing is written and `before == after`,
    /// so callers check [`Change::is_changed`].
    ///
    /// An applied write assigns the item a new seq, greater than any seq assigned before.
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Vec<u8>,
        match_seq: MatchSeq,
    ) -> Result<Change, io::Error>;
}

#[async_trait::async_trait]
impl<T> KvApi for &T
where T: KvApi
{
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Vec<u8>,
        match_seq: MatchSeq,
    ) -> Result<Change, io::Error> {
        (**self).upsert(table, key, value, match_seq).await
    }
}

#[async_trait::async_trait]
impl<T> KvApi for Arc<T>
where T: KvApi
{
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Vec<u8>,
        match_seq: MatchSeq,
    ) -> Result<Change, io::Error> {
        (**self).upsert(table, key, value, match_seq).await
    }
}
