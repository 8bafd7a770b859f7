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


//! Defines the read-only backend interface.
//!
//! The [`KvApiRO`] trait provides the read operations the document store needs from its
//! key-value backend: a point lookup of a single item and an ordered scan over a key range.
//! Items live in named tables; keys are strings ordered lexicographically within a table.

use std::io;
use std::ops::RangeBounds;
use std::sync::Arc;

use crate::seq_value::SeqV;
use crate::KVResultStream;

/// Provides read-only access to a key-value backend.
///
/// The trait is `Send + Sync` so that one backend handle can serve any number of concurrent
/// document store operations.
///
/// # Examples
///
/// ```rust,no_run
/// use std::io;
///
/// use docstore::impls::mem_kv::MemKv;
/// use docstore::KvApiRO;
///
/// #[tokio::main]
/// async fn main() -> io::Result<()> {
///     let kv = MemKv::default();
///
///     // Get an item by key
///     let item = kv.get("docs", "readme").await?;
///
///     // Iterate over a range of keys
///     let items = kv.range("revisions", "readme/".to_string().."readme0".to_string()).await?;
///
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait KvApiRO: Send + Sync {
    /// Get an item by key.
    ///
    /// Returns `Ok(None)` if the key does not exist in `table`.
    async fn get(&self, table: &str, key: &str) -> Result<Option<SeqV>, io::Error>;

    /// Iterate over the items of `table` whose keys are in `range`, in key order.
    ///
    /// The returned stream is `'static`: it does not borrow the backend and may be consumed
    /// partially.
    async fn range<R>(&self, table: &str, range: R) -> Result<KVResultStream, io::Error>
    where R: RangeBounds<String> + Send + Sync + Clone + 'static;
}

#[async_trait::async_trait]
impl<T> KvApiRO for &T
where T: KvApiRO
{
    async fn get(&self, table: &str, key: &str) -> Result<Option<SeqV>, io::Error> {
        (**self).get(table, key).await
    }

    async fn range<R>(&self, table: &str, range: R) -> Result<KVResultStream, io::Error>
    where R: RangeBounds<String> + Send + Sync + Clone + 'static {
        (**self).range(table, range).await
    }
}

#[async_trait::async_trait]
impl<T> KvApiRO for Arc<T>
where T: KvApiRO
{
    async fn get(&self, table: &str, key: &str) -> Result<Option<SeqV>, io::Error> {
        (**self).get(table, key).await
    }

    async fn range<R>(&self, table: &str, range: R) -> Result<KVResultStream, io::Error>
    where R: RangeBounds<String> + Send + Sync + Clone + 'static {
        (**self).range(table, range).await
    }
}
