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


//! Provides an in-process implementation of the backend API.
//!
//! [`MemKv`] stores items in memory, one [`BTreeMap`] per table, and stamps every applied
//! write with a store-wide sequence number. It gives the same guarantees a hosted table
//! store gives the document store: atomic conditional single-item writes and ordered scans.

use std::collections::BTreeMap;
use std::io;
use std::ops::RangeBounds;

use futures_util::StreamExt;
use log::debug;
use log::warn;
use parking_lot::Mutex;

use crate::match_seq::MatchSeq;
use crate::match_seq::MatchSeqExt;
use crate::seq_value::Change;
use crate::seq_value::SeqV;
use crate::KVResultStream;
use crate::KvApi;
use crate::KvApiRO;

#[derive(Debug, Default)]
struct MemState {
    /// The seq assigned to the last applied write.
    last_seq: u64,
    tables: BTreeMap<String, BTreeMap<String, SeqV>>,
}

/// An in-memory key-value backend.
///
/// The lock is held only for the duration of one item operation and never across an
/// `.await`, so any number of tasks may share one instance through an `Arc`.
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use docstore::impls::mem_kv::MemKv;
/// use docstore::KvApi;
/// use docstore::KvApiRO;
/// use docstore::MatchSeq;
///
/// #[tokio::main]
/// async fn main() -> io::Result<()> {
///     let kv = MemKv::default();
///
///     kv.upsert("docs", "key1", b"value1".to_vec(), MatchSeq::Any)
///         .await?;
///
///     let item = kv.get("docs", "key1").await?;
///     assert_eq!(item.map(|sv| sv.seq), Some(1));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemKv {
    state: Mutex<MemState>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seq of the last applied write, `0` if nothing was written.
    pub fn last_seq(&self) -> u64 {
        self.state.lock().last_seq
    }

    /// Number of items in `table`.
    pub fn table_len(&self, table: &str) -> usize {
        self.state.lock().tables.get(table).map_or(0, |t| t.len())
    }
}

#[async_trait::async_trait]
impl KvApiRO for MemKv {
    async fn get(&self, table: &str, key: &str) -> Result<Option<SeqV>, io::Error> {
        let state = self.state.lock();
        let got = state.tables.get(table).and_then(|t| t.get(key)).cloned();
        Ok(got)
    }

    async fn range<R>(&self, table: &str, range: R) -> Result<KVResultStream, io::Error>
    where R: RangeBounds<String> + Clone + Send + Sync + 'static {
        // The returned stream must not borrow the state. Copy the result out.
        let vec = {
            let state = self.state.lock();
            match state.tables.get(table) {
                Some(t) => t
                    .range(range)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>(),
                None => vec![],
            }
        };

        if vec.len() > 1000 {
            warn!(
                "MemKv::range() returns big range of len={} in table {}",
                vec.len(),
                table
            );
        }

        let strm = futures::stream::iter(vec).map(Ok).boxed();
        Ok(strm)
    }
}

#[async_trait::async_trait]
impl KvApi for MemKv {
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Vec<u8>,
        match_seq: MatchSeq,
    ) -> Result<Change, io::Error> {
        let mut state = self.state.lock();
        let MemState { last_seq, tables } = &mut *state;

        let t = tables.entry(table.to_string()).or_default();
        let before = t.get(key).cloned();

        if let Err(conflict) = match_seq.match_seq(&before) {
            debug!("MemKv::upsert {}/{}: {}", table, key, conflict);
            return Ok(Change::unchanged(key, before));
        }

        *last_seq += 1;
        let after = SeqV::new(*last_seq, value);
        t.insert(key.to_string(), after.clone());

        Ok(Change::new(key, before, Some(after)))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_mem_kv_get_absent() -> anyhow::Result<()> {
        let kv = MemKv::new();

        assert_eq!(kv.get("docs", "a").await?, None);
        assert_eq!(kv.last_seq(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_mem_kv_upsert_assigns_increasing_seq() -> anyhow::Result<()> {
        let kv = MemKv::new();

        let c1 = kv.upsert("docs", "a", b"1".to_vec(), MatchSeq::Any).await?;
        let c2 = kv.upsert("revisions", "b", b"2".to_vec(), MatchSeq::Any).await?;
        let c3 = kv.upsert("docs", "a", b"3".to_vec(), MatchSeq::Any).await?;

        assert_eq!(c1, Change::new("a", None, Some(SeqV::new(1, b"1".to_vec()))));
        assert_eq!(c2.after, Some(SeqV::new(2, b"2".to_vec())));
        assert_eq!(
            c3,
            Change::new(
                "a",
                Some(SeqV::new(1, b"1".to_vec())),
                Some(SeqV::new(3, b"3".to_vec()))
            )
        );
        assert_eq!(kv.last_seq(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_mem_kv_upsert_absent_condition() -> anyhow::Result<()> {
        let kv = MemKv::new();

        let c = kv.upsert("t", "k", b"x".to_vec(), MatchSeq::absent()).await?;
        assert!(c.is_changed());

        let c = kv.upsert("t", "k", b"y".to_vec(), MatchSeq::absent()).await?;
        assert!(!c.is_changed());
        assert_eq!(c.after, Some(SeqV::new(1, b"x".to_vec())));

        // The rejected write does not consume a seq.
        assert_eq!(kv.last_seq(), 1);
        assert_eq!(kv.get("t", "k").await?, Some(SeqV::new(1, b"x".to_vec())));

        Ok(())
    }

    #[tokio::test]
    async fn test_mem_kv_upsert_cas() -> anyhow::Result<()> {
        let kv = MemKv::new();

        kv.upsert("t", "k", b"x".to_vec(), MatchSeq::Any).await?;
        kv.upsert("t", "other", b"o".to_vec(), MatchSeq::Any).await?;

        // Stale seq
        let c = kv.upsert("t", "k", b"y".to_vec(), MatchSeq::Exact(2)).await?;
        assert!(!c.is_changed());

        let c = kv.upsert("t", "k", b"y".to_vec(), MatchSeq::Exact(1)).await?;
        assert!(c.is_changed());
        assert_eq!(c.after, Some(SeqV::new(3, b"y".to_vec())));

        let c = kv.upsert("t", "k", b"z".to_vec(), MatchSeq::GE(1)).await?;
        assert!(c.is_changed());

        Ok(())
    }

    #[tokio::test]
    async fn test_mem_kv_range() -> anyhow::Result<()> {
        let kv = MemKv::new();

        for k in ["a/1", "a/2", "ab", "b/1"] {
            kv.upsert("t", k, k.as_bytes().to_vec(), MatchSeq::Any)
                .await?;
        }
        kv.upsert("other", "a/3", b"x".to_vec(), MatchSeq::Any)
            .await?;

        let strm = kv.range("t", "a/".to_string().."a0".to_string()).await?;
        let got = strm.try_collect::<Vec<_>>().await?;
        let keys = got.into_iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a/1".to_string(), "a/2".to_string()]);

        let strm = kv.range("t", ..).await?;
        assert_eq!(strm.try_collect::<Vec<_>>().await?.len(), 4);

        let strm = kv.range("no-such-table", ..).await?;
        assert!(strm.try_collect::<Vec<_>>().await?.is_empty());

        assert_eq!(kv.table_len("t"), 4);

        Ok(())
    }
}
