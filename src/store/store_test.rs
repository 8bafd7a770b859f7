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


use std::collections::BTreeSet;
use std::io;
use std::ops::RangeBounds;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::doc_id::DocId;
use crate::impls::mem_kv::MemKv;
use crate::match_seq::MatchSeq;
use crate::revision::RevisionRecord;
use crate::seq_value::Change;
use crate::DocStore;
use crate::DocStoreError;
use crate::KVResultStream;
use crate::KvApi;
use crate::KvApiRO;
use crate::RepairOutcome;
use crate::RevisionId;
use crate::RevisionIdPolicy;
use crate::RevisionMetadata;
use crate::SeqV;
use crate::StoreConfig;
use crate::Verification;

/// A backend that fails or rejects writes on demand.
#[derive(Debug, Default)]
struct FlakyKv {
    inner: MemKv,
    /// Number of upcoming writes to the revision table to fail with an I/O error.
    fail_log_writes: AtomicUsize,
    /// Number of upcoming writes to the doc table to fail with an I/O error.
    fail_index_writes: AtomicUsize,
    /// Number of upcoming writes to the doc table to reject as if another writer won.
    reject_index_writes: AtomicUsize,
    /// Milliseconds every write to the doc table takes before it is applied.
    index_write_delay_ms: AtomicU64,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait::async_trait]
impl KvApiRO for FlakyKv {
    async fn get(&self, table: &str, key: &str) -> Result<Option<SeqV>, io::Error> {
        self.inner.get(table, key).await
    }

    async fn range<R>(&self, table: &str, range: R) -> Result<KVResultStream, io::Error>
    where R: RangeBounds<String> + Send + Sync + Clone + 'static {
        self.inner.range(table, range).await
    }
}

#[async_trait::async_trait]
impl KvApi for FlakyKv {
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        value: Vec<u8>,
        match_seq: MatchSeq,
    ) -> Result<Change, io::Error> {
        if table == "revisions" && take_one(&self.fail_log_writes) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected log failure"));
        }
        let delay = self.index_write_delay_ms.load(Ordering::SeqCst);
        if table == "docs" && delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if table == "docs" && take_one(&self.fail_index_writes) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected index failure"));
        }
        if table == "docs" && take_one(&self.reject_index_writes) {
            let current = self.inner.get(table, key).await?;
            return Ok(Change::unchanged(key, current));
        }
        self.inner.upsert(table, key, value, match_seq).await
    }
}

/// A body that fails after yielding some bytes.
struct BrokenBody {
    sent: bool,
}

impl futures::io::AsyncRead for BrokenBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")));
        }
        self.sent = true;
        buf[0] = b'x';
        Poll::Ready(Ok(1))
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        )))
    }

    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }

    fn advance(&self, d: chrono::Duration) {
        *self.0.lock() += d;
    }
}

fn mem_store() -> DocStore<MemKv> {
    DocStore::new(MemKv::new(), StoreConfig::default())
}

async fn read_body(store: &DocStore<impl KvApi>, doc_id: &str) -> anyhow::Result<Vec<u8>> {
    let mut rev = store.get_doc(doc_id).await?;
    let mut got = vec![];
    futures::AsyncReadExt::read_to_end(&mut rev, &mut got).await?;
    Ok(got)
}

#[tokio::test]
async fn test_readme_scenario() -> anyhow::Result<()> {
    let store = mem_store();

    let r1 = store.put_revision("readme", &b"v1"[..]).await?;
    assert_eq!(r1.previous_revision, None);
    assert_eq!(r1.doc_id.as_str(), "readme");

    let r2 = store.put_revision("readme", &b"v2"[..]).await?;
    assert_ne!(r2.id, r1.id);
    assert_eq!(r2.previous_revision, Some(r1.id.clone()));

    assert_eq!(read_body(&store, "readme").await?, b"v2");

    let old = store.get_revision("readme", &r1.id).await?;
    assert_eq!(old.body(), b"v1");
    assert_eq!(old.metadata(), &r1);

    let latest = store.get_doc("readme").await?;
    assert_eq!(latest.metadata(), &r2);

    Ok(())
}

#[tokio::test]
async fn test_round_trip_binary_body() -> anyhow::Result<()> {
    let store = mem_store();
    let body = (0..=255u8).cycle().take(10_000).collect::<Vec<_>>();

    store.put_revision("blob", &body[..]).await?;
    assert_eq!(read_body(&store, "blob").await?, body);

    store.put_revision("empty", &b""[..]).await?;
    assert_eq!(read_body(&store, "empty").await?, b"");

    Ok(())
}

#[tokio::test]
async fn test_chain_of_sequential_writes() -> anyhow::Result<()> {
    let store = mem_store();
    let n = 10;

    let mut written = vec![];
    for i in 0..n {
        let meta = store
            .put_revision("chain", format!("body-{}", i).as_bytes())
            .await?;
        written.push(meta);
    }

    let ids = written.iter().map(|m| m.id.clone()).collect::<BTreeSet<_>>();
    assert_eq!(ids.len(), n, "ids are pairwise distinct");

    // Following the back-links from revision k visits exactly k revisions.
    for (k, meta) in written.iter().enumerate() {
        let mut visited = vec![meta.id.clone()];
        let mut prev = meta.previous_revision.clone();
        while let Some(p) = prev {
            let rev = store.get_revision("chain", &p).await?;
            visited.push(p);
            prev = rev.previous_revision().cloned();
        }
        assert_eq!(visited.len(), k + 1);
        assert_eq!(visited.last(), Some(&written[0].id));
    }

    // Ids sort in creation order.
    let in_order = written.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
    assert_eq!(in_order, ids.into_iter().collect::<Vec<_>>());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_writers_form_one_chain() -> anyhow::Result<()> {
    let store = Arc::new(mem_store());
    let m = 16;

    let mut handles = vec![];
    for i in 0..m {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .put_revision("hot", format!("writer-{}", i).as_bytes())
                .await
        }));
    }

    let mut written = vec![];
    for h in handles {
        written.push(h.await??);
    }

    let ids = written.iter().map(|m| m.id.clone()).collect::<BTreeSet<_>>();
    assert_eq!(ids.len(), m);

    let previous = written
        .iter()
        .map(|m| m.previous_revision.clone())
        .collect::<Vec<_>>();
    let distinct_previous = previous.iter().cloned().collect::<BTreeSet<_>>();
    assert_eq!(distinct_previous.len(), m, "no two writers saw the same previous");
    assert_eq!(previous.iter().filter(|p| p.is_none()).count(), 1);
    for p in previous.iter().flatten() {
        assert!(ids.contains(p), "previous {} is another writer's id", p);
    }

    // The chain from the latest revision covers every writer.
    let mut count = 0;
    let mut cur = Some(store.get_doc("hot").await?.id().clone());
    while let Some(id) = cur {
        count += 1;
        cur = store.get_revision("hot", &id).await?.previous_revision().cloned();
    }
    assert_eq!(count, m);

    Ok(())
}

#[tokio::test]
async fn test_writers_to_different_docs() -> anyhow::Result<()> {
    let store = Arc::new(mem_store());

    let mut handles = vec![];
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .put_revision(&format!("doc-{}", i), &b"only"[..])
                .await
        }));
    }

    for h in handles {
        let meta = h.await??;
        assert_eq!(meta.previous_revision, None);
        assert_eq!(meta.id, RevisionId::sequence(1));
    }

    Ok(())
}

#[tokio::test]
async fn test_not_found() -> anyhow::Result<()> {
    let store = mem_store();

    let res = store.get_doc("never").await;
    assert!(matches!(res, Err(DocStoreError::DocumentNotFound { doc_id }) if doc_id == "never"));

    store.put_revision("exists", &b"x"[..]).await?;
    let res = store
        .get_revision("exists", &RevisionId::new("nope"))
        .await;
    assert!(matches!(
        res,
        Err(DocStoreError::RevisionNotFound { revision_id, .. }) if revision_id.as_str() == "nope"
    ));

    let res = store
        .get_revision("never", &RevisionId::sequence(1))
        .await;
    assert!(matches!(res, Err(DocStoreError::RevisionNotFound { .. })));

    Ok(())
}

#[tokio::test]
async fn test_invalid_doc_id_never_reaches_backend() -> anyhow::Result<()> {
    let store = mem_store();

    for id in ["Foo", "a doc id", "foo/bar"] {
        let res = store.put_revision(id, &b"x"[..]).await;
        assert!(matches!(res, Err(DocStoreError::Validation(_))), "{}", id);

        assert!(matches!(
            store.get_doc(id).await,
            Err(DocStoreError::Validation(_))
        ));
        assert!(matches!(
            store.list_revisions(id, "").await,
            Err(DocStoreError::Validation(_))
        ));
    }

    assert_eq!(store.kv().last_seq(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unreadable_body_writes_nothing() -> anyhow::Result<()> {
    let store = mem_store();

    let res = store.put_revision("a", BrokenBody { sent: false }).await;
    let err = res.unwrap_err();
    assert!(matches!(err, DocStoreError::ReadBody(_)));
    assert!(!err.partially_applied());

    assert_eq!(store.kv().last_seq(), 0);

    Ok(())
}

#[tokio::test]
async fn test_timestamp_policy() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let c = clock.clone();
    let store = DocStore::new(
        MemKv::new(),
        StoreConfig::default().with_id_policy(RevisionIdPolicy::Timestamp),
    )
    .with_clock(move || c.now());

    let r1 = store.put_revision("a", &b"v1"[..]).await?;
    assert_eq!(r1.id, RevisionId::from_timestamp(clock.now()));
    assert_eq!(r1.timestamp, clock.now());

    // Same clock reading: the id would collide; rejected before the pointer moves.
    let seq = store.kv().last_seq();
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(matches!(err, DocStoreError::RevisionCollision { .. }));
    assert!(!err.partially_applied());
    assert_eq!(store.kv().last_seq(), seq);
    assert_eq!(read_body(&store, "a").await?, b"v1");

    // A clock that went back is rejected the same way.
    clock.advance(chrono::Duration::seconds(-1));
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(matches!(err, DocStoreError::RevisionCollision { .. }));

    clock.advance(chrono::Duration::seconds(2));
    let r2 = store.put_revision("a", &b"v2"[..]).await?;
    assert_eq!(r2.previous_revision, Some(r1.id.clone()));
    assert!(r2.id > r1.id);

    Ok(())
}

#[tokio::test]
async fn test_inconsistent_write_then_complete() -> anyhow::Result<()> {
    let store = DocStore::new(FlakyKv::default(), StoreConfig::default());

    let r1 = store.put_revision("a", &b"v1"[..]).await?;

    store.kv().fail_log_writes.store(1, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(err.partially_applied());

    let pending = match err {
        DocStoreError::InconsistentWrite { pending, .. } => pending,
        other => panic!("expected InconsistentWrite, got {:?}", other),
    };
    assert_eq!(pending.metadata.previous_revision, Some(r1.id.clone()));
    assert_eq!(pending.body, b"v2");

    // The pointer is published, the entry is not.
    assert!(matches!(
        store.get_doc("a").await,
        Err(DocStoreError::RevisionNotFound { .. })
    ));
    assert!(matches!(
        store.verify("a").await?,
        Verification::Pending { .. }
    ));

    let meta = store.complete_pending((*pending).clone()).await?;
    assert_eq!(meta, pending.metadata);
    assert_eq!(read_body(&store, "a").await?, b"v2");
    assert_eq!(store.verify("a").await?, Verification::Consistent {
        latest: Some(meta.id.clone())
    });

    // Completing again is a no-op.
    assert_eq!(store.complete_pending(*pending).await?, meta);

    // The next write chains onto the completed revision.
    let r3 = store.put_revision("a", &b"v3"[..]).await?;
    assert_eq!(r3.previous_revision, Some(meta.id));

    Ok(())
}

#[tokio::test]
async fn test_complete_pending_refuses_different_content() -> anyhow::Result<()> {
    let store = DocStore::new(FlakyKv::default(), StoreConfig::default());

    store.kv().fail_log_writes.store(1, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v1"[..]).await.unwrap_err();
    let pending = match err {
        DocStoreError::InconsistentWrite { pending, .. } => pending,
        other => panic!("expected InconsistentWrite, got {:?}", other),
    };

    let mut forged = (*pending).clone();
    forged.body = b"forged".to_vec();
    store.complete_pending(forged).await?;

    let err = store.complete_pending(*pending).await.unwrap_err();
    assert!(matches!(err, DocStoreError::RevisionCollision { .. }));
    assert_eq!(read_body(&store, "a").await?, b"forged");

    Ok(())
}

#[tokio::test]
async fn test_repair_rolls_back_dangling_pointer() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let c = clock.clone();
    let store = DocStore::new(
        FlakyKv::default(),
        StoreConfig::default().with_repair_grace(Duration::from_secs(30)),
    )
    .with_clock(move || c.now());

    let r1 = store.put_revision("a", &b"v1"[..]).await?;
    let r2 = store.put_revision("a", &b"v2"[..]).await?;

    store.kv().fail_log_writes.store(1, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v3"[..]).await.unwrap_err();
    assert!(err.partially_applied());

    // Within the grace period the writer may still complete.
    assert_eq!(store.repair("a").await?, RepairOutcome::StillPending);

    clock.advance(chrono::Duration::seconds(31));
    let Verification::Dangling { doc } = store.verify("a").await? else {
        panic!("expected Dangling");
    };
    assert_eq!(doc.data.latest_revision, Some(RevisionId::sequence(3)));

    assert_eq!(store.repair("a").await?, RepairOutcome::RolledBack {
        from: RevisionId::sequence(3),
        to: Some(r2.id.clone()),
    });

    assert_eq!(read_body(&store, "a").await?, b"v2");
    assert_eq!(store.repair("a").await?, RepairOutcome::AlreadyConsistent);

    let doc = store.index().fetch(&DocId::new("a")?).await?.unwrap().data;
    assert_eq!(doc.previous_revision, Some(r1.id.clone()));
    assert_eq!(doc.revision_count, 3, "a rollback does not give the id back");

    // The chain continues from the restored pointer, with a fresh id.
    let r3 = store.put_revision("a", &b"v3 again"[..]).await?;
    assert_eq!(r3.previous_revision, Some(r2.id));
    assert_eq!(r3.id, RevisionId::sequence(4));

    Ok(())
}

#[tokio::test]
async fn test_repair_first_revision() -> anyhow::Result<()> {
    let store = DocStore::new(
        FlakyKv::default(),
        StoreConfig::default().with_repair_grace(Duration::ZERO),
    );

    store.kv().fail_log_writes.store(1, Ordering::SeqCst);
    store.put_revision("a", &b"v1"[..]).await.unwrap_err();

    assert_eq!(store.repair("a").await?, RepairOutcome::RolledBack {
        from: RevisionId::sequence(1),
        to: None,
    });

    // No latest revision: reads as a missing document.
    assert!(matches!(
        store.get_doc("a").await,
        Err(DocStoreError::DocumentNotFound { .. })
    ));
    assert_eq!(store.verify("a").await?, Verification::Consistent {
        latest: None
    });

    let r1 = store.put_revision("a", &b"v1"[..]).await?;
    assert_eq!(r1.previous_revision, None);
    assert_eq!(r1.id, RevisionId::sequence(2));

    Ok(())
}

#[tokio::test]
async fn test_complete_after_rollback_is_refused() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let c = clock.clone();
    let store = DocStore::new(
        FlakyKv::default(),
        StoreConfig::default().with_repair_grace(Duration::from_secs(30)),
    )
    .with_clock(move || c.now());

    store.put_revision("a", &b"v1"[..]).await?;
    let r2 = store.put_revision("a", &b"v2"[..]).await?;

    store.kv().fail_log_writes.store(1, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v3"[..]).await.unwrap_err();
    let pending = match err {
        DocStoreError::InconsistentWrite { pending, .. } => pending,
        other => panic!("expected InconsistentWrite, got {:?}", other),
    };

    clock.advance(chrono::Duration::seconds(31));
    assert_eq!(store.repair("a").await?, RepairOutcome::RolledBack {
        from: RevisionId::sequence(3),
        to: Some(r2.id.clone()),
    });

    let err = store.complete_pending((*pending).clone()).await.unwrap_err();
    assert!(matches!(
        &err,
        DocStoreError::RevisionAbandoned { revision_id, .. } if *revision_id == RevisionId::sequence(3)
    ));
    assert!(!err.partially_applied());
    assert!(!err.is_retryable());

    let r4 = store.put_revision("a", &b"v4"[..]).await?;
    assert_eq!(r4.id, RevisionId::sequence(4));
    assert_eq!(r4.previous_revision, Some(r2.id.clone()));
    assert_eq!(read_body(&store, "a").await?, b"v4");

    // The original writer's insert lands late: the entry is unreachable and harmless.
    store.log().insert(&pending).await?;

    let r5 = store.put_revision("a", &b"v5"[..]).await?;
    assert_eq!(r5.id, RevisionId::sequence(5));
    assert_eq!(r5.previous_revision, Some(r4.id));
    assert_eq!(read_body(&store, "a").await?, b"v5");
    assert_eq!(store.verify("a").await?, Verification::Consistent {
        latest: Some(r5.id)
    });

    Ok(())
}

#[tokio::test]
async fn test_complete_pending_after_later_writes() -> anyhow::Result<()> {
    let store = DocStore::new(FlakyKv::default(), StoreConfig::default());

    let r1 = store.put_revision("a", &b"v1"[..]).await?;

    store.kv().fail_log_writes.store(1, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    let pending = match err {
        DocStoreError::InconsistentWrite { pending, .. } => pending,
        other => panic!("expected InconsistentWrite, got {:?}", other),
    };

    // Other writers moved on; their chain goes through the missing revision.
    let r3 = store.put_revision("a", &b"v3"[..]).await?;
    let r4 = store.put_revision("a", &b"v4"[..]).await?;
    assert_eq!(r3.previous_revision, Some(pending.metadata.id.clone()));
    assert!(matches!(
        store.get_revision("a", &pending.metadata.id).await,
        Err(DocStoreError::RevisionNotFound { .. })
    ));

    let meta = store.complete_pending(*pending).await?;
    assert_eq!(meta.previous_revision, Some(r1.id));

    let rev = store.get_revision("a", &meta.id).await?;
    assert_eq!(rev.body(), b"v2");
    assert_eq!(read_body(&store, "a").await?, b"v4");
    assert_eq!(r4.previous_revision, Some(r3.id));

    Ok(())
}

#[tokio::test]
async fn test_collision_after_advance_is_partial() -> anyhow::Result<()> {
    let store = mem_store();

    store.put_revision("a", &b"v1"[..]).await?;

    // An entry occupies the key the next advance generates.
    let squatter = RevisionRecord {
        metadata: RevisionMetadata {
            doc_id: DocId::new("a")?,
            id: RevisionId::sequence(2),
            previous_revision: None,
            timestamp: Utc::now(),
        },
        body: b"squatter".to_vec(),
    };
    store.log().insert(&squatter).await?;

    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(err.partially_applied());
    assert!(!err.is_retryable());

    let pending = match err {
        DocStoreError::RevisionCollision {
            unwritten: Some(pending),
            ..
        } => pending,
        other => panic!("expected a collision after the advance, got {:?}", other),
    };
    assert_eq!(pending.metadata.id, RevisionId::sequence(2));
    assert_eq!(pending.body, b"v2");

    // The pointer moved onto the existing entry, which was not overwritten.
    assert_eq!(read_body(&store, "a").await?, b"squatter");

    Ok(())
}

#[tokio::test]
async fn test_deadline_after_advance_is_inconsistent() -> anyhow::Result<()> {
    let store = DocStore::new(
        FlakyKv::default(),
        StoreConfig::default().with_op_timeout(Duration::from_millis(50)),
    );

    let r1 = store.put_revision("a", &b"v1"[..]).await?;

    // The pointer write outlives the operation's deadline.
    store.kv().index_write_delay_ms.store(200, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(err.partially_applied());

    let (pending, source) = match err {
        DocStoreError::InconsistentWrite { pending, source } => (pending, source),
        other => panic!("expected InconsistentWrite, got {:?}", other),
    };
    assert_eq!(source.kind(), io::ErrorKind::TimedOut);
    assert_eq!(pending.metadata.previous_revision, Some(r1.id));
    assert_eq!(store.kv().inner.table_len("revisions"), 1);

    store.kv().index_write_delay_ms.store(0, Ordering::SeqCst);
    let meta = store.complete_pending(*pending).await?;
    assert_eq!(meta.id, RevisionId::sequence(2));
    assert_eq!(read_body(&store, "a").await?, b"v2");

    Ok(())
}

#[tokio::test]
async fn test_verify_and_repair_missing_doc() -> anyhow::Result<()> {
    let store = mem_store();

    assert!(matches!(
        store.verify("none").await,
        Err(DocStoreError::DocumentNotFound { .. })
    ));
    assert!(matches!(
        store.repair("none").await,
        Err(DocStoreError::DocumentNotFound { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_unconfirmed_advance() -> anyhow::Result<()> {
    let store = DocStore::new(FlakyKv::default(), StoreConfig::default());
    let r1 = store.put_revision("a", &b"v1"[..]).await?;

    store.kv().fail_index_writes.store(1, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(matches!(
        &err,
        DocStoreError::AdvanceUnconfirmed { revision_id, .. } if *revision_id == RevisionId::sequence(2)
    ));
    assert!(err.partially_applied());
    assert!(!err.is_retryable());

    // The injected failure happened before the write applied.
    assert_eq!(store.verify("a").await?, Verification::Consistent {
        latest: Some(r1.id)
    });

    Ok(())
}

#[tokio::test]
async fn test_advance_gives_up_under_contention() -> anyhow::Result<()> {
    let store = DocStore::new(
        FlakyKv::default(),
        StoreConfig::default().with_max_advance_attempts(3),
    );
    store.put_revision("a", &b"v1"[..]).await?;

    store.kv().reject_index_writes.store(3, Ordering::SeqCst);
    let err = store.put_revision("a", &b"v2"[..]).await.unwrap_err();
    assert!(matches!(
        err,
        DocStoreError::AdvanceConflict { attempts: 3, .. }
    ));
    assert!(err.is_retryable());

    // Lost twice, won on the third attempt.
    store.kv().reject_index_writes.store(2, Ordering::SeqCst);
    let r2 = store.put_revision("a", &b"v2"[..]).await?;
    assert_eq!(r2.id, RevisionId::sequence(2));

    Ok(())
}

#[tokio::test]
async fn test_deadline_before_advance_changes_nothing() -> anyhow::Result<()> {
    let store = DocStore::new(
        MemKv::new(),
        StoreConfig::default().with_op_timeout(Duration::ZERO),
    );

    let err = store.put_revision("a", &b"v1"[..]).await.unwrap_err();
    assert!(matches!(err, DocStoreError::DeadlineExceeded { .. }));
    assert!(!err.partially_applied());
    assert_eq!(store.kv().last_seq(), 0);

    assert!(matches!(
        store.get_doc("a").await,
        Err(DocStoreError::DeadlineExceeded { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_list_docs_pages() -> anyhow::Result<()> {
    let store = DocStore::new(MemKv::new(), StoreConfig::default().with_page_size(2));

    for id in ["c", "a", "", "b", "d"] {
        store.put_revision(id, &b"x"[..]).await?;
    }

    let mut seen = vec![];
    let mut token = String::new();
    let mut pages = 0;
    loop {
        let page = store.list_docs(&token).await?;
        pages += 1;
        assert!(page.docs.len() <= 2);
        seen.extend(page.docs.iter().map(|d| d.id.to_string()));
        token = page.next_token;
        if !page.more {
            break;
        }
    }

    assert_eq!(seen, vec!["", "a", "b", "c", "d"]);
    assert_eq!(pages, 3);

    let first = store.list_docs("").await?;
    assert_eq!(first.docs[1].latest_revision, Some(RevisionId::sequence(1)));

    assert!(matches!(
        store.list_docs("garbage").await,
        Err(DocStoreError::InvalidPageToken { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_list_docs_empty() -> anyhow::Result<()> {
    let store = mem_store();

    let page = store.list_docs("").await?;
    assert!(page.docs.is_empty());
    assert!(!page.more);
    assert_eq!(page.next_token, "");

    Ok(())
}

#[tokio::test]
async fn test_list_revisions_pages() -> anyhow::Result<()> {
    let store = DocStore::new(MemKv::new(), StoreConfig::default().with_page_size(3));

    let mut written: Vec<RevisionMetadata> = vec![];
    for i in 0..7 {
        written.push(
            store
                .put_revision("a", format!("v{}", i).as_bytes())
                .await?,
        );
    }
    // Neighbours sharing the prefix must not leak in.
    store.put_revision("a.b", &b"x"[..]).await?;
    store.put_revision("ab", &b"x"[..]).await?;

    let mut seen = vec![];
    let mut token = String::new();
    loop {
        let page = store.list_revisions("a", &token).await?;
        seen.extend(page.revisions);
        token = page.next_token;
        if !page.more {
            break;
        }
    }

    assert_eq!(seen, written);

    let page = store.list_revisions("none", "").await?;
    assert!(page.revisions.is_empty());
    assert!(!page.more);

    Ok(())
}

#[tokio::test]
async fn test_custom_tables() -> anyhow::Result<()> {
    let store = DocStore::new(
        MemKv::new(),
        StoreConfig::default()
            .with_doc_table("d")
            .with_revision_table("r"),
    );

    store.put_revision("a", &b"x"[..]).await?;

    assert_eq!(store.kv().table_len("d"), 1);
    assert_eq!(store.kv().table_len("r"), 1);
    assert_eq!(store.kv().table_len("docs"), 0);

    Ok(())
}
