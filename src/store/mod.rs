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


//! The document store: revision writer, revision reader, enumerators and repair, on top of the
//! document index and the revision log.

mod impl_list;
mod impl_read;
mod impl_repair;
mod impl_write;

#[cfg(test)]
mod store_test;

use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

pub use self::impl_repair::RepairOutcome;
pub use self::impl_repair::Verification;
use crate::config::StoreConfig;
use crate::deadline::Deadline;
use crate::index::DocIndex;
use crate::revision_log::RevisionLog;
use crate::KvApi;

/// Source of the current time, used for revision timestamps and timestamp ids.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A versioned document store over a key-value backend.
///
/// All operations take `&self` and keep no state between calls; share one store between tasks
/// with an `Arc`. Writes to one document are serialized by the backend's compare-and-swap on
/// the document's index record; writes to different documents do not contend.
pub struct DocStore<KV> {
    kv: KV,
    config: StoreConfig,
    clock: Clock,
}

impl<KV> fmt::Debug for DocStore<KV>
where KV: fmt::Debug
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocStore")
            .field("kv", &self.kv)
            .field("config", &self.config)
            .finish()
    }
}

impl<KV> DocStore<KV>
where KV: KvApi
{
    pub fn new(kv: KV, config: StoreConfig) -> Self {
        Self {
            kv,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn kv(&self) -> &KV {
        &self.kv
    }

    /// The accessor of the document index table.
    pub fn index(&self) -> DocIndex<'_, KV> {
        DocIndex::new(&self.kv, &self.config.doc_table)
    }

    /// The accessor of the revision log table.
    pub fn log(&self) -> RevisionLog<'_, KV> {
        RevisionLog::new(&self.kv, &self.config.revision_table)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.config.op_timeout())
    }
}
