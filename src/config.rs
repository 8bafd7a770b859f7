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


use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::revision_id::RevisionIdPolicy;

/// Configuration of a [`DocStore`](crate::DocStore).
///
/// All fields have defaults, so a partial JSON document is a valid config:
///
/// ```
/// use docstore::RevisionIdPolicy;
/// use docstore::StoreConfig;
///
/// let c: StoreConfig = serde_json::from_str(r#"{"doc_table": "my_docs"}"#).unwrap();
/// assert_eq!(c.doc_table, "my_docs");
/// assert_eq!(c.revision_table, "revisions");
/// assert_eq!(c.id_policy, RevisionIdPolicy::Sequence);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Table holding the document index.
    pub doc_table: String,

    /// Table holding the revision log.
    pub revision_table: String,

    pub id_policy: RevisionIdPolicy,

    /// Max number of items in one page of `list_docs` or `list_revisions`.
    pub page_size: usize,

    /// How many times a pointer advance is attempted when other writers keep winning the
    /// compare-and-swap.
    pub max_advance_attempts: u32,

    /// Deadline of one store operation, checked before every backend round-trip.
    /// `None` disables it.
    pub op_timeout_ms: Option<u64>,

    /// A pointer younger than this that does not resolve is assumed to be still in the middle
    /// of a write, and is not rolled back by `repair`.
    pub repair_grace_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            doc_table: "docs".to_string(),
            revision_table: "revisions".to_string(),
            id_policy: RevisionIdPolicy::default(),
            page_size: 100,
            max_advance_attempts: 32,
            op_timeout_ms: None,
            repair_grace_ms: 30_000,
        }
    }
}

impl StoreConfig {
    pub fn with_doc_table(mut self, table: impl ToString) -> Self {
        self.doc_table = table.to_string();
        self
    }

    pub fn with_revision_table(mut self, table: impl ToString) -> Self {
        self.revision_table = table.to_string();
        self
    }

    pub fn with_id_policy(mut self, policy: RevisionIdPolicy) -> Self {
        self.id_policy = policy;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_advance_attempts(mut self, n: u32) -> Self {
        self.max_advance_attempts = n;
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    pub fn with_repair_grace(mut self, grace: Duration) -> Self {
        self.repair_grace_ms = saturating_millis(grace);
        self
    }

    pub fn op_timeout(&self) -> Option<Duration> {
        self.op_timeout_ms.map(Duration::from_millis)
    }

    pub fn repair_grace(&self) -> Duration {
        Duration::from_millis(self.repair_grace_ms)
    }
}

/// Milliseconds of `d`, saturating at `u64::MAX`.
fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
