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
use std::time::Duration;
use std::time::Instant;

use crate::error::DocStoreError;

/// The time by which one store operation must finish.
///
/// It is checked at backend round-trip boundaries only; a round-trip already in flight is not
/// interrupted.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A timeout too large to represent as an instant means no deadline.
    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Check before a round-trip that does not follow a partial write.
    pub fn check(&self, stage: &'static str) -> Result<(), DocStoreError> {
        if self.is_expired() {
            return Err(DocStoreError::DeadlineExceeded { stage });
        }
        Ok(())
    }

    /// Check before a round-trip that follows a partial write; the caller reports the error as
    /// an inconsistency.
    pub fn check_io(&self, stage: &'static str) -> Result<(), io::Error> {
        if self.is_expired() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("deadline exceeded before {}", stage),
            ));
        }
        Ok(())
    }
}
