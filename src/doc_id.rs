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


//! Document identifiers.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The document id contains a character outside of `[.a-z0-9_-]`.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
#[error("Illegal character {ch:?} at byte {pos} in doc id {id:?}; allowed: lowercase letters, digits, '.', '_', '-'")]
pub struct InvalidDocId {
    pub id: String,
    pub ch: char,
    pub pos: usize,
}

fn is_allowed(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '.' | '_' | '-')
}

/// Check that `doc_id` only contains lowercase ASCII letters, digits, `.`, `_` and `-`.
///
/// The empty string is accepted.
pub fn validate_doc_id(doc_id: &str) -> Result<(), InvalidDocId> {
    match doc_id.char_indices().find(|(_, c)| !is_allowed(*c)) {
        None => Ok(()),
        Some((pos, ch)) => Err(InvalidDocId {
            id: doc_id.to_string(),
            ch,
            pos,
        }),
    }
}

/// A validated document id.
///
/// The character set excludes `/`, which is used to build the composite key of a revision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl ToString) -> Result<Self, InvalidDocId> {
        let id = id.to_string();
        validate_doc_id(&id)?;
        Ok(DocId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocId {
    type Error = InvalidDocId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_doc_id(&value)?;
        Ok(DocId(value))
    }
}

impl From<DocId> for String {
    fn from(value: DocId) -> Self {
        value.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
