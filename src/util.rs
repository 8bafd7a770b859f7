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


//! Key layout and encoding helpers shared by the index, the log and the enumerators.

use std::ops::Bound;

use crate::doc_id::DocId;
use crate::revision_id::RevisionId;

/// Separates the doc id from the revision id in a revision key.
///
/// It is not an allowed doc id character, thus `"{doc}/"` is a prefix of the keys of exactly
/// one document.
const SEP: char = '/';

/// The character right after [`SEP`]; `"{doc}0"` is the exclusive upper bound of the prefix.
const SEP_NEXT: char = '0';

pub(crate) fn revision_key(doc_id: &DocId, revision_id: &RevisionId) -> String {
    format!("{}{}{}", doc_id, SEP, revision_id)
}

/// The revision id part of a revision key of `doc_id`.
pub(crate) fn revision_id_of_key<'a>(doc_id: &DocId, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(doc_id.as_str())?.strip_prefix(SEP)
}

/// The key range of all revisions of `doc_id` that sort after `after`.
pub(crate) fn revision_range(
    doc_id: &DocId,
    after: Option<&str>,
) -> (Bound<String>, Bound<String>) {
    let start = match after {
        Some(rev) => Bound::Excluded(format!("{}{}{}", doc_id, SEP, rev)),
        None => Bound::Included(format!("{}{}", doc_id, SEP)),
    };
    let end = Bound::Excluded(format!("{}{}", doc_id, SEP_NEXT));
    (start, end)
}

/// Page tokens: empty for the first page, otherwise `t` followed by the hex of the last key
/// returned. The tag keeps the token of an empty key distinct from the first-page token.
pub(crate) mod page_token {
    pub(crate) fn encode(last_key: &str) -> String {
        format!("t{}", hex::encode(last_key))
    }

    /// Returns `Ok(None)` for the first page, `Ok(Some(last_key))` otherwise.
    pub(crate) fn decode(token: &str) -> Result<Option<String>, String> {
        if token.is_empty() {
            return Ok(None);
        }

        let hex_part = token
            .strip_prefix('t')
            .ok_or_else(|| format!("unknown page token tag: {:?}", token))?;
        let bytes = hex::decode(hex_part).map_err(|e| e.to_string())?;
        let key = String::from_utf8(bytes).map_err(|e| e.to_string())?;
        Ok(Some(key))
    }
}

/// Serialize bytes as a hex string.
pub(crate) mod hex_bytes {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub(crate) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
