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


use crate::match_seq::ConflictSeq;
use crate::match_seq::MatchSeq;
use crate::seq_value::SeqV;
use crate::seq_value::SeqValue;

/// Check if the sequence number satisfies the condition.
pub trait MatchSeqExt<T> {
    /// Match against a some value containing seq by checking if the seq satisfies the condition.
    fn match_seq(&self, sv: &T) -> Result<(), ConflictSeq>;
}

impl MatchSeqExt<u64> for MatchSeq {
    fn match_seq(&self, seq: &u64) -> Result<(), ConflictSeq> {
        let matched = match self {
            MatchSeq::Any => true,
            MatchSeq::Exact(s) => seq == s,
            MatchSeq::GE(s) => seq >= s,
        };

        if matched {
            Ok(())
        } else {
            Err(ConflictSeq::NotMatch {
                want: *self,
                got: *seq,
            })
        }
    }
}

impl<T> MatchSeqExt<SeqV<T>> for MatchSeq {
    fn match_seq(&self, sv: &SeqV<T>) -> Result<(), ConflictSeq> {
        self.match_seq(&sv.seq())
    }
}

/// An absent item is matched as `seq == 0`.
impl<T> MatchSeqExt<Option<SeqV<T>>> for MatchSeq {
    fn match_seq(&self, sv: &Option<SeqV<T>>) -> Result<(), ConflictSeq> {
        self.match_seq(&sv.seq())
    }
}

#[cfg(test)]
mod tests {
    use crate::match_seq::ConflictSeq;
    use crate::match_seq::MatchSeq;
    use crate::match_seq::MatchSeqExt;
    use crate::seq_value::SeqV;

    fn not_match(want: MatchSeq, got: u64) -> Result<(), ConflictSeq> {
        Err(ConflictSeq::NotMatch { want, got })
    }

    #[test]
    fn test_match_seq_absent() -> anyhow::Result<()> {
        let m = MatchSeq::absent();

        assert_eq!(m.match_seq(&None::<SeqV<u64>>), Ok(()));
        assert_eq!(m.match_seq(&Some(SeqV::new(1, 1u64))), not_match(m, 1));

        Ok(())
    }

    #[test]
    fn test_match_seq_exact() -> anyhow::Result<()> {
        let m = MatchSeq::Exact(3);

        assert_eq!(m.match_seq(&None::<SeqV<u64>>), not_match(m, 0));
        assert_eq!(m.match_seq(&Some(SeqV::new(2, 1u64))), not_match(m, 2));
        assert_eq!(m.match_seq(&Some(SeqV::new(3, 1u64))), Ok(()));
        assert_eq!(m.match_seq(&Some(SeqV::new(4, 1u64))), not_match(m, 4));

        Ok(())
    }

    #[test]
    fn test_match_seq_ge() -> anyhow::Result<()> {
        let m = MatchSeq::GE(3);

        assert_eq!(m.match_seq(&None::<SeqV<u64>>), not_match(m, 0));
        assert_eq!(m.match_seq(&SeqV::new(2, 1u64)), not_match(m, 2));
        assert_eq!(m.match_seq(&SeqV::new(3, 1u64)), Ok(()));
        assert_eq!(m.match_seq(&4u64), Ok(()));

        Ok(())
    }

    #[test]
    fn test_match_seq_any() -> anyhow::Result<()> {
        assert_eq!(MatchSeq::Any.match_seq(&None::<SeqV<u64>>), Ok(()));
        assert_eq!(MatchSeq::Any.match_seq(&Some(SeqV::new(9, 1u64))), Ok(()));

        Ok(())
    }
}
