//! Quota-based fusion of the original, translated and expanded lists.
//!
//! Each list first contributes its best `topn` candidates, in list order
//! (original, translated, expanded), regardless of how their scores compare
//! across lists. Everything past `topn` in each list is pooled, sorted by
//! score and appended. The result is cut to `nmax` and ranked by position.

use tracing::{debug, Span};

use super::{sort_by_score_desc, CandidateDocument, RankedEntry};
use crate::error::{RankError, Result};

/// Merges the three candidate lists under the fusion quota
pub struct ListFuser {
    topn: usize,
    nmax: usize,
    span: Span,
}

impl ListFuser {
    /// `topn` and `nmax` must both be at least 1; `nmax < topn` is allowed
    pub fn new(topn: usize, nmax: usize) -> Result<Self> {
        if topn == 0 {
            return Err(RankError::config("topn must be at least 1"));
        }
        if nmax == 0 {
            return Err(RankError::config("nmax must be at least 1"));
        }
        Ok(Self {
            topn,
            nmax,
            span: tracing::debug_span!("fuser", topn, nmax),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn topn(&self) -> usize {
        self.topn
    }

    pub fn nmax(&self) -> usize {
        self.nmax
    }

    /// Fuse already deduplicated and normalized lists
    pub fn fuse(
        &self,
        original: &[CandidateDocument],
        translated: &[CandidateDocument],
        expanded: &[CandidateDocument],
    ) -> Vec<RankedEntry> {
        let _entered = self.span.enter();

        let mut head = Vec::with_capacity(self.nmax);
        let mut remainder = Vec::new();

        for list in [original, translated, expanded] {
            let mut sorted = list.to_vec();
            sort_by_score_desc(&mut sorted, |c| c.score);

            // Each list's remainder comes from its own tail
            let split = self.topn.min(sorted.len());
            remainder.extend(sorted.split_off(split));
            head.extend(sorted);
        }

        sort_by_score_desc(&mut remainder, |c| c.score);
        debug!(
            "Fusing {} quota candidates with {} remaining",
            head.len(),
            remainder.len()
        );

        head.extend(remainder);
        head.truncate(self.nmax);

        head.into_iter()
            .enumerate()
            .map(|(idx, candidate)| RankedEntry {
                rank: idx + 1,
                docno: candidate.docno,
                score: candidate.score,
                source: candidate.source,
            })
            .collect()
    }
}

/// Fuse three candidate lists into one ranked list
///
/// Rejects `topn == 0` or `nmax == 0` before doing any work.
pub fn fuse(
    original: &[CandidateDocument],
    translated: &[CandidateDocument],
    expanded: &[CandidateDocument],
    topn: usize,
    nmax: usize,
) -> Result<Vec<RankedEntry>> {
    Ok(ListFuser::new(topn, nmax)?.fuse(original, translated, expanded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rank::QuerySource;
    use pretty_assertions::assert_eq;

    fn list(items: &[(&str, f64)], source: QuerySource) -> Vec<CandidateDocument> {
        items
            .iter()
            .map(|(d, s)| CandidateDocument::new(*d, *s, source))
            .collect()
    }

    fn docnos(ranked: &[RankedEntry]) -> Vec<&str> {
        ranked.iter().map(|e| e.docno.as_str()).collect()
    }

    #[test]
    fn test_scenario_a() {
        let original = list(&[("A", 0.9), ("B", 0.5)], QuerySource::Original);
        let translated = list(&[("C", 0.8)], QuerySource::Translated);

        let ranked = fuse(&original, &translated, &[], 1, 3).unwrap();

        assert_eq!(docnos(&ranked), vec!["A", "C", "B"]);
        assert_eq!(ranked.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_quota_ignores_cross_list_scores() {
        let original = list(&[("o1", 0.2), ("o2", 0.1)], QuerySource::Original);
        let translated = list(&[("t1", 0.99), ("t2", 0.98)], QuerySource::Translated);
        let expanded = list(&[("e1", 0.5)], QuerySource::Expanded);

        let ranked = fuse(&original, &translated, &expanded, 1, 10).unwrap();

        // Head: best of each list in list order; tail: pooled remainder by score
        assert_eq!(docnos(&ranked), vec!["o1", "t1", "e1", "t2", "o2"]);
    }

    #[test]
    fn test_quota_slices_are_sorted_per_list() {
        let original = list(&[("b", 0.3), ("a", 0.7), ("c", 0.5)], QuerySource::Original);
        let translated = list(&[("y", 0.1), ("x", 0.6)], QuerySource::Translated);

        let ranked = fuse(&original, &translated, &[], 2, 10).unwrap();

        assert_eq!(docnos(&ranked), vec!["a", "c", "x", "y", "b"]);
    }

    #[test]
    fn test_remainder_comes_from_each_list_tail() {
        // Each list contributes its own tail. Pooling the original tail in
        // place of the translated one would duplicate "o2" and drop "t2".
        let original = list(&[("o1", 0.9), ("o2", 0.8)], QuerySource::Original);
        let translated = list(&[("t1", 0.7), ("t2", 0.6)], QuerySource::Translated);

        let ranked = fuse(&original, &translated, &[], 1, 10).unwrap();

        assert_eq!(docnos(&ranked), vec!["o1", "t1", "o2", "t2"]);
        assert_eq!(ranked[3].source, QuerySource::Translated);
    }

    #[test]
    fn test_cardinality() {
        let original = list(&[("a", 0.9), ("b", 0.8), ("c", 0.7)], QuerySource::Original);
        let translated = list(&[("d", 0.6), ("e", 0.5)], QuerySource::Translated);
        let expanded = list(&[("f", 0.4)], QuerySource::Expanded);

        for nmax in 1..=8 {
            let ranked = fuse(&original, &translated, &expanded, 2, nmax).unwrap();
            assert_eq!(ranked.len(), nmax.min(6));
            let ranks: Vec<usize> = ranked.iter().map(|e| e.rank).collect();
            assert_eq!(ranks, (1..=ranked.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_nmax_below_topn_truncates_later_slices() {
        let original = list(&[("a", 0.9), ("b", 0.8), ("c", 0.7)], QuerySource::Original);
        let translated = list(&[("d", 0.6)], QuerySource::Translated);

        let ranked = fuse(&original, &translated, &[], 3, 2).unwrap();

        assert_eq!(docnos(&ranked), vec!["a", "b"]);
    }

    #[test]
    fn test_all_lists_empty() {
        let ranked = fuse(&[], &[], &[], 5, 10).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let original = list(&[("a", 0.5), ("b", 0.5), ("c", 0.5)], QuerySource::Original);
        let translated = list(&[("x", 0.5), ("y", 0.5)], QuerySource::Translated);

        let ranked = fuse(&original, &translated, &[], 1, 10).unwrap();

        // Remainder pool is original tail then translated tail, untouched by the tie
        assert_eq!(docnos(&ranked), vec!["a", "x", "b", "c", "y"]);
    }

    #[test]
    fn test_zero_topn_or_nmax_rejected() {
        let original = list(&[("a", 0.5)], QuerySource::Original);
        let err = fuse(&original, &[], &[], 0, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = fuse(&original, &[], &[], 3, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
