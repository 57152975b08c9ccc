//! Relevance-feedback reranking.
//!
//! Feedback on the document at position `selected` freezes everything up to
//! and including it. Every later entry is rescored with a weight read from
//! the selected document's similarity row, then the suffix is re-sorted:
//!
//! - positive feedback weights an entry by its similarity `s` to the
//!   selected document;
//! - negative feedback weights it by the *mirrored* value: with the row
//!   sorted descending and `s` found at position `p` (first match), the weight
//!   is the value at position `len - 1 - p`. Documents unlike the rejected
//!   one therefore keep most of their score.

use tracing::{debug, Span};

use super::{FeedbackEvent, Polarity, Reranker, SimilarityMatrix};
use crate::error::Result;
use crate::rank::{sort_by_score_desc, RankedEntry};

pub struct FeedbackReranker {
    span: Span,
}

impl FeedbackReranker {
    pub fn new() -> Self {
        Self {
            span: tracing::info_span!("feedback_reranker"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Default for FeedbackReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker for FeedbackReranker {
    fn rerank(
        &self,
        ranked: &[RankedEntry],
        feedback: &FeedbackEvent,
        sim: &SimilarityMatrix,
    ) -> Result<Vec<RankedEntry>> {
        let _entered = self.span.enter();

        sim.check_paired(ranked)?;

        let Some(selected) = ranked.iter().position(|e| e.docno == feedback.docno) else {
            debug!("Feedback on unranked docno {}, list unchanged", feedback.docno);
            return Ok(ranked.to_vec());
        };

        let mut reranked = ranked.to_vec();
        if selected + 1 >= reranked.len() {
            return Ok(reranked);
        }

        let row = sim.row(selected);
        let weights = match feedback.polarity {
            Polarity::Positive => row.to_vec(),
            Polarity::Negative => mirror_weights(row),
        };

        let suffix = &mut reranked[selected + 1..];
        for (entry, weight) in suffix.iter_mut().zip(&weights[selected + 1..]) {
            entry.score *= weight;
        }
        sort_by_score_desc(suffix, |e| e.score);
        for (offset, entry) in suffix.iter_mut().enumerate() {
            entry.rank = selected + 2 + offset;
        }

        debug!(
            "Reranked {} entries after rank {} ({} feedback on {})",
            suffix.len(),
            selected + 1,
            feedback.polarity,
            feedback.docno
        );

        Ok(reranked)
    }
}

/// Rerank `ranked` with the default feedback policy
pub fn rerank(
    ranked: &[RankedEntry],
    feedback: &FeedbackEvent,
    sim: &SimilarityMatrix,
) -> Result<Vec<RankedEntry>> {
    FeedbackReranker::new().rerank(ranked, feedback, sim)
}

/// Negative-feedback weight for every position of a similarity row
///
/// Each value `s` is located in the descending-sorted row at its *first*
/// occurrence `p`, and replaced by the value at the mirrored position
/// `len - 1 - p`. Duplicate values therefore all share the mirror of the
/// first duplicate.
pub fn mirror_weights(row: &[f64]) -> Vec<f64> {
    let mut ordered = row.to_vec();
    ordered.sort_by(|a, b| b.total_cmp(a));
    let last = ordered.len().saturating_sub(1);

    row.iter()
        .map(|s| {
            ordered
                .iter()
                .position(|o| o.total_cmp(s).is_eq())
                .map_or(*s, |p| ordered[last - p])
        })
        .collect()
}
