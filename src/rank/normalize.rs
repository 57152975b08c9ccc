//! Linear rescaling of retrieval scores onto the unit interval.

use tracing::{trace, Span};

use super::CandidateDocument;
use crate::error::{RankError, Result};

/// Where the normalizer takes its `min`/`max` from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBounds {
    /// Fixed bounds; `Fixed { min: 0.0, max: 1.0 }` leaves scores untouched
    Fixed { min: f64, max: f64 },
    /// Minimum and maximum score of the list being normalized
    Observed,
}

impl ScoreBounds {
    pub fn validate(&self) -> Result<()> {
        if let Self::Fixed { min, max } = *self {
            if !min.is_finite() || !max.is_finite() {
                return Err(RankError::config("normalization bounds must be finite"));
            }
            if max < min {
                return Err(RankError::config(format!(
                    "normalization max ({max}) is below min ({min})"
                )));
            }
        }
        Ok(())
    }

    fn resolve(&self, list: &[CandidateDocument]) -> Option<(f64, f64)> {
        match *self {
            Self::Fixed { min, max } => Some((min, max)),
            Self::Observed => {
                let mut scores = list.iter().map(|c| c.score);
                let first = scores.next()?;
                Some(scores.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s))))
            }
        }
    }
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self::Fixed { min: 0.0, max: 1.0 }
    }
}

/// Maps `min` to 0.0 and `max` to 1.0: `score' = (score - min) / (max - min)`
pub struct ScoreNormalizer {
    bounds: ScoreBounds,
    span: Span,
}

impl ScoreNormalizer {
    pub fn new(bounds: ScoreBounds) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            bounds,
            span: tracing::debug_span!("normalizer"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn bounds(&self) -> ScoreBounds {
        self.bounds
    }

    /// Rescale every score in the list
    ///
    /// A degenerate range (`max == min`, or an empty list in observed mode)
    /// returns the list unchanged.
    pub fn normalize(&self, mut list: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
        let _entered = self.span.enter();

        let Some((min, max)) = self.bounds.resolve(&list) else {
            return list;
        };
        if max == min {
            trace!("Degenerate score range {} for {} candidates, skipping", min, list.len());
            return list;
        }

        let range = max - min;
        for candidate in &mut list {
            candidate.score = (candidate.score - min) / range;
        }
        list
    }
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        Self {
            bounds: ScoreBounds::default(),
            span: tracing::debug_span!("normalizer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::QuerySource;

    fn list(scores: &[f64]) -> Vec<CandidateDocument> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| CandidateDocument::new(format!("d{i}"), *s, QuerySource::Original))
            .collect()
    }

    fn scores(list: &[CandidateDocument]) -> Vec<f64> {
        list.iter().map(|c| c.score).collect()
    }

    #[test]
    fn test_default_bounds_are_identity() {
        let normalizer = ScoreNormalizer::default();
        let input = list(&[0.9, 0.25, 0.0]);
        assert_eq!(normalizer.normalize(input.clone()), input);
    }

    #[test]
    fn test_fixed_bounds_rescale() {
        let normalizer = ScoreNormalizer::new(ScoreBounds::Fixed { min: 2.0, max: 6.0 }).unwrap();
        let out = normalizer.normalize(list(&[6.0, 4.0, 2.0, 3.0]));
        assert_eq!(scores(&out), vec![1.0, 0.5, 0.0, 0.25]);
    }

    #[test]
    fn test_degenerate_range_is_noop() {
        let normalizer = ScoreNormalizer::new(ScoreBounds::Fixed { min: 3.0, max: 3.0 }).unwrap();
        let input = list(&[7.0, 1.0]);
        assert_eq!(normalizer.normalize(input.clone()), input);

        let observed = ScoreNormalizer::new(ScoreBounds::Observed).unwrap();
        let constant = list(&[0.4, 0.4]);
        assert_eq!(observed.normalize(constant.clone()), constant);
        assert!(observed.normalize(Vec::new()).is_empty());
    }

    #[test]
    fn test_observed_bounds() {
        let normalizer = ScoreNormalizer::new(ScoreBounds::Observed).unwrap();
        let out = normalizer.normalize(list(&[10.0, 20.0, 15.0]));
        assert_eq!(scores(&out), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for bounds in [ScoreBounds::default(), ScoreBounds::Observed] {
            let normalizer = ScoreNormalizer::new(bounds).unwrap();
            let once = normalizer.normalize(list(&[3.5, 1.25, 0.5, 2.0]));
            let twice = normalizer.normalize(once.clone());
            assert_eq!(once, twice, "bounds {:?}", bounds);
        }
    }

    #[test]
    fn test_normalize_keeps_order_and_tags() {
        let normalizer = ScoreNormalizer::new(ScoreBounds::Observed).unwrap();
        let out = normalizer.normalize(list(&[1.0, 3.0]));
        assert_eq!(out[0].docno, "d0");
        assert_eq!(out[1].docno, "d1");
        assert!(out.iter().all(|c| c.source == QuerySource::Original));
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(ScoreNormalizer::new(ScoreBounds::Fixed { min: 1.0, max: 0.0 }).is_err());
        assert!(ScoreNormalizer::new(ScoreBounds::Fixed {
            min: 0.0,
            max: f64::INFINITY
        })
        .is_err());
    }
}
