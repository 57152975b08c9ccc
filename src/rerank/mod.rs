use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod feedback;
mod similarity;

pub use feedback::{mirror_weights, rerank, FeedbackReranker};
pub use similarity::SimilarityMatrix;

use crate::error::{RankError, Result};
use crate::rank::RankedEntry;

/// Feedback sign: relevant (`+`) or useless (`-`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
}

impl Polarity {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "-",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Polarity {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" | "positive" | "relevant" => Ok(Self::Positive),
            "-" | "negative" | "useless" => Ok(Self::Negative),
            other => Err(RankError::config(format!(
                "unknown feedback polarity '{other}' (expected '+' or '-')"
            ))),
        }
    }
}

/// A user's opinion about one previously ranked document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub docno: String,
    pub polarity: Polarity,
}

impl FeedbackEvent {
    pub fn new(docno: impl Into<String>, polarity: Polarity) -> Self {
        Self {
            docno: docno.into(),
            polarity,
        }
    }

    pub fn positive(docno: impl Into<String>) -> Self {
        Self::new(docno, Polarity::Positive)
    }

    pub fn negative(docno: impl Into<String>) -> Self {
        Self::new(docno, Polarity::Negative)
    }
}

/// Feedback reranking strategies
pub trait Reranker: Send + Sync {
    /// Reorder `ranked` in response to one feedback event
    ///
    /// `sim` must have been computed for exactly `ranked`'s docno order.
    fn rerank(
        &self,
        ranked: &[RankedEntry],
        feedback: &FeedbackEvent,
        sim: &SimilarityMatrix,
    ) -> Result<Vec<RankedEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_serializes_as_symbol() {
        let event = FeedbackEvent::negative("NCT01");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"docno":"NCT01","polarity":"-"}"#);

        let back: FeedbackEvent = serde_json::from_str(r#"{"docno":"NCT02","polarity":"+"}"#).unwrap();
        assert_eq!(back, FeedbackEvent::positive("NCT02"));
    }

    #[test]
    fn test_polarity_parse() {
        assert_eq!("+".parse::<Polarity>().unwrap(), Polarity::Positive);
        assert_eq!("useless".parse::<Polarity>().unwrap(), Polarity::Negative);
        assert!("?".parse::<Polarity>().is_err());
        assert_eq!(Polarity::Negative.to_string(), "-");
    }
}
