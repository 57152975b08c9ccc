use serde::{Deserialize, Serialize};
use tracing::{debug, info, Span};

mod dedup;
mod fusion;
mod normalize;

pub use dedup::{dedup, DedupStats, Deduplicator};
pub use fusion::{fuse, ListFuser};
pub use normalize::{ScoreBounds, ScoreNormalizer};

use crate::config::Config;
use crate::error::Result;

/// Which query variant produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Original,
    Translated,
    Expanded,
}

impl QuerySource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Translated => "translated",
            Self::Expanded => "expanded",
        }
    }
}

/// A scored retrieval hit tagged with the query variant that found it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub docno: String,
    pub score: f64,
    pub source: QuerySource,
}

impl CandidateDocument {
    pub fn new(docno: impl Into<String>, score: f64, source: QuerySource) -> Self {
        Self {
            docno: docno.into(),
            score,
            source,
        }
    }

    /// Tag raw `(docno, score)` hits with their source
    pub fn from_hits(hits: Vec<(String, f64)>, source: QuerySource) -> Vec<Self> {
        hits.into_iter()
            .map(|(docno, score)| Self::new(docno, score, source))
            .collect()
    }
}

/// One row of a fused or reranked list
///
/// `rank` is 1-based and always equals the entry's position in its list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub docno: String,
    pub score: f64,
    pub source: QuerySource,
}

/// Sort by score descending, keeping the input order of equal scores.
///
/// `slice::sort_by` is a stable sort; fusion and reranking both rely on it
/// for tie-breaking.
pub(crate) fn sort_by_score_desc<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
}

/// Ranks raw retrieval hits from the three query variants into one list
pub struct Ranker {
    normalizer: ScoreNormalizer,
    fuser: ListFuser,
    retrieval_depth: usize,
    span: Span,
}

impl Ranker {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: ScoreNormalizer::new(config.normalize.bounds())?,
            fuser: ListFuser::new(config.ranking.topn, config.ranking.nmax)?,
            retrieval_depth: config.ranking.retrieval_depth,
            span: tracing::info_span!("ranker"),
        })
    }

    /// Log under the given span instead of the default `ranker` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn fuser(&self) -> &ListFuser {
        &self.fuser
    }

    /// Tag, truncate, deduplicate, normalize and fuse the three hit lists
    pub fn rank(
        &self,
        original: Vec<(String, f64)>,
        translated: Vec<(String, f64)>,
        expanded: Vec<(String, f64)>,
    ) -> Result<Vec<RankedEntry>> {
        let _entered = self.span.enter();

        let original = self.top_hits(CandidateDocument::from_hits(original, QuerySource::Original));
        let translated =
            self.top_hits(CandidateDocument::from_hits(translated, QuerySource::Translated));
        let expanded = self.top_hits(CandidateDocument::from_hits(expanded, QuerySource::Expanded));

        let deduplicator = Deduplicator::new(&original);
        let translated = deduplicator.dedup(translated);
        let expanded = deduplicator.dedup(expanded);
        let stats = deduplicator.stats();
        debug!(
            "Removed {} candidates already retrieved by the original query",
            stats.removed
        );

        let original = self.normalizer.normalize(original);
        let translated = self.normalizer.normalize(translated);
        let expanded = self.normalizer.normalize(expanded);

        let ranked = self.fuser.fuse(&original, &translated, &expanded);
        info!(
            "Ranked {} documents ({} original, {} translated, {} expanded candidates)",
            ranked.len(),
            original.len(),
            translated.len(),
            expanded.len()
        );

        Ok(ranked)
    }

    /// Keep the best `retrieval_depth` hits of one list
    fn top_hits(&self, mut hits: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
        sort_by_score_desc(&mut hits, |c| c.score);
        hits.truncate(self.retrieval_depth);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hits(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(d, s)| (d.to_string(), *s)).collect()
    }

    fn docnos(ranked: &[RankedEntry]) -> Vec<&str> {
        ranked.iter().map(|e| e.docno.as_str()).collect()
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut items = vec![("a", 0.5), ("b", 0.9), ("c", 0.5), ("d", 0.5)];
        sort_by_score_desc(&mut items, |i| i.1);
        assert_eq!(items, vec![("b", 0.9), ("a", 0.5), ("c", 0.5), ("d", 0.5)]);
    }

    #[test]
    fn test_rank_scenario_a() {
        let mut config = Config::default();
        config.ranking.topn = 1;
        config.ranking.nmax = 3;
        let ranker = Ranker::new(&config).unwrap();

        let ranked = ranker
            .rank(
                hits(&[("A", 0.9), ("B", 0.5)]),
                hits(&[("C", 0.8)]),
                Vec::new(),
            )
            .unwrap();

        assert_eq!(docnos(&ranked), vec!["A", "C", "B"]);
        assert_eq!(
            ranked.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(ranked[1].source, QuerySource::Translated);
    }

    #[test]
    fn test_rank_removes_secondary_duplicates() {
        let ranker = Ranker::new(&Config::default()).unwrap();
        let ranked = ranker
            .rank(
                hits(&[("NCT1", 0.9), ("NCT2", 0.4)]),
                hits(&[("NCT2", 0.95), ("NCT3", 0.3)]),
                hits(&[("NCT1", 0.7), ("NCT3", 0.6)]),
            )
            .unwrap();

        // NCT3 survives in both secondaries: they are never deduplicated against each other
        assert_eq!(docnos(&ranked), vec!["NCT1", "NCT2", "NCT3", "NCT3"]);
        assert_eq!(ranked[0].source, QuerySource::Original);
        assert_eq!(ranked[1].source, QuerySource::Original);
        assert_eq!(ranked[2].source, QuerySource::Translated);
        assert_eq!(ranked[3].source, QuerySource::Expanded);
    }

    #[test]
    fn test_rank_truncates_to_retrieval_depth() {
        let mut config = Config::default();
        config.ranking.retrieval_depth = 2;
        config.ranking.topn = 5;
        let ranker = Ranker::new(&config).unwrap();

        let ranked = ranker
            .rank(
                hits(&[("a", 0.1), ("b", 0.9), ("c", 0.5)]),
                Vec::new(),
                Vec::new(),
            )
            .unwrap();

        assert_eq!(docnos(&ranked), vec!["b", "c"]);
    }

    #[test]
    fn test_rank_with_observed_bounds() {
        let mut config = Config::default();
        config.normalize.mode = crate::config::BoundsMode::Observed;
        let ranker = Ranker::new(&config).unwrap();

        let ranked = ranker
            .rank(hits(&[("a", 12.0), ("b", 4.0), ("c", 8.0)]), Vec::new(), Vec::new())
            .unwrap();

        let scores: Vec<f64> = ranked.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_ranker_rejects_invalid_config() {
        let mut config = Config::default();
        config.ranking.nmax = 0;
        assert!(Ranker::new(&config).is_err());
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&QuerySource::Expanded).unwrap();
        assert_eq!(json, "\"expanded\"");
        assert_eq!(QuerySource::Translated.name(), "translated");
    }
}
