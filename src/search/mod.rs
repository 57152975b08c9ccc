//! Interactive search sessions.
//!
//! A [`SearchSession`] drives the collaborators for one user: it retrieves
//! the original, translated and expanded query variants, ranks them into one
//! list and applies relevance feedback on top. Collaborator calls are bounded
//! by a timeout and retried; a failure never touches the session history.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, SimilarityCache};
use crate::collab::{Expander, FixtureCollaborators, Retriever, SimilarityProvider, Translator};
use crate::config::{Config, SessionConfig};
use crate::error::{RankError, Result};
use crate::rank::{RankedEntry, Ranker};
use crate::rerank::{FeedbackEvent, FeedbackReranker, Polarity, Reranker};
use crate::session::{SearchState, SessionHistory};

/// The external engines a session talks to
#[derive(Clone)]
pub struct Collaborators {
    pub retriever: Arc<dyn Retriever>,
    pub translator: Arc<dyn Translator>,
    pub expander: Arc<dyn Expander>,
    pub similarity: Arc<dyn SimilarityProvider>,
}

impl Collaborators {
    /// Serve every collaborator from one fixture
    pub fn from_fixture(fixture: FixtureCollaborators) -> Self {
        let fixture = Arc::new(fixture);
        Self {
            retriever: fixture.clone(),
            translator: fixture.clone(),
            expander: fixture.clone(),
            similarity: fixture,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_expander(mut self, expander: Arc<dyn Expander>) -> Self {
        self.expander = expander;
        self
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityProvider>) -> Self {
        self.similarity = similarity;
        self
    }
}

/// Result of a fresh search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub translated_query: String,
    pub expanded_query: Option<String>,
    /// Medical condition the expander detected, if any
    pub condition: Option<String>,
    pub results: Vec<RankedEntry>,
}

/// Translated and expanded retrieval, run as one chain
struct SecondaryHits {
    translated_query: String,
    translated: Vec<(String, f64)>,
    expanded_query: Option<String>,
    condition: Option<String>,
    expanded: Vec<(String, f64)>,
}

pub struct SearchSession {
    config: SessionConfig,
    retriever: Arc<dyn Retriever>,
    translator: Arc<dyn Translator>,
    expander: Arc<dyn Expander>,
    similarity: SimilarityCache,
    ranker: Ranker,
    reranker: FeedbackReranker,
    history: SessionHistory,
}

impl SearchSession {
    pub fn new(config: &Config, collaborators: Collaborators) -> Result<Self> {
        let history = SessionHistory::new();
        let id = history.id();

        Ok(Self {
            config: config.session.clone(),
            retriever: collaborators.retriever,
            translator: collaborators.translator,
            expander: collaborators.expander,
            similarity: SimilarityCache::new(
                collaborators.similarity,
                config.session.similarity_cache_entries,
            ),
            ranker: Ranker::new(config)?.with_span(tracing::info_span!("ranker", session = %id)),
            reranker: FeedbackReranker::new()
                .with_span(tracing::info_span!("feedback_reranker", session = %id)),
            history,
        })
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Ranked list of the latest state, empty before the first search
    pub fn latest_results(&self) -> &[RankedEntry] {
        self.history
            .latest()
            .map(|s| s.results.as_slice())
            .unwrap_or_default()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.similarity.stats()
    }

    /// Run a fresh search and start the history over with its result
    #[instrument(skip(self), fields(session = %self.history.id()))]
    pub async fn search(&mut self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RankError::EmptyQuery);
        }

        let retriever = &self.retriever;
        let original = with_retry(&self.config, "retriever", move || retriever.retrieve(query));
        let (original, secondary) = tokio::try_join!(original, self.secondary_hits(query))?;

        let results = self
            .ranker
            .rank(original, secondary.translated, secondary.expanded)?;
        info!("Search '{}' ranked {} documents", query, results.len());

        self.history
            .begin(SearchState::search(query, results.clone()));

        Ok(SearchOutcome {
            query: query.to_string(),
            translated_query: secondary.translated_query,
            expanded_query: secondary.expanded_query,
            condition: secondary.condition,
            results,
        })
    }

    async fn secondary_hits(&self, query: &str) -> Result<SecondaryHits> {
        let (retriever, translator, expander) = (&self.retriever, &self.translator, &self.expander);

        let translated_query =
            with_retry(&self.config, "translator", move || translator.translate(query)).await?;
        let translated_ref = translated_query.as_str();
        let translated =
            with_retry(&self.config, "retriever", move || retriever.retrieve(translated_ref))
                .await?;

        if !self.config.expansion {
            return Ok(SecondaryHits {
                translated_query,
                translated,
                expanded_query: None,
                condition: None,
                expanded: Vec::new(),
            });
        }

        let expansion =
            with_retry(&self.config, "expander", move || expander.expand(translated_ref)).await?;
        let expanded_ref = expansion.query.as_str();
        let expanded =
            with_retry(&self.config, "retriever", move || retriever.retrieve(expanded_ref))
                .await?;

        if let Some(condition) = &expansion.condition {
            debug!("Expander detected condition '{}'", condition);
        }

        Ok(SecondaryHits {
            translated_query,
            translated,
            expanded_query: Some(expansion.query),
            condition: expansion.condition,
            expanded,
        })
    }

    /// Set, change or clear the feedback on `docno`
    ///
    /// Any earlier feedback on the same document is revised: the history goes
    /// back to the state right before it and, unless `polarity` is `None`,
    /// the new feedback is applied to that state. Returns the resulting list.
    #[instrument(skip(self), fields(session = %self.history.id()))]
    pub async fn feedback(
        &mut self,
        docno: &str,
        polarity: Option<Polarity>,
    ) -> Result<Vec<RankedEntry>> {
        if self.history.is_empty() {
            return Err(RankError::NoActiveSearch);
        }

        let Some(polarity) = polarity else {
            let dropped = self.history.revise_feedback(docno);
            info!("Cleared feedback on {} ({} states dropped)", docno, dropped);
            return Ok(self.latest_results().to_vec());
        };

        let keep = self
            .history
            .revision_point(docno)
            .unwrap_or(self.history.len());
        let base = &self.history.states()[keep - 1];

        if !base.results.iter().any(|e| e.docno == docno) {
            debug!("Feedback on unranked docno {}, history unchanged", docno);
            return Ok(self.latest_results().to_vec());
        }

        let docnos = base.docnos();
        let similarity = &self.similarity;
        let docnos_ref = docnos.as_slice();
        let matrix =
            with_retry(&self.config, "similarity", move || similarity.similarity(docnos_ref))
                .await?;

        let event = FeedbackEvent::new(docno, polarity);
        let results = self.reranker.rerank(&base.results, &event, &matrix)?;
        let query = base.query.clone();

        self.history
            .replace_from(keep, SearchState::reranked(query, results.clone(), event));
        info!(
            "Applied {} feedback on {} ({} states in history)",
            polarity,
            docno,
            self.history.len()
        );

        Ok(results)
    }
}

/// Await a collaborator call under the session timeout, retrying failures
///
/// Only collaborator failures and timeouts are retried; any other error is
/// returned at once.
async fn with_retry<T, F, Fut>(
    config: &SessionConfig,
    collaborator: &'static str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let timeout = config.collaborator_timeout();
    let attempts = config.collaborator_retries + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(RankError::Timeout {
                collaborator,
                elapsed: timeout,
            }),
        };

        match result {
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(
                    "{} attempt {}/{} failed: {}",
                    collaborator, attempt, attempts, e
                );
            }
            other => return other,
        }
    }
}
