//! Per-session search history with feedback revision.
//!
//! The history is append-only apart from two operations: a fresh search
//! clears it, and revising the feedback on a document truncates it back to
//! the state right before that document first received feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::rank::RankedEntry;
use crate::rerank::{FeedbackEvent, Polarity};

/// One search or rerank result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<RankedEntry>,
    pub feedback: Option<FeedbackEvent>,
    pub created_at: DateTime<Utc>,
}

impl SearchState {
    /// State produced by a fresh search
    pub fn search(query: impl Into<String>, results: Vec<RankedEntry>) -> Self {
        Self {
            query: query.into(),
            results,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    /// State produced by reranking on feedback
    pub fn reranked(
        query: impl Into<String>,
        results: Vec<RankedEntry>,
        feedback: FeedbackEvent,
    ) -> Self {
        Self {
            query: query.into(),
            results,
            feedback: Some(feedback),
            created_at: Utc::now(),
        }
    }

    /// Docnos in rank order
    pub fn docnos(&self) -> Vec<String> {
        self.results.iter().map(|e| e.docno.clone()).collect()
    }

    fn has_feedback_on(&self, docno: &str) -> bool {
        self.feedback.as_ref().is_some_and(|f| f.docno == docno)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing searched yet
    Idle,
    /// Latest state is a fresh search
    Searched,
    /// Latest state was produced by feedback
    FeedbackApplied,
}

/// Ordered search states of one interactive session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    id: Uuid,
    states: Vec<SearchState>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            states: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Start over with the result of a fresh search
    pub fn begin(&mut self, state: SearchState) {
        debug!(
            "Session {}: new search '{}' replaces {} states",
            self.id,
            state.query,
            self.states.len()
        );
        self.states.clear();
        self.states.push(state);
    }

    pub fn push(&mut self, state: SearchState) {
        self.states.push(state);
        trace!("Session {}: {} states", self.id, self.states.len());
    }

    /// Index `revise_feedback` would truncate to, if `docno` has feedback
    pub fn revision_point(&self, docno: &str) -> Option<usize> {
        self.states.iter().position(|s| s.has_feedback_on(docno))
    }

    /// Drop every state from the earliest feedback on `docno` onwards
    ///
    /// Returns the number of states dropped.
    pub fn revise_feedback(&mut self, docno: &str) -> usize {
        let Some(keep) = self.revision_point(docno) else {
            return 0;
        };
        let dropped = self.states.len() - keep;
        self.states.truncate(keep);
        debug!(
            "Session {}: revised feedback on {}, dropped {} states",
            self.id, docno, dropped
        );
        dropped
    }

    /// Truncate to `keep` states and append `state` in one step
    pub fn replace_from(&mut self, keep: usize, state: SearchState) {
        self.states.truncate(keep);
        self.push(state);
    }

    pub fn latest(&self) -> Option<&SearchState> {
        self.states.last()
    }

    pub fn states(&self) -> &[SearchState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn phase(&self) -> SessionPhase {
        match self.states.last() {
            None => SessionPhase::Idle,
            Some(state) if state.feedback.is_none() => SessionPhase::Searched,
            Some(_) => SessionPhase::FeedbackApplied,
        }
    }

    /// Feedback currently recorded for `docno`
    pub fn feedback_for(&self, docno: &str) -> Option<Polarity> {
        self.states
            .iter()
            .find(|s| s.has_feedback_on(docno))
            .and_then(|s| s.feedback.as_ref())
            .map(|f| f.polarity)
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}
