//! Interfaces of the external engines the session depends on.
//!
//! Retrieval, translation, query expansion and document similarity are all
//! owned by other systems. The session only awaits their results; a failed
//! call never reaches the ranking engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod fixture;

pub use fixture::FixtureCollaborators;

use crate::error::Result;
use crate::rerank::SimilarityMatrix;

/// Full-text retrieval over the trial collection
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Scored `(docno, score)` hits for a query
    async fn retrieve(&self, query: &str) -> Result<Vec<(String, f64)>>;
}

/// Query translation into the collection language
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, query: &str) -> Result<String>;
}

/// Language-model query expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    /// Expanded query text
    pub query: String,

    /// Medical condition detected in the query, if any
    #[serde(default)]
    pub condition: Option<String>,
}

#[async_trait]
pub trait Expander: Send + Sync {
    async fn expand(&self, query: &str) -> Result<Expansion>;
}

/// Pairwise document similarity from an embedding model
#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    /// Similarity matrix whose snapshot is exactly `docnos`, in order
    async fn similarity(&self, docnos: &[String]) -> Result<SimilarityMatrix>;
}
