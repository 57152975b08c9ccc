//! Collaborators backed by a JSON fixture file.
//!
//! ```json
//! {
//!   "hits": { "tumore al polmone": [["NCT001", 0.82], ["NCT002", 0.41]] },
//!   "translations": { "tumore al polmone": "lung cancer" },
//!   "expansions": { "lung cancer": { "query": "lung cancer nsclc", "condition": "Lung Cancer" } },
//!   "similarity": { "docnos": ["NCT001", "NCT002"], "values": [[1.0, 0.3], [0.3, 1.0]] }
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{Expander, Expansion, Retriever, SimilarityProvider, Translator};
use crate::error::RankError;
use crate::rerank::SimilarityMatrix;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureCollaborators {
    /// Retrieval hits per query; unknown queries retrieve nothing
    pub hits: HashMap<String, Vec<(String, f64)>>,

    /// Translations; unknown queries translate to themselves
    pub translations: HashMap<String, String>,

    /// Expansions; unknown queries expand to themselves
    pub expansions: HashMap<String, Expansion>,

    /// Similarity over every docno the fixture can retrieve
    pub similarity: Option<SimilarityMatrix>,
}

impl FixtureCollaborators {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))
    }
}

#[async_trait]
impl Retriever for FixtureCollaborators {
    async fn retrieve(&self, query: &str) -> crate::Result<Vec<(String, f64)>> {
        Ok(self.hits.get(query).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Translator for FixtureCollaborators {
    async fn translate(&self, query: &str) -> crate::Result<String> {
        Ok(self
            .translations
            .get(query)
            .cloned()
            .unwrap_or_else(|| query.to_string()))
    }
}

#[async_trait]
impl Expander for FixtureCollaborators {
    async fn expand(&self, query: &str) -> crate::Result<Expansion> {
        Ok(self.expansions.get(query).cloned().unwrap_or_else(|| Expansion {
            query: query.to_string(),
            condition: None,
        }))
    }
}

#[async_trait]
impl SimilarityProvider for FixtureCollaborators {
    async fn similarity(&self, docnos: &[String]) -> crate::Result<SimilarityMatrix> {
        let universe = self
            .similarity
            .as_ref()
            .ok_or_else(|| RankError::collaborator("similarity", "fixture has no similarity matrix"))?;

        universe.project(docnos).ok_or_else(|| {
            let missing = docnos
                .iter()
                .find(|d| !universe.docnos().contains(d))
                .cloned()
                .unwrap_or_default();
            RankError::collaborator("similarity", format!("no embedding for docno {missing}"))
        })
    }
}
