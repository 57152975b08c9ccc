use async_trait::async_trait;
use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::collab::SimilarityProvider;
use crate::error::{RankError, Result};
use crate::rerank::SimilarityMatrix;

/// Similarity cache keyed by the exact docno order of a ranked list
///
/// Rerank after rerank reuses the same list only when the order is
/// unchanged, so the key is a fingerprint of the ordered docnos.
pub struct SimilarityCache {
    inner: Arc<dyn SimilarityProvider>,
    cache: Cache<String, Arc<SimilarityMatrix>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SimilarityCache {
    pub fn new(inner: Arc<dyn SimilarityProvider>, max_entries: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(max_entries).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fingerprint of an ordered docno list
    pub fn fingerprint(docnos: &[String]) -> String {
        let mut hasher = Sha256::new();
        for docno in docnos {
            hasher.update(docno.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.cache.entry_count(),
        }
    }
}

#[async_trait]
impl SimilarityProvider for SimilarityCache {
    async fn similarity(&self, docnos: &[String]) -> Result<SimilarityMatrix> {
        let key = Self::fingerprint(docnos);
        if let Some(matrix) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("Similarity cache hit for {} docnos", docnos.len());
            return Ok(matrix.as_ref().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let matrix = self.inner.similarity(docnos).await?;
        ensure_snapshot(&matrix, docnos)?;

        debug!("Caching similarity matrix for {} docnos", docnos.len());
        self.cache.insert(key, Arc::new(matrix.clone()));
        Ok(matrix)
    }
}

/// A provider must answer for exactly the order it was asked about
fn ensure_snapshot(matrix: &SimilarityMatrix, docnos: &[String]) -> Result<()> {
    if matrix.len() != docnos.len() {
        return Err(RankError::DimensionMismatch {
            matrix: matrix.len(),
            ranked: docnos.len(),
        });
    }
    match matrix
        .docnos()
        .iter()
        .zip(docnos)
        .position(|(own, asked)| own != asked)
    {
        Some(position) => Err(RankError::SnapshotMismatch {
            position,
            expected: docnos[position].clone(),
            found: matrix.docnos()[position].clone(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        calls: AtomicUsize,
        reversed: bool,
    }

    #[async_trait]
    impl SimilarityProvider for Counting {
        async fn similarity(&self, docnos: &[String]) -> Result<SimilarityMatrix> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut order = docnos.to_vec();
            if self.reversed {
                order.reverse();
            }
            let n = order.len();
            let rows = (0..n)
                .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.5 }).collect())
                .collect();
            SimilarityMatrix::new(order, rows)
        }
    }

    fn ids(docnos: &[&str]) -> Vec<String> {
        docnos.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let ab = SimilarityCache::fingerprint(&ids(&["a", "b"]));
        assert_eq!(ab, SimilarityCache::fingerprint(&ids(&["a", "b"])));
        assert_ne!(ab, SimilarityCache::fingerprint(&ids(&["b", "a"])));
        assert_ne!(
            SimilarityCache::fingerprint(&ids(&["ab", "c"])),
            SimilarityCache::fingerprint(&ids(&["a", "bc"]))
        );
    }

    #[tokio::test]
    async fn test_cache_hits_on_same_order() {
        let provider = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            reversed: false,
        });
        let cache = SimilarityCache::new(provider.clone(), 8);

        cache.similarity(&ids(&["a", "b", "c"])).await.unwrap();
        let again = cache.similarity(&ids(&["a", "b", "c"])).await.unwrap();
        assert_eq!(again.docnos(), &ids(&["a", "b", "c"])[..]);
        cache.similarity(&ids(&["c", "b", "a"])).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert!((cache.hit_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rejects_matrix_for_other_order() {
        let provider = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            reversed: true,
        });
        let cache = SimilarityCache::new(provider, 8);

        let err = cache.similarity(&ids(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, RankError::SnapshotMismatch { position: 0, .. }));
        assert_eq!(cache.stats().size, 0);
    }
}
