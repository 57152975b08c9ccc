use super::CandidateDocument;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Removes candidates already retrieved by the primary (original-query) list
///
/// The translated and expanded lists are each filtered against the original
/// list. They are never filtered against each other, so a document found by
/// both reformulations (but not by the original query) can appear twice.
pub struct Deduplicator {
    /// Docnos of the primary list
    primary: HashSet<String>,

    /// Count of secondary candidates kept
    kept_count: AtomicUsize,

    /// Count of secondary candidates removed
    removed_count: AtomicUsize,
}

impl Deduplicator {
    pub fn new(primary: &[CandidateDocument]) -> Self {
        Self {
            primary: primary.iter().map(|c| c.docno.clone()).collect(),
            kept_count: AtomicUsize::new(0),
            removed_count: AtomicUsize::new(0),
        }
    }

    /// Drop every secondary candidate whose docno is in the primary list
    ///
    /// The order of the surviving candidates is preserved.
    pub fn dedup(&self, secondary: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
        secondary
            .into_iter()
            .filter(|candidate| {
                if self.is_duplicate(candidate) {
                    self.removed_count.fetch_add(1, Ordering::Relaxed);
                    false
                } else {
                    self.kept_count.fetch_add(1, Ordering::Relaxed);
                    true
                }
            })
            .collect()
    }

    pub fn is_duplicate(&self, candidate: &CandidateDocument) -> bool {
        self.primary.contains(&candidate.docno)
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            kept: self.kept_count.load(Ordering::Relaxed),
            removed: self.removed_count.load(Ordering::Relaxed),
        }
    }
}

/// Remove from `secondary` every candidate whose docno appears in `primary`
pub fn dedup(
    primary: &[CandidateDocument],
    secondary: Vec<CandidateDocument>,
) -> Vec<CandidateDocument> {
    Deduplicator::new(primary).dedup(secondary)
}

/// Statistics about secondary-list deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
    pub kept: usize,
    pub removed: usize,
}

impl DedupStats {
    /// Ratio of removed candidates (0.0 to 1.0)
    pub fn removed_ratio(&self) -> f64 {
        let total = self.kept + self.removed;
        if total == 0 {
            0.0
        } else {
            self.removed as f64 / total as f64
        }
    }
}
