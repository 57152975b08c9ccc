pub mod cache;
pub mod collab;
pub mod config;
pub mod error;
pub mod rank;
pub mod rerank;
pub mod search;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorKind, RankError, Result};
pub use rank::{CandidateDocument, QuerySource, RankedEntry, Ranker};
pub use rerank::{FeedbackEvent, FeedbackReranker, Polarity, Reranker, SimilarityMatrix};
pub use search::{Collaborators, SearchOutcome, SearchSession};
pub use session::{SearchState, SessionHistory};
