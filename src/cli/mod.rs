use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use trialrank::collab::FixtureCollaborators;
use trialrank::rank::{RankedEntry, Ranker};
use trialrank::rerank::{FeedbackEvent, FeedbackReranker, Polarity, Reranker, SimilarityMatrix};
use trialrank::search::{Collaborators, SearchSession};
use trialrank::Config;

mod render;

/// Rank and rerank clinical-trial search results
#[derive(Parser, Debug)]
#[command(name = "trialrank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.trialrank/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fuse retrieval hits of the original, translated and expanded queries
    Rank {
        /// JSON array of [docno, score] hits for the original query
        #[arg(long)]
        original: PathBuf,

        /// Hits for the translated query
        #[arg(long)]
        translated: PathBuf,

        /// Hits for the expanded query
        #[arg(long)]
        expanded: Option<PathBuf>,

        /// Documents guaranteed from each list
        #[arg(long)]
        topn: Option<usize>,

        /// Maximum documents in the fused list
        #[arg(long)]
        nmax: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Rerank a ranked list after feedback on one document
    Rerank {
        /// JSON array of ranked entries
        #[arg(long)]
        ranked: PathBuf,

        /// Similarity matrix: {"docnos": [...], "values": [[...]]}
        #[arg(long)]
        matrix: PathBuf,

        /// Document the feedback is about
        #[arg(long)]
        docno: String,

        /// Feedback polarity: + or -
        #[arg(long, allow_hyphen_values = true)]
        polarity: Polarity,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a search session against fixture collaborators
    Session {
        /// JSON fixture with hits, translations, expansions and similarities
        #[arg(long)]
        fixture: PathBuf,

        /// Search query
        #[arg(long)]
        query: String,

        /// Feedback to apply in order: DOCNO:+, DOCNO:- or DOCNO:0 to clear
        #[arg(long, allow_hyphen_values = true)]
        feedback: Vec<FeedbackArg>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

/// `DOCNO:+`, `DOCNO:-` or `DOCNO:0`
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackArg {
    pub docno: String,
    pub polarity: Option<Polarity>,
}

impl FromStr for FeedbackArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (docno, sign) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected DOCNO:+|-|0, got '{s}'"))?;
        if docno.is_empty() {
            return Err(format!("missing docno in '{s}'"));
        }
        let polarity = match sign {
            "0" => None,
            other => Some(other.parse::<Polarity>().map_err(|e| e.to_string())?),
        };
        Ok(Self {
            docno: docno.to_string(),
            polarity,
        })
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Rank {
            original,
            translated,
            expanded,
            topn,
            nmax,
            json,
        } => {
            let mut config = config;
            if let Some(topn) = topn {
                config.ranking.topn = topn;
            }
            if let Some(nmax) = nmax {
                config.ranking.nmax = nmax;
            }

            let ranker = Ranker::new(&config)?;
            let expanded = match expanded {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let ranked = ranker.rank(read_json(&original)?, read_json(&translated)?, expanded)?;

            if json {
                render::print_json(&ranked)
            } else {
                render::print_ranked("Ranked Trials", &ranked);
                Ok(())
            }
        }
        Commands::Rerank {
            ranked,
            matrix,
            docno,
            polarity,
            json,
        } => {
            let ranked: Vec<RankedEntry> = read_json(&ranked)?;
            let matrix: SimilarityMatrix = read_json(&matrix)?;
            let feedback = FeedbackEvent::new(docno, polarity);

            let reranked = FeedbackReranker::new().rerank(&ranked, &feedback, &matrix)?;

            if json {
                render::print_json(&reranked)
            } else {
                let title = format!("Reranked after {} on {}", feedback.polarity, feedback.docno);
                render::print_ranked(&title, &reranked);
                Ok(())
            }
        }
        Commands::Session {
            fixture,
            query,
            feedback,
            json,
        } => {
            let fixture = FixtureCollaborators::from_path(&fixture)?;
            let mut session = SearchSession::new(&config, Collaborators::from_fixture(fixture))?;
            info!("Session {} started", session.history().id());

            let outcome = session.search(&query).await?;
            for arg in feedback {
                session.feedback(&arg.docno, arg.polarity).await?;
            }

            if json {
                render::print_json(session.history())
            } else {
                render::print_outcome(&outcome);
                render::print_history(session.history());
                Ok(())
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_path(path),
        None => Config::load(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| anyhow!("Invalid JSON in {}: {}", path.display(), e))
}
