//! Chunked multi-call generation pipelines.
//!
//! Both pipelines share one shape: normalize the input, split it into chunks,
//! then for each chunk pick a credential, call the model and extract a
//! structured result. A failed chunk is recorded and skipped; it never aborts
//! the job. Chunks are processed strictly in order.

mod dialogue;
mod topics;

pub use dialogue::{Dialogue, DialogueConfig, DialoguePipeline, DialogueTurn, DEFAULT_SPEAKER};
pub use topics::{TopicConfig, TopicPipeline};

use crate::error::LecternError;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Why a chunk contributed nothing to the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("model call failed: {0}")]
    Model(String),

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("unparseable response: {0}")]
    Parse(String),

    #[error("response was not a list")]
    NotASequence,

    #[error("entry {position} of the response is not an object")]
    MalformedEntry { position: usize },
}

impl From<LecternError> for SkipReason {
    fn from(err: LecternError) -> Self {
        match err {
            LecternError::Timeout(secs) => SkipReason::Timeout(secs),
            LecternError::Parse(msg) => SkipReason::Parse(msg),
            other => SkipReason::Model(other.to_string()),
        }
    }
}

/// What happened to one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// The chunk produced `items` result entries.
    Completed { index: usize, items: usize },
    Skipped { index: usize, reason: SkipReason },
}

impl ChunkOutcome {
    pub fn index(&self) -> usize {
        match self {
            ChunkOutcome::Completed { index, .. } | ChunkOutcome::Skipped { index, .. } => *index,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ChunkOutcome::Skipped { .. })
    }
}

/// Aggregated output plus a per-chunk account of how it was produced.
#[derive(Debug, Clone)]
pub struct PipelineReport<T> {
    pub output: T,
    pub outcomes: Vec<ChunkOutcome>,
}

impl<T> PipelineReport<T> {
    pub fn chunk_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_skipped()).count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (usize, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            ChunkOutcome::Skipped { index, reason } => Some((*index, reason)),
            ChunkOutcome::Completed { .. } => None,
        })
    }
}

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Normalizing,
    Chunking,
    ProcessingChunk { index: usize, total: usize },
    Aggregating,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Idle => write!(f, "idle"),
            PipelineStage::Normalizing => write!(f, "normalizing"),
            PipelineStage::Chunking => write!(f, "chunking"),
            PipelineStage::ProcessingChunk { index, total } => {
                write!(f, "processing chunk {}/{}", index + 1, total)
            }
            PipelineStage::Aggregating => write!(f, "aggregating"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

/// Tracks stage transitions for one run.
#[derive(Debug)]
pub(crate) struct StageTracker {
    pipeline: &'static str,
    stage: PipelineStage,
}

impl StageTracker {
    pub(crate) fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            stage: PipelineStage::Idle,
        }
    }

    pub(crate) fn advance(&mut self, next: PipelineStage) {
        debug!("{} pipeline: {} -> {}", self.pipeline, self.stage, next);
        self.stage = next;
    }

    #[cfg(test)]
    pub(crate) fn stage(&self) -> PipelineStage {
        self.stage
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_from_error() {
        assert_eq!(
            SkipReason::from(LecternError::Timeout(5)),
            SkipReason::Timeout(5)
        );
        assert!(matches!(
            SkipReason::from(LecternError::Parse("x".into())),
            SkipReason::Parse(_)
        ));
        assert!(matches!(
            SkipReason::from(LecternError::Model("quota".into())),
            SkipReason::Model(msg) if msg.contains("quota")
        ));
    }

    #[test]
    fn test_report_counts() {
        let report = PipelineReport {
            output: (),
            outcomes: vec![
                ChunkOutcome::Completed { index: 0, items: 4 },
                ChunkOutcome::Skipped {
                    index: 1,
                    reason: SkipReason::NotASequence,
                },
                ChunkOutcome::Completed { index: 2, items: 1 },
            ],
        };
        assert_eq!(report.chunk_count(), 3);
        assert_eq!(report.completed(), 2);
        assert_eq!(report.outcomes[2].index(), 2);
        let skipped: Vec<usize> = report.skipped().map(|(i, _)| i).collect();
        assert_eq!(skipped, vec![1]);
    }

    #[test]
    fn test_stage_tracker() {
        let mut tracker = StageTracker::new("test");
        assert_eq!(tracker.stage(), PipelineStage::Idle);
        tracker.advance(PipelineStage::ProcessingChunk { index: 0, total: 2 });
        assert_eq!(
            tracker.stage().to_string(),
            "processing chunk 1/2"
        );
    }
}
