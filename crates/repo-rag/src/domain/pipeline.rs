use std::fmt;

use serde::{Deserialize, Serialize};

/// Steps of one question/answer run. The path is linear; `Failed` can follow any
/// non-terminal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    ResolvingProvider,
    Fetching,
    Chunking,
    Indexing,
    Retrieving,
    Generating,
    Done,
    Failed,
}

impl PipelineStage {
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::ResolvingProvider),
            Self::ResolvingProvider => Some(Self::Fetching),
            Self::Fetching => Some(Self::Chunking),
            Self::Chunking => Some(Self::Indexing),
            Self::Indexing => Some(Self::Retrieving),
            Self::Retrieving => Some(Self::Generating),
            Self::Generating => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingProvider => "resolving_provider",
            Self::Fetching => "fetching",
            Self::Chunking => "chunking",
            Self::Indexing => "indexing",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of the stages a run has passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTrace {
    stages: Vec<PipelineStage>,
    failed_at: Option<PipelineStage>,
}

impl Default for PipelineTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineTrace {
    pub fn new() -> Self {
        Self {
            stages: vec![PipelineStage::Idle],
            failed_at: None,
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(PipelineStage::Idle)
    }

    /// Moves to the next stage on the linear path. Terminal stages stay put.
    pub fn advance(&mut self) -> PipelineStage {
        if let Some(next) = self.current().next() {
            self.stages.push(next);
        }
        self.current()
    }

    /// Marks the current stage as the one that failed.
    pub fn fail(&mut self) {
        let current = self.current();
        if current.is_terminal() {
            return;
        }
        self.failed_at = Some(current);
        self.stages.push(PipelineStage::Failed);
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub const fn failed_at(&self) -> Option<PipelineStage> {
        self.failed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn advances_along_the_linear_path() {
        let mut trace = PipelineTrace::new();
        while !trace.current().is_terminal() {
            trace.advance();
        }
        assert_eq!(
            trace.stages(),
            [
                PipelineStage::Idle,
                PipelineStage::ResolvingProvider,
                PipelineStage::Fetching,
                PipelineStage::Chunking,
                PipelineStage::Indexing,
                PipelineStage::Retrieving,
                PipelineStage::Generating,
                PipelineStage::Done,
            ]
        );
        assert_eq!(trace.advance(), PipelineStage::Done);
    }

    #[test]
    fn failure_records_the_failing_stage() {
        let mut trace = PipelineTrace::new();
        trace.advance();
        trace.advance();
        trace.fail();
        assert_eq!(trace.current(), PipelineStage::Failed);
        assert_eq!(trace.failed_at(), Some(PipelineStage::Fetching));

        trace.fail();
        trace.advance();
        assert_eq!(trace.stages().len(), 4);
    }
}
