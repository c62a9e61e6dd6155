//! Pipeline run state types

use serde::{Deserialize, Serialize};

/// Stage a pipeline run is in
///
/// Runs move forward through the stages in declaration order and never
/// re-enter one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Resolving,
    Building,
    Publishing,
    Exporting,
    Notifying,
    Done,
}

impl PipelineStage {
    /// Stage that follows this one, `None` once done
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Resolving => Some(Self::Building),
            Self::Building => Some(Self::Publishing),
            Self::Publishing => Some(Self::Exporting),
            Self::Exporting => Some(Self::Notifying),
            Self::Notifying => Some(Self::Done),
            Self::Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Building => "building",
            Self::Publishing => "publishing",
            Self::Exporting => "exporting",
            Self::Notifying => "notifying",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that failed, with a human-readable cause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: PipelineStage,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}
