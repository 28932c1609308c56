use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the five fixed phases of the backend ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Crawling,
    Processing,
    GeneratingEmbeddings,
    Storing,
    Completed,
}

impl StageName {
    /// Pipeline order.
    pub const ALL: [StageName; 5] = [
        StageName::Crawling,
        StageName::Processing,
        StageName::GeneratingEmbeddings,
        StageName::Storing,
        StageName::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StageName::Crawling => "Crawling Data",
            StageName::Processing => "Processing Content",
            StageName::GeneratingEmbeddings => "Generating Embeddings",
            StageName::Storing => "Storing Data",
            StageName::Completed => "Completed",
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            StageName::Crawling => "crawling",
            StageName::Processing => "processing",
            StageName::GeneratingEmbeddings => "generating_embeddings",
            StageName::Storing => "storing",
            StageName::Completed => "completed",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Tri-state stage status. The derived ordering is the only legal direction
/// of travel: `Pending < Active < Completed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Pending => f.write_str("pending"),
            StageStatus::Active => f.write_str("active"),
            StageStatus::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageState {
    pub status: StageStatus,
    /// Percentage, 0..=100.
    pub progress: u8,
    #[serde(default)]
    pub message: String,
}

impl StageState {
    pub fn new(status: StageStatus, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            progress,
            message: message.into(),
        }
    }

    pub fn pending() -> Self {
        Self::default()
    }
}

/// All five stage records. Every field is required on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageStates {
    pub crawling: StageState,
    pub processing: StageState,
    pub generating_embeddings: StageState,
    pub storing: StageState,
    pub completed: StageState,
}

impl StageStates {
    pub fn get(&self, stage: StageName) -> &StageState {
        match stage {
            StageName::Crawling => &self.crawling,
            StageName::Processing => &self.processing,
            StageName::GeneratingEmbeddings => &self.generating_embeddings,
            StageName::Storing => &self.storing,
            StageName::Completed => &self.completed,
        }
    }

    pub fn get_mut(&mut self, stage: StageName) -> &mut StageState {
        match stage {
            StageName::Crawling => &mut self.crawling,
            StageName::Processing => &mut self.processing,
            StageName::GeneratingEmbeddings => &mut self.generating_embeddings,
            StageName::Storing => &mut self.storing,
            StageName::Completed => &mut self.completed,
        }
    }

    /// Stage records in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (StageName, &StageState)> {
        StageName::ALL.into_iter().map(move |stage| (stage, self.get(stage)))
    }
}
