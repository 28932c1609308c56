use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ClientError, StageName, StageStates};

/// Opaque server-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One server-pushed snapshot of the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub states: StageStates,
    #[serde(alias = "currentState")]
    pub current_state: StageName,
    #[serde(alias = "isComplete")]
    pub is_complete: bool,
}

impl IngestionStatus {
    pub fn stage(&self, stage: StageName) -> &crate::StageState {
        self.states.get(stage)
    }
}

/// Decodes one progress payload.
///
/// Structural problems (missing `states`, unknown stage names, wrong types)
/// and out-of-range percentages are both reported as
/// [`ClientError::Protocol`].
pub fn decode_snapshot(payload: &str) -> Result<IngestionStatus, ClientError> {
    let status: IngestionStatus = serde_json::from_str(payload)
        .map_err(|err| ClientError::Protocol(format!("undecodable snapshot: {err}")))?;
    for (stage, state) in status.states.iter() {
        if state.progress > 100 {
            return Err(ClientError::Protocol(format!(
                "stage {stage} reports progress {}%",
                state.progress
            )));
        }
    }
    Ok(status)
}
