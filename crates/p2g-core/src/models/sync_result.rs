//! Per-run sync result model

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    /// Fetch the latest workouts from the source platform
    Download,
    /// Turn downloaded workouts into upload-ready files
    Convert,
    /// Push converted files to the destination platform
    Upload,
}

impl SyncStage {
    /// All stages in the order the pipeline runs them.
    pub const ALL: [Self; 3] = [Self::Download, Self::Convert, Self::Upload];

    /// Caller-facing message for a failed stage. Causes stay in the log.
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Download => "Failed to download workouts. Check logs for more details.",
            Self::Convert => "Failed to convert workouts to FIT format. Check logs for more details.",
            Self::Upload => "Failed to upload workouts. Check logs for more details.",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Convert => "convert",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failure entry in a [`SyncResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    /// Stage that failed
    pub stage: SyncStage,
    /// Human-readable description
    pub message: String,
}

impl SyncFailure {
    pub fn for_stage(stage: SyncStage) -> Self {
        Self {
            stage,
            message: stage.failure_message().to_string(),
        }
    }
}

/// Outcome of a single pipeline run.
///
/// Stage flags are tri-state: `Some(true)` succeeded, `Some(false)` failed,
/// `None` was never attempted because an earlier stage failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// True only when every stage succeeded
    pub overall_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_succeeded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert_succeeded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_succeeded: Option<bool>,
    /// Failure entries in the order they occurred
    #[serde(default)]
    pub errors: Vec<SyncFailure>,
}

impl SyncResult {
    /// Fresh result with nothing attempted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome of a stage, `None` when it was not attempted.
    pub const fn stage_outcome(&self, stage: SyncStage) -> Option<bool> {
        match stage {
            SyncStage::Download => self.download_succeeded,
            SyncStage::Convert => self.convert_succeeded,
            SyncStage::Upload => self.upload_succeeded,
        }
    }

    /// The stage that stopped the run, if any.
    pub fn failed_stage(&self) -> Option<SyncStage> {
        SyncStage::ALL
            .into_iter()
            .find(|stage| self.stage_outcome(*stage) == Some(false))
    }

    pub fn all_stages_succeeded(&self) -> bool {
        SyncStage::ALL
            .into_iter()
            .all(|stage| self.stage_outcome(stage) == Some(true))
    }

    pub(crate) fn mark_succeeded(&mut self, stage: SyncStage) {
        *self.stage_slot(stage) = Some(true);
    }

    pub(crate) fn mark_failed(&mut self, stage: SyncStage) {
        *self.stage_slot(stage) = Some(false);
        self.overall_success = false;
        self.errors.push(SyncFailure::for_stage(stage));
    }

    pub(crate) fn finish(&mut self) {
        self.overall_success = self.all_stages_succeeded();
    }

    fn stage_slot(&mut self, stage: SyncStage) -> &mut Option<bool> {
        match stage {
            SyncStage::Download => &mut self.download_succeeded,
            SyncStage::Convert => &mut self.convert_succeeded,
            SyncStage::Upload => &mut self.upload_succeeded,
        }
    }
}
