use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::HazardDetection;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestDetectionEntry {
    pub result: HazardDetection,
    pub detected_at: DateTime<Utc>,
}

/// Holds at most one value: the last validated `/api/detect` result.
///
/// Reads and writes are individually atomic, but concurrent detections race:
/// whichever finishes last wins, regardless of which request arrived first.
/// Process-local, so it starts empty after a restart and is not shared
/// between instances.
#[derive(Debug, Default)]
pub struct LatestDetection {
    slot: RwLock<Option<LatestDetectionEntry>>,
}

impl LatestDetection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: HazardDetection) {
        let entry = LatestDetectionEntry {
            result,
            detected_at: Utc::now(),
        };
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(entry);
    }

    pub fn get(&self) -> Option<LatestDetectionEntry> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
