use serde::{Deserialize, Serialize};

use super::{CollectionSpec, EmergencyService, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardStatus {
    Safe,
    HazardDetected,
}

/// Result of a road-hazard analysis. Every field but `status` is null when
/// the footage is safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardDetection {
    pub status: HazardStatus,
    #[serde(default)]
    pub emergency_services_required: Option<Vec<EmergencyService>>,
    #[serde(default)]
    pub traffic_condition: Option<String>,
    #[serde(default)]
    pub danger_level: Option<String>,
    #[serde(default)]
    pub detected_hazards: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl HazardDetection {
    pub fn safe() -> Self {
        Self {
            status: HazardStatus::Safe,
            emergency_services_required: None,
            traffic_condition: None,
            danger_level: None,
            detected_hazards: None,
            location: None,
            additional_notes: None,
        }
    }

    pub fn is_safe(&self) -> bool {
        self.status == HazardStatus::Safe
    }
}

impl Resource for HazardDetection {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "hazarddetectionresponses",
        date_fields: &[],
    };
    const DELETED: &'static str = "Hazard response deleted successfully";
}
