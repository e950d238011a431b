use serde::{Deserialize, Serialize};

use super::{CollectionSpec, EmergencyService, Resource};

/// A citizen incident report, either posted directly or produced by the
/// image analyzer. Nothing is structurally required in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub danger_level: Option<String>,
    #[serde(default)]
    pub hazards: Option<Vec<String>>,
    #[serde(default)]
    pub emergency_services_required: Option<Vec<EmergencyService>>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl Resource for IncidentReport {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "reports",
        date_fields: &[],
    };
    const DELETED: &'static str = "Report deleted successfully";
}
