pub mod hazard;
pub mod local_alert;
pub mod report;

pub use hazard::{HazardDetection, HazardStatus};
pub use local_alert::LocalAlert;
pub use report::IncidentReport;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Where a resource lives in the document store.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub name: &'static str,
    /// Top-level fields kept as native dates in the store so range queries
    /// compare instants rather than strings.
    pub date_fields: &'static [&'static str],
}

/// A document kind exposed through the CRUD surface.
///
/// Deserializing into the implementing type is the schema validation step:
/// a body that doesn't fit the type is rejected before it reaches the store.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: CollectionSpec;
    const NOT_FOUND: &'static str = "Not found";
    const DELETED: &'static str;
}

/// A document as the store returns it: the model plus its identity and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub document: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyService {
    Police,
    Ambulance,
    FireBrigade,
    TrafficControl,
    HazmatTeam,
    RescueTeam,
    Others,
}

impl EmergencyService {
    pub const ALL: [EmergencyService; 7] = [
        EmergencyService::Police,
        EmergencyService::Ambulance,
        EmergencyService::FireBrigade,
        EmergencyService::TrafficControl,
        EmergencyService::HazmatTeam,
        EmergencyService::RescueTeam,
        EmergencyService::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyService::Police => "police",
            EmergencyService::Ambulance => "ambulance",
            EmergencyService::FireBrigade => "fire_brigade",
            EmergencyService::TrafficControl => "traffic_control",
            EmergencyService::HazmatTeam => "hazmat_team",
            EmergencyService::RescueTeam => "rescue_team",
            EmergencyService::Others => "others",
        }
    }
}
