use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{CollectionSpec, Resource};

/// A scheduled community alert. Beyond the well-known fields, callers may
/// attach any extra content and it is stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAlert {
    #[serde(deserialize_with = "date_or_datetime")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocalAlert {
    pub const DATE_FIELD: &'static str = "date";
}

/// Accepts a full timestamp or a bare `YYYY-MM-DD`, read as midnight UTC.
fn date_or_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(date) = raw.parse::<DateTime<Utc>>() {
        return Ok(date);
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
}

impl Resource for LocalAlert {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "localalerts",
        date_fields: &[LocalAlert::DATE_FIELD],
    };
    const NOT_FOUND: &'static str = "Local alert not found";
    const DELETED: &'static str = "Deleted successfully";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_is_required() {
        assert!(serde_json::from_value::<LocalAlert>(json!({ "title": "Road closure" })).is_err());
    }

    #[test]
    fn date_only_values_are_midnight_utc() {
        let alert: LocalAlert = serde_json::from_value(json!({ "date": "2026-11-01" })).unwrap();
        assert_eq!(alert.date.to_rfc3339(), "2026-11-01T00:00:00+00:00");

        assert!(serde_json::from_value::<LocalAlert>(json!({ "date": "next tuesday" })).is_err());
        assert!(serde_json::from_value::<LocalAlert>(json!({ "date": 20261101 })).is_err());
    }

    #[test]
    fn keeps_arbitrary_content() {
        let alert: LocalAlert = serde_json::from_value(json!({
            "date": "2026-11-01T09:00:00+05:30",
            "title": "Marathon",
            "roads": ["MG Road", "Ring Road"],
            "organizer": { "name": "City Council" }
        }))
        .unwrap();

        assert_eq!(alert.date.to_rfc3339(), "2026-11-01T03:30:00+00:00");
        assert_eq!(alert.extra["roads"], json!(["MG Road", "Ring Road"]));

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["organizer"]["name"], "City Council");
        assert_eq!(value["title"], "Marathon");
    }
}
