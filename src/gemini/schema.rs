//! Output schemas and prompts handed to the model, plus the validation of
//! what comes back.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::AnalyzerError;
use crate::models::{EmergencyService, HazardDetection, IncidentReport};

pub const HAZARD_SYSTEM_INSTRUCTION: &str = "You are an ai that does hazard detection on the roads";
pub const HAZARD_PROMPT: &str = "Identify if any hazard in the video.";

pub const REPORT_SYSTEM_INSTRUCTION: &str = "You are an ai that verifies citizen reports of road \
incidents. Compare the photo with the reporter's description and classify the incident.";

pub const REPORT_STATUSES: [&str; 3] = ["verified", "needs_review", "rejected"];

fn emergency_services_schema(description: &str) -> Value {
    let services: Vec<&str> = EmergencyService::ALL.iter().map(|s| s.as_str()).collect();
    json!({
        "type": "ARRAY",
        "description": description,
        "items": { "type": "STRING", "enum": services },
        "nullable": true
    })
}

fn nullable_string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description, "nullable": true })
}

pub fn hazard_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "description": "Hazard detection results from video analysis for emergency and safety services.",
        "properties": {
            "status": {
                "type": "STRING",
                "description": "Overall status: 'safe' if no hazard is detected, otherwise 'hazard_detected'.",
                "enum": ["safe", "hazard_detected"]
            },
            "emergencyServicesRequired": emergency_services_schema(
                "List of emergency services required based on detected hazards (e.g. police, ambulance, fire brigade). Null if safe."
            ),
            "trafficCondition": nullable_string(
                "Current traffic condition near the detected hazard (e.g. clear, moderate, heavy, blocked). Null if safe."
            ),
            "dangerLevel": nullable_string(
                "Level of danger or emergency: low, moderate, high, critical. Null if safe."
            ),
            "detectedHazards": {
                "type": "ARRAY",
                "description": "List of hazards detected in the video (e.g. accident, fire, flood, fallen tree, vehicle breakdown). Null if safe.",
                "items": { "type": "STRING" },
                "nullable": true
            },
            "location": nullable_string(
                "Detected or provided location of the hazard (if available). Null if safe."
            ),
            "additionalNotes": nullable_string(
                "Any other relevant analysis notes or recommendations from AI. Null if safe."
            )
        },
        "required": ["status"]
    })
}

pub fn report_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "description": "Structured incident report built from a citizen's photo and description.",
        "properties": {
            "status": {
                "type": "STRING",
                "description": "'verified' if the photo supports the report, 'needs_review' if unclear, 'rejected' if it contradicts it.",
                "enum": REPORT_STATUSES
            },
            "title": nullable_string("Short title for the incident."),
            "description": nullable_string("Description of the incident combining the photo and the reporter's text."),
            "phone": nullable_string("Reporter phone number, as provided."),
            "location": nullable_string("Incident location, as provided or recognised in the photo."),
            "category": nullable_string("Incident category, e.g. accident, pothole, flooding, fallen tree, fire."),
            "dangerLevel": {
                "type": "STRING",
                "description": "Level of danger: low, moderate, high, critical."
            },
            "hazards": {
                "type": "ARRAY",
                "description": "Hazards visible in the photo.",
                "items": { "type": "STRING" },
                "nullable": true
            },
            "emergencyServicesRequired": emergency_services_schema(
                "Emergency services that should respond. Null if none."
            ),
            "additionalNotes": nullable_string("Any other relevant notes or recommendations.")
        },
        "required": ["status", "dangerLevel"]
    })
}

pub fn report_prompt(title: &str, description: &str, phone: &str, location: &str) -> String {
    format!(
        "Analyze this photo submitted with a road incident report.\n\
         Title: {title}\n\
         Description: {description}\n\
         Reporter phone: {phone}\n\
         Location: {location}\n\
         Keep the reporter's phone and location unless the photo clearly shows otherwise."
    )
}

/// Strips a markdown code fence some models wrap around JSON output.
pub fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn parse_as<T: DeserializeOwned>(text: &str) -> Result<T, AnalyzerError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| AnalyzerError::Malformed(e.to_string()))
}

pub fn parse_hazard_response(text: &str) -> Result<HazardDetection, AnalyzerError> {
    parse_as(text)
}

/// Reports additionally need a status, which storage alone doesn't demand.
pub fn parse_report_response(text: &str) -> Result<IncidentReport, AnalyzerError> {
    let report: IncidentReport = parse_as(text)?;
    if report.status.is_none() {
        return Err(AnalyzerError::Malformed("missing field `status`".to_string()));
    }
    Ok(report)
}
