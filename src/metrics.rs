use crate::models::HazardStatus;

pub fn increment_detections(status: HazardStatus) {
    let status = match status {
        HazardStatus::Safe => "safe",
        HazardStatus::HazardDetected => "hazard_detected",
    };
    ::metrics::counter!("roadwatch_detections_total", "status" => status).increment(1);
}

pub fn increment_reports() {
    ::metrics::counter!("roadwatch_reports_total").increment(1);
}

pub fn increment_analysis_failures(endpoint: &'static str) {
    ::metrics::counter!("roadwatch_analysis_failures_total", "endpoint" => endpoint).increment(1);
}
