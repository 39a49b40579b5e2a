//! ThreatClassifier - severity classification for sensor readings
//!
//! ## Responsibilities
//!
//! - Map a raw (sensor, value) pair to a severity tier
//! - Produce the alert record (title/message templates) for that tier
//!
//! Thresholds (inclusive upper bound on the lower tier):
//!
//! - temperature: <=30 safe, <=45 warning, above critical
//! - humidity:    <=60 safe, <=85 warning, above critical
//! - gas:         <=800 safe, <=1200 warning, above critical
//! - water level: >=50 safe, >=20 warning, below critical (distance to
//!   water, so lower means worse)
//!
//! Camera readings are assessed by the detector, not a threshold table;
//! [`camera_alert`] builds their alert from the detector verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence bar above which a learned-model detection counts as a hazard.
pub const CAMERA_SCORE_CRITICAL: f64 = 0.7;

/// Sensor kinds the system ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Gas,
    WaterLevel,
    Camera,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Gas => "gas",
            SensorKind::WaterLevel => "water_level",
            SensorKind::Camera => "camera",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tiers, ordered safe < warning < critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    Warning,
    Critical,
}

impl Severity {
    pub fn is_safe(&self) -> bool {
        matches!(self, Severity::Safe)
    }
}

/// One classified reading. `id` is assigned by the alert store on record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub sensor: SensorKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

fn alert(
    sensor: SensorKind,
    severity: Severity,
    title: &str,
    message: String,
    value: f64,
) -> Alert {
    Alert {
        id: 0,
        sensor,
        severity,
        title: title.to_string(),
        message,
        value,
        timestamp: Utc::now(),
        acknowledged: false,
    }
}

/// Classify a reading. Total over all finite inputs; the HTTP boundary
/// rejects non-finite values before they get here.
pub fn classify(sensor: SensorKind, value: f64) -> Alert {
    match sensor {
        SensorKind::Temperature => classify_temperature(value),
        SensorKind::Humidity => classify_humidity(value),
        SensorKind::Gas => classify_gas(value),
        SensorKind::WaterLevel => classify_water_level(value),
        // Camera readings normally arrive pre-assessed via camera_alert; a
        // raw camera value is read as a model confidence score.
        SensorKind::Camera => camera_alert(value > CAMERA_SCORE_CRITICAL, value),
    }
}

fn classify_temperature(temp_c: f64) -> Alert {
    if temp_c <= 30.0 {
        alert(
            SensorKind::Temperature,
            Severity::Safe,
            "Temperature Normal",
            format!("Temperature at {temp_c:.1} C -- safe range."),
            temp_c,
        )
    } else if temp_c <= 45.0 {
        alert(
            SensorKind::Temperature,
            Severity::Warning,
            "High Temperature",
            format!("Temperature elevated ({temp_c:.1} C). Heat advisory."),
            temp_c,
        )
    } else {
        alert(
            SensorKind::Temperature,
            Severity::Critical,
            "EXTREME HEAT ALERT",
            format!("Temperature critically high ({temp_c:.1} C)! Possible fire!"),
            temp_c,
        )
    }
}

fn classify_humidity(humidity_pct: f64) -> Alert {
    if humidity_pct <= 60.0 {
        alert(
            SensorKind::Humidity,
            Severity::Safe,
            "Humidity Normal",
            format!("Humidity at {humidity_pct:.1}% -- comfortable."),
            humidity_pct,
        )
    } else if humidity_pct <= 85.0 {
        alert(
            SensorKind::Humidity,
            Severity::Warning,
            "Humidity Advisory",
            format!("Humidity elevated ({humidity_pct:.1}%). Monitor conditions."),
            humidity_pct,
        )
    } else {
        alert(
            SensorKind::Humidity,
            Severity::Critical,
            "HUMIDITY CRITICAL",
            format!("Humidity at {humidity_pct:.1}% -- extreme conditions!"),
            humidity_pct,
        )
    }
}

fn classify_gas(ppm: f64) -> Alert {
    if ppm <= 800.0 {
        alert(
            SensorKind::Gas,
            Severity::Safe,
            "Air Quality Normal",
            format!("Gas level at {ppm:.0} ppm -- no hazard."),
            ppm,
        )
    } else if ppm <= 1200.0 {
        alert(
            SensorKind::Gas,
            Severity::Warning,
            "Gas Detected -- Monitor",
            format!("Elevated gas reading ({ppm:.0} ppm). Monitor area."),
            ppm,
        )
    } else {
        alert(
            SensorKind::Gas,
            Severity::Critical,
            "SMOKE / GAS ALERT",
            format!("Dangerous gas ({ppm:.0} ppm). Evacuate immediately!"),
            ppm,
        )
    }
}

// The ultrasonic sensor reports distance down to the water surface, so the
// scale is inverted: small distance = high water.
fn classify_water_level(distance_cm: f64) -> Alert {
    if distance_cm >= 50.0 {
        alert(
            SensorKind::WaterLevel,
            Severity::Safe,
            "Water Level Safe",
            format!("Water at safe distance ({distance_cm:.1} cm)."),
            distance_cm,
        )
    } else if distance_cm >= 20.0 {
        alert(
            SensorKind::WaterLevel,
            Severity::Warning,
            "Rising Water Level",
            format!("Water level rising ({distance_cm:.1} cm). Monitor closely."),
            distance_cm,
        )
    } else {
        alert(
            SensorKind::WaterLevel,
            Severity::Critical,
            "FLOOD WARNING -- EVACUATE",
            format!("Critical water level ({distance_cm:.1} cm)! Flash flood imminent!"),
            distance_cm,
        )
    }
}

/// Build the alert for one camera cycle from the detector verdict.
///
/// The camera path is binary: a hazardous frame is critical, anything else
/// is a safe state update. `score` is the model confidence or the flame
/// pixel ratio, depending on which detector is installed.
pub fn camera_alert(hazardous: bool, score: f64) -> Alert {
    if hazardous {
        alert(
            SensorKind::Camera,
            Severity::Critical,
            "CAMERA HAZARD DETECTED",
            format!("Visual hazard on camera feed (score {score:.2})! Inspect area immediately!"),
            score,
        )
    } else {
        alert(
            SensorKind::Camera,
            Severity::Safe,
            "Camera Feed Normal",
            format!("No visual hazard detected (score {score:.2})."),
            score,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_boundaries() {
        assert_eq!(classify(SensorKind::Temperature, 20.0).severity, Severity::Safe);
        assert_eq!(classify(SensorKind::Temperature, 30.0).severity, Severity::Safe);
        assert_eq!(classify(SensorKind::Temperature, 30.01).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Temperature, 45.0).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Temperature, 45.01).severity, Severity::Critical);
    }

    #[test]
    fn humidity_boundaries() {
        assert_eq!(classify(SensorKind::Humidity, 60.0).severity, Severity::Safe);
        assert_eq!(classify(SensorKind::Humidity, 60.5).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Humidity, 85.0).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Humidity, 85.1).severity, Severity::Critical);
    }

    #[test]
    fn gas_boundaries() {
        assert_eq!(classify(SensorKind::Gas, 800.0).severity, Severity::Safe);
        assert_eq!(classify(SensorKind::Gas, 900.0).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Gas, 1200.0).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::Gas, 1500.0).severity, Severity::Critical);
    }

    #[test]
    fn water_level_scale_is_inverted() {
        assert_eq!(classify(SensorKind::WaterLevel, 50.0).severity, Severity::Safe);
        assert_eq!(classify(SensorKind::WaterLevel, 49.9).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::WaterLevel, 20.0).severity, Severity::Warning);
        assert_eq!(classify(SensorKind::WaterLevel, 19.9).severity, Severity::Critical);
    }

    #[test]
    fn severity_tiers_are_ordered() {
        assert!(Severity::Safe < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn camera_alert_maps_verdict_to_severity() {
        let hazard = camera_alert(true, 0.92);
        assert_eq!(hazard.sensor, SensorKind::Camera);
        assert_eq!(hazard.severity, Severity::Critical);

        let clear = camera_alert(false, 0.12);
        assert_eq!(clear.severity, Severity::Safe);
        assert!(!clear.acknowledged);
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify(SensorKind::Gas, 950.0);
        let b = classify(SensorKind::Gas, 950.0);
        assert_eq!(a.severity, b.severity);
        assert_eq!(a.title, b.title);
        assert_eq!(a.message, b.message);
    }
}
