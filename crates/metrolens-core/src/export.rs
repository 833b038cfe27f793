//! Measurement export.
//!
//! Builds the JSON analysis document from a session: metadata, a calibration
//! summary, and every finalized record. Rounding is applied uniformly at
//! export time — records keep full precision internally — using the field
//! conventions of the document format: `*_mm` to 4 decimals, `*_px` to 2,
//! `*_deg` to 2, the calibration factor to 6, point coordinates to 1.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::measurement::MeasurementRecord;
use crate::session::Session;
use crate::Point;

/// Error types for measurement export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A required input was missing or invalid; nothing was written.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure while writing the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// User-supplied inputs required before exporting.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Analysis name; must not be blank.
    pub analysis_name: String,
    /// Expected real diameter of the measured subject, in mm; must be a
    /// positive number.
    pub expected_real_diameter_mm: f64,
    /// Timestamp recorded in the document metadata.
    pub timestamp: DateTime<Utc>,
}

impl ExportRequest {
    /// Request stamped with the current time.
    pub fn new(analysis_name: impl Into<String>, expected_real_diameter_mm: f64) -> Self {
        Self {
            analysis_name: analysis_name.into(),
            expected_real_diameter_mm,
            timestamp: Utc::now(),
        }
    }

    /// Override the timestamp, for deterministic output.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Document header describing the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportMetadata {
    pub source_image_name: String,
    pub analysis_name: String,
    pub analysis_timestamp_iso: String,
    pub expected_real_diameter_mm: f64,
}

/// Calibration summary section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportCalibration {
    pub calibrated: bool,
    /// Rounded factor, or null when uncalibrated.
    pub pixels_per_mm: Option<f64>,
    /// The calibration point pair, empty when uncalibrated.
    pub calibration_points: Vec<Point>,
}

/// The complete analysis document, rounded and ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub calibration: ExportCalibration,
    pub measurements: Vec<MeasurementRecord>,
}

impl ExportDocument {
    /// Validate the request and assemble the rounded document.
    ///
    /// Fails with [`ExportError::MissingRequiredField`] — before anything is
    /// serialized or written — when the analysis name is blank or the
    /// expected diameter is not a positive number.
    pub fn build(session: &Session, request: &ExportRequest) -> Result<Self, ExportError> {
        let name = request.analysis_name.trim();
        if name.is_empty() {
            return Err(ExportError::MissingRequiredField("analysis_name"));
        }
        if !request.expected_real_diameter_mm.is_finite()
            || request.expected_real_diameter_mm <= 0.0
        {
            return Err(ExportError::MissingRequiredField("expected_real_diameter_mm"));
        }

        let calibration = session.calibration();
        Ok(Self {
            metadata: ExportMetadata {
                source_image_name: session.image().name.clone(),
                analysis_name: name.to_string(),
                analysis_timestamp_iso: request.timestamp.to_rfc3339(),
                expected_real_diameter_mm: request.expected_real_diameter_mm,
            },
            calibration: ExportCalibration {
                calibrated: calibration.is_done(),
                pixels_per_mm: calibration
                    .is_done()
                    .then(|| round_to(calibration.factor(), 6)),
                calibration_points: calibration
                    .points()
                    .map(|points| points.iter().copied().map(round_point).collect())
                    .unwrap_or_default(),
            },
            measurements: session.records().iter().map(rounded_record).collect(),
        })
    }

    /// Pretty-printed JSON text of the document.
    pub fn to_json_string(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to `path`.
    ///
    /// All validation happened at build time, so a failure here is strictly
    /// serialization or I/O.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Round to a fixed number of decimal places.
fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

fn round_point(p: Point) -> Point {
    Point::new(round_to(p.x, 1), round_to(p.y, 1))
}

fn round_list(values: &[f64], decimals: u32) -> Vec<f64> {
    values.iter().map(|v| round_to(*v, decimals)).collect()
}

/// Apply the per-field rounding rules to a record copy.
fn rounded_record(record: &MeasurementRecord) -> MeasurementRecord {
    match record.clone() {
        MeasurementRecord::Calibration {
            points,
            distance_px,
            real_value_mm,
            calibration_factor,
        } => MeasurementRecord::Calibration {
            points: points.map(round_point),
            distance_px: round_to(distance_px, 2),
            real_value_mm: round_to(real_value_mm, 4),
            calibration_factor: round_to(calibration_factor, 6),
        },
        MeasurementRecord::DotPair {
            points,
            distance_px,
            angle_deg,
            distance_mm,
        } => MeasurementRecord::DotPair {
            points: points.map(round_point),
            distance_px: round_to(distance_px, 2),
            angle_deg: round_to(angle_deg, 2),
            distance_mm: distance_mm.map(|v| round_to(v, 4)),
        },
        MeasurementRecord::Angle { points, angle_deg } => MeasurementRecord::Angle {
            points: points.map(round_point),
            angle_deg: round_to(angle_deg, 2),
        },
        MeasurementRecord::Line {
            points,
            length1_px,
            length2_px,
            angle_deg,
            distances_px,
            avg_dist_px,
            length1_mm,
            length2_mm,
            distances_mm,
            avg_dist_mm,
        } => MeasurementRecord::Line {
            points: points.map(round_point),
            length1_px: round_to(length1_px, 2),
            length2_px: round_to(length2_px, 2),
            angle_deg: round_to(angle_deg, 2),
            distances_px: round_list(&distances_px, 2),
            avg_dist_px: round_to(avg_dist_px, 2),
            length1_mm: length1_mm.map(|v| round_to(v, 4)),
            length2_mm: length2_mm.map(|v| round_to(v, 4)),
            distances_mm: distances_mm.map(|values| round_list(&values, 4)),
            avg_dist_mm: avg_dist_mm.map(|v| round_to(v, 4)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NumberPrompt;
    use crate::session::Mode;
    use crate::{ImageInfo, Session};
    use chrono::TimeZone;

    struct OneShotPrompt(Option<f64>);

    impl NumberPrompt for OneShotPrompt {
        fn ask_number(&mut self, _prompt: &str) -> Option<f64> {
            self.0.take()
        }
    }

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn request() -> ExportRequest {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        ExportRequest::new("left_branch", 4.5).with_timestamp(timestamp)
    }

    /// A session with a calibration (3 px/mm) and one dot pair.
    fn populated_session() -> Session {
        let mut session = Session::new(ImageInfo::new("vessel_scan.png", 640, 480));

        let mut prompt = OneShotPrompt(Some(100.0 / 3.0));
        session.toggle_mode(Mode::Calibration);
        session.handle_click(pt(0.123_456, 0.987_654), &mut prompt);
        session.handle_click(pt(100.123_456, 0.987_654), &mut prompt);

        let mut prompt = OneShotPrompt(None);
        session.toggle_mode(Mode::DotPair);
        session.handle_click(pt(0.0, 0.0), &mut prompt);
        session.handle_click(pt(3.0, 4.0), &mut prompt);

        session
    }

    #[test]
    fn test_missing_name_aborts() {
        let session = populated_session();
        let mut request = request();
        request.analysis_name = "   ".to_string();

        match ExportDocument::build(&session, &request) {
            Err(ExportError::MissingRequiredField(field)) => {
                assert_eq!(field, "analysis_name");
            }
            other => panic!("expected a missing-field error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_diameter_aborts() {
        let session = populated_session();
        for bad in [0.0, -4.5, f64::NAN] {
            let mut request = request();
            request.expected_real_diameter_mm = bad;
            assert!(matches!(
                ExportDocument::build(&session, &request),
                Err(ExportError::MissingRequiredField("expected_real_diameter_mm"))
            ));
        }
    }

    #[test]
    fn test_document_structure() {
        let session = populated_session();
        let doc = ExportDocument::build(&session, &request()).unwrap();

        assert_eq!(doc.metadata.source_image_name, "vessel_scan.png");
        assert_eq!(doc.metadata.analysis_name, "left_branch");
        assert_eq!(doc.metadata.expected_real_diameter_mm, 4.5);
        assert!(doc.metadata.analysis_timestamp_iso.starts_with("2024-03-15T10:30:00"));

        assert!(doc.calibration.calibrated);
        assert_eq!(doc.calibration.pixels_per_mm, Some(3.0));
        // Point coordinates round to one decimal
        assert_eq!(doc.calibration.calibration_points[0], pt(0.1, 1.0));

        // Calibration record plus the dot pair
        assert_eq!(doc.measurements.len(), 2);
    }

    #[test]
    fn test_rounding_rules() {
        let session = populated_session();
        let doc = ExportDocument::build(&session, &request()).unwrap();

        let dot = doc
            .measurements
            .iter()
            .find(|m| matches!(m, MeasurementRecord::DotPair { .. }))
            .unwrap();
        match dot {
            MeasurementRecord::DotPair {
                distance_px,
                angle_deg,
                distance_mm,
                ..
            } => {
                assert_eq!(*distance_px, 5.0);
                // Full precision is 306.869..., export carries two decimals
                assert_eq!(*angle_deg, 306.87);
                // 5 px at 3 px/mm, rounded to four decimals
                assert_eq!(*distance_mm, Some(1.6667));
            }
            other => panic!("expected a dot pair, got {other:?}"),
        }
    }

    #[test]
    fn test_uncalibrated_export_has_null_factor() {
        let session = Session::new(ImageInfo::new("plain.png", 100, 100));
        let doc = ExportDocument::build(&session, &request()).unwrap();

        assert!(!doc.calibration.calibrated);
        assert_eq!(doc.calibration.pixels_per_mm, None);
        assert!(doc.calibration.calibration_points.is_empty());
        assert!(doc.measurements.is_empty());

        // The factor serializes as an explicit null, not an omission
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value["calibration"]["pixels_per_mm"].is_null());
    }

    #[test]
    fn test_json_shape() {
        let session = populated_session();
        let doc = ExportDocument::build(&session, &request()).unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["metadata"]["analysis_name"], "left_branch");
        assert_eq!(value["calibration"]["calibrated"], true);
        // Points serialize as [x, y] pairs
        assert_eq!(value["calibration"]["calibration_points"][0][1], 1.0);
        assert_eq!(value["measurements"][0]["type"], "calibration");
        assert_eq!(value["measurements"][1]["type"], "dot_pair");

        // Pretty output round-trips through serde_json
        let text = doc.to_json_string().unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, value);
    }

    #[test]
    fn test_round_to_decimals() {
        assert_eq!(round_to(306.869_897, 2), 306.87);
        assert_eq!(round_to(1.666_666_6, 4), 1.6667);
        assert_eq!(round_to(10.0, 6), 10.0);
        assert_eq!(round_to(-2.345, 1), -2.3);
    }
}
