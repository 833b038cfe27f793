//! Pixel-to-real-unit calibration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Point;

/// Error types for calibration operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The entered real-world value was not a positive number.
    #[error("real distance must be a positive number")]
    InvalidInput,

    /// A real-unit conversion was requested before calibrating.
    #[error("no calibration has been performed")]
    NotCalibrated,
}

/// Conversion between pixel distances and real-world units.
///
/// The factor is expressed in pixels per real-world unit (millimeters in the
/// reference tooling). `done` flips to true on the first successful
/// calibration; the two clicked points are retained as the most recent
/// calibration event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    factor: f64,
    done: bool,
    points: Option<[Point; 2]>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            factor: 1.0,
            done: false,
            points: None,
        }
    }
}

impl Calibration {
    /// Create an uncalibrated model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the factor from a measured pixel distance and its real value.
    ///
    /// Fails with [`CalibrationError::InvalidInput`] when `real_value` is not
    /// a finite positive number; the model is left untouched so the caller
    /// can roll back its second point and retry the prompt.
    pub fn calibrate(
        &mut self,
        points: [Point; 2],
        pixel_distance: f64,
        real_value: f64,
    ) -> Result<(), CalibrationError> {
        if !real_value.is_finite() || real_value <= 0.0 {
            return Err(CalibrationError::InvalidInput);
        }

        self.factor = pixel_distance / real_value;
        self.done = true;
        self.points = Some(points);
        Ok(())
    }

    /// Convert a pixel quantity into real-world units.
    pub fn to_real(&self, pixel_value: f64) -> Result<f64, CalibrationError> {
        if !self.done {
            return Err(CalibrationError::NotCalibrated);
        }
        Ok(pixel_value / self.factor)
    }

    /// Whether a calibration has been performed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Pixels per real-world unit. Meaningful only when [`Self::is_done`].
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// The point pair of the most recent calibration event.
    pub fn points(&self) -> Option<[Point; 2]> {
        self.points
    }

    /// Drop the calibration and return to the uncalibrated default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> [Point; 2] {
        [Point::new(0.0, 0.0), Point::new(100.0, 0.0)]
    }

    #[test]
    fn test_calibrate_sets_factor() {
        let mut cal = Calibration::new();
        cal.calibrate(sample_points(), 100.0, 10.0).unwrap();

        assert!(cal.is_done());
        assert_eq!(cal.factor(), 10.0);
        assert_eq!(cal.points(), Some(sample_points()));
    }

    #[test]
    fn test_calibrate_rejects_zero_and_negative() {
        let mut cal = Calibration::new();

        assert_eq!(
            cal.calibrate(sample_points(), 100.0, 0.0),
            Err(CalibrationError::InvalidInput)
        );
        assert_eq!(
            cal.calibrate(sample_points(), 100.0, -5.0),
            Err(CalibrationError::InvalidInput)
        );
        assert_eq!(
            cal.calibrate(sample_points(), 100.0, f64::NAN),
            Err(CalibrationError::InvalidInput)
        );

        // Failed attempts leave the model untouched
        assert!(!cal.is_done());
        assert_eq!(cal.factor(), 1.0);
        assert_eq!(cal.points(), None);
    }

    #[test]
    fn test_to_real_before_calibration() {
        let cal = Calibration::new();
        assert_eq!(cal.to_real(42.0), Err(CalibrationError::NotCalibrated));
    }

    #[test]
    fn test_to_real_round_trip() {
        let mut cal = Calibration::new();
        cal.calibrate(sample_points(), 250.0, 12.5).unwrap();

        for px in [0.0, 1.0, 3.75, 250.0, 9999.0] {
            let real = cal.to_real(px).unwrap();
            assert!((real * cal.factor() - px).abs() < 1e-9);
        }
    }

    #[test]
    fn test_recalibration_supersedes() {
        let mut cal = Calibration::new();
        cal.calibrate(sample_points(), 100.0, 10.0).unwrap();

        let new_points = [Point::new(5.0, 5.0), Point::new(5.0, 55.0)];
        cal.calibrate(new_points, 50.0, 25.0).unwrap();

        assert_eq!(cal.factor(), 2.0);
        assert_eq!(cal.points(), Some(new_points));
    }

    #[test]
    fn test_reset() {
        let mut cal = Calibration::new();
        cal.calibrate(sample_points(), 100.0, 10.0).unwrap();
        cal.reset();

        assert!(!cal.is_done());
        assert_eq!(cal.factor(), 1.0);
        assert_eq!(cal.points(), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
