//! Interaction modes.

use serde::{Deserialize, Serialize};

/// The single active interpretation for pointer input.
///
/// At most one mode is active at a time: activating a mode deactivates the
/// previous one, and re-toggling the active mode returns to `None`. The mode
/// is deliberately not part of undo snapshots — restoring state always lands
/// in `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// No mode active; clicks are ignored.
    #[default]
    None,
    /// Two clicks a known real distance apart derive the calibration factor.
    Calibration,
    /// Every pair of clicks measures a distance and its screen angle.
    DotPair,
    /// Three clicks (arm end, vertex, arm end) measure an interior angle.
    Angle,
    /// Four clicks define two near-parallel segments. The point buffer
    /// persists until an explicit reset or a new group is started.
    Line,
    /// Drag selects a region for the edge filter.
    EdgeRoi,
    /// Drag selects a region for the Canny filter.
    CannyRoi,
}

impl Mode {
    /// What the user should do next after entering this mode.
    pub fn instruction(self) -> &'static str {
        match self {
            Mode::None => "Status: Ready",
            Mode::Calibration => "Calibration: Click two points a known distance apart.",
            Mode::DotPair => "Dots: Click pairs of points to measure distance and angle.",
            Mode::Angle => "Angle: Click 3 points (arm end, vertex, arm end).",
            Mode::Line => "Line: Click 4 points to define two near-parallel segments.",
            Mode::EdgeRoi => "Edge ROI: Drag a region for edge filtering.",
            Mode::CannyRoi => "Canny ROI: Drag a region for the Canny filter.",
        }
    }

    /// Whether this mode consumes drag gestures instead of clicks.
    pub fn is_roi(self) -> bool {
        matches!(self, Mode::EdgeRoi | Mode::CannyRoi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        assert_eq!(Mode::default(), Mode::None);
    }

    #[test]
    fn test_roi_classification() {
        assert!(Mode::EdgeRoi.is_roi());
        assert!(Mode::CannyRoi.is_roi());
        assert!(!Mode::None.is_roi());
        assert!(!Mode::Line.is_roi());
    }

    #[test]
    fn test_every_mode_has_an_instruction() {
        let modes = [
            Mode::None,
            Mode::Calibration,
            Mode::DotPair,
            Mode::Angle,
            Mode::Line,
            Mode::EdgeRoi,
            Mode::CannyRoi,
        ];
        for mode in modes {
            assert!(!mode.instruction().is_empty());
        }
    }
}
