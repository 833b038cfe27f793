//! Finalized measurement records.
//!
//! Records are append-only history: once pushed they change only through an
//! explicit reset or undo. The calibration record is the one exception — at
//! most one is retained, with older ones superseded on recalibration.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::geometry::{self, GeometryError, TickSample};
use crate::Point;

/// Number of sampling intervals along the first segment of a line
/// measurement, yielding one more sample than intervals.
pub const LINE_SAMPLE_INTERVALS: usize = 15;

/// A finalized measurement, tagged by the mode that produced it.
///
/// Real-unit fields (`*_mm`) are present only when the measurement was taken
/// with a calibration in place; they are omitted from serialized output
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeasurementRecord {
    /// The calibration event: two points a known real distance apart.
    Calibration {
        points: [Point; 2],
        distance_px: f64,
        real_value_mm: f64,
        calibration_factor: f64,
    },

    /// A pair of dots measuring a distance and its screen angle.
    DotPair {
        points: [Point; 2],
        distance_px: f64,
        angle_deg: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        distance_mm: Option<f64>,
    },

    /// Three points (arm end, vertex, arm end) measuring an interior angle.
    Angle { points: [Point; 3], angle_deg: f64 },

    /// Two near-parallel segments with sampled separation distances.
    Line {
        points: [Point; 4],
        length1_px: f64,
        length2_px: f64,
        angle_deg: f64,
        distances_px: Vec<f64>,
        avg_dist_px: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        length1_mm: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        length2_mm: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        distances_mm: Option<Vec<f64>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        avg_dist_mm: Option<f64>,
    },
}

impl MeasurementRecord {
    /// The kind tag, used to scope resets and deletions.
    pub fn kind(&self) -> RecordKind {
        match self {
            MeasurementRecord::Calibration { .. } => RecordKind::Calibration,
            MeasurementRecord::DotPair { .. } => RecordKind::DotPair,
            MeasurementRecord::Angle { .. } => RecordKind::Angle,
            MeasurementRecord::Line { .. } => RecordKind::Line,
        }
    }
}

/// Discriminant of [`MeasurementRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Calibration,
    DotPair,
    Angle,
    Line,
}

/// A completed parallel-line measurement, before it is split into the record
/// and the tick-sample cache.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMeasurement {
    pub points: [Point; 4],
    pub length1_px: f64,
    pub length2_px: f64,
    /// Deviation from parallel between the two segments, in `[0, 90]`.
    pub angle_deg: f64,
    pub distances_px: Vec<f64>,
    pub avg_dist_px: f64,
    pub length1_mm: Option<f64>,
    pub length2_mm: Option<f64>,
    pub distances_mm: Option<Vec<f64>>,
    pub avg_dist_mm: Option<f64>,
    /// Sample endpoints kept for visualization.
    pub ticks: Vec<TickSample>,
}

impl LineMeasurement {
    /// Measure two near-parallel segments `p1-p2` and `p3-p4`.
    ///
    /// Computes both segment lengths, the deviation angle between their
    /// directions, and 16 evenly spaced separation samples with their
    /// average. Real-unit equivalents are attached when `calibration` is
    /// done.
    ///
    /// Fails with [`GeometryError::DegenerateLine`] if either segment is
    /// shorter than the degeneracy threshold; no partial result is produced.
    pub fn compute(points: [Point; 4], calibration: &Calibration) -> Result<Self, GeometryError> {
        let [p1, p2, p3, p4] = points;
        let dir1 = p1.vector_to(p2);
        let dir2 = p3.vector_to(p4);
        if dir1.length_squared() < geometry::DEGENERACY_EPSILON
            || dir2.length_squared() < geometry::DEGENERACY_EPSILON
        {
            return Err(GeometryError::DegenerateLine);
        }

        let angle_deg = geometry::angle_between_vectors(dir1, dir2)?;
        let ticks = geometry::sample_parallel_distances((p1, p2), (p3, p4), LINE_SAMPLE_INTERVALS)?;

        let distances_px: Vec<f64> = ticks.iter().map(|t| t.distance_px).collect();
        let avg_dist_px = distances_px.iter().sum::<f64>() / distances_px.len() as f64;
        let length1_px = geometry::distance(p1, p2);
        let length2_px = geometry::distance(p3, p4);

        let length1_mm = calibration.to_real(length1_px).ok();
        let length2_mm = calibration.to_real(length2_px).ok();
        let avg_dist_mm = calibration.to_real(avg_dist_px).ok();
        let distances_mm = calibration.is_done().then(|| {
            distances_px
                .iter()
                .map(|d| d / calibration.factor())
                .collect()
        });

        Ok(Self {
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
            ticks,
        })
    }

    /// Split into the finalized record and the tick samples to cache.
    pub fn into_record(self) -> (MeasurementRecord, Vec<TickSample>) {
        let record = MeasurementRecord::Line {
            points: self.points,
            length1_px: self.length1_px,
            length2_px: self.length2_px,
            angle_deg: self.angle_deg,
            distances_px: self.distances_px,
            avg_dist_px: self.avg_dist_px,
            length1_mm: self.length1_mm,
            length2_mm: self.length2_mm,
            distances_mm: self.distances_mm,
            avg_dist_mm: self.avg_dist_mm,
        };
        (record, self.ticks)
    }
}
