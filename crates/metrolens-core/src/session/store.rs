//! Owned annotation state: in-progress point buffers and finalized records.

use serde::{Deserialize, Serialize};

use crate::geometry::TickSample;
use crate::measurement::{MeasurementRecord, RecordKind};
use crate::Point;

/// Ordered annotation state owned by the session.
///
/// The point buffers hold points still under construction for their mode;
/// `records` is the append-only list of finalized measurements;
/// `tick_samples` caches the projected separation markers of the most recent
/// line measurement for visualization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStore {
    /// Calibration clicks in progress (0-2).
    pub calibration_points: Vec<Point>,
    /// All placed dot-pair points; a trailing odd point is a pending pair.
    pub dot_points: Vec<Point>,
    /// Angle clicks in progress (0-3).
    pub angle_points: Vec<Point>,
    /// Line clicks (0-4); persists after the fourth point.
    pub line_points: Vec<Point>,
    /// Finalized measurements in completion order.
    pub records: Vec<MeasurementRecord>,
    /// Tick markers of the most recent line measurement.
    pub tick_samples: Vec<TickSample>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed dot pairs.
    pub fn dot_pair_count(&self) -> usize {
        self.dot_points.len() / 2
    }

    /// Drop a trailing unpaired dot, if any. Returns whether one was removed.
    pub fn pop_pending_dot(&mut self) -> bool {
        if self.dot_points.len() % 2 == 1 {
            self.dot_points.pop();
            true
        } else {
            false
        }
    }

    /// Remove every record of the given kind.
    pub fn remove_records_of_kind(&mut self, kind: RecordKind) {
        self.records.retain(|r| r.kind() != kind);
    }

    /// Replace any existing calibration record with `record`.
    ///
    /// At most one calibration record is retained; older ones are superseded.
    pub fn replace_calibration_record(&mut self, record: MeasurementRecord) {
        debug_assert_eq!(record.kind(), RecordKind::Calibration);
        self.remove_records_of_kind(RecordKind::Calibration);
        self.records.push(record);
    }

    /// Remove the most recent dot-pair record, if one exists.
    ///
    /// Pairs finalize in placement order, so the last record of the kind
    /// belongs to the most recently completed pair.
    pub fn remove_last_dot_pair_record(&mut self) -> bool {
        match self
            .records
            .iter()
            .rposition(|r| r.kind() == RecordKind::DotPair)
        {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        }
    }

    /// The most recent line record, if any.
    pub fn last_line_record(&self) -> Option<&MeasurementRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.kind() == RecordKind::Line)
    }
}
