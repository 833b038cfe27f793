//! The interactive measurement session.
//!
//! [`Session`] is the single entry point for an interactive shell: it owns
//! the annotation store, the calibration model, the active mode, the filter
//! state, and the undo history, and it routes every input event. All
//! operations are synchronous, and every one returns a human-readable status
//! string for the shell's status bar — that string is part of the contract,
//! not a cosmetic.
//!
//! A rendering layer owns no annotation data: it polls the read accessors
//! (cheaply gated on [`Session::revision`]) and draws what it finds.

mod history;
mod mode;
mod store;

pub use history::{History, HistoryError, Snapshot, DEFAULT_UNDO_CAP};
pub use mode::Mode;
pub use store::AnnotationStore;

use crate::calibration::Calibration;
use crate::filter::{
    EdgeFilter, FilterRegion, FilterThresholds, FilteredImage, NumberPrompt, SelectionRect,
    ViewTransform,
};
use crate::geometry;
use crate::measurement::{LineMeasurement, MeasurementRecord, RecordKind};
use crate::{ImageInfo, Point};

/// Filter-related session state covered by undo snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Completed selection for the edge filter.
    pub edge_selection: Option<SelectionRect>,
    /// Completed selection for the Canny filter.
    pub canny_selection: Option<SelectionRect>,
    /// Drag currently in progress (ROI modes only).
    pub active_drag: Option<SelectionRect>,
    /// Whole-image Canny filtering; mutually exclusive with a Canny
    /// selection.
    pub global_canny: bool,
    /// Cached output of the most recent filter application.
    pub filtered: Option<FilteredImage>,
}

/// The annotation and measurement engine for one loaded image.
#[derive(Debug)]
pub struct Session {
    image: ImageInfo,
    mode: Mode,
    store: AnnotationStore,
    calibration: Calibration,
    filters: FilterState,
    thresholds: FilterThresholds,
    history: History,
    revision: u64,
}

impl Session {
    /// Start a session for a freshly loaded image.
    pub fn new(image: ImageInfo) -> Self {
        Self {
            image,
            mode: Mode::None,
            store: AnnotationStore::new(),
            calibration: Calibration::new(),
            filters: FilterState::default(),
            thresholds: FilterThresholds::default(),
            history: History::new(),
            revision: 0,
        }
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn image(&self) -> &ImageInfo {
        &self.image
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn thresholds(&self) -> FilterThresholds {
        self.thresholds
    }

    /// Finalized measurements in completion order.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.store.records
    }

    /// The most recent line record, if any.
    pub fn last_line_record(&self) -> Option<&MeasurementRecord> {
        self.store.last_line_record()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Monotonic change counter; bumps on every mutation so a renderer can
    /// poll for changes without diffing state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ------------------------------------------------------------------
    // Image lifecycle
    // ------------------------------------------------------------------

    /// Replace the loaded image and fully reset annotations, calibration,
    /// filters, and history.
    ///
    /// Thresholds persist; they belong to the shell's sliders, not to the
    /// image. History is dropped because a snapshot is only meaningful for
    /// the image it was taken from.
    pub fn load_image(&mut self, image: ImageInfo) -> String {
        self.image = image;
        self.mode = Mode::None;
        self.store = AnnotationStore::new();
        self.calibration.reset();
        self.filters = FilterState::default();
        self.history.clear();
        self.touch();
        format!(
            "Status: Loaded '{}' ({}x{}).",
            self.image.name, self.image.width, self.image.height
        )
    }

    // ------------------------------------------------------------------
    // Mode transitions
    // ------------------------------------------------------------------

    /// Activate `target`, or return to [`Mode::None`] when it is already
    /// active.
    ///
    /// The outgoing mode's in-progress buffer is discarded and the incoming
    /// mode starts from a clean buffer of its own; the line buffer persists
    /// through both rules.
    pub fn toggle_mode(&mut self, target: Mode) -> String {
        self.save_state();
        let next = if self.mode == target { Mode::None } else { target };
        self.leave_mode();
        self.enter_mode(next);
        self.mode = next;
        self.touch();
        next.instruction().to_string()
    }

    fn leave_mode(&mut self) {
        match self.mode {
            Mode::Calibration => self.store.calibration_points.clear(),
            Mode::DotPair => {
                self.store.pop_pending_dot();
            }
            Mode::Angle => self.store.angle_points.clear(),
            // Line points persist across mode switches
            Mode::Line => {}
            Mode::EdgeRoi | Mode::CannyRoi => self.filters.active_drag = None,
            Mode::None => {}
        }
    }

    fn enter_mode(&mut self, next: Mode) {
        match next {
            Mode::Calibration => self.store.calibration_points.clear(),
            Mode::Angle => self.store.angle_points.clear(),
            Mode::Line => self.store.tick_samples.clear(),
            Mode::CannyRoi => {
                // Only one Canny application style may be active
                self.filters.global_canny = false;
                self.filters.filtered = None;
            }
            Mode::None | Mode::DotPair | Mode::EdgeRoi => {}
        }
    }

    // ------------------------------------------------------------------
    // Pointer clicks
    // ------------------------------------------------------------------

    /// Place a point in original-image coordinates.
    ///
    /// The point must already be divided by the view zoom. The calibration
    /// prompt collaborator is consulted synchronously when a second
    /// calibration point lands.
    pub fn handle_click(&mut self, point: Point, prompt: &mut dyn NumberPrompt) -> String {
        if !self.image.contains(point) {
            return "Status: Click outside image bounds.".into();
        }

        let status = match self.mode {
            Mode::None => return "Status: Select a mode to place points.".into(),
            Mode::EdgeRoi | Mode::CannyRoi => {
                return "Status: Drag to select a region.".into();
            }
            Mode::Calibration => {
                self.save_state();
                self.calibration_click(point, prompt)
            }
            Mode::DotPair => {
                self.save_state();
                self.dot_pair_click(point)
            }
            Mode::Angle => {
                self.save_state();
                self.angle_click(point)
            }
            Mode::Line => {
                self.save_state();
                self.line_click(point)
            }
        };
        self.touch();
        status
    }

    fn calibration_click(&mut self, point: Point, prompt: &mut dyn NumberPrompt) -> String {
        if self.store.calibration_points.len() >= 2 {
            return "Calibration: Reset to place new points.".into();
        }

        self.store.calibration_points.push(point);
        if self.store.calibration_points.len() < 2 {
            return "Calibration: Click second point.".into();
        }

        let p1 = self.store.calibration_points[0];
        let p2 = self.store.calibration_points[1];
        let distance_px = geometry::distance(p1, p2);

        let question = format!(
            "Measured {distance_px:.2} pixels between points. Enter the real distance in mm:"
        );
        let Some(real_value) = prompt.ask_number(&question) else {
            // Dismissed prompt: roll back the second point and await a new one
            self.store.calibration_points.pop();
            return "Calibration: Cancelled. Click second point again.".into();
        };

        match self.calibration.calibrate([p1, p2], distance_px, real_value) {
            Ok(()) => {
                self.store
                    .replace_calibration_record(MeasurementRecord::Calibration {
                        points: [p1, p2],
                        distance_px,
                        real_value_mm: real_value,
                        calibration_factor: self.calibration.factor(),
                    });
                self.store.calibration_points.clear();
                self.mode = Mode::None;
                format!("Calibrated: {:.4} px/mm", self.calibration.factor())
            }
            Err(_) => {
                self.store.calibration_points.pop();
                "Calibration: Real distance must be a positive number.".into()
            }
        }
    }

    fn dot_pair_click(&mut self, point: Point) -> String {
        self.store.dot_points.push(point);
        if self.store.dot_points.len() % 2 == 1 {
            return format!(
                "Pair {}: Click second point.",
                self.store.dot_pair_count() + 1
            );
        }

        let second = point;
        let first = self.store.dot_points[self.store.dot_points.len() - 2];
        let distance_px = geometry::distance(first, second);
        let angle_deg = geometry::signed_angle_deg(first, second);
        let distance_mm = self.calibration.to_real(distance_px).ok();

        let pair = self.store.dot_pair_count();
        let status = match distance_mm {
            Some(mm) => format!("Pair {pair}: {distance_px:.2}px, {angle_deg:.1}° = {mm:.3}mm"),
            None => format!("Pair {pair}: {distance_px:.2}px, {angle_deg:.1}° (Uncalibrated)"),
        };

        self.store.records.push(MeasurementRecord::DotPair {
            points: [first, second],
            distance_px,
            angle_deg,
            distance_mm,
        });
        status
    }

    fn angle_click(&mut self, point: Point) -> String {
        if self.store.angle_points.len() >= 3 {
            // A fourth click starts a fresh triple seeded with this point
            self.store.angle_points.clear();
            self.store.angle_points.push(point);
            return "Angle: Click vertex point (2nd).".into();
        }

        self.store.angle_points.push(point);
        match self.store.angle_points.len() {
            1 => "Angle: Click vertex point (2nd).".into(),
            2 => "Angle: Click final point (3rd).".into(),
            _ => {
                let points = [
                    self.store.angle_points[0],
                    self.store.angle_points[1],
                    self.store.angle_points[2],
                ];
                match geometry::angle_between(points[0], points[1], points[2]) {
                    Ok(angle_deg) => {
                        self.store
                            .records
                            .push(MeasurementRecord::Angle { points, angle_deg });
                        self.store.angle_points.clear();
                        format!(
                            "Angle measured: {angle_deg:.2}°. Click first point for a new angle."
                        )
                    }
                    Err(_) => {
                        self.store.angle_points.clear();
                        "Angle: Points coincide. Click first point to start over.".into()
                    }
                }
            }
        }
    }

    fn line_click(&mut self, point: Point) -> String {
        if self.store.line_points.len() >= 4 {
            // A fifth click restarts the group; finalized records stay
            self.store.line_points.clear();
            self.store.tick_samples.clear();
            self.store.line_points.push(point);
            return "Line: Started a new group. Click 3 more points.".into();
        }

        self.store.line_points.push(point);
        let remaining = 4 - self.store.line_points.len();
        if remaining > 0 {
            return format!("Line: Click {remaining} more point(s).");
        }

        let points = [
            self.store.line_points[0],
            self.store.line_points[1],
            self.store.line_points[2],
            self.store.line_points[3],
        ];
        match LineMeasurement::compute(points, &self.calibration) {
            Ok(line) => {
                let status = match (line.length1_mm, line.length2_mm, line.avg_dist_mm) {
                    (Some(l1), Some(l2), Some(avg)) => format!(
                        "Lines: L1={l1:.2}mm, L2={l2:.2}mm, Angle={:.1}°, AvgDist={avg:.3}mm",
                        line.angle_deg
                    ),
                    _ => format!(
                        "Lines: L1={:.1}px, L2={:.1}px, Angle={:.1}°, AvgDist={:.2}px",
                        line.length1_px, line.length2_px, line.angle_deg, line.avg_dist_px
                    ),
                };
                let (record, ticks) = line.into_record();
                self.store.records.push(record);
                self.store.tick_samples = ticks;
                // The buffer stays; the segments remain visible until a reset
                // or a new group
                status
            }
            Err(_) => {
                self.store.line_points.clear();
                self.store.tick_samples.clear();
                "Line: Segments too short to measure. Points cleared.".into()
            }
        }
    }

    // ------------------------------------------------------------------
    // Region selection (ROI modes)
    // ------------------------------------------------------------------

    /// Start a region drag. View coordinates; ROI modes only.
    pub fn begin_selection(&mut self, view_point: Point) -> String {
        if !self.mode.is_roi() {
            return "Status: No selection mode active.".into();
        }
        self.save_state();
        self.filters.active_drag = Some(SelectionRect::new(view_point, view_point));
        self.touch();
        "Status: Drag to size the region.".into()
    }

    /// Extend the drag in progress. A no-op without one.
    pub fn update_selection(&mut self, view_point: Point) {
        if let Some(drag) = &mut self.filters.active_drag {
            drag.end = view_point;
            self.revision += 1;
        }
    }

    /// Finish the drag.
    ///
    /// Sub-unit drags count as cancelled; completed drags store the
    /// normalized rectangle for the active filter kind and leave the
    /// selection mode.
    pub fn end_selection(&mut self, view_point: Point) -> String {
        let Some(mut drag) = self.filters.active_drag.take() else {
            return "Status: No selection in progress.".into();
        };
        drag.end = view_point;
        self.touch();

        if drag.is_degenerate() {
            if self.mode == Mode::CannyRoi {
                self.filters.filtered = None;
            }
            self.mode = Mode::None;
            return "Status: ROI selection cancelled (zero size).".into();
        }

        let rect = drag.normalized();
        let status = match self.mode {
            Mode::EdgeRoi => {
                self.filters.edge_selection = Some(rect);
                "Status: Region selected for edge filtering."
            }
            Mode::CannyRoi => {
                self.filters.canny_selection = Some(rect);
                "Status: Region selected for the Canny filter."
            }
            _ => "Status: Region selected.",
        };
        self.mode = Mode::None;
        status.into()
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    /// Update the filter thresholds.
    ///
    /// The cached artifact is not recomputed; call
    /// [`Session::apply_edge_filter`] to refresh it.
    pub fn set_thresholds(&mut self, thresholds: FilterThresholds) {
        self.thresholds = thresholds;
        self.touch();
    }

    /// Toggle whole-image Canny filtering.
    ///
    /// Turning it on clears any Canny region selection (only one Canny
    /// application style may be active) and filters the full image.
    pub fn toggle_global_filter(&mut self, filter: &dyn EdgeFilter) -> String {
        self.save_state();
        self.filters.global_canny = !self.filters.global_canny;
        self.touch();

        if self.filters.global_canny {
            if self.mode == Mode::CannyRoi {
                self.mode = Mode::None;
            }
            self.filters.canny_selection = None;
            self.filters.active_drag = None;
            let FilterThresholds { low, high } = self.thresholds;
            self.filters.filtered = Some(filter.apply(FilterRegion::Full, low, high));
            format!("Status: Global Canny filter ON (thresholds {low}/{high}).")
        } else {
            self.filters.filtered = None;
            "Status: Global Canny filter OFF.".into()
        }
    }

    /// Recompute the cached filter artifact from the current filter state.
    ///
    /// Global filtering wins; otherwise the Canny selection, then the edge
    /// selection, each converted to image coordinates through `view`. With
    /// nothing active the cache is cleared.
    pub fn apply_edge_filter(&mut self, filter: &dyn EdgeFilter, view: ViewTransform) -> String {
        let FilterThresholds { low, high } = self.thresholds;
        self.touch();

        if self.filters.global_canny {
            self.filters.filtered = Some(filter.apply(FilterRegion::Full, low, high));
            return format!("Status: Global Canny filter ON (thresholds {low}/{high}).");
        }

        let selection = self.filters.canny_selection.or(self.filters.edge_selection);
        match selection.and_then(|rect| rect.to_image_region(view, &self.image)) {
            Some(region) => {
                self.filters.filtered =
                    Some(filter.apply(FilterRegion::Region(region), low, high));
                format!("Status: Filter applied to region (thresholds {low}/{high}).")
            }
            None => {
                self.filters.filtered = None;
                "Status: No filter region active.".into()
            }
        }
    }

    // ------------------------------------------------------------------
    // Deletion and resets
    // ------------------------------------------------------------------

    /// Remove the most recent dot pair (or pending dot) and its record.
    pub fn delete_last_pair(&mut self) -> String {
        if self.store.dot_points.is_empty() {
            return "Status: No dots to delete.".into();
        }

        self.save_state();
        self.touch();
        if self.store.pop_pending_dot() {
            return "Status: Last pending dot deleted.".into();
        }

        self.store.dot_points.pop();
        self.store.dot_points.pop();
        if self.store.remove_last_dot_pair_record() {
            "Status: Last dot pair and measurement deleted.".into()
        } else {
            "Status: Last dot pair deleted (no matching measurement).".into()
        }
    }

    /// Clear dot-pair annotations and their records.
    pub fn reset_dots(&mut self) -> String {
        self.save_state();
        if self.mode == Mode::DotPair {
            self.mode = Mode::None;
        }
        self.store.dot_points.clear();
        self.store.remove_records_of_kind(RecordKind::DotPair);
        self.touch();
        "Status: Dots reset.".into()
    }

    /// Drop the calibration, its in-progress points, and its record.
    pub fn reset_calibration(&mut self) -> String {
        self.save_state();
        if self.mode == Mode::Calibration {
            self.mode = Mode::None;
        }
        self.store.calibration_points.clear();
        self.store.remove_records_of_kind(RecordKind::Calibration);
        self.calibration.reset();
        self.touch();
        "Status: Calibration reset.".into()
    }

    /// Clear line annotations, tick markers, and line records.
    pub fn reset_lines(&mut self) -> String {
        self.save_state();
        if self.mode == Mode::Line {
            self.mode = Mode::None;
        }
        self.store.line_points.clear();
        self.store.tick_samples.clear();
        self.store.remove_records_of_kind(RecordKind::Line);
        self.touch();
        "Status: Lines reset.".into()
    }

    /// Clear filter selections, the global toggle, and the cached artifact.
    pub fn reset_filters(&mut self) -> String {
        self.save_state();
        if self.mode.is_roi() {
            self.mode = Mode::None;
        }
        self.filters = FilterState::default();
        self.touch();
        "Status: Filters reset.".into()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Revert to the state before the most recent mutation.
    pub fn undo(&mut self) -> String {
        match self.history.undo(self.snapshot()) {
            Ok(snapshot) => {
                self.restore(snapshot);
                self.touch();
                "Status: Undo successful.".into()
            }
            Err(_) => "Status: Nothing to undo.".into(),
        }
    }

    /// Re-apply the most recently undone state.
    pub fn redo(&mut self) -> String {
        match self.history.redo(self.snapshot()) {
            Ok(snapshot) => {
                self.restore(snapshot);
                self.touch();
                "Status: Redo successful.".into()
            }
            Err(_) => "Status: Nothing to redo.".into(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            store: self.store.clone(),
            calibration: self.calibration.clone(),
            filters: self.filters.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let Snapshot {
            store,
            calibration,
            filters,
        } = snapshot;
        self.store = store;
        self.calibration = calibration;
        self.filters = filters;
        // Snapshots do not cover the active mode
        self.mode = Mode::None;
    }

    fn save_state(&mut self) {
        let snapshot = self.snapshot();
        self.history.save(snapshot);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
