//! Metrolens Core - Annotation and measurement engine
//!
//! This crate provides the measurement core for Metrolens: the exclusive-mode
//! state machine that interprets pointer input, the geometry that turns point
//! sets into measurements, the pixel-to-real-unit calibration model, the
//! undo/redo snapshot history, and the JSON export formatter.
//!
//! Rendering, window chrome, file dialogs, image decoding, and the
//! edge-detection pixel transform itself all live outside this crate, behind
//! the collaborator traits in [`filter`].

pub mod calibration;
pub mod export;
pub mod filter;
pub mod geometry;
pub mod measurement;
pub mod session;

pub use calibration::{Calibration, CalibrationError};
pub use export::{ExportDocument, ExportError, ExportRequest};
pub use filter::{
    EdgeFilter, FilterRegion, FilterThresholds, FilteredImage, NumberPrompt, ViewTransform,
};
pub use geometry::{GeometryError, TickSample};
pub use measurement::{MeasurementRecord, RecordKind};
pub use session::{Mode, Session};

/// A coordinate pair in original-image pixel space.
///
/// The origin is the image's top-left corner with y increasing downward.
/// Points serialize as a two-element `[x, y]` array, the shape used by the
/// measurement export document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate in pixels.
    pub x: f64,
    /// Vertical coordinate in pixels (grows downward).
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Displacement vector from `self` to `other`.
    pub fn vector_to(self, other: Point) -> Vec2 {
        Vec2::new(other.x - self.x, other.y - self.y)
    }

    /// Translate by a displacement vector.
    pub fn offset(self, v: Vec2) -> Point {
        Point::new(self.x + v.x, self.y + v.y)
    }
}

impl serde::Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (self.x, self.y).serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Point { x, y })
    }
}

/// A 2D displacement in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product with another vector.
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Squared length. Avoids a sqrt when only comparison is needed.
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Scale by a scalar factor.
    pub fn scale(self, t: f64) -> Vec2 {
        Vec2::new(self.x * t, self.y * t)
    }
}

/// Name and pixel dimensions of the currently loaded image.
///
/// This is all the engine knows about the image; pixel data stays with the
/// shell and the filter collaborator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageInfo {
    /// File name, used in export metadata.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageInfo {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        debug_assert!(
            width >= 1 && height >= 1,
            "Image dimensions must be at least 1x1"
        );
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// Whether a point lies inside the image bounds.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < self.width as f64
            && point.y < self.height as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_as_pair() {
        let p = Point::new(12.5, 7.0);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[12.5,7.0]");

        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_vector_between_points() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        let v = a.vector_to(b);
        assert_eq!(v, Vec2::new(3.0, 4.0));
        assert_eq!(v.length(), 5.0);
        assert_eq!(a.offset(v), b);
    }

    #[test]
    fn test_vec2_dot_product() {
        let v1 = Vec2::new(1.0, 0.0);
        let v2 = Vec2::new(0.0, 1.0);
        assert_eq!(v1.dot(v2), 0.0);
        assert_eq!(v1.dot(v1), 1.0);
    }

    #[test]
    fn test_image_bounds() {
        let info = ImageInfo::new("scan.png", 640, 480);

        assert!(info.contains(Point::new(0.0, 0.0)));
        assert!(info.contains(Point::new(639.9, 479.9)));

        // The far edges are exclusive
        assert!(!info.contains(Point::new(640.0, 100.0)));
        assert!(!info.contains(Point::new(100.0, 480.0)));
        assert!(!info.contains(Point::new(-0.1, 100.0)));
    }
}
