//! Interfaces to the external image collaborators.
//!
//! The engine never reads pixel data itself. Edge filtering is an opaque
//! transform supplied by the shell, invoked with a region and the two
//! user-controlled thresholds; its output is cached for display and covered
//! by undo snapshots. The calibration prompt is likewise a collaborator: a
//! synchronous dialog that yields a number or a cancellation.

use serde::{Deserialize, Serialize};

use crate::{ImageInfo, Point};

/// Canny-style threshold pair controlled by the shell's sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterThresholds {
    pub low: u8,
    pub high: u8,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            low: 100,
            high: 200,
        }
    }
}

/// A drag rectangle in view (zoomed) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub start: Point,
    pub end: Point,
}

impl SelectionRect {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// True when the drag spans less than one unit on either axis, which is
    /// treated as a cancelled selection.
    pub fn is_degenerate(&self) -> bool {
        (self.start.x - self.end.x).abs() < 1.0 || (self.start.y - self.end.y).abs() < 1.0
    }

    /// Rearrange the corners so `start` is top-left and `end` bottom-right.
    pub fn normalized(&self) -> SelectionRect {
        SelectionRect {
            start: Point::new(self.start.x.min(self.end.x), self.start.y.min(self.end.y)),
            end: Point::new(self.start.x.max(self.end.x), self.start.y.max(self.end.y)),
        }
    }

    /// Convert to original-image coordinates, clamped to the image bounds.
    ///
    /// Returns `None` when the clamped region has no area (fully outside the
    /// image, or collapsed by clamping).
    pub fn to_image_region(&self, view: ViewTransform, image: &ImageInfo) -> Option<PixelRect> {
        let a = view.to_image(self.start);
        let b = view.to_image(self.end);

        let x1 = a.x.min(b.x).max(0.0) as u32;
        let y1 = a.y.min(b.y).max(0.0) as u32;
        let x2 = a.x.max(b.x).min(image.width as f64).max(0.0) as u32;
        let y2 = a.y.max(b.y).min(image.height as f64).max(0.0) as u32;

        (x2 > x1 && y2 > y1).then(|| PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// An axis-aligned region in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Region argument for the edge-filter collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRegion {
    /// Filter the whole image.
    Full,
    /// Filter a sub-rectangle in original-image coordinates.
    Region(PixelRect),
}

/// Mapping from view (zoomed) coordinates down to original-image coordinates.
///
/// The engine stores and computes in image space only; the shell divides
/// click coordinates through this before handing them in, and selection
/// rectangles are divided when a filter region is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f64,
}

impl ViewTransform {
    /// Lower zoom bound, matching the viewer's limit.
    pub const MIN_ZOOM: f64 = 0.05;
    /// Upper zoom bound, matching the viewer's limit.
    pub const MAX_ZOOM: f64 = 50.0;

    pub fn new(zoom: f64) -> Self {
        Self {
            zoom: zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Divide a view-space point down into original-image space.
    pub fn to_image(&self, p: Point) -> Point {
        Point::new(p.x / self.zoom, p.y / self.zoom)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// RGB output of the edge-filter collaborator.
///
/// Stored as raw row-major RGB bytes (3 per pixel) so undo snapshots can
/// clone it without involving the `image` crate; conversions are provided
/// for shells that want to display it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl FilteredImage {
    /// Create a new FilteredImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width * height * 3) as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a FilteredImage from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbImage for display or further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

/// Opaque edge-detection transform supplied by the shell.
///
/// The algorithm behind it is not this crate's concern; `low` and `high` are
/// the 0-255 threshold values the user controls.
pub trait EdgeFilter {
    fn apply(&self, region: FilterRegion, low: u8, high: u8) -> FilteredImage;
}

/// Synchronous numeric prompt, used once per calibration event.
///
/// Returns `None` when the user dismisses the dialog without entering a
/// value; the caller treats that as a rollback, not an error.
pub trait NumberPrompt {
    fn ask_number(&mut self, prompt: &str) -> Option<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = FilterThresholds::default();
        assert_eq!((t.low, t.high), (100, 200));
    }

    #[test]
    fn test_selection_degeneracy() {
        let drag = SelectionRect::new(Point::new(10.0, 10.0), Point::new(10.5, 80.0));
        assert!(drag.is_degenerate(), "sub-unit width cancels");

        let drag = SelectionRect::new(Point::new(10.0, 10.0), Point::new(80.0, 10.9));
        assert!(drag.is_degenerate(), "sub-unit height cancels");

        let drag = SelectionRect::new(Point::new(10.0, 10.0), Point::new(11.0, 11.0));
        assert!(!drag.is_degenerate());
    }

    #[test]
    fn test_selection_normalization() {
        // Dragged up and to the left
        let drag = SelectionRect::new(Point::new(80.0, 90.0), Point::new(20.0, 30.0));
        let rect = drag.normalized();
        assert_eq!(rect.start, Point::new(20.0, 30.0));
        assert_eq!(rect.end, Point::new(80.0, 90.0));
    }

    #[test]
    fn test_selection_to_image_region_divides_by_zoom() {
        let image = ImageInfo::new("scan.png", 200, 200);
        let view = ViewTransform::new(2.0);

        let drag = SelectionRect::new(Point::new(20.0, 40.0), Point::new(100.0, 120.0));
        let region = drag.to_image_region(view, &image).unwrap();

        assert_eq!(
            region,
            PixelRect {
                x: 10,
                y: 20,
                width: 40,
                height: 40
            }
        );
    }

    #[test]
    fn test_selection_clamped_to_image() {
        let image = ImageInfo::new("scan.png", 100, 100);
        let view = ViewTransform::new(1.0);

        let drag = SelectionRect::new(Point::new(-20.0, 50.0), Point::new(250.0, 250.0));
        let region = drag.to_image_region(view, &image).unwrap();

        assert_eq!(
            region,
            PixelRect {
                x: 0,
                y: 50,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn test_selection_fully_outside_image() {
        let image = ImageInfo::new("scan.png", 100, 100);
        let view = ViewTransform::new(1.0);

        let drag = SelectionRect::new(Point::new(150.0, 150.0), Point::new(250.0, 250.0));
        assert_eq!(drag.to_image_region(view, &image), None);
    }

    #[test]
    fn test_view_transform_clamps_zoom() {
        assert_eq!(ViewTransform::new(0.0).zoom(), ViewTransform::MIN_ZOOM);
        assert_eq!(ViewTransform::new(1000.0).zoom(), ViewTransform::MAX_ZOOM);

        let view = ViewTransform::new(4.0);
        assert_eq!(view.to_image(Point::new(40.0, 8.0)), Point::new(10.0, 2.0));
    }

    #[test]
    fn test_filtered_image_round_trip() {
        let pixels = vec![128u8; 4 * 2 * 3];
        let img = FilteredImage::new(4, 2, pixels);
        assert!(!img.is_empty());

        let rgb = img.to_rgb_image().unwrap();
        assert_eq!(rgb.dimensions(), (4, 2));

        let back = FilteredImage::from_rgb_image(rgb);
        assert_eq!(back, img);
    }

    #[test]
    fn test_filtered_image_empty() {
        let img = FilteredImage::new(0, 0, vec![]);
        assert!(img.is_empty());
    }
}
