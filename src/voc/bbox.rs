//! Pixel-space bounding boxes in XYXY order.

use serde::Serialize;

/// An axis-aligned bounding box (xmin, ymin, xmax, ymax) in image pixels.
///
/// The constructor does not enforce `min < max`; VOC files in the wild carry
/// inverted or degenerate boxes and those must survive a load/save cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Integer pixel window inside an image, `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelWindow {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelWindow {
    #[inline]
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl BBox {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// The four coordinates rounded to the nearest integer.
    pub fn rounded(&self) -> [i64; 4] {
        [
            self.xmin.round() as i64,
            self.ymin.round() as i64,
            self.xmax.round() as i64,
            self.ymax.round() as i64,
        ]
    }

    /// Grow the box by `margin` pixels on every side and clamp the result
    /// to `[0, width] x [0, height]`.
    pub fn expand_clamped(&self, margin: f64, width: u32, height: u32) -> PixelWindow {
        let clamp = |value: f64, limit: u32| -> u32 {
            if value.is_nan() {
                return 0;
            }
            value.round().clamp(0.0, f64::from(limit)) as u32
        };

        PixelWindow {
            x0: clamp(self.xmin - margin, width),
            y0: clamp(self.ymin - margin, height),
            x1: clamp(self.xmax + margin, width),
            y1: clamp(self.ymax + margin, height),
        }
    }
}
