//! Rasterize annotation overlays onto an image.

use std::fs;
use std::path::Path;

use ab_glyph::FontVec;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::error::CurateError;
use crate::voc::BBox;

/// How boxes and labels are drawn.
#[derive(Clone, Debug)]
pub struct RenderStyle {
    pub selected_color: Rgb<u8>,
    pub color: Rgb<u8>,
    /// Outline thickness in pixels, drawn inwards from the box edge.
    pub line_width: u32,
    /// Label height in pixels.
    pub label_size: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            selected_color: Rgb([0, 0, 255]),
            color: Rgb([255, 255, 0]),
            line_width: 4,
            label_size: 20.0,
        }
    }
}

/// One box to draw, in object-list order.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxOverlay {
    /// Index into the session's object list.
    pub index: usize,
    pub bbox: BBox,
    pub label: Option<String>,
    pub selected: bool,
}

/// Load a TrueType/OpenType font for labels.
pub fn load_font(path: &Path) -> Result<FontVec, CurateError> {
    let bytes = fs::read(path)?;
    FontVec::try_from_vec(bytes).map_err(|err| CurateError::Font {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Draw `overlays` on a copy of `image`.
///
/// Labels are drawn at each box's top-left corner when a font is given.
pub fn draw_overlays(
    image: &DynamicImage,
    overlays: &[BoxOverlay],
    style: &RenderStyle,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for overlay in overlays {
        let color = if overlay.selected {
            style.selected_color
        } else {
            style.color
        };

        draw_thick_rect(&mut canvas, &overlay.bbox, style.line_width, color);

        if let (Some(font), Some(label)) = (font, overlay.label.as_deref()) {
            draw_text_mut(
                &mut canvas,
                color,
                overlay.bbox.xmin.round() as i32,
                overlay.bbox.ymin.round() as i32,
                style.label_size,
                font,
                label,
            );
        }
    }

    canvas
}

fn draw_thick_rect(canvas: &mut RgbImage, bbox: &BBox, line_width: u32, color: Rgb<u8>) {
    let [x0, y0, x1, y1] = bbox.rounded();
    if x1 < x0 || y1 < y0 {
        return;
    }

    // Both edges are inclusive.
    let width = (x1 - x0 + 1) as u64;
    let height = (y1 - y0 + 1) as u64;

    for inset in 0..u64::from(line_width.max(1)) {
        if width <= 2 * inset || height <= 2 * inset {
            break;
        }
        let rect = Rect::at((x0 + inset as i64) as i32, (y0 + inset as i64) as i32)
            .of_size((width - 2 * inset) as u32, (height - 2 * inset) as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
