use super::error::TilerError;
use super::palette_mask::PixelBox;

/// The shared physical <-> pixel frame of the global mask.
///
/// Physical y grows upwards, pixel y grows downwards. `origin_x_um`/`origin_y_um` is the
/// physical point under pixel `(0, 0)`; both directions of the transform are derived from
/// it, so pastes and crops always agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    /// Cleave grid columns
    pub dim_x: u32,
    /// Cleave grid rows
    pub dim_y: u32,
    pub width_px: u32,
    pub height_px: u32,
    pub origin_x_um: f64,
    pub origin_y_um: f64,
    pub px_per_um: f64,
    pub field_size_um: f64,
    pub cleave_size_um: f64,
}

fn check_positive(name: &'static str, value: f64) -> Result<(), TilerError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(TilerError::InvalidParameter { name, value })
    }
}

/// Size the cleave grid to cover every field and centre the field extent inside it
pub fn compute_canvas_geometry(
    coords: &[(f64, f64)],
    field_size_um: f64,
    cleave_size_um: f64,
    px_per_um: f64,
) -> Result<CanvasGeometry, TilerError> {
    check_positive("field_size_um", field_size_um)?;
    check_positive("cleave_size_um", cleave_size_um)?;
    check_positive("px_per_um", px_per_um)?;
    if coords.is_empty() {
        return Err(TilerError::NoFields);
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in coords.iter() {
        min_x = min_x.min(*x);
        max_x = max_x.max(*x);
        min_y = min_y.min(*y);
        max_y = max_y.max(*y);
    }
    let range_x = max_x - min_x;
    let range_y = max_y - min_y;

    let dim_x = ((range_x + field_size_um) / cleave_size_um).ceil() as u32;
    let dim_y = ((range_y + field_size_um) / cleave_size_um).ceil() as u32;
    let span_x_um = dim_x as f64 * cleave_size_um;
    let span_y_um = dim_y as f64 * cleave_size_um;

    Ok(CanvasGeometry {
        dim_x,
        dim_y,
        width_px: (span_x_um * px_per_um).round() as u32,
        height_px: (span_y_um * px_per_um).round() as u32,
        origin_x_um: (min_x + max_x) / 2.0 - span_x_um / 2.0,
        origin_y_um: (min_y + max_y) / 2.0 + span_y_um / 2.0,
        px_per_um,
        field_size_um,
        cleave_size_um,
    })
}

/// Round an edge coordinate to whole pixels, ignoring float noise below a micro-pixel
fn pixel_edge(value: f64) -> u32 {
    ((value * 1e6).round() / 1e6).round().max(0.0) as u32
}

impl CanvasGeometry {
    pub fn to_pixel(&self, x_um: f64, y_um: f64) -> (f64, f64) {
        (
            (x_um - self.origin_x_um) * self.px_per_um,
            (self.origin_y_um - y_um) * self.px_per_um,
        )
    }

    pub fn to_physical(&self, x_px: f64, y_px: f64) -> (f64, f64) {
        (
            self.origin_x_um + x_px / self.px_per_um,
            self.origin_y_um - y_px / self.px_per_um,
        )
    }

    /// Top-left pixel at which a field image centred on `(x_um, y_um)` is pasted
    pub fn paste_position(&self, x_um: f64, y_um: f64) -> (i64, i64) {
        let half = self.field_size_um / 2.0;
        let (px, py) = self.to_pixel(x_um - half, y_um + half);
        (px.floor() as i64, py.floor() as i64)
    }

    /// Pixel box of a square of side `size_um` centred on `(x_um, y_um)`.
    /// Every edge is rounded on its own, so boxes sharing an edge in micrometres share it
    /// in pixels too.
    pub fn pixel_box(&self, x_um: f64, y_um: f64, size_um: f64) -> PixelBox {
        let half = size_um / 2.0;
        let (left, top) = self.to_pixel(x_um - half, y_um + half);
        let (right, bottom) = self.to_pixel(x_um + half, y_um - half);
        PixelBox::new(
            pixel_edge(left),
            pixel_edge(top),
            pixel_edge(right),
            pixel_edge(bottom),
        )
    }

    /// Physical centre of the cleave cell at `(row, col)`
    pub fn cleave_center(&self, row: u32, col: u32) -> (f64, f64) {
        (
            self.origin_x_um + (col as f64 + 0.5) * self.cleave_size_um,
            self.origin_y_um - (row as f64 + 0.5) * self.cleave_size_um,
        )
    }
}
