//! Stitching per-field masks into one global mask and cutting it into laser targets.
//!
//! The canvas is partitioned into cleave regions (the laser footprint) visited in
//! serpentine order. Each region is split row-major into `subdivision_factor²` sub-cells
//! and a sub-cell survives only if its crop of the global mask holds more than
//! `min_foreground_px` foreground pixels.
use std::path::{Path, PathBuf};

use super::canvas::{compute_canvas_geometry, CanvasGeometry};
use super::constants::{
    DEFAULT_CLEAVE_SIZE_UM, DEFAULT_FIELD_SIZE_UM, DEFAULT_MIN_FOREGROUND_PX, DEFAULT_PX_PER_UM,
    DEFAULT_SUBDIVISION, MASK_SUFFIX,
};
use super::error::TilerError;
use super::field::{list_mask_files, Coordinate, ImagingField};
use super::grid::{traverse, Traversal};
use super::palette_mask::{PaletteMask, PixelBox};

/// Parameters of the tiler, projected out of the experiment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TilerParams {
    pub field_size_um: f64,
    pub cleave_size_um: f64,
    pub px_per_um: f64,
    pub subdivision_factor: u32,
    pub min_foreground_px: u64,
    pub mask_suffix: String,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for TilerParams {
    fn default() -> Self {
        Self {
            field_size_um: DEFAULT_FIELD_SIZE_UM,
            cleave_size_um: DEFAULT_CLEAVE_SIZE_UM,
            px_per_um: DEFAULT_PX_PER_UM,
            subdivision_factor: DEFAULT_SUBDIVISION,
            min_foreground_px: DEFAULT_MIN_FOREGROUND_PX,
            mask_suffix: String::from(MASK_SUFFIX),
            flip_horizontal: true,
            flip_vertical: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalMask {
    pub mask: PaletteMask,
    pub geometry: CanvasGeometry,
}

/// One coarse grid cell, sized to the laser cleave footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleaveRegion {
    /// Position in serpentine visiting order
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub center_x_um: f64,
    pub center_y_um: f64,
    pub center_x_px: f64,
    pub center_y_px: f64,
    pub bbox: PixelBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubCell {
    /// Index of the parent cleave region
    pub region_index: usize,
    pub row: u32,
    pub col: u32,
    pub center_x_um: f64,
    pub center_y_um: f64,
    pub bbox: PixelBox,
}

impl SubCell {
    pub fn xy(&self) -> (f64, f64) {
        (self.center_x_um, self.center_y_um)
    }
}

/// Outcome of [`global_mask_stitching`]. Callers must check `successful` first; a failed
/// result carries no mask and empty collections.
#[derive(Debug, Clone, PartialEq)]
pub struct TilingResult {
    pub successful: bool,
    pub global_mask: Option<GlobalMask>,
    pub fields: Vec<ImagingField>,
    pub regions: Vec<CleaveRegion>,
    pub sub_cells: Vec<SubCell>,
}

impl TilingResult {
    pub fn failed() -> Self {
        Self {
            successful: false,
            global_mask: None,
            fields: Vec::new(),
            regions: Vec::new(),
            sub_cells: Vec::new(),
        }
    }
}

/// Paste every field's mask onto a blank canvas at its projected position
pub fn stitch(
    fields: &[ImagingField],
    geometry: &CanvasGeometry,
    params: &TilerParams,
) -> Result<GlobalMask, TilerError> {
    let mut canvas = PaletteMask::blank(geometry.width_px, geometry.height_px);
    for field in fields.iter() {
        let mut mask = PaletteMask::open(&field.mask_path)?;
        if params.flip_horizontal {
            mask.flip_horizontal();
        }
        if params.flip_vertical {
            mask.flip_vertical();
        }
        let (x, y) = geometry.paste_position(field.x, field.y);
        canvas.paste(&mask, x, y)?;
    }
    Ok(GlobalMask {
        mask: canvas,
        geometry: *geometry,
    })
}

pub fn iterate_cleave_grid(geometry: &CanvasGeometry) -> Vec<CleaveRegion> {
    traverse(
        Traversal::Serpentine,
        geometry.dim_x as usize,
        geometry.dim_y as usize,
    )
    .map(|cell| {
        let (row, col) = (cell.row as u32, cell.col as u32);
        let (center_x_um, center_y_um) = geometry.cleave_center(row, col);
        let (center_x_px, center_y_px) = geometry.to_pixel(center_x_um, center_y_um);
        CleaveRegion {
            index: cell.index,
            row,
            col,
            center_x_um,
            center_y_um,
            center_x_px,
            center_y_px,
            bbox: geometry.pixel_box(center_x_um, center_y_um, geometry.cleave_size_um),
        }
    })
    .collect()
}

/// Split a region into `division_factor²` equal cells, row-major
pub fn subdivide(
    region: &CleaveRegion,
    division_factor: u32,
    geometry: &CanvasGeometry,
) -> Vec<SubCell> {
    if division_factor == 0 {
        return Vec::new();
    }
    let sub_size = geometry.cleave_size_um / division_factor as f64;
    let middle = (division_factor as f64 - 1.0) / 2.0;
    traverse(
        Traversal::RowMajor,
        division_factor as usize,
        division_factor as usize,
    )
    .map(|cell| {
        let center_x_um = region.center_x_um + (cell.col as f64 - middle) * sub_size;
        let center_y_um = region.center_y_um - (cell.row as f64 - middle) * sub_size;
        SubCell {
            region_index: region.index,
            row: cell.row as u32,
            col: cell.col as u32,
            center_x_um,
            center_y_um,
            bbox: geometry.pixel_box(center_x_um, center_y_um, sub_size),
        }
    })
    .collect()
}

/// True if the cell's crop holds strictly more than `min_foreground_px` foreground pixels
pub fn prune_empty(cell: &SubCell, mask: &PaletteMask, min_foreground_px: u64) -> bool {
    mask.crop(&cell.bbox).count_foreground() > min_foreground_px
}

/// Index of the position closest to `point`. The first of equally close positions wins.
pub fn nearest_field_for_point(positions: &[(f64, f64)], point: (f64, f64)) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, (x, y)) in positions.iter().enumerate() {
        let distance = ((x - point.0).powi(2) + (y - point.1).powi(2)).sqrt();
        if distance == 0.0 {
            return Some(idx);
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => (),
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Stitch the masks of `mask_dir` against `coordinates` and cut the result into retained
/// sub-cells.
///
/// Masks are paired with coordinate rows by sorted file name. If the counts differ the
/// returned result is marked unsuccessful.
pub fn global_mask_stitching(
    mask_dir: &Path,
    coordinates: &[Coordinate],
    params: &TilerParams,
) -> Result<TilingResult, TilerError> {
    let mask_files: Vec<PathBuf> = list_mask_files(mask_dir, &params.mask_suffix)?;
    log::info!(
        "Found {} mask images and {} coordinate rows",
        mask_files.len(),
        coordinates.len()
    );
    if mask_files.len() != coordinates.len() {
        log::warn!(
            "Number of mask images ({}) does not match number of coordinates ({})",
            mask_files.len(),
            coordinates.len()
        );
        return Ok(TilingResult::failed());
    }

    let fields: Vec<ImagingField> = coordinates
        .iter()
        .zip(mask_files)
        .map(|(coord, path)| ImagingField::new(coord, path))
        .collect();
    let centers: Vec<(f64, f64)> = fields.iter().map(|f| f.xy()).collect();
    let geometry = compute_canvas_geometry(
        &centers,
        params.field_size_um,
        params.cleave_size_um,
        params.px_per_um,
    )?;
    log::info!(
        "Cleave grid is {} x {} over a {} x {} px canvas",
        geometry.dim_x,
        geometry.dim_y,
        geometry.width_px,
        geometry.height_px
    );

    let global_mask = stitch(&fields, &geometry, params)?;
    let regions = iterate_cleave_grid(&geometry);
    let sub_cells: Vec<SubCell> = regions
        .iter()
        .flat_map(|region| subdivide(region, params.subdivision_factor, &geometry))
        .filter(|cell| prune_empty(cell, &global_mask.mask, params.min_foreground_px))
        .collect();
    log::info!(
        "Retained {} of {} sub-cells",
        sub_cells.len(),
        regions.len() * (params.subdivision_factor as usize).pow(2)
    );

    Ok(TilingResult {
        successful: true,
        global_mask: Some(global_mask),
        fields,
        regions,
        sub_cells,
    })
}
