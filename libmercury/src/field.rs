use std::path::{Path, PathBuf};

use super::error::TilerError;

/// A physical position on the sample exactly as read from the coordinate CSV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// An imaging field: a planned centre coordinate and the mask image taken there.
///
/// Fields keep the row order of the coordinate file; that order is how masks, identifiers
/// and commands are paired up, so it must never be re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingField {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub mask_path: PathBuf,
}

impl ImagingField {
    pub fn new(coordinate: &Coordinate, mask_path: PathBuf) -> Self {
        Self {
            x: coordinate.x,
            y: coordinate.y,
            z: coordinate.z,
            mask_path,
        }
    }

    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Mask file name predicted by the acquisition naming scheme
pub fn mask_file_name(start_index: u32, field_index: usize, suffix: &str) -> String {
    format!("{}{suffix}", start_index as usize + field_index)
}

/// Pair coordinates with the mask names the acquisition software will produce for them
pub fn fields_from_naming_scheme(
    coordinates: &[Coordinate],
    mask_dir: &Path,
    start_index: u32,
    suffix: &str,
) -> Vec<ImagingField> {
    coordinates
        .iter()
        .enumerate()
        .map(|(idx, coord)| {
            ImagingField::new(
                coord,
                mask_dir.join(mask_file_name(start_index, idx, suffix)),
            )
        })
        .collect()
}

/// All file names in `dir` ending with `suffix`, sorted by name.
///
/// Sorted name order is taken to be field order; the numeric naming scheme keeps the two
/// in step as long as every name has the same number of digits.
pub fn list_mask_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, TilerError> {
    if !dir.exists() {
        return Err(TilerError::BadMaskFolder(dir.to_path_buf()));
    }
    let mut file_list: Vec<PathBuf> = Vec::new();
    for item in dir.read_dir()? {
        let item_path = item?.path();
        let matches = item_path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(suffix))
            .unwrap_or(false);
        if matches && item_path.is_file() {
            file_list.push(item_path);
        }
    }
    file_list.sort();
    Ok(file_list)
}
