//! Boundary to the external cell-segmentation service.
//!
//! The service itself is not part of this crate. It receives one multichannel image and
//! the model parameters and hands back a label raster of the same size, where 0 is
//! background and any other value is a cell. Labels are flattened to a black-on-white
//! mask and written under the acquisition naming scheme.
use std::path::{Path, PathBuf};
use std::process::Command;

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use super::constants::MULTICHANNEL_SUFFIX;
use super::error::{SegmentationError, TilerError};
use super::field::{list_mask_files, mask_file_name};
use super::palette_mask::PaletteMask;

pub type LabelImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Model parameters forwarded untouched to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationParams {
    pub model_type: String,
    pub diameter: f64,
    pub channel: u32,
    /// Suffix of the multichannel images to segment
    pub image_suffix: String,
    /// Executable invoked as `<command> <input> <output> <model_type> <diameter> <channel>`
    pub command: Option<String>,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            model_type: String::from("cyto3"),
            diameter: 30.0,
            channel: 0,
            image_suffix: String::from(MULTICHANNEL_SUFFIX),
            command: None,
        }
    }
}

pub trait SegmentationService {
    fn segment(
        &self,
        image: &Path,
        params: &SegmentationParams,
    ) -> Result<LabelImage, SegmentationError>;
}

/// Runs an external program that writes the label raster to a temporary PNG
#[derive(Debug, Clone)]
pub struct ExternalCommandService {
    program: String,
    scratch: PathBuf,
}

impl ExternalCommandService {
    pub fn new(program: &str, scratch: &Path) -> Self {
        Self {
            program: program.to_string(),
            scratch: scratch.to_path_buf(),
        }
    }
}

impl SegmentationService for ExternalCommandService {
    fn segment(
        &self,
        image: &Path,
        params: &SegmentationParams,
    ) -> Result<LabelImage, SegmentationError> {
        let output = self.scratch.join("labels.png");
        let status = Command::new(&self.program)
            .arg(image)
            .arg(&output)
            .arg(&params.model_type)
            .arg(params.diameter.to_string())
            .arg(params.channel.to_string())
            .status()?;
        if !status.success() {
            return Err(SegmentationError::ServiceFailed {
                path: image.to_path_buf(),
                reason: format!("{} exited with {status}", self.program),
            });
        }
        let labels = image::open(&output).map_err(|e| SegmentationError::ServiceFailed {
            path: image.to_path_buf(),
            reason: format!("unreadable label image: {e}"),
        })?;
        std::fs::remove_file(&output)?;
        Ok(labels.to_luma16())
    }
}

/// Any non-zero label becomes black foreground on white
pub fn label_to_mask(labels: &LabelImage) -> PaletteMask {
    PaletteMask::from_foreground(labels.width(), labels.height(), |x, y| {
        labels.get_pixel(x, y).0[0] > 0
    })
}

/// Segment every image of `input_dir` in name order and write the masks to `output_dir`.
///
/// `progress` is called after each image with the fraction done.
pub fn segment_folder<S: SegmentationService, F: FnMut(f32)>(
    service: &S,
    params: &SegmentationParams,
    input_dir: &Path,
    output_dir: &Path,
    start_index: u32,
    mask_suffix: &str,
    mut progress: F,
) -> Result<Vec<PathBuf>, SegmentationError> {
    if !input_dir.exists() {
        return Err(SegmentationError::BadFilePath(input_dir.to_path_buf()));
    }
    let images = list_mask_files(input_dir, &params.image_suffix).map_err(|e| match e {
        TilerError::IOError(source) => SegmentationError::IOError(source),
        _ => SegmentationError::BadFilePath(input_dir.to_path_buf()),
    })?;
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)?;
    }
    log::info!("Segmenting {} images from {input_dir:?}", images.len());

    let mut written = Vec::with_capacity(images.len());
    for (idx, image) in images.iter().enumerate() {
        let labels = service.segment(image, params)?;
        let path = output_dir.join(mask_file_name(start_index, idx, mask_suffix));
        label_to_mask(&labels).save(&path)?;
        written.push(path);
        progress((idx + 1) as f32 / images.len() as f32);
    }
    Ok(written)
}
