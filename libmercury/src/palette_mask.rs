use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};

use super::constants::{BLACK, MAX_PALETTE_SIZE, WHITE};
use super::error::MaskError;

/// Axis-aligned pixel rectangle `[left, top, right, bottom)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelBox {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// `[w, n, e, s]` as written to the coordinate tables
    pub fn as_array(&self) -> [u32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    fn clamp(&self, width: u32, height: u32) -> Self {
        let left = self.left.min(width);
        let top = self.top.min(height);
        Self {
            left,
            top,
            right: self.right.min(width).max(left),
            bottom: self.bottom.min(height).max(top),
        }
    }
}

/// A palette raster: one palette index per pixel plus a table of at most 256 colours.
///
/// Foreground is anything that is not the palette's white entry. Colour images are
/// quantised exactly (each distinct colour gets an entry), which is lossless for the
/// two-colour masks the segmentation step produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteMask {
    indices: GrayImage,
    palette: Vec<[u8; 3]>,
}

impl PaletteMask {
    /// An all-white mask
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            indices: GrayImage::from_pixel(width, height, Luma([0])),
            palette: vec![WHITE],
        }
    }

    /// Black where `foreground` holds, white elsewhere
    pub fn from_foreground<F: Fn(u32, u32) -> bool>(width: u32, height: u32, foreground: F) -> Self {
        Self {
            indices: GrayImage::from_fn(width, height, |x, y| Luma([foreground(x, y) as u8])),
            palette: vec![WHITE, BLACK],
        }
    }

    /// Build from raw parts, checking every index refers into the palette
    pub fn from_parts(indices: GrayImage, palette: Vec<[u8; 3]>) -> Result<Self, MaskError> {
        if palette.len() > MAX_PALETTE_SIZE {
            return Err(MaskError::PaletteOverflow);
        }
        if let Some(bad) = indices.pixels().find(|p| p.0[0] as usize >= palette.len()) {
            return Err(MaskError::BadPaletteIndex(bad.0[0]));
        }
        Ok(Self { indices, palette })
    }

    pub fn from_rgb(image: &RgbImage) -> Result<Self, MaskError> {
        let mut palette: Vec<[u8; 3]> = Vec::new();
        let mut indices = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let idx = find_or_insert(&mut palette, pixel.0)?;
            indices.put_pixel(x, y, Luma([idx]));
        }
        Ok(Self { indices, palette })
    }

    /// 8-bit indexed PNGs keep their palette table as stored; anything else is quantised
    pub fn open(path: &Path) -> Result<Self, MaskError> {
        if !path.exists() {
            return Err(MaskError::BadFilePath(path.to_path_buf()));
        }
        if let Some(mask) = Self::open_indexed(path)? {
            return Ok(mask);
        }
        let image = image::open(path).map_err(|source| MaskError::ImageError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_rgb(&image.to_rgb8())
    }

    fn open_indexed(path: &Path) -> Result<Option<Self>, MaskError> {
        let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut reader = match decoder.read_info() {
            Ok(reader) => reader,
            Err(_) => return Ok(None),
        };
        let info = reader.info();
        if info.color_type != png::ColorType::Indexed || info.bit_depth != png::BitDepth::Eight {
            return Ok(None);
        }
        let (width, height) = (info.width, info.height);
        let palette: Vec<[u8; 3]> = match &info.palette {
            Some(table) => table.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            None => return Ok(None),
        };
        let mut buffer = vec![0; reader.output_buffer_size()];
        let frame = reader
            .next_frame(&mut buffer)
            .map_err(|source| MaskError::PngDecodingError {
                path: path.to_path_buf(),
                source,
            })?;
        buffer.truncate(frame.buffer_size());
        let indices = GrayImage::from_raw(width, height, buffer)
            .ok_or_else(|| MaskError::BadFilePath(path.to_path_buf()))?;
        Self::from_parts(indices, palette).map(Some)
    }

    /// Expand palette indices back to colours
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            Rgb(self.palette[self.indices.get_pixel(x, y).0[0] as usize])
        })
    }

    /// Written as an 8-bit indexed PNG carrying this mask's palette table
    pub fn save(&self, path: &Path) -> Result<(), MaskError> {
        let to_mask_error = |source: png::EncodingError| MaskError::PngEncodingError {
            path: path.to_path_buf(),
            source,
        };
        let writer = BufWriter::new(File::create(path)?);
        let mut encoder = png::Encoder::new(writer, self.width(), self.height());
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(self.palette.concat());
        let mut writer = encoder.write_header().map_err(to_mask_error)?;
        writer
            .write_image_data(self.indices.as_raw())
            .map_err(to_mask_error)?;
        writer.finish().map_err(to_mask_error)
    }

    pub fn width(&self) -> u32 {
        self.indices.width()
    }

    pub fn height(&self) -> u32 {
        self.indices.height()
    }

    pub fn palette(&self) -> &[[u8; 3]] {
        &self.palette
    }

    /// Index of the first palette entry that is exactly `(255, 255, 255)`
    pub fn white_index(&self) -> Option<u8> {
        self.palette
            .iter()
            .position(|colour| *colour == WHITE)
            .map(|idx| idx as u8)
    }

    /// Pixels that are not white. Without a white palette entry every pixel counts.
    pub fn count_foreground(&self) -> u64 {
        match self.white_index() {
            Some(white) => self.indices.pixels().filter(|p| p.0[0] != white).count() as u64,
            None => self.indices.pixels().count() as u64,
        }
    }

    /// Copy out a region, clipped to the mask bounds. The palette is kept as is.
    pub fn crop(&self, area: &PixelBox) -> Self {
        let area = area.clamp(self.width(), self.height());
        let indices =
            image::imageops::crop_imm(&self.indices, area.left, area.top, area.width(), area.height())
                .to_image();
        Self {
            indices,
            palette: self.palette.clone(),
        }
    }

    /// Paste `other` with its top-left corner at `(x, y)`, clipping anything off-canvas.
    /// Colours of `other` missing from this palette are appended.
    pub fn paste(&mut self, other: &PaletteMask, x: i64, y: i64) -> Result<(), MaskError> {
        let mut remap = [0u8; MAX_PALETTE_SIZE];
        for (src_idx, colour) in other.palette.iter().enumerate() {
            remap[src_idx] = find_or_insert(&mut self.palette, *colour)?;
        }
        for (ox, oy, pixel) in other.indices.enumerate_pixels() {
            let tx = x + ox as i64;
            let ty = y + oy as i64;
            if tx < 0 || ty < 0 || tx >= self.width() as i64 || ty >= self.height() as i64 {
                continue;
            }
            self.indices
                .put_pixel(tx as u32, ty as u32, Luma([remap[pixel.0[0] as usize]]));
        }
        Ok(())
    }

    /// Same size and palette, every pixel white
    pub fn blank_like(&self) -> Self {
        let mut palette = self.palette.clone();
        let white = match palette.iter().position(|c| *c == WHITE) {
            Some(idx) => idx as u8,
            None if palette.len() < MAX_PALETTE_SIZE => {
                palette.push(WHITE);
                (palette.len() - 1) as u8
            }
            None => {
                palette = vec![WHITE];
                0
            }
        };
        Self {
            indices: GrayImage::from_pixel(self.width(), self.height(), Luma([white])),
            palette,
        }
    }

    pub fn flip_horizontal(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.indices);
    }

    pub fn flip_vertical(&mut self) {
        image::imageops::flip_vertical_in_place(&mut self.indices);
    }
}

fn find_or_insert(palette: &mut Vec<[u8; 3]>, colour: [u8; 3]) -> Result<u8, MaskError> {
    if let Some(idx) = palette.iter().position(|c| *c == colour) {
        return Ok(idx as u8);
    }
    if palette.len() >= MAX_PALETTE_SIZE {
        return Err(MaskError::PaletteOverflow);
    }
    palette.push(colour);
    Ok((palette.len() - 1) as u8)
}
