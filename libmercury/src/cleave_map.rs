use std::path::{Path, PathBuf};

use super::constants::BLANK_MASK_SIZE;
use super::error::MaskError;
use super::fluidic::Round;
use super::palette_mask::{PaletteMask, PixelBox};

/// File name of the cleave map for round `index`
pub fn cleave_map_file_name(index: usize) -> String {
    format!("Round {index}.png")
}

/// White canvas the size of `global` with only the crops under `boxes` copied back
pub fn render_cleave_map(global: &PaletteMask, boxes: &[PixelBox]) -> Result<PaletteMask, MaskError> {
    let mut map = global.blank_like();
    for area in boxes.iter() {
        let region = global.crop(area);
        map.paste(&region, area.left as i64, area.top as i64)?;
    }
    Ok(map)
}

/// Placeholder mask handed to the laser when no cleave map is loaded
pub fn blank_mask() -> PaletteMask {
    PaletteMask::blank(BLANK_MASK_SIZE, BLANK_MASK_SIZE)
}

/// Write one cleave map per round. `boxes[i]` is the pixel box of round member `i`.
pub fn write_cleave_maps(
    global: &PaletteMask,
    boxes: &[PixelBox],
    rounds: &[Round],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, MaskError> {
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)?;
    }
    let mut written = Vec::with_capacity(rounds.len());
    for (idx, round) in rounds.iter().enumerate() {
        let round_boxes: Vec<PixelBox> = round
            .members
            .iter()
            .filter_map(|member| boxes.get(*member).copied())
            .collect();
        let path = output_dir.join(cleave_map_file_name(idx));
        render_cleave_map(global, &round_boxes)?.save(&path)?;
        log::info!(
            "Round {idx}: port {} cleaves {} areas",
            round.port,
            round_boxes.len()
        );
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BLACK, WHITE};
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    fn striped_mask() -> PaletteMask {
        // Everything black except the bottom row
        let mut indices = GrayImage::from_pixel(10, 10, Luma([1]));
        for x in 0..10 {
            indices.put_pixel(x, 9, Luma([0]));
        }
        PaletteMask::from_parts(indices, vec![WHITE, BLACK]).unwrap()
    }

    #[test]
    fn test_only_listed_boxes_survive() {
        let global = striped_mask();
        let map = render_cleave_map(
            &global,
            &[PixelBox::new(0, 0, 5, 5), PixelBox::new(5, 5, 10, 10)],
        )
        .unwrap();
        assert_eq!((map.width(), map.height()), (10, 10));
        assert_eq!(map.count_foreground(), 25 + 20);
        assert_eq!(render_cleave_map(&global, &[]).unwrap().count_foreground(), 0);
    }

    #[test]
    fn test_blank_mask() {
        let mask = blank_mask();
        assert_eq!((mask.width(), mask.height()), (1024, 1024));
        assert_eq!(mask.count_foreground(), 0);
    }

    #[test]
    fn test_write_rounds() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("image_cleave_map");
        let global = striped_mask();
        let boxes = [PixelBox::new(0, 0, 5, 5), PixelBox::new(5, 0, 10, 5)];
        let rounds = [
            Round {
                slot: 0,
                port: 1,
                members: vec![0, 1],
            },
            Round {
                slot: 1,
                port: 2,
                members: vec![1],
            },
        ];
        let written = write_cleave_maps(&global, &boxes, &rounds, &output).unwrap();
        assert_eq!(
            written,
            vec![output.join("Round 0.png"), output.join("Round 1.png")]
        );
        assert_eq!(PaletteMask::open(&written[0]).unwrap().count_foreground(), 50);
        assert_eq!(PaletteMask::open(&written[1]).unwrap().count_foreground(), 25);
    }
}
