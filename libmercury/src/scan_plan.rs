//! Stage-position planning for tissue regions.
//!
//! A region is described by its bounding box in instrument units. The planner covers it
//! with a grid of fields spaced by the scan resolution and visits the grid in serpentine
//! order so consecutive positions are always neighbours.
use serde::{Deserialize, Serialize};

use super::grid::{traverse, Traversal};

/// Autofocus method, numbered as the acquisition software expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusMethod {
    #[default]
    None,
    ImageBased,
    NikonPfs,
}

impl FocusMethod {
    pub fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::ImageBased => 1,
            Self::NikonPfs => 2,
        }
    }
}

/// Bounding box of one tissue region plus how it should be focused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRegion {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub focus: FocusMethod,
    /// Only focus at the first position of the region
    pub focus_first_only: bool,
}

/// A stage position of the final plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPosition {
    pub x: f64,
    pub y: f64,
    pub focus: FocusMethod,
    /// 1-based region number, also the acquisition subgroup folder
    pub subgroup: usize,
}

/// Cover a single region with a serpentine grid of field centres
pub fn create_region_scan(region: &ScanRegion, resolution: f64) -> Vec<(f64, f64)> {
    let res = resolution.abs();
    if res == 0.0 {
        log::warn!("Scan resolution is zero, region produces no positions");
        return vec![];
    }
    let center_x = ((region.max_x + region.min_x) / 2.0).round_ties_even();
    let center_y = ((region.max_y + region.min_y) / 2.0).round_ties_even();
    let dim_x = ((region.max_x - region.min_x).abs() / res).ceil() as usize;
    let dim_y = ((region.max_y - region.min_y).abs() / res).ceil() as usize;
    let start_x = center_x - (dim_x / 2) as f64 * res;
    let start_y = center_y + (dim_y / 2) as f64 * res;

    traverse(Traversal::Serpentine, dim_x, dim_y)
        .map(|cell| {
            (
                start_x + cell.col as f64 * res,
                start_y - cell.row as f64 * res,
            )
        })
        .collect()
}

/// Plan every region in order and merge them into one position list
pub fn pack_regions(regions: &[ScanRegion], resolution: f64) -> Vec<PlannedPosition> {
    let mut plan = Vec::new();
    for (idx, region) in regions.iter().enumerate() {
        let positions = create_region_scan(region, resolution);
        log::info!(
            "Region {} planned with {} positions",
            idx + 1,
            positions.len()
        );
        for (step, (x, y)) in positions.into_iter().enumerate() {
            let focus = if region.focus_first_only && step != 0 {
                FocusMethod::None
            } else {
                region.focus
            };
            plan.push(PlannedPosition {
                x,
                y,
                focus,
                subgroup: idx + 1,
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> ScanRegion {
        ScanRegion {
            min_x,
            max_x,
            min_y,
            max_y,
            focus: FocusMethod::NikonPfs,
            focus_first_only: false,
        }
    }

    #[test]
    fn test_serpentine_positions() {
        let positions = create_region_scan(&region(0.0, 900.0, 0.0, 600.0), 300.0);
        assert_eq!(
            positions,
            vec![
                (150.0, 600.0),
                (450.0, 600.0),
                (750.0, 600.0),
                (750.0, 300.0),
                (450.0, 300.0),
                (150.0, 300.0),
            ]
        );
    }

    #[test]
    fn test_half_centres_round_to_even() {
        assert_eq!(create_region_scan(&region(0.0, 1.0, 0.0, 1.0), 1.0), vec![(0.0, 0.0)]);
        assert_eq!(create_region_scan(&region(0.0, 3.0, 2.0, 3.0), 3.0), vec![(2.0, 2.0)]);
    }

    #[test]
    fn test_degenerate_region_is_empty() {
        assert!(create_region_scan(&region(10.0, 10.0, 0.0, 100.0), 300.0).is_empty());
    }

    #[test]
    fn test_focus_first_only() {
        let mut first = region(0.0, 600.0, 0.0, 300.0);
        first.focus_first_only = true;
        let second = region(0.0, 300.0, 0.0, 300.0);
        let plan = pack_regions(&[first, second], 300.0);
        let focus: Vec<(usize, u8)> = plan.iter().map(|p| (p.subgroup, p.focus.code())).collect();
        assert_eq!(focus, vec![(1, 2), (1, 0), (2, 2)]);
    }
}
