//! # mercury
//!
//! mercury is a planning toolkit for an automated imaging and microfluidics barcoding rig,
//! written in Rust. It plans stage positions over tissue regions, stitches the masks
//! produced for every imaging field into one global mask, cuts that mask into laser cleave
//! targets and assigns each target (or each field) a unique combinatorial identifier,
//! which is then expanded into the ordered list of port deliveries the instrument runs.
//!
//! mercury only plans and verifies. The laser, the fluidics pump and the stage are driven
//! by separate instrument software which consumes the CSV and PNG files written here.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./mercury_cli` from the top
//! level repository. The binary will be installed to your cargo install location
//! (typically something like `~/.cargo/bin/`).
//!
//! ## Configuration
//!
//! An experiment is described by one YAML file. `mercury_cli new -p config.yml` writes a
//! template with the defaults of the standard rig:
//!
//! ```yml
//! experiment_path: /home/user/Desktop/latest_2024-07-30
//! port_list: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 21]
//! scheme:
//!   mode: fixed_weight
//!   weight: 5
//! field_size_um: 366.0
//! cleave_size_um: 300.0
//! px_per_um: 1.0
//! subdivision_factor: 3
//! min_foreground_px: 100
//! mask_start_index: 1000
//! mask_suffix: _MC_F001_Z001.png
//! flip_horizontal: true
//! flip_vertical: true
//! dwell_time_s: 5.0
//! port_switch_s: 1140.0
//! scan_resolution: 300.0
//! scan_regions: []
//! segmentation:
//!   model_type: cyto3
//!   diameter: 30.0
//!   channel: 0
//!   image_suffix: .tif
//!   command: null
//! ```
//!
//! - `port_list`: the ports wired on the rig, in order. Gaps are allowed, duplicates are not.
//! - `scheme`: either `fixed_weight` (bit vectors with exactly `weight` ones, one slot per
//! port) or `digit_tuple` with an `alphabet_size` (digit `d` addresses the `d`-th port,
//! `0` leaves the slot unused).
//! - `subdivision_factor` / `min_foreground_px`: every cleave region is split into
//! `subdivision_factor²` sub-cells and a sub-cell is only targeted if it holds more than
//! `min_foreground_px` mask pixels.
//! - `dwell_time_s` / `port_switch_s`: cost model used for run time estimates.
//!
//! ## Experiment Folder
//!
//! ```text
//! latest_<date>
//! |---- coord_planned.csv         planned field centres
//! |---- coord_recorded.csv        positions and focus recorded by the microscope
//! |---- image_multichannel/       acquired images
//! |---- image_mask/               one mask per field, named <1000 + index><mask_suffix>
//! |---- image_mask_global.png     stitched mask
//! |---- image_mask_tmp.png        blank 1024x1024 laser mask
//! |---- image_cleave_map/         Round <i>.png, one per delivery round
//! |---- coord_scan_center.csv     cleave region centres: x,y,z,w,n,e,s
//! |---- config_bit_scheme.csv     retained sub-cells: x,y,w,n,e,s,index,bit
//! |---- _cleave_cycle.csv         fluidic table: x,y,z,mask,port
//! ```
//!
//! ## Output
//!
//! Besides the files above, the CLI writes a log file `mercury.log` in the working
//! directory. Files written before a failing step are kept.

pub mod bit_scheme;
pub mod canvas;
pub mod cleave_map;
pub mod config;
pub mod constants;
pub mod coordinates;
pub mod error;
pub mod field;
pub mod fluidic;
pub mod grid;
pub mod palette_mask;
pub mod ports;
pub mod process;
pub mod scan_plan;
pub mod segmentation;
pub mod tiler;
pub mod worker_status;
