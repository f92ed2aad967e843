use crate::ports::Port;

/// Ports wired on the default fluidic rig. Port 20 is not connected.
pub const DEFAULT_PORTS: [Port; 20] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 21,
];

pub const DEFAULT_CONCATENATIONS: usize = 5;
pub const DEFAULT_FIELD_SIZE_UM: f64 = 366.0;
pub const DEFAULT_CLEAVE_SIZE_UM: f64 = 300.0;
pub const DEFAULT_PX_PER_UM: f64 = 1.0;
pub const DEFAULT_SUBDIVISION: u32 = 3;
pub const DEFAULT_MIN_FOREGROUND_PX: u64 = 100;
pub const DEFAULT_SCAN_RESOLUTION: f64 = 300.0;

pub const MASK_START_INDEX: u32 = 1000;
pub const MASK_SUFFIX: &str = "_MC_F001_Z001.png";
pub const MULTICHANNEL_SUFFIX: &str = ".tif";

/// Seconds spent on every command in a fluidic table
pub const DWELL_TIME_S: f64 = 5.0;
/// Four one-minute flushes plus a fifteen minute incubation whenever the port changes
pub const PORT_SWITCH_S: f64 = 60.0 * 4.0 + 900.0;

/// Upper bound on candidate tuples visited when enumerating digit sequences
pub const MAX_DIGIT_CANDIDATES: u128 = 1 << 24;

pub const WHITE: [u8; 3] = [255, 255, 255];
pub const BLACK: [u8; 3] = [0, 0, 0];
pub const MAX_PALETTE_SIZE: usize = 256;
pub const BLANK_MASK_SIZE: u32 = 1024;

// Experiment folder layout
pub const MULTICHANNEL_DIR: &str = "image_multichannel";
pub const MASK_DIR: &str = "image_mask";
pub const CLEAVE_MAP_DIR: &str = "image_cleave_map";
pub const PLANNED_COORDS: &str = "coord_planned.csv";
pub const RECORDED_COORDS: &str = "coord_recorded.csv";
pub const GLOBAL_MASK: &str = "image_mask_global.png";
pub const SCAN_CENTERS: &str = "coord_scan_center.csv";
pub const BIT_SCHEME: &str = "config_bit_scheme.csv";
pub const CLEAVE_CYCLE: &str = "_cleave_cycle.csv";
pub const TEMP_MASK: &str = "image_mask_tmp.png";
