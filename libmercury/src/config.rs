use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::bit_scheme::SchemeMode;
use super::constants::*;
use super::error::ConfigError;
use super::fluidic::TimeModel;
use super::ports::PortList;
use super::scan_plan::ScanRegion;
use super::segmentation::SegmentationParams;
use super::tiler::TilerParams;

/// Structure representing the experiment configuration. Contains the experiment folder, the
/// rig's port list and every planning parameter.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub experiment_path: PathBuf,
    pub port_list: PortList,
    pub scheme: SchemeMode,
    pub field_size_um: f64,
    pub cleave_size_um: f64,
    pub px_per_um: f64,
    pub subdivision_factor: u32,
    pub min_foreground_px: u64,
    pub mask_start_index: u32,
    pub mask_suffix: String,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub dwell_time_s: f64,
    pub port_switch_s: f64,
    pub scan_resolution: f64,
    pub scan_regions: Vec<ScanRegion>,
    pub segmentation: SegmentationParams,
}

/// `~/Desktop/latest_<today>`
fn default_experiment_path() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default();
    let today = time::OffsetDateTime::now_utc().date();
    home.join("Desktop").join(format!("latest_{today}"))
}

impl Default for Config {
    /// Generate a new Config object with the default rig and planning parameters
    fn default() -> Self {
        Self {
            experiment_path: default_experiment_path(),
            port_list: PortList::default(),
            scheme: SchemeMode::default(),
            field_size_um: DEFAULT_FIELD_SIZE_UM,
            cleave_size_um: DEFAULT_CLEAVE_SIZE_UM,
            px_per_um: DEFAULT_PX_PER_UM,
            subdivision_factor: DEFAULT_SUBDIVISION,
            min_foreground_px: DEFAULT_MIN_FOREGROUND_PX,
            mask_start_index: MASK_START_INDEX,
            mask_suffix: String::from(MASK_SUFFIX),
            flip_horizontal: true,
            flip_vertical: true,
            dwell_time_s: DWELL_TIME_S,
            port_switch_s: PORT_SWITCH_S,
            scan_resolution: DEFAULT_SCAN_RESOLUTION,
            scan_regions: Vec::new(),
            segmentation: SegmentationParams::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration as YAML
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    pub fn tiler_params(&self) -> TilerParams {
        TilerParams {
            field_size_um: self.field_size_um,
            cleave_size_um: self.cleave_size_um,
            px_per_um: self.px_per_um,
            subdivision_factor: self.subdivision_factor,
            min_foreground_px: self.min_foreground_px,
            mask_suffix: self.mask_suffix.clone(),
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
        }
    }

    pub fn time_model(&self) -> TimeModel {
        TimeModel {
            dwell_time_s: self.dwell_time_s,
            port_switch_s: self.port_switch_s,
        }
    }

    /// Get the path to an input that must already exist
    fn get_existing(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let path = self.experiment_path.join(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::BadFilePath(path))
        }
    }

    pub fn get_multichannel_directory(&self) -> Result<PathBuf, ConfigError> {
        self.get_existing(MULTICHANNEL_DIR)
    }

    pub fn get_mask_directory(&self) -> Result<PathBuf, ConfigError> {
        self.get_existing(MASK_DIR)
    }

    pub fn get_planned_coordinates(&self) -> Result<PathBuf, ConfigError> {
        self.get_existing(PLANNED_COORDS)
    }

    pub fn get_recorded_coordinates(&self) -> Result<PathBuf, ConfigError> {
        self.get_existing(RECORDED_COORDS)
    }

    pub fn get_fluidic_table(&self) -> Result<PathBuf, ConfigError> {
        self.get_existing(CLEAVE_CYCLE)
    }

    /// Output paths below need only the experiment folder to exist
    fn get_output(&self, name: &str) -> Result<PathBuf, ConfigError> {
        if self.experiment_path.exists() {
            Ok(self.experiment_path.join(name))
        } else {
            Err(ConfigError::BadFilePath(self.experiment_path.clone()))
        }
    }

    pub fn get_mask_output_directory(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(MASK_DIR)
    }

    pub fn get_cleave_map_directory(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(CLEAVE_MAP_DIR)
    }

    pub fn get_planned_output(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(PLANNED_COORDS)
    }

    pub fn get_global_mask_output(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(GLOBAL_MASK)
    }

    pub fn get_scan_center_output(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(SCAN_CENTERS)
    }

    pub fn get_bit_scheme_output(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(BIT_SCHEME)
    }

    pub fn get_fluidic_table_output(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(CLEAVE_CYCLE)
    }

    pub fn get_temp_mask_output(&self) -> Result<PathBuf, ConfigError> {
        self.get_output(TEMP_MASK)
    }

    /// The folder the acquisition software fills for subgroup `subgroup` (1-based)
    pub fn get_subgroup_directory(&self, subgroup: usize) -> PathBuf {
        self.experiment_path.join(format!("Subgroup {subgroup}"))
    }
}
