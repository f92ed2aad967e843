use std::path::PathBuf;
use thiserror::Error;

use super::ports::Port;
use super::worker_status::StageStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PortListError {
    #[error("Port list contains port {0} more than once")]
    Duplicate(Port),
    #[error("Port list is empty")]
    Empty,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemeError {
    #[error("Cannot generate {requested} unique identifiers: only {capacity} exist with weight {weight} over {ports} ports")]
    CapacityExceeded {
        requested: usize,
        capacity: u128,
        weight: usize,
        ports: usize,
    },
    #[error("Digit alphabet of size {alphabet} does not fit in a list of {ports} ports")]
    AlphabetExceedsPorts { alphabet: usize, ports: usize },
    #[error("Digit sequences of length {length} over {alphabet} digits exceed the search limit")]
    SearchSpaceTooLarge { length: usize, alphabet: usize },
    #[error("Identifier slot {0} has no matching entry in the port list")]
    PortIndexOutOfRange(usize),
    #[error("Port {0} is not in the port list")]
    PortNotInList(Port),
    #[error("Received {sequences} port sequences for {fields} fields")]
    LengthMismatch { sequences: usize, fields: usize },
}

#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("Coordinate file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Coordinate file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Coordinate file failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Row {row} of {path:?} is missing column {column}")]
    MissingColumn {
        path: PathBuf,
        row: usize,
        column: usize,
    },
    #[error("Row {row} of {path:?} has unparsable value {value:?}")]
    BadValue {
        path: PathBuf,
        row: usize,
        value: String,
    },
    #[error("Recorded coordinates have {recorded} rows but field {index} was requested")]
    MissingRecordedRow { recorded: usize, index: usize },
}

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("Mask image {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Mask image {path:?} failed due to image error: {source}")]
    ImageError {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Mask image {path:?} could not be decoded as PNG: {source}")]
    PngDecodingError {
        path: PathBuf,
        source: png::DecodingError,
    },
    #[error("Mask image {path:?} could not be encoded as PNG: {source}")]
    PngEncodingError {
        path: PathBuf,
        source: png::EncodingError,
    },
    #[error("Mask failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Mask has more than {max} distinct colours", max=crate::constants::MAX_PALETTE_SIZE)]
    PaletteOverflow,
    #[error("Mask pixel uses palette index {0} which is outside the palette")]
    BadPaletteIndex(u8),
}

#[derive(Debug, Error)]
pub enum TilerError {
    #[error("Tiler was given no imaging fields")]
    NoFields,
    #[error("Tiler parameter {name} must be positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Could not read mask folder {0:?}")]
    BadMaskFolder(PathBuf),
    #[error("Tiler failed due to mask error: {0}")]
    MaskError(#[from] MaskError),
    #[error("Tiler failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("Segmentation of {path:?} failed: {reason}")]
    ServiceFailed { path: PathBuf, reason: String },
    #[error("Segmentation input folder {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Segmentation failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Segmentation failed due to mask error: {0}")]
    MaskError(#[from] MaskError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to bit scheme error: {0}")]
    SchemeError(#[from] SchemeError),
    #[error("Processor failed due to coordinate error: {0}")]
    CoordinateError(#[from] CoordinateError),
    #[error("Processor failed due to mask error: {0}")]
    MaskError(#[from] MaskError),
    #[error("Processor failed due to tiler error: {0}")]
    TilerError(#[from] TilerError),
    #[error("Processor failed due to segmentation error: {0}")]
    SegmentationError(#[from] SegmentationError),
    #[error("Processor failed because the mask count does not match the coordinate count")]
    StitchingFailed,
    #[error("Processor failed because no segmentation command is configured")]
    NoSegmentationService,
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<StageStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
