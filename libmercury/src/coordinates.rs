//! Flat CSV tables exchanged with the acquisition and instrument software.
//!
//! Every table starts with a 0-based index column. Readers ignore it and address the
//! remaining values by position.
use std::fmt::Display;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Writer};
use itertools::Itertools;

use super::bit_scheme::Identifier;
use super::error::CoordinateError;
use super::field::Coordinate;
use super::fluidic::FluidicCommand;
use super::palette_mask::PixelBox;
use super::scan_plan::PlannedPosition;

/// A cleave-region centre with the z of the nearest recorded field and its pixel box
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCenter {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub bbox: PixelBox,
}

/// A retained sub-cell with the slots it uses and its identifier
#[derive(Debug, Clone, PartialEq)]
pub struct BitSchemeRow {
    pub x: f64,
    pub y: f64,
    pub bbox: PixelBox,
    pub identifier: Identifier,
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, CoordinateError> {
    if !path.exists() {
        return Err(CoordinateError::BadFilePath(path.to_path_buf()));
    }
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?)
}

fn column_value<'a>(
    record: &'a StringRecord,
    path: &Path,
    row: usize,
    column: usize,
) -> Result<&'a str, CoordinateError> {
    record
        .get(column)
        .map(str::trim)
        .ok_or_else(|| CoordinateError::MissingColumn {
            path: path.to_path_buf(),
            row,
            column,
        })
}

fn parse<T: std::str::FromStr>(value: &str, path: &Path, row: usize) -> Result<T, CoordinateError> {
    value.parse::<T>().map_err(|_| CoordinateError::BadValue {
        path: path.to_path_buf(),
        row,
        value: value.to_string(),
    })
}

fn parse_optional(value: &str, path: &Path, row: usize) -> Result<Option<f64>, CoordinateError> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse(value, path, row).map(Some)
    }
}

fn optional_to_string(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn list_to_string<T: Display>(values: &[T]) -> String {
    format!("[{}]", values.iter().join(", "))
}

/// Planned field centres: x in column 1, y in column 2, z in column 3 when present
pub fn read_planned_coordinates(path: &Path) -> Result<Vec<Coordinate>, CoordinateError> {
    let mut reader = open_reader(path)?;
    let mut coordinates = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let x = parse(column_value(&record, path, row, 1)?, path, row)?;
        let y = parse(column_value(&record, path, row, 2)?, path, row)?;
        let z = match record.get(3) {
            Some(value) => parse_optional(value.trim(), path, row)?,
            None => None,
        };
        coordinates.push(Coordinate { x, y, z });
    }
    Ok(coordinates)
}

/// Focus values recorded by the microscope, column 3 of every row
pub fn read_recorded_z(path: &Path) -> Result<Vec<f64>, CoordinateError> {
    let mut reader = open_reader(path)?;
    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        values.push(parse(column_value(&record, path, row, 3)?, path, row)?);
    }
    Ok(values)
}

pub fn write_planned_coordinates(
    path: &Path,
    positions: &[PlannedPosition],
) -> Result<(), CoordinateError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["", "x", "y", "z", "focus", "subgroup"])?;
    for (idx, position) in positions.iter().enumerate() {
        writer.write_record([
            idx.to_string(),
            position.x.to_string(),
            position.y.to_string(),
            String::new(),
            position.focus.code().to_string(),
            position.subgroup.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_fluidic_table(path: &Path, commands: &[FluidicCommand]) -> Result<(), CoordinateError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["", "x", "y", "z", "mask", "port"])?;
    for (idx, command) in commands.iter().enumerate() {
        writer.write_record([
            idx.to_string(),
            command.x.to_string(),
            command.y.to_string(),
            optional_to_string(command.z),
            command.mask.to_string_lossy().to_string(),
            command.port.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_fluidic_table(path: &Path) -> Result<Vec<FluidicCommand>, CoordinateError> {
    let mut reader = open_reader(path)?;
    let mut commands = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        commands.push(FluidicCommand {
            x: parse(column_value(&record, path, row, 1)?, path, row)?,
            y: parse(column_value(&record, path, row, 2)?, path, row)?,
            z: parse_optional(column_value(&record, path, row, 3)?, path, row)?,
            mask: PathBuf::from(column_value(&record, path, row, 4)?),
            port: parse(column_value(&record, path, row, 5)?, path, row)?,
        });
    }
    Ok(commands)
}

pub fn write_scan_centers(path: &Path, centers: &[ScanCenter]) -> Result<(), CoordinateError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["", "x", "y", "z", "w", "n", "e", "s"])?;
    for (idx, center) in centers.iter().enumerate() {
        let [w, n, e, s] = center.bbox.as_array();
        writer.write_record([
            idx.to_string(),
            center.x.to_string(),
            center.y.to_string(),
            optional_to_string(center.z),
            w.to_string(),
            n.to_string(),
            e.to_string(),
            s.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_bit_scheme(path: &Path, rows: &[BitSchemeRow]) -> Result<(), CoordinateError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["", "x", "y", "w", "n", "e", "s", "index", "bit"])?;
    for (idx, row) in rows.iter().enumerate() {
        let [w, n, e, s] = row.bbox.as_array();
        writer.write_record([
            idx.to_string(),
            row.x.to_string(),
            row.y.to_string(),
            w.to_string(),
            n.to_string(),
            e.to_string(),
            s.to_string(),
            list_to_string(&row.identifier.active_slots()),
            row.identifier.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_plan::FocusMethod;
    use bitvec::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_planned_coordinates_skip_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coord_planned.csv");
        fs::write(&path, ",x,y,z\n0,1.5,-2,\n1,3,4,7.25\n").unwrap();
        let coords = read_planned_coordinates(&path).unwrap();
        assert_eq!(
            coords,
            vec![
                Coordinate { x: 1.5, y: -2.0, z: None },
                Coordinate { x: 3.0, y: 4.0, z: Some(7.25) },
            ]
        );
    }

    #[test]
    fn test_missing_file_and_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coord_recorded.csv");
        assert!(matches!(
            read_recorded_z(&path),
            Err(CoordinateError::BadFilePath(_))
        ));
        fs::write(&path, ",x,y\n0,1,2\n").unwrap();
        assert!(matches!(
            read_recorded_z(&path),
            Err(CoordinateError::MissingColumn { row: 0, column: 3, .. })
        ));
        fs::write(&path, ",x,y,z\n0,1,2,high\n").unwrap();
        assert!(matches!(
            read_recorded_z(&path),
            Err(CoordinateError::BadValue { .. })
        ));
    }

    #[test]
    fn test_fluidic_table_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_cleave_cycle.csv");
        let commands = vec![
            FluidicCommand {
                x: 10.0,
                y: -5.5,
                z: Some(1.0),
                mask: PathBuf::from("image_mask/1000_MC_F001_Z001.png"),
                port: 3,
            },
            FluidicCommand {
                x: 20.0,
                y: 0.0,
                z: None,
                mask: PathBuf::from("image_mask/1001_MC_F001_Z001.png"),
                port: 21,
            },
        ];
        write_fluidic_table(&path, &commands).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(",x,y,z,mask,port\n0,10,-5.5,1,"));
        assert_eq!(read_fluidic_table(&path).unwrap(), commands);
    }

    #[test]
    fn test_bit_scheme_lists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config_bit_scheme.csv");
        let rows = [BitSchemeRow {
            x: 1.0,
            y: 2.0,
            bbox: PixelBox::new(0, 10, 100, 110),
            identifier: Identifier::Bits(bitvec![1, 0, 1, 0]),
        }];
        write_bit_scheme(&path, &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            ",x,y,w,n,e,s,index,bit\n0,1,2,0,10,100,110,\"[0, 2]\",\"[1, 0, 1, 0]\"\n"
        );
    }

    #[test]
    fn test_planned_and_centers_headers() {
        let dir = tempdir().unwrap();
        let planned = dir.path().join("coord_planned.csv");
        write_planned_coordinates(
            &planned,
            &[PlannedPosition {
                x: 150.0,
                y: 600.0,
                focus: FocusMethod::NikonPfs,
                subgroup: 1,
            }],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&planned).unwrap(),
            ",x,y,z,focus,subgroup\n0,150,600,,2,1\n"
        );
        // The plan reads back as coordinates without z
        assert_eq!(
            read_planned_coordinates(&planned).unwrap(),
            vec![Coordinate::new(150.0, 600.0)]
        );

        let centers = dir.path().join("coord_scan_center.csv");
        write_scan_centers(
            &centers,
            &[ScanCenter {
                x: 0.0,
                y: 0.0,
                z: Some(4.5),
                bbox: PixelBox::new(0, 0, 300, 300),
            }],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&centers).unwrap(),
            ",x,y,z,w,n,e,s\n0,0,0,4.5,0,0,300,300\n"
        );
    }
}
