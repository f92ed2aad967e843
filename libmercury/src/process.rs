use std::path::Path;
use std::sync::mpsc::Sender;

use super::bit_scheme::{generate_sequences, map_to_ports};
use super::cleave_map::{blank_mask, write_cleave_maps};
use super::config::Config;
use super::constants::MASK_DIR;
use super::coordinates::{
    read_fluidic_table, read_planned_coordinates, read_recorded_z, write_bit_scheme,
    write_fluidic_table, write_planned_coordinates, write_scan_centers, BitSchemeRow, ScanCenter,
};
use super::error::{CoordinateError, ProcessorError};
use super::field::fields_from_naming_scheme;
use super::fluidic::{
    build_fluidic_table, estimate_time_complexity, plan_rounds, regroup_by_field, FieldScheme,
    FluidicCommand,
};
use super::palette_mask::PixelBox;
use super::scan_plan::{pack_regions, PlannedPosition};
use super::segmentation::{segment_folder, ExternalCommandService, SegmentationService};
use super::tiler::{global_mask_stitching, nearest_field_for_point};
use super::worker_status::{Stage, StageStatus};

/// The pipelines an operator can run against an experiment folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Plan,
    Segment,
    Laser,
    Fluidic,
    Verify,
}

/// Plan the stage positions of every configured region and write them out.
/// One `Subgroup N` folder is created per region for the acquisition software.
pub fn process_plan(
    config: &Config,
    tx: &Sender<StageStatus>,
) -> Result<Vec<PlannedPosition>, ProcessorError> {
    tx.send(StageStatus::new(0.0, Stage::Planning))?;
    std::fs::create_dir_all(&config.experiment_path)?;
    let plan = pack_regions(&config.scan_regions, config.scan_resolution);
    log::info!(
        "Planned {} positions over {} regions",
        plan.len(),
        config.scan_regions.len()
    );
    for subgroup in 1..=config.scan_regions.len() {
        std::fs::create_dir_all(config.get_subgroup_directory(subgroup))?;
    }
    tx.send(StageStatus::new(0.5, Stage::Writing))?;
    write_planned_coordinates(&config.get_planned_output()?, &plan)?;
    tx.send(StageStatus::new(1.0, Stage::Done))?;
    Ok(plan)
}

/// Turn every multichannel image into a mask through the segmentation service
pub fn process_segment<S: SegmentationService>(
    config: &Config,
    service: &S,
    tx: &Sender<StageStatus>,
) -> Result<(), ProcessorError> {
    tx.send(StageStatus::new(0.0, Stage::Segmenting))?;
    let input_dir = config.get_multichannel_directory()?;
    let output_dir = config.get_mask_output_directory()?;
    let written = segment_folder(
        service,
        &config.segmentation,
        &input_dir,
        &output_dir,
        config.mask_start_index,
        &config.mask_suffix,
        |fraction| {
            if let Err(e) = tx.send(StageStatus::new(fraction, Stage::Segmenting)) {
                log::warn!("Could not report segmentation progress: {e}");
            }
        },
    )?;
    log::info!("Wrote {} masks to {output_dir:?}", written.len());
    tx.send(StageStatus::new(1.0, Stage::Done))?;
    Ok(())
}

/// The combined laser pipeline.
///
/// Stitches the recorded masks, writes the cleave-region centres with the z of the nearest
/// recorded field, barcodes every retained sub-cell and renders one cleave map per round.
/// Files written before a failing step are left in place.
pub fn process_laser(config: &Config, tx: &Sender<StageStatus>) -> Result<(), ProcessorError> {
    tx.send(StageStatus::new(0.0, Stage::Stitching))?;
    let coordinates = read_planned_coordinates(&config.get_planned_coordinates()?)?;
    let recorded_z = read_recorded_z(&config.get_recorded_coordinates()?)?;
    let result = global_mask_stitching(
        &config.get_mask_directory()?,
        &coordinates,
        &config.tiler_params(),
    )?;
    let global = match (result.successful, result.global_mask) {
        (true, Some(global)) => global,
        _ => return Err(ProcessorError::StitchingFailed),
    };
    global.mask.save(&config.get_global_mask_output()?)?;
    blank_mask().save(&config.get_temp_mask_output()?)?;
    tx.send(StageStatus::new(0.4, Stage::Writing))?;

    let planned_xy: Vec<(f64, f64)> = coordinates.iter().map(|c| c.xy()).collect();
    let mut centers = Vec::with_capacity(result.regions.len());
    for region in result.regions.iter() {
        let z = match nearest_field_for_point(&planned_xy, (region.center_x_um, region.center_y_um)) {
            Some(nearest) => Some(*recorded_z.get(nearest).ok_or(
                CoordinateError::MissingRecordedRow {
                    recorded: recorded_z.len(),
                    index: nearest,
                },
            )?),
            None => None,
        };
        centers.push(ScanCenter {
            x: region.center_x_um,
            y: region.center_y_um,
            z,
            bbox: region.bbox,
        });
    }
    write_scan_centers(&config.get_scan_center_output()?, &centers)?;

    tx.send(StageStatus::new(0.6, Stage::Scheming))?;
    let scheme = generate_sequences(
        result.sub_cells.len(),
        config.scheme,
        config.port_list.len(),
    )?;
    let rows: Vec<BitSchemeRow> = result
        .sub_cells
        .iter()
        .zip(scheme.sequences.iter())
        .map(|(cell, identifier)| BitSchemeRow {
            x: cell.center_x_um,
            y: cell.center_y_um,
            bbox: cell.bbox,
            identifier: identifier.clone(),
        })
        .collect();
    write_bit_scheme(&config.get_bit_scheme_output()?, &rows)?;

    tx.send(StageStatus::new(0.8, Stage::Mapping))?;
    let port_sequences = map_to_ports(&scheme.sequences, &config.port_list)?;
    let rounds = plan_rounds(&port_sequences, &config.port_list);
    let boxes: Vec<PixelBox> = result.sub_cells.iter().map(|cell| cell.bbox).collect();
    let maps = write_cleave_maps(
        &global.mask,
        &boxes,
        &rounds,
        &config.get_cleave_map_directory()?,
    )?;
    log::info!("Wrote {} cleave maps", maps.len());
    tx.send(StageStatus::new(1.0, Stage::Done))?;
    Ok(())
}

/// The per-field fluidic pipeline, run before any mask exists.
/// Mask names are predicted from the acquisition naming scheme.
pub fn process_fluidic(
    config: &Config,
    tx: &Sender<StageStatus>,
) -> Result<Vec<FluidicCommand>, ProcessorError> {
    tx.send(StageStatus::new(0.0, Stage::Scheming))?;
    let coordinates = read_planned_coordinates(&config.get_planned_coordinates()?)?;
    let fields = fields_from_naming_scheme(
        &coordinates,
        Path::new(MASK_DIR),
        config.mask_start_index,
        &config.mask_suffix,
    );
    let scheme = generate_sequences(fields.len(), config.scheme, config.port_list.len())?;
    let port_sequences = map_to_ports(&scheme.sequences, &config.port_list)?;
    let commands = build_fluidic_table(&fields, &port_sequences, &config.port_list)?;

    tx.send(StageStatus::new(0.5, Stage::Writing))?;
    write_fluidic_table(&config.get_fluidic_table_output()?, &commands)?;
    let seconds = estimate_time_complexity(&commands, &config.time_model());
    log::info!(
        "Fluidic table has {} commands, estimated run time {:.1} min",
        commands.len(),
        seconds / 60.0
    );
    tx.send(StageStatus::new(1.0, Stage::Done))?;
    Ok(commands)
}

/// Re-read a fluidic table and report what every field will receive
pub fn process_verify(
    config: &Config,
    tx: &Sender<StageStatus>,
) -> Result<Vec<FieldScheme>, ProcessorError> {
    tx.send(StageStatus::new(0.0, Stage::Verifying))?;
    let commands = read_fluidic_table(&config.get_fluidic_table()?)?;
    let schemes = regroup_by_field(&commands);
    for scheme in schemes.iter() {
        log::info!(
            "{} at ({}, {}): ports {:?}",
            scheme.mask.to_string_lossy(),
            scheme.x,
            scheme.y,
            scheme.ports
        );
    }
    let seconds = estimate_time_complexity(&commands, &config.time_model());
    log::info!(
        "{} fields, {} commands, estimated run time {:.1} min",
        schemes.len(),
        commands.len(),
        seconds / 60.0
    );
    tx.send(StageStatus::new(1.0, Stage::Done))?;
    Ok(schemes)
}

/// The function to be called by a separate thread (typically the CLI).
pub fn process(
    config: Config,
    pipeline: Pipeline,
    tx: Sender<StageStatus>,
) -> Result<(), ProcessorError> {
    log::info!("Running {pipeline:?} on {:?}...", config.experiment_path);
    match pipeline {
        Pipeline::Plan => process_plan(&config, &tx).map(|_| ()),
        Pipeline::Segment => match config.segmentation.command.as_deref() {
            Some(program) => {
                let service = ExternalCommandService::new(program, &config.experiment_path);
                process_segment(&config, &service, &tx)
            }
            None => Err(ProcessorError::NoSegmentationService),
        },
        Pipeline::Laser => process_laser(&config, &tx),
        Pipeline::Fluidic => process_fluidic(&config, &tx).map(|_| ()),
        Pipeline::Verify => process_verify(&config, &tx).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_scheme::SchemeMode;
    use crate::constants::{BLACK, CLEAVE_MAP_DIR};
    use crate::palette_mask::PaletteMask;
    use crate::ports::PortList;
    use crate::scan_plan::{FocusMethod, ScanRegion};
    use image::{GrayImage, Luma};
    use std::fs;
    use std::sync::mpsc::channel;
    use tempfile::tempdir;

    fn experiment(dir: &Path) -> Config {
        Config {
            experiment_path: dir.to_path_buf(),
            port_list: PortList::new(vec![1, 2, 3]).unwrap(),
            field_size_um: 50.0,
            cleave_size_um: 50.0,
            px_per_um: 1.0,
            subdivision_factor: 1,
            mask_suffix: String::from("_mask.png"),
            flip_horizontal: false,
            flip_vertical: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_writes_subgroups() {
        let dir = tempdir().unwrap();
        let mut config = experiment(dir.path());
        config.scan_regions = vec![
            ScanRegion {
                min_x: 0.0,
                max_x: 600.0,
                min_y: 0.0,
                max_y: 300.0,
                focus: FocusMethod::ImageBased,
                focus_first_only: false,
            };
            2
        ];
        let (tx, rx) = channel();
        let plan = process_plan(&config, &tx).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(dir.path().join("Subgroup 1").is_dir());
        assert!(dir.path().join("Subgroup 2").is_dir());
        assert_eq!(
            read_planned_coordinates(&dir.path().join("coord_planned.csv"))
                .unwrap()
                .len(),
            4
        );
        assert_eq!(rx.try_iter().last().unwrap().stage, Stage::Done);
    }

    #[test]
    fn test_fluidic_then_verify() {
        let dir = tempdir().unwrap();
        let mut config = experiment(dir.path());
        config.scheme = SchemeMode::FixedWeight { weight: 2 };
        fs::write(
            dir.path().join("coord_planned.csv"),
            ",x,y,z\n0,0,0,1\n1,10,0,2\n2,20,0,3\n",
        )
        .unwrap();
        let (tx, _rx) = channel();
        let commands = process_fluidic(&config, &tx).unwrap();
        let ports: Vec<u32> = commands.iter().map(|c| c.port).collect();
        assert_eq!(ports, vec![1, 1, 2, 2, 3, 3]);
        assert_eq!(
            commands[0].mask,
            Path::new(MASK_DIR).join("1000_mask.png")
        );
        assert_eq!(
            estimate_time_complexity(&commands, &config.time_model()),
            6.0 * 5.0 + 2.0 * 1140.0
        );

        let schemes = process_verify(&config, &tx).unwrap();
        let ports: Vec<Vec<u32>> = schemes.iter().map(|s| s.ports.clone()).collect();
        assert_eq!(ports, vec![vec![1, 2], vec![1, 3], vec![2, 3]]);
        assert_eq!(schemes[2].z, Some(3.0));
    }

    #[test]
    fn test_fluidic_capacity_error() {
        let dir = tempdir().unwrap();
        let mut config = experiment(dir.path());
        config.scheme = SchemeMode::FixedWeight { weight: 3 };
        fs::write(dir.path().join("coord_planned.csv"), ",x,y\n0,0,0\n1,1,1\n").unwrap();
        let (tx, _rx) = channel();
        assert!(matches!(
            process_fluidic(&config, &tx),
            Err(ProcessorError::SchemeError(_))
        ));
        assert!(!dir.path().join("_cleave_cycle.csv").exists());
    }

    #[test]
    fn test_laser_pipeline() {
        let dir = tempdir().unwrap();
        let mut config = experiment(dir.path());
        config.scheme = SchemeMode::FixedWeight { weight: 1 };
        let masks = dir.path().join(MASK_DIR);
        fs::create_dir(&masks).unwrap();
        for name in ["1000_mask.png", "1001_mask.png"] {
            PaletteMask::from_parts(GrayImage::from_pixel(50, 50, Luma([0])), vec![BLACK])
                .unwrap()
                .save(&masks.join(name))
                .unwrap();
        }
        fs::write(
            dir.path().join("coord_planned.csv"),
            ",x,y\n0,0,0\n1,100,0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("coord_recorded.csv"),
            ",x,y,z\n0,0,0,1.5\n1,100,0,2.5\n",
        )
        .unwrap();

        let (tx, _rx) = channel();
        process_laser(&config, &tx).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("coord_scan_center.csv")).unwrap(),
            ",x,y,z,w,n,e,s\n0,0,0,1.5,0,0,50,50\n1,50,0,1.5,50,0,100,50\n2,100,0,2.5,100,0,150,50\n"
        );
        let scheme = fs::read_to_string(dir.path().join("config_bit_scheme.csv")).unwrap();
        assert_eq!(scheme.lines().count(), 3);
        assert!(scheme.contains("\"[1, 0]\""));
        assert!(scheme.contains("\"[0, 1]\""));

        let maps = dir.path().join(CLEAVE_MAP_DIR);
        let round_0 = PaletteMask::open(&maps.join("Round 0.png")).unwrap();
        let round_1 = PaletteMask::open(&maps.join("Round 1.png")).unwrap();
        assert_eq!(round_0.count_foreground(), 2500);
        assert_eq!(round_1.count_foreground(), 2500);
        assert!(!maps.join("Round 2.png").exists());

        let global = PaletteMask::open(&dir.path().join("image_mask_global.png")).unwrap();
        assert_eq!(global.count_foreground(), 5000);
        let blank = PaletteMask::open(&dir.path().join("image_mask_tmp.png")).unwrap();
        assert_eq!(blank.count_foreground(), 0);
    }

    #[test]
    fn test_laser_count_mismatch() {
        let dir = tempdir().unwrap();
        let config = experiment(dir.path());
        fs::create_dir(dir.path().join(MASK_DIR)).unwrap();
        fs::write(dir.path().join("coord_planned.csv"), ",x,y\n0,0,0\n").unwrap();
        fs::write(dir.path().join("coord_recorded.csv"), ",x,y,z\n0,0,0,1\n").unwrap();
        let (tx, _rx) = channel();
        assert!(matches!(
            process_laser(&config, &tx),
            Err(ProcessorError::StitchingFailed)
        ));
    }

    #[test]
    fn test_segment_needs_a_command() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = channel();
        assert!(matches!(
            process(experiment(dir.path()), Pipeline::Segment, tx),
            Err(ProcessorError::NoSegmentationService)
        ));
    }
}
