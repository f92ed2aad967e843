use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::path::PathBuf;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;

use libmercury::config::Config;
use libmercury::process::{process, Pipeline};
use libmercury::worker_status::StageStatus;

const LOG_FILE: &str = "mercury.log";

fn pipeline_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name).about(about).arg(
        Arg::new("path")
            .short('p')
            .long("path")
            .required(true)
            .help("Path to the configuration file"),
    )
}

fn init_logging(pb_manager: &MultiProgress) {
    let term_logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![term_logger];
    match File::create(LOG_FILE) {
        Ok(file) => loggers.push(simplelog::WriteLogger::new(
            simplelog::LevelFilter::Info,
            simplelog::Config::default(),
            file,
        )),
        Err(e) => eprintln!("Could not create log file {LOG_FILE}: {e}"),
    }
    let logger = simplelog::CombinedLogger::new(loggers);

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");
    log::set_max_level(log::LevelFilter::Info);
}

fn main() {
    // Create a cli
    let matches = Command::new("mercury_cli")
        .about("Plan and verify barcoding experiments")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(pipeline_command("new", "Make a template configuration yaml file"))
        .subcommand(pipeline_command("plan", "Plan stage positions for the scan regions"))
        .subcommand(pipeline_command(
            "segment",
            "Segment multichannel images into masks with the configured service",
        ))
        .subcommand(pipeline_command(
            "laser",
            "Stitch masks, barcode sub-cells and render cleave maps",
        ))
        .subcommand(pipeline_command(
            "fluidic",
            "Barcode imaging fields and write the fluidic table",
        ))
        .subcommand(pipeline_command(
            "verify",
            "Re-read the fluidic table and report ports per field",
        ))
        .get_matches();

    // Initialize feedback
    let pb_manager = MultiProgress::new();
    init_logging(&pb_manager);

    // Parse the cli
    let (name, sub_matches) = match matches.subcommand() {
        Some(sub) => sub,
        None => return,
    };
    let config_path = match sub_matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    let pipeline = match name {
        "new" => {
            log::info!(
                "Making a template config at {}...",
                config_path.to_string_lossy()
            );
            match Config::default().write_config_file(&config_path) {
                Ok(()) => log::info!("Done."),
                Err(e) => log::error!("{e}"),
            }
            return;
        }
        "plan" => Pipeline::Plan,
        "segment" => Pipeline::Segment,
        "laser" => Pipeline::Laser,
        "fluidic" => Pipeline::Fluidic,
        "verify" => Pipeline::Verify,
        _ => {
            log::error!("Unknown subcommand {name}");
            return;
        }
    };

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!(
        "Experiment Path: {}",
        config.experiment_path.to_string_lossy()
    );
    log::info!("Ports: {:?}", config.port_list.as_slice());
    log::info!("Scheme: {:?}", config.scheme);

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) =
        ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos:>3}%")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    let (tx, rx) = channel::<StageStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, pipeline, tx));

    loop {
        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(status) => {
                pb.set_message(status.stage.to_string());
                pb.set_position((status.progress * 100.0) as u64);
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if handle.is_finished() {
            for status in rx.try_iter() {
                pb.set_message(status.stage.to_string());
                pb.set_position((status.progress * 100.0) as u64);
            }
            break;
        }
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(_) => log::info!("Successfully ran the {name} pipeline!"),
            Err(e) => log::error!("The {name} pipeline failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join the {name} task!"),
    }

    pb.finish();

    log::info!("Done.");
}
