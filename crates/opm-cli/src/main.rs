use std::{error::Error, path::Path};

use clap::{Parser, Subcommand};

use opm_core::{deskew_transforms, Affine, ScanGeometry, StackDimensions, WellId};
use opm_pipeline::{discover_dimensions, discover_wells, RunConfig};

/// Inspection tools for oblique-plane microscopy acquisition directories.
#[derive(Debug, Parser)]
#[command(author, version, about = "Acquisition discovery and deskew planning")]
struct Args {
    /// Path to the YAML run configuration.
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the wells discovered in the input directory.
    Wells,
    /// Print the discovered dimension set for a well as JSON.
    Dims {
        #[arg(long)]
        well: WellId,
    },
    /// Print the two per-angle deskew matrices for a stack shape as JSON.
    Deskew {
        /// Raw stack extents as X Y Z.
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
        stack_dims: Vec<usize>,
        /// Z spacing of the raw stack in microns.
        #[arg(long)]
        z_step: f64,
    },
}

fn run_command(config: &RunConfig, command: &Command) -> Result<String, Box<dyn Error>> {
    match command {
        Command::Wells => {
            let wells = discover_wells(&config.data.input_path)?;
            Ok(wells.iter().map(|w| format!("{w}\n")).collect())
        }
        Command::Dims { well } => {
            let dims = discover_dimensions(&config.data.input_path, well)?;
            Ok(serde_json::to_string_pretty(&dims)?)
        }
        Command::Deskew { stack_dims, z_step } => {
            let geometry = ScanGeometry {
                scan_type: config.data.parse_scan_type()?,
                mirror_tilt_deg: config.data.hardcoded_vars.mirror_tilt,
                pix_x: config.data.hardcoded_vars.pix_x,
                z_step_um: *z_step,
            };
            let dims = StackDimensions {
                x: stack_dims[0],
                y: stack_dims[1],
                z: stack_dims[2],
            };
            let [angle0, angle1] = deskew_transforms(&geometry, &dims);
            Ok(serde_json::to_string_pretty(&serde_json::json!({
                "angle_0": affine_rows(&angle0),
                "angle_1": affine_rows(&angle1),
            }))?)
        }
    }
}

fn affine_rows(a: &Affine) -> Vec<Vec<f64>> {
    (0..3).map(|r| (0..4).map(|c| a[(r, c)]).collect()).collect()
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = RunConfig::from_yaml_file(Path::new(&args.config))?;
    let output = run_command(&config, &args.command)?;
    println!("{output}");
    Ok(())
}
