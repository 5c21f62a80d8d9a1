//! Convert a LAMMPS dump trajectory into Cassandra-style `.H` and `.xyz` files.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ltconv::{convert, ConvertOptions, CoordFormat, FrameSelection};

/// Convert a LAMMPS dump trajectory into a lattice (.H) and a coordinate (.xyz) file.
///
/// The dump must provide the `id`, `xu`, `yu` and `zu` atom columns. Coordinates are written
/// relative to the center of the simulation cell.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input path (LAMMPS dump).
    input: PathBuf,

    /// Number of molecules of each species, in order.
    #[arg(required = true, value_name = "NMOLS")]
    species: Vec<usize>,

    /// printf-style format for the coordinates, such as `%f` or `%.8e`.
    #[arg(short, long, default_value = "%f", allow_hyphen_values = true)]
    format: CoordFormat,

    /// Lattice output path. Defaults to the input's file stem with `.H` appended.
    #[arg(long, value_name = "FILE")]
    lattice: Option<PathBuf>,

    /// Coordinate output path. Defaults to the input's file stem with `.xyz` appended.
    #[arg(long, value_name = "FILE")]
    xyz: Option<PathBuf>,

    /// Frames to convert, as a comma-separated list of indices and `start:stop:step` ranges.
    ///
    /// Frames are written in the order given. A list that is not strictly increasing makes the
    /// dump be indexed first, after which the frames are read by seeking.
    ///
    /// - `0,10,20` selects the first, 11th and 21st frames.
    ///
    /// - `:100:2` selects every second frame from the first 100 frames, 50 in total.
    ///
    /// - `9,3` selects the 10th frame, then the 4th.
    ///
    /// All frames are converted if this is not set.
    #[arg(long, value_name = "LIST")]
    frames: Option<FrameSelection>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut options = ConvertOptions::new(args.species)
        .with_format(args.format)
        .with_frames(args.frames.unwrap_or_default());
    if let Some(path) = args.lattice {
        options = options.with_lattice_path(path);
    }
    if let Some(path) = args.xyz {
        options = options.with_xyz_path(path);
    }

    match convert(&args.input, &options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
