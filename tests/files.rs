use std::fs;
use std::path::{Path, PathBuf};

use ltconv::{convert, default_output_paths, ConvertOptions, DumpReader, Error, FrameSelection};

mod common;
use common::{convert_str, numbered, Converted};

const TILTED: &str = "tests/trajectories/tilted.lammpstrj";

fn read_outputs(lattice: &Path, xyz: &Path) -> std::io::Result<Converted> {
    Ok(Converted {
        lattice: fs::read_to_string(lattice)?,
        xyz: fs::read_to_string(xyz)?,
    })
}

fn output_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("out.H"), dir.join("out.xyz"))
}

#[test]
fn open_fixture() -> ltconv::Result<()> {
    let mut reader = DumpReader::open(TILTED)?;
    let frames = reader.read_all_frames()?;
    assert_eq!(frames.len(), 3);

    let timesteps: Vec<i64> = frames.iter().map(|frame| frame.timestep).collect();
    assert_eq!(timesteps, [0, 1000, 2000]);
    for frame in frames.iter() {
        assert!(frame.bounds.is_triclinic());
        assert!(frame.lattice().is_valid());
        let ids: Vec<i64> = frame.atoms.iter().map(|atom| atom.id).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
        let types: Vec<&str> = frame.atoms.iter().map(|atom| atom.extra["type"].as_str()).collect();
        assert_eq!(types, ["1", "1", "2", "2"]);
    }
    Ok(())
}

#[test]
fn explicit_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (lattice, xyz) = output_paths(dir.path());

    let options = ConvertOptions::new(vec![2, 2])
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz);
    assert_eq!(convert(TILTED, &options)?, 3);

    let on_disk = read_outputs(&lattice, &xyz)?;
    let in_memory = convert_str(&fs::read_to_string(TILTED)?, &[2, 2], &FrameSelection::All)?;
    assert_eq!(on_disk.lattice, in_memory.lattice);
    assert_eq!(on_disk.xyz, in_memory.xyz);
    assert_eq!(on_disk.lattice_records(2).len(), 3);
    Ok(())
}

#[test]
fn random_access_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (lattice, xyz) = output_paths(dir.path());

    let options = ConvertOptions::new(vec![4])
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz)
        .with_frames(FrameSelection::FrameList(vec![2, 0]));
    assert_eq!(convert(TILTED, &options)?, 2);

    let outputs = read_outputs(&lattice, &xyz)?;
    let records = outputs.xyz_records();
    assert!(records[0].contains("TIMESTEP:        2000"));
    assert!(records[1].contains("TIMESTEP:           0"));
    Ok(())
}

#[test]
fn overwrites_existing_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (lattice, xyz) = output_paths(dir.path());
    fs::write(&lattice, "stale\n")?;
    fs::write(&xyz, "stale\n")?;

    let options = ConvertOptions::new(vec![4])
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz)
        .with_frames(FrameSelection::FrameList(vec![1]));
    convert(TILTED, &options)?;

    let outputs = read_outputs(&lattice, &xyz)?;
    assert!(!outputs.lattice.contains("stale"));
    assert!(!outputs.xyz.contains("stale"));
    assert_eq!(outputs.xyz_records().len(), 1);
    Ok(())
}

#[test]
fn empty_selection_creates_nothing() -> ltconv::Result<()> {
    let dir = tempfile::tempdir()?;
    let (lattice, xyz) = output_paths(dir.path());

    let options = ConvertOptions::new(vec![4])
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz)
        .with_frames(FrameSelection::FrameList(Vec::new()));
    assert_eq!(convert(TILTED, &options)?, 0);
    assert!(!lattice.exists());
    assert!(!xyz.exists());
    Ok(())
}

#[test]
fn missing_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (lattice, xyz) = output_paths(dir.path());
    fs::write(&xyz, "keep\n")?;

    let options = ConvertOptions::new(vec![4])
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz);
    let result = convert(dir.path().join("missing.lammpstrj"), &options);
    assert!(matches!(result, Err(Error::Io { .. })));

    // Neither output is touched.
    assert!(!lattice.exists());
    assert_eq!(fs::read_to_string(&xyz)?, "keep\n");
    Ok(())
}

#[test]
fn no_species_creates_nothing() -> ltconv::Result<()> {
    let dir = tempfile::tempdir()?;
    let (lattice, xyz) = output_paths(dir.path());

    let options = ConvertOptions::new(Vec::new())
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz);
    assert!(matches!(convert(TILTED, &options), Err(Error::NoSpecies)));
    assert!(!lattice.exists());
    assert!(!xyz.exists());
    Ok(())
}

/// Frames converted before an error stay in the outputs.
#[test]
fn failed_run_keeps_partial_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("broken.lammpstrj");
    fs::write(&input, format!("{}ITEM: TIMESTEP\n300\n", numbered(3)))?;
    let (lattice, xyz) = output_paths(dir.path());

    let options = ConvertOptions::new(vec![3])
        .with_lattice_path(&lattice)
        .with_xyz_path(&xyz);
    let err = match convert(&input, &options) {
        Ok(_) => panic!("the last frame is truncated"),
        Err(err) => err,
    };
    assert!(matches!(err, Error::TruncatedFrame { frame: 3, .. }));

    let outputs = read_outputs(&lattice, &xyz)?;
    assert_eq!(outputs.lattice_records(1).len(), 3);
    assert_eq!(outputs.xyz_records().len(), 3);
    Ok(())
}

#[test]
fn default_paths() {
    let (lattice, xyz) = default_output_paths(Path::new("some/dir/run.lammpstrj"));
    assert_eq!(lattice, PathBuf::from("run.H"));
    assert_eq!(xyz, PathBuf::from("run.xyz"));

    let (lattice, xyz) = default_output_paths(Path::new("traj"));
    assert_eq!(lattice, PathBuf::from("traj.H"));
    assert_eq!(xyz, PathBuf::from("traj.xyz"));

    // Only the last extension is replaced.
    let (lattice, _) = default_output_paths(Path::new("run.1.dump"));
    assert_eq!(lattice, PathBuf::from("run.1.H"));
}
