use std::io::{BufRead, Seek, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::format::CoordFormat;
use crate::selection::{FrameSelection, Traversal};
use crate::{DumpReader, Frame, FrameWriter, Lattice};

/// Where a [`Converter`] is in its run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    /// Scanning for the start of the next frame.
    Locating,
    ParsingHeader,
    ParsingAtoms,
    Emitting,
    /// The run completed.
    Done,
    /// The run was aborted by an error.
    Failed,
}

/// Drives a [`DumpReader`] and a [`FrameWriter`] through a [`FrameSelection`].
#[derive(Debug)]
pub struct Converter<R, W: Write> {
    reader: DumpReader<R>,
    writer: FrameWriter<W>,
    stage: Stage,
    /// Reused between frames.
    frame: Frame,
    species_total: usize,
    warned_species: bool,
}

impl<R: BufRead + Seek, W: Write> Converter<R, W> {
    pub fn new(reader: DumpReader<R>, writer: FrameWriter<W>) -> Self {
        let species_total = writer.species().iter().sum();
        Self {
            reader,
            writer,
            stage: Stage::Idle,
            frame: Frame::default(),
            species_total,
            warned_species: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        log::trace!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Converts the frames in `selection` and returns how many were written.
    ///
    /// Frames are written in the order of the selection. Any error aborts the run, leaving the
    /// frames written up to that point in the outputs.
    pub fn run(&mut self, selection: &FrameSelection) -> Result<usize> {
        let result = match selection {
            _ if selection.is_empty() => Ok(0),
            FrameSelection::FrameList(indices)
                if selection.traversal() == Traversal::RandomAccess =>
            {
                self.run_random_access(indices, selection.until())
            }
            _ => self.run_sequential(selection),
        };
        match result {
            Ok(n) => {
                self.enter(Stage::Done);
                Ok(n)
            }
            Err(err) => {
                self.enter(Stage::Failed);
                Err(err)
            }
        }
    }

    /// A single forward pass. Frames outside the selection are skipped, and the scan stops
    /// after the last selected frame.
    fn run_sequential(&mut self, selection: &FrameSelection) -> Result<usize> {
        let mut n = 0;
        self.enter(Stage::Locating);
        while let Some(idx) = self.reader.next_frame()? {
            match selection.is_included(idx) {
                Some(true) => {
                    self.convert_frame(idx)?;
                    n += 1;
                }
                Some(false) => {
                    self.enter(Stage::ParsingHeader);
                    self.reader.skip_frame()?;
                }
                None => return Ok(n),
            }
            if selection.is_included(idx + 1).is_none() {
                return Ok(n);
            }
            self.enter(Stage::Locating);
        }

        match selection {
            FrameSelection::FrameList(indices) => {
                Err(missing_frame(indices, self.reader.current()))
            }
            FrameSelection::All => Ok(n),
        }
    }

    /// Index the frame offsets in a first pass, then seek to each requested frame in turn.
    fn run_random_access(&mut self, indices: &[usize], until: Option<usize>) -> Result<usize> {
        let Some(max) = until.and_then(|until| until.checked_sub(1)) else {
            return Ok(0);
        };

        self.enter(Stage::Locating);
        let offsets = self.reader.determine_offsets(until)?;
        if offsets.len() <= max {
            return Err(missing_frame(indices, offsets.len().checked_sub(1)));
        }

        for &idx in indices {
            self.reader.seek_frame(idx, offsets[idx])?;
            self.convert_frame(idx)?;
        }
        Ok(indices.len())
    }

    /// Runs the body of the frame the reader is positioned in through the whole pipeline.
    fn convert_frame(&mut self, idx: usize) -> Result<()> {
        self.enter(Stage::ParsingHeader);
        let header = self.reader.read_header()?;
        let lattice = Lattice::from_bounds(&header.bounds);
        if !lattice.is_valid() {
            return Err(Error::Geometry {
                frame: idx,
                volume: lattice.volume,
            });
        }

        self.enter(Stage::ParsingAtoms);
        self.reader.read_atoms(header.natoms, &mut self.frame.atoms)?;
        self.frame.timestep = header.timestep;
        self.frame.bounds = header.bounds;
        self.frame.recenter(lattice.center);

        if header.natoms != self.species_total && !self.warned_species {
            log::warn!(
                "frame {idx} holds {} atoms, but the species counts add up to {}",
                header.natoms,
                self.species_total
            );
            self.warned_species = true;
        }

        self.enter(Stage::Emitting);
        self.writer.write_frame(&self.frame, &lattice)?;
        log::debug!(
            "wrote frame {idx} (timestep {}, {} atoms, volume {})",
            header.timestep,
            header.natoms,
            lattice.volume
        );
        Ok(())
    }

    /// Flushes the outputs and hands them back.
    pub fn finish(self) -> Result<(W, W)> {
        Ok(self.writer.finish()?)
    }
}

/// Reports the first entry of `indices`, in request order, that lies beyond `last_valid`.
fn missing_frame(indices: &[usize], last_valid: Option<usize>) -> Error {
    let requested = indices
        .iter()
        .copied()
        .find(|&idx| last_valid.map_or(true, |last| idx > last))
        .unwrap_or_default();
    Error::FrameIndex {
        requested,
        last_valid,
    }
}

/// Settings for a call to [`convert`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Number of molecules of each species, in order.
    pub species: Vec<usize>,
    /// Defaults to the input's file stem with `.H` appended.
    pub lattice_path: Option<PathBuf>,
    /// Defaults to the input's file stem with `.xyz` appended.
    pub xyz_path: Option<PathBuf>,
    pub format: CoordFormat,
    pub frames: FrameSelection,
}

impl ConvertOptions {
    pub fn new(species: Vec<usize>) -> Self {
        Self {
            species,
            lattice_path: None,
            xyz_path: None,
            format: CoordFormat::default(),
            frames: FrameSelection::All,
        }
    }

    pub fn with_lattice_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lattice_path = Some(path.into());
        self
    }

    pub fn with_xyz_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.xyz_path = Some(path.into());
        self
    }

    pub fn with_format(mut self, format: CoordFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_frames(mut self, frames: FrameSelection) -> Self {
        self.frames = frames;
        self
    }
}

/// Returns the default lattice and coordinate output paths for `input`.
///
/// These are the file stem of `input` with `.H` and `.xyz` appended, relative to the current
/// working directory.
pub fn default_output_paths(input: &Path) -> (PathBuf, PathBuf) {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    (
        PathBuf::from(format!("{stem}.H")),
        PathBuf::from(format!("{stem}.xyz")),
    )
}

/// Converts the dump at `input` and returns the number of frames written.
///
/// If the frame selection is an empty list, nothing is converted and no outputs are created.
pub fn convert(input: impl AsRef<Path>, options: &ConvertOptions) -> Result<usize> {
    let input = input.as_ref();
    if options.species.is_empty() {
        return Err(Error::NoSpecies);
    }
    if options.frames.is_empty() {
        log::info!("no frames selected, nothing to convert");
        return Ok(0);
    }

    let (default_lattice, default_xyz) = default_output_paths(input);
    let lattice_path = options.lattice_path.as_deref().unwrap_or(&default_lattice);
    let xyz_path = options.xyz_path.as_deref().unwrap_or(&default_xyz);

    // Open the input first, so a missing input does not clobber existing outputs.
    let reader = DumpReader::open(input)?;
    let writer = FrameWriter::create(
        lattice_path,
        xyz_path,
        options.species.clone(),
        options.format.clone(),
    )?;

    let traversal = options.frames.traversal();
    log::info!(
        "converting {} ({traversal:?} traversal, coordinates as '{}')",
        input.display(),
        options.format.as_str()
    );
    let mut converter = Converter::new(reader, writer);
    let n = converter.run(&options.frames)?;
    converter.finish()?;
    log::info!(
        "wrote {n} frames to {} and {}",
        lattice_path.display(),
        xyz_path.display()
    );
    Ok(n)
}
