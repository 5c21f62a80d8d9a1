use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::format::{write_centered_general, CoordFormat};
use crate::{Frame, Lattice};

const LATTICE_WIDTH: usize = 26;
const LATTICE_PRECISION: usize = 17;

/// Appends converted frames to a lattice (`.H`) and a coordinate (`.xyz`) stream.
///
/// Each frame is written as soon as it is handed over; nothing is kept between frames except a
/// line buffer.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    lattice: W,
    xyz: W,
    species: Vec<usize>,
    format: CoordFormat,
    line: String,
}

impl FrameWriter<BufWriter<File>> {
    /// Creates (or truncates) both output files.
    pub fn create(
        lattice_path: impl AsRef<Path>,
        xyz_path: impl AsRef<Path>,
        species: Vec<usize>,
        format: CoordFormat,
    ) -> Result<Self> {
        if species.is_empty() {
            return Err(Error::NoSpecies);
        }
        let lattice = BufWriter::new(File::create(lattice_path)?);
        let xyz = BufWriter::new(File::create(xyz_path)?);
        Self::new(lattice, xyz, species, format)
    }
}

impl<W: Write> FrameWriter<W> {
    /// `species` holds the number of molecules of each species, which is echoed into every
    /// lattice record.
    pub fn new(lattice: W, xyz: W, species: Vec<usize>, format: CoordFormat) -> Result<Self> {
        if species.is_empty() {
            return Err(Error::NoSpecies);
        }
        Ok(Self {
            lattice,
            xyz,
            species,
            format,
            line: String::new(),
        })
    }

    pub fn species(&self) -> &[usize] {
        &self.species
    }

    /// Appends one record to each of the two outputs.
    ///
    /// The atoms of `frame` are written as they are, so they should already be recentered.
    pub fn write_frame(&mut self, frame: &Frame, lattice: &Lattice) -> io::Result<()> {
        self.write_lattice(lattice)?;
        self.write_coordinates(frame)
    }

    fn write_lattice(&mut self, lattice: &Lattice) -> io::Result<()> {
        self.line.clear();
        push_general(&mut self.line, lattice.volume);
        self.line.push('\n');
        for row in lattice.rows() {
            for value in row.to_array() {
                push_general(&mut self.line, value);
            }
            self.line.push('\n');
        }
        self.line.push('\n');
        self.lattice.write_all(self.line.as_bytes())?;

        writeln!(self.lattice, "{:>12}", self.species.len())?;
        for (idx, count) in self.species.iter().enumerate() {
            writeln!(self.lattice, "{:>12}{:>12}", idx + 1, count)?;
        }
        Ok(())
    }

    fn write_coordinates(&mut self, frame: &Frame) -> io::Result<()> {
        writeln!(self.xyz, "{:>12}", frame.natoms())?;
        writeln!(self.xyz, " TIMESTEP: {:>11}", frame.timestep)?;
        for atom in &frame.atoms {
            self.line.clear();
            self.line.push_str(atom.element);
            for value in atom.position.to_array() {
                self.line.push(' ');
                self.format.render_into(&mut self.line, value);
            }
            self.line.push('\n');
            self.xyz.write_all(self.line.as_bytes())?;
        }
        Ok(())
    }

    /// Flushes both outputs and hands them back.
    pub fn finish(mut self) -> io::Result<(W, W)> {
        self.lattice.flush()?;
        self.xyz.flush()?;
        Ok((self.lattice, self.xyz))
    }
}

fn push_general(line: &mut String, value: f64) {
    // Writing into a String cannot fail.
    let _ = write_centered_general(line, value, LATTICE_WIDTH, LATTICE_PRECISION);
}
