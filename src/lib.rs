//! Convert LAMMPS dump trajectories into lattice (`.H`) and coordinate (`.xyz`) files.
//!
//! A dump is read one frame at a time. Each frame's box bounds are turned into a [`Lattice`],
//! its atoms are sorted by id and shifted such that the center of the cell is the origin, and
//! the result is appended to the two output files by a [`FrameWriter`].
//!
//! ```no_run
//! use ltconv::{convert, ConvertOptions, FrameSelection};
//!
//! let options = ConvertOptions::new(vec![100, 20])
//!     .with_frames(FrameSelection::FrameList(vec![4, 0, 2]));
//! let nframes = convert("dump.lammpstrj", &options)?;
//! # Ok::<(), ltconv::Error>(())
//! ```
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use glam::DVec3;

use crate::reader::{Heading, LineCursor, TIMESTEP};
pub use crate::convert::{convert, default_output_paths, ConvertOptions, Converter, Stage};
pub use crate::error::{Error, Result};
pub use crate::format::CoordFormat;
pub use crate::lattice::{BoxBounds, Lattice, Tilt};
pub use crate::reader::Header;
pub use crate::selection::{FrameSelection, Range, Traversal};
pub use crate::writer::FrameWriter;

mod convert;
mod error;
mod format;
mod lattice;
pub mod reader;
pub mod selection;
mod writer;

/// A single particle in a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub id: i64,
    /// Unwrapped position. Relative to the cell center once the frame has been recentered.
    pub position: DVec3,
    pub element: &'static str,
    /// Any further columns of the dump, keyed by column name.
    pub extra: BTreeMap<String, String>,
}

impl Atom {
    /// Returns every field of this atom, ordered alphabetically by column name.
    pub fn record(&self) -> BTreeMap<&str, String> {
        let mut record: BTreeMap<&str, String> = self
            .extra
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();
        record.insert("element", self.element.to_string());
        record.insert("id", self.id.to_string());
        record.insert("xu", self.position.x.to_string());
        record.insert("yu", self.position.y.to_string());
        record.insert("zu", self.position.z.to_string());
        record
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Frame {
    pub timestep: i64,
    pub bounds: BoxBounds,
    /// Sorted by ascending id.
    pub atoms: Vec<Atom>,
}

impl Frame {
    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn coords(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.atoms.iter().map(|atom| atom.position)
    }

    pub fn lattice(&self) -> Lattice {
        Lattice::from_bounds(&self.bounds)
    }

    /// Shifts every atom such that `center` becomes the origin.
    pub fn recenter(&mut self, center: DVec3) {
        for atom in &mut self.atoms {
            atom.position -= center;
        }
    }
}

/// The start of a frame's body in a dump: the line right after its [`TIMESTEP`] marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    /// Byte position in the stream.
    pub byte: u64,
    /// Number of lines before `byte`.
    pub line: usize,
}

/// Reads frames from a LAMMPS dump.
///
/// The reader is a cursor between frames: [`DumpReader::next_frame`] moves it past the next
/// `ITEM: TIMESTEP` marker, after which the body of that frame can be read or skipped.
#[derive(Debug)]
pub struct DumpReader<R> {
    cursor: LineCursor<R>,
    /// Index of the frame whose marker was passed last.
    current: Option<usize>,
}

impl DumpReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> DumpReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            cursor: LineCursor::new(reader),
            current: None,
        }
    }

    /// The index of the frame the reader is in, if it has found one yet.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// The number of frames the reader has moved into so far.
    pub fn frames_seen(&self) -> usize {
        self.current.map_or(0, |idx| idx + 1)
    }

    /// The index errors are attributed to.
    fn frame_idx(&self) -> usize {
        self.current.unwrap_or(0)
    }

    /// Scans forward to the next `ITEM: TIMESTEP` marker.
    ///
    /// Returns the index of the frame that starts there, or [`None`] at the end of the stream.
    pub fn next_frame(&mut self) -> Result<Option<usize>> {
        if self.cursor.find_heading(TIMESTEP, Heading::Line)?.is_none() {
            return Ok(None);
        }
        let idx = self.frames_seen();
        self.current = Some(idx);
        Ok(Some(idx))
    }

    /// Reads the header of the current frame.
    pub fn read_header(&mut self) -> Result<Header> {
        let frame = self.frame_idx();
        reader::read_header(&mut self.cursor, frame)
    }

    /// Reads the atom table of the current frame into `atoms`, sorted by id.
    pub fn read_atoms(&mut self, natoms: usize, atoms: &mut Vec<Atom>) -> Result<()> {
        let frame = self.frame_idx();
        reader::read_atoms(&mut self.cursor, natoms, frame, atoms)
    }

    /// Reads the body of the current frame into `frame`.
    ///
    /// The positions are left as they are in the dump, not recentered.
    pub fn read_frame(&mut self, frame: &mut Frame) -> Result<()> {
        let header = self.read_header()?;
        self.read_atoms(header.natoms, &mut frame.atoms)?;
        frame.timestep = header.timestep;
        frame.bounds = header.bounds;
        Ok(())
    }

    /// Moves past the body of the current frame without decoding its atoms.
    pub fn skip_frame(&mut self) -> Result<Header> {
        let header = self.read_header()?;
        let frame = self.frame_idx();
        reader::skip_atoms(&mut self.cursor, header.natoms, frame)?;
        Ok(header)
    }

    /// A convenience function to read all remaining frames in a dump.
    ///
    /// Every frame is held in memory at once. Prefer [`DumpReader::next_frame`] and
    /// [`DumpReader::read_frame`] for large trajectories.
    pub fn read_all_frames(&mut self) -> Result<Box<[Frame]>> {
        let mut frames = Vec::new();
        while self.next_frame()?.is_some() {
            let mut frame = Frame::default();
            self.read_frame(&mut frame)?;
            frames.push(frame);
        }
        Ok(frames.into_boxed_slice())
    }
}

impl<R: BufRead + Seek> DumpReader<R> {
    /// Returns to the start of the stream.
    pub fn home(&mut self) -> Result<()> {
        self.cursor.seek_to(0, 0)?;
        self.current = None;
        Ok(())
    }

    /// Returns the offsets of the frames in this dump, from the current position onwards.
    ///
    /// At most `until` offsets are collected. Fewer are returned if the stream ends first. The
    /// reader is returned to where it started afterwards.
    ///
    /// # Errors
    ///
    /// This function will pass through any reader errors.
    pub fn determine_offsets(&mut self, until: Option<usize>) -> Result<Box<[Offset]>> {
        // Remember where we start so we can return to it later.
        let start = Offset {
            byte: self.cursor.stream_position()?,
            line: self.cursor.line(),
        };
        let current = self.current;

        let mut offsets = Vec::new();
        while until.map_or(true, |until| offsets.len() < until) {
            if self.cursor.find_heading(TIMESTEP, Heading::Line)?.is_none() {
                break;
            }
            let offset = Offset {
                byte: self.cursor.stream_position()?,
                line: self.cursor.line(),
            };
            log::debug!("frame {} starts at byte {}", offsets.len(), offset.byte);
            offsets.push(offset);
        }

        self.cursor.seek_to(start.byte, start.line)?;
        self.current = current;
        Ok(offsets.into_boxed_slice())
    }

    /// Moves to the body of the frame with index `idx`, which starts at `offset`.
    pub fn seek_frame(&mut self, idx: usize, offset: Offset) -> Result<()> {
        self.cursor.seek_to(offset.byte, offset.line)?;
        self.current = Some(idx);
        Ok(())
    }

    /// Seeks to the frame with index `idx` at `offset`, then reads it into `frame`.
    pub fn read_frame_at_offset(
        &mut self,
        frame: &mut Frame,
        idx: usize,
        offset: Offset,
    ) -> Result<()> {
        self.seek_frame(idx, offset)?;
        self.read_frame(frame)
    }
}
