#![allow(dead_code)]

use std::fmt::Write;
use std::io::Cursor;

use ltconv::{CoordFormat, Converter, DumpReader, FrameSelection, FrameWriter};

/// One frame of a synthetic dump.
pub struct DumpFrame {
    pub timestep: i64,
    pub lo: [f64; 3],
    pub hi: [f64; 3],
    /// `xy xz yz`, for a triclinic box.
    pub tilt: Option<[f64; 3]>,
    pub columns: &'static str,
    pub rows: Vec<String>,
}

impl DumpFrame {
    /// An orthogonal frame with `id xu yu zu` columns.
    pub fn orthogonal(timestep: i64, lo: [f64; 3], hi: [f64; 3], atoms: &[(i64, [f64; 3])]) -> Self {
        Self {
            timestep,
            lo,
            hi,
            tilt: None,
            columns: "id xu yu zu",
            rows: atoms
                .iter()
                .map(|(id, [x, y, z])| format!("{id} {x} {y} {z}"))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut s = String::new();
        writeln!(s, "ITEM: TIMESTEP\n{}", self.timestep).unwrap();
        writeln!(s, "ITEM: NUMBER OF ATOMS\n{}", self.rows.len()).unwrap();
        match self.tilt {
            Some(tilt) => {
                writeln!(s, "ITEM: BOX BOUNDS xy xz yz pp pp pp").unwrap();
                for dim in 0..3 {
                    writeln!(s, "{} {} {}", self.lo[dim], self.hi[dim], tilt[dim]).unwrap();
                }
            }
            None => {
                writeln!(s, "ITEM: BOX BOUNDS pp pp pp").unwrap();
                for dim in 0..3 {
                    writeln!(s, "{} {}", self.lo[dim], self.hi[dim]).unwrap();
                }
            }
        }
        writeln!(s, "ITEM: ATOMS {}", self.columns).unwrap();
        for row in &self.rows {
            writeln!(s, "{row}").unwrap();
        }
        s
    }
}

pub fn dump(frames: &[DumpFrame]) -> String {
    frames.iter().map(DumpFrame::render).collect()
}

/// A dump of `nframes` frames with three atoms each, listed out of id order.
///
/// Frame `i` has timestep `100 * i` and a cubic box of edge `10 + i`, so every frame converts to
/// distinct output.
pub fn numbered(nframes: usize) -> String {
    let frames: Vec<DumpFrame> = (0..nframes)
        .map(|i| {
            let f = i as f64;
            let edge = 10.0 + f;
            DumpFrame::orthogonal(
                100 * i as i64,
                [0.0; 3],
                [edge; 3],
                &[
                    (3, [1.0 + f, 2.0, 3.0]),
                    (1, [4.0, 5.0 + f, 6.0]),
                    (2, [7.0, 8.0, 9.0 + f]),
                ],
            )
        })
        .collect();
    dump(&frames)
}

/// The two outputs of a conversion.
pub struct Converted {
    pub lattice: String,
    pub xyz: String,
}

impl Converted {
    /// Splits the lattice output into per-frame records, given the number of species.
    pub fn lattice_records(&self, nspecies: usize) -> Vec<String> {
        chunk_lines(&self.lattice, |_| 6 + nspecies)
    }

    /// Splits the coordinate output into per-frame records.
    pub fn xyz_records(&self) -> Vec<String> {
        chunk_lines(&self.xyz, |first| {
            2 + first.trim().parse::<usize>().expect("atom count line")
        })
    }
}

fn chunk_lines(text: &str, len: impl Fn(&str) -> usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();
    let mut start = 0;
    while start < lines.len() {
        let end = start + len(lines[start]);
        assert!(end <= lines.len(), "incomplete record at line {start}");
        records.push(lines[start..end].join("\n"));
        start = end;
    }
    records
}

/// Converts an in-memory dump.
pub fn convert_str(
    input: &str,
    species: &[usize],
    selection: &FrameSelection,
) -> ltconv::Result<Converted> {
    convert_str_with(input, species, selection, CoordFormat::default())
}

pub fn convert_str_with(
    input: &str,
    species: &[usize],
    selection: &FrameSelection,
    format: CoordFormat,
) -> ltconv::Result<Converted> {
    let reader = DumpReader::new(Cursor::new(input.as_bytes()));
    let writer = FrameWriter::new(Vec::new(), Vec::new(), species.to_vec(), format)?;
    let mut converter = Converter::new(reader, writer);
    converter.run(selection)?;
    let (lattice, xyz) = converter.finish()?;
    Ok(Converted {
        lattice: String::from_utf8(lattice).expect("lattice output is utf-8"),
        xyz: String::from_utf8(xyz).expect("xyz output is utf-8"),
    })
}
