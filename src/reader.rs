use std::collections::BTreeMap;
use std::io::{self, BufRead, Seek, SeekFrom};
use std::str::FromStr;

use glam::DVec3;

use crate::error::{Error, Result};
use crate::lattice::{BoxBounds, Tilt};
use crate::Atom;

pub const TIMESTEP: &str = "ITEM: TIMESTEP";
pub const NUMBER_OF_ATOMS: &str = "ITEM: NUMBER OF ATOMS";
pub const BOX_BOUNDS: &str = "ITEM: BOX BOUNDS";
pub const ATOMS: &str = "ITEM: ATOMS ";

/// Placeholder element written for every atom, since dumps carry no chemical element.
pub const ELEMENT_LABEL: &str = "X";

/// Upper bound on the atoms reserved upfront for a single table.
const MAX_RESERVED_ATOMS: usize = 1 << 20;

/// Columns that every atom table must declare.
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "xu", "yu", "zu"];

/// How the remainder of a marker line is treated once the marker is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// The whole line is boilerplate and is discarded.
    Line,
    /// The rest of the line after the marker is payload and is handed back.
    Peek,
}

/// A forward-only line reader that keeps track of where it is.
#[derive(Debug)]
pub struct LineCursor<R> {
    inner: R,
    buf: String,
    /// Number of lines consumed so far, which is also the 1-based number of the last line read.
    line: usize,
}

impl<R> LineCursor<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: String::new(),
            line: 0,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> LineCursor<R> {
    /// Reads the next line, including its terminator. Returns [`None`] at the end of the stream.
    pub fn next_line(&mut self) -> io::Result<Option<&str>> {
        self.buf.clear();
        if self.inner.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some(&self.buf))
    }

    /// Scans forward, line by line, for a line starting with `marker`.
    ///
    /// Returns [`None`] if the stream ends before a match. Otherwise, returns the remainder of the
    /// marker line for [`Heading::Peek`] and an empty string for [`Heading::Line`].
    pub fn find_heading(&mut self, marker: &str, mode: Heading) -> io::Result<Option<&str>> {
        loop {
            self.buf.clear();
            if self.inner.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if self.buf.starts_with(marker) {
                break;
            }
        }

        Ok(Some(match mode {
            Heading::Line => "",
            Heading::Peek => self.buf[marker.len()..].trim_end_matches(['\n', '\r']),
        }))
    }

    /// Consumes `n` lines, failing if the stream ends first.
    pub fn skip_lines(&mut self, n: usize) -> io::Result<usize> {
        for skipped in 0..n {
            self.buf.clear();
            if self.inner.read_line(&mut self.buf)? == 0 {
                return Ok(skipped);
            }
            self.line += 1;
        }
        Ok(n)
    }
}

impl<R: Seek> LineCursor<R> {
    /// The byte position of the next unread line.
    pub fn stream_position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    /// Moves to `offset`, which is taken to be the start of line `line + 1`.
    pub fn seek_to(&mut self, offset: u64, line: usize) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.line = line;
        Ok(())
    }
}

/// The metadata block of a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Header {
    pub timestep: i64,
    pub natoms: usize,
    pub bounds: BoxBounds,
}

fn parse_value<T: FromStr>(s: &str, what: &str, frame: usize, line: usize) -> Result<T> {
    let s = s.trim();
    s.parse()
        .map_err(|_| Error::header(frame, line, format!("cannot read {what} from '{s}'")))
}

/// Reads a frame's header, starting right after its [`TIMESTEP`] marker line.
pub fn read_header<R: BufRead>(cursor: &mut LineCursor<R>, frame: usize) -> Result<Header> {
    let line = cursor.line() + 1;
    let timestep = match cursor.next_line()? {
        Some(s) => parse_value(s, "timestep", frame, line)?,
        None => return Err(Error::truncated(frame, line, "the timestep value")),
    };

    if cursor.find_heading(NUMBER_OF_ATOMS, Heading::Line)?.is_none() {
        return Err(Error::truncated(frame, cursor.line(), NUMBER_OF_ATOMS));
    }
    let line = cursor.line() + 1;
    let natoms = match cursor.next_line()? {
        Some(s) => parse_value(s, "number of atoms", frame, line)?,
        None => return Err(Error::truncated(frame, line, "the number of atoms")),
    };

    // The remainder of the marker line holds the boundary conditions, prefixed by `xy xz yz`
    // for a triclinic box.
    let triclinic = match cursor.find_heading(BOX_BOUNDS, Heading::Peek)? {
        Some(rest) => rest.split_whitespace().next() == Some("xy"),
        None => return Err(Error::truncated(frame, cursor.line(), BOX_BOUNDS)),
    };
    let nvalues = if triclinic { 3 } else { 2 };

    let mut bounds = [[0.0; 3]; 3];
    for (dim, row) in bounds.iter_mut().enumerate() {
        let line = cursor.line() + 1;
        let Some(s) = cursor.next_line()? else {
            return Err(Error::truncated(frame, line, "the box bounds"));
        };
        let values: Vec<&str> = s.split_whitespace().collect();
        if values.len() < nvalues {
            return Err(Error::header(
                frame,
                line,
                format!(
                    "expected {nvalues} box bound values for dimension {dim}, found {}",
                    values.len()
                ),
            ));
        }
        for (value, s) in row.iter_mut().zip(&values[..nvalues]) {
            *value = parse_value(s, "box bound", frame, line)?;
        }
    }

    let [[xlo, xhi, xy], [ylo, yhi, xz], [zlo, zhi, yz]] = bounds;
    let lo = DVec3::new(xlo, ylo, zlo);
    let hi = DVec3::new(xhi, yhi, zhi);
    let bounds = if triclinic {
        BoxBounds::triclinic(lo, hi, Tilt { xy, xz, yz })
    } else {
        BoxBounds::orthogonal(lo, hi)
    };

    Ok(Header {
        timestep,
        natoms,
        bounds,
    })
}

/// The layout of an atom table, as declared on its [`ATOMS`] marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    names: Vec<String>,
    id: usize,
    position: [usize; 3],
}

impl Columns {
    pub fn from_declaration(declaration: &str, frame: usize, line: usize) -> Result<Self> {
        let names: Vec<String> = declaration.split_whitespace().map(String::from).collect();
        let find = |name: &str| {
            names.iter().position(|n| n == name).ok_or_else(|| {
                Error::record(frame, line, format!("the atom table has no '{name}' column"))
            })
        };
        let [id, xu, yu, zu] = REQUIRED_COLUMNS;
        Ok(Self {
            id: find(id)?,
            position: [find(xu)?, find(yu)?, find(zu)?],
            names,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn parse_row(&self, row: &str, frame: usize, line: usize) -> Result<Atom> {
        let tokens: Vec<&str> = row.split_whitespace().collect();
        if tokens.len() != self.len() {
            return Err(Error::record(
                frame,
                line,
                format!("expected {} values, found {}", self.len(), tokens.len()),
            ));
        }

        let parse = |col: usize| {
            tokens[col].parse::<f64>().map_err(|_| {
                let name = &self.names[col];
                let token = tokens[col];
                Error::record(frame, line, format!("'{token}' is not a valid {name} value"))
            })
        };
        let id = tokens[self.id].parse::<i64>().map_err(|_| {
            let token = tokens[self.id];
            Error::record(frame, line, format!("'{token}' is not a valid atom id"))
        })?;
        let [x, y, z] = self.position;
        let position = DVec3::new(parse(x)?, parse(y)?, parse(z)?);

        let extra = self
            .names
            .iter()
            .zip(&tokens)
            .enumerate()
            .filter(|&(col, _)| col != self.id && !self.position.contains(&col))
            .map(|(_, (name, token))| (name.clone(), token.to_string()))
            .collect::<BTreeMap<_, _>>();

        Ok(Atom {
            id,
            position,
            element: ELEMENT_LABEL,
            extra,
        })
    }
}

/// Reads the atom table that follows the header, sorted by atom id.
///
/// Any lines between the header and the [`ATOMS`] marker are skipped.
pub fn read_atoms<R: BufRead>(
    cursor: &mut LineCursor<R>,
    natoms: usize,
    frame: usize,
    atoms: &mut Vec<Atom>,
) -> Result<()> {
    let Some(declaration) = cursor
        .find_heading(ATOMS, Heading::Peek)?
        .map(str::to_owned)
    else {
        return Err(Error::truncated(frame, cursor.line(), ATOMS.trim_end()));
    };
    let columns = Columns::from_declaration(&declaration, frame, cursor.line())?;

    atoms.clear();
    // The declared count is untrusted until the rows are actually there.
    atoms.reserve(natoms.min(MAX_RESERVED_ATOMS));
    for _ in 0..natoms {
        let line = cursor.line() + 1;
        let Some(row) = cursor.next_line()? else {
            return Err(Error::truncated(frame, line, "the end of the atom table"));
        };
        atoms.push(columns.parse_row(row, frame, line)?);
    }

    // Stable, so atoms sharing an id keep their order in the dump.
    atoms.sort_by_key(|atom| atom.id);
    Ok(())
}

/// Consumes the atom table that follows the header without decoding it.
pub fn skip_atoms<R: BufRead>(
    cursor: &mut LineCursor<R>,
    natoms: usize,
    frame: usize,
) -> Result<()> {
    if cursor.find_heading(ATOMS, Heading::Line)?.is_none() {
        return Err(Error::truncated(frame, cursor.line(), ATOMS.trim_end()));
    }
    if cursor.skip_lines(natoms)? < natoms {
        return Err(Error::truncated(
            frame,
            cursor.line() + 1,
            "the end of the atom table",
        ));
    }
    Ok(())
}
