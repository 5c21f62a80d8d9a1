use std::num::{NonZeroUsize, ParseIntError};
use std::str::FromStr;

/// A selection of [`Frame`](super::Frame)s to convert.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// Include all frames that are in a trajectory, in order.
    #[default]
    All,
    /// Include the frames with these indices, in the order given.
    ///
    /// The list may be in any order and may repeat indices. Each entry produces one converted
    /// frame.
    FrameList(Vec<usize>),
}

/// How a dump has to be traversed to honor a [`FrameSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// A single forward pass.
    Sequential,
    /// A forward pass to index the frame offsets, then a seek for each requested frame.
    RandomAccess,
}

impl FrameSelection {
    /// Returns the [`Traversal`] this selection requires.
    ///
    /// A frame list that is not strictly increasing cannot be produced in one forward pass.
    pub fn traversal(&self) -> Traversal {
        match self {
            FrameSelection::All => Traversal::Sequential,
            FrameSelection::FrameList(indices) => {
                if indices.windows(2).any(|w| w[0] >= w[1]) {
                    Traversal::RandomAccess
                } else {
                    Traversal::Sequential
                }
            }
        }
    }

    /// Whether this selection selects nothing at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, FrameSelection::FrameList(indices) if indices.is_empty())
    }

    /// The number of frames that have to be scanned to cover this selection, if bounded.
    pub fn until(&self) -> Option<usize> {
        match self {
            FrameSelection::All => None,
            FrameSelection::FrameList(indices) => Some(indices.iter().max().map_or(0, |m| m + 1)),
        }
    }

    /// Determine whether some index `idx` is included in this [`FrameSelection`].
    ///
    /// Will return [`None`] once the index is beyond the scope of this `FrameSelection`.
    ///
    /// For a frame list, this is only meaningful if the list is strictly increasing, i.e., if its
    /// [`Traversal`] is sequential.
    pub fn is_included(&self, idx: usize) -> Option<bool> {
        match self {
            FrameSelection::All => Some(true),
            FrameSelection::FrameList(indices) => {
                if *indices.last()? < idx {
                    None
                } else {
                    Some(indices.binary_search(&idx).is_ok())
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseSelectionError {
    #[error("invalid frame index: {0}")]
    Index(#[from] ParseIntError),
    #[error("the range '{0}' needs an end")]
    UnboundedRange(String),
    #[error("the range '{0}' has a step of zero")]
    ZeroStep(String),
}

/// Parses a comma-separated list of frame indices and ranges, e.g. `0,5,2:8:3`.
///
/// Order is preserved, and an empty string selects no frames at all.
impl FromStr for FrameSelection {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut indices = Vec::new();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if item.contains(':') {
                indices.extend(item.parse::<Range>()?.indices());
            } else {
                indices.push(item.parse()?);
            }
        }
        Ok(FrameSelection::FrameList(indices))
    }
}

/// A bounded, stepped range of frame indices in the format `start:end:step`.
///
/// The `start` is zero by default and the `step` is one by default. The `end` is exclusive and
/// must be given.
///
/// # Note
///
/// An instance where `start` > `end` is a valid `Range`, but it will not make much sense, since
/// the `Range` will be understood to produce zero indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
    /// The number of skipped frames is equal to `step` - 1.
    pub step: NonZeroUsize,
}

impl Range {
    pub fn new(start: Option<usize>, end: usize, step: Option<NonZeroUsize>) -> Self {
        Self {
            start: start.unwrap_or(0),
            end,
            step: step.unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..self.end).step_by(self.step.get())
    }
}

impl FromStr for Range {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut components = s.split(':').map(str::trim);
        let mut next = || -> Result<Option<usize>, ParseIntError> {
            match components.next() {
                Some("") | None => Ok(None),
                Some(c) => c.parse().map(Some),
            }
        };
        let start = next()?;
        let end = next()?.ok_or_else(|| ParseSelectionError::UnboundedRange(s.to_string()))?;
        let step = match next()? {
            Some(step) => {
                Some(NonZeroUsize::new(step).ok_or_else(|| ParseSelectionError::ZeroStep(s.to_string()))?)
            }
            None => None,
        };
        Ok(Range::new(start, end, step))
    }
}
