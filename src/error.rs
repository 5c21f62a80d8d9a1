use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a conversion run.
///
/// Frame-scoped variants carry the index of the frame that was being read and an approximate
/// (1-based) line number in the input.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("frame {frame}: input ended before {expected} (at line ~{line})")]
    TruncatedFrame {
        frame: usize,
        expected: &'static str,
        line: usize,
    },

    #[error("frame {frame}: malformed header value: {details} (at line ~{line})")]
    MalformedHeader {
        frame: usize,
        line: usize,
        details: String,
    },

    #[error("frame {frame}: malformed atom record: {details} (at line ~{line})")]
    MalformedRecord {
        frame: usize,
        line: usize,
        details: String,
    },

    #[error(
        "requested frame index {requested} exceeds the maximum frame index {}",
        describe_last_valid(.last_valid)
    )]
    FrameIndex {
        requested: usize,
        last_valid: Option<usize>,
    },

    #[error("frame {frame}: box bounds yield a non-positive cell volume ({volume})")]
    Geometry { frame: usize, volume: f64 },

    #[error("invalid coordinate format '{format}': {details}")]
    InvalidFormat { format: String, details: String },

    #[error("at least one species count is required")]
    NoSpecies,
}

impl Error {
    pub(crate) fn truncated(frame: usize, line: usize, expected: &'static str) -> Self {
        Self::TruncatedFrame {
            frame,
            expected,
            line,
        }
    }

    pub(crate) fn header(frame: usize, line: usize, details: impl Into<String>) -> Self {
        Self::MalformedHeader {
            frame,
            line,
            details: details.into(),
        }
    }

    pub(crate) fn record(frame: usize, line: usize, details: impl Into<String>) -> Self {
        Self::MalformedRecord {
            frame,
            line,
            details: details.into(),
        }
    }

    /// Returns the index of the frame this error occurred in, if it is frame-scoped.
    pub fn frame(&self) -> Option<usize> {
        match self {
            Self::TruncatedFrame { frame, .. }
            | Self::MalformedHeader { frame, .. }
            | Self::MalformedRecord { frame, .. }
            | Self::Geometry { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}

fn describe_last_valid(last_valid: &Option<usize>) -> String {
    match last_valid {
        Some(idx) => idx.to_string(),
        None => String::from("(the trajectory holds no frames)"),
    }
}
