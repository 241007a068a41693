//! Error types shared across the library.

use thiserror::Error;

/// Errors produced by the geodetic transform engine.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The iterative geodetic latitude solve failed to settle within its
    /// iteration bound.
    #[error("latitude iteration did not converge within {limit} iterations")]
    NonConvergence { limit: u32 },

    /// A displacement lookup fell outside the loaded grid coverage.
    #[error("lon/lat outside displacement grid limits: lon={lon:.8} lat={lat:.8}")]
    OutOfGridBounds { lon: f64, lat: f64 },

    /// The spatial reference is not based on NAD83 or WGS84.
    #[error("unsupported datum for spatial reference {definition}")]
    UnsupportedDatum { definition: String },

    /// A point was handed to a transform in the wrong reference frame.
    #[error("expected coordinates in {expected}, got {got}")]
    FrameMismatch { expected: String, got: String },

    /// The projection collaborator failed to build or apply a conversion.
    #[error("projection failure: {0}")]
    Projection(String),

    /// A grid or dims file could not be read or written.
    #[error("grid i/o: {0}")]
    GridIo(#[from] std::io::Error),

    /// A grid or dims file did not match the expected format.
    #[error("bad grid data: {0}")]
    GridFormat(String),
}

/// A malformed search-query term.
///
/// Carries the offending token and, when available, the search phrase it
/// appeared in. Parse errors are recoverable at the request boundary and
/// are meant to be shown to the user as formatted messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad search term \"{token}\"{}", .context.as_deref().map(|c| format!(" in \"{c}\"")).unwrap_or_default())]
pub struct ParseError {
    /// The term that failed to parse.
    pub token: String,
    /// The containing search phrase, when one exists.
    pub context: Option<String>,
}

impl ParseError {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            context: None,
        }
    }

    pub fn with_context(token: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            context: Some(context.into()),
        }
    }
}

/// A malformed or out-of-sequence traverse-language command.
///
/// Processing stops at the first bad command; traverse state is cumulative
/// so everything after a bad line is suspect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{line}] {reason}: {text}")]
pub struct BadCommand {
    /// 1-based line number of the offending command.
    pub line: usize,
    /// Short description of what was wrong.
    pub reason: String,
    /// The raw command line.
    pub text: String,
}

impl BadCommand {
    pub fn new(line: usize, reason: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
            text: text.into(),
        }
    }
}

/// Errors reading or writing point-file formats.
#[derive(Error, Debug)]
pub enum FormatError {
    /// A PNEZD data line did not split into exactly five comma fields or
    /// held non-numeric coordinates.
    #[error("bad PNEZD format: {line}")]
    BadPnezd { line: String },

    /// The GPX document failed to parse or a waypoint was malformed.
    #[error("bad GPX document: {0}")]
    BadGpx(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
