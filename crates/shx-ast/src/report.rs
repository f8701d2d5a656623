//! Diagnostics: source areas, the error taxonomy and the [`Report`] record
//! surfaced at the compilation boundary.

use std::fmt;

use thiserror::Error;

/// Area of the preprocessed source an AST node was parsed from.
///
/// Rows and columns are one-based; a zero row means "no source location"
/// (used for nodes synthesized during conversion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceArea {
    pub row: u32,
    pub col: u32,
    pub length: u32,
}

impl SourceArea {
    pub fn new(row: u32, col: u32, length: u32) -> Self {
        Self { row, col, length }
    }

    /// Returns true if this area points at an actual source position.
    pub fn is_valid(self) -> bool {
        self.row > 0
    }
}

impl fmt::Display for SourceArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// The failure classes of the back-end pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A construct has no GLSL equivalent.
    #[error("no GLSL equivalent for {construct}: {context}")]
    Mapping {
        construct: &'static str,
        context: String,
    },
    /// Malformed swizzle, out-of-range dimension or bad matrix subscript.
    #[error("invalid argument: {context}")]
    InvalidArgument { context: String },
    /// Requested output version is below the computed minimum and extensions
    /// are disabled.
    #[error("output version {requested} is below the required minimum {required}")]
    VersionMismatch { requested: u16, required: u16 },
    /// A required reference is absent (unresolved symbol, missing entry
    /// point, texture type without declaration).
    #[error("missing reference: {context}")]
    MissingReference { context: String },
    /// Intrinsic called with the wrong number of arguments.
    #[error("intrinsic '{intrinsic}' called with {got} argument(s), expected {min}..={max}")]
    InvalidNumArgs {
        intrinsic: &'static str,
        got: usize,
        min: usize,
        max: usize,
    },
}

/// An error with an optional source attribution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    pub area: Option<SourceArea>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, area: None }
    }

    pub fn at(kind: ErrorKind, area: SourceArea) -> Self {
        Self {
            kind,
            area: area.is_valid().then_some(area),
        }
    }

    /// Attaches `area` unless the error already carries one.
    pub fn with_area(mut self, area: SourceArea) -> Self {
        if self.area.is_none() && area.is_valid() {
            self.area = Some(area);
        }
        self
    }

    pub fn mapping(construct: &'static str, context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Mapping {
            construct,
            context: context.into(),
        })
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            context: context.into(),
        })
    }

    pub fn missing_reference(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingReference {
            context: context.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A structured diagnostic written to the caller's sink.
///
/// Errors abort the granularity documented on [`ErrorKind`]; warnings never
/// stop emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
    pub area: Option<SourceArea>,
}

impl Report {
    pub fn warning(message: impl Into<String>, area: Option<SourceArea>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            area,
        }
    }
}

impl From<Error> for Report {
    fn from(err: Error) -> Self {
        Self {
            severity: Severity::Error,
            message: err.kind.to_string(),
            area: err.area,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.area {
            Some(area) => write!(f, "{} ({}): {}", self.severity, area, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_from_error_keeps_area() {
        let err = Error::at(
            ErrorKind::InvalidArgument {
                context: "bad swizzle".into(),
            },
            SourceArea::new(12, 3, 4),
        );
        let report = Report::from(err);
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.area, Some(SourceArea::new(12, 3, 4)));
        assert_eq!(report.to_string(), "error (12:3): invalid argument: bad swizzle");
    }

    #[test]
    fn with_area_does_not_overwrite() {
        let err = Error::at(
            ErrorKind::MissingReference {
                context: "x".into(),
            },
            SourceArea::new(1, 1, 1),
        )
        .with_area(SourceArea::new(9, 9, 9));
        assert_eq!(err.area, Some(SourceArea::new(1, 1, 1)));
    }
}
