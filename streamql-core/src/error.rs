//! Error handling for the bridge.
//!
//! Mirrors the teacher crate's approach: a single `anyhow`-backed `Result`/
//! `Error` pair rather than a bespoke error enum tree. The taxonomy from
//! spec §7 (protocol violation / rendering / driver / mapping / data-access)
//! is layered on top as a small downcastable marker so call sites that care
//! can classify a failure instead of string-matching it.

use std::fmt::{self, Display};

pub use ::anyhow::Context as ErrorContext;

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T>;

/// Truncates a displayed query to a bounded length before it is attached as
/// error context, so a pathological query body never blows up a log line.
#[macro_export]
macro_rules! printable_query {
    ($sql:expr) => {{
        let rendered = format!("{}", $sql);
        rendered.chars().take(500).collect::<String>()
    }};
}

/// Classification for errors raised by the bridge itself (as opposed to
/// opaque errors bubbled up from a driver or renderer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `request(n)` called with `n <= 0` (reactive-streams rule 3.9).
    InvalidArgument,
    /// Failure inside the external SQL renderer.
    Rendering,
    /// Failure reported by the underlying driver (statement, bind, execute, close).
    Driver,
    /// Exception raised while mapping a row into a record.
    Mapping,
    /// Failure of a blocking helper (includes interruption).
    DataAccess,
}

#[derive(Debug)]
struct TaxonomyError {
    kind: ErrorKind,
    message: String,
}

impl Display for TaxonomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaxonomyError {}

fn classified(kind: ErrorKind, message: impl Display) -> Error {
    Error::new(TaxonomyError {
        kind,
        message: message.to_string(),
    })
}

/// Returns the [`ErrorKind`] if `error` (or one of its causes) was produced
/// by one of this module's constructors.
pub fn kind_of(error: &Error) -> Option<ErrorKind> {
    error.chain().find_map(|cause| {
        cause
            .downcast_ref::<TaxonomyError>()
            .map(|taxonomy| taxonomy.kind)
    })
}

pub fn invalid_argument(message: impl Display) -> Error {
    classified(ErrorKind::InvalidArgument, message)
}

pub fn rendering(message: impl Display) -> Error {
    classified(ErrorKind::Rendering, message)
}

pub fn driver(message: impl Display) -> Error {
    classified(ErrorKind::Driver, message)
}

pub fn mapping(message: impl Display) -> Error {
    classified(ErrorKind::Mapping, message)
}

pub fn data_access(message: impl Display) -> Error {
    classified(ErrorKind::DataAccess, message)
}
