//! The error taxonomy shared by every layer of the core (spec §7).
//!
//! Each layer returns a `Result<T, Error>` to the layer above it; nothing
//! silently continues past an error except the two documented fallbacks (the
//! allocator degrading to linear-scan, and the selector degrading to the
//! target's default `map_instruction`). `Error` intentionally implements
//! `std::error::Error`/`Display` by hand instead of deriving from `thiserror`,
//! mirroring `cranelift-codegen::isa::LookupError`'s own rationale for doing
//! so: keep this crate's dependency surface minimal since it is meant to be
//! embedded in other compilers.

use core::fmt;

/// A single error raised by any `forgecc` component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Null handle, out-of-range index, or other caller misuse.
    BadArgument(String),
    /// The allocator shim refused an allocation.
    OutOfMemory,
    /// A module, pass, pipeline, or target name was not found.
    UnknownName(String),
    /// A name was already registered.
    DuplicateName(String),
    /// A malformed type word or config text was encountered.
    BadEncoding(String),
    /// The selector had no matching pattern and no default.
    NoSelection(String),
    /// A requested feature (output format, allocation algorithm) is not
    /// implemented; caller should fall back when possible.
    Unsupported(String),
    /// An invariant of the core was violated.
    Internal(String),
}

impl Error {
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        Error::BadArgument(msg.into())
    }

    pub fn unknown_name(msg: impl Into<String>) -> Self {
        Error::UnknownName(msg.into())
    }

    pub fn duplicate_name(msg: impl Into<String>) -> Self {
        Error::DuplicateName(msg.into())
    }

    pub fn bad_encoding(msg: impl Into<String>) -> Self {
        Error::BadEncoding(msg.into())
    }

    pub fn no_selection(msg: impl Into<String>) -> Self {
        Error::NoSelection(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadArgument(m) => write!(f, "bad argument: {m}"),
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::UnknownName(m) => write!(f, "unknown name: {m}"),
            Error::DuplicateName(m) => write!(f, "duplicate name: {m}"),
            Error::BadEncoding(m) => write!(f, "bad encoding: {m}"),
            Error::NoSelection(m) => write!(f, "no selection: {m}"),
            Error::Unsupported(m) => write!(f, "unsupported: {m}"),
            Error::Internal(m) => write!(f, "internal error: {m}"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
