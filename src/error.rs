//! The error taxonomy from spec.md §7, expressed as real types instead
//! of the original's `errno` + magic-constant convention.
//!
//! Naming (`CancelStat`, `LioMode`, `LioOpcode`, `FsyncMode`) follows
//! `nix::sys::aio`'s `AioCancelStat`/`LioMode`/`AioFsyncMode` from the
//! retrieval pack's vendored copy; everything that would be a plain
//! errno on the C side is a `std::io::Error` here, built with
//! `io::Error::from_raw_os_error`, the idiom `mio` uses throughout
//! `sys::unix`.

use std::error::Error as StdError;
use std::fmt;

/// The result of [`crate::error`]: either still running, or the errno
/// the kernel completed the request with.
///
/// The one deliberate departure from a literal errno translation:
/// "still running" is not an errno, so it gets its own variant instead
/// of a fabricated one.
#[derive(Debug)]
pub enum AioError {
    InProgress,
    Failed(std::io::Error),
}

impl fmt::Display for AioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AioError::InProgress => f.write_str("request is still in progress"),
            AioError::Failed(e) => e.fmt(f),
        }
    }
}

impl StdError for AioError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AioError::InProgress => None,
            AioError::Failed(e) => Some(e),
        }
    }
}

/// Outcome of `cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CancelStat {
    /// Every matching request was canceled (or there was nothing to
    /// cancel in the first place).
    Canceled,
    /// At least one matching request could not be canceled; check its
    /// status with `error`.
    NotCanceled,
    /// Every matching request had already completed.
    AllDone,
}

/// Blocking mode for `lio_listio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LioMode {
    /// Block until every entry has completed.
    Wait,
    /// Return as soon as every entry has been submitted.
    NoWait,
}

/// Per-entry opcode for `lio_listio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LioOpcode {
    Read,
    Write,
    Nop,
}

/// Mode for `fsync`: data-and-metadata or data-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsyncMode {
    /// Like `fsync(2)`.
    Sync,
    /// Like `fdatasync(2)`, where the platform distinguishes it.
    Dsync,
}
