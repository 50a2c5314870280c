//! Thread-safe POSIX AIO on top of Linux's native AIO syscalls.
//!
//! This crate gives every thread in a process the POSIX
//! `aio_read`/`aio_write`/`aio_fsync`/`aio_error`/`aio_return`/
//! `aio_cancel`/`aio_suspend`/`lio_listio` surface, backed directly by
//! `io_setup`/`io_submit`/`io_cancel`/`io_getevents`/`io_destroy`
//! rather than glibc's thread-per-request emulation.
//!
//! # Architecture
//!
//! - [`AioCb`] is a single request: an owned buffer plus a target file
//!   descriptor and offset.
//! - Submitting one ([`read`], [`write`], [`fsync`]) opens a
//!   single-request kernel AIO context and hands it a [`registry`]
//!   slot keyed by the submitting thread's Linux tid.
//! - A single background thread (the watcher) drains a process-wide
//!   `eventfd` notifier the kernel posts every completion to, and
//!   updates the matching record's status atomically.
//! - [`error`] and [`return_`] read that status; [`suspend`] blocks on
//!   a private notifier installed on the records of interest;
//!   [`cancel`] asks the kernel to abort a request before it completes.
//!
//! The runtime (registry + notifier + watcher thread) is built lazily
//! on first use and lives for the remainder of the process — see
//! [`runtime`] for why, and [`config::Config`] for its tunables.
//!
//! # Example
//!
//! ```no_run
//! use aio::AioCb;
//! use std::os::unix::io::AsRawFd;
//!
//! # fn main() -> std::io::Result<()> {
//! let file = std::fs::File::open("/dev/null")?;
//! let cb = AioCb::new_read(file.as_raw_fd(), 0, vec![0u8; 16]);
//! aio::read(&cb)?;
//! while matches!(aio::error(&cb), Err(aio::AioError::InProgress)) {
//!     std::thread::yield_now();
//! }
//! let n = aio::return_(&cb)?;
//! println!("read {n} bytes");
//! # Ok(())
//! # }
//! ```

mod aiocb;
mod config;
mod error;
mod ops;
mod record;
mod registry;
mod runtime;
mod sigevent;
mod slotlock;
mod sys;
mod watcher;

pub use aiocb::AioCb;
pub use config::Config;
pub use error::{AioError, CancelStat, FsyncMode, LioMode, LioOpcode};
pub use ops::{cancel, error, fsync, lio_listio, read, return_, suspend, write};
pub use sigevent::{SigEvent, SigevNotify};

/// Builds the process-wide runtime with a non-default [`Config`]
/// before any submission happens.
///
/// Only the first call in a process (whether this or an implicit one
/// triggered by [`read`]/[`write`]/etc.) has any effect; later calls
/// silently observe the config the first caller picked, matching the
/// original's single hardcoded `TID_MAX`.
pub fn init(config: Config) {
    runtime::get_with(config);
}
