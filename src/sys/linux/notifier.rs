//! `eventfd`-backed completion notifier.
//!
//! Two uses in this crate: the single process-wide notifier the kernel
//! posts every completion to (via `IOCB_FLAG_RESFD`), and the private,
//! per-`suspend`-call notifier a waiting thread installs on the
//! records it cares about. Both are the same primitive — grounded on
//! `mio`'s `sys::unix::waker::eventfd::WakerInternal`, generalized from
//! a single wakeup bit to an accumulating completion count, which is
//! exactly the semantic spec.md's Notifier describes.

use std::fs::File;
use std::io::{self, Read};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct Notifier {
    fd: File,
}

impl Notifier {
    pub(crate) fn new() -> io::Result<Notifier> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Notifier {
            fd: unsafe { File::from_raw_fd(fd) },
        })
    }

    /// Blocks (optionally with a timeout) until the counter is
    /// non-zero, then drains and returns it. `Ok(None)` means the
    /// timeout elapsed before any credit arrived.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> io::Result<Option<u64>> {
        if !self.poll_readable(timeout)? {
            return Ok(None);
        }
        self.drain().map(Some)
    }

    fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = match timeout {
            Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
            None => -1,
        };
        let r = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if r < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(r > 0)
    }

    /// Reads and resets the counter. Returns `0` if nothing was
    /// pending (the fd is non-blocking, so this never blocks).
    fn drain(&self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        match (&self.fd).read(&mut buf) {
            Ok(_) => Ok(u64::from_ne_bytes(buf)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

}

impl AsRawFd for Notifier {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// Writes one completion token to a bare eventfd `fd`, retrying once if
/// the kernel counter is about to overflow, as `mio`'s waker does. The
/// watcher uses this directly on a `suspend` call's private notifier
/// fd, which it only ever sees as a `RawFd` stored on a
/// [`crate::record::RequestRecord`] — there is no owning [`Notifier`]
/// on that side to call a method on.
pub(crate) fn write_token(fd: RawFd) -> io::Result<()> {
    let buf = 1u64.to_ne_bytes();
    let r = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
    if r >= 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock {
        // Counter about to overflow: reset and retry, as mio's waker does.
        let _ = drain_raw(fd);
        return write_token(fd);
    }
    Err(err)
}

fn drain_raw(fd: RawFd) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    let r = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    if r < 0 {
        let err = io::Error::last_os_error();
        return if err.kind() == io::ErrorKind::WouldBlock {
            Ok(0)
        } else {
            Err(err)
        };
    }
    Ok(u64::from_ne_bytes(buf))
}
