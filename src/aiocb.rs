//! The public control block: the Rust analogue of POSIX's
//! `struct aiocb`, minus the parts that don't survive translation.
//!
//! The original takes a raw `void *aio_buf` the caller promises to keep
//! alive and not touch until reaping. This port instead has `AioCb` own
//! its buffer (`Box<[u8]>`), so there is nothing for the caller to get
//! wrong about lifetime or aliasing — the same tradeoff spec.md §6
//! calls out as the one place this shim's surface intentionally departs
//! from the C struct layout.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, Ordering};

use crate::error::LioOpcode;
use crate::sigevent::SigEvent;
use crate::sys::linux::AioContextId;

/// Sentinel for `ctx`: this request has never been submitted (or has
/// been reaped and is ready to be reused), mirroring the original's
/// zeroed `ctx_id`.
pub(crate) const CTX_UNSUBMITTED: AioContextId = 0;

/// Sentinel for `list_error`: no `lio_listio` submission failure has
/// been stamped on this request.
const NO_LIST_ERROR: i32 = -1;

/// A single asynchronous I/O request.
///
/// An `AioCb` is built once with its buffer and target, then handed to
/// [`crate::read`], [`crate::write`], or [`crate::fsync`] (or grouped
/// into a [`crate::lio_listio`] call) to submit it. It can be
/// re-submitted after [`crate::return_`] reaps it.
pub struct AioCb {
    pub(crate) fd: RawFd,
    pub(crate) offset: i64,
    pub(crate) buf: Box<[u8]>,
    pub(crate) priority: i16,
    pub(crate) sigevent: SigEvent,
    pub(crate) lio_opcode: LioOpcode,
    /// `CTX_UNSUBMITTED` until a submit call installs the kernel
    /// context id this request is running under; cleared back to
    /// `CTX_UNSUBMITTED` by `return_`.
    pub(crate) ctx: AtomicI64,
    /// Owning thread id, set at submission time.
    pub(crate) tid: AtomicU32,
    /// Set by `lio_listio` when this entry's own `submit` call failed;
    /// lets a later `error` call surface the failure without a
    /// registry entry to look up (spec.md §4.5, §6).
    pub(crate) list_error: AtomicI32,
}

impl AioCb {
    /// Builds a request reading `buf.len()` bytes from `fd` at `offset`
    /// once submitted via [`crate::read`].
    pub fn new_read(fd: RawFd, offset: i64, buf: Vec<u8>) -> AioCb {
        AioCb::new(fd, offset, buf.into_boxed_slice(), LioOpcode::Read)
    }

    /// Builds a request writing `buf`'s contents to `fd` at `offset`
    /// once submitted via [`crate::write`].
    pub fn new_write(fd: RawFd, offset: i64, buf: Vec<u8>) -> AioCb {
        AioCb::new(fd, offset, buf.into_boxed_slice(), LioOpcode::Write)
    }

    fn new(fd: RawFd, offset: i64, buf: Box<[u8]>, lio_opcode: LioOpcode) -> AioCb {
        AioCb {
            fd,
            offset,
            buf,
            priority: 0,
            sigevent: SigEvent::none(),
            lio_opcode,
            ctx: AtomicI64::new(CTX_UNSUBMITTED as i64),
            tid: AtomicU32::new(0),
            list_error: AtomicI32::new(NO_LIST_ERROR),
        }
    }

    /// Attaches a completion notification, delivered best-effort when
    /// the request finishes (spec.md §5).
    pub fn with_sigevent(mut self, sigevent: SigEvent) -> AioCb {
        self.sigevent = sigevent;
        self
    }

    /// Sets the kernel I/O priority hint passed through to `io_submit`.
    pub fn with_priority(mut self, priority: i16) -> AioCb {
        self.priority = priority;
        self
    }

    /// The file descriptor this request targets.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// The buffer's current contents. Valid to read once
    /// [`crate::error`] reports the request is no longer in progress;
    /// reading it earlier just observes whatever the kernel has
    /// written so far, same as racing the original C struct's
    /// `aio_buf` would.
    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the request, handing the caller back ownership of its
    /// buffer. Intended for use after [`crate::return_`] has reaped it.
    pub fn into_buf(self) -> Vec<u8> {
        self.buf.into_vec()
    }

    pub(crate) fn ctx(&self) -> AioContextId {
        self.ctx.load(Ordering::Acquire) as AioContextId
    }

    pub(crate) fn set_ctx(&self, ctx: AioContextId) {
        self.ctx.store(ctx as i64, Ordering::Release);
    }

    pub(crate) fn clear_ctx(&self) {
        self.ctx.store(CTX_UNSUBMITTED as i64, Ordering::Release);
    }

    pub(crate) fn is_submitted(&self) -> bool {
        self.ctx() != CTX_UNSUBMITTED
    }

    pub(crate) fn tid(&self) -> u32 {
        self.tid.load(Ordering::Acquire)
    }

    pub(crate) fn set_tid(&self, tid: u32) {
        self.tid.store(tid, Ordering::Release);
    }

    pub(crate) fn buf_ptr(&self) -> *mut u8 {
        self.buf.as_ptr() as *mut u8
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// The errno stamped by a failed `lio_listio` submission, if any.
    pub(crate) fn list_error(&self) -> Option<i32> {
        match self.list_error.load(Ordering::Acquire) {
            NO_LIST_ERROR => None,
            errno => Some(errno),
        }
    }

    pub(crate) fn set_list_error(&self, errno: i32) {
        self.list_error.store(errno, Ordering::Release);
    }
}
