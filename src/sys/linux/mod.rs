//! Thin wrapper over the five Linux native AIO syscalls
//! (`io_setup`, `io_destroy`, `io_submit`, `io_cancel`, `io_getevents`).
//!
//! None of these have safe libc wrappers — `libc` only exposes the
//! syscall numbers — so every call here goes through `libc::syscall`
//! and gets its result normalized into an `io::Result`, the same way
//! `mio`'s `sys::unix` reaches for raw `libc::syscall`/`libc::epoll_*`
//! wherever no higher-level wrapper exists.

pub(crate) mod notifier;

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Opaque kernel AIO context handle (`aio_context_t`).
///
/// Zero is never returned by a successful `io_setup` and is used
/// throughout this crate as the "not yet submitted" sentinel, mirroring
/// the original C implementation's `memset(&aiocbp->ctx_id, 0, ...)`.
pub(crate) type AioContextId = u64;

/// `IOCB_CMD_*` from `linux/aio_abi.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub(crate) enum IocbCmd {
    Pread = 0,
    Pwrite = 1,
    Fsync = 2,
    Fdsync = 3,
    Noop = 6,
}

const IOCB_FLAG_RESFD: u32 = 1;

/// Matches `struct iocb` from `linux/aio_abi.h` field-for-field,
/// including the little-endian `(aio_key, aio_reserved1)` padding
/// order used on every target this crate supports.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct Iocb {
    pub aio_data: u64,
    pub aio_key: u32,
    pub aio_reserved1: u32,
    pub aio_lio_opcode: u16,
    pub aio_reqprio: i16,
    pub aio_fildes: u32,
    pub aio_buf: u64,
    pub aio_nbytes: u64,
    pub aio_offset: i64,
    pub aio_reserved2: u64,
    pub aio_flags: u32,
    pub aio_resfd: u32,
}

impl Iocb {
    pub(crate) fn new(
        fd: RawFd,
        opcode: IocbCmd,
        priority: i16,
        buf: *mut u8,
        len: usize,
        offset: i64,
        resfd: RawFd,
    ) -> Iocb {
        Iocb {
            aio_data: 0,
            aio_key: 0,
            aio_reserved1: 0,
            aio_lio_opcode: opcode as u16,
            aio_reqprio: priority,
            aio_fildes: fd as u32,
            aio_buf: buf as u64,
            aio_nbytes: len as u64,
            aio_offset: offset,
            aio_reserved2: 0,
            aio_flags: IOCB_FLAG_RESFD,
            aio_resfd: resfd as u32,
        }
    }
}

/// Matches `struct io_event` from `linux/aio_abi.h`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub(crate) struct IoEvent {
    pub data: u64,
    pub obj: u64,
    pub res: i64,
    pub res2: i64,
}

/// `gettid(2)`: the Linux thread id used to index the registry and to
/// target completion signals, distinct from the process-wide pid.
pub(crate) fn gettid() -> u32 {
    (unsafe { libc::syscall(libc::SYS_gettid) }) as u32
}

fn cvt(r: libc::c_long) -> io::Result<libc::c_long> {
    if r < 0 {
        Err(io::Error::from_raw_os_error(-r as i32))
    } else {
        Ok(r)
    }
}

/// `io_setup(2)`: allocate a fresh single-request kernel AIO context.
pub(crate) fn setup(nr_events: u32) -> io::Result<AioContextId> {
    let mut ctx: AioContextId = 0;
    let r = unsafe { libc::syscall(libc::SYS_io_setup, nr_events as libc::c_long, &mut ctx) };
    cvt(r)?;
    Ok(ctx)
}

/// `io_destroy(2)`.
pub(crate) fn destroy(ctx: AioContextId) {
    // Errors here are not actionable: the context is either already
    // gone or we're tearing down anyway.
    let _ = unsafe { libc::syscall(libc::SYS_io_destroy, ctx) };
}

/// `io_submit(2)` of a single iocb.
pub(crate) fn submit(ctx: AioContextId, iocb: &mut Iocb) -> io::Result<()> {
    let mut iocbp: *mut Iocb = iocb;
    let r = unsafe { libc::syscall(libc::SYS_io_submit, ctx, 1i64, &mut iocbp) };
    cvt(r).map(|_| ())
}

/// `io_cancel(2)`. `Ok(Some(event))` if the kernel returned the
/// cancelled request's completion event synchronously (it always does
/// on success), `Err` if cancellation failed (request already running
/// or already complete).
pub(crate) fn cancel(ctx: AioContextId, iocb: &mut Iocb) -> io::Result<IoEvent> {
    let mut event = IoEvent { data: 0, obj: 0, res: 0, res2: 0 };
    let r = unsafe { libc::syscall(libc::SYS_io_cancel, ctx, iocb as *mut Iocb, &mut event) };
    cvt(r)?;
    Ok(event)
}

/// `io_getevents(2)` for at most one event, with the tiny timeout the
/// watcher uses to poll a single context without blocking the slot's
/// reader lock indefinitely.
pub(crate) fn get_event(ctx: AioContextId, timeout: Duration) -> io::Result<Option<IoEvent>> {
    let mut event = IoEvent { data: 0, obj: 0, res: 0, res2: 0 };
    let ts = libc::timespec {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as libc::c_long,
    };
    let r = unsafe {
        libc::syscall(
            libc::SYS_io_getevents,
            ctx,
            0i64,
            1i64,
            &mut event,
            &ts,
        )
    };
    let n = cvt(r)?;
    if n > 0 {
        Ok(Some(event))
    } else {
        Ok(None)
    }
}
