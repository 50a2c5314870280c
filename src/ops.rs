//! The POSIX AIO surface (C5): `read`, `write`, `fsync`, `error`,
//! `return_`, `cancel`, `suspend`, `lio_listio`, built directly on top
//! of [`crate::runtime`], [`crate::registry`], and the raw syscalls in
//! [`crate::sys::linux`].
//!
//! Grounded on `aio.c`'s `aio_read`/`aio_write`/`aio_error`/
//! `aio_return`/`aio_cancel`/`aio_suspend`/`lio_listio`, kept as plain
//! free functions the way the original exposes a flat C API and the
//! way `nix::sys::aio`'s vendored wrappers stay free functions over a
//! `libc` syscall rather than growing a builder or service object.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::aiocb::AioCb;
use crate::error::{AioError, CancelStat, FsyncMode, LioMode, LioOpcode};
use crate::record::RequestRecord;
use crate::registry::{CancelOneOutcome, WaiterRegistration};
use crate::runtime;
use crate::sigevent::SigEvent;
use crate::sys::linux::{self, notifier::Notifier, Iocb, IocbCmd};

/// Submits an asynchronous read, mirroring `aio_read(3)`.
pub fn read(aiocbp: &AioCb) -> io::Result<()> {
    submit_one(aiocbp, IocbCmd::Pread)
}

/// Submits an asynchronous write, mirroring `aio_write(3)`.
pub fn write(aiocbp: &AioCb) -> io::Result<()> {
    submit_one(aiocbp, IocbCmd::Pwrite)
}

/// Submits an asynchronous `fsync`/`fdatasync`, mirroring `aio_fsync(3)`.
///
/// Unlike the POSIX reference description (which permits a synchronous
/// implementation), this genuinely submits `IOCB_CMD_FSYNC`/
/// `IOCB_CMD_FDSYNC` to the kernel and completes through the same
/// watcher path as `read`/`write` (spec.md §9).
pub fn fsync(mode: FsyncMode, aiocbp: &AioCb) -> io::Result<()> {
    let cmd = match mode {
        FsyncMode::Sync => IocbCmd::Fsync,
        FsyncMode::Dsync => IocbCmd::Fdsync,
    };
    submit_one(aiocbp, cmd)
}

fn submit_one(aiocbp: &AioCb, cmd: IocbCmd) -> io::Result<()> {
    let rt = runtime::get();
    let tid = linux::gettid();
    let ctx = linux::setup(1)?;

    let mut iocb = Iocb::new(
        aiocbp.fd(),
        cmd,
        aiocbp.priority,
        aiocbp.buf_ptr(),
        aiocbp.len(),
        aiocbp.offset,
        rt.notifier.as_raw_fd(),
    );

    if let Err(e) = linux::submit(ctx, &mut iocb) {
        linux::destroy(ctx);
        return Err(e);
    }

    aiocbp.set_tid(tid);
    aiocbp.set_ctx(ctx);
    rt.likely_tid.store(tid, Ordering::Relaxed);

    let record = RequestRecord::new(ctx, aiocbp.fd(), tid, iocb, aiocbp.sigevent);
    rt.registry.insert(tid, record);
    Ok(())
}

/// Reports whether `aiocbp` is still in flight, mirroring `aio_error(3)`.
///
/// `Ok(())` means the request completed successfully;
/// `Err(AioError::InProgress)` means it is still running;
/// `Err(AioError::Failed(_))` carries the errno the kernel completed it
/// with, or `EINVAL` if the record is gone — either reaped by a prior
/// `return_`, or unlinked by a successful `cancel` (spec.md §4.5: "a
/// following `error(R)` returns `EINVAL`" after `CancelStat::Canceled`).
pub fn error(aiocbp: &AioCb) -> Result<(), AioError> {
    if let Some(errno) = aiocbp.list_error() {
        return Err(AioError::Failed(io::Error::from_raw_os_error(errno)));
    }
    if !aiocbp.is_submitted() {
        return Ok(());
    }
    let rt = runtime::get();
    let found = rt
        .registry
        .find(aiocbp.tid(), aiocbp.ctx(), |rec| rec.error.load(Ordering::Acquire));
    match found {
        Some(errno) if errno == crate::record::IN_PROGRESS => Err(AioError::InProgress),
        Some(0) => Ok(()),
        Some(errno) => Err(AioError::Failed(io::Error::from_raw_os_error(errno))),
        None => Err(AioError::Failed(io::Error::from_raw_os_error(libc::EINVAL))),
    }
}

/// Reaps a completed request's result, mirroring `aio_return(3)`.
///
/// Returns the byte count on success. Calling this while the request
/// is still in progress is a usage error (`EINPROGRESS`), the same as
/// the POSIX reference describes as undefined for a premature call;
/// calling it on a request that was never submitted, or already
/// reaped, is `EINVAL`.
pub fn return_(aiocbp: &AioCb) -> io::Result<i64> {
    if !aiocbp.is_submitted() {
        return Err(io::Error::from_raw_os_error(libc::EINVAL));
    }
    let rt = runtime::get();
    let tid = aiocbp.tid();
    let ctx = aiocbp.ctx();

    if rt.registry.find(tid, ctx, |rec| rec.is_in_progress()) == Some(true) {
        return Err(io::Error::from_raw_os_error(libc::EINPROGRESS));
    }

    let rec = rt
        .registry
        .remove(tid, ctx)
        .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
    linux::destroy(rec.ctx);
    aiocbp.clear_ctx();

    let result = rec.result.load(Ordering::Acquire);
    if result < 0 {
        Err(io::Error::from_raw_os_error(-result as i32))
    } else {
        Ok(result)
    }
}

/// Cancels in-flight requests, mirroring `aio_cancel(3)`.
///
/// `Some(aiocbp)` targets exactly that request; `None` targets every
/// outstanding request on `fd`. Targeted mode reports
/// [`CancelStat::Canceled`] when the record isn't found at all — it's
/// gone already, per spec.md §4.5. Bulk mode never reports `Canceled`:
/// like `aio.c`'s bulk branch (which starts from `AIO_ALLDONE` and only
/// ever downgrades to `AIO_NOTCANCELED`), a clean sweep is
/// [`CancelStat::AllDone`], same as an empty one (spec.md §9).
pub fn cancel(fd: RawFd, aiocbp: Option<&AioCb>) -> io::Result<CancelStat> {
    let rt = runtime::get();

    match aiocbp {
        Some(cb) => {
            if !cb.is_submitted() {
                return Ok(CancelStat::Canceled);
            }
            let tid = cb.tid();
            let ctx = cb.ctx();
            let outcome = rt.registry.cancel_one(tid, ctx, try_cancel_kernel);
            Ok(match outcome {
                CancelOneOutcome::Canceled => {
                    cb.clear_ctx();
                    CancelStat::Canceled
                }
                CancelOneOutcome::NotCanceled => CancelStat::NotCanceled,
                CancelOneOutcome::AlreadyDone => CancelStat::AllDone,
                CancelOneOutcome::NotFound => {
                    cb.clear_ctx();
                    CancelStat::Canceled
                }
            })
        }
        None => {
            let tid = linux::gettid();
            let sweep = rt
                .registry
                .cancel_matching(tid, |rec| rec.fd == fd, try_cancel_kernel);
            Ok(if sweep.failed > 0 {
                CancelStat::NotCanceled
            } else {
                CancelStat::AllDone
            })
        }
    }
}

/// Attempts the kernel-level cancel for a record already known to be
/// in progress; called by [`crate::registry::Registry::cancel_one`]/
/// `cancel_matching` under the slot's writer lock.
fn try_cancel_kernel(rec: &RequestRecord) -> bool {
    let mut iocb = rec.kernel_iocb;
    match linux::cancel(rec.ctx, &mut iocb) {
        Ok(event) => {
            rec.complete(event.res);
            linux::destroy(rec.ctx);
            true
        }
        Err(_) => false,
    }
}

/// Blocks until at least one request in `list` completes (or `timeout`
/// elapses), mirroring `aio_suspend(3)`.
///
/// Installs a private notifier on every still-in-progress entry under
/// each entry's slot writer lock — spec.md §4.5's lost-wakeup
/// prevention: a request that completes between the `error` check and
/// the notifier's installation must see the installation happen before
/// the watcher decides there is no waiter to wake.
pub fn suspend(list: &[&AioCb], timeout: Option<Duration>) -> io::Result<()> {
    let rt = runtime::get();
    let notifier = Notifier::new()?;
    let notifier_fd = notifier.as_raw_fd();

    let mut installed: Vec<(u32, u64)> = Vec::with_capacity(list.len());
    let mut already_done = false;

    for cb in list {
        if !cb.is_submitted() {
            continue;
        }
        let tid = cb.tid();
        let ctx = cb.ctx();
        match rt.registry.register_waiter(tid, ctx, notifier_fd) {
            Some(WaiterRegistration::Installed) => installed.push((tid, ctx)),
            Some(WaiterRegistration::AlreadyDone) | None => already_done = true,
        }
    }

    let result = if already_done {
        Ok(())
    } else if installed.is_empty() {
        // Nothing was ready and nothing in `list` was even found in the
        // registry: spec.md §4.5 step 2 / §7 call this `EAGAIN`.
        Err(io::Error::from_raw_os_error(libc::EAGAIN))
    } else {
        match notifier.wait(timeout)? {
            Some(_) => Ok(()),
            // Timeout elapsed: spec.md §4.5 step 5 / §6 also call this
            // `EAGAIN`, not `ETIMEDOUT`.
            None => Err(io::Error::from_raw_os_error(libc::EAGAIN)),
        }
    };

    for (tid, ctx) in installed {
        rt.registry.clear_waiter(tid, ctx);
    }
    result
}

/// Submits a batch of heterogeneous requests in one call, mirroring
/// `lio_listio(3)`.
///
/// `LioMode::Wait` blocks (via [`suspend`]) until every entry has
/// completed; `LioMode::NoWait` returns once every entry has been
/// submitted. `sigev`, when given, overrides each entry's own
/// completion sigevent before it is submitted (spec.md §4.5: "optionally
/// overrides the sigevent from the caller-supplied default"), so it is
/// each entry's own completion — delivered later by the watcher, same as
/// any other request — that fires the overridden notification, not some
/// one-shot signal at the end of this call.
pub fn lio_listio(mode: LioMode, list: &mut [AioCb], sigev: Option<SigEvent>) -> io::Result<()> {
    for cb in list.iter_mut() {
        if let Some(ev) = sigev {
            cb.sigevent = ev;
        }
        let outcome = match cb.lio_opcode {
            LioOpcode::Read => read(cb),
            LioOpcode::Write => write(cb),
            LioOpcode::Nop => Ok(()),
        };
        if let Err(e) = outcome {
            // Stamp the failure so a later `error(cb)` can surface it
            // without a registry entry to look up, then fail the whole
            // call — spec.md §4.5: a per-entry submission failure
            // stamps the list-error slot and the call reports `EAGAIN`.
            let errno = e.raw_os_error().unwrap_or(libc::EIO);
            cb.set_list_error(errno);
            return Err(io::Error::from_raw_os_error(libc::EAGAIN));
        }
    }

    if mode == LioMode::Wait {
        // `suspend` returns as soon as any one entry completes, not all
        // of them, so keep narrowing the list to whatever is still
        // running and re-suspending until nothing is left.
        loop {
            let pending: Vec<&AioCb> = list
                .iter()
                .filter(|cb| matches!(error(cb), Err(AioError::InProgress)))
                .collect();
            if pending.is_empty() {
                break;
            }
            suspend(&pending, None)?;
        }
    }
    Ok(())
}
