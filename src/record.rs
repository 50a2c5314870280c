//! The request record: the registry's per-operation bookkeeping node.
//!
//! Structurally a direct translation of `aio.c`'s `struct __ctx` (ctx
//! id, fd, owning tid, a retained copy of the submitted iocb, the
//! sigevent, and a `next` link), with the status fields turned into
//! atomics so the watcher and any number of callers can observe them
//! without going through the slot lock.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use crate::sigevent::SigEvent;
use crate::sys::linux::{AioContextId, Iocb};

/// Sentinel for `error`: the kernel has not yet delivered a completion.
pub(crate) const IN_PROGRESS: i32 = -1;
/// Sentinel for `result`: not yet written.
pub(crate) const RESULT_UNSET: i64 = -1;
/// Sentinel for `waiter_notifier`: no suspended waiter registered.
pub(crate) const NO_WAITER: i32 = -1;

/// One outstanding request, owned by exactly one [`crate::registry::Slot`]
/// list from insertion until `cancel` or `return_` removes it.
pub(crate) struct RequestRecord {
    pub(crate) ctx: AioContextId,
    pub(crate) fd: RawFd,
    pub(crate) tid: u32,
    pub(crate) kernel_iocb: Iocb,
    pub(crate) sigevent: SigEvent,
    pub(crate) error: AtomicI32,
    pub(crate) result: AtomicI64,
    pub(crate) waiter_notifier: AtomicI32,
    pub(crate) next: *mut RequestRecord,
}

// Safety: every field is either plain data fixed at construction or an
// atomic; `next` is only ever read or written while the owning slot's
// `SlotLock` is held (writer lock to mutate, reader lock to follow),
// which is the discipline that makes sharing this across threads sound.
unsafe impl Send for RequestRecord {}
unsafe impl Sync for RequestRecord {}

impl RequestRecord {
    pub(crate) fn new(
        ctx: AioContextId,
        fd: RawFd,
        tid: u32,
        kernel_iocb: Iocb,
        sigevent: SigEvent,
    ) -> Box<RequestRecord> {
        Box::new(RequestRecord {
            ctx,
            fd,
            tid,
            kernel_iocb,
            sigevent,
            error: AtomicI32::new(IN_PROGRESS),
            result: AtomicI64::new(RESULT_UNSET),
            waiter_notifier: AtomicI32::new(NO_WAITER),
            next: std::ptr::null_mut(),
        })
    }

    /// `true` while the kernel has not delivered a completion.
    pub(crate) fn is_in_progress(&self) -> bool {
        self.error.load(Ordering::Acquire) == IN_PROGRESS
    }

    /// The watcher's atomic transition out of `IN_PROGRESS`. Writes
    /// `result` before `error`, both with release semantics, so that
    /// any reader observing a non-`IN_PROGRESS` `error` (loaded with
    /// acquire semantics) is guaranteed to see the final `result` —
    /// spec.md §3 invariant 4.
    pub(crate) fn complete(&self, byte_count_or_neg_errno: i64) {
        self.result
            .compare_exchange(
                RESULT_UNSET,
                byte_count_or_neg_errno,
                Ordering::Release,
                Ordering::Relaxed,
            )
            .ok();
        let errno = if byte_count_or_neg_errno >= 0 {
            0
        } else {
            -byte_count_or_neg_errno as i32
        };
        self.error
            .compare_exchange(IN_PROGRESS, errno, Ordering::Release, Ordering::Relaxed)
            .ok();
    }
}
