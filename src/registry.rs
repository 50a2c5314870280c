//! Per-thread request registry (C3): an array of slots, each an
//! intrusive singly linked list of [`RequestRecord`]s guarded by a
//! [`SlotLock`], indexed by submitting thread id.
//!
//! Direct structural translation of `aio.c`'s `__ctxs`/`__ctx_locks`
//! arrays, with list surgery expressed through `Box`/raw-pointer
//! conversions at the insert/remove boundary instead of `calloc`/`free`.

use std::cell::UnsafeCell;
use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::atomic::Ordering;

use crate::record::{RequestRecord, NO_WAITER};
use crate::slotlock::SlotLock;
use crate::sys::linux::AioContextId;

struct Slot {
    lock: SlotLock,
    head: UnsafeCell<*mut RequestRecord>,
}

unsafe impl Sync for Slot {}

impl Slot {
    const fn new() -> Slot {
        Slot {
            lock: SlotLock::new(),
            head: UnsafeCell::new(ptr::null_mut()),
        }
    }
}

pub(crate) struct Registry {
    slots: Box<[Slot]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaiterRegistration {
    /// Installed; the caller should block on its notifier.
    Installed,
    /// Already past `IN_PROGRESS`; nothing to wait for.
    AlreadyDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelOneOutcome {
    /// The kernel confirmed the cancellation; the record was unlinked.
    Canceled,
    /// Still running and the kernel refused to cancel it; left in place.
    NotCanceled,
    /// Already completed before the cancel was attempted; left in
    /// place so `return_` can still reap its result.
    AlreadyDone,
    /// Not present in the registry at all: some other call (a prior
    /// cancel, or a concurrent `return_`) already took it out. Spec.md
    /// §4.5: "If not found at all, return CANCELED (the record is gone
    /// already)."
    NotFound,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct CancelSweep {
    pub(crate) matched: usize,
    pub(crate) failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanAction {
    Continue,
    Stop,
}

impl Registry {
    pub(crate) fn new(tid_max: u32) -> Registry {
        let n = tid_max as usize + 1;
        let mut slots = Vec::with_capacity(n);
        slots.resize_with(n, Slot::new);
        Registry {
            slots: slots.into_boxed_slice(),
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, tid: u32) -> &Slot {
        &self.slots[tid as usize % self.slots.len()]
    }

    /// Insert at the head of `tid`'s list under the writer lock.
    pub(crate) fn insert(&self, tid: u32, mut record: Box<RequestRecord>) {
        let slot = self.slot(tid);
        let _w = slot.lock.write();
        unsafe {
            let head = slot.head.get();
            record.next = *head;
            *head = Box::into_raw(record);
        }
    }

    /// Reader-locked lookup by ctx id.
    pub(crate) fn find<R>(
        &self,
        tid: u32,
        ctx: AioContextId,
        f: impl FnOnce(&RequestRecord) -> R,
    ) -> Option<R> {
        let slot = self.slot(tid);
        let _r = slot.lock.read();
        unsafe {
            let mut cur = *slot.head.get();
            while !cur.is_null() {
                let rec = &*cur;
                if rec.ctx == ctx {
                    return Some(f(rec));
                }
                cur = rec.next;
            }
        }
        None
    }

    /// Writer-locked find-and-unlink by ctx id (final reap).
    pub(crate) fn remove(&self, tid: u32, ctx: AioContextId) -> Option<Box<RequestRecord>> {
        let slot = self.slot(tid);
        let _w = slot.lock.write();
        unsafe { unlink_where(slot, |rec| rec.ctx == ctx) }
    }

    /// Writer-locked install of a suspend notifier. Must take the
    /// writer lock, not the reader lock, per spec.md §4.5: a reader
    /// lock would let the watcher's scan and this registration race,
    /// with the watcher deciding "no waiter" in the same window this
    /// thread is about to become one.
    pub(crate) fn register_waiter(
        &self,
        tid: u32,
        ctx: AioContextId,
        notifier_fd: RawFd,
    ) -> Option<WaiterRegistration> {
        let slot = self.slot(tid);
        let _w = slot.lock.write();
        unsafe {
            let mut cur = *slot.head.get();
            while !cur.is_null() {
                let rec = &*cur;
                if rec.ctx == ctx {
                    if !rec.is_in_progress() {
                        return Some(WaiterRegistration::AlreadyDone);
                    }
                    rec.waiter_notifier
                        .store(notifier_fd, Ordering::Release);
                    return Some(WaiterRegistration::Installed);
                }
                cur = rec.next;
            }
        }
        None
    }

    /// Reader-locked clear of a suspend notifier back to "none"; safe
    /// to call even if the record already completed or vanished.
    pub(crate) fn clear_waiter(&self, tid: u32, ctx: AioContextId) {
        let _ = self.find(tid, ctx, |rec| {
            rec.waiter_notifier.store(NO_WAITER, Ordering::Release);
        });
    }

    /// Reader-locked scan of one slot (by array index, not tid — the
    /// watcher walks every slot regardless of who owns it), calling
    /// `f` for every record still `IN_PROGRESS`.
    pub(crate) fn scan_slot(
        &self,
        idx: usize,
        mut f: impl FnMut(&RequestRecord) -> ScanAction,
    ) -> ScanAction {
        let slot = &self.slots[idx];
        let _r = slot.lock.read();
        unsafe {
            let mut cur = *slot.head.get();
            while !cur.is_null() {
                let rec = &*cur;
                if rec.is_in_progress() {
                    if f(rec) == ScanAction::Stop {
                        return ScanAction::Stop;
                    }
                }
                cur = rec.next;
            }
        }
        ScanAction::Continue
    }

    /// Writer-locked targeted cancel by ctx id. `try_cancel` is only
    /// invoked for records still in progress; a record that already
    /// completed is left in place (for `return_` to reap) and reported
    /// as [`CancelOneOutcome::AlreadyDone`]; a ctx not present at all is
    /// [`CancelOneOutcome::NotFound`].
    pub(crate) fn cancel_one(
        &self,
        tid: u32,
        ctx: AioContextId,
        mut try_cancel: impl FnMut(&RequestRecord) -> bool,
    ) -> CancelOneOutcome {
        let slot = self.slot(tid);
        let _w = slot.lock.write();
        unsafe {
            let mut prev: *mut *mut RequestRecord = slot.head.get();
            loop {
                let cur = *prev;
                if cur.is_null() {
                    // Not in the registry at all: something else already
                    // took it out (a prior cancel, or a concurrent
                    // return_), so there is nothing left to cancel.
                    return CancelOneOutcome::NotFound;
                }
                let rec = &*cur;
                if rec.ctx == ctx {
                    if !rec.is_in_progress() {
                        return CancelOneOutcome::AlreadyDone;
                    }
                    return if try_cancel(rec) {
                        *prev = rec.next;
                        drop(Box::from_raw(cur));
                        CancelOneOutcome::Canceled
                    } else {
                        CancelOneOutcome::NotCanceled
                    };
                }
                prev = &mut (*cur).next;
            }
        }
    }

    /// Writer-locked bulk cancel of every record in the caller's own
    /// slot matching `matches`. `try_cancel` performs the kernel
    /// cancel/destroy and reports whether the record should be
    /// unlinked; it is only called for records still in progress.
    pub(crate) fn cancel_matching(
        &self,
        tid: u32,
        mut matches: impl FnMut(&RequestRecord) -> bool,
        mut try_cancel: impl FnMut(&RequestRecord) -> bool,
    ) -> CancelSweep {
        let slot = self.slot(tid);
        let _w = slot.lock.write();
        unsafe {
            let mut prev: *mut *mut RequestRecord = slot.head.get();
            let mut matched = 0usize;
            let mut failed = 0usize;
            loop {
                let cur = *prev;
                if cur.is_null() {
                    break;
                }
                let rec = &*cur;
                if matches(rec) {
                    matched += 1;
                    if rec.is_in_progress() {
                        if try_cancel(rec) {
                            *prev = rec.next;
                            drop(Box::from_raw(cur));
                            continue;
                        } else {
                            failed += 1;
                        }
                    }
                }
                prev = &mut (*cur).next;
            }
            CancelSweep { matched, failed }
        }
    }
}

unsafe fn unlink_where(
    slot: &Slot,
    pred: impl Fn(&RequestRecord) -> bool,
) -> Option<Box<RequestRecord>> {
    let mut prev: *mut *mut RequestRecord = slot.head.get();
    loop {
        let cur = *prev;
        if cur.is_null() {
            return None;
        }
        if pred(&*cur) {
            *prev = (*cur).next;
            return Some(Box::from_raw(cur));
        }
        prev = &mut (*cur).next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigevent::SigEvent;
    use crate::sys::linux::{Iocb, IocbCmd};

    fn dummy_record(ctx: AioContextId, fd: RawFd) -> Box<RequestRecord> {
        let iocb = Iocb::new(fd, IocbCmd::Noop, 0, std::ptr::null_mut(), 0, 0, -1);
        RequestRecord::new(ctx, fd, 1, iocb, SigEvent::none())
    }

    #[test]
    fn insert_then_find_then_remove() {
        let reg = Registry::new(4);
        reg.insert(1, dummy_record(10, 3));
        reg.insert(1, dummy_record(11, 3));

        assert_eq!(reg.find(1, 10, |r| r.fd), Some(3));
        assert!(reg.find(1, 999, |_| ()).is_none());

        let removed = reg.remove(1, 10).expect("present");
        assert_eq!(removed.ctx, 10);
        assert!(reg.find(1, 10, |_| ()).is_none());
        // The other record is still there.
        assert!(reg.find(1, 11, |_| ()).is_some());
    }

    #[test]
    fn cancel_matching_by_fd_removes_only_matches() {
        let reg = Registry::new(4);
        reg.insert(2, dummy_record(1, 5));
        reg.insert(2, dummy_record(2, 5));
        reg.insert(2, dummy_record(3, 6));

        let sweep = reg.cancel_matching(2, |r| r.fd == 5, |_rec| true);
        assert_eq!(sweep.matched, 2);
        assert_eq!(sweep.failed, 0);
        assert!(reg.find(2, 1, |_| ()).is_none());
        assert!(reg.find(2, 2, |_| ()).is_none());
        assert!(reg.find(2, 3, |_| ()).is_some());
    }

    #[test]
    fn register_waiter_not_found_returns_none() {
        let reg = Registry::new(4);
        assert!(reg.register_waiter(1, 42, 7).is_none());
    }

    #[test]
    fn cancel_one_distinguishes_not_found_from_already_done() {
        let reg = Registry::new(4);

        // Ctx never inserted at all: spec.md §4.5's "gone already" case.
        assert_eq!(
            reg.cancel_one(3, 999, |_| true),
            CancelOneOutcome::NotFound
        );

        // Ctx present but already completed: left in place for `return_`.
        let rec = dummy_record(7, 5);
        rec.complete(0);
        reg.insert(3, rec);
        assert_eq!(
            reg.cancel_one(3, 7, |_| true),
            CancelOneOutcome::AlreadyDone
        );
        assert!(reg.find(3, 7, |_| ()).is_some());

        // Still in progress and the kernel confirms cancellation: unlinked.
        reg.insert(3, dummy_record(8, 5));
        assert_eq!(
            reg.cancel_one(3, 8, |_| true),
            CancelOneOutcome::Canceled
        );
        assert!(reg.find(3, 8, |_| ()).is_none());
    }
}
