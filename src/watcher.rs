//! The single background task that demultiplexes the process-wide
//! Notifier into per-request state updates and per-waiter wakeups (C4).
//!
//! Structurally a translation of `aio.c`'s `__aio_watcher`: block on
//! the notifier for a completion credit, then scan the registry
//! starting from `likely_tid`, harvesting one `get_events` per
//! still-in-progress record until the credit is exhausted, at which
//! point jump straight back to waiting on the notifier (`reloop`)
//! instead of finishing the scan.
//!
//! Runs on a plain OS thread, not an async task — there is no executor
//! anywhere in scope, the same choice the original's `clone()`d thread
//! makes and the one `mio`'s own lower layers make versus bundling a
//! reactor.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::record::{RequestRecord, NO_WAITER};
use crate::registry::ScanAction;
use crate::runtime::Runtime;
use crate::sys::linux::{self, notifier};

/// A `get_events` poll this short effectively never blocks the
/// slot's reader lock; matches `aio.c`'s `to.tv_nsec = 1`.
const HARVEST_TIMEOUT: Duration = Duration::new(0, 1);

pub(crate) fn spawn(rt: &'static Runtime) {
    thread::Builder::new()
        .name("aio-watcher".to_string())
        .spawn(move || run(rt))
        .expect("aio: failed to spawn the watcher thread");
}

fn run(rt: &'static Runtime) -> ! {
    let mut credit: u64 = 0;
    loop {
        if credit == 0 {
            match rt.notifier.wait(None) {
                Ok(Some(c)) => credit = c,
                Ok(None) => continue, // no timeout was given; shouldn't happen
                Err(e) => {
                    log::warn!("aio watcher: notifier wait failed: {e}");
                    continue;
                }
            }
        }

        let slot_count = rt.registry.slot_count();
        let start = rt.likely_tid.load(Ordering::Relaxed) as usize % slot_count;
        let mut idx = start;
        let mut wrapped = false;
        loop {
            if wrapped && idx == start {
                break;
            }
            wrapped = true;

            let action = rt.registry.scan_slot(idx, |rec| harvest_one(rec, &mut credit));
            if action == ScanAction::Stop {
                // Credit exhausted mid-slot: go wait on the notifier
                // again rather than finishing the sweep.
                break;
            }
            idx = (idx + 1) % slot_count;
        }
    }
}

fn harvest_one(rec: &RequestRecord, credit: &mut u64) -> ScanAction {
    match linux::get_event(rec.ctx, HARVEST_TIMEOUT) {
        Ok(Some(event)) => {
            rec.complete(event.res);
            wake(rec);
            *credit = credit.saturating_sub(1);
            if *credit == 0 {
                ScanAction::Stop
            } else {
                ScanAction::Continue
            }
        }
        Ok(None) => ScanAction::Continue,
        Err(e) => {
            // Spurious or not-yet-ready: leave IN_PROGRESS, re-examine
            // on the next pass. Never retried synchronously here.
            log::trace!("aio watcher: get_events returned no event: {e}");
            ScanAction::Continue
        }
    }
}

/// Wakes anyone suspended on this record and queues its completion
/// signal, if any. Mirrors `notify_finished`.
fn wake(rec: &RequestRecord) {
    let waiter_fd = rec.waiter_notifier.load(Ordering::Acquire);
    if waiter_fd != NO_WAITER {
        // A failed write is benign: the waiter may have already torn
        // its notifier down (spec.md §4.4).
        let _ = notifier::write_token(waiter_fd);
    }
    if let Err(e) = rec.sigevent.queue_to(rec.tid) {
        log::trace!("aio watcher: signal delivery failed: {e}");
    }
}
