//! The process-global singleton: registry, notifier, and watcher, all
//! brought up exactly once behind a three-state CAS.
//!
//! Grounded on `aio.c`'s `__aio_init`/`__init_lock`
//! (`AIO_UNINITIALIZED`/`AIO_INITIALIZING`/`AIO_INITIALIZED`,
//! `__sync_val_compare_and_swap`). A `std::sync::OnceLock` would
//! satisfy the same contract, but the spec calls out this exact
//! protocol as part of what a faithful reimplementation preserves —
//! scenario 3 in spec.md §8 exercises concurrent initializers racing
//! on it — so it is hand-rolled rather than delegated.
//!
//! The runtime, once built, is never torn down: like the original (no
//! teardown protocol, watcher killed at process exit), it is leaked
//! for the life of the process.

use std::sync::atomic::{AtomicPtr, AtomicU32, AtomicU8, Ordering};

use crate::config::Config;
use crate::registry::Registry;
use crate::sys::linux::{self, notifier::Notifier};
use crate::watcher;

const UNINIT: u8 = 0;
const INITING: u8 = 1;
const INITED: u8 = 2;

static INIT_STATE: AtomicU8 = AtomicU8::new(UNINIT);
static RUNTIME_PTR: AtomicPtr<Runtime> = AtomicPtr::new(std::ptr::null_mut());

pub(crate) struct Runtime {
    pub(crate) registry: Registry,
    pub(crate) notifier: Notifier,
    /// Last-known "likely" submitting thread id, used only as the
    /// watcher's scan-start optimization (spec.md §9: no correctness
    /// dependency).
    pub(crate) likely_tid: AtomicU32,
}

unsafe impl Sync for Runtime {}

/// Returns the process-wide runtime, building it on first call with
/// `Config::default()`. All subsequent calls (even with a different
/// config) observe the first caller's configuration, matching the
/// original's single hardcoded `TID_MAX`.
pub(crate) fn get() -> &'static Runtime {
    get_with(Config::default())
}

/// Like [`get`], but lets the very first caller in the process pick
/// the config (used by tests that want a small `tid_max`).
pub(crate) fn get_with(config: Config) -> &'static Runtime {
    loop {
        match INIT_STATE.compare_exchange(UNINIT, INITING, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {
                let rt = build(config);
                RUNTIME_PTR.store(rt as *const Runtime as *mut Runtime, Ordering::Release);
                INIT_STATE.store(INITED, Ordering::Release);
                break;
            }
            Err(INITED) => break,
            Err(_) => std::hint::spin_loop(),
        }
    }
    // Safety: the pointer is only ever null before `INITED` is
    // visible, and we only get here once `INITED` has been observed.
    unsafe { &*RUNTIME_PTR.load(Ordering::Acquire) }
}

fn build(config: Config) -> &'static Runtime {
    let registry = Registry::new(config.tid_max);
    let notifier = Notifier::new().expect("aio: failed to create the completion notifier (eventfd)");
    let likely_tid = AtomicU32::new(linux::gettid());

    let rt: &'static Runtime = Box::leak(Box::new(Runtime {
        registry,
        notifier,
        likely_tid,
    }));
    watcher::spawn(rt);
    rt
}
