//! Completion notification via POSIX signals — best effort, as
//! spec.md §5 allows.
//!
//! Grounded on `aio.c`'s `notify_finished` (`sigqueue(c->tid, ...)`
//! gated on `sigev_signo != 0 && sigev_notify != SIGEV_NONE`) and the
//! `SigevNotify` naming used by the vendored `nix::sys::aio` in the
//! retrieval pack's `other_examples`.

use std::io;

/// What (if anything) happens when a request completes, beyond the
/// watcher updating `error`/`result` and waking any `suspend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigevNotify {
    /// No signal is queued. The POSIX default.
    #[default]
    None,
    /// Queue `signo` with `value` to the submitting thread.
    Signal { signo: i32, value: i32 },
}

/// A request's completion notification descriptor (`struct sigevent`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SigEvent {
    notify: SigevNotify,
}

impl SigEvent {
    /// No completion signal — `SIGEV_NONE`.
    pub fn none() -> SigEvent {
        SigEvent {
            notify: SigevNotify::None,
        }
    }

    /// Queue `signo` (with an arbitrary `sigval` payload) to the
    /// submitting thread on completion.
    pub fn signal(signo: i32, value: i32) -> SigEvent {
        SigEvent {
            notify: SigevNotify::Signal { signo, value },
        }
    }

    pub fn notify(&self) -> SigevNotify {
        self.notify
    }

    /// Queues the configured signal to `tid`, if any. Mirrors
    /// `notify_finished`'s guard: a zero `signo` or `SIGEV_NONE` is a
    /// silent no-op, never an error.
    ///
    /// The target is the tid returned by `gettid(2)`, passed as the
    /// `pid` argument of `sigqueue(3)`. On Linux this relies on the
    /// same thread-targeting behavior the original C implementation
    /// relies on; see DESIGN.md for the caveat this carries forward.
    pub(crate) fn queue_to(&self, tid: u32) -> io::Result<()> {
        if let SigevNotify::Signal { signo, value } = self.notify {
            if signo != 0 {
                let sigval = libc::sigval { sival_int: value };
                let r = unsafe { libc::sigqueue(tid as libc::pid_t, signo, sigval) };
                if r < 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_default_and_noop() {
        let ev = SigEvent::default();
        assert_eq!(ev.notify(), SigevNotify::None);
        assert!(ev.queue_to(0).is_ok());
    }

    #[test]
    fn zero_signo_is_a_noop_even_with_signal_variant() {
        let ev = SigEvent::signal(0, 42);
        assert!(ev.queue_to(0).is_ok());
    }
}
