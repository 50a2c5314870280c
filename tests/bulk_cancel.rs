//! Scenario 4 (spec.md §8): cancelling every outstanding request on one
//! fd leaves requests on a different fd untouched.

mod util;

use std::io::Write;
use std::os::unix::io::AsRawFd;

use aio::{AioCb, CancelStat};

#[test]
fn cancel_by_fd_only_touches_matching_requests() {
    util::init();

    let mut file_f = tempfile::NamedTempFile::new().expect("create scratch file F");
    let mut file_g = tempfile::NamedTempFile::new().expect("create scratch file G");
    file_f.write_all(&vec![1u8; 256]).expect("seed F");
    file_g.write_all(&vec![2u8; 256]).expect("seed G");
    let fd_f = file_f.as_file().as_raw_fd();
    let fd_g = file_g.as_file().as_raw_fd();

    let f_requests: Vec<AioCb> = (0..100)
        .map(|i| AioCb::new_read(fd_f, i, vec![0u8; 1]))
        .collect();
    let g_requests: Vec<AioCb> = (0..100)
        .map(|i| AioCb::new_read(fd_g, i, vec![0u8; 1]))
        .collect();

    for cb in f_requests.iter().chain(g_requests.iter()) {
        aio::read(cb).expect("submit read");
    }

    // Bulk cancel never reports `Canceled` (spec.md §4.5/§9): a clean
    // sweep or an empty one is `AllDone`, a race that leaves some
    // requests still running is `NotCanceled`.
    let stat = aio::cancel(fd_f, None).expect("bulk cancel on F");
    assert!(matches!(stat, CancelStat::AllDone | CancelStat::NotCanceled));

    for cb in &g_requests {
        while matches!(aio::error(cb), Err(aio::AioError::InProgress)) {
            std::thread::yield_now();
        }
        assert!(aio::error(cb).is_ok());
        assert_eq!(aio::return_(cb).expect("reap G"), 1);
    }

    for cb in &f_requests {
        match aio::error(cb) {
            Ok(()) => {
                // Completed before the cancel reached it: reapable with 1 byte.
                assert_eq!(aio::return_(cb).expect("reap F"), 1);
            }
            Err(aio::AioError::InProgress) => {
                // Raced with cancel; drain it out before exiting.
                while matches!(aio::error(cb), Err(aio::AioError::InProgress)) {
                    std::thread::yield_now();
                }
                let _ = aio::return_(cb);
            }
            Err(aio::AioError::Failed(_)) => {
                // Canceled: no longer reapable.
                assert!(aio::return_(cb).is_err());
            }
        }
    }
}
