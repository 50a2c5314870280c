//! Scenario 6 (spec.md §8): `lio_listio(WAIT, ...)` blocks until every
//! entry has completed.

mod util;

use std::io::Write;
use std::os::unix::io::AsRawFd;

use aio::{AioCb, LioMode};

#[test]
fn lio_listio_wait_mode_completes_every_entry() {
    util::init();

    let mut file = tempfile::NamedTempFile::new().expect("create scratch file");
    file.write_all(b"0123456789abcdef").expect("seed contents");
    let fd = file.as_file().as_raw_fd();

    let mut requests = vec![
        AioCb::new_read(fd, 0, vec![0u8; 4]),
        AioCb::new_read(fd, 4, vec![0u8; 4]),
        AioCb::new_read(fd, 8, vec![0u8; 4]),
        AioCb::new_read(fd, 12, vec![0u8; 4]),
    ];

    aio::lio_listio(LioMode::Wait, &mut requests, None).expect("listio wait");

    for cb in &requests {
        assert!(aio::error(cb).is_ok());
    }

    let mut reassembled = Vec::new();
    for cb in &requests {
        let n = aio::return_(cb).expect("reap");
        assert_eq!(n, 4);
        reassembled.extend_from_slice(cb.buf());
    }
    assert_eq!(reassembled, b"0123456789abcdef");
}
