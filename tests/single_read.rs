//! Scenario 1 (spec.md §8): single 1-byte read.

mod util;

use std::io::Write;
use std::os::unix::io::AsRawFd;

use aio::AioCb;

#[test]
fn single_byte_read_at_offset() {
    util::init();

    let mut file = tempfile::NamedTempFile::new().expect("create scratch file");
    file.write_all(b"hello\n").expect("seed contents");
    let fd = file.as_file().as_raw_fd();

    let cb = AioCb::new_read(fd, 1, vec![0u8; 1]);
    aio::read(&cb).expect("submit read");

    while matches!(aio::error(&cb), Err(aio::AioError::InProgress)) {
        std::thread::yield_now();
    }

    let n = aio::return_(&cb).expect("reap");
    assert_eq!(n, 1);
    assert_eq!(cb.buf(), b"e");
}
