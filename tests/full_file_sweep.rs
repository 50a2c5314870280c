//! Scenario 2 (spec.md §8): one request per byte across a whole file,
//! reaped in submission order, reassembling the exact contents.

mod util;

use std::io::Write;
use std::os::unix::io::AsRawFd;

use aio::AioCb;

#[test]
fn full_file_byte_sweep_reassembles_contents() {
    util::init();

    let contents: Vec<u8> = (0..64u8).cycle().take(200).collect();
    let mut file = tempfile::NamedTempFile::new().expect("create scratch file");
    file.write_all(&contents).expect("seed contents");
    let fd = file.as_file().as_raw_fd();

    let requests: Vec<AioCb> = (0..contents.len())
        .map(|offset| AioCb::new_read(fd, offset as i64, vec![0u8; 1]))
        .collect();

    for cb in &requests {
        aio::read(cb).expect("submit read");
    }

    for cb in &requests {
        while matches!(aio::error(cb), Err(aio::AioError::InProgress)) {
            std::thread::yield_now();
        }
    }

    let mut reassembled = Vec::with_capacity(contents.len());
    for cb in &requests {
        let n = aio::return_(cb).expect("reap");
        assert_eq!(n, 1);
        reassembled.extend_from_slice(cb.buf());
    }

    assert_eq!(reassembled, contents);
}
