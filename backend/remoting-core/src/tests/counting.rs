use crate::transport::{CountingReader, CountingWriter};

use std::io::{Read, Write};

#[test]
fn given_writes_when_counted_then_total_matches_bytes_written() {
    let mut writer = CountingWriter::new(Vec::new());

    writer.write_all(b"hello ").expect("write");
    writer.write_all(b"world").expect("write");
    writer.flush().expect("flush");

    assert_eq!(writer.count(), 11);
    assert_eq!(writer.into_inner(), b"hello world");
}

#[test]
fn given_reads_when_counted_then_total_matches_bytes_read() {
    let mut reader = CountingReader::new(&b"abcdef"[..]);
    let mut first = [0u8; 4];
    reader.read_exact(&mut first).expect("read");

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).expect("read");

    assert_eq!(reader.count(), 6);
    assert_eq!(rest, b"ef");
}
