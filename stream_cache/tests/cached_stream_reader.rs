// Tests for CachedStreamReader driving a MemCache from a filler thread

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use stream_cache::files::{CachedStreamReader, MockSource, StreamSource};
use stream_cache::{CacheConfig, CacheStrategy, MemCache, ReadStatus};

fn config(capacity: usize) -> CacheConfig {
    CacheConfig::with_capacity(capacity).lookahead(1000, Duration::from_secs(2))
}

fn read_exactly(reader: &mut CachedStreamReader, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf).unwrap();
    buf
}

#[test]
fn test_read_to_end() {
    let src = MockSource::counting(200_000, 1000);
    let expected = src.expected(0, 200_000);
    let mut reader = CachedStreamReader::new(src, config(4096));

    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out.len(), expected.len());
    assert_eq!(out, expected);
    assert!(reader.is_eof());
}

#[test]
fn test_seek_within_window_leaves_source_alone() {
    let src = MockSource::counting(50_000, 700);
    let counter = src.reposition_counter();
    let expected = src.expected(0, 50_000);
    let mut reader = CachedStreamReader::new(src, config(4096));

    assert_eq!(read_exactly(&mut reader, 3000), &expected[..3000]);

    // back into history
    assert_eq!(reader.seek(SeekFrom::Start(1000)).unwrap(), 1000);
    assert_eq!(read_exactly(&mut reader, 100), &expected[1000..1100]);

    // relative, both ways
    assert_eq!(reader.seek(SeekFrom::Current(-50)).unwrap(), 1050);
    assert_eq!(read_exactly(&mut reader, 10), &expected[1050..1060]);
    assert_eq!(reader.seek(SeekFrom::Current(500)).unwrap(), 1560);
    assert_eq!(read_exactly(&mut reader, 10), &expected[1560..1570]);
    assert_eq!(reader.stream_position().unwrap(), 1570);

    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_seek_outside_window_repositions_source() {
    let src = MockSource::counting(100_000, 1000);
    let counter = src.reposition_counter();
    let expected = src.expected(0, 100_000);
    let mut reader = CachedStreamReader::new(src, config(2048));

    assert_eq!(read_exactly(&mut reader, 20_000), &expected[..20_000]);

    // Long since evicted from history
    assert_eq!(reader.seek(SeekFrom::Start(10)).unwrap(), 10);
    assert_eq!(read_exactly(&mut reader, 5000), &expected[10..5010]);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Far ahead of anything fetched
    assert_eq!(reader.seek(SeekFrom::Start(90_000)).unwrap(), 90_000);
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, &expected[90_000..]);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unseekable_source_reports_window_miss() {
    let src = MockSource::counting(100_000, 1000).unseekable();
    let expected = src.expected(0, 100_000);
    let mut reader = CachedStreamReader::new(src, config(2048));

    assert_eq!(read_exactly(&mut reader, 10_000), &expected[..10_000]);
    let err = reader.seek(SeekFrom::Start(0)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Unsupported);

    // The stream is still usable where it was
    assert_eq!(reader.stream_position().unwrap(), 10_000);
    assert_eq!(read_exactly(&mut reader, 100), &expected[10_000..10_100]);
}

#[test]
fn test_seek_from_end_is_rejected() {
    let mut reader = CachedStreamReader::new(Cursor::new(vec![1u8; 100]), config(64));
    let err = reader.seek(SeekFrom::End(0)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    let err = reader.seek(SeekFrom::Current(-1)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}

#[test]
fn test_slow_source() {
    let src = MockSource::counting(20_000, 512).with_delay(Duration::from_millis(1));
    let expected = src.expected(0, 20_000);
    let mut reader = CachedStreamReader::new(src, config(1024));

    assert!(reader.wait(512, Duration::from_secs(10)) >= 512);

    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_try_read_until_end() {
    let data: Vec<u8> = (0..5000u32).map(|n| (n * 7) as u8).collect();
    let mut reader = CachedStreamReader::new(StreamSource::new(Cursor::new(data.clone())), config(1024));

    let mut out = Vec::new();
    let mut buf = [0u8; 300];
    loop {
        match reader.try_read(&mut buf).unwrap() {
            ReadStatus::Data(n) => out.extend_from_slice(&buf[..n]),
            ReadStatus::EndOfStream => break,
            ReadStatus::WouldBlock => {
                reader.wait(1, Duration::from_millis(100));
            }
        }
    }
    assert_eq!(out, data);
}

#[test]
fn test_shared_cache_handle() {
    let cache = Arc::new(MemCache::new(config(256)));
    let mut reader = CachedStreamReader::with_cache(Cursor::new(b"hello, world".to_vec()), cache.clone(), 5);
    let mut out = String::new();
    reader.read_to_string(&mut out).unwrap();
    assert_eq!(out, "hello, world");
    assert!(cache.is_end_of_input());
    assert_eq!(cache.window().history, 12);
}
