// One filler thread and one reader thread sharing a MemCache

use std::io::SeekFrom;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::prelude::*;
use rand::rngs::StdRng;
use stream_cache::{CacheConfig, CacheError, CacheStrategy, MemCache, ReadStatus};

fn source(start: u64, end: u64) -> Vec<u8> {
    (start..end).map(|ofs| (ofs % 251) as u8).collect()
}

// Writes source bytes 0..total into the cache, honoring backpressure, then marks end of input
fn spawn_filler(cache: Arc<MemCache>, total: u64, seed: u64) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pos = 0u64;
        while pos < total {
            let n = rng.gen_range(1..500).min((total - pos) as usize);
            let chunk = source(pos, pos + n as u64);
            let mut sent = 0;
            while sent < n {
                let written = cache.write(&chunk[sent..]).unwrap();
                if written == 0 {
                    cache.wait_for_space(Duration::from_millis(50));
                }
                sent += written;
            }
            pos += n as u64;
        }
        cache.set_end_of_input();
    })
}

#[test]
fn test_concurrent_fill_and_read() {
    let cache = Arc::new(MemCache::new(CacheConfig::with_capacity(1024).no_lookahead()));
    let total = 300_000u64;
    let filler = spawn_filler(Arc::clone(&cache), total, 1);

    let mut rng = StdRng::seed_from_u64(2);
    let mut delivered = Vec::new();
    let mut buf = vec![0u8; 700];
    loop {
        let want = rng.gen_range(1..buf.len());
        match cache.read(&mut buf[..want]).unwrap() {
            ReadStatus::Data(n) => delivered.extend_from_slice(&buf[..n]),
            ReadStatus::EndOfStream => break,
            ReadStatus::WouldBlock => {
                cache.wait_for_data(1, Duration::from_millis(100));
            }
        }

        // Now and then step back a little and read it again
        if rng.gen_ratio(1, 20) {
            let pos = cache.position();
            let back = rng.gen_range(0..=pos.min(300));
            if back > 0 {
                assert_eq!(cache.seek(SeekFrom::Start(pos - back)).unwrap(), pos - back);
                let mut replay = vec![0u8; back as usize];
                let mut got = 0;
                while got < replay.len() {
                    match cache.read(&mut replay[got..]).unwrap() {
                        ReadStatus::Data(n) => got += n,
                        other => panic!("Expected replayed data; got {:?}", other),
                    }
                }
                assert_eq!(replay, source(pos - back, pos));
            }
        }
    }
    filler.join().unwrap();
    assert_eq!(delivered.len() as u64, total);
    assert_eq!(delivered, source(0, total));
}

#[test]
fn test_seek_waits_for_filler() {
    let config = CacheConfig::with_capacity(4096).lookahead(10_000, Duration::from_secs(10));
    let cache = Arc::new(MemCache::new(config));
    cache.write(&source(0, 10)).unwrap();

    let late = Arc::clone(&cache);
    let filler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        late.write(&source(10, 200)).unwrap();
    });

    // Beyond what is buffered now, but within the look-ahead distance
    assert_eq!(cache.seek(SeekFrom::Start(150)).unwrap(), 150);
    filler.join().unwrap();

    let mut buf = [0u8; 10];
    assert_eq!(cache.read(&mut buf).unwrap(), ReadStatus::Data(10));
    assert_eq!(buf.to_vec(), source(150, 160));
}

#[test]
fn test_seek_wait_gives_up() {
    let config = CacheConfig::with_capacity(4096).lookahead(10_000, Duration::from_millis(200));
    let cache = MemCache::new(config);
    cache.write(&source(0, 10)).unwrap();

    let start = Instant::now();
    match cache.seek(SeekFrom::Start(150)) {
        Err(CacheError::OutOfWindow { target: 150, .. }) => {}
        other => panic!("Expected OutOfWindow; got {:?}", other),
    }
    assert!(start.elapsed() >= Duration::from_millis(150));
    assert_eq!(cache.position(), 0);

    // Too far ahead to be worth waiting for
    let start = Instant::now();
    assert!(cache.seek(SeekFrom::Start(20_000)).is_err());
    assert!(start.elapsed() < Duration::from_millis(150));
}

#[test]
fn test_end_of_input_wakes_waiter() {
    let cache = Arc::new(MemCache::new(CacheConfig::with_capacity(64)));
    let closer = Arc::clone(&cache);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        closer.write(b"abc").unwrap();
        closer.set_end_of_input();
    });

    let start = Instant::now();
    let avail = cache.wait_for_data(10, Duration::from_secs(10));
    assert_eq!(avail, 3);
    assert!(start.elapsed() < Duration::from_secs(5));
    handle.join().unwrap();
}

#[test]
fn test_wait_for_space_after_read() {
    let cache = Arc::new(MemCache::new(CacheConfig::with_capacity(16)));
    cache.write(&source(0, 16)).unwrap();
    assert_eq!(cache.wait_for_space(Duration::ZERO), 0);

    let reader = Arc::clone(&cache);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let mut buf = [0u8; 6];
        reader.read(&mut buf).unwrap()
    });

    assert_eq!(cache.wait_for_space(Duration::from_secs(10)), 6);
    assert_eq!(handle.join().unwrap(), ReadStatus::Data(6));
}
