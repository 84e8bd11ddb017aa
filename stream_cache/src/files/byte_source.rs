// Sources the filler thread can pull bytes from

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Stdin};

/// A sequential byte source. Sources that can jump to an absolute offset override `reposition`; the rest
/// (pipes, stdin, decoders) keep the default, and seeks outside the cached window fail for them.
pub trait ByteSource: Read + Send {
    /// Move the source so the next read returns the byte at `pos`. Returns the new offset.
    fn reposition(&mut self, pos: u64) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("source cannot seek to {pos}"),
        ))
    }
}

impl ByteSource for File {
    fn reposition(&mut self, pos: u64) -> io::Result<u64> {
        self.seek(SeekFrom::Start(pos))
    }
}

impl<T: AsRef<[u8]> + Send> ByteSource for Cursor<T> {
    fn reposition(&mut self, pos: u64) -> io::Result<u64> {
        self.seek(SeekFrom::Start(pos))
    }
}

impl ByteSource for Stdin {}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    #[inline(always)]
    fn reposition(&mut self, pos: u64) -> io::Result<u64> {
        (**self).reposition(pos)
    }
}

/// Wraps any reader that can only stream forward, such as a decompressor.
pub struct StreamSource<R> {
    inner: R,
}

impl<R: Read + Send> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for StreamSource<R> {
    #[inline(always)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> ByteSource for StreamSource<R> {}
