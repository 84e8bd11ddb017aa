// Fixed-capacity circular byte store used for each window of the cache.

/**
 * RingBuffer holds up to `capacity` bytes between a read cursor (`head`) and a write cursor (`head + len`,
 * wrapping). Everything here is plain data movement; the cache that owns the buffers does the locking.
 *
 * Operations that cannot be completed in full do nothing and return false. Callers in the cache check
 * capacities before moving bytes, so a false return means the capacity accounting is broken.
 */
pub struct RingBuffer {
    buf: Vec<u8>,
    // Read cursor
    head: usize,
    // Bytes written and not yet consumed
    len: usize,
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
         .field("capacity", &self.capacity())
         .field("readable", &self.len)
         .finish()
    }
}

impl RingBuffer {
    /// Creates an empty buffer holding at most `capacity` bytes.
    ///
    /// # Panics
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![0u8; capacity],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes available to read.
    #[inline]
    pub fn readable(&self) -> usize {
        self.len
    }

    /// Bytes that can be written before the buffer is full.
    #[inline]
    pub fn writable(&self) -> usize {
        self.capacity() - self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    // The readable bytes as up to two slices, oldest first
    fn segments(&self) -> (&[u8], &[u8]) {
        let cap = self.capacity();
        if self.len <= cap - self.head {
            (&self.buf[self.head..self.head + self.len], &[])
        } else {
            let first = cap - self.head;
            (&self.buf[self.head..], &self.buf[..self.len - first])
        }
    }

    // The oldest `n` readable bytes as up to two slices
    fn front(&self, n: usize) -> (&[u8], &[u8]) {
        debug_assert!(n <= self.len);
        let (a, b) = self.segments();
        if n <= a.len() {
            (&a[..n], &[])
        } else {
            (a, &b[..n - a.len()])
        }
    }

    /// Appends all of `data`. Returns false, writing nothing, if `data.len() > writable()`.
    pub fn write(&mut self, data: &[u8]) -> bool {
        let n = data.len();
        if n > self.writable() {
            return false;
        }
        if n == 0 {
            return true;
        }

        let cap = self.capacity();
        let tail = (self.head + self.len) % cap;
        let first = (cap - tail).min(n);
        self.buf[tail..tail + first].copy_from_slice(&data[..first]);
        if n > first {
            self.buf[..n - first].copy_from_slice(&data[first..]);
        }
        self.len += n;
        true
    }

    /// Fills all of `out` with the oldest bytes and consumes them.
    /// Returns false, reading nothing, if `out.len() > readable()`.
    pub fn read(&mut self, out: &mut [u8]) -> bool {
        let n = out.len();
        if n > self.len {
            return false;
        }
        let (a, b) = self.front(n);
        out[..a.len()].copy_from_slice(a);
        out[a.len()..].copy_from_slice(b);
        self.advance(n);
        true
    }

    /// Discards the oldest `n` readable bytes without copying them anywhere.
    pub fn skip(&mut self, n: usize) -> bool {
        if n > self.len {
            return false;
        }
        self.advance(n);
        true
    }

    fn advance(&mut self, n: usize) {
        self.len -= n;
        self.head = if self.len == 0 {
            0
        } else {
            (self.head + n) % self.capacity()
        };
    }

    /// Moves the oldest `n` bytes of `self` onto the end of `dst`.
    /// Fails if `self` holds fewer than `n` bytes or `dst` has less than `n` bytes of room.
    pub fn transfer(&mut self, dst: &mut RingBuffer, n: usize) -> bool {
        if n > self.len || n > dst.writable() {
            return false;
        }
        let (a, b) = self.front(n);
        let ok = dst.write(a) && dst.write(b);
        debug_assert!(ok);
        self.advance(n);
        true
    }

    /// Moves every readable byte of `other` onto the end of `self`, leaving `other` empty.
    pub fn append(&mut self, other: &mut RingBuffer) -> bool {
        let n = other.readable();
        other.transfer(self, n)
    }

    /// Replaces the contents of `self` with a copy of `other`'s readable bytes. `other` is unchanged.
    pub fn copy_from(&mut self, other: &RingBuffer) -> bool {
        if other.readable() > self.capacity() {
            return false;
        }
        self.clear();
        let (a, b) = other.segments();
        self.write(a) && self.write(b)
    }

    /// Copy of the readable bytes, oldest first, without consuming them.
    pub fn to_vec(&self) -> Vec<u8> {
        let (a, b) = self.segments();
        let mut out = Vec::with_capacity(self.len);
        out.extend_from_slice(a);
        out.extend_from_slice(b);
        out
    }
}
