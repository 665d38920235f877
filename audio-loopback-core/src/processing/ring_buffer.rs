use parking_lot::{Condvar, Mutex};

/// Circular byte buffer for PCM data.
///
/// Overflow behavior: drops oldest bytes.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write bytes into the ring buffer.
    ///
    /// If the buffer overflows, the oldest bytes are dropped.
    /// If `data` is larger than capacity, only the last `capacity` bytes are kept.
    /// Returns the number of bytes dropped.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        let mut dropped = 0;
        let data = if data.len() > self.capacity {
            dropped += data.len() - self.capacity;
            &data[data.len() - self.capacity..]
        } else {
            data
        };

        let overflow = (self.available + data.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            dropped += overflow;
        }

        let first = data.len().min(self.capacity - self.write_index);
        self.buffer[self.write_index..self.write_index + first].copy_from_slice(&data[..first]);
        self.buffer[..data.len() - first].copy_from_slice(&data[first..]);
        self.write_index = (self.write_index + data.len()) % self.capacity;
        self.available += data.len();
        dropped
    }

    /// Read and remove up to `out.len()` bytes into `out`.
    ///
    /// Returns the number of bytes copied.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let to_read = out.len().min(self.available);
        if to_read == 0 {
            return 0;
        }

        let first = to_read.min(self.capacity - self.read_index);
        out[..first].copy_from_slice(&self.buffer[self.read_index..self.read_index + first]);
        out[first..to_read].copy_from_slice(&self.buffer[..to_read - first]);
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Number of bytes currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    /// Number of bytes that can be written without dropping data.
    pub fn free(&self) -> usize {
        self.capacity - self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

struct Shared {
    ring: RingBuffer,
    closed: bool,
}

/// A [`RingBuffer`] shared between a device thread and the block loop.
///
/// Readers and writers block on a condition variable until enough data or
/// space is available, or until the buffer is closed.
pub struct BlockingRingBuffer {
    inner: Mutex<Shared>,
    changed: Condvar,
}

impl BlockingRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Shared {
                ring: RingBuffer::new(capacity),
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Appends without blocking, dropping the oldest bytes on overflow.
    pub fn push_overwrite(&self, data: &[u8]) -> usize {
        let dropped = self.inner.lock().ring.write(data);
        self.changed.notify_all();
        dropped
    }

    /// Blocks until `out` can be filled completely, then fills it.
    ///
    /// Returns 0 once the buffer is closed and no full block remains.
    pub fn read_block(&self, out: &mut [u8]) -> usize {
        let mut shared = self.inner.lock();
        while shared.ring.count() < out.len() && !shared.closed {
            self.changed.wait(&mut shared);
        }
        if shared.ring.count() < out.len() {
            return 0;
        }
        let n = shared.ring.read_into(out);
        drop(shared);
        self.changed.notify_all();
        n
    }

    /// Blocks until all of `data` fits, then appends it.
    ///
    /// Data larger than the capacity is written in capacity-sized pieces.
    /// Returns the number of bytes accepted, short only if the buffer closes.
    pub fn write_block(&self, data: &[u8]) -> usize {
        let mut written = 0;
        while written < data.len() {
            let mut shared = self.inner.lock();
            let piece = (data.len() - written).min(shared.ring.capacity());
            while shared.ring.free() < piece && !shared.closed {
                self.changed.wait(&mut shared);
            }
            if shared.closed {
                return written;
            }
            shared.ring.write(&data[written..written + piece]);
            written += piece;
            drop(shared);
            self.changed.notify_all();
        }
        written
    }

    /// Drains up to `out.len()` bytes without blocking.
    pub fn pop_available(&self, out: &mut [u8]) -> usize {
        let n = self.inner.lock().ring.read_into(out);
        if n > 0 {
            self.changed.notify_all();
        }
        n
    }

    pub fn count(&self) -> usize {
        self.inner.lock().ring.count()
    }

    /// Wakes every blocked reader and writer; subsequent blocking calls return early.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.changed.notify_all();
    }

    /// Clears data and reopens the buffer.
    pub fn reset(&self) {
        let mut shared = self.inner.lock();
        shared.ring.reset();
        shared.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn read(buf: &mut RingBuffer, n: usize) -> Vec<u8> {
        let mut out = vec![0; n];
        let got = buf.read_into(&mut out);
        out.truncate(got);
        out
    }

    #[test]
    fn basic_write_read() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]);

        assert_eq!(buf.count(), 3);
        assert_eq!(read(&mut buf, 3), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn read_partial() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3, 4, 5]);

        assert_eq!(read(&mut buf, 3), vec![1, 2, 3]);
        assert_eq!(buf.count(), 2);
        assert_eq!(read(&mut buf, 10), vec![4, 5]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1, 2, 3, 4]);
        let dropped = buf.write(&[5, 6]);

        assert_eq!(dropped, 2);
        assert_eq!(buf.count(), 4);
        assert_eq!(read(&mut buf, 4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn write_larger_than_capacity() {
        let mut buf = RingBuffer::new(3);
        let dropped = buf.write(&[1, 2, 3, 4, 5]);

        assert_eq!(dropped, 2);
        assert_eq!(read(&mut buf, 3), vec![3, 4, 5]);
    }

    #[test]
    fn wraparound() {
        let mut buf = RingBuffer::new(4);

        buf.write(&[1, 2, 3]);
        read(&mut buf, 2);
        buf.write(&[4, 5, 6]);

        assert_eq!(buf.count(), 4);
        assert_eq!(buf.free(), 0);
        assert_eq!(read(&mut buf, 4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn reset_clears_buffer() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]);
        buf.reset();

        assert!(buf.is_empty());
        assert_eq!(buf.free(), 10);
        assert!(read(&mut buf, 10).is_empty());
    }

    #[test]
    fn blocking_read_waits_for_full_block() {
        let shared = Arc::new(BlockingRingBuffer::new(12));
        let producer = Arc::clone(&shared);

        let handle = thread::spawn(move || {
            for chunk in [[1u8, 2], [3, 4], [5, 6]] {
                producer.push_overwrite(&chunk);
            }
        });

        let mut block = [0u8; 6];
        assert_eq!(shared.read_block(&mut block), 6);
        assert_eq!(block, [1, 2, 3, 4, 5, 6]);
        handle.join().unwrap();
    }

    #[test]
    fn close_releases_blocked_reader() {
        let shared = Arc::new(BlockingRingBuffer::new(8));
        let closer = Arc::clone(&shared);
        shared.push_overwrite(&[1, 2]);

        let handle = thread::spawn(move || closer.close());

        let mut block = [0u8; 4];
        assert_eq!(shared.read_block(&mut block), 0);
        handle.join().unwrap();
        assert!(shared.is_closed());
    }

    #[test]
    fn blocking_write_waits_for_space() {
        let shared = Arc::new(BlockingRingBuffer::new(4));
        let consumer = Arc::clone(&shared);

        let handle = thread::spawn(move || {
            let mut drained = Vec::new();
            let mut out = [0u8; 4];
            while drained.len() < 8 {
                let n = consumer.pop_available(&mut out);
                drained.extend_from_slice(&out[..n]);
                thread::yield_now();
            }
            drained
        });

        assert_eq!(shared.write_block(&[1, 2, 3, 4, 5, 6, 7, 8]), 8);
        assert_eq!(handle.join().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn write_after_close_is_short() {
        let shared = BlockingRingBuffer::new(4);
        shared.close();
        assert_eq!(shared.write_block(&[1, 2]), 0);

        shared.reset();
        assert_eq!(shared.write_block(&[1, 2]), 2);
        assert_eq!(shared.count(), 2);
    }
}
