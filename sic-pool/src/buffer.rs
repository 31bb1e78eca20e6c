//! A small pool of reusable `u16` code-unit buffers for transcoding
//! candidates too long for the stack-allocated fast path: a bounded idle
//! queue behind a mutex, handed out through an RAII guard that returns
//! its resource to the pool on drop — including on an early return from
//! a failed transcode, which is why `Drop` does the returning rather
//! than an explicit "release" call the caller could forget.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Bound on how many idle buffers we keep around; beyond this we just let
/// the `Vec` drop normally rather than grow the pool without limit.
const MAX_IDLE_BUFFERS: usize = 64;

pub(crate) struct BufferPool {
    idle: Mutex<VecDeque<Vec<u16>>>,
}

impl BufferPool {
    pub(crate) fn new() -> Self {
        BufferPool { idle: Mutex::new(VecDeque::new()) }
    }

    /// Rents a buffer with at least `min_capacity` spare room, reusing an
    /// idle one if available.
    pub(crate) fn rent(&self, min_capacity: usize) -> RentedBuffer<'_> {
        let mut buf = {
            let mut idle = self.idle.lock();
            idle.pop_front().unwrap_or_default()
        };
        buf.clear();
        if buf.capacity() < min_capacity {
            buf.reserve(min_capacity - buf.capacity());
        }
        RentedBuffer { pool: self, buf: Some(buf) }
    }

    fn give_back(&self, buf: Vec<u16>) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_BUFFERS {
            idle.push_back(buf);
        }
    }
}

/// RAII handle for a rented buffer; returns it to the pool on drop.
pub(crate) struct RentedBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u16>>,
}

impl Deref for RentedBuffer<'_> {
    type Target = Vec<u16>;
    fn deref(&self) -> &Vec<u16> {
        self.buf.as_ref().expect("buffer taken only on drop")
    }
}

impl DerefMut for RentedBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u16> {
        self.buf.as_mut().expect("buffer taken only on drop")
    }
}

impl Drop for RentedBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.give_back(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rented_buffer_is_cleared_and_reused() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.rent(16);
            buf.extend_from_slice(&[1, 2, 3]);
        }
        let buf = pool.rent(4);
        assert!(buf.is_empty(), "a returned buffer must come back cleared");
    }
}
