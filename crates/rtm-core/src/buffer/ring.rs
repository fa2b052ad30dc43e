// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-capacity circular buffer with explicit read/write cursors.
//!
//! Not synchronized: [`Buffer`](super::Buffer) wraps it in a mutex and adds
//! the blocking policies.
//!
//! Cursor model:
//! - `wpos`: next slot to write
//! - `rpos`: oldest unread slot
//! - `fillcount`: unread samples (`0..=length`)
//! - `wcount`: samples written since the last reset (enables readback)

use crate::status::BufferStatus;

/// Default slot count when `buffer.length` is absent or invalid.
pub const DEFAULT_LENGTH: usize = 8;

/// Circular buffer of `length` slots.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    wpos: usize,
    rpos: usize,
    fillcount: usize,
    wcount: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a buffer of `length` slots (a zero length is raised to 1).
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        Self {
            slots: vec![None; length],
            wpos: 0,
            rpos: 0,
            fillcount: 0,
            wcount: 0,
        }
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.slots.len()
    }

    /// Re-length the buffer. Discards all contents.
    pub fn set_length(&mut self, n: usize) -> BufferStatus {
        if n == 0 {
            return BufferStatus::PreconditionNotMet;
        }
        self.slots = vec![None; n];
        self.reset()
    }

    /// Rewind both cursors and forget every sample.
    pub fn reset(&mut self) -> BufferStatus {
        self.wpos = 0;
        self.rpos = 0;
        self.fillcount = 0;
        self.wcount = 0;
        BufferStatus::Ok
    }

    // ------------------------------------------------------------------
    // Write side
    // ------------------------------------------------------------------

    /// Store `value` at the write cursor without advancing it.
    pub fn put(&mut self, value: T) -> BufferStatus {
        self.slots[self.wpos] = Some(value);
        BufferStatus::Ok
    }

    /// Move the write cursor by `n` (negative rewinds).
    ///
    /// Fails with `PreconditionNotMet` when `n` exceeds the free slots, or
    /// when a rewind would go past the unread samples.
    pub fn advance_wptr(&mut self, n: isize) -> BufferStatus {
        let len = self.length() as isize;
        let fill = self.fillcount as isize;
        if (n > 0 && n > len - fill) || (n < 0 && n < -fill) {
            return BufferStatus::PreconditionNotMet;
        }
        self.wpos = wrap(self.wpos as isize + n, len);
        self.fillcount = (fill + n) as usize;
        self.wcount = (self.wcount as isize + n).max(0) as usize;
        BufferStatus::Ok
    }

    /// Append `value`; fails with `Full` if no slot is free.
    pub fn write(&mut self, value: T) -> BufferStatus {
        if self.full() {
            return BufferStatus::Full;
        }
        self.put(value);
        self.advance_wptr(1)
    }

    /// Append `value`, discarding the oldest unread sample when full.
    ///
    /// Returns `true` if a sample was discarded.
    pub fn write_overwrite(&mut self, value: T) -> bool {
        let overwrote = self.full();
        if overwrote {
            self.advance_rptr(1);
        }
        self.put(value);
        self.advance_wptr(1);
        overwrote
    }

    #[inline]
    pub fn writable(&self) -> usize {
        self.length() - self.fillcount
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.fillcount == self.length()
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// Sample at the read cursor, without consuming it.
    pub fn get(&self) -> Option<&T> {
        self.slots[self.rpos].as_ref()
    }

    /// Sample `n` slots away from the read cursor (wraps).
    pub fn peek(&self, n: isize) -> Option<&T> {
        let idx = wrap(self.rpos as isize + n, self.length() as isize);
        self.slots[idx].as_ref()
    }

    /// Move the read cursor by `n` (negative rewinds over already-read slots).
    pub fn advance_rptr(&mut self, n: isize) -> BufferStatus {
        let len = self.length() as isize;
        let fill = self.fillcount as isize;
        if (n > 0 && n > fill) || (n < 0 && n < fill - len) {
            return BufferStatus::PreconditionNotMet;
        }
        self.rpos = wrap(self.rpos as isize + n, len);
        self.fillcount = (fill - n) as usize;
        BufferStatus::Ok
    }

    /// Consume the oldest unread sample; `Err(Empty)` leaves state untouched.
    pub fn read(&mut self) -> Result<T, BufferStatus> {
        if self.empty() {
            return Err(BufferStatus::Empty);
        }
        let value = self.get().cloned().ok_or(BufferStatus::Error)?;
        self.advance_rptr(1);
        Ok(value)
    }

    /// Re-read the most recently consumed sample (rewinds one slot first).
    ///
    /// `Err(Empty)` if nothing was ever written.
    pub fn read_back(&mut self) -> Result<T, BufferStatus> {
        if self.wcount == 0 {
            return Err(BufferStatus::Empty);
        }
        let status = self.advance_rptr(-1);
        if !status.is_ok() {
            return Err(status);
        }
        self.read()
    }

    #[inline]
    pub fn readable(&self) -> usize {
        self.fillcount
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.fillcount == 0
    }

    /// True iff at least one unread sample exists.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.fillcount > 0
    }

    /// Number of unread samples.
    #[inline]
    pub fn new_data_len(&self) -> usize {
        self.fillcount
    }

    /// Samples written since the last reset.
    #[inline]
    pub fn write_count(&self) -> usize {
        self.wcount
    }
}

#[inline]
fn wrap(pos: isize, len: isize) -> usize {
    pos.rem_euclid(len) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(ring: &mut RingBuffer<i32>) -> Vec<i32> {
        let mut out = Vec::new();
        while let Ok(v) = ring.read() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_overwrite_discards_oldest() {
        let mut ring = RingBuffer::new(4);
        for v in 1..=5 {
            ring.write_overwrite(v);
        }
        assert_eq!(ring.readable(), 4);
        assert_eq!(drain(&mut ring), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_do_nothing_keeps_contents() {
        let mut ring = RingBuffer::new(4);
        for v in 1..=4 {
            assert_eq!(ring.write(v), BufferStatus::Ok);
        }
        assert_eq!(ring.write(5), BufferStatus::Full);
        assert_eq!(drain(&mut ring), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_empty_is_idempotent() {
        let mut ring = RingBuffer::new(2);
        ring.write(1);
        assert!(ring.is_new());
        assert_eq!(ring.read(), Ok(1));
        assert!(!ring.is_new());
        assert_eq!(ring.read(), Err(BufferStatus::Empty));
        assert_eq!(ring.read(), Err(BufferStatus::Empty));
        assert_eq!(ring.readable(), 0);
        assert_eq!(ring.writable(), 2);
    }

    #[test]
    fn test_advance_bounds() {
        let mut ring = RingBuffer::new(4);
        ring.write(1);
        ring.write(2);
        assert_eq!(ring.advance_rptr(3), BufferStatus::PreconditionNotMet);
        assert_eq!(ring.advance_wptr(3), BufferStatus::PreconditionNotMet);
        assert_eq!(ring.advance_rptr(2), BufferStatus::Ok);
        assert!(ring.empty());
        // rewind over the two consumed slots
        assert_eq!(ring.advance_rptr(-2), BufferStatus::Ok);
        assert_eq!(ring.readable(), 2);
        assert_eq!(ring.advance_rptr(-3), BufferStatus::PreconditionNotMet);
    }

    #[test]
    fn test_peek_and_get() {
        let mut ring = RingBuffer::new(3);
        for v in [7, 8, 9] {
            ring.write(v);
        }
        assert_eq!(ring.get(), Some(&7));
        assert_eq!(ring.peek(2), Some(&9));
        assert_eq!(ring.peek(-1), Some(&9));
    }

    #[test]
    fn test_read_back_requires_history() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(3);
        assert_eq!(ring.read_back(), Err(BufferStatus::Empty));
        ring.write(42);
        assert_eq!(ring.read(), Ok(42));
        assert_eq!(ring.read_back(), Ok(42));
        assert_eq!(ring.read_back(), Ok(42));
        assert!(ring.empty());
    }

    #[test]
    fn test_set_length_resets() {
        let mut ring = RingBuffer::new(2);
        ring.write(1);
        assert_eq!(ring.set_length(5), BufferStatus::Ok);
        assert_eq!(ring.length(), 5);
        assert!(ring.empty());
        assert_eq!(ring.write_count(), 0);
        assert_eq!(ring.set_length(0), BufferStatus::PreconditionNotMet);
    }
}
