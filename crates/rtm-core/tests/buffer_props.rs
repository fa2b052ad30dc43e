// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Ring buffer capacity and freshness properties under random workloads.

use rtm_core::buffer::{Buffer, BufferBase, RingBuffer};
use rtm_core::{BufferStatus, Properties};

#[test]
fn overwrite_keeps_newest_n() {
    let buffer: Buffer<u32> = Buffer::new(4);
    for v in 1..=5 {
        assert_eq!(buffer.write(v, None), BufferStatus::Ok);
    }
    let got: Vec<u32> = std::iter::from_fn(|| buffer.read(None).ok()).collect();
    assert_eq!(got, vec![2, 3, 4, 5]);
}

#[test]
fn do_nothing_rejects_extra_write() {
    let buffer: Buffer<u32> = Buffer::new(4);
    buffer.init(&Properties::from_pairs([("write.full_policy", "do_nothing")]));
    for v in 1..=4 {
        assert_eq!(buffer.write(v, None), BufferStatus::Ok);
    }
    assert_eq!(buffer.write(5, None), BufferStatus::Full);
    let got: Vec<u32> = std::iter::from_fn(|| buffer.read(None).ok()).collect();
    assert_eq!(got, vec![1, 2, 3, 4]);
}

#[test]
fn random_overwrite_workload_never_exceeds_capacity() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..50 {
        let capacity = rng.usize(1..16);
        let mut ring = RingBuffer::new(capacity);
        let mut expected = std::collections::VecDeque::new();
        for step in 0..200u32 {
            if rng.bool() {
                ring.write_overwrite(step);
                expected.push_back(step);
                if expected.len() > capacity {
                    expected.pop_front();
                }
            } else {
                assert_eq!(ring.read().ok(), expected.pop_front());
            }
            assert!(ring.readable() <= capacity);
            assert_eq!(ring.readable(), expected.len());
        }
    }
}

#[test]
fn is_new_after_read_and_failed_read() {
    let mut ring = RingBuffer::new(3);
    assert!(!ring.is_new());
    ring.write(1);
    assert!(ring.is_new());
    assert_eq!(ring.read(), Ok(1));
    assert!(!ring.is_new());
    assert_eq!(ring.read(), Err(BufferStatus::Empty));
    assert_eq!(ring.read(), Err(BufferStatus::Empty));
    assert!(!ring.is_new());
    assert_eq!(ring.readable(), 0);
    ring.write(2);
    assert!(ring.is_new());
}
