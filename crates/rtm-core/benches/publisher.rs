// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Benchmark: OutPort write latency per publisher type.
//!
//! Flush delivers on the caller thread; New only buffers and signals its
//! push thread, so its write cost excludes delivery.

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rtm_core::port::{connect, InPort, OutPort};
use rtm_core::{Properties, Registry};
use std::sync::Arc;

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("outport_write");
    for publisher in ["flush", "new"] {
        let registry = Registry::<u64>::with_defaults();
        let outport = OutPort::new("bench_out");
        let inport = Arc::new(InPort::new("bench_in"));
        let props = Properties::from_pairs([
            ("publisher_type", publisher),
            ("publisher.push_policy", "all"),
            ("buffer.length", "1024"),
        ]);
        connect(&registry, &outport, &inport, "bench", props).expect("connect");

        group.bench_with_input(BenchmarkId::from_parameter(publisher), &(), |b, ()| {
            let mut seq = 0u64;
            b.iter(|| {
                seq = seq.wrapping_add(1);
                black_box(outport.write(black_box(seq)));
                // Keep the receive buffer from saturating.
                let _ = inport.read();
            });
        });
    }
    group.finish();
}

fn bench_direct(c: &mut Criterion) {
    let registry = Registry::<u64>::with_defaults();
    let outport = OutPort::new("bench_out");
    let inport = Arc::new(InPort::new("bench_in"));
    let props = Properties::from_pairs([("dataport.interface_type", "direct")]);
    connect(&registry, &outport, &inport, "bench", props).expect("connect");

    c.bench_function("outport_write_direct", |b| {
        b.iter(|| {
            black_box(outport.write(black_box(7)));
            black_box(inport.read())
        });
    });
}

criterion_group!(publisher_benches, bench_write, bench_direct);
criterion_main!(publisher_benches);
