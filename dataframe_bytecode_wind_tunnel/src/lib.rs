// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Program shapes shared by the `dataframe_bytecode` wind-tunnel benchmarks.

use dataframe_bytecode::builder::{BytecodeBuilder, ScratchRegisters};

/// Emits `depth` nested scratch buffers, halving the size at each level, then releases them
/// innermost first. Repeats `rounds` times so later rounds are served entirely from the pool.
pub fn nested_scratch(b: &mut BytecodeBuilder, rounds: u32, depth: u32, top_size: u32) {
    let mut live: Vec<ScratchRegisters> = Vec::with_capacity(depth as usize);
    for _ in 0..rounds {
        let mut size = top_size;
        for _ in 0..depth {
            live.push(b.allocate_scratch(size));
            size = (size / 2).max(1);
        }
        while let Some(regs) = live.pop() {
            b.release_scratch(regs);
        }
    }
}

/// Emits `count` scratch requests whose sizes cycle through `sizes`, releasing each one before
/// the next request. Models a filter chain where every stage needs one temporary.
pub fn churn_scratch(b: &mut BytecodeBuilder, count: u32, sizes: &[u32]) {
    for i in 0..count as usize {
        let size = sizes.get(i % sizes.len().max(1)).copied().unwrap_or(1);
        b.with_scratch(size, |_, _| ());
    }
}

/// Builds a program of `count` churned scratch requests; see [`churn_scratch`].
#[must_use]
pub fn churn_program(count: u32, sizes: &[u32]) -> BytecodeBuilder {
    let mut b = BytecodeBuilder::new();
    churn_scratch(&mut b, count, sizes);
    b
}
