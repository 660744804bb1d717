// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use dataframe_bytecode::builder::BytecodeBuilder;
use dataframe_bytecode::bytecode::Opcode;
use dataframe_bytecode::program::Program;
use dataframe_bytecode::register_cache::{RegisterCache, identity_of};
use dataframe_bytecode::slab::{Slab, Span};
use dataframe_bytecode::trace::{ScopeKind, TraceMask, TraceSink};
use dataframe_bytecode::vm::{ExecError, Limits, Registers, Vm};
use dataframe_bytecode_conformance::{RunError, run, run_with};

#[test]
fn scratch_span_covers_requested_size() {
    let mut b = BytecodeBuilder::new();
    let regs = b.allocate_scratch(6);
    let (_, registers) = run(b).unwrap();

    let span = registers.get(regs.span).unwrap();
    assert_eq!((span.slab(), span.offset(), span.len()), (regs.slab, 0, 6));
    assert_eq!(registers.view(regs.span).unwrap().len(), 6);
    assert_eq!(registers.get(regs.slab).unwrap().len(), 6);
}

#[test]
fn reused_scratch_keeps_larger_slab() {
    let mut b = BytecodeBuilder::new();
    let big = b.allocate_scratch(32);
    b.release_scratch(big);
    let small = b.allocate_scratch(4);
    assert_eq!(small, big);

    let (_, registers) = run(b).unwrap();
    assert_eq!(registers.get(small.slab).unwrap().len(), 32);
    assert_eq!(registers.get(small.span).unwrap().len(), 4);
}

#[test]
fn growing_scratch_replaces_slab() {
    let mut b = BytecodeBuilder::new();
    let regs = b.get_or_create_scratch_registers(2);
    // Emitting a larger allocation through the same registers grows the slab at runtime.
    let _ = b.push_opcode(dataframe_bytecode::AllocateIndices::new(2, regs.slab, regs.span));
    let _ = b.push_opcode(dataframe_bytecode::AllocateIndices::new(9, regs.slab, regs.span));

    let (_, registers) = run(b).unwrap();
    assert_eq!(registers.get(regs.slab).unwrap().len(), 9);
    assert_eq!(registers.view(regs.span).unwrap().len(), 9);
}

#[test]
fn writes_through_span_land_in_slab() {
    let mut b = BytecodeBuilder::new();
    let regs = b.allocate_scratch(3);
    let (_, mut registers) = run(b).unwrap();

    registers
        .view_mut(regs.span)
        .unwrap()
        .copy_from_slice(&[7, 8, 9]);
    assert_eq!(registers.get(regs.slab).unwrap().as_slice(), &[7, 8, 9]);
}

#[test]
fn limit_is_enforced() {
    let mut b = BytecodeBuilder::new();
    let _ = b.allocate_scratch(4);
    let _ = b.allocate_scratch(100);

    let err = run_with(b, Limits { max_indices_len: 64 }, None).err();
    assert_eq!(
        err,
        Some(RunError::Exec(ExecError::LimitExceeded {
            pc: 1,
            requested: 100,
            limit: 64,
        }))
    );
}

#[test]
fn registers_from_another_program_are_rejected() {
    let mut small = BytecodeBuilder::new();
    let _ = small.allocate_scratch(1);
    let small = small.build().verify().unwrap();

    let mut large = BytecodeBuilder::new();
    let _ = large.allocate_scratch(1);
    let _ = large.allocate_scratch(1);
    let large = large.build().verify().unwrap();

    let mut registers = Registers::new(&small);
    assert_eq!(
        Vm::default().run(&large, &mut registers, None),
        Err(ExecError::RegisterTableMismatch {
            expected: 4,
            actual: 2,
        })
    );
}

#[test]
fn program_runs_repeatedly_with_fresh_tables() {
    let mut b = BytecodeBuilder::new();
    let regs = b.allocate_scratch(5);
    let program = b.build().verify().unwrap();
    let vm = Vm::default();

    for _ in 0..3 {
        let mut registers = Registers::new(&program);
        vm.run(&program, &mut registers, None).unwrap();
        assert_eq!(registers.get(regs.span).unwrap().len(), 5);
    }
}

#[test]
fn cached_column_registers_coexist_with_scratch() {
    let column = [3_u32, 1, 2];
    let mut b = BytecodeBuilder::new();
    let mut cache = RegisterCache::new();

    let col = cache.get_or_allocate::<Slab<u32>>(&mut b, 0, identity_of(&column));
    let view = cache.get_or_allocate::<Span<u32>>(&mut b, 1, identity_of(&column));
    let regs = b.allocate_scratch(3);
    assert_ne!(regs.slab, col.reg);
    assert_eq!(
        cache
            .get_or_allocate::<Slab<u32>>(&mut b, 0, identity_of(&column))
            .reg,
        col.reg
    );

    let program = b.build().verify().unwrap();
    let mut registers = Registers::new(&program);
    registers
        .set(col.reg, Slab::from(column.to_vec()))
        .unwrap();
    registers
        .set(view.reg, Span::new(col.reg, 1, 2))
        .unwrap();
    Vm::default().run(&program, &mut registers, None).unwrap();

    assert_eq!(registers.view(view.reg).unwrap(), &[1, 2]);
    assert_eq!(registers.view(regs.span).unwrap().len(), 3);
}

#[derive(Default)]
struct CountingSink {
    runs: u32,
    instrs: Vec<(u32, Opcode)>,
    open: i32,
}

impl TraceSink for CountingSink {
    fn mask(&self) -> TraceMask {
        TraceMask::ALL
    }

    fn scope_enter(&mut self, _program: &Program, kind: ScopeKind, pc: u32) {
        self.open += 1;
        match kind {
            ScopeKind::Run => self.runs += 1,
            ScopeKind::Instr { opcode } => self.instrs.push((pc, opcode)),
        }
    }

    fn scope_exit(&mut self, _program: &Program, _kind: ScopeKind, _pc: u32) {
        self.open -= 1;
    }
}

#[test]
fn trace_sees_every_instruction() {
    let mut b = BytecodeBuilder::new();
    b.with_scratch(2, |b, _| {
        let _ = b.allocate_scratch(2);
    });

    let mut sink = CountingSink::default();
    run_with(b, Limits::default(), Some(&mut sink)).unwrap();
    assert_eq!(sink.runs, 1);
    assert_eq!(
        sink.instrs,
        [(0, Opcode::AllocateIndices), (1, Opcode::AllocateIndices)]
    );
    assert_eq!(sink.open, 0);
}
