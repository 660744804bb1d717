// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{
    DefaultLabelResolver, LabelResolver, default_instr_label, default_run_label,
};
use dataframe_bytecode::program::Program;
use dataframe_bytecode::trace::{ScopeKind, TraceMask, TraceSink};
use std::string::String;
use std::vec::Vec;

type BackendGuard = tracy_client::Span;

struct ScopeEntry {
    kind: ScopeKind,
    pc: u32,
    // Keep the label alive for backends that may borrow it.
    label: String,
    guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits Tracy scopes via `tracy-client`.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    mask: TraceMask,
    stack: Vec<ScopeEntry>,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with opcode-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink with a custom label resolver.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            mask: TraceMask::ALL,
            stack: Vec::new(),
        }
    }

    /// Restrict the scopes this sink asks the VM for.
    ///
    /// Per-instruction scopes are cheap in Tracy but not free; use [`TraceMask::RUN`] to profile
    /// long batches.
    #[must_use]
    pub fn with_mask(mut self, mask: TraceMask) -> Self {
        self.mask = mask;
        self
    }

    fn on_scope_enter(&mut self, program: &Program, kind: ScopeKind, pc: u32) {
        let label = self.resolve_label(program, kind, pc);
        let guard = Self::start_scope(kind, &label, pc);
        self.stack.push(ScopeEntry {
            kind,
            pc,
            label,
            guard,
        });
    }

    fn on_scope_exit(&mut self, kind: ScopeKind, pc: u32) {
        if let Some(top) = self.stack.last()
            && top.kind == kind
            && (kind == ScopeKind::Run || top.pc == pc)
        {
            if let Some(entry) = self.stack.pop() {
                let ScopeEntry {
                    label: _label,
                    guard: _guard,
                    ..
                } = entry;
                let _ = (_label, _guard);
            }
            return;
        }
        // If the stack got out of sync (an instruction failed mid-run), drop any active scopes
        // to avoid leaking.
        self.drop_active_scopes();
    }

    fn resolve_label(&mut self, program: &Program, kind: ScopeKind, pc: u32) -> String {
        match kind {
            ScopeKind::Run => self
                .resolver
                .run_label(program)
                .unwrap_or_else(|| default_run_label(program)),
            ScopeKind::Instr { opcode } => self
                .resolver
                .instr_label(program, pc)
                .unwrap_or_else(|| default_instr_label(opcode)),
        }
    }

    fn start_scope(kind: ScopeKind, label: &str, pc: u32) -> Option<BackendGuard> {
        let function_name = match kind {
            ScopeKind::Run => "dataframe_bytecode.run",
            ScopeKind::Instr { .. } => "dataframe_bytecode.instr",
        };
        let client = tracy_client::Client::running()?;
        Some(client.span_alloc(Some(label), function_name, "dataframe_bytecode", pc, 0))
    }

    // Drop in LIFO order so nested spans close inner-to-outer.
    fn drop_active_scopes(&mut self) {
        while let Some(entry) = self.stack.pop() {
            let ScopeEntry {
                label: _label,
                guard: _guard,
                ..
            } = entry;
            let _ = (_label, _guard);
        }
    }
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        self.mask
    }

    fn scope_enter(&mut self, program: &Program, kind: ScopeKind, pc: u32) {
        self.on_scope_enter(program, kind, pc);
    }

    fn scope_exit(&mut self, _program: &Program, kind: ScopeKind, pc: u32) {
        self.on_scope_exit(kind, pc);
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> std::fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("mask", &self.mask)
            .field("stack_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::ProfilingTraceSink;
    use dataframe_bytecode::builder::BytecodeBuilder;
    use dataframe_bytecode::bytecode::Opcode;
    use dataframe_bytecode::trace::{ScopeKind, TraceMask, TraceSink};
    use dataframe_bytecode::vm::{Limits, Registers, Vm};

    #[test]
    fn start_scope_without_tracy_client_does_not_panic() {
        let _guard = ProfilingTraceSink::<super::DefaultLabelResolver>::start_scope(
            ScopeKind::Instr {
                opcode: Opcode::AllocateIndices,
            },
            "test",
            0,
        );
    }

    #[test]
    fn run_leaves_no_open_scopes() {
        let mut b = BytecodeBuilder::new();
        let r = b.allocate_scratch(8);
        b.release_scratch(r);
        let _ = b.allocate_scratch(4);
        let program = b.build().verify().unwrap();

        let mut sink = ProfilingTraceSink::new();
        let mut regs = Registers::new(&program);
        Vm::default()
            .run(&program, &mut regs, Some(&mut sink))
            .unwrap();
        assert!(sink.stack.is_empty());
    }

    #[test]
    fn failed_run_then_successful_run_leaves_no_open_scopes() {
        let mut b = BytecodeBuilder::new();
        let _ = b.allocate_scratch(100);
        let program = b.build().verify().unwrap();
        let mut sink = ProfilingTraceSink::new();

        let mut regs = Registers::new(&program);
        let strict = Vm::new(Limits { max_indices_len: 1 });
        assert!(strict.run(&program, &mut regs, Some(&mut sink)).is_err());
        assert!(sink.stack.is_empty());

        let mut regs = Registers::new(&program);
        Vm::default()
            .run(&program, &mut regs, Some(&mut sink))
            .unwrap();
        assert!(sink.stack.is_empty());
    }

    #[test]
    fn mismatched_exit_drops_active_scopes() {
        let program = BytecodeBuilder::new().build();
        let mut sink = ProfilingTraceSink::new().with_mask(TraceMask::RUN);
        assert_eq!(sink.mask(), TraceMask::RUN);

        sink.scope_enter(&program, ScopeKind::Run, 0);
        sink.scope_enter(
            &program,
            ScopeKind::Instr {
                opcode: Opcode::AllocateIndices,
            },
            0,
        );
        sink.scope_exit(&program, ScopeKind::Run, 1);
        assert!(sink.stack.is_empty());
    }
}
