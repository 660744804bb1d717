// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use dataframe_bytecode::bytecode::{Bytecode, Opcode};
use dataframe_bytecode::program::Program;
use std::collections::HashMap;
use std::string::String;

/// Optional label resolver for profiling scopes.
///
/// Return `None` to fall back to the default opcode-based labels.
pub trait LabelResolver {
    /// Resolve a label for a whole-program run scope.
    fn run_label(&mut self, _program: &Program) -> Option<String> {
        None
    }

    /// Resolve a label for the instruction at `pc`.
    fn instr_label(&mut self, _program: &Program, _pc: u32) -> Option<String> {
        None
    }
}

/// Default resolver that keeps stable opcode-based labels.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver that labels instruction scopes with their full disassembly (operands included).
///
/// Labels are cached per pc together with the instruction they were rendered from, so a sink
/// reused across programs never reports a stale label.
#[derive(Default, Debug)]
pub struct OperandLabelResolver {
    instr_cache: HashMap<u32, (Bytecode, String)>,
}

impl OperandLabelResolver {
    /// Drops all cached labels.
    pub fn clear(&mut self) {
        self.instr_cache.clear();
    }
}

impl LabelResolver for OperandLabelResolver {
    fn instr_label(&mut self, program: &Program, pc: u32) -> Option<String> {
        let instr = program.instructions().get(pc as usize)?;
        if let Some((cached, label)) = self.instr_cache.get(&pc)
            && cached == instr
        {
            return Some(label.clone());
        }
        let label = format!("{pc}: {instr}");
        self.instr_cache.insert(pc, (instr.clone(), label.clone()));
        Some(label)
    }
}

pub(crate) fn default_run_label(program: &Program) -> String {
    format!(
        "run:regs={} instrs={}",
        program.register_count(),
        program.instructions().len()
    )
}

pub(crate) fn default_instr_label(opcode: Opcode) -> String {
    format!("instr:{}", opcode.name())
}
