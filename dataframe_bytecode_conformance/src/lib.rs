// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the `dataframe_bytecode` conformance tests.
//!
//! The tests themselves live under `tests/`; this crate only provides the glue for driving a
//! builder through verification and execution in one step.

use core::fmt;

use dataframe_bytecode::builder::BytecodeBuilder;
use dataframe_bytecode::bytecode::{AllocateIndices, Instruction};
use dataframe_bytecode::bytecode::allocate_indices::Size;
use dataframe_bytecode::program::{VerifiedProgram, VerifyError};
use dataframe_bytecode::trace::TraceSink;
use dataframe_bytecode::vm::{ExecError, Limits, Registers, Vm};

/// Failure while verifying or running a built program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// The program failed verification.
    Verify(VerifyError),
    /// The program failed during execution.
    Exec(ExecError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify(e) => write!(f, "verify: {e}"),
            Self::Exec(e) => write!(f, "exec: {e}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<VerifyError> for RunError {
    fn from(e: VerifyError) -> Self {
        Self::Verify(e)
    }
}

impl From<ExecError> for RunError {
    fn from(e: ExecError) -> Self {
        Self::Exec(e)
    }
}

/// Builds, verifies and runs `builder` with default limits.
pub fn run(builder: BytecodeBuilder) -> Result<(VerifiedProgram, Registers), RunError> {
    run_with(builder, Limits::default(), None)
}

/// Builds, verifies and runs `builder` with explicit limits and an optional trace sink.
pub fn run_with(
    builder: BytecodeBuilder,
    limits: Limits,
    trace: Option<&mut dyn TraceSink>,
) -> Result<(VerifiedProgram, Registers), RunError> {
    let program = builder.build().verify()?;
    let mut registers = Registers::new(&program);
    Vm::new(limits).run(&program, &mut registers, trace)?;
    Ok((program, registers))
}

/// Returns the `size` argument of every `AllocateIndices` emitted so far, in order.
#[must_use]
pub fn allocation_sizes(builder: &BytecodeBuilder) -> Vec<u32> {
    builder
        .bytecode()
        .iter()
        .filter_map(|bc| bc.as_instr::<AllocateIndices>())
        .map(|i| i.arg::<Size>())
        .collect()
}
