// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Finished programs and their verification.
//!
//! A [`Program`] is the immutable output of a [`BytecodeBuilder`](crate::builder::BytecodeBuilder):
//! the register table (one [`RegKind`] per register index) plus the ordered instruction list.
//! The interpreter only accepts a [`VerifiedProgram`], which guarantees that every register an
//! instruction references exists and holds the kind that instruction expects.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Write as _;

use crate::bytecode::Bytecode;
use crate::handle::{HandleBase, RegKind};

/// A compiled program: register table plus instruction list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    register_kinds: Vec<RegKind>,
    instructions: Vec<Bytecode>,
}

impl Program {
    pub(crate) fn new(register_kinds: Vec<RegKind>, instructions: Vec<Bytecode>) -> Self {
        Self {
            register_kinds,
            instructions,
        }
    }

    /// Returns the number of registers the interpreter must provide.
    #[must_use]
    #[inline]
    pub fn register_count(&self) -> u32 {
        u32::try_from(self.register_kinds.len()).unwrap_or(u32::MAX)
    }

    /// Returns the kind allocated for `reg`, or `None` if it is out of range.
    #[must_use]
    #[inline]
    pub fn register_kind(&self, reg: HandleBase) -> Option<RegKind> {
        self.register_kinds.get(reg.index() as usize).copied()
    }

    /// Returns the register table in index order.
    #[must_use]
    #[inline]
    pub fn register_kinds(&self) -> &[RegKind] {
        &self.register_kinds
    }

    /// Returns the instructions in execution order.
    #[must_use]
    #[inline]
    pub fn instructions(&self) -> &[Bytecode] {
        &self.instructions
    }

    /// Renders the program as text: the register table followed by one line per instruction.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` cannot fail.
        let _ = self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "registers: {}", self.register_kinds.len())?;
        for (i, kind) in self.register_kinds.iter().enumerate() {
            writeln!(out, "  r{i}: {kind}")?;
        }
        writeln!(out, "instructions: {}", self.instructions.len())?;
        for (pc, instr) in self.instructions.iter().enumerate() {
            writeln!(out, "  {pc:>4}: {instr}")?;
        }
        Ok(())
    }

    /// Checks register references and returns a [`VerifiedProgram`].
    pub fn verify(self) -> Result<VerifiedProgram, VerifyError> {
        let register_count = self.register_count();
        for (pc, instr) in self.instructions.iter().enumerate() {
            let pc = u32::try_from(pc).unwrap_or(u32::MAX);
            for op in instr.operands() {
                let Some(actual) = self.register_kind(op.reg) else {
                    return Err(VerifyError::RegisterOutOfBounds {
                        pc,
                        register: op.reg.index(),
                        register_count,
                    });
                };
                if actual != op.kind {
                    return Err(VerifyError::RegisterKindMismatch {
                        pc,
                        register: op.reg.index(),
                        expected: op.kind,
                        actual,
                    });
                }
            }
        }
        Ok(VerifiedProgram { program: self })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

/// Program verification failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// An instruction referenced a register index past the end of the register table.
    RegisterOutOfBounds {
        /// Instruction index.
        pc: u32,
        /// Offending register index.
        register: u32,
        /// Size of the register table.
        register_count: u32,
    },
    /// An instruction referenced a register allocated with a different kind.
    RegisterKindMismatch {
        /// Instruction index.
        pc: u32,
        /// Offending register index.
        register: u32,
        /// Kind the instruction requires.
        expected: RegKind,
        /// Kind the register was allocated with.
        actual: RegKind,
    },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterOutOfBounds {
                pc,
                register,
                register_count,
            } => write!(
                f,
                "register out of bounds: pc={pc} reg=r{register} register_count={register_count}"
            ),
            Self::RegisterKindMismatch {
                pc,
                register,
                expected,
                actual,
            } => write!(
                f,
                "register kind mismatch: pc={pc} reg=r{register} expected={expected} actual={actual}"
            ),
        }
    }
}

impl core::error::Error for VerifyError {}

/// A [`Program`] whose register references have been checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedProgram {
    program: Program,
}

impl VerifiedProgram {
    /// Returns the underlying program.
    #[must_use]
    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Consumes the wrapper and returns the underlying program.
    #[must_use]
    #[inline]
    pub fn into_program(self) -> Program {
        self.program
    }
}
