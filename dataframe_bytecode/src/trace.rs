// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execution tracing hooks.
//!
//! The interpreter reports scope enter/exit events to an optional [`TraceSink`]. Sinks declare
//! which events they want through [`TraceSink::mask`]; the VM skips the callbacks for anything
//! outside the mask. Adapters that need heavier dependencies (profilers) live in separate
//! crates.

use core::ops::BitOr;

use crate::bytecode::Opcode;
use crate::program::Program;

/// Bitmask selecting which trace events a sink receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceMask(u8);

impl TraceMask {
    /// No events.
    pub const NONE: Self = Self(0);
    /// One scope around each [`Vm::run`](crate::vm::Vm::run).
    pub const RUN: Self = Self(1 << 0);
    /// One scope around each executed instruction.
    pub const INSTR: Self = Self(1 << 1);
    /// All events.
    pub const ALL: Self = Self(Self::RUN.0 | Self::INSTR.0);

    /// Returns `true` if this mask contains every bit in `other`.
    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for TraceMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Kind of a traced scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// A whole program execution.
    Run,
    /// A single instruction.
    Instr {
        /// Opcode being executed.
        opcode: Opcode,
    },
}

/// Receiver for interpreter trace events.
///
/// `pc` is the index of the current instruction; for [`ScopeKind::Run`] it is `0` on enter and
/// the instruction count on exit (or the failing instruction's index if the run errors).
///
/// Every `scope_enter` is matched by a `scope_exit`, in LIFO order, even when an instruction
/// fails.
pub trait TraceSink {
    /// Events this sink wants.
    fn mask(&self) -> TraceMask;

    /// Called when a scope starts.
    fn scope_enter(&mut self, program: &Program, kind: ScopeKind, pc: u32);

    /// Called when a scope ends, whether or not its body succeeded.
    fn scope_exit(&mut self, program: &Program, kind: ScopeKind, pc: u32);
}
