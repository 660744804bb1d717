// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference interpreter.
//!
//! The VM executes a [`VerifiedProgram`] instruction by instruction against a [`Registers`]
//! table. The program only holds the plan; all runtime storage lives in the table, so the same
//! program can run against many batches (or on many threads) as long as each run gets its own
//! table.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::bytecode::allocate_indices::{DestSlabRegister, DestSpanRegister, Size};
use crate::bytecode::{AllocateIndices, Bytecode, Instruction};
use crate::handle::{HandleBase, RegisterType, RwHandle};
use crate::program::VerifiedProgram;
use crate::slab::{Element, Slab, Span, Value};
use crate::trace::{ScopeKind, TraceMask, TraceSink};

/// Execution limits.
///
/// The default is unbounded: `max_indices_len` is `u32::MAX`, so a single `AllocateIndices`
/// may request a 16 GiB slab. Embedders running untrusted programs should set a bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Largest index buffer a single `AllocateIndices` may materialise.
    pub max_indices_len: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_indices_len: u32::MAX,
        }
    }
}

/// Execution errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecError {
    /// An allocation exceeded [`Limits::max_indices_len`].
    LimitExceeded {
        /// Instruction index.
        pc: u32,
        /// Requested element count.
        requested: u32,
        /// Configured limit.
        limit: u32,
    },
    /// The register table was not created for this program.
    RegisterTableMismatch {
        /// Register count of the program.
        expected: u32,
        /// Register count of the table.
        actual: u32,
    },
    /// A register index was past the end of the table.
    BadRegister {
        /// Offending register index.
        register: u32,
    },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitExceeded {
                pc,
                requested,
                limit,
            } => write!(
                f,
                "index allocation exceeds limit: pc={pc} requested={requested} limit={limit}"
            ),
            Self::RegisterTableMismatch { expected, actual } => write!(
                f,
                "register table size mismatch: expected={expected} actual={actual}"
            ),
            Self::BadRegister { register } => write!(f, "bad register: r{register}"),
        }
    }
}

impl core::error::Error for ExecError {}

/// Contents of one runtime register slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RegValue {
    /// Nothing written yet.
    #[default]
    Empty,
    /// `Slab<u32>`.
    SlabU32(Slab<u32>),
    /// `Slab<i64>`.
    SlabI64(Slab<i64>),
    /// `Slab<f64>`.
    SlabF64(Slab<f64>),
    /// `Span<u32>`.
    SpanU32(Span<u32>),
    /// `Span<i64>`.
    SpanI64(Span<i64>),
    /// `Span<f64>`.
    SpanF64(Span<f64>),
    /// Scalar.
    Value(Value),
}

/// Runtime register table: one slot per register index of a program.
#[derive(Clone, Debug, PartialEq)]
pub struct Registers {
    slots: Vec<RegValue>,
}

impl Registers {
    /// Creates an empty table sized for `program`.
    #[must_use]
    pub fn new(program: &VerifiedProgram) -> Self {
        Self {
            slots: vec![RegValue::Empty; program.program().register_count() as usize],
        }
    }

    /// Returns the number of slots.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the table has no slots.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the raw slot for `reg`.
    #[must_use]
    #[inline]
    pub fn slot(&self, reg: HandleBase) -> Option<&RegValue> {
        self.slots.get(reg.index() as usize)
    }

    /// Returns the value in `reg` if it has been written with a `T`.
    #[must_use]
    pub fn get<T: RegisterType>(&self, reg: RwHandle<T>) -> Option<&T> {
        T::from_reg(self.slots.get(reg.index() as usize)?)
    }

    /// Returns the value in `reg` mutably if it has been written with a `T`.
    #[must_use]
    pub fn get_mut<T: RegisterType>(&mut self, reg: RwHandle<T>) -> Option<&mut T> {
        T::from_reg_mut(self.slots.get_mut(reg.index() as usize)?)
    }

    /// Writes `value` into `reg`, replacing whatever was there.
    pub fn set<T: RegisterType>(&mut self, reg: RwHandle<T>, value: T) -> Result<(), ExecError> {
        let slot = self
            .slots
            .get_mut(reg.index() as usize)
            .ok_or(ExecError::BadRegister {
                register: reg.index(),
            })?;
        *slot = value.into_reg();
        Ok(())
    }

    /// Resolves the span in `reg` against its backing slab.
    #[must_use]
    pub fn view<E: Element>(&self, reg: RwHandle<Span<E>>) -> Option<&[E]> {
        let span = *self.get(reg)?;
        self.get(span.slab())?.view(&span)
    }

    /// Resolves the span in `reg` against its backing slab, mutably.
    #[must_use]
    pub fn view_mut<E: Element>(&mut self, reg: RwHandle<Span<E>>) -> Option<&mut [E]> {
        let span = *self.get(reg)?;
        self.get_mut(span.slab())?.view_mut(&span)
    }
}

/// Bytecode interpreter.
#[derive(Clone, Debug, Default)]
pub struct Vm {
    limits: Limits,
}

impl Vm {
    /// Creates an interpreter with the given limits.
    #[must_use]
    pub const fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Returns the configured limits.
    #[must_use]
    #[inline]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Executes `program` in order against `registers`.
    ///
    /// `registers` must have been created for `program` (see [`Registers::new`]). Register
    /// bindings made by earlier instructions are visible to later ones, and persist in
    /// `registers` after the run.
    pub fn run(
        &self,
        program: &VerifiedProgram,
        registers: &mut Registers,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), ExecError> {
        let p = program.program();
        let expected = p.register_count();
        let actual = u32::try_from(registers.len()).unwrap_or(u32::MAX);
        if expected != actual {
            return Err(ExecError::RegisterTableMismatch { expected, actual });
        }

        let mask = trace.as_ref().map_or(TraceMask::NONE, |t| t.mask());
        let trace_run = mask.contains(TraceMask::RUN);
        let trace_instr = mask.contains(TraceMask::INSTR);

        if trace_run && let Some(t) = trace.as_deref_mut() {
            t.scope_enter(p, ScopeKind::Run, 0);
        }

        let mut pc: u32 = 0;
        for instr in p.instructions() {
            let kind = ScopeKind::Instr {
                opcode: instr.opcode(),
            };
            if trace_instr && let Some(t) = trace.as_deref_mut() {
                t.scope_enter(p, kind, pc);
            }

            let result = match instr {
                Bytecode::AllocateIndices(i) => self.allocate_indices(pc, i, registers),
            };

            if trace_instr && let Some(t) = trace.as_deref_mut() {
                t.scope_exit(p, kind, pc);
            }
            if let Err(e) = result {
                // The run scope closes at the failing pc.
                if trace_run && let Some(t) = trace.as_deref_mut() {
                    t.scope_exit(p, ScopeKind::Run, pc);
                }
                return Err(e);
            }
            pc = pc.saturating_add(1);
        }

        if trace_run && let Some(t) = trace.as_deref_mut() {
            t.scope_exit(p, ScopeKind::Run, pc);
        }
        Ok(())
    }

    fn allocate_indices(
        &self,
        pc: u32,
        instr: &AllocateIndices,
        registers: &mut Registers,
    ) -> Result<(), ExecError> {
        let size = instr.arg::<Size>();
        let slab = instr.arg::<DestSlabRegister>();
        let span = instr.arg::<DestSpanRegister>();

        if size > self.limits.max_indices_len {
            return Err(ExecError::LimitExceeded {
                pc,
                requested: size,
                limit: self.limits.max_indices_len,
            });
        }

        // A slab left behind by an earlier binding of the same scratch registers is reused when
        // it is large enough.
        let reusable = registers
            .get(slab)
            .is_some_and(|s| s.len() >= size as usize);
        if !reusable {
            registers.set(slab, Slab::alloc(size))?;
        }
        registers.set(span, Span::new(slab, 0, size))
    }
}
