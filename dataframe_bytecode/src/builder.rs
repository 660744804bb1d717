// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Low-level bytecode builder.
//!
//! [`BytecodeBuilder`] owns everything needed to produce one [`Program`]:
//!
//! - register allocation: a dense, gapless, monotonically increasing index space;
//! - scratch register management: temporary `u32` index buffers are handed out best-fit from a
//!   pool of `(Slab<u32>, Span<u32>)` register pairs, so sequential temporaries share registers
//!   instead of growing the register table;
//! - opcode emission: an append-only instruction list.
//!
//! Query compilers sit on top of this type and add their own domain logic.
//!
//! ## Failure model
//!
//! Builder inputs are values the builder minted itself, so misuse (for example marking an
//! unknown scratch pair in use) is a bug in the calling compiler and panics. The one tolerant
//! operation is [`BytecodeBuilder::release_scratch`], which ignores unknown pairs so cleanup
//! paths can release unconditionally.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::bytecode::{AllocateIndices, ArgField, Bytecode, Instruction, Opcode};
use crate::handle::{RegKind, RegisterType, RwHandle};
use crate::program::Program;
use crate::slab::{Slab, Span};

/// Index of an instruction in the builder's instruction list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrIndex(u32);

impl InstrIndex {
    /// Returns the instruction position (its pc in the finished program).
    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Index of an instruction known to be a `T`.
///
/// Returned by [`BytecodeBuilder::add_opcode`]. Unlike a reference into the instruction list it
/// stays valid across later appends.
pub struct InstrId<T> {
    index: InstrIndex,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for InstrId<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InstrId<T> {}

impl<T> PartialEq for InstrId<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for InstrId<T> {}

impl<T> fmt::Debug for InstrId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstrId").field(&self.index.0).finish()
    }
}

impl<T> InstrId<T> {
    /// Returns the untyped instruction index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> InstrIndex {
        self.index
    }
}

/// Registers backing one scratch index buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScratchRegisters {
    /// Register holding the backing `Slab<u32>`.
    pub slab: RwHandle<Slab<u32>>,
    /// Register holding the active `Span<u32>` view over `slab`.
    pub span: RwHandle<Span<u32>>,
}

/// One tracked scratch slot.
///
/// Slots are never removed while building; releasing a slot only clears `in_use` so a later
/// request can reuse its registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct ScratchIndices {
    size: u32,
    slab: RwHandle<Slab<u32>>,
    span: RwHandle<Span<u32>>,
    in_use: bool,
}

/// Builder for a single bytecode [`Program`].
#[derive(Clone, Debug, Default)]
pub struct BytecodeBuilder {
    instructions: Vec<Bytecode>,
    register_kinds: Vec<RegKind>,
    scratch_slots: Vec<ScratchIndices>,
}

impl BytecodeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Register allocation.

    /// Allocates a new register holding a `T`.
    ///
    /// Indices are handed out as `0, 1, 2, ...` in call order, independent of `T`.
    pub fn allocate_register<T: RegisterType>(&mut self) -> RwHandle<T> {
        let index = u32::try_from(self.register_kinds.len())
            .unwrap_or_else(|_| panic!("register index space exhausted"));
        self.register_kinds.push(T::KIND);
        RwHandle::new(index)
    }

    /// Returns the number of registers allocated so far.
    #[must_use]
    #[inline]
    pub fn register_count(&self) -> u32 {
        // `allocate_register` never lets the table grow past `u32::MAX` entries.
        u32::try_from(self.register_kinds.len()).unwrap_or(u32::MAX)
    }

    // Scratch register management.

    /// Returns registers for a scratch buffer of `size` indices without emitting anything.
    ///
    /// Picks the smallest free slot whose size is at least `size` (first one wins on ties). If
    /// no slot fits, allocates a new `(Slab<u32>, Span<u32>)` register pair and tracks it as a
    /// free slot of exactly `size`. The slot is *not* marked in use; callers that emit their
    /// own `AllocateIndices` must follow up with [`mark_scratch_in_use`](Self::mark_scratch_in_use).
    pub fn get_or_create_scratch_registers(&mut self, size: u32) -> ScratchRegisters {
        if let Some(best) = self.find_best_fit_slot(size) {
            let slot = &self.scratch_slots[best];
            assert!(!slot.in_use, "best-fit scratch slot {best} is already in use");
            return ScratchRegisters {
                slab: slot.slab,
                span: slot.span,
            };
        }
        let slab = self.allocate_register::<Slab<u32>>();
        let span = self.allocate_register::<Span<u32>>();
        self.scratch_slots.push(ScratchIndices {
            size,
            slab,
            span,
            in_use: false,
        });
        ScratchRegisters { slab, span }
    }

    /// Reserves scratch registers for `size` indices, emits `AllocateIndices` for them and marks
    /// them in use.
    ///
    /// This is the normal entry point for temporaries; pair it with
    /// [`release_scratch`](Self::release_scratch) once the buffer is dead.
    pub fn allocate_scratch(&mut self, size: u32) -> ScratchRegisters {
        let regs = self.get_or_create_scratch_registers(size);
        self.push_opcode(AllocateIndices::new(size, regs.slab, regs.span));

        let Some(slot) = self.find_slot_by_registers(regs) else {
            panic!("scratch slot for {} vanished during allocation", regs.slab);
        };
        self.scratch_slots[slot].in_use = true;
        regs
    }

    /// Marks `regs` in use without emitting anything.
    ///
    /// # Panics
    ///
    /// Panics if `regs` were not handed out by this builder's scratch pool.
    pub fn mark_scratch_in_use(&mut self, regs: ScratchRegisters) {
        let Some(slot) = self.find_slot_by_registers(regs) else {
            panic!("{} is not a scratch register of this builder", regs.slab);
        };
        self.scratch_slots[slot].in_use = true;
    }

    /// Returns `regs` to the pool so later requests can reuse them.
    ///
    /// Unknown registers and repeated releases are ignored.
    pub fn release_scratch(&mut self, regs: ScratchRegisters) {
        if let Some(slot) = self.find_slot_by_registers(regs) {
            self.scratch_slots[slot].in_use = false;
        }
    }

    /// Returns `true` if `regs` are a scratch pair of this builder and currently in use.
    #[must_use]
    pub fn is_scratch_in_use(&self, regs: ScratchRegisters) -> bool {
        self.find_slot_by_registers(regs)
            .is_some_and(|slot| self.scratch_slots[slot].in_use)
    }

    /// Allocates scratch for `size` indices, runs `f`, then releases the scratch.
    ///
    /// The registers stay valid in the emitted program after release; only their reuse by later
    /// requests becomes possible.
    pub fn with_scratch<R>(
        &mut self,
        size: u32,
        f: impl FnOnce(&mut Self, ScratchRegisters) -> R,
    ) -> R {
        let regs = self.allocate_scratch(size);
        let out = f(self, regs);
        self.release_scratch(regs);
        out
    }

    /// Returns the number of tracked scratch slots (in use or free).
    #[must_use]
    #[inline]
    pub fn scratch_slot_count(&self) -> usize {
        self.scratch_slots.len()
    }

    fn find_best_fit_slot(&self, size: u32) -> Option<usize> {
        // Linear scan: the pool holds one slot per distinct concurrently-needed size, which is
        // tiny in practice.
        let mut best: Option<usize> = None;
        let mut best_size = u32::MAX;
        for (i, slot) in self.scratch_slots.iter().enumerate() {
            if !slot.in_use && slot.size >= size && (best.is_none() || slot.size < best_size) {
                best = Some(i);
                best_size = slot.size;
            }
        }
        best
    }

    fn find_slot_by_registers(&self, regs: ScratchRegisters) -> Option<usize> {
        self.scratch_slots
            .iter()
            .position(|slot| slot.slab == regs.slab)
    }

    // Opcode emission.

    /// Appends a default-initialised `T` and returns its id.
    ///
    /// Fill the arguments afterwards through [`set_arg`](Self::set_arg) or
    /// [`instr_mut`](Self::instr_mut).
    pub fn add_opcode<T: Instruction>(&mut self) -> InstrId<T> {
        InstrId {
            index: self.add_raw_opcode(T::OPCODE),
            _marker: PhantomData,
        }
    }

    /// Appends a fully-specified instruction and returns its id.
    pub fn push_opcode<T: Instruction>(&mut self, instr: T) -> InstrId<T> {
        let id = self.add_opcode::<T>();
        *self.instr_mut(id) = instr;
        id
    }

    /// Appends an instruction for `opcode` with default-initialised arguments.
    pub fn add_raw_opcode(&mut self, opcode: Opcode) -> InstrIndex {
        let index = u32::try_from(self.instructions.len())
            .unwrap_or_else(|_| panic!("instruction index space exhausted"));
        self.instructions.push(Bytecode::with_default_args(opcode));
        InstrIndex(index)
    }

    /// Returns the instruction `id` refers to.
    ///
    /// # Panics
    ///
    /// Panics if `id` is past the end of this builder's instruction list (for example, an id
    /// minted by a longer-lived builder) or names an instruction of another type.
    #[must_use]
    pub fn instr<T: Instruction>(&self, id: InstrId<T>) -> &T {
        let Some(instr) = self.slot(id.index).as_instr::<T>() else {
            panic!("instruction {} is not a {}", id.index.0, T::OPCODE);
        };
        instr
    }

    /// Returns the instruction `id` refers to, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` is past the end of this builder's instruction list (for example, an id
    /// minted by a longer-lived builder) or names an instruction of another type.
    pub fn instr_mut<T: Instruction>(&mut self, id: InstrId<T>) -> &mut T {
        let Some(instr) = self.bytecode_mut(id.index).as_instr_mut::<T>() else {
            panic!("instruction {} is not a {}", id.index.0, T::OPCODE);
        };
        instr
    }

    /// Writes argument `F` of the instruction `id` refers to.
    pub fn set_arg<T: Instruction, F: ArgField<T>>(&mut self, id: InstrId<T>, value: F::Value) {
        self.instr_mut(id).set_arg::<F>(value);
    }

    /// Returns the instructions emitted so far, in emission order.
    #[must_use]
    #[inline]
    pub fn bytecode(&self) -> &[Bytecode] {
        &self.instructions
    }

    /// Returns the instruction at `index` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the instruction list.
    #[must_use]
    pub fn bytecode_mut(&mut self, index: InstrIndex) -> &mut Bytecode {
        let len = self.instructions.len();
        let Some(bc) = self.instructions.get_mut(index.0 as usize) else {
            panic!("instruction {} out of range ({len} emitted)", index.0);
        };
        bc
    }

    fn slot(&self, index: InstrIndex) -> &Bytecode {
        let Some(bc) = self.instructions.get(index.0 as usize) else {
            panic!(
                "instruction {} out of range ({} emitted)",
                index.0,
                self.instructions.len()
            );
        };
        bc
    }

    /// Finishes compilation and returns the program.
    #[must_use]
    pub fn build(self) -> Program {
        Program::new(self.register_kinds, self.instructions)
    }
}
