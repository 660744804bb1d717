// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instruction representation.
//!
//! Each opcode has its own argument struct (e.g. [`AllocateIndices`]) and [`Bytecode`] is the
//! tagged union over them. Arguments are read and written through per-instruction field tags
//! ([`ArgField`]) rather than by position, e.g. `instr.arg::<allocate_indices::Size>()`. The
//! set of fields of an instruction is closed: a tag for one instruction does not type-check
//! against another.

use alloc::vec::Vec;
use core::fmt;

use crate::handle::{HandleBase, RegKind, RegisterType, RwHandle};
use crate::slab::{Slab, Span};

/// Instruction opcodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Materialise a `Slab<u32>` of a given size and bind a full-length span over it.
    AllocateIndices = 0,
}

impl Opcode {
    /// All opcodes, in discriminant order.
    pub const ALL: &'static [Self] = &[Self::AllocateIndices];

    /// Returns the opcode's mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AllocateIndices => "AllocateIndices",
        }
    }

    /// Returns the numeric opcode value.
    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decodes a numeric opcode value.
    #[must_use]
    pub const fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::AllocateIndices),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed argument field of instruction `I`.
///
/// Implemented by zero-sized tag types living in a per-instruction module.
pub trait ArgField<I> {
    /// Field value type.
    type Value: Copy;
    /// Field name as printed by the disassembler.
    const NAME: &'static str;

    /// Reads the field.
    fn get(instr: &I) -> Self::Value;

    /// Writes the field.
    fn set(instr: &mut I, value: Self::Value);
}

/// An instruction argument struct.
pub trait Instruction: Default + Into<Bytecode> + 'static {
    /// Opcode of this instruction.
    const OPCODE: Opcode;

    /// Borrows `Self` out of `bytecode` if it has this instruction's opcode.
    fn downcast(bytecode: &Bytecode) -> Option<&Self>;

    /// Mutably borrows `Self` out of `bytecode` if it has this instruction's opcode.
    fn downcast_mut(bytecode: &mut Bytecode) -> Option<&mut Self>;

    /// Reads argument `F`.
    #[inline]
    fn arg<F: ArgField<Self>>(&self) -> F::Value {
        F::get(self)
    }

    /// Writes argument `F`.
    #[inline]
    fn set_arg<F: ArgField<Self>>(&mut self, value: F::Value) {
        F::set(self, value);
    }
}

/// A register operand of an instruction, with the kind the instruction expects it to hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operand {
    /// Field name.
    pub name: &'static str,
    /// Referenced register.
    pub reg: HandleBase,
    /// Register kind the instruction requires.
    pub kind: RegKind,
}

impl Operand {
    fn of<T: RegisterType>(name: &'static str, reg: RwHandle<T>) -> Self {
        Self {
            name,
            reg: reg.erase(),
            kind: T::KIND,
        }
    }
}

/// Allocates a `u32` index buffer.
///
/// The interpreter materialises a `Slab<u32>` of `size` elements in `dest_slab_register` (or
/// reuses the slab already there if it is large enough) and binds `dest_span_register` to a
/// `size`-element view over it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocateIndices {
    size: u32,
    dest_slab_register: RwHandle<Slab<u32>>,
    dest_span_register: RwHandle<Span<u32>>,
}

impl AllocateIndices {
    /// Creates a fully-specified instruction.
    #[must_use]
    pub const fn new(
        size: u32,
        dest_slab_register: RwHandle<Slab<u32>>,
        dest_span_register: RwHandle<Span<u32>>,
    ) -> Self {
        Self {
            size,
            dest_slab_register,
            dest_span_register,
        }
    }
}

/// Field tags for [`AllocateIndices`].
pub mod allocate_indices {
    use super::{AllocateIndices, ArgField};
    use crate::handle::RwHandle;
    use crate::slab::{Slab, Span};

    /// Number of indices to allocate.
    #[derive(Copy, Clone, Debug)]
    pub struct Size;

    /// Register receiving the slab.
    #[derive(Copy, Clone, Debug)]
    pub struct DestSlabRegister;

    /// Register receiving the span over the slab.
    #[derive(Copy, Clone, Debug)]
    pub struct DestSpanRegister;

    impl ArgField<AllocateIndices> for Size {
        type Value = u32;
        const NAME: &'static str = "size";

        fn get(instr: &AllocateIndices) -> u32 {
            instr.size
        }

        fn set(instr: &mut AllocateIndices, value: u32) {
            instr.size = value;
        }
    }

    impl ArgField<AllocateIndices> for DestSlabRegister {
        type Value = RwHandle<Slab<u32>>;
        const NAME: &'static str = "dest_slab_register";

        fn get(instr: &AllocateIndices) -> Self::Value {
            instr.dest_slab_register
        }

        fn set(instr: &mut AllocateIndices, value: Self::Value) {
            instr.dest_slab_register = value;
        }
    }

    impl ArgField<AllocateIndices> for DestSpanRegister {
        type Value = RwHandle<Span<u32>>;
        const NAME: &'static str = "dest_span_register";

        fn get(instr: &AllocateIndices) -> Self::Value {
            instr.dest_span_register
        }

        fn set(instr: &mut AllocateIndices, value: Self::Value) {
            instr.dest_span_register = value;
        }
    }
}

impl Instruction for AllocateIndices {
    const OPCODE: Opcode = Opcode::AllocateIndices;

    fn downcast(bytecode: &Bytecode) -> Option<&Self> {
        match bytecode {
            Bytecode::AllocateIndices(i) => Some(i),
        }
    }

    fn downcast_mut(bytecode: &mut Bytecode) -> Option<&mut Self> {
        match bytecode {
            Bytecode::AllocateIndices(i) => Some(i),
        }
    }
}

impl From<AllocateIndices> for Bytecode {
    fn from(i: AllocateIndices) -> Self {
        Self::AllocateIndices(i)
    }
}

/// A single instruction: opcode tag plus its typed argument block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Bytecode {
    /// See [`AllocateIndices`].
    AllocateIndices(AllocateIndices),
}

impl Bytecode {
    /// Creates an instruction for `opcode` with default-initialised arguments.
    #[must_use]
    pub fn with_default_args(opcode: Opcode) -> Self {
        match opcode {
            Opcode::AllocateIndices => Self::AllocateIndices(AllocateIndices::default()),
        }
    }

    /// Returns the opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::AllocateIndices(_) => Opcode::AllocateIndices,
        }
    }

    /// Returns `Some` if this instruction is a `T`.
    #[must_use]
    #[inline]
    pub fn as_instr<T: Instruction>(&self) -> Option<&T> {
        T::downcast(self)
    }

    /// Returns `Some` if this instruction is a `T`.
    #[must_use]
    #[inline]
    pub fn as_instr_mut<T: Instruction>(&mut self) -> Option<&mut T> {
        T::downcast_mut(self)
    }

    /// Returns the register operands in field order.
    #[must_use]
    pub fn operands(&self) -> Vec<Operand> {
        use allocate_indices::{DestSlabRegister, DestSpanRegister};

        let mut out = Vec::new();
        match self {
            Self::AllocateIndices(i) => {
                out.push(Operand::of(
                    DestSlabRegister::NAME,
                    i.arg::<DestSlabRegister>(),
                ));
                out.push(Operand::of(
                    DestSpanRegister::NAME,
                    i.arg::<DestSpanRegister>(),
                ));
            }
        }
        out
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use allocate_indices::{DestSlabRegister, DestSpanRegister, Size};

        write!(f, "{}", self.opcode())?;
        match self {
            Self::AllocateIndices(i) => write!(
                f,
                " {}={} {}={} {}={}",
                Size::NAME,
                i.arg::<Size>(),
                DestSlabRegister::NAME,
                i.arg::<DestSlabRegister>(),
                DestSpanRegister::NAME,
                i.arg::<DestSpanRegister>(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::allocate_indices::{DestSlabRegister, DestSpanRegister, Size};
    use super::*;
    use crate::handle::ElemType;

    #[test]
    fn opcode_roundtrips_through_u32() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::from_u32(op.as_u32()), Some(op));
        }
        assert_eq!(Opcode::from_u32(u32::MAX), None);
    }

    #[test]
    fn fields_are_accessed_by_tag() {
        let mut i = AllocateIndices::default();
        i.set_arg::<Size>(42);
        i.set_arg::<DestSlabRegister>(RwHandle::new(3));
        i.set_arg::<DestSpanRegister>(RwHandle::new(4));

        assert_eq!(i.arg::<Size>(), 42);
        assert_eq!(i.arg::<DestSlabRegister>().index(), 3);
        assert_eq!(i.arg::<DestSpanRegister>().index(), 4);
        assert_eq!(i, AllocateIndices::new(42, RwHandle::new(3), RwHandle::new(4)));
    }

    #[test]
    fn default_args_match_opcode() {
        for &op in Opcode::ALL {
            assert_eq!(Bytecode::with_default_args(op).opcode(), op);
        }
    }

    #[test]
    fn downcast_through_bytecode() {
        let mut bc: Bytecode = AllocateIndices::new(1, RwHandle::new(0), RwHandle::new(1)).into();
        bc.as_instr_mut::<AllocateIndices>()
            .unwrap()
            .set_arg::<Size>(8);
        assert_eq!(bc.as_instr::<AllocateIndices>().unwrap().arg::<Size>(), 8);
    }

    #[test]
    fn operands_carry_expected_kinds() {
        let bc: Bytecode = AllocateIndices::new(5, RwHandle::new(2), RwHandle::new(3)).into();
        let ops = bc.operands();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].reg.index(), 2);
        assert_eq!(ops[0].kind, RegKind::Slab(ElemType::U32));
        assert_eq!(ops[1].name, "dest_span_register");
        assert_eq!(ops[1].kind, RegKind::Span(ElemType::U32));
    }

    #[test]
    fn display_lists_named_fields() {
        let bc: Bytecode = AllocateIndices::new(16, RwHandle::new(0), RwHandle::new(1)).into();
        assert_eq!(
            std::format!("{bc}"),
            "AllocateIndices size=16 dest_slab_register=r0 dest_span_register=r1"
        );
    }
}
