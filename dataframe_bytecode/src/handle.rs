// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed register handles.
//!
//! A program uses a single dense register index space (`r0..rN`). Each index is minted exactly
//! once by [`BytecodeBuilder::allocate_register`](crate::builder::BytecodeBuilder::allocate_register)
//! together with the payload type it holds, so a [`RwHandle<T>`] is "register `N`, statically
//! known to hold a `T`". Handles cannot be constructed outside this crate.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use crate::vm::RegValue;

/// Element type of a [`Slab`](crate::slab::Slab) or [`Span`](crate::slab::Span) register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElemType {
    /// `u32` elements (row indices).
    U32,
    /// `i64` elements.
    I64,
    /// `f64` elements.
    F64,
}

impl ElemType {
    /// Returns a short lowercase name (`"u32"`, `"i64"`, `"f64"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::F64 => "f64",
        }
    }
}

/// The kind of payload a register holds.
///
/// The program keeps one `RegKind` per register so the verifier can check operands and the
/// interpreter can size its runtime table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegKind {
    /// Owned arena of elements.
    Slab(ElemType),
    /// View into a slab.
    Span(ElemType),
    /// Scalar value.
    Value,
}

impl fmt::Display for RegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slab(e) => write!(f, "Slab<{}>", e.name()),
            Self::Span(e) => write!(f, "Span<{}>", e.name()),
            Self::Value => write!(f, "Value"),
        }
    }
}

/// A payload type that can live in a register.
///
/// The conversions to and from [`RegValue`] are used by the interpreter's runtime register
/// table; compilers only ever need [`RegisterType::KIND`].
pub trait RegisterType: Sized + 'static {
    /// Register kind recorded by the builder for registers of this type.
    const KIND: RegKind;

    /// Borrows `Self` out of a runtime register slot, if the slot holds this type.
    fn from_reg(value: &RegValue) -> Option<&Self>;

    /// Mutably borrows `Self` out of a runtime register slot, if the slot holds this type.
    fn from_reg_mut(value: &mut RegValue) -> Option<&mut Self>;

    /// Wraps `self` into a runtime register slot value.
    fn into_reg(self) -> RegValue;
}

/// Untyped register index.
///
/// Used where registers of different types are stored side by side (operand listings, the
/// register cache).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleBase {
    index: u32,
}

impl HandleBase {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        Self { index }
    }

    /// Returns the register index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for HandleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.index)
    }
}

/// Read-write handle to a register holding a `T`.
pub struct RwHandle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls so that `T` needs no bounds: equality and hashing depend only on the index.
impl<T> Clone for RwHandle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RwHandle<T> {}

impl<T> PartialEq for RwHandle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for RwHandle<T> {}

impl<T> Hash for RwHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for RwHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RwHandle").field(&self.index).finish()
    }
}

impl<T> fmt::Display for RwHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.index)
    }
}

impl<T> RwHandle<T> {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the register index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Drops the static type, keeping only the index.
    #[must_use]
    #[inline]
    pub const fn erase(self) -> HandleBase {
        HandleBase::new(self.index)
    }
}

impl<T> Default for RwHandle<T> {
    /// Placeholder handle (`r0`) used by default-initialised instructions before their operands
    /// are filled in.
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> From<RwHandle<T>> for HandleBase {
    #[inline]
    fn from(h: RwHandle<T>) -> Self {
        h.erase()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::slab::{Slab, Span};
    use std::collections::hash_map::DefaultHasher;

    #[test]
    fn handles_compare_by_index_only() {
        let a = RwHandle::<Slab<u32>>::new(3);
        let b = RwHandle::<Slab<u32>>::new(3);
        let c = RwHandle::<Slab<u32>>::new(4);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let hash = |h: RwHandle<Slab<u32>>| {
            let mut hasher = DefaultHasher::new();
            h.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(a), hash(b));
    }

    #[test]
    fn handles_are_four_bytes() {
        assert_eq!(core::mem::size_of::<RwHandle<Span<u32>>>(), 4);
    }

    #[test]
    fn erase_keeps_index() {
        let h = RwHandle::<Span<u32>>::new(9);
        assert_eq!(h.erase().index(), 9);
        assert_eq!(HandleBase::from(h), HandleBase::new(9));
        assert_eq!(std::format!("{h}"), "r9");
    }

    #[test]
    fn reg_kind_display() {
        assert_eq!(std::format!("{}", RegKind::Slab(ElemType::U32)), "Slab<u32>");
        assert_eq!(std::format!("{}", RegKind::Span(ElemType::F64)), "Span<f64>");
        assert_eq!(std::format!("{}", RegKind::Value), "Value");
    }
}
