// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Register payload model: slabs, spans and scalar values.
//!
//! A [`Slab<T>`] is an owned, contiguous arena whose length is fixed when it is allocated. A
//! [`Span<T>`] is a non-owning `(slab register, offset, len)` view describing the currently
//! active sub-range of a slab. Index-manipulation instructions work on `Span<u32>` views over
//! `Slab<u32>` arenas.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::handle::{ElemType, HandleBase, RegKind, RegisterType, RwHandle};
use crate::vm::RegValue;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u32 {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
}

/// Element types a slab can hold.
///
/// This trait is sealed; the set of element types is closed so that the runtime register table
/// stays a plain enum.
pub trait Element: sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + 'static {
    /// Element type tag.
    const ELEM_TYPE: ElemType;

    #[doc(hidden)]
    fn slab_ref(value: &RegValue) -> Option<&Slab<Self>>;
    #[doc(hidden)]
    fn slab_mut(value: &mut RegValue) -> Option<&mut Slab<Self>>;
    #[doc(hidden)]
    fn span_ref(value: &RegValue) -> Option<&Span<Self>>;
    #[doc(hidden)]
    fn span_mut(value: &mut RegValue) -> Option<&mut Span<Self>>;
    #[doc(hidden)]
    fn wrap_slab(slab: Slab<Self>) -> RegValue;
    #[doc(hidden)]
    fn wrap_span(span: Span<Self>) -> RegValue;
}

macro_rules! impl_element {
    ($ty:ty, $elem:ident, $slab:ident, $span:ident) => {
        impl Element for $ty {
            const ELEM_TYPE: ElemType = ElemType::$elem;

            fn slab_ref(value: &RegValue) -> Option<&Slab<Self>> {
                match value {
                    RegValue::$slab(s) => Some(s),
                    _ => None,
                }
            }

            fn slab_mut(value: &mut RegValue) -> Option<&mut Slab<Self>> {
                match value {
                    RegValue::$slab(s) => Some(s),
                    _ => None,
                }
            }

            fn span_ref(value: &RegValue) -> Option<&Span<Self>> {
                match value {
                    RegValue::$span(s) => Some(s),
                    _ => None,
                }
            }

            fn span_mut(value: &mut RegValue) -> Option<&mut Span<Self>> {
                match value {
                    RegValue::$span(s) => Some(s),
                    _ => None,
                }
            }

            fn wrap_slab(slab: Slab<Self>) -> RegValue {
                RegValue::$slab(slab)
            }

            fn wrap_span(span: Span<Self>) -> RegValue {
                RegValue::$span(span)
            }
        }
    };
}

impl_element!(u32, U32, SlabU32, SpanU32);
impl_element!(i64, I64, SlabI64, SpanI64);
impl_element!(f64, F64, SlabF64, SpanF64);

/// Owned, fixed-length arena of `T`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Slab<T> {
    data: Vec<T>,
}

impl<T: Element> Slab<T> {
    /// Allocates a slab of `len` default-initialised elements.
    #[must_use]
    pub fn alloc(len: u32) -> Self {
        Self {
            data: vec![T::default(); len as usize],
        }
    }

    /// Returns the number of elements.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the slab has no elements.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns all elements.
    #[must_use]
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns all elements mutably.
    #[must_use]
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns a span covering the whole slab, assuming it is bound to register `reg`.
    #[must_use]
    pub fn full_span(&self, reg: RwHandle<Self>) -> Span<T> {
        Span::new(reg, 0, u32::try_from(self.data.len()).unwrap_or(u32::MAX))
    }

    /// Returns the elements covered by `span`, or `None` if the span does not fit.
    #[must_use]
    pub fn view(&self, span: &Span<T>) -> Option<&[T]> {
        self.data.get(span.offset as usize..span.checked_end()? as usize)
    }

    /// Returns the elements covered by `span` mutably, or `None` if the span does not fit.
    #[must_use]
    pub fn view_mut(&mut self, span: &Span<T>) -> Option<&mut [T]> {
        self.data
            .get_mut(span.offset as usize..span.checked_end()? as usize)
    }
}

impl<T: Element> From<Vec<T>> for Slab<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T: Element> RegisterType for Slab<T> {
    const KIND: RegKind = RegKind::Slab(T::ELEM_TYPE);

    fn from_reg(value: &RegValue) -> Option<&Self> {
        T::slab_ref(value)
    }

    fn from_reg_mut(value: &mut RegValue) -> Option<&mut Self> {
        T::slab_mut(value)
    }

    fn into_reg(self) -> RegValue {
        T::wrap_slab(self)
    }
}

/// Non-owning view into the slab bound to another register.
pub struct Span<T> {
    slab: HandleBase,
    offset: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Span<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Span<T> {}

impl<T> PartialEq for Span<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slab == other.slab && self.offset == other.offset && self.len == other.len
    }
}

impl<T> Eq for Span<T> {}

impl<T> fmt::Debug for Span<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("slab", &self.slab)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

impl<T> Span<T> {
    /// Creates a view of `len` elements starting at `offset` in the slab held by `slab`.
    #[must_use]
    #[inline]
    pub const fn new(slab: RwHandle<Slab<T>>, offset: u32, len: u32) -> Self {
        Self {
            slab: slab.erase(),
            offset,
            len,
            _marker: PhantomData,
        }
    }

    /// Returns the register holding the backing slab.
    #[must_use]
    #[inline]
    pub const fn slab(&self) -> RwHandle<Slab<T>> {
        RwHandle::new(self.slab.index())
    }

    /// Returns the start offset into the slab.
    #[must_use]
    #[inline]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the number of elements in the view.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` if the view is empty.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the exclusive end offset, saturating at `u32::MAX`.
    #[must_use]
    #[inline]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.len)
    }

    /// Returns the exclusive end offset, or `None` if it does not fit in a `u32`.
    #[must_use]
    #[inline]
    pub const fn checked_end(&self) -> Option<u32> {
        self.offset.checked_add(self.len)
    }

    /// Returns the `len` elements starting `start` elements into this view.
    ///
    /// Returns `None` if the requested range leaves the view.
    #[must_use]
    pub fn sub_span(&self, start: u32, len: u32) -> Option<Self> {
        let end = start.checked_add(len)?;
        if end > self.len {
            return None;
        }
        let offset = self.offset.checked_add(start)?;
        Some(Self {
            slab: self.slab,
            offset,
            len,
            _marker: PhantomData,
        })
    }
}

impl<T: Element> RegisterType for Span<T> {
    const KIND: RegKind = RegKind::Span(T::ELEM_TYPE);

    fn from_reg(value: &RegValue) -> Option<&Self> {
        T::span_ref(value)
    }

    fn from_reg_mut(value: &mut RegValue) -> Option<&mut Self> {
        T::span_mut(value)
    }

    fn into_reg(self) -> RegValue {
        T::wrap_span(self)
    }
}

/// A scalar register value.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// 64-bit float.
    F64(f64),
}

impl RegisterType for Value {
    const KIND: RegKind = RegKind::Value;

    fn from_reg(value: &RegValue) -> Option<&Self> {
        match value {
            RegValue::Value(v) => Some(v),
            _ => None,
        }
    }

    fn from_reg_mut(value: &mut RegValue) -> Option<&mut Self> {
        match value {
            RegValue::Value(v) => Some(v),
            _ => None,
        }
    }

    fn into_reg(self) -> RegValue {
        RegValue::Value(self)
    }
}
