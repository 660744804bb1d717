// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity-keyed register cache.
//!
//! Query compilers often need "the register for this column" or "the register for this index"
//! more than once while compiling a single program. [`RegisterCache`] memoises
//! [`BytecodeBuilder::allocate_register`] by `(reg_type, identity)`, where `reg_type` is a
//! caller-chosen namespace and `identity` usually comes from [`identity_of`].
//!
//! The cache does not hold the builder; it is passed to each call so the builder stays freely
//! usable between lookups.

use core::fmt;

use hashbrown::HashMap;

use crate::builder::BytecodeBuilder;
use crate::handle::{HandleBase, RegKind, RegisterType, RwHandle};

/// Returns an identity for `value` derived from its address.
///
/// Two live references yield the same identity iff they point at the same place, which makes
/// this suitable for keying registers by column or index object.
#[must_use]
#[inline]
pub fn identity_of<T: ?Sized>(value: &T) -> usize {
    core::ptr::from_ref(value).cast::<()>() as usize
}

/// Result of [`RegisterCache::get_or_allocate`].
pub struct CachedRegister<T> {
    /// The cached or newly allocated register.
    pub reg: RwHandle<T>,
    /// `true` if the register was allocated by this call.
    pub inserted: bool,
}

impl<T> fmt::Debug for CachedRegister<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedRegister")
            .field("reg", &self.reg)
            .field("inserted", &self.inserted)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    reg_type: u32,
    identity: usize,
}

/// Memoises register allocation by `(reg_type, identity)`.
#[derive(Clone, Debug, Default)]
pub struct RegisterCache {
    cache: HashMap<CacheKey, (HandleBase, RegKind)>,
}

impl RegisterCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the register cached for `(reg_type, identity)`, allocating it from `builder` on
    /// first use.
    ///
    /// # Panics
    ///
    /// Panics if the key was first cached with a register type other than `T`.
    pub fn get_or_allocate<T: RegisterType>(
        &mut self,
        builder: &mut BytecodeBuilder,
        reg_type: u32,
        identity: usize,
    ) -> CachedRegister<T> {
        let key = CacheKey { reg_type, identity };
        if let Some(&(reg, kind)) = self.cache.get(&key) {
            assert!(
                kind == T::KIND,
                "register cache key (type {reg_type}) holds a {kind}, requested {}",
                T::KIND
            );
            return CachedRegister {
                reg: RwHandle::new(reg.index()),
                inserted: false,
            };
        }
        let reg = builder.allocate_register::<T>();
        self.cache.insert(key, (reg.erase(), T::KIND));
        CachedRegister {
            reg,
            inserted: true,
        }
    }

    /// Returns the number of cached registers.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Forgets all cached registers. Registers already allocated stay in the builder.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slab::{Slab, Span};

    const COLUMN: u32 = 0;
    const INDEX: u32 = 1;

    #[test]
    fn same_key_returns_same_register() {
        let column = [1_u32, 2, 3];
        let mut b = BytecodeBuilder::new();
        let mut cache = RegisterCache::new();

        let first = cache.get_or_allocate::<Slab<u32>>(&mut b, COLUMN, identity_of(&column));
        let again = cache.get_or_allocate::<Slab<u32>>(&mut b, COLUMN, identity_of(&column));
        assert!(first.inserted);
        assert!(!again.inserted);
        assert_eq!(first.reg, again.reg);
        assert_eq!(b.register_count(), 1);
    }

    #[test]
    fn reg_type_namespaces_keys() {
        let column = [0_u32; 4];
        let id = identity_of(&column);
        let mut b = BytecodeBuilder::new();
        let mut cache = RegisterCache::new();

        let slab = cache.get_or_allocate::<Slab<u32>>(&mut b, COLUMN, id);
        let span = cache.get_or_allocate::<Span<u32>>(&mut b, INDEX, id);
        assert!(span.inserted);
        assert_ne!(slab.reg.erase(), span.reg.erase());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_forgets_but_does_not_free() {
        let mut b = BytecodeBuilder::new();
        let mut cache = RegisterCache::new();
        let a = cache.get_or_allocate::<Slab<u32>>(&mut b, COLUMN, 7);
        cache.clear();
        assert!(cache.is_empty());

        let c = cache.get_or_allocate::<Slab<u32>>(&mut b, COLUMN, 7);
        assert!(c.inserted);
        assert_ne!(a.reg, c.reg);
        assert_eq!(b.register_count(), 2);
    }

    #[test]
    #[should_panic(expected = "register cache key (type 0) holds a Slab<u32>, requested Span<u32>")]
    fn type_confusion_panics() {
        let mut b = BytecodeBuilder::new();
        let mut cache = RegisterCache::new();
        let _ = cache.get_or_allocate::<Slab<u32>>(&mut b, COLUMN, 1);
        let _ = cache.get_or_allocate::<Span<u32>>(&mut b, COLUMN, 1);
    }

    #[test]
    fn identities_distinguish_objects() {
        let a = [0_u8; 2];
        let b = [0_u8; 2];
        assert_eq!(identity_of(&a), identity_of(&a));
        assert_ne!(identity_of(&a), identity_of(&b));
    }
}
