// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bytecode compilation core for columnar dataframe queries.
//!
//! This crate is the low-level backend that query compilers target:
//!
//! - [`builder::BytecodeBuilder`] allocates typed virtual registers ([`handle::RwHandle`]),
//!   manages reusable scratch index buffers with a best-fit policy, and emits a linear
//!   instruction stream.
//! - [`program::Program`] is the finished, immutable output of a builder. It must pass
//!   [`program::Program::verify`] before the interpreter will accept it.
//! - [`vm::Vm`] executes a verified program against a fresh [`vm::Registers`] table.
//!
//! The crate is `no_std + alloc`. The `std` feature is reserved for std-only conveniences and
//! is enabled by the profiling and test crates in this workspace.
//!
//! ## Example
//!
//! ```
//! use dataframe_bytecode::builder::BytecodeBuilder;
//! use dataframe_bytecode::vm::{Limits, Registers, Vm};
//!
//! let mut b = BytecodeBuilder::new();
//! let regs = b.allocate_scratch(16);
//! b.release_scratch(regs);
//!
//! let program = b.build().verify().unwrap();
//! let mut registers = Registers::new(&program);
//! Vm::new(Limits::default()).run(&program, &mut registers, None).unwrap();
//!
//! let span = registers.get(regs.span).unwrap();
//! assert_eq!(span.len(), 16);
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod builder;
pub mod bytecode;
pub mod handle;
pub mod program;
pub mod register_cache;
pub mod slab;
pub mod trace;
pub mod vm;

pub use builder::{BytecodeBuilder, ScratchRegisters};
pub use bytecode::{AllocateIndices, Bytecode, Instruction, Opcode};
pub use handle::{ElemType, HandleBase, RegKind, RegisterType, RwHandle};
pub use program::{Program, VerifiedProgram, VerifyError};
pub use slab::{Slab, Span, Value};
