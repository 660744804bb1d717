// Copyright 2026 the Dataframe Bytecode Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `dataframe_bytecode` (currently Tracy).
//!
//! This crate is `std`-only and keeps `dataframe_bytecode` itself free of profiling
//! dependencies. It listens for scope enter/exit callbacks from the VM and emits matching
//! profiling scopes.
//!
//! ## Backend
//! This crate currently supports the Tracy backend via `tracy-client`.
//!
//! ## Example
//! ```ignore
//! use dataframe_bytecode::vm::{Registers, Vm};
//! use dataframe_bytecode_profiling::ProfilingTraceSink;
//!
//! let mut sink = ProfilingTraceSink::new();
//! let mut registers = Registers::new(&program);
//! vm.run(&program, &mut registers, Some(&mut sink))?;
//! # Ok::<(), dataframe_bytecode::vm::ExecError>(())
//! ```

mod resolver;
mod sink;

pub use resolver::{DefaultLabelResolver, LabelResolver, OperandLabelResolver};
pub use sink::ProfilingTraceSink;
