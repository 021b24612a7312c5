//! A minimal WebAssembly module loader and interpreter.
//!
//! wasmite implements the core pipeline for running WebAssembly modules:
//! binary decoding, static validation, instantiation against host-provided
//! imports, and execution via a stack-machine interpreter. A binary encoder
//! rounds out the set as the inverse of the decoder.
//!
//! # Modules
//!
//! - [`decoder`] -- Binary format decoder. Reads `.wasm` bytes into a
//!   [`module::Module`].
//! - [`validator`] -- Static verification: type checking of function bodies,
//!   index-space bounds, constant expressions. Nothing unvalidated runs.
//! - [`encoder`] -- Binary encoder. Serializes a `Module` back to `.wasm`.
//! - [`runtime`] -- The store, instances, linear memory, tables, globals,
//!   and the interpreter.
//!
//! # Example
//!
//! Decode a module, instantiate it, and call an exported function:
//!
//! ```
//! use wasmite::decoder::decode;
//! use wasmite::runtime::{ImportObject, Store, Value};
//!
//! // (module
//! //   (func (export "add") (param i32 i32) (result i32)
//! //     local.get 0
//! //     local.get 1
//! //     i32.add))
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00,
//!     0x01, 0x07, 0x01, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f,
//!     0x03, 0x02, 0x01, 0x00,
//!     0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00,
//!     0x0a, 0x09, 0x01, 0x07, 0x00, 0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b,
//! ];
//!
//! let module = decode(&bytes).unwrap();
//! let mut store = Store::new();
//! let id = store.instantiate(&module, &ImportObject::new()).unwrap();
//! let results = store
//!     .invoke_export(id, "add", vec![Value::I32(2), Value::I32(3)])
//!     .unwrap();
//! assert_eq!(results, vec![Value::I32(5)]);
//! ```
//!
//! # Scope
//!
//! Targets the WebAssembly core specification with a single memory and a
//! single table per module, plus the sign-extension, saturating-truncation,
//! reference-type, and bulk-memory operations. Vector instructions, atomics
//! and shared memories, multi-memory, and exception handling are out of
//! scope.

pub mod decoder;
pub mod encoder;
pub mod module;
pub mod runtime;
pub mod structured;
pub mod validator;
