//! Runtime: store, instances, and the interpreter.
//!
//! The three error tiers of this crate stay disjoint: decode and validation
//! failures live in [`crate::decoder`] and [`crate::validator`] and occur
//! before any runtime state exists; [`LinkError`] covers import resolution;
//! [`Trap`] covers abnormal termination during execution. Growth failure of
//! memories and tables is not an error at all, just a sentinel return
//! value the calling code is expected to check.

pub mod frame;
pub mod imports;
pub mod instance;
pub mod interp;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod store;
pub mod table;
pub mod value;

pub use imports::ImportObject;
pub use instance::{ExternVal, Instance};
pub use interp::Interpreter;
pub use memory::{Memory, PAGE_SIZE};
pub use store::{
    FuncAddr, FunctionInstance, GlobalAddr, GlobalCell, MemoryAddr, SharedGlobal, SharedMemory,
    SharedTable, Store, TableAddr,
};
pub use table::Table;
pub use value::{ExternAddr, Value};

use thiserror::Error;

/// Abnormal termination of WebAssembly execution.
///
/// A trap unwinds every in-progress call up to the host boundary that
/// initiated execution; no WebAssembly construct can catch it. The variants
/// are the reason tags reported to the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Trap {
    #[error("unreachable instruction executed")]
    Unreachable,

    #[error("out of bounds memory access")]
    MemoryOutOfBounds,

    #[error("out of bounds table access")]
    TableOutOfBounds,

    #[error("integer divide by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("invalid conversion to integer")]
    InvalidConversion,

    #[error("uninitialized table element")]
    UninitializedElement,

    #[error("null reference dereferenced")]
    NullReference,

    #[error("indirect call signature mismatch")]
    IndirectCallTypeMismatch,

    #[error("call stack exhausted")]
    CallStackExhausted,

    #[error("instruction budget exhausted")]
    BudgetExhausted,

    #[error("host function trapped: {0}")]
    Host(String),

    /// An interpreter invariant was violated. Unreachable for modules that
    /// passed validation; exists so invariant breaks surface as errors
    /// instead of panics.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure to resolve or match an import during instantiation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("unknown import {module}.{field}")]
    UnknownImport { module: String, field: String },

    #[error("incompatible import type for {module}.{field}: expected {expected}, found {actual}")]
    IncompatibleImport {
        module: String,
        field: String,
        expected: String,
        actual: String,
    },
}

/// Why instantiation failed. The partially-constructed instance is discarded
/// in every case; its exports never become visible.
#[derive(Debug, Error)]
pub enum InstantiateError {
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validator::ValidationError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("trap during instantiation: {0}")]
    Trap(#[from] Trap),
}

/// Host-side misuse of the invocation API. Distinct from a [`Trap`]: these
/// are caught before any WebAssembly code runs, except for the `Trap`
/// variant which carries a trap out of a call that did start.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("unknown export \"{0}\"")]
    UnknownExport(String),

    #[error("export \"{0}\" is not a function")]
    NotAFunction(String),

    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument {index} has type {actual}, expected {expected}")]
    ArgumentType {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("global is immutable")]
    ImmutableGlobal,

    #[error("value type mismatch")]
    ValueTypeMismatch,

    #[error("invalid address")]
    InvalidAddress,

    #[error(transparent)]
    Trap(#[from] Trap),
}
