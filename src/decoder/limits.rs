//! Implementation limits for decoding.
//!
//! Malformed input can declare absurd counts before supplying a single byte
//! of payload; these caps keep allocations proportional to actual input.
//! Values track the limits mainstream engines agree on.

/// Maximum number of type definitions in a module.
pub const MAX_TYPES: u32 = 1_000_000;

/// Maximum number of imports in a module.
pub const MAX_IMPORTS: u32 = 1_000_000;

/// Maximum number of defined functions in a module.
pub const MAX_FUNCTIONS: u32 = 1_000_000;

/// Maximum number of exports in a module.
pub const MAX_EXPORTS: u32 = 1_000_000;

/// Maximum number of globals in a module.
pub const MAX_GLOBALS: u32 = 1_000_000;

/// Maximum number of element segments in a module.
pub const MAX_ELEMENT_SEGMENTS: u32 = 100_000;

/// Maximum number of data segments in a module.
pub const MAX_DATA_SEGMENTS: u32 = 100_000;

/// Maximum number of function parameters or results.
pub const MAX_FUNCTION_ARITY: u32 = 1_000;

/// Maximum number of local variables in one function.
pub const MAX_FUNCTION_LOCALS: u32 = 50_000;

/// Maximum number of labels in a `br_table` instruction.
pub const MAX_BR_TABLE_LABELS: u32 = 65_536;

/// Maximum memory pages under 32-bit addressing (4 GiB).
pub const MAX_MEMORY_PAGES: u32 = 65_536;

/// Maximum table size in elements.
pub const MAX_TABLE_SIZE: u32 = 10_000_000;
