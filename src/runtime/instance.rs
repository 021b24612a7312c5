//! Instantiated modules.
//!
//! An [`Instance`] is one run of a [`Module`]: its resolved import bindings,
//! the store addresses of its memory, table, globals, and functions, its
//! compiled function bodies, its passive segments, and its export map. It is
//! created by [`crate::runtime::Store::instantiate`] and never exposed if
//! any instantiation step failed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::module::{FuncType, Module, ValueType};
use crate::runtime::store::{FuncAddr, GlobalAddr, MemoryAddr, TableAddr};
use crate::runtime::store::{SharedGlobal, SharedMemory, SharedTable};
use crate::runtime::Value;
use crate::structured::StructuredInstr;

/// A kind-tagged handle to a store value, as exposed to hosts via exports
/// and consumed from hosts via imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternVal {
    Func(FuncAddr),
    Table(TableAddr),
    Memory(MemoryAddr),
    Global(GlobalAddr),
}

/// A locally defined function, ready to execute: its signature, expanded
/// declared locals, and structured body.
#[derive(Debug)]
pub struct CompiledFunc {
    pub func_type: FuncType,
    pub locals: Vec<ValueType>,
    pub body: Vec<StructuredInstr>,
}

/// One run of a module.
pub struct Instance {
    pub(crate) module: Rc<Module>,
    /// Function index space: imported addresses first, then local functions.
    pub(crate) func_addrs: Vec<FuncAddr>,
    pub(crate) memories: Vec<SharedMemory>,
    pub(crate) memory_addrs: Vec<MemoryAddr>,
    pub(crate) tables: Vec<SharedTable>,
    pub(crate) table_addrs: Vec<TableAddr>,
    pub(crate) globals: Vec<SharedGlobal>,
    pub(crate) global_addrs: Vec<GlobalAddr>,
    /// Compiled bodies of local functions, parallel to `module.functions`.
    pub(crate) funcs: Vec<Rc<CompiledFunc>>,
    /// Passive element segments, resolved to references; `None` once
    /// dropped. Active and declarative segments start out dropped.
    pub(crate) elem_segments: RefCell<Vec<Option<Vec<Value>>>>,
    /// Passive data segments; `None` once dropped.
    pub(crate) data_segments: RefCell<Vec<Option<Vec<u8>>>>,
    pub(crate) exports: HashMap<String, ExternVal>,
}

impl Instance {
    /// Look up an export by name.
    pub fn export(&self, name: &str) -> Option<ExternVal> {
        self.exports.get(name).copied()
    }

    /// All exports, by name.
    pub fn exports(&self) -> &HashMap<String, ExternVal> {
        &self.exports
    }

    /// The module this instance was created from.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Store address of the function at `func_idx` in the full index space.
    pub fn func_addr(&self, func_idx: u32) -> Option<FuncAddr> {
        self.func_addrs.get(func_idx as usize).copied()
    }

    /// The compiled body of a locally defined function, by full-space index.
    pub(crate) fn compiled(&self, func_idx: u32) -> Option<&Rc<CompiledFunc>> {
        let imported = self.module.num_imported_funcs();
        self.funcs.get(func_idx as usize - imported)
    }

    pub(crate) fn memory(&self) -> Option<&SharedMemory> {
        self.memories.first()
    }

    pub(crate) fn table(&self, table_idx: u32) -> Option<&SharedTable> {
        self.tables.get(table_idx as usize)
    }

    pub(crate) fn global(&self, global_idx: u32) -> Option<&SharedGlobal> {
        self.globals.get(global_idx as usize)
    }
}
