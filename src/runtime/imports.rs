//! Host-supplied import environment.

use std::collections::HashMap;

use crate::runtime::instance::ExternVal;
use crate::runtime::store::{FuncAddr, GlobalAddr, MemoryAddr, TableAddr};

/// The import-resolution map consulted once, at instantiation time: each
/// `(module, field)` pair names a concrete store value of one of the four
/// extern kinds.
#[derive(Debug, Clone, Default)]
pub struct ImportObject {
    entries: HashMap<(String, String), ExternVal>,
}

impl ImportObject {
    pub fn new() -> Self {
        ImportObject::default()
    }

    /// Bind `module.field` to an extern value.
    pub fn define(
        &mut self,
        module: impl Into<String>,
        field: impl Into<String>,
        value: ExternVal,
    ) {
        self.entries.insert((module.into(), field.into()), value);
    }

    pub fn add_func(&mut self, module: impl Into<String>, field: impl Into<String>, addr: FuncAddr) {
        self.define(module, field, ExternVal::Func(addr));
    }

    pub fn add_table(
        &mut self,
        module: impl Into<String>,
        field: impl Into<String>,
        addr: TableAddr,
    ) {
        self.define(module, field, ExternVal::Table(addr));
    }

    pub fn add_memory(
        &mut self,
        module: impl Into<String>,
        field: impl Into<String>,
        addr: MemoryAddr,
    ) {
        self.define(module, field, ExternVal::Memory(addr));
    }

    pub fn add_global(
        &mut self,
        module: impl Into<String>,
        field: impl Into<String>,
        addr: GlobalAddr,
    ) {
        self.define(module, field, ExternVal::Global(addr));
    }

    pub fn get(&self, module: &str, field: &str) -> Option<ExternVal> {
        self.entries
            .get(&(module.to_string(), field.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let mut imports = ImportObject::new();
        imports.add_func("env", "log", FuncAddr(0));
        imports.add_memory("env", "mem", MemoryAddr(1));

        assert_eq!(imports.get("env", "log"), Some(ExternVal::Func(FuncAddr(0))));
        assert_eq!(
            imports.get("env", "mem"),
            Some(ExternVal::Memory(MemoryAddr(1)))
        );
        assert_eq!(imports.get("env", "missing"), None);
    }

    #[test]
    fn later_definitions_win() {
        let mut imports = ImportObject::new();
        imports.add_func("env", "f", FuncAddr(0));
        imports.add_func("env", "f", FuncAddr(1));
        assert_eq!(imports.get("env", "f"), Some(ExternVal::Func(FuncAddr(1))));
    }
}
