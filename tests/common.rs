//! Shared helpers for building test modules programmatically.
//!
//! Each integration-test binary compiles its own copy, so not every helper
//! is used by every binary.
#![allow(dead_code)]

use wasmite::decoder::instruction::Instr;
use wasmite::module::{
    Export, ExportKind, FuncBody, FuncType, Limits, Locals, Module, ValueType,
};

/// A module with one exported function and no locals.
pub fn single_func_module(
    params: Vec<ValueType>,
    results: Vec<ValueType>,
    instrs: Vec<Instr>,
    export_name: &str,
) -> Module {
    let mut module = Module::new();
    module.types = vec![FuncType { params, results }];
    module.functions = vec![0];
    module.code = vec![FuncBody {
        locals: Locals::default(),
        instrs,
    }];
    module.exports = vec![Export {
        name: export_name.to_string(),
        kind: ExportKind::Func(0),
    }];
    module
}

/// The canonical `add(a: i32, b: i32) -> i32` module.
pub fn add_module() -> Module {
    single_func_module(
        vec![ValueType::I32, ValueType::I32],
        vec![ValueType::I32],
        vec![
            Instr::LocalGet { local_idx: 0 },
            Instr::LocalGet { local_idx: 1 },
            Instr::I32Add,
            Instr::End,
        ],
        "add",
    )
}

/// One page of exported memory, growable to `max`.
pub fn memory_module(min: u32, max: Option<u32>) -> Module {
    let mut module = Module::new();
    module.memories = vec![Limits { min, max }];
    module.exports = vec![Export {
        name: "mem".to_string(),
        kind: ExportKind::Memory(0),
    }];
    module
}
