//! End-to-end instantiation and execution behavior.

mod common;

use common::{add_module, memory_module, single_func_module};
use wasmite::decoder::instruction::{BlockType, Instr, MemArg};
use wasmite::module::{
    ConstExpr, DataMode, DataSegment, ElementMode, ElementSegment, Export, ExportKind, FuncBody,
    FuncType, Global, GlobalType, Import, ImportKind, Limits, Locals, Module, RefType, TableType,
    ValueType,
};
use wasmite::runtime::{
    ExternVal, ImportObject, InstantiateError, InvokeError, Store, Trap, Value,
};

fn instantiate(store: &mut Store, module: &Module) -> usize {
    store
        .instantiate(module, &ImportObject::new())
        .expect("instantiation should succeed")
}

#[test]
fn add_returns_sum() {
    let module = add_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let results = store
        .invoke_export(id, "add", vec![Value::I32(2), Value::I32(3)])
        .unwrap();
    assert_eq!(results, vec![Value::I32(5)]);
}

#[test]
fn i32_add_wraps_instead_of_trapping() {
    let module = add_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let results = store
        .invoke_export(id, "add", vec![Value::I32(i32::MAX), Value::I32(1)])
        .unwrap();
    assert_eq!(results, vec![Value::I32(i32::MIN)]);
}

#[test]
fn invoke_checks_arguments() {
    let module = add_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    assert!(matches!(
        store.invoke_export(id, "add", vec![Value::I32(1)]),
        Err(InvokeError::ArgumentCount { .. })
    ));
    assert!(matches!(
        store.invoke_export(id, "add", vec![Value::I32(1), Value::I64(2)]),
        Err(InvokeError::ArgumentType { index: 1, .. })
    ));
    assert!(matches!(
        store.invoke_export(id, "sub", vec![]),
        Err(InvokeError::UnknownExport(_))
    ));
}

/// A module whose start function stores 0x2A at memory offset 0.
fn start_writes_module() -> Module {
    let mut module = Module::new();
    module.types = vec![FuncType {
        params: vec![],
        results: vec![],
    }];
    module.functions = vec![0];
    module.memories = vec![Limits { min: 1, max: None }];
    module.exports = vec![Export {
        name: "mem".into(),
        kind: ExportKind::Memory(0),
    }];
    module.start = Some(0);
    module.code = vec![FuncBody {
        locals: Locals::default(),
        instrs: vec![
            Instr::I32Const { value: 0 },
            Instr::I32Const { value: 0x2a },
            Instr::I32Store8 {
                memarg: MemArg { align: 0, offset: 0 },
            },
            Instr::End,
        ],
    }];
    module
}

#[test]
fn start_function_runs_before_exports_are_used() {
    let module = start_writes_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let Some(ExternVal::Memory(mem_addr)) = store.instance(id).unwrap().export("mem") else {
        panic!("expected a memory export");
    };
    assert_eq!(store.read_memory(mem_addr, 0, 1).unwrap(), vec![42]);
}

#[test]
fn trapping_start_function_discards_the_instance() {
    let mut module = start_writes_module();
    module.code[0].instrs = vec![Instr::Unreachable, Instr::End];

    let mut store = Store::new();
    let err = store.instantiate(&module, &ImportObject::new()).unwrap_err();
    assert!(matches!(err, InstantiateError::Trap(Trap::Unreachable)));
    assert!(store.instance(0).is_none());

    // The rolled-back instance must not leak store allocations: a later
    // instantiation starts from a clean address space.
    let id = instantiate(&mut store, &start_writes_module());
    assert_eq!(id, 0);
}

#[test]
fn out_of_bounds_data_segment_aborts_instantiation() {
    let mut module = memory_module(1, None);
    module.datas = vec![DataSegment {
        mode: DataMode::Active {
            memory_index: 0,
            offset: ConstExpr::new(vec![Instr::I32Const { value: 65535 }, Instr::End]),
        },
        init: vec![1, 2],
    }];

    let mut store = Store::new();
    let err = store.instantiate(&module, &ImportObject::new()).unwrap_err();
    assert!(matches!(
        err,
        InstantiateError::Trap(Trap::MemoryOutOfBounds)
    ));
    assert!(store.instance(0).is_none());
}

/// Memory with min 1 / max 2 and exported grow/size functions.
fn grow_module() -> Module {
    let mut module = Module::new();
    module.types = vec![
        FuncType {
            params: vec![ValueType::I32],
            results: vec![ValueType::I32],
        },
        FuncType {
            params: vec![],
            results: vec![ValueType::I32],
        },
    ];
    module.functions = vec![0, 1];
    module.memories = vec![Limits {
        min: 1,
        max: Some(2),
    }];
    module.exports = vec![
        Export {
            name: "grow".into(),
            kind: ExportKind::Func(0),
        },
        Export {
            name: "size".into(),
            kind: ExportKind::Func(1),
        },
    ];
    module.code = vec![
        FuncBody {
            locals: Locals::default(),
            instrs: vec![
                Instr::LocalGet { local_idx: 0 },
                Instr::MemoryGrow,
                Instr::End,
            ],
        },
        FuncBody {
            locals: Locals::default(),
            instrs: vec![Instr::MemorySize, Instr::End],
        },
    ];
    module
}

#[test]
fn memory_grow_returns_sentinel_not_trap() {
    let module = grow_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let grow = |store: &Store, delta: i32| {
        store
            .invoke_export(id, "grow", vec![Value::I32(delta)])
            .unwrap()[0]
    };
    assert_eq!(grow(&store, 1), Value::I32(1));
    assert_eq!(grow(&store, 1), Value::I32(-1));
    assert_eq!(
        store.invoke_export(id, "size", vec![]).unwrap(),
        vec![Value::I32(2)]
    );
}

#[test]
fn later_data_segment_wins_at_overlap() {
    let mut module = memory_module(1, None);
    module.datas = vec![
        DataSegment {
            mode: DataMode::Active {
                memory_index: 0,
                offset: ConstExpr::new(vec![Instr::I32Const { value: 0 }, Instr::End]),
            },
            init: vec![0x41; 4],
        },
        DataSegment {
            mode: DataMode::Active {
                memory_index: 0,
                offset: ConstExpr::new(vec![Instr::I32Const { value: 2 }, Instr::End]),
            },
            init: vec![0x42; 2],
        },
    ];

    let mut store = Store::new();
    let id = instantiate(&mut store, &module);
    let Some(ExternVal::Memory(mem)) = store.instance(id).unwrap().export("mem") else {
        panic!("expected a memory export");
    };
    assert_eq!(
        store.read_memory(mem, 0, 4).unwrap(),
        vec![0x41, 0x41, 0x42, 0x42]
    );
}

/// Two functions of different signatures behind a table, plus a dispatcher
/// that calls through it with the first function's type annotation.
fn dispatch_module() -> Module {
    let mut module = Module::new();
    module.types = vec![
        FuncType {
            params: vec![],
            results: vec![ValueType::I32],
        },
        FuncType {
            params: vec![],
            results: vec![ValueType::I64],
        },
        FuncType {
            params: vec![ValueType::I32],
            results: vec![ValueType::I32],
        },
    ];
    module.functions = vec![0, 1, 2];
    module.tables = vec![TableType {
        ref_type: RefType::FuncRef,
        limits: Limits { min: 3, max: None },
    }];
    module.elements = vec![ElementSegment {
        ref_type: RefType::FuncRef,
        mode: ElementMode::Active {
            table_index: 0,
            offset: ConstExpr::new(vec![Instr::I32Const { value: 0 }, Instr::End]),
        },
        funcs: vec![0, 1],
    }];
    module.exports = vec![Export {
        name: "dispatch".into(),
        kind: ExportKind::Func(2),
    }];
    module.code = vec![
        FuncBody {
            locals: Locals::default(),
            instrs: vec![Instr::I32Const { value: 7 }, Instr::End],
        },
        FuncBody {
            locals: Locals::default(),
            instrs: vec![Instr::I64Const { value: 8 }, Instr::End],
        },
        FuncBody {
            locals: Locals::default(),
            instrs: vec![
                Instr::LocalGet { local_idx: 0 },
                Instr::CallIndirect {
                    type_idx: 0,
                    table_idx: 0,
                },
                Instr::End,
            ],
        },
    ];
    module
}

#[test]
fn call_indirect_dispatches_matching_signature() {
    let module = dispatch_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let results = store
        .invoke_export(id, "dispatch", vec![Value::I32(0)])
        .unwrap();
    assert_eq!(results, vec![Value::I32(7)]);
}

#[test]
fn call_indirect_signature_mismatch_traps() {
    // Both functions take zero arguments; only the result types differ. The
    // signature check must still trap.
    let module = dispatch_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let err = store
        .invoke_export(id, "dispatch", vec![Value::I32(1)])
        .unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Trap(Trap::IndirectCallTypeMismatch)
    ));
}

#[test]
fn call_indirect_null_and_out_of_bounds_trap() {
    let module = dispatch_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let err = store
        .invoke_export(id, "dispatch", vec![Value::I32(2)])
        .unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Trap(Trap::UninitializedElement)
    ));

    let err = store
        .invoke_export(id, "dispatch", vec![Value::I32(9)])
        .unwrap_err();
    assert!(matches!(err, InvokeError::Trap(Trap::TableOutOfBounds)));
}

/// A module importing `env.f` with the given signature.
fn import_func_module(params: Vec<ValueType>, results: Vec<ValueType>) -> Module {
    let mut module = Module::new();
    module.types = vec![FuncType { params, results }];
    module.imports = vec![Import {
        module: "env".into(),
        field: "f".into(),
        kind: ImportKind::Func(0),
    }];
    module
}

#[test]
fn import_signatures_must_match_exactly() {
    let mut store = Store::new();
    let host = store.register_host_func(
        FuncType {
            params: vec![ValueType::I32],
            results: vec![ValueType::I32],
        },
        |args| Ok(vec![args[0]]),
    );
    let mut imports = ImportObject::new();
    imports.add_func("env", "f", host);

    // (i32, i32) -> i32 declared, (i32) -> i32 provided: link error, never
    // silent argument truncation.
    let module = import_func_module(
        vec![ValueType::I32, ValueType::I32],
        vec![ValueType::I32],
    );
    let err = store.instantiate(&module, &imports).unwrap_err();
    assert!(matches!(err, InstantiateError::Link(_)));

    // The exact signature links fine.
    let module = import_func_module(vec![ValueType::I32], vec![ValueType::I32]);
    store.instantiate(&module, &imports).unwrap();
}

#[test]
fn missing_import_is_a_link_error() {
    let mut store = Store::new();
    let module = import_func_module(vec![], vec![]);
    let err = store
        .instantiate(&module, &ImportObject::new())
        .unwrap_err();
    assert!(matches!(err, InstantiateError::Link(_)));
    assert!(store.instance(0).is_none());
}

#[test]
fn wasm_calls_host_function() {
    // (func (export "call_out") (result i32) call $env.f)
    let mut module = Module::new();
    module.types = vec![FuncType {
        params: vec![],
        results: vec![ValueType::I32],
    }];
    module.imports = vec![Import {
        module: "env".into(),
        field: "f".into(),
        kind: ImportKind::Func(0),
    }];
    module.functions = vec![0];
    module.exports = vec![Export {
        name: "call_out".into(),
        kind: ExportKind::Func(1),
    }];
    module.code = vec![FuncBody {
        locals: Locals::default(),
        instrs: vec![Instr::Call { func_idx: 0 }, Instr::End],
    }];

    let mut store = Store::new();
    let host = store.register_host_func(
        FuncType {
            params: vec![],
            results: vec![ValueType::I32],
        },
        |_| Ok(vec![Value::I32(777)]),
    );
    let mut imports = ImportObject::new();
    imports.add_func("env", "f", host);

    let id = store.instantiate(&module, &imports).unwrap();
    let results = store.invoke_export(id, "call_out", vec![]).unwrap();
    assert_eq!(results, vec![Value::I32(777)]);
}

#[test]
fn one_instance_exports_feed_another() {
    let mut store = Store::new();
    let add_id = instantiate(&mut store, &add_module());
    let Some(ExternVal::Func(add_addr)) = store.instance(add_id).unwrap().export("add") else {
        panic!("expected a function export");
    };

    // A second module importing that very function.
    let mut module = Module::new();
    module.types = vec![FuncType {
        params: vec![ValueType::I32, ValueType::I32],
        results: vec![ValueType::I32],
    }];
    module.imports = vec![Import {
        module: "calc".into(),
        field: "add".into(),
        kind: ImportKind::Func(0),
    }];
    module.functions = vec![0];
    module.exports = vec![Export {
        name: "add3".into(),
        kind: ExportKind::Func(1),
    }];
    module.code = vec![FuncBody {
        locals: Locals::default(),
        instrs: vec![
            Instr::LocalGet { local_idx: 0 },
            Instr::LocalGet { local_idx: 1 },
            Instr::Call { func_idx: 0 },
            Instr::I32Const { value: 3 },
            Instr::Call { func_idx: 0 },
            Instr::End,
        ],
    }];

    let mut imports = ImportObject::new();
    imports.add_func("calc", "add", add_addr);
    let id = store.instantiate(&module, &imports).unwrap();

    let results = store
        .invoke_export(id, "add3", vec![Value::I32(10), Value::I32(20)])
        .unwrap();
    assert_eq!(results, vec![Value::I32(33)]);
}

#[test]
fn imported_mutable_global_is_shared() {
    let mut module = Module::new();
    module.types = vec![FuncType {
        params: vec![],
        results: vec![],
    }];
    module.imports = vec![Import {
        module: "env".into(),
        field: "counter".into(),
        kind: ImportKind::Global(GlobalType {
            value_type: ValueType::I32,
            mutable: true,
        }),
    }];
    module.functions = vec![0];
    module.exports = vec![Export {
        name: "bump".into(),
        kind: ExportKind::Func(0),
    }];
    module.code = vec![FuncBody {
        locals: Locals::default(),
        instrs: vec![
            Instr::GlobalGet { global_idx: 0 },
            Instr::I32Const { value: 1 },
            Instr::I32Add,
            Instr::GlobalSet { global_idx: 0 },
            Instr::End,
        ],
    }];

    let mut store = Store::new();
    let counter = store.allocate_global(
        GlobalType {
            value_type: ValueType::I32,
            mutable: true,
        },
        Value::I32(5),
    );
    let mut imports = ImportObject::new();
    imports.add_global("env", "counter", counter);

    let id = store.instantiate(&module, &imports).unwrap();
    store.invoke_export(id, "bump", vec![]).unwrap();
    store.invoke_export(id, "bump", vec![]).unwrap();
    assert_eq!(store.global_get(counter).unwrap(), Value::I32(7));
}

#[test]
fn global_import_mutability_must_match() {
    let mut module = Module::new();
    module.imports = vec![Import {
        module: "env".into(),
        field: "g".into(),
        kind: ImportKind::Global(GlobalType {
            value_type: ValueType::I32,
            mutable: true,
        }),
    }];

    let mut store = Store::new();
    let immutable = store.allocate_global(
        GlobalType {
            value_type: ValueType::I32,
            mutable: false,
        },
        Value::I32(0),
    );
    let mut imports = ImportObject::new();
    imports.add_global("env", "g", immutable);

    let err = store.instantiate(&module, &imports).unwrap_err();
    assert!(matches!(err, InstantiateError::Link(_)));
}

#[test]
fn imported_global_feeds_segment_offset() {
    let mut module = memory_module(1, None);
    module.imports = vec![Import {
        module: "env".into(),
        field: "base".into(),
        kind: ImportKind::Global(GlobalType {
            value_type: ValueType::I32,
            mutable: false,
        }),
    }];
    module.datas = vec![DataSegment {
        mode: DataMode::Active {
            memory_index: 0,
            offset: ConstExpr::new(vec![Instr::GlobalGet { global_idx: 0 }, Instr::End]),
        },
        init: vec![0x68, 0x69],
    }];

    let mut store = Store::new();
    let base = store.allocate_global(
        GlobalType {
            value_type: ValueType::I32,
            mutable: false,
        },
        Value::I32(8),
    );
    let mut imports = ImportObject::new();
    imports.add_global("env", "base", base);

    let id = store.instantiate(&module, &imports).unwrap();
    let Some(ExternVal::Memory(mem)) = store.instance(id).unwrap().export("mem") else {
        panic!("expected a memory export");
    };
    assert_eq!(store.read_memory(mem, 8, 2).unwrap(), vec![0x68, 0x69]);
}

#[test]
fn memory_import_limits_are_checked() {
    let mut module = Module::new();
    module.imports = vec![Import {
        module: "env".into(),
        field: "mem".into(),
        kind: ImportKind::Memory(Limits {
            min: 2,
            max: Some(4),
        }),
    }];

    let mut store = Store::new();
    let too_small = store.allocate_memory(Limits {
        min: 1,
        max: Some(4),
    });
    let unbounded = store.allocate_memory(Limits { min: 2, max: None });
    let matching = store.allocate_memory(Limits {
        min: 2,
        max: Some(3),
    });

    for bad in [too_small, unbounded] {
        let mut imports = ImportObject::new();
        imports.add_memory("env", "mem", bad);
        assert!(matches!(
            store.instantiate(&module, &imports),
            Err(InstantiateError::Link(_))
        ));
    }

    let mut imports = ImportObject::new();
    imports.add_memory("env", "mem", matching);
    store.instantiate(&module, &imports).unwrap();
}

#[test]
fn import_kind_mismatch_is_a_link_error() {
    let module = import_func_module(vec![], vec![]);
    let mut store = Store::new();
    let mem = store.allocate_memory(Limits { min: 1, max: None });
    let mut imports = ImportObject::new();
    imports.define("env", "f", ExternVal::Memory(mem));

    assert!(matches!(
        store.instantiate(&module, &imports),
        Err(InstantiateError::Link(_))
    ));
}

#[test]
fn division_traps() {
    let module = single_func_module(
        vec![ValueType::I32, ValueType::I32],
        vec![ValueType::I32],
        vec![
            Instr::LocalGet { local_idx: 0 },
            Instr::LocalGet { local_idx: 1 },
            Instr::I32DivS,
            Instr::End,
        ],
        "div",
    );
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    assert_eq!(
        store
            .invoke_export(id, "div", vec![Value::I32(-7), Value::I32(2)])
            .unwrap(),
        vec![Value::I32(-3)]
    );
    assert!(matches!(
        store
            .invoke_export(id, "div", vec![Value::I32(1), Value::I32(0)])
            .unwrap_err(),
        InvokeError::Trap(Trap::DivisionByZero)
    ));
    assert!(matches!(
        store
            .invoke_export(id, "div", vec![Value::I32(i32::MIN), Value::I32(-1)])
            .unwrap_err(),
        InvokeError::Trap(Trap::IntegerOverflow)
    ));
}

#[test]
fn out_of_bounds_memory_access_traps() {
    let mut module = single_func_module(
        vec![ValueType::I32],
        vec![ValueType::I32],
        vec![
            Instr::LocalGet { local_idx: 0 },
            Instr::I32Load {
                memarg: MemArg { align: 2, offset: 0 },
            },
            Instr::End,
        ],
        "peek",
    );
    module.memories = vec![Limits { min: 1, max: None }];

    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    assert_eq!(
        store
            .invoke_export(id, "peek", vec![Value::I32(0)])
            .unwrap(),
        vec![Value::I32(0)]
    );
    assert!(matches!(
        store
            .invoke_export(id, "peek", vec![Value::I32(65533)])
            .unwrap_err(),
        InvokeError::Trap(Trap::MemoryOutOfBounds)
    ));
}

/// sum(n) = n + (n-1) + ... + 1, via a loop with explicit branches.
fn sum_module() -> Module {
    let mut module = Module::new();
    module.types = vec![FuncType {
        params: vec![ValueType::I32],
        results: vec![ValueType::I32],
    }];
    module.functions = vec![0];
    module.exports = vec![Export {
        name: "sum".into(),
        kind: ExportKind::Func(0),
    }];
    module.code = vec![FuncBody {
        locals: Locals::new(vec![(1, ValueType::I32)]),
        instrs: vec![
            Instr::Block {
                block_type: BlockType::Empty,
            },
            Instr::Loop {
                block_type: BlockType::Empty,
            },
            Instr::LocalGet { local_idx: 0 },
            Instr::I32Eqz,
            Instr::BrIf { label_idx: 1 },
            Instr::LocalGet { local_idx: 1 },
            Instr::LocalGet { local_idx: 0 },
            Instr::I32Add,
            Instr::LocalSet { local_idx: 1 },
            Instr::LocalGet { local_idx: 0 },
            Instr::I32Const { value: 1 },
            Instr::I32Sub,
            Instr::LocalSet { local_idx: 0 },
            Instr::Br { label_idx: 0 },
            Instr::End,
            Instr::End,
            Instr::LocalGet { local_idx: 1 },
            Instr::End,
        ],
    }];
    module
}

#[test]
fn loops_and_branches_execute() {
    let module = sum_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    assert_eq!(
        store.invoke_export(id, "sum", vec![Value::I32(10)]).unwrap(),
        vec![Value::I32(55)]
    );
    assert_eq!(
        store.invoke_export(id, "sum", vec![Value::I32(0)]).unwrap(),
        vec![Value::I32(0)]
    );
}

#[test]
fn runaway_recursion_exhausts_the_call_stack() {
    let module = single_func_module(
        vec![],
        vec![],
        vec![Instr::Call { func_idx: 0 }, Instr::End],
        "recurse",
    );
    let mut store = Store::new();
    store.set_max_call_depth(100);
    let id = instantiate(&mut store, &module);

    assert!(matches!(
        store.invoke_export(id, "recurse", vec![]).unwrap_err(),
        InvokeError::Trap(Trap::CallStackExhausted)
    ));
}

#[test]
fn instruction_budget_stops_infinite_loops() {
    let module = single_func_module(
        vec![],
        vec![],
        vec![
            Instr::Block {
                block_type: BlockType::Empty,
            },
            Instr::Loop {
                block_type: BlockType::Empty,
            },
            Instr::Br { label_idx: 0 },
            Instr::End,
            Instr::End,
            Instr::End,
        ],
        "spin",
    );
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    let err = store
        .invoke_export_with_budget(id, "spin", vec![], Some(10_000))
        .unwrap_err();
    assert!(matches!(err, InvokeError::Trap(Trap::BudgetExhausted)));
}

/// Passive data segment plus functions applying and dropping it.
fn passive_data_module() -> Module {
    let mut module = memory_module(1, None);
    module.types = vec![FuncType {
        params: vec![],
        results: vec![],
    }];
    module.functions = vec![0, 1];
    module.datas = vec![DataSegment {
        mode: DataMode::Passive,
        init: vec![0xde, 0xad, 0xbe],
    }];
    module.data_count = Some(1);
    module.exports.push(Export {
        name: "init".into(),
        kind: ExportKind::Func(0),
    });
    module.exports.push(Export {
        name: "drop".into(),
        kind: ExportKind::Func(1),
    });
    module.code = vec![
        FuncBody {
            locals: Locals::default(),
            instrs: vec![
                Instr::I32Const { value: 16 },
                Instr::I32Const { value: 1 },
                Instr::I32Const { value: 2 },
                Instr::MemoryInit { data_idx: 0 },
                Instr::End,
            ],
        },
        FuncBody {
            locals: Locals::default(),
            instrs: vec![Instr::DataDrop { data_idx: 0 }, Instr::End],
        },
    ];
    module
}

#[test]
fn passive_data_applies_on_memory_init() {
    let module = passive_data_module();
    let mut store = Store::new();
    let id = instantiate(&mut store, &module);
    let Some(ExternVal::Memory(mem)) = store.instance(id).unwrap().export("mem") else {
        panic!("expected a memory export");
    };

    // Passive segments are not applied at instantiation.
    assert_eq!(store.read_memory(mem, 16, 2).unwrap(), vec![0, 0]);

    store.invoke_export(id, "init", vec![]).unwrap();
    assert_eq!(store.read_memory(mem, 16, 2).unwrap(), vec![0xad, 0xbe]);

    // After data.drop the segment reads as empty, so re-applying traps.
    store.invoke_export(id, "drop", vec![]).unwrap();
    assert!(matches!(
        store.invoke_export(id, "init", vec![]).unwrap_err(),
        InvokeError::Trap(Trap::MemoryOutOfBounds)
    ));
}

#[test]
fn table_grow_returns_sentinel() {
    let mut module = Module::new();
    module.types = vec![FuncType {
        params: vec![],
        results: vec![ValueType::I32],
    }];
    module.functions = vec![0];
    module.tables = vec![TableType {
        ref_type: RefType::FuncRef,
        limits: Limits {
            min: 1,
            max: Some(2),
        },
    }];
    module.exports = vec![Export {
        name: "grow_table".into(),
        kind: ExportKind::Func(0),
    }];
    module.code = vec![FuncBody {
        locals: Locals::default(),
        instrs: vec![
            Instr::RefNull {
                ref_type: RefType::FuncRef,
            },
            Instr::I32Const { value: 1 },
            Instr::TableGrow { table_idx: 0 },
            Instr::End,
        ],
    }];

    let mut store = Store::new();
    let id = instantiate(&mut store, &module);

    assert_eq!(
        store.invoke_export(id, "grow_table", vec![]).unwrap(),
        vec![Value::I32(1)]
    );
    assert_eq!(
        store.invoke_export(id, "grow_table", vec![]).unwrap(),
        vec![Value::I32(-1)]
    );
}

#[test]
fn mistyped_module_is_rejected_before_execution() {
    // Pushes an i32 where an i64 result is declared; must be caught by
    // validation at instantiation time, never trap at run time.
    let module = single_func_module(
        vec![],
        vec![ValueType::I64],
        vec![Instr::I32Const { value: 1 }, Instr::End],
        "bad",
    );
    let mut store = Store::new();
    let err = store.instantiate(&module, &ImportObject::new()).unwrap_err();
    assert!(matches!(err, InstantiateError::Validation(_)));
    assert!(store.instance(0).is_none());
}

#[test]
fn identical_runs_are_deterministic() {
    let run = || {
        let mut store = Store::new();
        let id = instantiate(&mut store, &passive_data_module());
        store.invoke_export(id, "init", vec![]).unwrap();
        let Some(ExternVal::Memory(mem)) = store.instance(id).unwrap().export("mem") else {
            panic!("expected a memory export");
        };
        let sum_id = instantiate(&mut store, &sum_module());
        let sum = store
            .invoke_export(sum_id, "sum", vec![Value::I32(100)])
            .unwrap();
        (store.read_memory(mem, 0, 64).unwrap(), sum)
    };

    let (mem_a, sum_a) = run();
    let (mem_b, sum_b) = run();
    assert_eq!(mem_a, mem_b);
    assert_eq!(sum_a, sum_b);
}
