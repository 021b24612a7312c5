//! Static verification of decoded modules.
//!
//! [`validate`] is the sandbox's integrity boundary: a module that fails here
//! is never instantiated or executed. Checks cover index-space bounds, the
//! single-memory/single-table restriction, limits well-formedness, constant
//! expressions, export uniqueness, the start function's signature, and,
//! via [`func`], an abstract stack-machine simulation of every function
//! body.

pub mod func;

use std::collections::HashSet;

use thiserror::Error;

use crate::decoder::instruction::Instr;
use crate::decoder::limits;
use crate::module::{
    ConstExpr, DataMode, ElementMode, ExportKind, ImportKind, Limits, Module, ValueType,
};

/// A validation failure, naming the kind of violation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unknown type index {0}")]
    UnknownType(u32),

    #[error("unknown function index {0}")]
    UnknownFunction(u32),

    #[error("unknown table index {0}")]
    UnknownTable(u32),

    #[error("unknown memory index {0}")]
    UnknownMemory(u32),

    #[error("unknown global index {0}")]
    UnknownGlobal(u32),

    #[error("unknown local index {0}")]
    UnknownLocal(u32),

    #[error("unknown label depth {0}")]
    UnknownLabel(u32),

    #[error("unknown element segment index {0}")]
    UnknownElementSegment(u32),

    #[error("unknown data segment index {0}")]
    UnknownDataSegment(u32),

    #[error("constant expression contains a disallowed instruction")]
    DisallowedConstInstruction,

    #[error("constant expression is not a single value followed by end")]
    MalformedConstExpr,

    #[error("global.get in a constant expression must name an imported immutable global")]
    ConstExprGlobal,

    #[error("at most one memory may be declared")]
    MultipleMemories,

    #[error("at most one table may be declared")]
    MultipleTables,

    #[error("limits minimum {min} exceeds maximum {max}")]
    LimitsMinExceedsMax { min: u32, max: u32 },

    #[error("memory size {0} pages exceeds the 4 GiB addressing limit")]
    MemoryTooLarge(u32),

    #[error("table size {0} exceeds implementation limit")]
    TableTooLarge(u32),

    #[error("start function must have type () -> ()")]
    InvalidStartFunction,

    #[error("duplicate export name \"{0}\"")]
    DuplicateExport(String),

    #[error("alignment 2^{align} exceeds natural alignment of a {natural}-byte access")]
    BadAlignment { align: u32, natural: u32 },

    #[error("else without an enclosing if")]
    MisplacedElse,

    #[error("unbalanced control structure")]
    UnbalancedControl,

    #[error("global is immutable")]
    ImmutableGlobal,

    #[error("memory.init and data.drop require a data count section")]
    DataCountRequired,

    #[error("function {0} is not declared for reference")]
    UndeclaredFuncRef(u32),
}

/// Validate a decoded module.
pub fn validate(module: &Module) -> Result<(), ValidationError> {
    validate_imports(module)?;
    validate_definitions(module)?;
    validate_globals(module)?;
    validate_exports(module)?;
    validate_start(module)?;
    validate_elements(module)?;
    validate_datas(module)?;

    let declared_funcs = declared_func_refs(module);
    for func_idx in 0..module.functions.len() {
        let space_idx = (module.num_imported_funcs() + func_idx) as u32;
        func::validate_func_body(module, space_idx, &declared_funcs)?;
    }
    Ok(())
}

fn validate_memory_limits(limits: &Limits) -> Result<(), ValidationError> {
    if limits.min > limits::MAX_MEMORY_PAGES {
        return Err(ValidationError::MemoryTooLarge(limits.min));
    }
    if let Some(max) = limits.max {
        if max > limits::MAX_MEMORY_PAGES {
            return Err(ValidationError::MemoryTooLarge(max));
        }
        if limits.min > max {
            return Err(ValidationError::LimitsMinExceedsMax {
                min: limits.min,
                max,
            });
        }
    }
    Ok(())
}

fn validate_table_limits(limits: &Limits) -> Result<(), ValidationError> {
    if limits.min > limits::MAX_TABLE_SIZE {
        return Err(ValidationError::TableTooLarge(limits.min));
    }
    if let Some(max) = limits.max {
        if limits.min > max {
            return Err(ValidationError::LimitsMinExceedsMax {
                min: limits.min,
                max,
            });
        }
    }
    Ok(())
}

fn validate_imports(module: &Module) -> Result<(), ValidationError> {
    for import in &module.imports {
        match &import.kind {
            ImportKind::Func(type_idx) => {
                if *type_idx as usize >= module.types.len() {
                    return Err(ValidationError::UnknownType(*type_idx));
                }
            }
            ImportKind::Table(tt) => validate_table_limits(&tt.limits)?,
            ImportKind::Memory(limits) => validate_memory_limits(limits)?,
            ImportKind::Global(_) => {}
        }
    }
    Ok(())
}

fn validate_definitions(module: &Module) -> Result<(), ValidationError> {
    for type_idx in &module.functions {
        if *type_idx as usize >= module.types.len() {
            return Err(ValidationError::UnknownType(*type_idx));
        }
    }
    if module.num_memories() > 1 {
        return Err(ValidationError::MultipleMemories);
    }
    if module.num_tables() > 1 {
        return Err(ValidationError::MultipleTables);
    }
    for limits in &module.memories {
        validate_memory_limits(limits)?;
    }
    for table in &module.tables {
        validate_table_limits(&table.limits)?;
    }
    Ok(())
}

/// Validate a constant expression against its required result type.
///
/// Only constants, `ref.null`, `ref.func`, and reads of imported immutable
/// globals are admitted; the expression must produce exactly one value.
pub fn validate_const_expr(
    module: &Module,
    expr: &ConstExpr,
    expected: ValueType,
) -> Result<(), ValidationError> {
    let mut produced: Option<ValueType> = None;
    let mut ended = false;

    for instr in &expr.instrs {
        if ended {
            return Err(ValidationError::MalformedConstExpr);
        }
        let ty = match instr {
            Instr::I32Const { .. } => ValueType::I32,
            Instr::I64Const { .. } => ValueType::I64,
            Instr::F32Const { .. } => ValueType::F32,
            Instr::F64Const { .. } => ValueType::F64,
            Instr::RefNull { ref_type } => (*ref_type).into(),
            Instr::RefFunc { func_idx } => {
                if *func_idx as usize >= module.num_funcs() {
                    return Err(ValidationError::UnknownFunction(*func_idx));
                }
                ValueType::FuncRef
            }
            Instr::GlobalGet { global_idx } => {
                let imported = module.num_imported_globals() as u32;
                if *global_idx >= imported {
                    return Err(ValidationError::ConstExprGlobal);
                }
                let gt = module
                    .global_type(*global_idx)
                    .ok_or(ValidationError::UnknownGlobal(*global_idx))?;
                if gt.mutable {
                    return Err(ValidationError::ConstExprGlobal);
                }
                gt.value_type
            }
            Instr::End => {
                ended = true;
                continue;
            }
            _ => return Err(ValidationError::DisallowedConstInstruction),
        };
        if produced.replace(ty).is_some() {
            // A second value with no way to combine them.
            return Err(ValidationError::MalformedConstExpr);
        }
    }

    if !ended {
        return Err(ValidationError::MalformedConstExpr);
    }
    match produced {
        Some(ty) if ty == expected => Ok(()),
        Some(ty) => Err(ValidationError::TypeMismatch(format!(
            "constant expression produces {ty}, expected {expected}"
        ))),
        None => Err(ValidationError::MalformedConstExpr),
    }
}

fn validate_globals(module: &Module) -> Result<(), ValidationError> {
    for global in &module.globals {
        validate_const_expr(module, &global.init, global.ty.value_type)?;
    }
    Ok(())
}

fn validate_exports(module: &Module) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for export in &module.exports {
        if !names.insert(export.name.as_str()) {
            return Err(ValidationError::DuplicateExport(export.name.clone()));
        }
        match export.kind {
            ExportKind::Func(idx) => {
                if idx as usize >= module.num_funcs() {
                    return Err(ValidationError::UnknownFunction(idx));
                }
            }
            ExportKind::Table(idx) => {
                if idx as usize >= module.num_tables() {
                    return Err(ValidationError::UnknownTable(idx));
                }
            }
            ExportKind::Memory(idx) => {
                if idx as usize >= module.num_memories() {
                    return Err(ValidationError::UnknownMemory(idx));
                }
            }
            ExportKind::Global(idx) => {
                if idx as usize >= module.num_globals() {
                    return Err(ValidationError::UnknownGlobal(idx));
                }
            }
        }
    }
    Ok(())
}

fn validate_start(module: &Module) -> Result<(), ValidationError> {
    if let Some(start) = module.start {
        let ftype = module
            .func_type(start)
            .ok_or(ValidationError::UnknownFunction(start))?;
        if !ftype.params.is_empty() || !ftype.results.is_empty() {
            return Err(ValidationError::InvalidStartFunction);
        }
    }
    Ok(())
}

fn validate_elements(module: &Module) -> Result<(), ValidationError> {
    for segment in &module.elements {
        for func_idx in &segment.funcs {
            if *func_idx as usize >= module.num_funcs() {
                return Err(ValidationError::UnknownFunction(*func_idx));
            }
        }
        if let ElementMode::Active {
            table_index,
            offset,
        } = &segment.mode
        {
            let table = module
                .table_type(*table_index)
                .ok_or(ValidationError::UnknownTable(*table_index))?;
            if table.ref_type != segment.ref_type {
                return Err(ValidationError::TypeMismatch(format!(
                    "element segment of {} targets a table of {}",
                    segment.ref_type, table.ref_type
                )));
            }
            validate_const_expr(module, offset, ValueType::I32)?;
        }
    }
    Ok(())
}

fn validate_datas(module: &Module) -> Result<(), ValidationError> {
    for segment in &module.datas {
        if let DataMode::Active {
            memory_index,
            offset,
        } = &segment.mode
        {
            if *memory_index as usize >= module.num_memories() {
                return Err(ValidationError::UnknownMemory(*memory_index));
            }
            validate_const_expr(module, offset, ValueType::I32)?;
        }
    }
    Ok(())
}

/// Function indices that may appear in `ref.func` inside function bodies:
/// those referenced from exports, element segments, or global initializers.
fn declared_func_refs(module: &Module) -> HashSet<u32> {
    let mut declared = HashSet::new();
    for export in &module.exports {
        if let ExportKind::Func(idx) = export.kind {
            declared.insert(idx);
        }
    }
    for segment in &module.elements {
        declared.extend(segment.funcs.iter().copied());
    }
    for global in &module.globals {
        for instr in &global.init.instrs {
            if let Instr::RefFunc { func_idx } = instr {
                declared.insert(*func_idx);
            }
        }
    }
    declared
}
