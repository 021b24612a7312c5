//! In-memory representation of a decoded WebAssembly module.
//!
//! A [`Module`] is the immutable output of [`crate::decoder::decode`]: a
//! structural mirror of the binary format's sections. It carries no runtime
//! state; instantiation happens in [`crate::runtime`].
//!
//! Index spaces follow the specification: imported entities come first, in
//! import-declaration order, followed by locally defined entities.

use std::fmt;

use crate::decoder::instruction::Instr;

/// A WebAssembly value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    FuncRef,
    ExternRef,
}

impl ValueType {
    pub fn is_value_type_byte(byte: u8) -> bool {
        matches!(byte, 0x7f | 0x7e | 0x7d | 0x7c | 0x70 | 0x6f)
    }

    pub fn decode(byte: u8) -> Result<Self, String> {
        match byte {
            0x7f => Ok(ValueType::I32),
            0x7e => Ok(ValueType::I64),
            0x7d => Ok(ValueType::F32),
            0x7c => Ok(ValueType::F64),
            0x70 => Ok(ValueType::FuncRef),
            0x6f => Ok(ValueType::ExternRef),
            _ => Err(format!("invalid value type byte: 0x{byte:02x}")),
        }
    }

    pub fn emit_byte(&self) -> u8 {
        match self {
            ValueType::I32 => 0x7f,
            ValueType::I64 => 0x7e,
            ValueType::F32 => 0x7d,
            ValueType::F64 => 0x7c,
            ValueType::FuncRef => 0x70,
            ValueType::ExternRef => 0x6f,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, ValueType::FuncRef | ValueType::ExternRef)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::FuncRef => "funcref",
            ValueType::ExternRef => "externref",
        })
    }
}

/// A reference type, the element kind of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    FuncRef,
    ExternRef,
}

impl RefType {
    pub fn decode(byte: u8) -> Result<Self, String> {
        match byte {
            0x70 => Ok(RefType::FuncRef),
            0x6f => Ok(RefType::ExternRef),
            _ => Err(format!("invalid reference type byte: 0x{byte:02x}")),
        }
    }

    pub fn emit_byte(&self) -> u8 {
        match self {
            RefType::FuncRef => 0x70,
            RefType::ExternRef => 0x6f,
        }
    }
}

impl From<RefType> for ValueType {
    fn from(rt: RefType) -> Self {
        match rt {
            RefType::FuncRef => ValueType::FuncRef,
            RefType::ExternRef => ValueType::ExternRef,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RefType::FuncRef => "funcref",
            RefType::ExternRef => "externref",
        })
    }
}

/// Size limits for memories and tables, in pages and elements respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "min={} max={}", self.min, max),
            None => write!(f, "min={}", self.min),
        }
    }
}

/// A function signature: parameter and result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> (")?;
        for (i, r) in self.results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, ")")
    }
}

/// A global declaration: value type plus mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}",
            if self.mutable { "var" } else { "const" },
            self.value_type
        )
    }
}

/// A table declaration: element kind plus size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub ref_type: RefType,
    pub limits: Limits,
}

/// A constant expression: a restricted instruction sequence terminated by
/// `end`, legal only in global initializers and active segment offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    pub instrs: Vec<Instr>,
}

impl ConstExpr {
    pub fn new(instrs: Vec<Instr>) -> Self {
        ConstExpr { instrs }
    }

    /// The single non-`end` instruction, if this is the common one-instruction
    /// form.
    pub fn single(&self) -> Option<&Instr> {
        match self.instrs.as_slice() {
            [i, Instr::End] => Some(i),
            _ => None,
        }
    }
}

/// The kind-tagged payload of an import declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    /// Function import, referencing a type-section index.
    Func(u32),
    Table(TableType),
    Memory(Limits),
    Global(GlobalType),
}

/// One import: `module.field` of a given kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub kind: ImportKind,
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.field)
    }
}

/// The index-space reference of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Func(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

impl ExportKind {
    pub fn decode(byte: u8, idx: u32) -> Result<Self, String> {
        match byte {
            0x00 => Ok(ExportKind::Func(idx)),
            0x01 => Ok(ExportKind::Table(idx)),
            0x02 => Ok(ExportKind::Memory(idx)),
            0x03 => Ok(ExportKind::Global(idx)),
            _ => Err(format!("invalid export kind byte: 0x{byte:02x}")),
        }
    }
}

/// One export: a name bound to an index-space reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
}

/// A global definition: its type and constant initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub ty: GlobalType,
    pub init: ConstExpr,
}

/// How an element segment applies to a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMode {
    /// Applied automatically at instantiation.
    Active { table_index: u32, offset: ConstExpr },
    /// Recorded at instantiation, applied later via `table.init`.
    Passive,
    /// Never applied; exists only to forward-declare `ref.func` targets.
    Declarative,
}

/// An element segment: a list of function indices destined for table slots.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    pub ref_type: RefType,
    pub mode: ElementMode,
    pub funcs: Vec<u32>,
}

/// How a data segment applies to memory.
#[derive(Debug, Clone, PartialEq)]
pub enum DataMode {
    Active { memory_index: u32, offset: ConstExpr },
    Passive,
}

/// A data segment: literal bytes destined for linear memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    pub mode: DataMode,
    pub init: Vec<u8>,
}

/// Local variable declarations, stored run-length encoded as in the binary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Locals {
    entries: Vec<(u32, ValueType)>,
}

impl Locals {
    pub fn new(entries: Vec<(u32, ValueType)>) -> Self {
        Locals { entries }
    }

    /// Total number of declared locals (not counting parameters).
    pub fn count(&self) -> u32 {
        self.entries.iter().map(|(n, _)| *n).sum()
    }

    pub fn entries(&self) -> &[(u32, ValueType)] {
        &self.entries
    }

    /// Type of the declared local at `index` (0-based, after parameters).
    pub fn get(&self, index: u32) -> Option<ValueType> {
        let mut remaining = index;
        for (count, vt) in &self.entries {
            if remaining < *count {
                return Some(*vt);
            }
            remaining -= count;
        }
        None
    }

    /// Iterate each declared local's type, expanded.
    pub fn iter_types(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.entries
            .iter()
            .flat_map(|(count, vt)| std::iter::repeat(*vt).take(*count as usize))
    }
}

/// A function body: declared locals plus a flat instruction sequence
/// terminated by `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncBody {
    pub locals: Locals,
    pub instrs: Vec<Instr>,
}

/// A decoded WebAssembly module.
///
/// Immutable once produced; validation ([`crate::validator::validate`]) reads
/// it, instantiation copies what it needs into runtime structures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    pub imports: Vec<Import>,
    /// Type indices of locally defined functions, parallel to `code`.
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<Limits>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<ElementSegment>,
    pub code: Vec<FuncBody>,
    pub datas: Vec<DataSegment>,
    /// Declared data segment count, present when the data-count section was.
    pub data_count: Option<u32>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    pub fn num_imported_funcs(&self) -> usize {
        self.imports
            .iter()
            .filter(|i| matches!(i.kind, ImportKind::Func(_)))
            .count()
    }

    pub fn num_imported_tables(&self) -> usize {
        self.imports
            .iter()
            .filter(|i| matches!(i.kind, ImportKind::Table(_)))
            .count()
    }

    pub fn num_imported_memories(&self) -> usize {
        self.imports
            .iter()
            .filter(|i| matches!(i.kind, ImportKind::Memory(_)))
            .count()
    }

    pub fn num_imported_globals(&self) -> usize {
        self.imports
            .iter()
            .filter(|i| matches!(i.kind, ImportKind::Global(_)))
            .count()
    }

    /// Total size of the function index space (imports + local definitions).
    pub fn num_funcs(&self) -> usize {
        self.num_imported_funcs() + self.functions.len()
    }

    pub fn num_tables(&self) -> usize {
        self.num_imported_tables() + self.tables.len()
    }

    pub fn num_memories(&self) -> usize {
        self.num_imported_memories() + self.memories.len()
    }

    pub fn num_globals(&self) -> usize {
        self.num_imported_globals() + self.globals.len()
    }

    /// Type index of the function at `func_idx` in the full index space.
    pub fn func_type_index(&self, func_idx: u32) -> Option<u32> {
        let imported = self.num_imported_funcs();
        if (func_idx as usize) < imported {
            self.imports
                .iter()
                .filter_map(|i| match i.kind {
                    ImportKind::Func(ti) => Some(ti),
                    _ => None,
                })
                .nth(func_idx as usize)
        } else {
            self.functions.get(func_idx as usize - imported).copied()
        }
    }

    /// Signature of the function at `func_idx` in the full index space.
    pub fn func_type(&self, func_idx: u32) -> Option<&FuncType> {
        self.func_type_index(func_idx)
            .and_then(|ti| self.types.get(ti as usize))
    }

    /// The global type at `global_idx` in the full index space.
    pub fn global_type(&self, global_idx: u32) -> Option<GlobalType> {
        let imported = self.num_imported_globals();
        if (global_idx as usize) < imported {
            self.imports
                .iter()
                .filter_map(|i| match i.kind {
                    ImportKind::Global(gt) => Some(gt),
                    _ => None,
                })
                .nth(global_idx as usize)
        } else {
            self.globals
                .get(global_idx as usize - imported)
                .map(|g| g.ty)
        }
    }

    /// The table type at `table_idx` in the full index space.
    pub fn table_type(&self, table_idx: u32) -> Option<TableType> {
        let imported = self.num_imported_tables();
        if (table_idx as usize) < imported {
            self.imports
                .iter()
                .filter_map(|i| match i.kind {
                    ImportKind::Table(tt) => Some(tt),
                    _ => None,
                })
                .nth(table_idx as usize)
        } else {
            self.tables.get(table_idx as usize - imported).copied()
        }
    }

    /// The memory limits at `mem_idx` in the full index space.
    pub fn memory_limits(&self, mem_idx: u32) -> Option<Limits> {
        let imported = self.num_imported_memories();
        if (mem_idx as usize) < imported {
            self.imports
                .iter()
                .filter_map(|i| match i.kind {
                    ImportKind::Memory(l) => Some(l),
                    _ => None,
                })
                .nth(mem_idx as usize)
        } else {
            self.memories.get(mem_idx as usize - imported).copied()
        }
    }

    /// Name of the export referencing function `index`, if any.
    pub fn func_export_name(&self, index: u32) -> Option<&str> {
        self.exports.iter().find_map(|e| match e.kind {
            ExportKind::Func(i) if i == index => Some(e.name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_bytes_round_trip() {
        for byte in [0x7fu8, 0x7e, 0x7d, 0x7c, 0x70, 0x6f] {
            let vt = ValueType::decode(byte).unwrap();
            assert_eq!(vt.emit_byte(), byte);
        }
        assert!(ValueType::decode(0x7b).is_err()); // v128 is out of scope
        assert!(ValueType::decode(0x00).is_err());
    }

    #[test]
    fn index_spaces_place_imports_first() {
        let mut module = Module::new();
        module.types = vec![
            FuncType {
                params: vec![ValueType::I32],
                results: vec![],
            },
            FuncType {
                params: vec![],
                results: vec![ValueType::I64],
            },
        ];
        module.imports = vec![Import {
            module: "env".to_string(),
            field: "f".to_string(),
            kind: ImportKind::Func(0),
        }];
        module.functions = vec![1];

        assert_eq!(module.num_funcs(), 2);
        // Index 0 is the import, index 1 the local definition.
        assert_eq!(module.func_type(0).unwrap().params, vec![ValueType::I32]);
        assert_eq!(module.func_type(1).unwrap().results, vec![ValueType::I64]);
        assert!(module.func_type(2).is_none());
    }

    #[test]
    fn locals_expansion() {
        let locals = Locals::new(vec![(2, ValueType::I32), (1, ValueType::F64)]);
        assert_eq!(locals.count(), 3);
        assert_eq!(locals.get(0), Some(ValueType::I32));
        assert_eq!(locals.get(1), Some(ValueType::I32));
        assert_eq!(locals.get(2), Some(ValueType::F64));
        assert_eq!(locals.get(3), None);
        let expanded: Vec<_> = locals.iter_types().collect();
        assert_eq!(
            expanded,
            vec![ValueType::I32, ValueType::I32, ValueType::F64]
        );
    }

    #[test]
    fn global_type_lookup_spans_imports() {
        let mut module = Module::new();
        module.imports = vec![Import {
            module: "env".to_string(),
            field: "g".to_string(),
            kind: ImportKind::Global(GlobalType {
                value_type: ValueType::I64,
                mutable: false,
            }),
        }];
        module.globals = vec![Global {
            ty: GlobalType {
                value_type: ValueType::I32,
                mutable: true,
            },
            init: ConstExpr::new(vec![Instr::I32Const { value: 0 }, Instr::End]),
        }];

        assert_eq!(module.global_type(0).unwrap().value_type, ValueType::I64);
        assert!(module.global_type(1).unwrap().mutable);
        assert!(module.global_type(2).is_none());
    }
}
