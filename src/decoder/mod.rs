//! Binary format decoder.
//!
//! [`decode`] consumes a byte slice and produces a [`Module`], or fails with
//! a [`DecodeError`] identifying the byte offset and the construct that was
//! being read. Decoding is a single forward pass: the header first, then each
//! section by its id byte, with declared section sizes checked against the
//! bytes actually consumed. Custom sections are skipped; unknown section ids
//! are rejected.

pub mod encoding;
pub mod instruction;
pub mod limits;
pub mod reader;

use log::debug;
use thiserror::Error;

use crate::module::{
    ConstExpr, DataMode, DataSegment, ElementMode, ElementSegment, Export, ExportKind, FuncBody,
    FuncType, Global, GlobalType, Import, ImportKind, Limits, Locals, Module, RefType, TableType,
    ValueType,
};
use instruction::decode_expr;
use reader::Reader;

/// Failure while decoding a binary module.
#[derive(Debug, Error)]
#[error("decode error at offset {offset:#x}: {kind}")]
pub struct DecodeError {
    /// Byte offset in the input at which the offending construct started.
    pub offset: usize,
    pub kind: DecodeErrorKind,
}

/// What went wrong during decoding.
#[derive(Debug, Error)]
pub enum DecodeErrorKind {
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("bad magic number, expected \\0asm")]
    BadMagic,

    #[error("unsupported binary version {0}")]
    BadVersion(u32),

    #[error("malformed LEB128 integer")]
    BadInteger,

    #[error("invalid UTF-8 in name")]
    InvalidUtf8,

    #[error("unknown section id {0}")]
    UnknownSection(u8),

    #[error("section id {0} out of order")]
    SectionOrder(u8),

    #[error("section size mismatch: declared {declared} bytes, consumed {consumed}")]
    SectionSize { declared: u32, consumed: u32 },

    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("unknown sub-opcode {0:#04x} {1}")]
    UnknownSubOpcode(u8, u32),

    #[error("invalid block type")]
    InvalidBlockType,

    #[error("{what} count {count} exceeds implementation limit {limit}")]
    CountLimit {
        what: &'static str,
        count: u32,
        limit: u32,
    },

    #[error("function section declares {functions} bodies, code section has {bodies}")]
    FuncCodeMismatch { functions: u32, bodies: u32 },

    #[error("data count section declares {declared} segments, data section has {actual}")]
    DataCountMismatch { declared: u32, actual: u32 },

    #[error("{0}")]
    Malformed(String),
}

fn check_limit(
    reader: &Reader,
    count: u32,
    limit: u32,
    what: &'static str,
) -> Result<(), DecodeError> {
    if count > limit {
        return Err(reader.err(DecodeErrorKind::CountLimit { what, count, limit }));
    }
    reader.check_count(count, what)
}

/// Decode a binary module.
pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut reader = Reader::new(bytes);
    let mut module = Module::new();

    read_header(&mut reader)?;

    // Non-custom sections must appear in ascending rank; the data-count
    // section (id 12) sits between element (9) and code (10) on the wire.
    let mut last_rank: u8 = 0;
    while reader.has_at_least(1) {
        let sec_start = reader.pos();
        let sec_id = reader.read_byte("section id")?;
        let sec_len = reader.read_vu32("section size")?;
        if !reader.has_at_least(sec_len as usize) {
            return Err(reader.err_at(
                sec_start,
                DecodeErrorKind::UnexpectedEof("section payload"),
            ));
        }

        if sec_id != encoding::SECTION_CUSTOM {
            let rank = section_rank(sec_id)
                .ok_or_else(|| reader.err_at(sec_start, DecodeErrorKind::UnknownSection(sec_id)))?;
            if rank <= last_rank {
                return Err(reader.err_at(sec_start, DecodeErrorKind::SectionOrder(sec_id)));
            }
            last_rank = rank;
        }

        debug!("section #{sec_id} at {sec_start:#x}, {sec_len} bytes");

        let payload_start = reader.pos();
        if sec_id == encoding::SECTION_CUSTOM {
            // Custom sections are skipped, not interpreted; the name must
            // still be well-formed and fit inside the declared size.
            let _name = reader.read_name()?;
            let consumed = reader.pos() - payload_start;
            if consumed > sec_len as usize {
                return Err(reader.err_at(
                    payload_start,
                    DecodeErrorKind::Malformed("custom section name exceeds section size".into()),
                ));
            }
            reader.skip(sec_len as usize - consumed, "custom section payload")?;
            continue;
        }
        read_section(sec_id, &mut reader, &mut module)?;

        let consumed = (reader.pos() - payload_start) as u32;
        if consumed != sec_len {
            return Err(reader.err_at(
                payload_start,
                DecodeErrorKind::SectionSize {
                    declared: sec_len,
                    consumed,
                },
            ));
        }
    }

    if module.code.len() != module.functions.len() {
        return Err(reader.err(DecodeErrorKind::FuncCodeMismatch {
            functions: module.functions.len() as u32,
            bodies: module.code.len() as u32,
        }));
    }
    if let Some(declared) = module.data_count {
        if declared as usize != module.datas.len() {
            return Err(reader.err(DecodeErrorKind::DataCountMismatch {
                declared,
                actual: module.datas.len() as u32,
            }));
        }
    }

    Ok(module)
}

fn section_rank(sec_id: u8) -> Option<u8> {
    match sec_id {
        encoding::SECTION_TYPE => Some(1),
        encoding::SECTION_IMPORT => Some(2),
        encoding::SECTION_FUNCTION => Some(3),
        encoding::SECTION_TABLE => Some(4),
        encoding::SECTION_MEMORY => Some(5),
        encoding::SECTION_GLOBAL => Some(6),
        encoding::SECTION_EXPORT => Some(7),
        encoding::SECTION_START => Some(8),
        encoding::SECTION_ELEMENT => Some(9),
        encoding::SECTION_DATA_COUNT => Some(10),
        encoding::SECTION_CODE => Some(11),
        encoding::SECTION_DATA => Some(12),
        _ => None,
    }
}

fn read_header(reader: &mut Reader) -> Result<(), DecodeError> {
    let magic = reader.read_bytes(4, "magic number")?;
    if magic != encoding::MAGIC {
        return Err(reader.err_at(0, DecodeErrorKind::BadMagic));
    }
    let version = reader.read_u32("version")?;
    if version != encoding::VERSION {
        return Err(reader.err_at(4, DecodeErrorKind::BadVersion(version)));
    }
    Ok(())
}

fn read_section(sec_id: u8, reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    match sec_id {
        encoding::SECTION_TYPE => read_section_type(reader, module),
        encoding::SECTION_IMPORT => read_section_import(reader, module),
        encoding::SECTION_FUNCTION => read_section_function(reader, module),
        encoding::SECTION_TABLE => read_section_table(reader, module),
        encoding::SECTION_MEMORY => read_section_memory(reader, module),
        encoding::SECTION_GLOBAL => read_section_global(reader, module),
        encoding::SECTION_EXPORT => read_section_export(reader, module),
        encoding::SECTION_START => read_section_start(reader, module),
        encoding::SECTION_ELEMENT => read_section_element(reader, module),
        encoding::SECTION_CODE => read_section_code(reader, module),
        encoding::SECTION_DATA => read_section_data(reader, module),
        encoding::SECTION_DATA_COUNT => read_section_data_count(reader, module),
        // read_section is only reached for ids section_rank accepted
        _ => Err(reader.err(DecodeErrorKind::UnknownSection(sec_id))),
    }
}

fn read_value_types(
    reader: &mut Reader,
    what: &'static str,
    limit: u32,
) -> Result<Vec<ValueType>, DecodeError> {
    let count = reader.read_vu32(what)?;
    check_limit(reader, count, limit, what)?;
    let mut types = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = reader.pos();
        let byte = reader.read_byte(what)?;
        let vt = ValueType::decode(byte)
            .map_err(|e| reader.err_at(start, DecodeErrorKind::Malformed(e)))?;
        types.push(vt);
    }
    Ok(types)
}

fn read_section_type(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("type count")?;
    check_limit(reader, count, limits::MAX_TYPES, "type")?;

    for _ in 0..count {
        let start = reader.pos();
        if reader.read_byte("function type tag")? != encoding::TYPE_FUNC {
            return Err(reader.err_at(
                start,
                DecodeErrorKind::Malformed("expected 0x60 to lead function type".into()),
            ));
        }
        let params = read_value_types(reader, "parameter type", limits::MAX_FUNCTION_ARITY)?;
        let results = read_value_types(reader, "result type", limits::MAX_FUNCTION_ARITY)?;
        module.types.push(FuncType { params, results });
    }
    Ok(())
}

fn read_limits(reader: &mut Reader) -> Result<Limits, DecodeError> {
    let start = reader.pos();
    let flag = reader.read_byte("limits flag")?;
    match flag {
        0x00 => Ok(Limits {
            min: reader.read_vu32("limits minimum")?,
            max: None,
        }),
        0x01 => Ok(Limits {
            min: reader.read_vu32("limits minimum")?,
            max: Some(reader.read_vu32("limits maximum")?),
        }),
        _ => Err(reader.err_at(
            start,
            DecodeErrorKind::Malformed(format!("invalid limits flag {flag:#04x}")),
        )),
    }
}

fn read_table_type(reader: &mut Reader) -> Result<TableType, DecodeError> {
    let start = reader.pos();
    let byte = reader.read_byte("table element type")?;
    let ref_type =
        RefType::decode(byte).map_err(|e| reader.err_at(start, DecodeErrorKind::Malformed(e)))?;
    let limits = read_limits(reader)?;
    Ok(TableType { ref_type, limits })
}

fn read_global_type(reader: &mut Reader) -> Result<GlobalType, DecodeError> {
    let start = reader.pos();
    let byte = reader.read_byte("global value type")?;
    let value_type =
        ValueType::decode(byte).map_err(|e| reader.err_at(start, DecodeErrorKind::Malformed(e)))?;
    let mutable = reader.read_vu1("global mutability")?;
    Ok(GlobalType {
        value_type,
        mutable,
    })
}

fn read_section_import(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("import count")?;
    check_limit(reader, count, limits::MAX_IMPORTS, "import")?;

    for _ in 0..count {
        let import_module = reader.read_name()?;
        let field = reader.read_name()?;
        let kind_start = reader.pos();
        let kind = match reader.read_byte("import kind")? {
            encoding::DESC_FUNC => ImportKind::Func(reader.read_vu32("import type index")?),
            encoding::DESC_TABLE => ImportKind::Table(read_table_type(reader)?),
            encoding::DESC_MEMORY => ImportKind::Memory(read_limits(reader)?),
            encoding::DESC_GLOBAL => ImportKind::Global(read_global_type(reader)?),
            b => {
                return Err(reader.err_at(
                    kind_start,
                    DecodeErrorKind::Malformed(format!("invalid import kind {b:#04x}")),
                ))
            }
        };
        module.imports.push(Import {
            module: import_module,
            field,
            kind,
        });
    }
    Ok(())
}

fn read_section_function(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("function count")?;
    check_limit(reader, count, limits::MAX_FUNCTIONS, "function")?;

    for _ in 0..count {
        module.functions.push(reader.read_vu32("function type index")?);
    }
    Ok(())
}

fn read_section_table(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("table count")?;
    reader.check_count(count, "table")?;
    for _ in 0..count {
        module.tables.push(read_table_type(reader)?);
    }
    Ok(())
}

fn read_section_memory(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("memory count")?;
    reader.check_count(count, "memory")?;
    for _ in 0..count {
        module.memories.push(read_limits(reader)?);
    }
    Ok(())
}

fn read_section_global(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("global count")?;
    check_limit(reader, count, limits::MAX_GLOBALS, "global")?;

    for _ in 0..count {
        let ty = read_global_type(reader)?;
        let init = ConstExpr::new(decode_expr(reader)?);
        module.globals.push(Global { ty, init });
    }
    Ok(())
}

fn read_section_export(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("export count")?;
    check_limit(reader, count, limits::MAX_EXPORTS, "export")?;

    for _ in 0..count {
        let name = reader.read_name()?;
        let kind_start = reader.pos();
        let kind_byte = reader.read_byte("export kind")?;
        let idx = reader.read_vu32("export index")?;
        let kind = ExportKind::decode(kind_byte, idx)
            .map_err(|e| reader.err_at(kind_start, DecodeErrorKind::Malformed(e)))?;
        module.exports.push(Export { name, kind });
    }
    Ok(())
}

fn read_section_start(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    module.start = Some(reader.read_vu32("start function index")?);
    Ok(())
}

fn read_func_indices(reader: &mut Reader) -> Result<Vec<u32>, DecodeError> {
    let count = reader.read_vu32("element function count")?;
    reader.check_count(count, "element function")?;
    let mut funcs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        funcs.push(reader.read_vu32("element function index")?);
    }
    Ok(funcs)
}

fn read_elemkind(reader: &mut Reader) -> Result<RefType, DecodeError> {
    let start = reader.pos();
    match reader.read_byte("element kind")? {
        0x00 => Ok(RefType::FuncRef),
        b => Err(reader.err_at(
            start,
            DecodeErrorKind::Malformed(format!("invalid element kind {b:#04x}")),
        )),
    }
}

fn read_section_element(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("element segment count")?;
    check_limit(reader, count, limits::MAX_ELEMENT_SEGMENTS, "element segment")?;

    // Flags 0-3 cover the function-index encodings; the expression-based
    // encodings (4-7) fall outside this crate's scope.
    for _ in 0..count {
        let flags_start = reader.pos();
        let flags = reader.read_vu32("element segment flags")?;
        let segment = match flags {
            0 => {
                let offset = ConstExpr::new(decode_expr(reader)?);
                ElementSegment {
                    ref_type: RefType::FuncRef,
                    mode: ElementMode::Active {
                        table_index: 0,
                        offset,
                    },
                    funcs: read_func_indices(reader)?,
                }
            }
            1 => {
                let ref_type = read_elemkind(reader)?;
                ElementSegment {
                    ref_type,
                    mode: ElementMode::Passive,
                    funcs: read_func_indices(reader)?,
                }
            }
            2 => {
                let table_index = reader.read_vu32("element table index")?;
                let offset = ConstExpr::new(decode_expr(reader)?);
                let ref_type = read_elemkind(reader)?;
                ElementSegment {
                    ref_type,
                    mode: ElementMode::Active {
                        table_index,
                        offset,
                    },
                    funcs: read_func_indices(reader)?,
                }
            }
            3 => {
                let ref_type = read_elemkind(reader)?;
                ElementSegment {
                    ref_type,
                    mode: ElementMode::Declarative,
                    funcs: read_func_indices(reader)?,
                }
            }
            _ => {
                return Err(reader.err_at(
                    flags_start,
                    DecodeErrorKind::Malformed(format!(
                        "unsupported element segment flags {flags}"
                    )),
                ))
            }
        };
        module.elements.push(segment);
    }
    Ok(())
}

fn read_section_code(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("code body count")?;
    check_limit(reader, count, limits::MAX_FUNCTIONS, "code body")?;

    if count as usize != module.functions.len() {
        return Err(reader.err(DecodeErrorKind::FuncCodeMismatch {
            functions: module.functions.len() as u32,
            bodies: count,
        }));
    }

    for _ in 0..count {
        let body_size = reader.read_vu32("code body size")?;
        let body_start = reader.pos();

        let group_count = reader.read_vu32("local group count")?;
        reader.check_count(group_count, "local group")?;
        let mut entries = Vec::with_capacity(group_count as usize);
        let mut total_locals: u64 = 0;
        for _ in 0..group_count {
            let n = reader.read_vu32("local count")?;
            let ty_start = reader.pos();
            let byte = reader.read_byte("local type")?;
            let vt = ValueType::decode(byte)
                .map_err(|e| reader.err_at(ty_start, DecodeErrorKind::Malformed(e)))?;
            total_locals += n as u64;
            if total_locals > limits::MAX_FUNCTION_LOCALS as u64 {
                return Err(reader.err_at(
                    ty_start,
                    DecodeErrorKind::CountLimit {
                        what: "local",
                        count: total_locals as u32,
                        limit: limits::MAX_FUNCTION_LOCALS,
                    },
                ));
            }
            entries.push((n, vt));
        }

        let instrs = decode_expr(reader)?;

        let consumed = (reader.pos() - body_start) as u32;
        if consumed != body_size {
            return Err(reader.err_at(
                body_start,
                DecodeErrorKind::SectionSize {
                    declared: body_size,
                    consumed,
                },
            ));
        }

        module.code.push(FuncBody {
            locals: Locals::new(entries),
            instrs,
        });
    }
    Ok(())
}

fn read_section_data(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    let count = reader.read_vu32("data segment count")?;
    check_limit(reader, count, limits::MAX_DATA_SEGMENTS, "data segment")?;

    for _ in 0..count {
        let flags_start = reader.pos();
        let flags = reader.read_vu32("data segment flags")?;
        let segment = match flags {
            0 => {
                let offset = ConstExpr::new(decode_expr(reader)?);
                DataSegment {
                    mode: DataMode::Active {
                        memory_index: 0,
                        offset,
                    },
                    init: reader.read_byte_vec("data segment bytes")?,
                }
            }
            1 => DataSegment {
                mode: DataMode::Passive,
                init: reader.read_byte_vec("data segment bytes")?,
            },
            2 => {
                let memory_index = reader.read_vu32("data memory index")?;
                let offset = ConstExpr::new(decode_expr(reader)?);
                DataSegment {
                    mode: DataMode::Active {
                        memory_index,
                        offset,
                    },
                    init: reader.read_byte_vec("data segment bytes")?,
                }
            }
            _ => {
                return Err(reader.err_at(
                    flags_start,
                    DecodeErrorKind::Malformed(format!("invalid data segment flags {flags}")),
                ))
            }
        };
        module.datas.push(segment);
    }
    Ok(())
}

fn read_section_data_count(reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    module.data_count = Some(reader.read_vu32("data segment count")?);
    Ok(())
}
