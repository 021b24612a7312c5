//! Binary format encoder, the inverse of [`crate::decoder::decode`].
//!
//! Produces the magic/version header followed by each non-empty section in
//! wire order, with minimal LEB128 encodings throughout. Decoding the output
//! yields a structurally identical [`Module`].

use crate::decoder::encoding::{
    write_f32, write_f64, write_name, write_vs32, write_vs64, write_vu32, BLOCK_TYPE_EMPTY,
    DESC_FUNC, DESC_GLOBAL, DESC_MEMORY, DESC_TABLE, MAGIC, OP_END, SECTION_CODE, SECTION_DATA,
    SECTION_DATA_COUNT, SECTION_ELEMENT, SECTION_EXPORT, SECTION_FUNCTION, SECTION_GLOBAL,
    SECTION_IMPORT, SECTION_MEMORY, SECTION_START, SECTION_TABLE, SECTION_TYPE, TYPE_FUNC, VERSION,
};
use crate::decoder::instruction::{BlockType, Instr, MemArg};
use crate::module::{
    ConstExpr, DataMode, ElementMode, ExportKind, FuncType, GlobalType, ImportKind, Limits, Module,
    TableType,
};

/// Encode a module to binary form.
pub fn encode(module: &Module) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());

    if !module.types.is_empty() {
        write_section(&mut buf, SECTION_TYPE, |body| {
            write_vu32(body, module.types.len() as u32);
            for ftype in &module.types {
                write_func_type(body, ftype);
            }
        });
    }

    if !module.imports.is_empty() {
        write_section(&mut buf, SECTION_IMPORT, |body| {
            write_vu32(body, module.imports.len() as u32);
            for import in &module.imports {
                write_name(body, &import.module);
                write_name(body, &import.field);
                match &import.kind {
                    ImportKind::Func(type_idx) => {
                        body.push(DESC_FUNC);
                        write_vu32(body, *type_idx);
                    }
                    ImportKind::Table(tt) => {
                        body.push(DESC_TABLE);
                        write_table_type(body, tt);
                    }
                    ImportKind::Memory(limits) => {
                        body.push(DESC_MEMORY);
                        write_limits(body, limits);
                    }
                    ImportKind::Global(gt) => {
                        body.push(DESC_GLOBAL);
                        write_global_type(body, gt);
                    }
                }
            }
        });
    }

    if !module.functions.is_empty() {
        write_section(&mut buf, SECTION_FUNCTION, |body| {
            write_vu32(body, module.functions.len() as u32);
            for type_idx in &module.functions {
                write_vu32(body, *type_idx);
            }
        });
    }

    if !module.tables.is_empty() {
        write_section(&mut buf, SECTION_TABLE, |body| {
            write_vu32(body, module.tables.len() as u32);
            for table in &module.tables {
                write_table_type(body, table);
            }
        });
    }

    if !module.memories.is_empty() {
        write_section(&mut buf, SECTION_MEMORY, |body| {
            write_vu32(body, module.memories.len() as u32);
            for limits in &module.memories {
                write_limits(body, limits);
            }
        });
    }

    if !module.globals.is_empty() {
        write_section(&mut buf, SECTION_GLOBAL, |body| {
            write_vu32(body, module.globals.len() as u32);
            for global in &module.globals {
                write_global_type(body, &global.ty);
                write_const_expr(body, &global.init);
            }
        });
    }

    if !module.exports.is_empty() {
        write_section(&mut buf, SECTION_EXPORT, |body| {
            write_vu32(body, module.exports.len() as u32);
            for export in &module.exports {
                write_name(body, &export.name);
                let (kind, idx) = match export.kind {
                    ExportKind::Func(i) => (DESC_FUNC, i),
                    ExportKind::Table(i) => (DESC_TABLE, i),
                    ExportKind::Memory(i) => (DESC_MEMORY, i),
                    ExportKind::Global(i) => (DESC_GLOBAL, i),
                };
                body.push(kind);
                write_vu32(body, idx);
            }
        });
    }

    if let Some(start) = module.start {
        write_section(&mut buf, SECTION_START, |body| {
            write_vu32(body, start);
        });
    }

    if !module.elements.is_empty() {
        write_section(&mut buf, SECTION_ELEMENT, |body| {
            write_vu32(body, module.elements.len() as u32);
            for segment in &module.elements {
                match &segment.mode {
                    ElementMode::Active {
                        table_index: 0,
                        offset,
                    } => {
                        write_vu32(body, 0);
                        write_const_expr(body, offset);
                    }
                    ElementMode::Active {
                        table_index,
                        offset,
                    } => {
                        write_vu32(body, 2);
                        write_vu32(body, *table_index);
                        write_const_expr(body, offset);
                        body.push(0x00); // elemkind: funcref
                    }
                    ElementMode::Passive => {
                        write_vu32(body, 1);
                        body.push(0x00);
                    }
                    ElementMode::Declarative => {
                        write_vu32(body, 3);
                        body.push(0x00);
                    }
                }
                write_vu32(body, segment.funcs.len() as u32);
                for func_idx in &segment.funcs {
                    write_vu32(body, *func_idx);
                }
            }
        });
    }

    if let Some(count) = module.data_count {
        write_section(&mut buf, SECTION_DATA_COUNT, |body| {
            write_vu32(body, count);
        });
    }

    if !module.code.is_empty() {
        write_section(&mut buf, SECTION_CODE, |body| {
            write_vu32(body, module.code.len() as u32);
            for func in &module.code {
                let mut func_body = Vec::new();
                let entries = func.locals.entries();
                write_vu32(&mut func_body, entries.len() as u32);
                for (count, vt) in entries {
                    write_vu32(&mut func_body, *count);
                    func_body.push(vt.emit_byte());
                }
                for instr in &func.instrs {
                    write_instr(&mut func_body, instr);
                }
                write_vu32(body, func_body.len() as u32);
                body.extend_from_slice(&func_body);
            }
        });
    }

    if !module.datas.is_empty() {
        write_section(&mut buf, SECTION_DATA, |body| {
            write_vu32(body, module.datas.len() as u32);
            for segment in &module.datas {
                match &segment.mode {
                    DataMode::Active {
                        memory_index: 0,
                        offset,
                    } => {
                        write_vu32(body, 0);
                        write_const_expr(body, offset);
                    }
                    DataMode::Active {
                        memory_index,
                        offset,
                    } => {
                        write_vu32(body, 2);
                        write_vu32(body, *memory_index);
                        write_const_expr(body, offset);
                    }
                    DataMode::Passive => {
                        write_vu32(body, 1);
                    }
                }
                write_vu32(body, segment.init.len() as u32);
                body.extend_from_slice(&segment.init);
            }
        });
    }

    buf
}

fn write_section(buf: &mut Vec<u8>, id: u8, fill: impl FnOnce(&mut Vec<u8>)) {
    let mut body = Vec::new();
    fill(&mut body);
    buf.push(id);
    write_vu32(buf, body.len() as u32);
    buf.extend_from_slice(&body);
}

fn write_func_type(buf: &mut Vec<u8>, ftype: &FuncType) {
    buf.push(TYPE_FUNC);
    write_vu32(buf, ftype.params.len() as u32);
    for p in &ftype.params {
        buf.push(p.emit_byte());
    }
    write_vu32(buf, ftype.results.len() as u32);
    for r in &ftype.results {
        buf.push(r.emit_byte());
    }
}

fn write_limits(buf: &mut Vec<u8>, limits: &Limits) {
    match limits.max {
        None => {
            buf.push(0x00);
            write_vu32(buf, limits.min);
        }
        Some(max) => {
            buf.push(0x01);
            write_vu32(buf, limits.min);
            write_vu32(buf, max);
        }
    }
}

fn write_table_type(buf: &mut Vec<u8>, tt: &TableType) {
    buf.push(tt.ref_type.emit_byte());
    write_limits(buf, &tt.limits);
}

fn write_global_type(buf: &mut Vec<u8>, gt: &GlobalType) {
    buf.push(gt.value_type.emit_byte());
    buf.push(if gt.mutable { 0x01 } else { 0x00 });
}

fn write_const_expr(buf: &mut Vec<u8>, expr: &ConstExpr) {
    for instr in &expr.instrs {
        write_instr(buf, instr);
    }
}

fn write_block_type(buf: &mut Vec<u8>, bt: &BlockType) {
    match bt {
        BlockType::Empty => buf.push(BLOCK_TYPE_EMPTY),
        BlockType::Value(vt) => buf.push(vt.emit_byte()),
        BlockType::Func(ti) => write_vs64(buf, *ti as i64),
    }
}

fn write_memarg(buf: &mut Vec<u8>, memarg: &MemArg) {
    write_vu32(buf, memarg.align);
    write_vu32(buf, memarg.offset);
}

/// Append the binary encoding of one instruction.
pub fn write_instr(buf: &mut Vec<u8>, instr: &Instr) {
    use Instr::*;

    match instr {
        Unreachable => buf.push(0x00),
        Nop => buf.push(0x01),
        Block { block_type } => {
            buf.push(0x02);
            write_block_type(buf, block_type);
        }
        Loop { block_type } => {
            buf.push(0x03);
            write_block_type(buf, block_type);
        }
        If { block_type } => {
            buf.push(0x04);
            write_block_type(buf, block_type);
        }
        Else => buf.push(0x05),
        End => buf.push(OP_END),
        Br { label_idx } => {
            buf.push(0x0c);
            write_vu32(buf, *label_idx);
        }
        BrIf { label_idx } => {
            buf.push(0x0d);
            write_vu32(buf, *label_idx);
        }
        BrTable { labels, default } => {
            buf.push(0x0e);
            write_vu32(buf, labels.len() as u32);
            for label in labels {
                write_vu32(buf, *label);
            }
            write_vu32(buf, *default);
        }
        Return => buf.push(0x0f),
        Call { func_idx } => {
            buf.push(0x10);
            write_vu32(buf, *func_idx);
        }
        CallIndirect {
            type_idx,
            table_idx,
        } => {
            buf.push(0x11);
            write_vu32(buf, *type_idx);
            write_vu32(buf, *table_idx);
        }

        RefNull { ref_type } => {
            buf.push(0xd0);
            buf.push(ref_type.emit_byte());
        }
        RefIsNull => buf.push(0xd1),
        RefFunc { func_idx } => {
            buf.push(0xd2);
            write_vu32(buf, *func_idx);
        }

        Drop => buf.push(0x1a),
        Select => buf.push(0x1b),
        SelectTyped { types } => {
            buf.push(0x1c);
            write_vu32(buf, types.len() as u32);
            for t in types {
                buf.push(t.emit_byte());
            }
        }

        LocalGet { local_idx } => {
            buf.push(0x20);
            write_vu32(buf, *local_idx);
        }
        LocalSet { local_idx } => {
            buf.push(0x21);
            write_vu32(buf, *local_idx);
        }
        LocalTee { local_idx } => {
            buf.push(0x22);
            write_vu32(buf, *local_idx);
        }
        GlobalGet { global_idx } => {
            buf.push(0x23);
            write_vu32(buf, *global_idx);
        }
        GlobalSet { global_idx } => {
            buf.push(0x24);
            write_vu32(buf, *global_idx);
        }

        TableGet { table_idx } => {
            buf.push(0x25);
            write_vu32(buf, *table_idx);
        }
        TableSet { table_idx } => {
            buf.push(0x26);
            write_vu32(buf, *table_idx);
        }
        TableInit {
            elem_idx,
            table_idx,
        } => {
            buf.push(0xfc);
            write_vu32(buf, 12);
            write_vu32(buf, *elem_idx);
            write_vu32(buf, *table_idx);
        }
        ElemDrop { elem_idx } => {
            buf.push(0xfc);
            write_vu32(buf, 13);
            write_vu32(buf, *elem_idx);
        }
        TableCopy {
            dst_table,
            src_table,
        } => {
            buf.push(0xfc);
            write_vu32(buf, 14);
            write_vu32(buf, *dst_table);
            write_vu32(buf, *src_table);
        }
        TableGrow { table_idx } => {
            buf.push(0xfc);
            write_vu32(buf, 15);
            write_vu32(buf, *table_idx);
        }
        TableSize { table_idx } => {
            buf.push(0xfc);
            write_vu32(buf, 16);
            write_vu32(buf, *table_idx);
        }
        TableFill { table_idx } => {
            buf.push(0xfc);
            write_vu32(buf, 17);
            write_vu32(buf, *table_idx);
        }

        I32Load { memarg } => write_mem_instr(buf, 0x28, memarg),
        I64Load { memarg } => write_mem_instr(buf, 0x29, memarg),
        F32Load { memarg } => write_mem_instr(buf, 0x2a, memarg),
        F64Load { memarg } => write_mem_instr(buf, 0x2b, memarg),
        I32Load8S { memarg } => write_mem_instr(buf, 0x2c, memarg),
        I32Load8U { memarg } => write_mem_instr(buf, 0x2d, memarg),
        I32Load16S { memarg } => write_mem_instr(buf, 0x2e, memarg),
        I32Load16U { memarg } => write_mem_instr(buf, 0x2f, memarg),
        I64Load8S { memarg } => write_mem_instr(buf, 0x30, memarg),
        I64Load8U { memarg } => write_mem_instr(buf, 0x31, memarg),
        I64Load16S { memarg } => write_mem_instr(buf, 0x32, memarg),
        I64Load16U { memarg } => write_mem_instr(buf, 0x33, memarg),
        I64Load32S { memarg } => write_mem_instr(buf, 0x34, memarg),
        I64Load32U { memarg } => write_mem_instr(buf, 0x35, memarg),
        I32Store { memarg } => write_mem_instr(buf, 0x36, memarg),
        I64Store { memarg } => write_mem_instr(buf, 0x37, memarg),
        F32Store { memarg } => write_mem_instr(buf, 0x38, memarg),
        F64Store { memarg } => write_mem_instr(buf, 0x39, memarg),
        I32Store8 { memarg } => write_mem_instr(buf, 0x3a, memarg),
        I32Store16 { memarg } => write_mem_instr(buf, 0x3b, memarg),
        I64Store8 { memarg } => write_mem_instr(buf, 0x3c, memarg),
        I64Store16 { memarg } => write_mem_instr(buf, 0x3d, memarg),
        I64Store32 { memarg } => write_mem_instr(buf, 0x3e, memarg),
        MemorySize => {
            buf.push(0x3f);
            buf.push(0x00);
        }
        MemoryGrow => {
            buf.push(0x40);
            buf.push(0x00);
        }
        MemoryInit { data_idx } => {
            buf.push(0xfc);
            write_vu32(buf, 8);
            write_vu32(buf, *data_idx);
            buf.push(0x00);
        }
        DataDrop { data_idx } => {
            buf.push(0xfc);
            write_vu32(buf, 9);
            write_vu32(buf, *data_idx);
        }
        MemoryCopy => {
            buf.push(0xfc);
            write_vu32(buf, 10);
            buf.push(0x00);
            buf.push(0x00);
        }
        MemoryFill => {
            buf.push(0xfc);
            write_vu32(buf, 11);
            buf.push(0x00);
        }

        I32Const { value } => {
            buf.push(0x41);
            write_vs32(buf, *value);
        }
        I64Const { value } => {
            buf.push(0x42);
            write_vs64(buf, *value);
        }
        F32Const { value } => {
            buf.push(0x43);
            write_f32(buf, *value);
        }
        F64Const { value } => {
            buf.push(0x44);
            write_f64(buf, *value);
        }

        // The remaining instructions are bare opcodes, except the saturating
        // truncations which carry the 0xFC prefix.
        plain => match sat_sub_opcode(plain) {
            Some(sub) => {
                buf.push(0xfc);
                write_vu32(buf, sub);
            }
            None => buf.push(plain_opcode(plain)),
        },
    }
}

fn write_mem_instr(buf: &mut Vec<u8>, opcode: u8, memarg: &MemArg) {
    buf.push(opcode);
    write_memarg(buf, memarg);
}

fn plain_opcode(instr: &Instr) -> u8 {
    use Instr::*;

    match instr {
        I32Eqz => 0x45,
        I32Eq => 0x46,
        I32Ne => 0x47,
        I32LtS => 0x48,
        I32LtU => 0x49,
        I32GtS => 0x4a,
        I32GtU => 0x4b,
        I32LeS => 0x4c,
        I32LeU => 0x4d,
        I32GeS => 0x4e,
        I32GeU => 0x4f,

        I64Eqz => 0x50,
        I64Eq => 0x51,
        I64Ne => 0x52,
        I64LtS => 0x53,
        I64LtU => 0x54,
        I64GtS => 0x55,
        I64GtU => 0x56,
        I64LeS => 0x57,
        I64LeU => 0x58,
        I64GeS => 0x59,
        I64GeU => 0x5a,

        F32Eq => 0x5b,
        F32Ne => 0x5c,
        F32Lt => 0x5d,
        F32Gt => 0x5e,
        F32Le => 0x5f,
        F32Ge => 0x60,

        F64Eq => 0x61,
        F64Ne => 0x62,
        F64Lt => 0x63,
        F64Gt => 0x64,
        F64Le => 0x65,
        F64Ge => 0x66,

        I32Clz => 0x67,
        I32Ctz => 0x68,
        I32Popcnt => 0x69,
        I32Add => 0x6a,
        I32Sub => 0x6b,
        I32Mul => 0x6c,
        I32DivS => 0x6d,
        I32DivU => 0x6e,
        I32RemS => 0x6f,
        I32RemU => 0x70,
        I32And => 0x71,
        I32Or => 0x72,
        I32Xor => 0x73,
        I32Shl => 0x74,
        I32ShrS => 0x75,
        I32ShrU => 0x76,
        I32Rotl => 0x77,
        I32Rotr => 0x78,

        I64Clz => 0x79,
        I64Ctz => 0x7a,
        I64Popcnt => 0x7b,
        I64Add => 0x7c,
        I64Sub => 0x7d,
        I64Mul => 0x7e,
        I64DivS => 0x7f,
        I64DivU => 0x80,
        I64RemS => 0x81,
        I64RemU => 0x82,
        I64And => 0x83,
        I64Or => 0x84,
        I64Xor => 0x85,
        I64Shl => 0x86,
        I64ShrS => 0x87,
        I64ShrU => 0x88,
        I64Rotl => 0x89,
        I64Rotr => 0x8a,

        F32Abs => 0x8b,
        F32Neg => 0x8c,
        F32Ceil => 0x8d,
        F32Floor => 0x8e,
        F32Trunc => 0x8f,
        F32Nearest => 0x90,
        F32Sqrt => 0x91,
        F32Add => 0x92,
        F32Sub => 0x93,
        F32Mul => 0x94,
        F32Div => 0x95,
        F32Min => 0x96,
        F32Max => 0x97,
        F32Copysign => 0x98,

        F64Abs => 0x99,
        F64Neg => 0x9a,
        F64Ceil => 0x9b,
        F64Floor => 0x9c,
        F64Trunc => 0x9d,
        F64Nearest => 0x9e,
        F64Sqrt => 0x9f,
        F64Add => 0xa0,
        F64Sub => 0xa1,
        F64Mul => 0xa2,
        F64Div => 0xa3,
        F64Min => 0xa4,
        F64Max => 0xa5,
        F64Copysign => 0xa6,

        I32WrapI64 => 0xa7,
        I32TruncF32S => 0xa8,
        I32TruncF32U => 0xa9,
        I32TruncF64S => 0xaa,
        I32TruncF64U => 0xab,
        I64ExtendI32S => 0xac,
        I64ExtendI32U => 0xad,
        I64TruncF32S => 0xae,
        I64TruncF32U => 0xaf,
        I64TruncF64S => 0xb0,
        I64TruncF64U => 0xb1,
        F32ConvertI32S => 0xb2,
        F32ConvertI32U => 0xb3,
        F32ConvertI64S => 0xb4,
        F32ConvertI64U => 0xb5,
        F32DemoteF64 => 0xb6,
        F64ConvertI32S => 0xb7,
        F64ConvertI32U => 0xb8,
        F64ConvertI64S => 0xb9,
        F64ConvertI64U => 0xba,
        F64PromoteF32 => 0xbb,
        I32ReinterpretF32 => 0xbc,
        I64ReinterpretF64 => 0xbd,
        F32ReinterpretI32 => 0xbe,
        F64ReinterpretI64 => 0xbf,

        I32Extend8S => 0xc0,
        I32Extend16S => 0xc1,
        I64Extend8S => 0xc2,
        I64Extend16S => 0xc3,
        I64Extend32S => 0xc4,

        other => unreachable!("instruction {other:?} has a dedicated encoder"),
    }
}

/// Saturating truncations carry the 0xFC prefix and are not bare opcodes;
/// route them before `plain_opcode`.
fn sat_sub_opcode(instr: &Instr) -> Option<u32> {
    use Instr::*;
    match instr {
        I32TruncSatF32S => Some(0),
        I32TruncSatF32U => Some(1),
        I32TruncSatF64S => Some(2),
        I32TruncSatF64U => Some(3),
        I64TruncSatF32S => Some(4),
        I64TruncSatF32U => Some(5),
        I64TruncSatF64S => Some(6),
        I64TruncSatF64U => Some(7),
        _ => None,
    }
}
