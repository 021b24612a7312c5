//! Abstract stack-machine type checking of function bodies.
//!
//! Implements the validation algorithm from the specification appendix: an
//! operand stack of possibly-unknown value types plus a control stack of
//! frames, one per `block`/`loop`/`if`, each recording its start/end types
//! and the operand-stack height at entry. Unreachable code is polymorphic:
//! after `br`, `return`, or `unreachable`, pops succeed with an unknown type
//! until the enclosing frame ends.

use std::collections::HashSet;

use super::ValidationError;
use crate::decoder::instruction::{BlockType, Instr, MemArg};
use crate::module::{FuncType, Module, ValueType};

#[derive(Debug, Clone, Copy, PartialEq)]
enum MaybeVal {
    Val(ValueType),
    Unknown,
}

use MaybeVal::{Unknown, Val};

impl MaybeVal {
    fn is_num(&self) -> bool {
        match self {
            Val(v) => matches!(
                v,
                ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64
            ),
            Unknown => true,
        }
    }

    fn is_ref(&self) -> bool {
        match self {
            Val(v) => v.is_ref(),
            Unknown => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    /// The implicit frame wrapping the whole body.
    Func,
    Block,
    Loop,
    If,
    Else,
}

#[derive(Clone)]
struct CtrlFrame {
    kind: FrameKind,
    start_types: Vec<ValueType>,
    end_types: Vec<ValueType>,
    height: usize,
    unreachable: bool,
}

impl CtrlFrame {
    /// The types a branch to this frame's label must supply: loop labels
    /// target the start, every other label targets the end.
    fn label_types(&self) -> &[ValueType] {
        if self.kind == FrameKind::Loop {
            &self.start_types
        } else {
            &self.end_types
        }
    }
}

/// Validate the body of the function at `func_idx` (full index space).
pub fn validate_func_body(
    module: &Module,
    func_idx: u32,
    declared_funcs: &HashSet<u32>,
) -> Result<(), ValidationError> {
    let ftype = module
        .func_type(func_idx)
        .ok_or(ValidationError::UnknownFunction(func_idx))?
        .clone();
    let body_idx = func_idx as usize - module.num_imported_funcs();
    let body = module
        .code
        .get(body_idx)
        .ok_or(ValidationError::UnknownFunction(func_idx))?;

    let mut locals: Vec<ValueType> = ftype.params.clone();
    locals.extend(body.locals.iter_types());

    let mut v = FuncValidator {
        module,
        declared_funcs,
        locals,
        vals: Vec::new(),
        ctrls: Vec::new(),
    };
    // Parameters are not on the operand stack; they arrive via local.get.
    v.push_ctrl(FrameKind::Func, Vec::new(), ftype.results.clone());

    for instr in &body.instrs {
        // Nothing may follow the end that closes the function body.
        if v.ctrls.is_empty() {
            return Err(ValidationError::UnbalancedControl);
        }
        v.validate(instr)?;
    }
    if !v.ctrls.is_empty() {
        return Err(ValidationError::UnbalancedControl);
    }
    Ok(())
}

struct FuncValidator<'a> {
    module: &'a Module,
    declared_funcs: &'a HashSet<u32>,
    locals: Vec<ValueType>,
    vals: Vec<MaybeVal>,
    ctrls: Vec<CtrlFrame>,
}

impl FuncValidator<'_> {
    fn mismatch(&self, what: &str) -> ValidationError {
        ValidationError::TypeMismatch(what.to_string())
    }

    fn push_val(&mut self, val: MaybeVal) {
        self.vals.push(val);
    }

    fn push_types(&mut self, types: &[ValueType]) {
        for t in types {
            self.vals.push(Val(*t));
        }
    }

    fn pop_val(&mut self) -> Result<MaybeVal, ValidationError> {
        let frame = self
            .ctrls
            .last()
            .ok_or(ValidationError::UnbalancedControl)?;
        if self.vals.len() == frame.height {
            return if frame.unreachable {
                Ok(Unknown)
            } else {
                Err(self.mismatch("operand stack underflow"))
            };
        }
        self.vals
            .pop()
            .ok_or_else(|| self.mismatch("operand stack underflow"))
    }

    fn pop_expect(&mut self, expected: ValueType) -> Result<(), ValidationError> {
        match self.pop_val()? {
            Unknown => Ok(()),
            Val(actual) if actual == expected => Ok(()),
            Val(actual) => Err(self.mismatch(&format!("expected {expected}, found {actual}"))),
        }
    }

    /// Pop a list of expected types, stack-ordered (last type popped first).
    fn pop_expects(&mut self, types: &[ValueType]) -> Result<(), ValidationError> {
        for t in types.iter().rev() {
            self.pop_expect(*t)?;
        }
        Ok(())
    }

    fn push_ctrl(&mut self, kind: FrameKind, start_types: Vec<ValueType>, end_types: Vec<ValueType>) {
        let height = self.vals.len();
        self.push_types(&start_types);
        self.ctrls.push(CtrlFrame {
            kind,
            start_types,
            end_types,
            height,
            unreachable: false,
        });
    }

    fn pop_ctrl(&mut self) -> Result<CtrlFrame, ValidationError> {
        let frame = self
            .ctrls
            .last()
            .ok_or(ValidationError::UnbalancedControl)?
            .clone();
        self.pop_expects(&frame.end_types)?;
        if self.vals.len() != frame.height {
            return Err(self.mismatch("values left on the stack at end of block"));
        }
        self.ctrls.pop();
        Ok(frame)
    }

    fn set_unreachable(&mut self) -> Result<(), ValidationError> {
        let frame = self
            .ctrls
            .last_mut()
            .ok_or(ValidationError::UnbalancedControl)?;
        self.vals.truncate(frame.height);
        frame.unreachable = true;
        Ok(())
    }

    fn frame_at(&self, depth: u32) -> Result<&CtrlFrame, ValidationError> {
        if depth as usize >= self.ctrls.len() {
            return Err(ValidationError::UnknownLabel(depth));
        }
        Ok(&self.ctrls[self.ctrls.len() - 1 - depth as usize])
    }

    fn local(&self, idx: u32) -> Result<ValueType, ValidationError> {
        self.locals
            .get(idx as usize)
            .copied()
            .ok_or(ValidationError::UnknownLocal(idx))
    }

    fn func_type(&self, func_idx: u32) -> Result<FuncType, ValidationError> {
        self.module
            .func_type(func_idx)
            .cloned()
            .ok_or(ValidationError::UnknownFunction(func_idx))
    }

    fn block_types(
        &self,
        bt: BlockType,
    ) -> Result<(Vec<ValueType>, Vec<ValueType>), ValidationError> {
        match bt {
            BlockType::Empty => Ok((Vec::new(), Vec::new())),
            BlockType::Value(t) => Ok((Vec::new(), vec![t])),
            BlockType::Func(ti) => {
                let ftype = self
                    .module
                    .types
                    .get(ti as usize)
                    .ok_or(ValidationError::UnknownType(ti))?;
                Ok((ftype.params.clone(), ftype.results.clone()))
            }
        }
    }

    fn unary(&mut self, input: ValueType, output: ValueType) -> Result<(), ValidationError> {
        self.pop_expect(input)?;
        self.push_val(Val(output));
        Ok(())
    }

    fn binary(&mut self, input: ValueType, output: ValueType) -> Result<(), ValidationError> {
        self.pop_expect(input)?;
        self.pop_expect(input)?;
        self.push_val(Val(output));
        Ok(())
    }

    fn require_memory(&self) -> Result<(), ValidationError> {
        if self.module.num_memories() == 0 {
            return Err(ValidationError::UnknownMemory(0));
        }
        Ok(())
    }

    fn check_alignment(&self, memarg: &MemArg, natural: u32) -> Result<(), ValidationError> {
        // align is the exponent; it may not exceed the natural alignment.
        if 1u32.checked_shl(memarg.align).map_or(true, |a| a > natural) {
            return Err(ValidationError::BadAlignment {
                align: memarg.align,
                natural,
            });
        }
        Ok(())
    }

    fn load(
        &mut self,
        memarg: &MemArg,
        natural: u32,
        output: ValueType,
    ) -> Result<(), ValidationError> {
        self.require_memory()?;
        self.check_alignment(memarg, natural)?;
        self.pop_expect(ValueType::I32)?;
        self.push_val(Val(output));
        Ok(())
    }

    fn store(
        &mut self,
        memarg: &MemArg,
        natural: u32,
        input: ValueType,
    ) -> Result<(), ValidationError> {
        self.require_memory()?;
        self.check_alignment(memarg, natural)?;
        self.pop_expect(input)?;
        self.pop_expect(ValueType::I32)?;
        Ok(())
    }

    fn validate(&mut self, instr: &Instr) -> Result<(), ValidationError> {
        use Instr::*;
        use ValueType::{FuncRef, F32, F64, I32, I64};

        match instr {
            Nop => Ok(()),

            Unreachable => self.set_unreachable(),

            Block { block_type } | Loop { block_type } | If { block_type } => {
                if matches!(instr, If { .. }) {
                    self.pop_expect(I32)?;
                }
                let (params, results) = self.block_types(*block_type)?;
                self.pop_expects(&params)?;
                let kind = match instr {
                    Block { .. } => FrameKind::Block,
                    Loop { .. } => FrameKind::Loop,
                    _ => FrameKind::If,
                };
                self.push_ctrl(kind, params, results);
                Ok(())
            }

            Else => {
                let frame = self.pop_ctrl()?;
                if frame.kind != FrameKind::If {
                    return Err(ValidationError::MisplacedElse);
                }
                self.push_ctrl(FrameKind::Else, frame.start_types, frame.end_types);
                Ok(())
            }

            End => {
                let frame = self.pop_ctrl()?;
                // An `if` with no `else` must be a no-op on the stack: the
                // implicit empty else can only produce what it consumed.
                if frame.kind == FrameKind::If && frame.start_types != frame.end_types {
                    return Err(self.mismatch("if without else must have matching types"));
                }
                self.push_types(&frame.end_types);
                Ok(())
            }

            Br { label_idx } => {
                let types = self.frame_at(*label_idx)?.label_types().to_vec();
                self.pop_expects(&types)?;
                self.set_unreachable()
            }

            BrIf { label_idx } => {
                self.pop_expect(I32)?;
                let types = self.frame_at(*label_idx)?.label_types().to_vec();
                self.pop_expects(&types)?;
                self.push_types(&types);
                Ok(())
            }

            BrTable { labels, default } => {
                self.pop_expect(I32)?;
                let default_types = self.frame_at(*default)?.label_types().to_vec();
                for label in labels {
                    let types = self.frame_at(*label)?.label_types().to_vec();
                    if types.len() != default_types.len() {
                        return Err(self.mismatch("br_table label arities differ"));
                    }
                    self.pop_expects(&types)?;
                    self.push_types(&types);
                }
                self.pop_expects(&default_types)?;
                self.set_unreachable()
            }

            Return => {
                let types = self
                    .ctrls
                    .first()
                    .ok_or(ValidationError::UnbalancedControl)?
                    .end_types
                    .clone();
                self.pop_expects(&types)?;
                self.set_unreachable()
            }

            Call { func_idx } => {
                let ftype = self.func_type(*func_idx)?;
                self.pop_expects(&ftype.params)?;
                self.push_types(&ftype.results);
                Ok(())
            }

            CallIndirect {
                type_idx,
                table_idx,
            } => {
                let table = self
                    .module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                if table.ref_type != crate::module::RefType::FuncRef {
                    return Err(self.mismatch("call_indirect table must hold funcref"));
                }
                let ftype = self
                    .module
                    .types
                    .get(*type_idx as usize)
                    .ok_or(ValidationError::UnknownType(*type_idx))?
                    .clone();
                self.pop_expect(I32)?;
                self.pop_expects(&ftype.params)?;
                self.push_types(&ftype.results);
                Ok(())
            }

            RefNull { ref_type } => {
                self.push_val(Val((*ref_type).into()));
                Ok(())
            }

            RefIsNull => {
                let v = self.pop_val()?;
                if !v.is_ref() {
                    return Err(self.mismatch("ref.is_null expects a reference"));
                }
                self.push_val(Val(I32));
                Ok(())
            }

            RefFunc { func_idx } => {
                if *func_idx as usize >= self.module.num_funcs() {
                    return Err(ValidationError::UnknownFunction(*func_idx));
                }
                if !self.declared_funcs.contains(func_idx) {
                    return Err(ValidationError::UndeclaredFuncRef(*func_idx));
                }
                self.push_val(Val(FuncRef));
                Ok(())
            }

            Drop => {
                self.pop_val()?;
                Ok(())
            }

            Select => {
                self.pop_expect(I32)?;
                let t1 = self.pop_val()?;
                let t2 = self.pop_val()?;
                if !t1.is_num() || !t2.is_num() {
                    return Err(self.mismatch("select operands must be numeric"));
                }
                if t1 != t2 && t1 != Unknown && t2 != Unknown {
                    return Err(self.mismatch("select operands must agree"));
                }
                self.push_val(if t1 == Unknown { t2 } else { t1 });
                Ok(())
            }

            SelectTyped { types } => {
                if types.len() != 1 {
                    return Err(self.mismatch("select annotation must name one type"));
                }
                let t = types[0];
                self.pop_expect(I32)?;
                self.pop_expect(t)?;
                self.pop_expect(t)?;
                self.push_val(Val(t));
                Ok(())
            }

            LocalGet { local_idx } => {
                let t = self.local(*local_idx)?;
                self.push_val(Val(t));
                Ok(())
            }

            LocalSet { local_idx } => {
                let t = self.local(*local_idx)?;
                self.pop_expect(t)
            }

            LocalTee { local_idx } => {
                let t = self.local(*local_idx)?;
                self.pop_expect(t)?;
                self.push_val(Val(t));
                Ok(())
            }

            GlobalGet { global_idx } => {
                let gt = self
                    .module
                    .global_type(*global_idx)
                    .ok_or(ValidationError::UnknownGlobal(*global_idx))?;
                self.push_val(Val(gt.value_type));
                Ok(())
            }

            GlobalSet { global_idx } => {
                let gt = self
                    .module
                    .global_type(*global_idx)
                    .ok_or(ValidationError::UnknownGlobal(*global_idx))?;
                if !gt.mutable {
                    return Err(ValidationError::ImmutableGlobal);
                }
                self.pop_expect(gt.value_type)
            }

            TableGet { table_idx } => {
                let table = self
                    .module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                self.pop_expect(I32)?;
                self.push_val(Val(table.ref_type.into()));
                Ok(())
            }

            TableSet { table_idx } => {
                let table = self
                    .module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                self.pop_expect(table.ref_type.into())?;
                self.pop_expect(I32)
            }

            TableSize { table_idx } => {
                self.module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                self.push_val(Val(I32));
                Ok(())
            }

            TableGrow { table_idx } => {
                let table = self
                    .module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                self.pop_expect(I32)?;
                self.pop_expect(table.ref_type.into())?;
                self.push_val(Val(I32));
                Ok(())
            }

            TableFill { table_idx } => {
                let table = self
                    .module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                self.pop_expect(I32)?;
                self.pop_expect(table.ref_type.into())?;
                self.pop_expect(I32)
            }

            TableInit {
                elem_idx,
                table_idx,
            } => {
                let table = self
                    .module
                    .table_type(*table_idx)
                    .ok_or(ValidationError::UnknownTable(*table_idx))?;
                let segment = self
                    .module
                    .elements
                    .get(*elem_idx as usize)
                    .ok_or(ValidationError::UnknownElementSegment(*elem_idx))?;
                if segment.ref_type != table.ref_type {
                    return Err(self.mismatch("table.init element kind mismatch"));
                }
                self.pop_expects(&[I32, I32, I32])
            }

            ElemDrop { elem_idx } => {
                if *elem_idx as usize >= self.module.elements.len() {
                    return Err(ValidationError::UnknownElementSegment(*elem_idx));
                }
                Ok(())
            }

            TableCopy {
                dst_table,
                src_table,
            } => {
                let dst = self
                    .module
                    .table_type(*dst_table)
                    .ok_or(ValidationError::UnknownTable(*dst_table))?;
                let src = self
                    .module
                    .table_type(*src_table)
                    .ok_or(ValidationError::UnknownTable(*src_table))?;
                if dst.ref_type != src.ref_type {
                    return Err(self.mismatch("table.copy element kinds differ"));
                }
                self.pop_expects(&[I32, I32, I32])
            }

            I32Load { memarg } => self.load(memarg, 4, I32),
            I64Load { memarg } => self.load(memarg, 8, I64),
            F32Load { memarg } => self.load(memarg, 4, F32),
            F64Load { memarg } => self.load(memarg, 8, F64),
            I32Load8S { memarg } | I32Load8U { memarg } => self.load(memarg, 1, I32),
            I32Load16S { memarg } | I32Load16U { memarg } => self.load(memarg, 2, I32),
            I64Load8S { memarg } | I64Load8U { memarg } => self.load(memarg, 1, I64),
            I64Load16S { memarg } | I64Load16U { memarg } => self.load(memarg, 2, I64),
            I64Load32S { memarg } | I64Load32U { memarg } => self.load(memarg, 4, I64),

            I32Store { memarg } => self.store(memarg, 4, I32),
            I64Store { memarg } => self.store(memarg, 8, I64),
            F32Store { memarg } => self.store(memarg, 4, F32),
            F64Store { memarg } => self.store(memarg, 8, F64),
            I32Store8 { memarg } => self.store(memarg, 1, I32),
            I32Store16 { memarg } => self.store(memarg, 2, I32),
            I64Store8 { memarg } => self.store(memarg, 1, I64),
            I64Store16 { memarg } => self.store(memarg, 2, I64),
            I64Store32 { memarg } => self.store(memarg, 4, I64),

            MemorySize => {
                self.require_memory()?;
                self.push_val(Val(I32));
                Ok(())
            }

            MemoryGrow => {
                self.require_memory()?;
                self.pop_expect(I32)?;
                self.push_val(Val(I32));
                Ok(())
            }

            MemoryCopy | MemoryFill => {
                self.require_memory()?;
                self.pop_expects(&[I32, I32, I32])
            }

            MemoryInit { data_idx } => {
                self.require_memory()?;
                let count = self
                    .module
                    .data_count
                    .ok_or(ValidationError::DataCountRequired)?;
                if *data_idx >= count {
                    return Err(ValidationError::UnknownDataSegment(*data_idx));
                }
                self.pop_expects(&[I32, I32, I32])
            }

            DataDrop { data_idx } => {
                let count = self
                    .module
                    .data_count
                    .ok_or(ValidationError::DataCountRequired)?;
                if *data_idx >= count {
                    return Err(ValidationError::UnknownDataSegment(*data_idx));
                }
                Ok(())
            }

            I32Const { .. } => {
                self.push_val(Val(I32));
                Ok(())
            }
            I64Const { .. } => {
                self.push_val(Val(I64));
                Ok(())
            }
            F32Const { .. } => {
                self.push_val(Val(F32));
                Ok(())
            }
            F64Const { .. } => {
                self.push_val(Val(F64));
                Ok(())
            }

            I32Eqz => self.unary(I32, I32),
            I64Eqz => self.unary(I64, I32),

            I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS
            | I32GeU => self.binary(I32, I32),

            I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS
            | I64GeU => self.binary(I64, I32),

            F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge => self.binary(F32, I32),
            F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge => self.binary(F64, I32),

            I32Clz | I32Ctz | I32Popcnt | I32Extend8S | I32Extend16S => self.unary(I32, I32),

            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
            | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr => self.binary(I32, I32),

            I64Clz | I64Ctz | I64Popcnt | I64Extend8S | I64Extend16S | I64Extend32S => {
                self.unary(I64, I64)
            }

            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => self.binary(I64, I64),

            F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt => {
                self.unary(F32, F32)
            }

            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => {
                self.binary(F32, F32)
            }

            F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt => {
                self.unary(F64, F64)
            }

            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => {
                self.binary(F64, F64)
            }

            I32WrapI64 => self.unary(I64, I32),
            I32TruncF32S | I32TruncF32U | I32TruncSatF32S | I32TruncSatF32U
            | I32ReinterpretF32 => self.unary(F32, I32),
            I32TruncF64S | I32TruncF64U | I32TruncSatF64S | I32TruncSatF64U => {
                self.unary(F64, I32)
            }
            I64ExtendI32S | I64ExtendI32U => self.unary(I32, I64),
            I64TruncF32S | I64TruncF32U | I64TruncSatF32S | I64TruncSatF32U => {
                self.unary(F32, I64)
            }
            I64TruncF64S | I64TruncF64U | I64TruncSatF64S | I64TruncSatF64U
            | I64ReinterpretF64 => self.unary(F64, I64),
            F32ConvertI32S | F32ConvertI32U | F32ReinterpretI32 => self.unary(I32, F32),
            F32ConvertI64S | F32ConvertI64U => self.unary(I64, F32),
            F32DemoteF64 => self.unary(F64, F32),
            F64ConvertI32S | F64ConvertI32U => self.unary(I32, F64),
            F64ConvertI64S | F64ConvertI64U | F64ReinterpretI64 => self.unary(I64, F64),
            F64PromoteF32 => self.unary(F32, F64),
        }
    }
}
