//! The stack-machine interpreter.
//!
//! Executes structured function bodies by recursive descent over the
//! control tree. Each call gets its own [`Frame`] and operand [`Stack`];
//! branches propagate outward as `Flow::Branch` values, decremented at
//! each enclosing block, so no label scanning happens at run time. A trap
//! unwinds every Rust frame up to the host call that started execution.
//!
//! One interpreter runs one synchronous call graph to completion or trap;
//! there is no suspension point inside WebAssembly execution. The optional
//! instruction budget turns overlong executions into
//! [`Trap::BudgetExhausted`] at the next instruction boundary, which is the
//! only cancellation mechanism short of dropping the store.

use crate::decoder::instruction::{BlockType, Instr};
use crate::runtime::frame::Frame;
use crate::runtime::instance::{CompiledFunc, Instance};
use crate::runtime::ops;
use crate::runtime::stack::Stack;
use crate::runtime::store::{FuncAddr, FunctionInstance, Store};
use crate::runtime::{Trap, Value};
use crate::structured::StructuredInstr;

/// How a sequence of instructions finished.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    /// Fell through; continue with the next instruction.
    Normal,
    /// Branch to the label at this relative depth.
    Branch(u32),
    /// Return from the current function.
    Return,
}

/// Executes function call graphs against a store.
pub struct Interpreter<'a> {
    store: &'a Store,
    depth: usize,
    budget: Option<u64>,
}

impl<'a> Interpreter<'a> {
    pub fn new(store: &'a Store) -> Self {
        Interpreter {
            store,
            depth: 0,
            budget: None,
        }
    }

    pub fn with_budget(store: &'a Store, budget: Option<u64>) -> Self {
        Interpreter {
            store,
            depth: 0,
            budget,
        }
    }

    /// Invoke a function by address. Arguments must already match the
    /// signature; `Store::call` performs that check for host callers.
    pub fn call(&mut self, addr: FuncAddr, args: Vec<Value>) -> Result<Vec<Value>, Trap> {
        let store = self.store;
        let function = store
            .function(addr)
            .ok_or_else(|| Trap::Internal(format!("dangling function address {}", addr.0)))?;

        match function {
            FunctionInstance::Host { func, .. } => func(&args),
            FunctionInstance::Wasm {
                instance_id,
                func_idx,
                ..
            } => {
                if self.depth >= store.max_call_depth() {
                    return Err(Trap::CallStackExhausted);
                }
                let instance = store
                    .instance(*instance_id)
                    .ok_or_else(|| Trap::Internal("function belongs to a discarded instance".into()))?;
                let compiled = instance
                    .compiled(*func_idx)
                    .ok_or_else(|| Trap::Internal("missing function body".into()))?
                    .clone();

                self.depth += 1;
                let result = self.run(instance, &compiled, args);
                self.depth -= 1;
                result
            }
        }
    }

    /// Run one wasm function body: bind locals, execute, collect results.
    fn run(
        &mut self,
        instance: &Instance,
        func: &CompiledFunc,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, Trap> {
        let mut frame = Frame::new(args, &func.locals);
        let mut stack = Stack::new();

        match self.exec_seq(instance, &func.body, &mut frame, &mut stack)? {
            // A branch to depth 0 at the top level targets the function
            // itself, which is a return; anything deeper cannot validate.
            Flow::Normal | Flow::Return | Flow::Branch(0) => {}
            Flow::Branch(depth) => {
                return Err(Trap::Internal(format!("branch depth {depth} escaped function")))
            }
        }

        let mut results = Vec::with_capacity(func.func_type.results.len());
        for result_type in func.func_type.results.iter().rev() {
            results.push(stack.pop_typed(*result_type)?);
        }
        results.reverse();
        Ok(results)
    }

    fn exec_seq(
        &mut self,
        instance: &Instance,
        seq: &[StructuredInstr],
        frame: &mut Frame,
        stack: &mut Stack,
    ) -> Result<Flow, Trap> {
        for instr in seq {
            self.tick()?;
            let flow = match instr {
                StructuredInstr::Plain(plain) => self.exec_plain(instance, plain, frame, stack)?,

                StructuredInstr::Block { block_type, body } => {
                    let (params, results) = self.block_arity(instance, block_type);
                    let height = stack.len().saturating_sub(params);
                    match self.exec_seq(instance, body, frame, stack)? {
                        Flow::Normal => Flow::Normal,
                        Flow::Return => Flow::Return,
                        Flow::Branch(0) => {
                            stack.unwind(height, results);
                            Flow::Normal
                        }
                        Flow::Branch(depth) => Flow::Branch(depth - 1),
                    }
                }

                StructuredInstr::Loop { block_type, body } => {
                    let (params, _) = self.block_arity(instance, block_type);
                    let height = stack.len().saturating_sub(params);
                    loop {
                        match self.exec_seq(instance, body, frame, stack)? {
                            Flow::Normal => break Flow::Normal,
                            Flow::Return => break Flow::Return,
                            Flow::Branch(0) => {
                                // Branch to a loop label restarts the loop
                                // with its parameters on the stack.
                                stack.unwind(height, params);
                                continue;
                            }
                            Flow::Branch(depth) => break Flow::Branch(depth - 1),
                        }
                    }
                }

                StructuredInstr::If {
                    block_type,
                    then_branch,
                    else_branch,
                } => {
                    let condition = stack.pop_i32()?;
                    let (params, results) = self.block_arity(instance, block_type);
                    let height = stack.len().saturating_sub(params);
                    let taken = if condition != 0 {
                        Some(then_branch)
                    } else {
                        else_branch.as_ref()
                    };
                    let flow = match taken {
                        Some(body) => self.exec_seq(instance, body, frame, stack)?,
                        None => Flow::Normal,
                    };
                    match flow {
                        Flow::Normal => Flow::Normal,
                        Flow::Return => Flow::Return,
                        Flow::Branch(0) => {
                            stack.unwind(height, results);
                            Flow::Normal
                        }
                        Flow::Branch(depth) => Flow::Branch(depth - 1),
                    }
                }
            };

            match flow {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn block_arity(&self, instance: &Instance, block_type: &BlockType) -> (usize, usize) {
        match block_type {
            BlockType::Empty => (0, 0),
            BlockType::Value(_) => (0, 1),
            BlockType::Func(type_idx) => {
                let ftype = &instance.module().types[*type_idx as usize];
                (ftype.params.len(), ftype.results.len())
            }
        }
    }

    fn tick(&mut self) -> Result<(), Trap> {
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return Err(Trap::BudgetExhausted);
            }
            *budget -= 1;
        }
        Ok(())
    }

    fn exec_plain(
        &mut self,
        instance: &Instance,
        instr: &Instr,
        frame: &mut Frame,
        stack: &mut Stack,
    ) -> Result<Flow, Trap> {
        use Instr::*;

        macro_rules! op {
            ($path:path) => {{
                $path(stack)?;
                Ok(Flow::Normal)
            }};
        }

        macro_rules! mem_load {
            ($op:ident, $memarg:expr) => {{
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mem = mem.borrow();
                ops::memory::$op(stack, &mem, $memarg)?;
                Ok(Flow::Normal)
            }};
        }

        macro_rules! mem_store {
            ($op:ident, $memarg:expr) => {{
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mut mem = mem.borrow_mut();
                ops::memory::$op(stack, &mut mem, $memarg)?;
                Ok(Flow::Normal)
            }};
        }

        macro_rules! get_table {
            ($idx:expr) => {
                instance
                    .table($idx)
                    .ok_or_else(|| Trap::Internal("no table instance".into()))?
            };
        }

        match instr {
            // Control
            Unreachable => Err(Trap::Unreachable),
            Nop => Ok(Flow::Normal),

            Br { label_idx } => Ok(Flow::Branch(*label_idx)),

            BrIf { label_idx } => {
                if stack.pop_i32()? != 0 {
                    Ok(Flow::Branch(*label_idx))
                } else {
                    Ok(Flow::Normal)
                }
            }

            BrTable { labels, default } => {
                let index = stack.pop_i32()? as u32;
                let target = labels.get(index as usize).copied().unwrap_or(*default);
                Ok(Flow::Branch(target))
            }

            Return => Ok(Flow::Return),

            Call { func_idx } => {
                let addr = instance
                    .func_addr(*func_idx)
                    .ok_or_else(|| Trap::Internal("call index out of range".into()))?;
                self.invoke(addr, stack)?;
                Ok(Flow::Normal)
            }

            CallIndirect {
                type_idx,
                table_idx,
            } => {
                let index = stack.pop_i32()? as u32;
                let entry = get_table!(*table_idx).borrow().get(index)?;
                let addr = match entry {
                    Value::FuncRef(Some(addr)) => addr,
                    Value::FuncRef(None) => return Err(Trap::UninitializedElement),
                    _ => return Err(Trap::UninitializedElement),
                };
                // The stored function's actual signature must equal the
                // static annotation; this check is what keeps dynamic
                // dispatch memory-safe.
                let expected = &instance.module().types[*type_idx as usize];
                let actual = self
                    .store
                    .func_type(addr)
                    .ok_or_else(|| Trap::Internal("dangling table entry".into()))?;
                if actual != expected {
                    return Err(Trap::IndirectCallTypeMismatch);
                }
                self.invoke(addr, stack)?;
                Ok(Flow::Normal)
            }

            // References
            RefNull { ref_type } => {
                stack.push(Value::null_ref(*ref_type));
                Ok(Flow::Normal)
            }

            RefIsNull => {
                let value = stack.pop()?;
                stack.push(Value::I32(value.is_null_ref() as i32));
                Ok(Flow::Normal)
            }

            RefFunc { func_idx } => {
                let addr = instance
                    .func_addr(*func_idx)
                    .ok_or_else(|| Trap::Internal("ref.func index out of range".into()))?;
                stack.push(Value::FuncRef(Some(addr)));
                Ok(Flow::Normal)
            }

            // Parametric
            Drop => {
                stack.pop()?;
                Ok(Flow::Normal)
            }

            Select | SelectTyped { .. } => {
                let condition = stack.pop_i32()?;
                let on_false = stack.pop()?;
                let on_true = stack.pop()?;
                stack.push(if condition != 0 { on_true } else { on_false });
                Ok(Flow::Normal)
            }

            // Variables
            LocalGet { local_idx } => {
                stack.push(frame.get(*local_idx)?);
                Ok(Flow::Normal)
            }

            LocalSet { local_idx } => {
                let value = stack.pop()?;
                frame.set(*local_idx, value)?;
                Ok(Flow::Normal)
            }

            LocalTee { local_idx } => {
                let value = stack.pop()?;
                frame.set(*local_idx, value)?;
                stack.push(value);
                Ok(Flow::Normal)
            }

            GlobalGet { global_idx } => {
                let global = instance
                    .global(*global_idx)
                    .ok_or_else(|| Trap::Internal("global index out of range".into()))?;
                stack.push(global.get());
                Ok(Flow::Normal)
            }

            GlobalSet { global_idx } => {
                let global = instance
                    .global(*global_idx)
                    .ok_or_else(|| Trap::Internal("global index out of range".into()))?;
                global.set(stack.pop()?);
                Ok(Flow::Normal)
            }

            // Tables
            TableGet { table_idx } => {
                let index = stack.pop_i32()? as u32;
                let value = get_table!(*table_idx).borrow().get(index)?;
                stack.push(value);
                Ok(Flow::Normal)
            }

            TableSet { table_idx } => {
                let value = stack.pop()?;
                let index = stack.pop_i32()? as u32;
                get_table!(*table_idx).borrow_mut().set(index, value)?;
                Ok(Flow::Normal)
            }

            TableSize { table_idx } => {
                let size = get_table!(*table_idx).borrow().size();
                stack.push(Value::I32(size as i32));
                Ok(Flow::Normal)
            }

            TableGrow { table_idx } => {
                let delta = stack.pop_i32()? as u32;
                let init = stack.pop()?;
                let result = get_table!(*table_idx).borrow_mut().grow(delta, init)?;
                stack.push(Value::I32(result as i32));
                Ok(Flow::Normal)
            }

            TableFill { table_idx } => {
                let len = stack.pop_i32()? as u32;
                let value = stack.pop()?;
                let start = stack.pop_i32()? as u32;
                get_table!(*table_idx).borrow_mut().fill(start, value, len)?;
                Ok(Flow::Normal)
            }

            TableCopy {
                dst_table,
                src_table,
            } => {
                let len = stack.pop_i32()? as u32;
                let src = stack.pop_i32()? as u32;
                let dst = stack.pop_i32()? as u32;
                if dst_table == src_table {
                    get_table!(*dst_table)
                        .borrow_mut()
                        .copy_within(dst, src, len)?;
                } else {
                    let values: Vec<Value> = {
                        let source = get_table!(*src_table).borrow();
                        (src..src.checked_add(len).ok_or(Trap::TableOutOfBounds)?)
                            .map(|i| source.get(i))
                            .collect::<Result<_, _>>()?
                    };
                    get_table!(*dst_table)
                        .borrow_mut()
                        .init(dst, &values, 0, len)?;
                }
                Ok(Flow::Normal)
            }

            TableInit {
                elem_idx,
                table_idx,
            } => {
                let len = stack.pop_i32()? as u32;
                let src = stack.pop_i32()? as u32;
                let dst = stack.pop_i32()? as u32;
                let segments = instance.elem_segments.borrow();
                let empty: &[Value] = &[];
                let values = segments
                    .get(*elem_idx as usize)
                    .and_then(|s| s.as_deref())
                    .unwrap_or(empty);
                get_table!(*table_idx)
                    .borrow_mut()
                    .init(dst, values, src, len)?;
                Ok(Flow::Normal)
            }

            ElemDrop { elem_idx } => {
                if let Some(slot) = instance
                    .elem_segments
                    .borrow_mut()
                    .get_mut(*elem_idx as usize)
                {
                    *slot = None;
                }
                Ok(Flow::Normal)
            }

            DataDrop { data_idx } => {
                if let Some(slot) = instance
                    .data_segments
                    .borrow_mut()
                    .get_mut(*data_idx as usize)
                {
                    *slot = None;
                }
                Ok(Flow::Normal)
            }

            // Memory
            MemorySize => {
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mem = mem.borrow();
                ops::memory::memory_size(stack, &mem)?;
                Ok(Flow::Normal)
            }

            MemoryGrow => {
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mut mem = mem.borrow_mut();
                ops::memory::memory_grow(stack, &mut mem)?;
                Ok(Flow::Normal)
            }

            MemoryFill => {
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mut mem = mem.borrow_mut();
                ops::memory::memory_fill(stack, &mut mem)?;
                Ok(Flow::Normal)
            }

            MemoryCopy => {
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mut mem = mem.borrow_mut();
                ops::memory::memory_copy(stack, &mut mem)?;
                Ok(Flow::Normal)
            }

            MemoryInit { data_idx } => {
                let mem = instance
                    .memory()
                    .ok_or_else(|| Trap::Internal("no memory instance".into()))?;
                let mut mem = mem.borrow_mut();
                let segments = instance.data_segments.borrow();
                let segment = segments.get(*data_idx as usize).and_then(|s| s.as_deref());
                ops::memory::memory_init(stack, &mut mem, segment)?;
                Ok(Flow::Normal)
            }

            I32Load { memarg } => mem_load!(i32_load, memarg),
            I64Load { memarg } => mem_load!(i64_load, memarg),
            F32Load { memarg } => mem_load!(f32_load, memarg),
            F64Load { memarg } => mem_load!(f64_load, memarg),
            I32Load8S { memarg } => mem_load!(i32_load8_s, memarg),
            I32Load8U { memarg } => mem_load!(i32_load8_u, memarg),
            I32Load16S { memarg } => mem_load!(i32_load16_s, memarg),
            I32Load16U { memarg } => mem_load!(i32_load16_u, memarg),
            I64Load8S { memarg } => mem_load!(i64_load8_s, memarg),
            I64Load8U { memarg } => mem_load!(i64_load8_u, memarg),
            I64Load16S { memarg } => mem_load!(i64_load16_s, memarg),
            I64Load16U { memarg } => mem_load!(i64_load16_u, memarg),
            I64Load32S { memarg } => mem_load!(i64_load32_s, memarg),
            I64Load32U { memarg } => mem_load!(i64_load32_u, memarg),
            I32Store { memarg } => mem_store!(i32_store, memarg),
            I64Store { memarg } => mem_store!(i64_store, memarg),
            F32Store { memarg } => mem_store!(f32_store, memarg),
            F64Store { memarg } => mem_store!(f64_store, memarg),
            I32Store8 { memarg } => mem_store!(i32_store8, memarg),
            I32Store16 { memarg } => mem_store!(i32_store16, memarg),
            I64Store8 { memarg } => mem_store!(i64_store8, memarg),
            I64Store16 { memarg } => mem_store!(i64_store16, memarg),
            I64Store32 { memarg } => mem_store!(i64_store32, memarg),

            // Constants
            I32Const { value } => {
                stack.push(Value::I32(*value));
                Ok(Flow::Normal)
            }
            I64Const { value } => {
                stack.push(Value::I64(*value));
                Ok(Flow::Normal)
            }
            F32Const { value } => {
                stack.push(Value::F32(*value));
                Ok(Flow::Normal)
            }
            F64Const { value } => {
                stack.push(Value::F64(*value));
                Ok(Flow::Normal)
            }

            // Tests and comparisons
            I32Eqz => op!(ops::comparison::i32_eqz),
            I32Eq => op!(ops::comparison::i32_eq),
            I32Ne => op!(ops::comparison::i32_ne),
            I32LtS => op!(ops::comparison::i32_lt_s),
            I32LtU => op!(ops::comparison::i32_lt_u),
            I32GtS => op!(ops::comparison::i32_gt_s),
            I32GtU => op!(ops::comparison::i32_gt_u),
            I32LeS => op!(ops::comparison::i32_le_s),
            I32LeU => op!(ops::comparison::i32_le_u),
            I32GeS => op!(ops::comparison::i32_ge_s),
            I32GeU => op!(ops::comparison::i32_ge_u),

            I64Eqz => op!(ops::comparison::i64_eqz),
            I64Eq => op!(ops::comparison::i64_eq),
            I64Ne => op!(ops::comparison::i64_ne),
            I64LtS => op!(ops::comparison::i64_lt_s),
            I64LtU => op!(ops::comparison::i64_lt_u),
            I64GtS => op!(ops::comparison::i64_gt_s),
            I64GtU => op!(ops::comparison::i64_gt_u),
            I64LeS => op!(ops::comparison::i64_le_s),
            I64LeU => op!(ops::comparison::i64_le_u),
            I64GeS => op!(ops::comparison::i64_ge_s),
            I64GeU => op!(ops::comparison::i64_ge_u),

            F32Eq => op!(ops::comparison::f32_eq),
            F32Ne => op!(ops::comparison::f32_ne),
            F32Lt => op!(ops::comparison::f32_lt),
            F32Gt => op!(ops::comparison::f32_gt),
            F32Le => op!(ops::comparison::f32_le),
            F32Ge => op!(ops::comparison::f32_ge),

            F64Eq => op!(ops::comparison::f64_eq),
            F64Ne => op!(ops::comparison::f64_ne),
            F64Lt => op!(ops::comparison::f64_lt),
            F64Gt => op!(ops::comparison::f64_gt),
            F64Le => op!(ops::comparison::f64_le),
            F64Ge => op!(ops::comparison::f64_ge),

            // Numeric
            I32Clz => op!(ops::numeric::i32_clz),
            I32Ctz => op!(ops::numeric::i32_ctz),
            I32Popcnt => op!(ops::numeric::i32_popcnt),
            I32Add => op!(ops::numeric::i32_add),
            I32Sub => op!(ops::numeric::i32_sub),
            I32Mul => op!(ops::numeric::i32_mul),
            I32DivS => op!(ops::numeric::i32_div_s),
            I32DivU => op!(ops::numeric::i32_div_u),
            I32RemS => op!(ops::numeric::i32_rem_s),
            I32RemU => op!(ops::numeric::i32_rem_u),
            I32And => op!(ops::numeric::i32_and),
            I32Or => op!(ops::numeric::i32_or),
            I32Xor => op!(ops::numeric::i32_xor),
            I32Shl => op!(ops::numeric::i32_shl),
            I32ShrS => op!(ops::numeric::i32_shr_s),
            I32ShrU => op!(ops::numeric::i32_shr_u),
            I32Rotl => op!(ops::numeric::i32_rotl),
            I32Rotr => op!(ops::numeric::i32_rotr),

            I64Clz => op!(ops::numeric::i64_clz),
            I64Ctz => op!(ops::numeric::i64_ctz),
            I64Popcnt => op!(ops::numeric::i64_popcnt),
            I64Add => op!(ops::numeric::i64_add),
            I64Sub => op!(ops::numeric::i64_sub),
            I64Mul => op!(ops::numeric::i64_mul),
            I64DivS => op!(ops::numeric::i64_div_s),
            I64DivU => op!(ops::numeric::i64_div_u),
            I64RemS => op!(ops::numeric::i64_rem_s),
            I64RemU => op!(ops::numeric::i64_rem_u),
            I64And => op!(ops::numeric::i64_and),
            I64Or => op!(ops::numeric::i64_or),
            I64Xor => op!(ops::numeric::i64_xor),
            I64Shl => op!(ops::numeric::i64_shl),
            I64ShrS => op!(ops::numeric::i64_shr_s),
            I64ShrU => op!(ops::numeric::i64_shr_u),
            I64Rotl => op!(ops::numeric::i64_rotl),
            I64Rotr => op!(ops::numeric::i64_rotr),

            F32Abs => op!(ops::numeric::f32_abs),
            F32Neg => op!(ops::numeric::f32_neg),
            F32Ceil => op!(ops::numeric::f32_ceil),
            F32Floor => op!(ops::numeric::f32_floor),
            F32Trunc => op!(ops::numeric::f32_trunc),
            F32Nearest => op!(ops::numeric::f32_nearest),
            F32Sqrt => op!(ops::numeric::f32_sqrt),
            F32Add => op!(ops::numeric::f32_add),
            F32Sub => op!(ops::numeric::f32_sub),
            F32Mul => op!(ops::numeric::f32_mul),
            F32Div => op!(ops::numeric::f32_div),
            F32Min => op!(ops::numeric::f32_min),
            F32Max => op!(ops::numeric::f32_max),
            F32Copysign => op!(ops::numeric::f32_copysign),

            F64Abs => op!(ops::numeric::f64_abs),
            F64Neg => op!(ops::numeric::f64_neg),
            F64Ceil => op!(ops::numeric::f64_ceil),
            F64Floor => op!(ops::numeric::f64_floor),
            F64Trunc => op!(ops::numeric::f64_trunc),
            F64Nearest => op!(ops::numeric::f64_nearest),
            F64Sqrt => op!(ops::numeric::f64_sqrt),
            F64Add => op!(ops::numeric::f64_add),
            F64Sub => op!(ops::numeric::f64_sub),
            F64Mul => op!(ops::numeric::f64_mul),
            F64Div => op!(ops::numeric::f64_div),
            F64Min => op!(ops::numeric::f64_min),
            F64Max => op!(ops::numeric::f64_max),
            F64Copysign => op!(ops::numeric::f64_copysign),

            // Conversions
            I32WrapI64 => op!(ops::conversion::i32_wrap_i64),
            I32TruncF32S => op!(ops::conversion::i32_trunc_f32_s),
            I32TruncF32U => op!(ops::conversion::i32_trunc_f32_u),
            I32TruncF64S => op!(ops::conversion::i32_trunc_f64_s),
            I32TruncF64U => op!(ops::conversion::i32_trunc_f64_u),
            I64ExtendI32S => op!(ops::conversion::i64_extend_i32_s),
            I64ExtendI32U => op!(ops::conversion::i64_extend_i32_u),
            I64TruncF32S => op!(ops::conversion::i64_trunc_f32_s),
            I64TruncF32U => op!(ops::conversion::i64_trunc_f32_u),
            I64TruncF64S => op!(ops::conversion::i64_trunc_f64_s),
            I64TruncF64U => op!(ops::conversion::i64_trunc_f64_u),
            F32ConvertI32S => op!(ops::conversion::f32_convert_i32_s),
            F32ConvertI32U => op!(ops::conversion::f32_convert_i32_u),
            F32ConvertI64S => op!(ops::conversion::f32_convert_i64_s),
            F32ConvertI64U => op!(ops::conversion::f32_convert_i64_u),
            F32DemoteF64 => op!(ops::conversion::f32_demote_f64),
            F64ConvertI32S => op!(ops::conversion::f64_convert_i32_s),
            F64ConvertI32U => op!(ops::conversion::f64_convert_i32_u),
            F64ConvertI64S => op!(ops::conversion::f64_convert_i64_s),
            F64ConvertI64U => op!(ops::conversion::f64_convert_i64_u),
            F64PromoteF32 => op!(ops::conversion::f64_promote_f32),
            I32ReinterpretF32 => op!(ops::conversion::i32_reinterpret_f32),
            I64ReinterpretF64 => op!(ops::conversion::i64_reinterpret_f64),
            F32ReinterpretI32 => op!(ops::conversion::f32_reinterpret_i32),
            F64ReinterpretI64 => op!(ops::conversion::f64_reinterpret_i64),

            I32Extend8S => op!(ops::conversion::i32_extend8_s),
            I32Extend16S => op!(ops::conversion::i32_extend16_s),
            I64Extend8S => op!(ops::conversion::i64_extend8_s),
            I64Extend16S => op!(ops::conversion::i64_extend16_s),
            I64Extend32S => op!(ops::conversion::i64_extend32_s),

            I32TruncSatF32S => op!(ops::conversion::i32_trunc_sat_f32_s),
            I32TruncSatF32U => op!(ops::conversion::i32_trunc_sat_f32_u),
            I32TruncSatF64S => op!(ops::conversion::i32_trunc_sat_f64_s),
            I32TruncSatF64U => op!(ops::conversion::i32_trunc_sat_f64_u),
            I64TruncSatF32S => op!(ops::conversion::i64_trunc_sat_f32_s),
            I64TruncSatF32U => op!(ops::conversion::i64_trunc_sat_f32_u),
            I64TruncSatF64S => op!(ops::conversion::i64_trunc_sat_f64_s),
            I64TruncSatF64U => op!(ops::conversion::i64_trunc_sat_f64_u),

            // Structure markers never appear as plain instructions once the
            // body has been built into a tree.
            Block { .. } | Loop { .. } | If { .. } | Else | End => {
                Err(Trap::Internal("structured marker in plain position".into()))
            }
        }
    }

    /// Pop arguments for `addr` per its signature, call it, push results.
    fn invoke(&mut self, addr: FuncAddr, stack: &mut Stack) -> Result<(), Trap> {
        let param_count = self
            .store
            .func_type(addr)
            .ok_or_else(|| Trap::Internal(format!("dangling function address {}", addr.0)))?
            .params
            .len();
        let args = stack.pop_n(param_count)?;
        let results = self.call(addr, args)?;
        stack.push_all(results);
        Ok(())
    }
}
