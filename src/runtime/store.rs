//! The store: owner of all runtime state.
//!
//! The store holds four address spaces (functions, memories, tables,
//! globals) plus every instance created in it. Addresses are indices into
//! these registries, globally unique and stable for the life of the store,
//! which is what lets one instance's exports serve as another's imports.
//!
//! [`Store::instantiate`] drives the whole instantiation sequence in the
//! order the semantics require: import resolution, allocation, segment
//! initialization, start function, and only then export exposure. If any
//! step fails, the registries are rolled back to their pre-instantiation
//! state and nothing of the instance remains reachable.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::module::{
    ConstExpr, DataMode, ElementMode, FuncType, GlobalType, ImportKind, Limits, Module, TableType,
};
use crate::runtime::instance::{CompiledFunc, ExternVal, Instance};
use crate::runtime::interp::Interpreter;
use crate::runtime::memory::Memory;
use crate::runtime::table::Table;
use crate::runtime::{ImportObject, InstantiateError, InvokeError, LinkError, Trap, Value};
use crate::structured;
use crate::validator::{self, ValidationError};

/// Address of a function in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncAddr(pub usize);

/// Address of a memory in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAddr(pub usize);

/// Address of a table in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableAddr(pub usize);

/// Address of a global in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalAddr(pub usize);

/// Memories are shared between the store, instances, and host handles.
/// Execution is single-threaded per store; `RefCell` provides the interior
/// mutability, and hosts wanting cross-thread concurrency run one store per
/// thread.
pub type SharedMemory = Rc<RefCell<Memory>>;

/// Tables, shared the same way memories are.
pub type SharedTable = Rc<RefCell<Table>>;

/// Globals, shared the same way. `Value` is `Copy`, so a `Cell` suffices.
pub type SharedGlobal = Rc<GlobalCell>;

/// A global value cell with its declared type.
#[derive(Debug)]
pub struct GlobalCell {
    ty: GlobalType,
    value: Cell<Value>,
}

impl GlobalCell {
    pub fn new(ty: GlobalType, value: Value) -> Self {
        GlobalCell {
            ty,
            value: Cell::new(value),
        }
    }

    pub fn ty(&self) -> GlobalType {
        self.ty
    }

    pub fn get(&self) -> Value {
        self.value.get()
    }

    /// Unchecked write; mutability is enforced by validation for wasm-side
    /// writes and by [`Store::global_set`] for host-side writes.
    pub(crate) fn set(&self, value: Value) {
        self.value.set(value);
    }
}

/// A host function: takes argument values, returns result values or traps.
pub type HostFunc = Box<dyn Fn(&[Value]) -> Result<Vec<Value>, Trap>>;

/// A function in the store: a wasm function belonging to an instance, or a
/// host function registered directly.
pub enum FunctionInstance {
    Wasm {
        instance_id: usize,
        /// Index in the owning instance's full function index space.
        func_idx: u32,
        func_type: FuncType,
    },
    Host {
        func: HostFunc,
        func_type: FuncType,
    },
}

impl FunctionInstance {
    pub fn func_type(&self) -> &FuncType {
        match self {
            FunctionInstance::Wasm { func_type, .. } => func_type,
            FunctionInstance::Host { func_type, .. } => func_type,
        }
    }
}

/// The store.
pub struct Store {
    pub(crate) functions: Vec<FunctionInstance>,
    pub(crate) memories: Vec<SharedMemory>,
    pub(crate) tables: Vec<SharedTable>,
    pub(crate) globals: Vec<SharedGlobal>,
    pub(crate) instances: Vec<Instance>,
    max_call_depth: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store {
            functions: Vec::new(),
            memories: Vec::new(),
            tables: Vec::new(),
            globals: Vec::new(),
            instances: Vec::new(),
            max_call_depth: 1024,
        }
    }

    /// Cap on nested wasm calls before a call-stack-exhaustion trap.
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    pub(crate) fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Register a host function and return its address, usable as a function
    /// import or a table element.
    pub fn register_host_func(
        &mut self,
        func_type: FuncType,
        func: impl Fn(&[Value]) -> Result<Vec<Value>, Trap> + 'static,
    ) -> FuncAddr {
        let addr = FuncAddr(self.functions.len());
        self.functions.push(FunctionInstance::Host {
            func: Box::new(func),
            func_type,
        });
        addr
    }

    /// Allocate a fresh memory, e.g. to satisfy a module's memory import.
    pub fn allocate_memory(&mut self, limits: Limits) -> MemoryAddr {
        let addr = MemoryAddr(self.memories.len());
        self.memories.push(Rc::new(RefCell::new(Memory::new(limits))));
        addr
    }

    /// Allocate a fresh table.
    pub fn allocate_table(&mut self, ty: TableType) -> TableAddr {
        let addr = TableAddr(self.tables.len());
        self.tables.push(Rc::new(RefCell::new(Table::new(ty))));
        addr
    }

    /// Allocate a fresh global cell.
    pub fn allocate_global(&mut self, ty: GlobalType, value: Value) -> GlobalAddr {
        let addr = GlobalAddr(self.globals.len());
        self.globals.push(Rc::new(GlobalCell::new(ty, value)));
        addr
    }

    pub fn memory(&self, addr: MemoryAddr) -> Option<&SharedMemory> {
        self.memories.get(addr.0)
    }

    pub fn table(&self, addr: TableAddr) -> Option<&SharedTable> {
        self.tables.get(addr.0)
    }

    pub fn global(&self, addr: GlobalAddr) -> Option<&SharedGlobal> {
        self.globals.get(addr.0)
    }

    pub fn func_type(&self, addr: FuncAddr) -> Option<&FuncType> {
        self.functions.get(addr.0).map(|f| f.func_type())
    }

    pub(crate) fn function(&self, addr: FuncAddr) -> Option<&FunctionInstance> {
        self.functions.get(addr.0)
    }

    pub fn instance(&self, instance_id: usize) -> Option<&Instance> {
        self.instances.get(instance_id)
    }

    /// Instantiate a module against the given imports.
    ///
    /// Validates the module, resolves imports in declaration order,
    /// allocates store resources, applies active segments, runs the start
    /// function, and exposes exports, in exactly that order. On any
    /// failure, every allocation made for this instance is rolled back and
    /// the instance id is never handed out.
    pub fn instantiate(
        &mut self,
        module: &Module,
        imports: &ImportObject,
    ) -> Result<usize, InstantiateError> {
        validator::validate(module)?;

        let snapshot = (
            self.functions.len(),
            self.memories.len(),
            self.tables.len(),
            self.globals.len(),
            self.instances.len(),
        );
        let result = self.instantiate_validated(Rc::new(module.clone()), imports);
        if result.is_err() {
            let (nf, nm, nt, ng, ni) = snapshot;
            self.functions.truncate(nf);
            self.memories.truncate(nm);
            self.tables.truncate(nt);
            self.globals.truncate(ng);
            self.instances.truncate(ni);
        }
        result
    }

    fn instantiate_validated(
        &mut self,
        module: Rc<Module>,
        imports: &ImportObject,
    ) -> Result<usize, InstantiateError> {
        let instance_id = self.instances.len();

        // 1. Import resolution, in declaration order.
        let mut func_addrs: Vec<FuncAddr> = Vec::new();
        let mut memories = Vec::new();
        let mut memory_addrs = Vec::new();
        let mut tables = Vec::new();
        let mut table_addrs = Vec::new();
        let mut globals = Vec::new();
        let mut global_addrs = Vec::new();

        for import in &module.imports {
            let found = imports.get(&import.module, &import.field).ok_or_else(|| {
                LinkError::UnknownImport {
                    module: import.module.clone(),
                    field: import.field.clone(),
                }
            })?;
            let incompatible = |expected: String, actual: String| LinkError::IncompatibleImport {
                module: import.module.clone(),
                field: import.field.clone(),
                expected,
                actual,
            };

            match (&import.kind, found) {
                (ImportKind::Func(type_idx), ExternVal::Func(addr)) => {
                    let expected = &module.types[*type_idx as usize];
                    let actual = self
                        .func_type(addr)
                        .ok_or_else(|| incompatible(expected.to_string(), "invalid address".into()))?;
                    if actual != expected {
                        return Err(
                            incompatible(expected.to_string(), actual.to_string()).into()
                        );
                    }
                    func_addrs.push(addr);
                }
                (ImportKind::Memory(declared), ExternVal::Memory(addr)) => {
                    let shared = self
                        .memory(addr)
                        .ok_or_else(|| incompatible("memory".into(), "invalid address".into()))?
                        .clone();
                    {
                        let mem = shared.borrow();
                        check_limits(mem.size(), mem.max_pages(), declared).map_err(|actual| {
                            incompatible(format!("memory {declared}"), actual)
                        })?;
                    }
                    memories.push(shared);
                    memory_addrs.push(addr);
                }
                (ImportKind::Table(declared), ExternVal::Table(addr)) => {
                    let shared = self
                        .table(addr)
                        .ok_or_else(|| incompatible("table".into(), "invalid address".into()))?
                        .clone();
                    {
                        let table = shared.borrow();
                        if table.ref_type() != declared.ref_type {
                            return Err(incompatible(
                                declared.ref_type.to_string(),
                                table.ref_type().to_string(),
                            )
                            .into());
                        }
                        check_limits(table.size(), table.max(), &declared.limits).map_err(
                            |actual| incompatible(format!("table {}", declared.limits), actual),
                        )?;
                    }
                    tables.push(shared);
                    table_addrs.push(addr);
                }
                (ImportKind::Global(declared), ExternVal::Global(addr)) => {
                    let shared = self
                        .global(addr)
                        .ok_or_else(|| incompatible("global".into(), "invalid address".into()))?
                        .clone();
                    if shared.ty() != *declared {
                        return Err(incompatible(
                            declared.to_string(),
                            shared.ty().to_string(),
                        )
                        .into());
                    }
                    globals.push(shared);
                    global_addrs.push(addr);
                }
                (kind, found) => {
                    let expected = match kind {
                        ImportKind::Func(_) => "function",
                        ImportKind::Table(_) => "table",
                        ImportKind::Memory(_) => "memory",
                        ImportKind::Global(_) => "global",
                    };
                    let actual = match found {
                        ExternVal::Func(_) => "function",
                        ExternVal::Table(_) => "table",
                        ExternVal::Memory(_) => "memory",
                        ExternVal::Global(_) => "global",
                    };
                    return Err(incompatible(expected.into(), actual.into()).into());
                }
            }
        }

        // 2. Allocation: local functions first so constant expressions can
        // resolve ref.func, then memory, table, and globals.
        for (local_idx, type_idx) in module.functions.iter().enumerate() {
            let func_idx = (module.num_imported_funcs() + local_idx) as u32;
            let func_type = module.types[*type_idx as usize].clone();
            let addr = FuncAddr(self.functions.len());
            self.functions.push(FunctionInstance::Wasm {
                instance_id,
                func_idx,
                func_type,
            });
            func_addrs.push(addr);
        }

        for limits in &module.memories {
            let addr = self.allocate_memory(*limits);
            memories.push(self.memories[addr.0].clone());
            memory_addrs.push(addr);
        }

        for table_type in &module.tables {
            let addr = self.allocate_table(*table_type);
            tables.push(self.tables[addr.0].clone());
            table_addrs.push(addr);
        }

        for global in &module.globals {
            let value = eval_const(&global.init, &globals, &func_addrs);
            let addr = self.allocate_global(global.ty, value);
            globals.push(self.globals[addr.0].clone());
            global_addrs.push(addr);
        }

        // Compile local function bodies into their structured form.
        let mut funcs = Vec::with_capacity(module.code.len());
        for (local_idx, body) in module.code.iter().enumerate() {
            let func_type = module.types[module.functions[local_idx] as usize].clone();
            let tree = structured::build(&body.instrs)
                .map_err(|_| ValidationError::UnbalancedControl)?;
            funcs.push(Rc::new(CompiledFunc {
                func_type,
                locals: body.locals.iter_types().collect(),
                body: tree,
            }));
        }

        // Passive element segments hold resolved references; active and
        // declarative segments are dropped once instantiation completes.
        let elem_segments: Vec<Option<Vec<Value>>> = module
            .elements
            .iter()
            .map(|segment| match segment.mode {
                ElementMode::Passive => Some(
                    segment
                        .funcs
                        .iter()
                        .map(|fi| Value::FuncRef(Some(func_addrs[*fi as usize])))
                        .collect(),
                ),
                ElementMode::Active { .. } | ElementMode::Declarative => None,
            })
            .collect();

        let data_segments: Vec<Option<Vec<u8>>> = module
            .datas
            .iter()
            .map(|segment| match segment.mode {
                DataMode::Passive => Some(segment.init.clone()),
                DataMode::Active { .. } => None,
            })
            .collect();

        let exports = module
            .exports
            .iter()
            .map(|export| {
                let value = match export.kind {
                    crate::module::ExportKind::Func(i) => {
                        ExternVal::Func(func_addrs[i as usize])
                    }
                    crate::module::ExportKind::Table(i) => {
                        ExternVal::Table(table_addrs[i as usize])
                    }
                    crate::module::ExportKind::Memory(i) => {
                        ExternVal::Memory(memory_addrs[i as usize])
                    }
                    crate::module::ExportKind::Global(i) => {
                        ExternVal::Global(global_addrs[i as usize])
                    }
                };
                (export.name.clone(), value)
            })
            .collect::<HashMap<_, _>>();

        let instance = Instance {
            module: module.clone(),
            func_addrs,
            memories,
            memory_addrs,
            tables,
            table_addrs,
            globals,
            global_addrs,
            funcs,
            elem_segments: RefCell::new(elem_segments),
            data_segments: RefCell::new(data_segments),
            exports,
        };
        self.instances.push(instance);
        let instance = &self.instances[instance_id];

        // 3. Segment initialization, in declaration order: element segments,
        // then data segments. An out-of-bounds offset traps and aborts the
        // whole instantiation.
        for segment in &module.elements {
            if let ElementMode::Active {
                table_index,
                offset,
            } = &segment.mode
            {
                let offset = eval_const(offset, &instance.globals, &instance.func_addrs)
                    .as_i32()
                    .expect("validated i32 offset") as u32;
                let refs: Vec<Value> = segment
                    .funcs
                    .iter()
                    .map(|fi| Value::FuncRef(Some(instance.func_addrs[*fi as usize])))
                    .collect();
                let table = &instance.tables[*table_index as usize];
                table
                    .borrow_mut()
                    .init(offset, &refs, 0, refs.len() as u32)?;
            }
        }

        for segment in &module.datas {
            if let DataMode::Active {
                memory_index,
                offset,
            } = &segment.mode
            {
                let offset = eval_const(offset, &instance.globals, &instance.func_addrs)
                    .as_i32()
                    .expect("validated i32 offset") as u32;
                let memory = &instance.memories[*memory_index as usize];
                memory
                    .borrow_mut()
                    .write_bytes(offset as u64, &segment.init)?;
            }
        }

        // 4. Start function. A trap here discards the instance; exports
        // (step 5) only become reachable on success.
        if let Some(start) = module.start {
            debug!("running start function {start}");
            let addr = self.instances[instance_id].func_addrs[start as usize];
            let mut interp = Interpreter::new(self);
            interp.call(addr, Vec::new())?;
        }

        debug!(
            "instantiated module as instance {instance_id} with {} exports",
            self.instances[instance_id].exports().len()
        );
        Ok(instance_id)
    }

    /// Call an exported function by name.
    pub fn invoke_export(
        &self,
        instance_id: usize,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, InvokeError> {
        self.invoke_export_with_budget(instance_id, name, args, None)
    }

    /// Call an exported function with an optional instruction budget; when
    /// the budget runs out the call traps at the next instruction boundary.
    pub fn invoke_export_with_budget(
        &self,
        instance_id: usize,
        name: &str,
        args: Vec<Value>,
        budget: Option<u64>,
    ) -> Result<Vec<Value>, InvokeError> {
        let instance = self
            .instance(instance_id)
            .ok_or(InvokeError::InvalidAddress)?;
        let addr = match instance.export(name) {
            Some(ExternVal::Func(addr)) => addr,
            Some(_) => return Err(InvokeError::NotAFunction(name.to_string())),
            None => return Err(InvokeError::UnknownExport(name.to_string())),
        };
        self.call_with_budget(addr, args, budget)
    }

    /// Call any function address with argument checking.
    pub fn call(&self, addr: FuncAddr, args: Vec<Value>) -> Result<Vec<Value>, InvokeError> {
        self.call_with_budget(addr, args, None)
    }

    pub fn call_with_budget(
        &self,
        addr: FuncAddr,
        args: Vec<Value>,
        budget: Option<u64>,
    ) -> Result<Vec<Value>, InvokeError> {
        let func_type = self.func_type(addr).ok_or(InvokeError::InvalidAddress)?;
        if args.len() != func_type.params.len() {
            return Err(InvokeError::ArgumentCount {
                expected: func_type.params.len(),
                actual: args.len(),
            });
        }
        for (index, (arg, expected)) in args.iter().zip(&func_type.params).enumerate() {
            if arg.typ() != *expected {
                return Err(InvokeError::ArgumentType {
                    index,
                    expected: expected.to_string(),
                    actual: arg.typ().to_string(),
                });
            }
        }
        let mut interp = Interpreter::with_budget(self, budget);
        Ok(interp.call(addr, args)?)
    }

    /// Read a global, host-side.
    pub fn global_get(&self, addr: GlobalAddr) -> Result<Value, InvokeError> {
        Ok(self
            .global(addr)
            .ok_or(InvokeError::InvalidAddress)?
            .get())
    }

    /// Write a global, host-side. Mutability and type are enforced here,
    /// mirroring the checks validation applies to wasm code.
    pub fn global_set(&self, addr: GlobalAddr, value: Value) -> Result<(), InvokeError> {
        let cell = self.global(addr).ok_or(InvokeError::InvalidAddress)?;
        if !cell.ty().mutable {
            return Err(InvokeError::ImmutableGlobal);
        }
        if value.typ() != cell.ty().value_type {
            return Err(InvokeError::ValueTypeMismatch);
        }
        cell.set(value);
        Ok(())
    }

    /// Read bytes out of a memory, host-side.
    pub fn read_memory(
        &self,
        addr: MemoryAddr,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>, InvokeError> {
        let mem = self.memory(addr).ok_or(InvokeError::InvalidAddress)?;
        Ok(mem.borrow().read_bytes(offset, len)?)
    }

    /// Write bytes into a memory, host-side.
    pub fn write_memory(
        &self,
        addr: MemoryAddr,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), InvokeError> {
        let mem = self.memory(addr).ok_or(InvokeError::InvalidAddress)?;
        Ok(mem.borrow_mut().write_bytes(offset, bytes)?)
    }
}

/// Import limit matching: the provided entity must offer at least the
/// declared minimum and stay within the declared maximum, if one exists.
/// Returns a description of the actual limits on mismatch.
fn check_limits(actual_min: u32, actual_max: Option<u32>, declared: &Limits) -> Result<(), String> {
    let describe = || match actual_max {
        Some(max) => format!("min={actual_min} max={max}"),
        None => format!("min={actual_min}"),
    };
    if actual_min < declared.min {
        return Err(describe());
    }
    if let Some(declared_max) = declared.max {
        match actual_max {
            Some(actual_max) if actual_max <= declared_max => {}
            _ => return Err(describe()),
        }
    }
    Ok(())
}

/// Evaluate a validated constant expression.
fn eval_const(expr: &ConstExpr, globals: &[SharedGlobal], func_addrs: &[FuncAddr]) -> Value {
    use crate::decoder::instruction::Instr;

    let mut value = Value::I32(0);
    for instr in &expr.instrs {
        value = match instr {
            Instr::I32Const { value } => Value::I32(*value),
            Instr::I64Const { value } => Value::I64(*value),
            Instr::F32Const { value } => Value::F32(*value),
            Instr::F64Const { value } => Value::F64(*value),
            Instr::RefNull { ref_type } => Value::null_ref(*ref_type),
            Instr::RefFunc { func_idx } => Value::FuncRef(Some(func_addrs[*func_idx as usize])),
            Instr::GlobalGet { global_idx } => globals[*global_idx as usize].get(),
            Instr::End => break,
            other => unreachable!("disallowed instruction {other:?} in validated constant expression"),
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{RefType, ValueType};

    #[test]
    fn address_allocation_is_sequential() {
        let mut store = Store::new();
        let m1 = store.allocate_memory(Limits { min: 1, max: None });
        let m2 = store.allocate_memory(Limits { min: 2, max: None });
        assert_eq!(m1, MemoryAddr(0));
        assert_eq!(m2, MemoryAddr(1));
        assert_eq!(store.memory(m1).unwrap().borrow().size(), 1);
        assert_eq!(store.memory(m2).unwrap().borrow().size(), 2);
        assert!(store.memory(MemoryAddr(2)).is_none());
    }

    #[test]
    fn shared_memory_aliases() {
        let mut store = Store::new();
        let addr = store.allocate_memory(Limits { min: 1, max: None });
        let a = store.memory(addr).unwrap().clone();
        let b = store.memory(addr).unwrap().clone();
        a.borrow_mut().write_u32(0, 0xdeadbeef).unwrap();
        assert_eq!(b.borrow().read_u32(0).unwrap(), 0xdeadbeef);
    }

    #[test]
    fn host_function_registration() {
        let mut store = Store::new();
        let ftype = FuncType {
            params: vec![ValueType::I32],
            results: vec![ValueType::I32],
        };
        let addr = store.register_host_func(ftype.clone(), |args| {
            Ok(vec![Value::I32(args[0].as_i32().unwrap() + 1)])
        });
        assert_eq!(store.func_type(addr), Some(&ftype));
        let results = store.call(addr, vec![Value::I32(41)]).unwrap();
        assert_eq!(results, vec![Value::I32(42)]);
    }

    #[test]
    fn call_checks_argument_types() {
        let mut store = Store::new();
        let addr = store.register_host_func(
            FuncType {
                params: vec![ValueType::I32],
                results: vec![],
            },
            |_| Ok(vec![]),
        );
        assert!(matches!(
            store.call(addr, vec![]),
            Err(InvokeError::ArgumentCount {
                expected: 1,
                actual: 0
            })
        ));
        assert!(matches!(
            store.call(addr, vec![Value::I64(1)]),
            Err(InvokeError::ArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn global_host_access_is_checked() {
        let mut store = Store::new();
        let mutable = store.allocate_global(
            GlobalType {
                value_type: ValueType::I32,
                mutable: true,
            },
            Value::I32(1),
        );
        let immutable = store.allocate_global(
            GlobalType {
                value_type: ValueType::I32,
                mutable: false,
            },
            Value::I32(2),
        );

        store.global_set(mutable, Value::I32(5)).unwrap();
        assert_eq!(store.global_get(mutable).unwrap(), Value::I32(5));
        assert!(matches!(
            store.global_set(immutable, Value::I32(0)),
            Err(InvokeError::ImmutableGlobal)
        ));
        assert!(matches!(
            store.global_set(mutable, Value::I64(0)),
            Err(InvokeError::ValueTypeMismatch)
        ));
    }

    #[test]
    fn limit_matching() {
        // actual min must cover the declared min
        assert!(check_limits(1, None, &Limits { min: 2, max: None }).is_err());
        assert!(check_limits(2, None, &Limits { min: 2, max: None }).is_ok());
        // a declared max requires an actual max within it
        assert!(check_limits(2, None, &Limits { min: 1, max: Some(4) }).is_err());
        assert!(check_limits(2, Some(5), &Limits { min: 1, max: Some(4) }).is_err());
        assert!(check_limits(2, Some(4), &Limits { min: 1, max: Some(4) }).is_ok());
    }

    #[test]
    fn table_allocation() {
        let mut store = Store::new();
        let addr = store.allocate_table(TableType {
            ref_type: RefType::FuncRef,
            limits: Limits {
                min: 3,
                max: Some(5),
            },
        });
        assert_eq!(store.table(addr).unwrap().borrow().size(), 3);
    }
}
