//! Per-call locals frame.

use crate::module::ValueType;
use crate::runtime::{Trap, Value};

/// The local-variable array of one function activation: arguments first,
/// then declared locals zero-initialized. Created per call, owned by it,
/// destroyed on return.
#[derive(Debug)]
pub struct Frame {
    locals: Vec<Value>,
}

impl Frame {
    pub fn new(args: Vec<Value>, declared: &[ValueType]) -> Self {
        let mut locals = args;
        locals.extend(declared.iter().map(|vt| Value::default_for(*vt)));
        Frame { locals }
    }

    pub fn get(&self, idx: u32) -> Result<Value, Trap> {
        self.locals
            .get(idx as usize)
            .copied()
            .ok_or(Trap::Internal(format!("local index {idx} out of range")))
    }

    pub fn set(&mut self, idx: u32, value: Value) -> Result<(), Trap> {
        match self.locals.get_mut(idx as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Trap::Internal(format!("local index {idx} out of range"))),
        }
    }
}
