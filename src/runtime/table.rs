//! Tables: indexed arrays of opaque references.
//!
//! A table slot holds either null or a reference of the table's declared
//! element kind, never a raw integer. Indirect calls read function
//! references out of a table and check their signatures before dispatch;
//! that check lives in the interpreter, the bounds and kind checks live
//! here.

use crate::module::{RefType, TableType};
use crate::runtime::{Trap, Value};

/// A table instance.
#[derive(Debug)]
pub struct Table {
    ref_type: RefType,
    elements: Vec<Value>,
    max: Option<u32>,
}

impl Table {
    /// Create a table with `limits.min` null slots.
    pub fn new(ty: TableType) -> Self {
        Table {
            ref_type: ty.ref_type,
            elements: vec![Value::null_ref(ty.ref_type); ty.limits.min as usize],
            max: ty.limits.max,
        }
    }

    pub fn ref_type(&self) -> RefType {
        self.ref_type
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn get(&self, index: u32) -> Result<Value, Trap> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(Trap::TableOutOfBounds)
    }

    pub fn set(&mut self, index: u32, value: Value) -> Result<(), Trap> {
        self.check_kind(&value)?;
        match self.elements.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Trap::TableOutOfBounds),
        }
    }

    /// Grow by `delta` slots initialized to `init`.
    ///
    /// Returns the previous size, or `u32::MAX` (the `-1` sentinel) if the
    /// new size would exceed the declared maximum. Failure leaves the table
    /// unchanged.
    pub fn grow(&mut self, delta: u32, init: Value) -> Result<u32, Trap> {
        self.check_kind(&init)?;
        let old_size = self.size();
        let Some(new_size) = old_size.checked_add(delta) else {
            return Ok(u32::MAX);
        };
        if let Some(max) = self.max {
            if new_size > max {
                return Ok(u32::MAX);
            }
        }
        self.elements.resize(new_size as usize, init);
        Ok(old_size)
    }

    /// `table.fill`: set `len` slots starting at `start` to `value`.
    pub fn fill(&mut self, start: u32, value: Value, len: u32) -> Result<(), Trap> {
        self.check_kind(&value)?;
        let (start, len) = (start as usize, len as usize);
        let end = start.checked_add(len).ok_or(Trap::TableOutOfBounds)?;
        if end > self.elements.len() {
            return Err(Trap::TableOutOfBounds);
        }
        self.elements[start..end].fill(value);
        Ok(())
    }

    /// `table.copy` within one table; ranges may overlap.
    pub fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> Result<(), Trap> {
        let (dst, src, len) = (dst as usize, src as usize, len as usize);
        let dst_end = dst.checked_add(len).ok_or(Trap::TableOutOfBounds)?;
        let src_end = src.checked_add(len).ok_or(Trap::TableOutOfBounds)?;
        if dst_end > self.elements.len() || src_end > self.elements.len() {
            return Err(Trap::TableOutOfBounds);
        }
        self.elements.copy_within(src..src_end, dst);
        Ok(())
    }

    /// `table.init`: copy `len` references from `src` into slots at `dst`.
    pub fn init(&mut self, dst: u32, src: &[Value], offset: u32, len: u32) -> Result<(), Trap> {
        let (dst, offset, len) = (dst as usize, offset as usize, len as usize);
        let src_end = offset.checked_add(len).ok_or(Trap::TableOutOfBounds)?;
        let dst_end = dst.checked_add(len).ok_or(Trap::TableOutOfBounds)?;
        if src_end > src.len() || dst_end > self.elements.len() {
            return Err(Trap::TableOutOfBounds);
        }
        self.elements[dst..dst_end].copy_from_slice(&src[offset..src_end]);
        Ok(())
    }

    fn check_kind(&self, value: &Value) -> Result<(), Trap> {
        let matches = match self.ref_type {
            RefType::FuncRef => matches!(value, Value::FuncRef(_)),
            RefType::ExternRef => matches!(value, Value::ExternRef(_)),
        };
        if !matches {
            // Reachable only from unvalidated input or host misuse; the
            // unforgeability invariant rides on refusing it.
            return Err(Trap::Internal(format!(
                "table of {} cannot hold {}",
                self.ref_type,
                value.typ()
            )));
        }
        Ok(())
    }
}
