//! Runtime value representation.

use std::fmt;

use fhex::ToHex;

use crate::module::{RefType, ValueType};
use crate::runtime::store::FuncAddr;

/// An opaque host reference carried by `externref` values. Only the host can
/// mint one; WebAssembly code can merely store, pass, and null-check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternAddr(pub usize);

/// A runtime value.
///
/// References are unforgeable: no instruction converts an integer into a
/// [`Value::FuncRef`] or [`Value::ExternRef`], and their payloads are store
/// addresses the host or instantiator produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    FuncRef(Option<FuncAddr>),
    ExternRef(Option<ExternAddr>),
}

impl Value {
    /// The WebAssembly type of this value.
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::FuncRef(_) => ValueType::FuncRef,
            Value::ExternRef(_) => ValueType::ExternRef,
        }
    }

    /// The zero/null value of a type, used for locals and fresh globals.
    pub fn default_for(vt: ValueType) -> Value {
        match vt {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
            ValueType::FuncRef => Value::FuncRef(None),
            ValueType::ExternRef => Value::ExternRef(None),
        }
    }

    /// The null reference of a table's element kind.
    pub fn null_ref(rt: RefType) -> Value {
        match rt {
            RefType::FuncRef => Value::FuncRef(None),
            RefType::ExternRef => Value::ExternRef(None),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this is a reference value (of either kind).
    pub fn is_ref(&self) -> bool {
        matches!(self, Value::FuncRef(_) | Value::ExternRef(_))
    }

    /// Whether this is a null reference.
    pub fn is_null_ref(&self) -> bool {
        matches!(self, Value::FuncRef(None) | Value::ExternRef(None))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
            Value::FuncRef(None) => write!(f, "funcref:null"),
            Value::FuncRef(Some(addr)) => write!(f, "funcref:{}", addr.0),
            Value::ExternRef(None) => write!(f, "externref:null"),
            Value::ExternRef(Some(addr)) => write!(f, "externref:{}", addr.0),
        }
    }
}
