//! Test and comparison operations. Every result is an i32 of 0 or 1.

use crate::runtime::stack::Stack;
use crate::runtime::{Trap, Value};

macro_rules! test_op {
    ($name:ident, $pop:ident, |$a:ident| $body:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), Trap> {
            let $a = stack.$pop()?;
            stack.push(Value::I32($body as i32));
            Ok(())
        }
    };
}

macro_rules! rel_op {
    ($name:ident, $pop:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), Trap> {
            let $b = stack.$pop()?;
            let $a = stack.$pop()?;
            stack.push(Value::I32($body as i32));
            Ok(())
        }
    };
}

test_op!(i32_eqz, pop_i32, |a| a == 0);
rel_op!(i32_eq, pop_i32, |a, b| a == b);
rel_op!(i32_ne, pop_i32, |a, b| a != b);
rel_op!(i32_lt_s, pop_i32, |a, b| a < b);
rel_op!(i32_lt_u, pop_i32, |a, b| (a as u32) < (b as u32));
rel_op!(i32_gt_s, pop_i32, |a, b| a > b);
rel_op!(i32_gt_u, pop_i32, |a, b| (a as u32) > (b as u32));
rel_op!(i32_le_s, pop_i32, |a, b| a <= b);
rel_op!(i32_le_u, pop_i32, |a, b| (a as u32) <= (b as u32));
rel_op!(i32_ge_s, pop_i32, |a, b| a >= b);
rel_op!(i32_ge_u, pop_i32, |a, b| (a as u32) >= (b as u32));

test_op!(i64_eqz, pop_i64, |a| a == 0);
rel_op!(i64_eq, pop_i64, |a, b| a == b);
rel_op!(i64_ne, pop_i64, |a, b| a != b);
rel_op!(i64_lt_s, pop_i64, |a, b| a < b);
rel_op!(i64_lt_u, pop_i64, |a, b| (a as u64) < (b as u64));
rel_op!(i64_gt_s, pop_i64, |a, b| a > b);
rel_op!(i64_gt_u, pop_i64, |a, b| (a as u64) > (b as u64));
rel_op!(i64_le_s, pop_i64, |a, b| a <= b);
rel_op!(i64_le_u, pop_i64, |a, b| (a as u64) <= (b as u64));
rel_op!(i64_ge_s, pop_i64, |a, b| a >= b);
rel_op!(i64_ge_u, pop_i64, |a, b| (a as u64) >= (b as u64));

rel_op!(f32_eq, pop_f32, |a, b| a == b);
rel_op!(f32_ne, pop_f32, |a, b| a != b);
rel_op!(f32_lt, pop_f32, |a, b| a < b);
rel_op!(f32_gt, pop_f32, |a, b| a > b);
rel_op!(f32_le, pop_f32, |a, b| a <= b);
rel_op!(f32_ge, pop_f32, |a, b| a >= b);

rel_op!(f64_eq, pop_f64, |a, b| a == b);
rel_op!(f64_ne, pop_f64, |a, b| a != b);
rel_op!(f64_lt, pop_f64, |a, b| a < b);
rel_op!(f64_gt, pop_f64, |a, b| a > b);
rel_op!(f64_le, pop_f64, |a, b| a <= b);
rel_op!(f64_ge, pop_f64, |a, b| a >= b);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_vs_unsigned() {
        let mut stack = Stack::new();
        stack.push(Value::I32(-1));
        stack.push(Value::I32(1));
        i32_lt_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 1);

        stack.push(Value::I32(-1));
        stack.push(Value::I32(1));
        i32_lt_u(&mut stack).unwrap();
        // -1 is u32::MAX when compared unsigned.
        assert_eq!(stack.pop_i32().unwrap(), 0);
    }

    #[test]
    fn eqz() {
        let mut stack = Stack::new();
        stack.push(Value::I32(0));
        i32_eqz(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 1);

        stack.push(Value::I64(3));
        i64_eqz(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);
    }

    #[test]
    fn nan_compares_unordered() {
        let mut stack = Stack::new();
        stack.push(Value::F64(f64::NAN));
        stack.push(Value::F64(f64::NAN));
        f64_eq(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);

        stack.push(Value::F64(f64::NAN));
        stack.push(Value::F64(1.0));
        f64_ne(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 1);

        stack.push(Value::F32(f32::NAN));
        stack.push(Value::F32(1.0));
        f32_le(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);
    }
}
