//! Conversions between numeric types.
//!
//! The trapping float-to-int truncations reject NaN (invalid conversion)
//! and out-of-range values (integer overflow). The saturating variants
//! clamp to the integer range and map NaN to 0, which is exactly the
//! behavior of Rust's `as` casts between floats and integers.

use crate::runtime::stack::Stack;
use crate::runtime::{Trap, Value};

macro_rules! cvt_op {
    ($name:ident, $pop:ident, |$a:ident| $body:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), Trap> {
            let $a = stack.$pop()?;
            stack.push($body);
            Ok(())
        }
    };
}

cvt_op!(i32_wrap_i64, pop_i64, |a| Value::I32(a as i32));
cvt_op!(i64_extend_i32_s, pop_i32, |a| Value::I64(a as i64));
cvt_op!(i64_extend_i32_u, pop_i32, |a| Value::I64(a as u32 as i64));

cvt_op!(i32_extend8_s, pop_i32, |a| Value::I32(a as i8 as i32));
cvt_op!(i32_extend16_s, pop_i32, |a| Value::I32(a as i16 as i32));
cvt_op!(i64_extend8_s, pop_i64, |a| Value::I64(a as i8 as i64));
cvt_op!(i64_extend16_s, pop_i64, |a| Value::I64(a as i16 as i64));
cvt_op!(i64_extend32_s, pop_i64, |a| Value::I64(a as i32 as i64));

cvt_op!(f32_convert_i32_s, pop_i32, |a| Value::F32(a as f32));
cvt_op!(f32_convert_i32_u, pop_i32, |a| Value::F32(a as u32 as f32));
cvt_op!(f32_convert_i64_s, pop_i64, |a| Value::F32(a as f32));
cvt_op!(f32_convert_i64_u, pop_i64, |a| Value::F32(a as u64 as f32));
cvt_op!(f64_convert_i32_s, pop_i32, |a| Value::F64(a as f64));
cvt_op!(f64_convert_i32_u, pop_i32, |a| Value::F64(a as u32 as f64));
cvt_op!(f64_convert_i64_s, pop_i64, |a| Value::F64(a as f64));
cvt_op!(f64_convert_i64_u, pop_i64, |a| Value::F64(a as u64 as f64));

cvt_op!(f32_demote_f64, pop_f64, |a| Value::F32(a as f32));
cvt_op!(f64_promote_f32, pop_f32, |a| Value::F64(a as f64));

cvt_op!(i32_reinterpret_f32, pop_f32, |a| Value::I32(a.to_bits() as i32));
cvt_op!(i64_reinterpret_f64, pop_f64, |a| Value::I64(a.to_bits() as i64));
cvt_op!(f32_reinterpret_i32, pop_i32, |a| Value::F32(f32::from_bits(a as u32)));
cvt_op!(f64_reinterpret_i64, pop_i64, |a| Value::F64(f64::from_bits(a as u64)));

/// Check a truncated float against an inclusive-exclusive integer range.
macro_rules! trunc_checked {
    ($name:ident, $pop:ident, $lo:expr, $hi:expr, |$t:ident| $push:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), Trap> {
            let x = stack.$pop()?;
            if x.is_nan() {
                return Err(Trap::InvalidConversion);
            }
            let $t = x.trunc();
            if $t < $lo || $t >= $hi {
                return Err(Trap::IntegerOverflow);
            }
            stack.push($push);
            Ok(())
        }
    };
}

trunc_checked!(i32_trunc_f32_s, pop_f32, -2147483648.0, 2147483648.0, |t| {
    Value::I32(t as i32)
});
trunc_checked!(i32_trunc_f32_u, pop_f32, -0.0, 4294967296.0, |t| {
    Value::I32(t as u32 as i32)
});
trunc_checked!(i32_trunc_f64_s, pop_f64, -2147483648.0, 2147483648.0, |t| {
    Value::I32(t as i32)
});
trunc_checked!(i32_trunc_f64_u, pop_f64, -0.0, 4294967296.0, |t| {
    Value::I32(t as u32 as i32)
});
trunc_checked!(
    i64_trunc_f32_s,
    pop_f32,
    -9223372036854775808.0,
    9223372036854775808.0,
    |t| Value::I64(t as i64)
);
trunc_checked!(i64_trunc_f32_u, pop_f32, -0.0, 18446744073709551616.0, |t| {
    Value::I64(t as u64 as i64)
});
trunc_checked!(
    i64_trunc_f64_s,
    pop_f64,
    -9223372036854775808.0,
    9223372036854775808.0,
    |t| Value::I64(t as i64)
);
trunc_checked!(i64_trunc_f64_u, pop_f64, -0.0, 18446744073709551616.0, |t| {
    Value::I64(t as u64 as i64)
});

macro_rules! trunc_sat {
    ($name:ident, $pop:ident, |$a:ident| $body:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), Trap> {
            let $a = stack.$pop()?;
            stack.push($body);
            Ok(())
        }
    };
}

trunc_sat!(i32_trunc_sat_f32_s, pop_f32, |a| Value::I32(a as i32));
trunc_sat!(i32_trunc_sat_f32_u, pop_f32, |a| Value::I32(a as u32 as i32));
trunc_sat!(i32_trunc_sat_f64_s, pop_f64, |a| Value::I32(a as i32));
trunc_sat!(i32_trunc_sat_f64_u, pop_f64, |a| Value::I32(a as u32 as i32));
trunc_sat!(i64_trunc_sat_f32_s, pop_f32, |a| Value::I64(a as i64));
trunc_sat!(i64_trunc_sat_f32_u, pop_f32, |a| Value::I64(a as u64 as i64));
trunc_sat!(i64_trunc_sat_f64_s, pop_f64, |a| Value::I64(a as i64));
trunc_sat!(i64_trunc_sat_f64_u, pop_f64, |a| Value::I64(a as u64 as i64));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_and_extend() {
        let mut stack = Stack::new();
        stack.push(Value::I64(0x1_0000_0001));
        i32_wrap_i64(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 1);

        stack.push(Value::I32(-1));
        i64_extend_i32_u(&mut stack).unwrap();
        assert_eq!(stack.pop_i64().unwrap(), 0xffffffff);

        stack.push(Value::I32(-1));
        i64_extend_i32_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i64().unwrap(), -1);

        stack.push(Value::I32(0x80));
        i32_extend8_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), -128);
    }

    #[test]
    fn trunc_traps_on_nan_and_overflow() {
        let mut stack = Stack::new();
        stack.push(Value::F32(f32::NAN));
        assert_eq!(i32_trunc_f32_s(&mut stack), Err(Trap::InvalidConversion));

        stack.push(Value::F32(2147483648.0));
        assert_eq!(i32_trunc_f32_s(&mut stack), Err(Trap::IntegerOverflow));

        stack.push(Value::F64(-1.0));
        assert_eq!(i32_trunc_f64_u(&mut stack), Err(Trap::IntegerOverflow));

        stack.push(Value::F64(3.9));
        i32_trunc_f64_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 3);

        stack.push(Value::F64(-3.9));
        i32_trunc_f64_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), -3);

        // Values in (-1, 0) truncate to zero for the unsigned variants.
        stack.push(Value::F64(-0.75));
        i32_trunc_f64_u(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);
    }

    #[test]
    fn trunc_f64_s_boundary() {
        let mut stack = Stack::new();
        // -2147483648.7 truncates to exactly i32::MIN.
        stack.push(Value::F64(-2147483648.7));
        i32_trunc_f64_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), i32::MIN);

        stack.push(Value::F64(-2147483649.0));
        assert_eq!(i32_trunc_f64_s(&mut stack), Err(Trap::IntegerOverflow));
    }

    #[test]
    fn saturating_trunc_clamps() {
        let mut stack = Stack::new();
        stack.push(Value::F32(f32::NAN));
        i32_trunc_sat_f32_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);

        stack.push(Value::F32(1e10));
        i32_trunc_sat_f32_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), i32::MAX);

        stack.push(Value::F64(-1e300));
        i64_trunc_sat_f64_s(&mut stack).unwrap();
        assert_eq!(stack.pop_i64().unwrap(), i64::MIN);

        stack.push(Value::F64(-5.0));
        i32_trunc_sat_f64_u(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0);
    }

    #[test]
    fn reinterpret_preserves_bits() {
        let mut stack = Stack::new();
        stack.push(Value::F32(1.0));
        i32_reinterpret_f32(&mut stack).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 0x3f800000);

        stack.push(Value::I64(0x7ff8000000000000));
        f64_reinterpret_i64(&mut stack).unwrap();
        assert!(stack.pop_f64().unwrap().is_nan());
    }

    #[test]
    fn unsigned_convert() {
        let mut stack = Stack::new();
        stack.push(Value::I32(-1));
        f64_convert_i32_u(&mut stack).unwrap();
        assert_eq!(stack.pop_f64().unwrap(), 4294967295.0);
    }
}
