//! Relational, boolean, and bitwise operators.

use std::cmp::Ordering;

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    object::{Object, Value},
};

/// `eq` compares freely across integer/real and string/name; other type
/// mismatches are simply unequal
pub(crate) fn eq(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop()?;
    let a = interp.pop()?;

    let equal = interp.objects_equal(&a, &b);
    interp.push(Object::boolean(equal));

    Ok(())
}

pub(crate) fn ne(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop()?;
    let a = interp.pop()?;

    let equal = interp.objects_equal(&a, &b);
    interp.push(Object::boolean(!equal));

    Ok(())
}

/// Ordering for `ge gt le lt`: numbers compare numerically, strings compare
/// bytewise; anything else is a typecheck
fn compare(interp: &mut Interpreter) -> PsResult<Ordering> {
    let b = interp.pop()?;
    let a = interp.pop()?;

    match (&a.value, &b.value) {
        (Value::String(s1), Value::String(s2)) => {
            Ok(interp.string_bytes(*s1)?.cmp(&interp.string_bytes(*s2)?))
        }
        _ if a.is_number() && b.is_number() => {
            let a = match a.value {
                Value::Integer(n) => n as f64,
                Value::Real(r) => r,
                _ => unreachable!(),
            };
            let b = match b.value {
                Value::Integer(n) => n as f64,
                Value::Real(r) => r,
                _ => unreachable!(),
            };

            Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        }
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }
}

pub(crate) fn ge(interp: &mut Interpreter) -> PsResult<()> {
    let ordering = compare(interp)?;
    interp.push(Object::boolean(ordering != Ordering::Less));

    Ok(())
}

pub(crate) fn gt(interp: &mut Interpreter) -> PsResult<()> {
    let ordering = compare(interp)?;
    interp.push(Object::boolean(ordering == Ordering::Greater));

    Ok(())
}

pub(crate) fn le(interp: &mut Interpreter) -> PsResult<()> {
    let ordering = compare(interp)?;
    interp.push(Object::boolean(ordering != Ordering::Greater));

    Ok(())
}

pub(crate) fn lt(interp: &mut Interpreter) -> PsResult<()> {
    let ordering = compare(interp)?;
    interp.push(Object::boolean(ordering == Ordering::Less));

    Ok(())
}

/// Logical on booleans, bitwise on integers
fn boolean_or_bitwise(
    interp: &mut Interpreter,
    bools: impl Fn(bool, bool) -> bool,
    ints: impl Fn(i64, i64) -> i64,
) -> PsResult<()> {
    let b = interp.pop()?;
    let a = interp.pop()?;

    match (&a.value, &b.value) {
        (Value::Boolean(a), Value::Boolean(b)) => {
            interp.push(Object::boolean(bools(*a, *b)));
        }
        (Value::Integer(a), Value::Integer(b)) => {
            interp.push(Object::integer(ints(*a, *b)));
        }
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }

    Ok(())
}

pub(crate) fn and(interp: &mut Interpreter) -> PsResult<()> {
    boolean_or_bitwise(interp, |a, b| a && b, |a, b| a & b)
}

pub(crate) fn or(interp: &mut Interpreter) -> PsResult<()> {
    boolean_or_bitwise(interp, |a, b| a || b, |a, b| a | b)
}

pub(crate) fn xor(interp: &mut Interpreter) -> PsResult<()> {
    boolean_or_bitwise(interp, |a, b| a ^ b, |a, b| a ^ b)
}

pub(crate) fn not(interp: &mut Interpreter) -> PsResult<()> {
    match interp.pop()?.value {
        Value::Boolean(b) => interp.push(Object::boolean(!b)),
        Value::Integer(n) => interp.push(Object::integer(!n)),
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }

    Ok(())
}

/// Positive shifts go left, negative shifts go right
pub(crate) fn bitshift(interp: &mut Interpreter) -> PsResult<()> {
    let shift = interp.pop_int()?;
    let n = interp.pop_int()?;

    let result = if shift >= 0 {
        n.checked_shl(u32::try_from(shift).unwrap_or(u32::MAX))
            .unwrap_or(0)
    } else {
        n >> u32::try_from(-shift).unwrap_or(63).min(63)
    };

    interp.push(Object::integer(result));

    Ok(())
}

pub(crate) fn push_true(interp: &mut Interpreter) -> PsResult<()> {
    interp.push(Object::boolean(true));

    Ok(())
}

pub(crate) fn push_false(interp: &mut Interpreter) -> PsResult<()> {
    interp.push(Object::boolean(false));

    Ok(())
}

pub(crate) fn push_null(interp: &mut Interpreter) -> PsResult<()> {
    interp.push(Object::null());

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{graphics::RecordingDevice, interpreter::Interpreter, object::Object};

    fn run(source: &[u8]) -> Vec<Object> {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        interp.run().unwrap();

        interp.operand_stack.clone()
    }

    #[test]
    fn eq_across_numeric_types() {
        assert_eq!(run(b"1 1.0 eq"), vec![Object::boolean(true)]);
        assert_eq!(run(b"1 2 eq"), vec![Object::boolean(false)]);
    }

    #[test]
    fn eq_string_and_name() {
        assert_eq!(run(b"(abc) /abc eq"), vec![Object::boolean(true)]);
    }

    #[test]
    fn eq_mismatched_types_is_false() {
        assert_eq!(run(b"1 (1) eq"), vec![Object::boolean(false)]);
        assert_eq!(run(b"1 (1) ne"), vec![Object::boolean(true)]);
    }

    #[test]
    fn composite_equality_is_by_shared_value() {
        assert_eq!(run(b"/a [1 2] def a a eq"), vec![Object::boolean(true)]);
        assert_eq!(run(b"[1 2] [1 2] eq"), vec![Object::boolean(false)]);
    }

    #[test]
    fn string_ordering_is_bytewise() {
        assert_eq!(run(b"(abc) (abd) lt"), vec![Object::boolean(true)]);
        assert_eq!(run(b"(b) (abc) gt"), vec![Object::boolean(true)]);
    }

    #[test]
    fn and_or_switch_on_operand_type() {
        assert_eq!(run(b"true false and"), vec![Object::boolean(false)]);
        assert_eq!(run(b"12 10 and"), vec![Object::integer(8)]);
        assert_eq!(run(b"12 10 or"), vec![Object::integer(14)]);
        assert_eq!(run(b"12 10 xor"), vec![Object::integer(6)]);
    }

    #[test]
    fn not_complements_integers() {
        assert_eq!(run(b"0 not"), vec![Object::integer(-1)]);
        assert_eq!(run(b"true not"), vec![Object::boolean(false)]);
    }

    #[test]
    fn bitshift_in_both_directions() {
        assert_eq!(run(b"1 4 bitshift"), vec![Object::integer(16)]);
        assert_eq!(run(b"16 -4 bitshift"), vec![Object::integer(1)]);
    }
}
