//! Arithmetic and math operators.
//!
//! Typing follows PLRM exactly: binary integer arithmetic stays integer
//! until it overflows, `div` always returns a real, `idiv`/`mod` require
//! integers, and the unary sign/rounding operators preserve the operand's
//! type.

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    object::{Object, Value},
};

fn number(obj: &Object) -> PsResult<f64> {
    match obj.value {
        Value::Integer(n) => Ok(n as f64),
        Value::Real(r) => Ok(r),
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }
}

/// If both operands are integers and the result is within integer range, the
/// result is an integer; otherwise, the result is a real number
fn binary(
    interp: &mut Interpreter,
    checked: impl Fn(i64, i64) -> Option<i64>,
    real: impl Fn(f64, f64) -> f64,
) -> PsResult<()> {
    let b = interp.pop()?;
    let a = interp.pop()?;

    if let (Value::Integer(x), Value::Integer(y)) = (&a.value, &b.value) {
        match checked(*x, *y) {
            Some(result) => interp.push(Object::integer(result)),
            None => interp.push(Object::real(real(*x as f64, *y as f64))),
        }

        return Ok(());
    }

    interp.push(Object::real(real(number(&a)?, number(&b)?)));

    Ok(())
}

pub(crate) fn add(interp: &mut Interpreter) -> PsResult<()> {
    binary(interp, i64::checked_add, |a, b| a + b)
}

pub(crate) fn sub(interp: &mut Interpreter) -> PsResult<()> {
    binary(interp, i64::checked_sub, |a, b| a - b)
}

pub(crate) fn mul(interp: &mut Interpreter) -> PsResult<()> {
    binary(interp, i64::checked_mul, |a, b| a * b)
}

/// Always produces a real quotient, even for integer operands
pub(crate) fn div(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop_number()?;
    let a = interp.pop_number()?;

    if b == 0.0 {
        anyhow::bail!(PostScriptError::UndefinedResult);
    }

    interp.push(Object::real(a / b));

    Ok(())
}

pub(crate) fn idiv(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop_int()?;
    let a = interp.pop_int()?;

    let quotient = a
        .checked_div(b)
        .ok_or(anyhow::anyhow!(PostScriptError::UndefinedResult))?;

    interp.push(Object::integer(quotient));

    Ok(())
}

/// The remainder has the same sign as the dividend
pub(crate) fn mod_op(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop_int()?;
    let a = interp.pop_int()?;

    let remainder = a
        .checked_rem(b)
        .ok_or(anyhow::anyhow!(PostScriptError::UndefinedResult))?;

    interp.push(Object::integer(remainder));

    Ok(())
}

/// Unary operator preserving the operand type: integers in, integers out
fn unary_preserving(
    interp: &mut Interpreter,
    int_op: impl Fn(i64) -> Option<i64>,
    real_op: impl Fn(f64) -> f64,
) -> PsResult<()> {
    match interp.pop()?.value {
        Value::Integer(n) => match int_op(n) {
            Some(result) => interp.push(Object::integer(result)),
            None => interp.push(Object::real(real_op(n as f64))),
        },
        Value::Real(r) => interp.push(Object::real(real_op(r))),
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }

    Ok(())
}

pub(crate) fn abs(interp: &mut Interpreter) -> PsResult<()> {
    unary_preserving(interp, i64::checked_abs, f64::abs)
}

pub(crate) fn neg(interp: &mut Interpreter) -> PsResult<()> {
    unary_preserving(interp, i64::checked_neg, |r| -r)
}

pub(crate) fn ceiling(interp: &mut Interpreter) -> PsResult<()> {
    unary_preserving(interp, Some, f64::ceil)
}

pub(crate) fn floor(interp: &mut Interpreter) -> PsResult<()> {
    unary_preserving(interp, Some, f64::floor)
}

/// Nearest integer; exact halves round to the greater value
pub(crate) fn round(interp: &mut Interpreter) -> PsResult<()> {
    unary_preserving(interp, Some, |r| (r + 0.5).floor())
}

pub(crate) fn truncate(interp: &mut Interpreter) -> PsResult<()> {
    unary_preserving(interp, Some, f64::trunc)
}

pub(crate) fn sqrt(interp: &mut Interpreter) -> PsResult<()> {
    let n = interp.pop_number()?;

    if n < 0.0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.push(Object::real(n.sqrt()));

    Ok(())
}

/// `num den atan` in degrees, in [0, 360)
pub(crate) fn atan(interp: &mut Interpreter) -> PsResult<()> {
    let den = interp.pop_number()?;
    let num = interp.pop_number()?;

    if num == 0.0 && den == 0.0 {
        anyhow::bail!(PostScriptError::UndefinedResult);
    }

    let mut degrees = num.atan2(den).to_degrees();
    if degrees < 0.0 {
        degrees += 360.0;
    }

    interp.push(Object::real(degrees));

    Ok(())
}

pub(crate) fn cos(interp: &mut Interpreter) -> PsResult<()> {
    let degrees = interp.pop_number()?;

    interp.push(Object::real(degrees.to_radians().cos()));

    Ok(())
}

pub(crate) fn sin(interp: &mut Interpreter) -> PsResult<()> {
    let degrees = interp.pop_number()?;

    interp.push(Object::real(degrees.to_radians().sin()));

    Ok(())
}

/// `base exponent exp`
pub(crate) fn exp(interp: &mut Interpreter) -> PsResult<()> {
    let exponent = interp.pop_number()?;
    let base = interp.pop_number()?;

    let result = base.powf(exponent);

    if !result.is_finite() {
        anyhow::bail!(PostScriptError::UndefinedResult);
    }

    interp.push(Object::real(result));

    Ok(())
}

pub(crate) fn ln(interp: &mut Interpreter) -> PsResult<()> {
    let n = interp.pop_number()?;

    if n <= 0.0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.push(Object::real(n.ln()));

    Ok(())
}

pub(crate) fn log(interp: &mut Interpreter) -> PsResult<()> {
    let n = interp.pop_number()?;

    if n <= 0.0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.push(Object::real(n.log10()));

    Ok(())
}

/// 31-bit pseudo-random integer in 0..2^31−1
pub(crate) fn rand(interp: &mut Interpreter) -> PsResult<()> {
    let n = rand::Rng::gen::<u32>(&mut interp.rng) >> 1;

    interp.push(Object::integer(i64::from(n)));

    Ok(())
}

/// Accepted and discarded; the generator keeps its deterministic stream
pub(crate) fn srand(interp: &mut Interpreter) -> PsResult<()> {
    let seed = interp.pop_int()?;

    log::debug!("srand {} ignored", seed);

    Ok(())
}

pub(crate) fn rrand(interp: &mut Interpreter) -> PsResult<()> {
    interp.push(Object::integer(-1));

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

    fn run_err(source: &[u8]) -> String {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        let err = interp.run().unwrap_err();
        err.downcast::<crate::error::PostScriptError>()
            .unwrap()
            .name()
            .to_owned()
    }

    #[test]
    fn integer_overflow_widens_to_real() {
        let stack = run(b"9223372036854775807 1 add");

        assert_eq!(stack.len(), 1);
        assert!(matches!(
            stack[0].value,
            crate::object::Value::Real(r) if r > 9.2e18
        ));
    }

    #[test]
    fn idiv_truncates() {
        assert_eq!(run(b"7 2 idiv"), vec![Object::integer(3)]);
        assert_eq!(run(b"-7 2 idiv"), vec![Object::integer(-3)]);
    }

    #[test]
    fn idiv_rejects_reals() {
        assert_eq!(run_err(b"7.0 2 idiv"), "typecheck");
    }

    #[test]
    fn mod_follows_dividend_sign() {
        assert_eq!(run(b"7 3 mod"), vec![Object::integer(1)]);
        assert_eq!(run(b"-7 3 mod"), vec![Object::integer(-1)]);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(run_err(b"1 0 div"), "undefinedresult");
        assert_eq!(run_err(b"1 0 idiv"), "undefinedresult");
        assert_eq!(run_err(b"1 0 mod"), "undefinedresult");
    }

    #[test]
    fn unary_ops_preserve_integer_type() {
        assert_eq!(run(b"-3 abs"), vec![Object::integer(3)]);
        assert_eq!(run(b"3 neg"), vec![Object::integer(-3)]);
        assert_eq!(run(b"3 ceiling"), vec![Object::integer(3)]);
        assert_eq!(run(b"3 floor"), vec![Object::integer(3)]);
        assert_eq!(run(b"3 round"), vec![Object::integer(3)]);
        assert_eq!(run(b"3 truncate"), vec![Object::integer(3)]);
    }

    #[test]
    fn floor_of_negative_real() {
        assert_eq!(run(b"-4.2 floor"), vec![Object::real(-5.0)]);
        assert_eq!(run(b"3.2 floor"), vec![Object::real(3.0)]);
    }

    #[test]
    fn round_half_goes_up() {
        assert_eq!(run(b"6.5 round"), vec![Object::real(7.0)]);
        assert_eq!(run(b"-6.5 round"), vec![Object::real(-6.0)]);
    }

    #[test]
    fn sqrt_always_real() {
        assert_eq!(run(b"9 sqrt"), vec![Object::real(3.0)]);
        assert_eq!(run_err(b"-1 sqrt"), "rangecheck");
    }

    #[test]
    fn atan_degrees_quadrants() {
        assert_eq!(run(b"1 0 atan"), vec![Object::real(90.0)]);
        assert_eq!(run(b"-100 0 atan"), vec![Object::real(270.0)]);
    }

    #[test]
    fn exp_and_logs() {
        assert_eq!(run(b"9 0.5 exp"), vec![Object::real(3.0)]);
        assert_eq!(run(b"100 log"), vec![Object::real(2.0)]);
        assert_eq!(run_err(b"0 ln"), "rangecheck");
    }

    #[test]
    fn rand_stays_in_31_bits() {
        let stack = run(b"rand rand rand");

        for obj in stack {
            let crate::object::Value::Integer(n) = obj.value else {
                panic!("rand must push integers");
            };
            assert!((0..(1 << 31)).contains(&n));
        }
    }

    #[test]
    fn rrand_is_stubbed() {
        assert_eq!(run(b"1234 srand rrand"), vec![Object::integer(-1)]);
    }
}
