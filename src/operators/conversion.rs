//! Type, attribute, and conversion operators.

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    lexer::{parse_number, Number},
    object::{Access, Name, Object, Value},
};

/// Pushes the executable name identifying the operand's type
pub(crate) fn type_op(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    interp.push(Object::executable_name(Name::new(obj.type_name())));

    Ok(())
}

pub(crate) fn cvlit(interp: &mut Interpreter) -> PsResult<()> {
    let mut obj = interp.pop()?;

    obj.executable = false;
    interp.push(obj);

    Ok(())
}

pub(crate) fn cvx(interp: &mut Interpreter) -> PsResult<()> {
    let mut obj = interp.pop()?;

    obj.executable = true;
    interp.push(obj);

    Ok(())
}

pub(crate) fn xcheck(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    interp.push(Object::boolean(obj.executable));

    Ok(())
}

fn modify_access(interp: &mut Interpreter, access: Access) -> PsResult<()> {
    let obj = interp.pop()?;

    match &obj.value {
        Value::Array(slice) => interp.set_array_access(*slice, access),
        Value::String(slice) => interp.set_string_access(*slice, access),
        Value::Dictionary(dict) => interp.dict_ref_mut(*dict).set_access(access),
        // file access is governed by its open mode
        Value::File(..) => log::debug!("access change on a file ignored"),
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }

    interp.push(obj);

    Ok(())
}

pub(crate) fn executeonly(interp: &mut Interpreter) -> PsResult<()> {
    modify_access(interp, Access::ExecuteOnly)
}

pub(crate) fn noaccess(interp: &mut Interpreter) -> PsResult<()> {
    modify_access(interp, Access::None)
}

pub(crate) fn readonly(interp: &mut Interpreter) -> PsResult<()> {
    modify_access(interp, Access::ReadOnly)
}

fn access_of(interp: &Interpreter, obj: &Object) -> PsResult<Access> {
    Ok(match &obj.value {
        Value::Array(slice) => interp.array_access(*slice),
        Value::String(slice) => interp.string_access(*slice),
        Value::Dictionary(dict) => interp.dict_ref(*dict).access(),
        Value::File(..) => Access::Unlimited,
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    })
}

pub(crate) fn rcheck(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let access = access_of(interp, &obj)?;
    interp.push(Object::boolean(access.readable()));

    Ok(())
}

pub(crate) fn wcheck(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let access = access_of(interp, &obj)?;
    interp.push(Object::boolean(access.writable()));

    Ok(())
}

fn numeric_value_of(interp: &Interpreter, obj: &Object) -> PsResult<Number> {
    match &obj.value {
        Value::Integer(n) => Ok(Number::Integer(*n)),
        Value::Real(r) => Ok(Number::Real(*r)),
        Value::String(slice) => {
            let bytes = interp.string_bytes(*slice)?;
            let trimmed: Vec<u8> = bytes
                .iter()
                .copied()
                .skip_while(|b| b.is_ascii_whitespace())
                .take_while(|b| !b.is_ascii_whitespace())
                .collect();

            parse_number(&trimmed)
                .ok_or(anyhow::anyhow!(PostScriptError::SyntaxError { span: None }))
        }
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }
}

/// Truncates toward zero
pub(crate) fn cvi(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let result = match numeric_value_of(interp, &obj)? {
        Number::Integer(n) => Object::integer(n),
        Number::Real(r) => Object::integer_from_real(r)?,
    };

    interp.push(result);

    Ok(())
}

pub(crate) fn cvr(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let result = match numeric_value_of(interp, &obj)? {
        Number::Integer(n) => Object::real(n as f64),
        Number::Real(r) => Object::real(r),
    };

    interp.push(result);

    Ok(())
}

/// The name keeps the string's executability
pub(crate) fn cvn(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;
    let Value::String(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    let bytes = interp.string_bytes(slice)?;

    interp.push(Object {
        executable: obj.executable,
        value: Value::Name(Name::from_bytes(bytes)),
    });

    Ok(())
}

/// `num radix string cvrs`: decimal keeps the full numeric text form, other
/// radices render the integer part as unsigned 32-bit
pub(crate) fn cvrs(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let radix = interp.pop_int()?;
    let num = interp.pop()?;

    if !(2..=36).contains(&radix) {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let text = if radix == 10 {
        interp.format_brief(&num)?
    } else {
        let n = match num.value {
            Value::Integer(n) => n,
            Value::Real(r) => r.trunc() as i64,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        to_radix(n as u32, radix as u32)
    };

    interp.string_write(slice, 0, &text)?;
    interp.push(Object::literal(Value::String(slice.subslice(0, text.len()))));

    Ok(())
}

/// `any string cvs`: writes the text form into the string and returns the
/// written substring view
pub(crate) fn cvs(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let obj = interp.pop()?;

    let text = interp.format_brief(&obj)?;

    interp.string_write(slice, 0, &text)?;
    interp.push(Object::literal(Value::String(slice.subslice(0, text.len()))));

    Ok(())
}

fn to_radix(mut n: u32, radix: u32) -> Vec<u8> {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if n == 0 {
        return b"0".to_vec();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % radix) as usize]);
        n /= radix;
    }
    out.reverse();

    out
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

    fn run_stdout(source: &[u8]) -> Vec<u8> {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        interp.run().unwrap();

        interp.stdout().to_vec()
    }

    #[test]
    fn type_names() {
        assert_eq!(run_stdout(b"1 type =="), b"integertype\n");
        assert_eq!(run_stdout(b"1.0 type =="), b"realtype\n");
        assert_eq!(run_stdout(b"(a) type =="), b"stringtype\n");
        assert_eq!(run_stdout(b"/a type =="), b"nametype\n");
        assert_eq!(run_stdout(b"[1] type =="), b"arraytype\n");
        assert_eq!(run_stdout(b"1 dict type =="), b"dicttype\n");
        assert_eq!(run_stdout(b"true type =="), b"booleantype\n");
        assert_eq!(run_stdout(b"mark type =="), b"marktype\n");
        assert_eq!(run_stdout(b"null type =="), b"nulltype\n");
    }

    #[test]
    fn cvx_and_xcheck() {
        assert_eq!(run(b"/a cvx xcheck"), vec![Object::boolean(true)]);
        assert_eq!(run(b"/a xcheck"), vec![Object::boolean(false)]);
        assert_eq!(run(b"{ } xcheck"), vec![Object::boolean(true)]);
    }

    #[test]
    fn cvi_truncates() {
        assert_eq!(run(b"3.9 cvi"), vec![Object::integer(3)]);
        assert_eq!(run(b"-3.9 cvi"), vec![Object::integer(-3)]);
        assert_eq!(run(b"(42) cvi"), vec![Object::integer(42)]);
    }

    #[test]
    fn cvr_widens() {
        assert_eq!(run(b"3 cvr"), vec![Object::real(3.0)]);
        assert_eq!(run(b"(2.5) cvr"), vec![Object::real(2.5)]);
    }

    #[test]
    fn cvn_interns_string_content() {
        assert_eq!(run(b"(abc) cvn /abc eq"), vec![Object::boolean(true)]);
    }

    #[test]
    fn cvs_writes_into_string() {
        assert_eq!(run_stdout(b"123 10 string cvs print"), b"123");
        assert_eq!(run_stdout(b"3.0 10 string cvs print"), b"3.0");
        assert_eq!(run_stdout(b"true 10 string cvs print"), b"true");
        assert_eq!(run_stdout(b"/name 10 string cvs print"), b"name");
    }

    #[test]
    fn cvs_of_composite_is_nostringval() {
        assert_eq!(run_stdout(b"[1 2] 20 string cvs print"), b"--nostringval--");
    }

    #[test]
    fn cvrs_hex() {
        assert_eq!(run_stdout(b"123 16 10 string cvrs print"), b"7B");
        assert_eq!(run_stdout(b"8 2 10 string cvrs print"), b"1000");
    }

    #[test]
    fn cvrs_negative_uses_32_bit_wrap() {
        assert_eq!(run_stdout(b"-1 16 10 string cvrs print"), b"FFFFFFFF");
    }

    #[test]
    fn readonly_flag_reflected_by_wcheck() {
        assert_eq!(run(b"[1] readonly wcheck"), vec![Object::boolean(false)]);
        assert_eq!(run(b"[1] wcheck"), vec![Object::boolean(true)]);
        assert_eq!(run(b"[1] rcheck"), vec![Object::boolean(true)]);
    }

    #[test]
    fn executeonly_string_rejects_reads() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"(secret) executeonly 0 get", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "invalidaccess"
        );
    }
}
