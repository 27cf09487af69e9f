//! Operand-stack manipulation: `pop exch dup copy index roll clear count
//! mark cleartomark counttomark`.

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    object::{Object, Value},
};

pub(crate) fn pop(interp: &mut Interpreter) -> PsResult<()> {
    interp.pop()?;

    Ok(())
}

pub(crate) fn exch(interp: &mut Interpreter) -> PsResult<()> {
    let b = interp.pop()?;
    let a = interp.pop()?;

    interp.push(b);
    interp.push(a);

    Ok(())
}

pub(crate) fn dup(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    interp.push(obj.clone());
    interp.push(obj);

    Ok(())
}

/// `any1 … anyn n copy` duplicates the top n objects. This form copies the
/// objects themselves; composite values stay shared
pub(crate) fn copy_n(interp: &mut Interpreter) -> PsResult<()> {
    let n = interp.pop_usize()?;

    if n > interp.operand_stack.len() {
        anyhow::bail!(PostScriptError::StackUnderflow);
    }

    let from = interp.operand_stack.len() - n;
    let copied = interp.operand_stack[from..].to_vec();

    for obj in copied {
        interp.push(obj);
    }

    Ok(())
}

pub(crate) fn index(interp: &mut Interpreter) -> PsResult<()> {
    let n = interp.pop_usize()?;

    let obj = interp.peek(n)?.clone();
    interp.push(obj);

    Ok(())
}

/// `anyn−1 … any0 n j roll` rotates the top n objects by j positions,
/// upward for positive j
pub(crate) fn roll(interp: &mut Interpreter) -> PsResult<()> {
    let j = interp.pop_int()?;
    let n = interp.pop_usize()?;

    if n > interp.operand_stack.len() {
        anyhow::bail!(PostScriptError::StackUnderflow);
    }

    if n == 0 {
        return Ok(());
    }

    let from = interp.operand_stack.len() - n;
    let window = &mut interp.operand_stack[from..];
    let shift = (j.rem_euclid(n as i64)) as usize;

    window.rotate_right(shift);

    Ok(())
}

pub(crate) fn clear(interp: &mut Interpreter) -> PsResult<()> {
    interp.operand_stack.clear();

    Ok(())
}

pub(crate) fn count(interp: &mut Interpreter) -> PsResult<()> {
    let depth = interp.operand_stack.len();

    interp.push(Object::integer(depth as i64));

    Ok(())
}

/// Pushes a mark object on the operand stack. All marks are identical, and
/// the operand stack may contain any number of them at once. Also the
/// behavior of `[` and `<<`
pub(crate) fn mark(interp: &mut Interpreter) -> PsResult<()> {
    interp.push(Object::mark());

    Ok(())
}

pub(crate) fn cleartomark(interp: &mut Interpreter) -> PsResult<()> {
    let above = interp.count_to_mark()?;
    let keep = interp.operand_stack.len() - above - 1;

    interp.operand_stack.truncate(keep);

    Ok(())
}

pub(crate) fn counttomark(interp: &mut Interpreter) -> PsResult<()> {
    let above = interp.count_to_mark()?;

    interp.push(Object::integer(above as i64));

    Ok(())
}

/// `copy` on two arrays: the first's elements land in the second, which must
/// be at least as long; the result is the written initial subarray
pub(crate) fn copy_array(interp: &mut Interpreter) -> PsResult<()> {
    let target = interp.pop_array()?;
    let source = interp.pop_array()?;

    if target.len < source.len {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let elements = interp.array_elements(source)?;
    interp.array_write(target, 0, elements)?;

    interp.push(Object::literal(Value::Array(target.subslice(0, source.len))));

    Ok(())
}

pub(crate) fn copy_string(interp: &mut Interpreter) -> PsResult<()> {
    let target = interp.pop_string()?;
    let source = interp.pop_string()?;

    if target.len < source.len {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let bytes = interp.string_bytes(source)?;
    interp.string_write(target, 0, &bytes)?;

    interp.push(Object::literal(Value::String(
        target.subslice(0, source.len),
    )));

    Ok(())
}

/// `copy` on two dictionaries: a shallow duplication of the entries
pub(crate) fn copy_dict(interp: &mut Interpreter) -> PsResult<()> {
    let target = interp.pop_dict()?;
    let source = interp.pop_dict()?;

    if !interp.dict_ref(source).access().readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    let entries: Vec<_> = interp
        .dict_ref(source)
        .entries()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (key, value) in entries {
        interp.dict_put(target, key, value)?;
    }

    interp.push(Object::literal(Value::Dictionary(target)));

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
    fn copy_non_composite() {
        let ints = |ns: &[i64]| ns.iter().copied().map(Object::integer).collect::<Vec<_>>();

        assert_eq!(run(b"1 2 3 2 copy"), ints(&[1, 2, 3, 2, 3]));
        assert_eq!(run(b"1 2 3 0 copy"), ints(&[1, 2, 3]));
    }

    #[test]
    fn copy_composite_array() {
        let stack = run(b"/a1 [1 2 3] def a1 dup length array copy aload pop");

        assert_eq!(
            stack,
            vec![Object::integer(1), Object::integer(2), Object::integer(3)]
        );
    }

    #[test]
    fn index_reaches_into_stack() {
        assert_eq!(
            run(b"10 20 30 2 index"),
            vec![
                Object::integer(10),
                Object::integer(20),
                Object::integer(30),
                Object::integer(10),
            ]
        );
    }

    #[test]
    fn roll_wraps_modulo_n() {
        assert_eq!(
            run(b"1 2 3 3 4 roll"),
            vec![Object::integer(3), Object::integer(1), Object::integer(2)]
        );
    }

    #[test]
    fn mark_counting() {
        assert_eq!(
            run(b"mark 1 2 3 counttomark"),
            vec![
                Object::mark(),
                Object::integer(1),
                Object::integer(2),
                Object::integer(3),
                Object::integer(3),
            ]
        );

        assert_eq!(run(b"5 mark 1 2 3 cleartomark"), vec![Object::integer(5)]);
    }

    #[test]
    fn clear_empties_stack() {
        assert_eq!(run(b"1 2 3 clear"), vec![]);
    }
}
