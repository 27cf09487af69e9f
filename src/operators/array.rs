//! Array operators, plus the polymorphic `length get put getinterval
//! putinterval forall` family shared with dictionaries and strings.

use crate::{
    context::{
        ArrayForAllContext, DictionaryForAllContext, ExecutionContext, StringForAllContext,
    },
    error::{PostScriptError, PsResult},
    interpreter::{ExecutionItem, Interpreter},
    object::{Object, Value},
};

const MAX_ARRAY_LENGTH: usize = 65535;

pub(crate) fn array(interp: &mut Interpreter) -> PsResult<()> {
    let len = interp.pop_usize()?;

    if len > MAX_ARRAY_LENGTH {
        anyhow::bail!(PostScriptError::LimitCheck);
    }

    let slice = interp.new_array(vec![Object::null(); len]);
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

/// `]`: collect everything above the matching mark into a new array
pub(crate) fn array_close(interp: &mut Interpreter) -> PsResult<()> {
    let count = interp.count_to_mark()?;
    let from = interp.operand_stack.len() - count;

    let elements = interp.operand_stack.split_off(from);
    interp.pop()?; // the mark

    let slice = interp.new_array(elements);
    interp.push(Object::literal(Value::Array(slice)));

    Ok(())
}

/// `any0 … anyn−1 array astore` fills the array from the stack
pub(crate) fn astore(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;
    let Value::Array(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    if interp.operand_stack.len() < slice.len {
        anyhow::bail!(PostScriptError::StackUnderflow);
    }

    let from = interp.operand_stack.len() - slice.len;
    let elements = interp.operand_stack.split_off(from);
    interp.array_write(slice, 0, elements)?;

    interp.push(obj);

    Ok(())
}

/// Pushes all elements, then the array itself
pub(crate) fn aload(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;
    let Value::Array(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    for element in interp.array_elements(slice)? {
        interp.push(element);
    }

    interp.push(obj);

    Ok(())
}

pub(crate) fn length_array(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;

    interp.push(Object::integer(slice.len as i64));

    Ok(())
}

pub(crate) fn length_dict(interp: &mut Interpreter) -> PsResult<()> {
    let dict = interp.pop_dict()?;

    if !interp.dict_ref(dict).access().readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    let len = interp.dict_ref(dict).len();
    interp.push(Object::integer(len as i64));

    Ok(())
}

pub(crate) fn length_string(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;

    interp.push(Object::integer(slice.len as i64));

    Ok(())
}

pub(crate) fn length_name(interp: &mut Interpreter) -> PsResult<()> {
    let name = interp.pop_name()?;

    interp.push(Object::integer(name.len() as i64));

    Ok(())
}

pub(crate) fn get_array(interp: &mut Interpreter) -> PsResult<()> {
    let index = index_operand(interp)?;
    let slice = interp.pop_array()?;

    let element = interp.array_get(slice, index)?;
    interp.push(element);

    Ok(())
}

pub(crate) fn get_dict(interp: &mut Interpreter) -> PsResult<()> {
    let key_obj = interp.pop()?;
    let dict = interp.pop_dict()?;
    let key = interp.key_for(&key_obj)?;

    match interp.dict_get(dict, &key)? {
        Some(value) => {
            interp.push(value);
            Ok(())
        }
        None => anyhow::bail!(PostScriptError::Undefined {
            name: crate::object::Name::from_bytes(interp.format_brief(&key_obj)?),
        }),
    }
}

pub(crate) fn get_string(interp: &mut Interpreter) -> PsResult<()> {
    let index = index_operand(interp)?;
    let slice = interp.pop_string()?;

    let byte = interp.string_get(slice, index)?;
    interp.push(Object::integer(i64::from(byte)));

    Ok(())
}

pub(crate) fn put_array(interp: &mut Interpreter) -> PsResult<()> {
    let value = interp.pop()?;
    let index = index_operand(interp)?;
    let slice = interp.pop_array()?;

    interp.array_put(slice, index, value)
}

pub(crate) fn put_dict(interp: &mut Interpreter) -> PsResult<()> {
    let value = interp.pop()?;
    let key_obj = interp.pop()?;
    let dict = interp.pop_dict()?;

    let key = interp.key_for(&key_obj)?;
    interp.dict_put(dict, key, value)
}

pub(crate) fn put_string(interp: &mut Interpreter) -> PsResult<()> {
    let value = interp.pop_int()?;
    let index = index_operand(interp)?;
    let slice = interp.pop_string()?;

    let byte = u8::try_from(value).map_err(|_| anyhow::anyhow!(PostScriptError::RangeCheck))?;

    interp.string_put(slice, index, byte)
}

/// Shared subinterval view; writes through the view remain visible to the
/// parent and vice versa
pub(crate) fn getinterval_array(interp: &mut Interpreter) -> PsResult<()> {
    let count = interp.pop_usize()?;
    let index = interp.pop_usize()?;
    let obj = interp.pop()?;
    let Value::Array(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    if !interp.array_access(slice).readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    if index + count > slice.len {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.push(Object {
        executable: obj.executable,
        value: Value::Array(slice.subslice(index, count)),
    });

    Ok(())
}

pub(crate) fn getinterval_string(interp: &mut Interpreter) -> PsResult<()> {
    let count = interp.pop_usize()?;
    let index = interp.pop_usize()?;
    let obj = interp.pop()?;
    let Value::String(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    if !interp.string_access(slice).readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    if index + count > slice.len {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.push(Object {
        executable: obj.executable,
        value: Value::String(slice.subslice(index, count)),
    });

    Ok(())
}

/// `rangecheck` unless index + source length fits inside the target
pub(crate) fn putinterval_array(interp: &mut Interpreter) -> PsResult<()> {
    let source = interp.pop_array()?;
    let index = interp.pop_usize()?;
    let target = interp.pop_array()?;

    let elements = interp.array_elements(source)?;
    interp.array_write(target, index, elements)
}

pub(crate) fn putinterval_string(interp: &mut Interpreter) -> PsResult<()> {
    let source = interp.pop_string()?;
    let index = interp.pop_usize()?;
    let target = interp.pop_string()?;

    let bytes = interp.string_bytes(source)?;
    interp.string_write(target, index, &bytes)
}

pub(crate) fn forall_array(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;
    let slice = interp.pop_array()?;

    if !interp.array_access(slice).readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::ArrayForAll(
        ArrayForAllContext {
            array: slice,
            proc,
            index: 0,
        },
    )))
}

pub(crate) fn forall_dict(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;
    let dict = interp.pop_dict()?;

    if !interp.dict_ref(dict).access().readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    let entries: Vec<(Object, Object)> = interp
        .dict_ref(dict)
        .entries()
        .map(|(key, value)| (interp.key_object(key), value.clone()))
        .collect();

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::DictionaryForAll(
        DictionaryForAllContext {
            entries,
            proc,
            index: 0,
        },
    )))
}

pub(crate) fn forall_string(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;
    let slice = interp.pop_string()?;

    if !interp.string_access(slice).readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::StringForAll(
        StringForAllContext {
            string: slice,
            proc,
            index: 0,
        },
    )))
}

/// Pops a non-negative index; a negative index is out of bounds, not a type
/// error
fn index_operand(interp: &mut Interpreter) -> PsResult<usize> {
    interp.pop_usize()
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
    fn array_literal_executes_contents() {
        // `[` is a mark; the contents run before `]` collects them
        assert_eq!(run(b"[1 2 add] aload pop"), vec![Object::integer(3)]);
    }

    #[test]
    fn astore_fills_from_stack() {
        assert_eq!(
            run(b"1 2 3 3 array astore aload pop"),
            vec![Object::integer(1), Object::integer(2), Object::integer(3)]
        );
    }

    #[test]
    fn getinterval_shares_storage() {
        let stack = run(
            b"/a [10 20 30 40] def
              /view a 1 2 getinterval def
              view 0 99 put
              a 1 get",
        );

        assert_eq!(stack, vec![Object::integer(99)]);
    }

    #[test]
    fn putinterval_bounds() {
        assert_eq!(
            run(b"/a [0 0 0 0] def a 1 [7 8] putinterval a aload pop"),
            vec![
                Object::integer(0),
                Object::integer(7),
                Object::integer(8),
                Object::integer(0)
            ]
        );

        assert_eq!(run_err(b"/a [0 0] def a 1 [7 8] putinterval"), "rangecheck");
    }

    #[test]
    fn get_out_of_bounds() {
        assert_eq!(run_err(b"[1 2 3] 3 get"), "rangecheck");
    }

    #[test]
    fn length_of_name() {
        assert_eq!(run(b"/abcd length"), vec![Object::integer(4)]);
    }

    #[test]
    fn forall_over_dict_pushes_keys_and_values() {
        let stack = run(b"<< /a 1 >> { } forall");

        assert_eq!(stack.len(), 2);
        assert_eq!(stack[1], Object::integer(1));
    }

    #[test]
    fn readonly_array_rejects_put() {
        assert_eq!(run_err(b"[1 2 3] readonly 0 9 put"), "invalidaccess");
    }

    #[test]
    fn string_element_roundtrip() {
        assert_eq!(run(b"(abc) 1 get"), vec![Object::integer(b'b' as i64)]);
        assert_eq!(run_err(b"(abc) 1 300 put"), "rangecheck");
    }
}
