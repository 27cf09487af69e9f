//! Dictionary operators and the dictionary stack.

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::{Interpreter, MAX_DICT_CAPACITY, MAX_DICT_STACK_SIZE},
    object::{Name, Object, PsDictionary, Value},
};

pub(crate) fn dict(interp: &mut Interpreter) -> PsResult<()> {
    let capacity = interp.pop_usize()?;

    if capacity > MAX_DICT_CAPACITY {
        anyhow::bail!(PostScriptError::LimitCheck);
    }

    let dict = interp.new_dict(PsDictionary::new(capacity));
    interp.push(Object::literal(Value::Dictionary(dict)));

    Ok(())
}

/// `>>`: collect key/value pairs down to the matching mark into a new
/// dictionary sized to the pair count
pub(crate) fn dict_close(interp: &mut Interpreter) -> PsResult<()> {
    let count = interp.count_to_mark()?;

    if count % 2 != 0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let from = interp.operand_stack.len() - count;
    let items = interp.operand_stack.split_off(from);
    interp.pop()?; // the mark

    let mut dict = PsDictionary::new(usize::max(count / 2, 1));

    for pair in items.chunks_exact(2) {
        let key = interp.key_for(&pair[0])?;
        dict.insert(key, pair[1].clone())?;
    }

    let index = interp.new_dict(dict);
    interp.push(Object::literal(Value::Dictionary(index)));

    Ok(())
}

/// The dictionary's capacity, as distinct from its current `length`
pub(crate) fn maxlength(interp: &mut Interpreter) -> PsResult<()> {
    let dict = interp.pop_dict()?;

    let capacity = interp.dict_ref(dict).capacity();
    interp.push(Object::integer(capacity as i64));

    Ok(())
}

pub(crate) fn begin(interp: &mut Interpreter) -> PsResult<()> {
    let dict = interp.pop_dict()?;

    if interp.dictionary_stack.len() >= MAX_DICT_STACK_SIZE {
        anyhow::bail!(PostScriptError::DictStackOverflow);
    }

    interp.dictionary_stack.push(dict);

    Ok(())
}

/// The three bootstrap dictionaries never leave the stack
pub(crate) fn end(interp: &mut Interpreter) -> PsResult<()> {
    if interp.dictionary_stack.len() <= 3 {
        anyhow::bail!(PostScriptError::DictStackUnderflow);
    }

    interp.dictionary_stack.pop();

    Ok(())
}

/// `key value def` into the current dictionary
pub(crate) fn def(interp: &mut Interpreter) -> PsResult<()> {
    let value = interp.pop()?;
    let key_obj = interp.pop()?;

    let key = interp.key_for(&key_obj)?;
    let current = interp.current_dict();

    interp.dict_put(current, key, value)
}

/// `key load value`: like an executable name lookup, without executing
pub(crate) fn load(interp: &mut Interpreter) -> PsResult<()> {
    let key_obj = interp.pop()?;
    let key = interp.key_for(&key_obj)?;

    match interp.where_defined(&key) {
        Some(dict) => {
            let value = interp
                .dict_get(dict, &key)?
                .expect("where_defined found the key");
            interp.push(value);
            Ok(())
        }
        None => anyhow::bail!(PostScriptError::Undefined {
            name: Name::from_bytes(interp.format_brief(&key_obj)?),
        }),
    }
}

/// `key value store` replaces the topmost existing definition, or defines in
/// the current dictionary
pub(crate) fn store(interp: &mut Interpreter) -> PsResult<()> {
    let value = interp.pop()?;
    let key_obj = interp.pop()?;

    let key = interp.key_for(&key_obj)?;
    let target = interp
        .where_defined(&key)
        .unwrap_or_else(|| interp.current_dict());

    interp.dict_put(target, key, value)
}

/// Removing an absent key is not an error
pub(crate) fn undef(interp: &mut Interpreter) -> PsResult<()> {
    let key_obj = interp.pop()?;
    let dict = interp.pop_dict()?;

    let key = interp.key_for(&key_obj)?;

    if !interp.dict_ref(dict).access().writable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    interp.dict_ref_mut(dict).remove(&key);

    Ok(())
}

pub(crate) fn known(interp: &mut Interpreter) -> PsResult<()> {
    let key_obj = interp.pop()?;
    let dict = interp.pop_dict()?;

    let key = interp.key_for(&key_obj)?;

    if !interp.dict_ref(dict).access().readable() {
        anyhow::bail!(PostScriptError::InvalidAccess);
    }

    let known = interp.dict_ref(dict).contains(&key);
    interp.push(Object::boolean(known));

    Ok(())
}

/// `key where dict true` for the topmost dictionary defining key, else
/// `false`
pub(crate) fn where_op(interp: &mut Interpreter) -> PsResult<()> {
    let key_obj = interp.pop()?;
    let key = interp.key_for(&key_obj)?;

    match interp.where_defined(&key) {
        Some(dict) => {
            interp.push(Object::literal(Value::Dictionary(dict)));
            interp.push(Object::boolean(true));
        }
        None => interp.push(Object::boolean(false)),
    }

    Ok(())
}

pub(crate) fn currentdict(interp: &mut Interpreter) -> PsResult<()> {
    let current = interp.current_dict();

    interp.push(Object::literal(Value::Dictionary(current)));

    Ok(())
}

pub(crate) fn countdictstack(interp: &mut Interpreter) -> PsResult<()> {
    let depth = interp.dictionary_stack.len();

    interp.push(Object::integer(depth as i64));

    Ok(())
}

/// Stores the dictionary stack bottom-first into the array operand and
/// returns the written subarray
pub(crate) fn dictstack(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_array()?;
    let dicts = interp.dictionary_stack.clone();

    if slice.len < dicts.len() {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let objects: Vec<Object> = dicts
        .iter()
        .map(|&dict| Object::literal(Value::Dictionary(dict)))
        .collect();
    let count = objects.len();

    interp.array_write(slice, 0, objects)?;
    interp.push(Object::literal(Value::Array(slice.subslice(0, count))));

    Ok(())
}

pub(crate) fn cleardictstack(interp: &mut Interpreter) -> PsResult<()> {
    interp.dictionary_stack.truncate(3);

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
    fn begin_end_scope_definitions() {
        let stack = run(
            b"/x 1 def
              5 dict begin
              /x 2 def
              x
              end
              x",
        );

        assert_eq!(stack, vec![Object::integer(2), Object::integer(1)]);
    }

    #[test]
    fn end_protects_bootstrap_dictionaries() {
        assert_eq!(run_err(b"end"), "dictstackunderflow");
    }

    #[test]
    fn string_and_name_keys_are_interchangeable() {
        let stack = run(b"/d 4 dict def d (k) 7 put d /k get");

        assert_eq!(stack, vec![Object::integer(7)]);
    }

    #[test]
    fn known_and_where() {
        assert_eq!(
            run(b"/mydict 5 dict def mydict /total 0 put mydict /total known"),
            vec![Object::boolean(true)]
        );
        assert_eq!(
            run(b"/mydict 5 dict def mydict /badname known"),
            vec![Object::boolean(false)]
        );
        assert_eq!(run(b"/nowhere-name where"), vec![Object::boolean(false)]);
    }

    #[test]
    fn where_finds_defining_dict() {
        let stack = run(b"/v 3 def /v where");

        assert_eq!(stack.len(), 2);
        assert_eq!(stack[1], Object::boolean(true));
    }

    #[test]
    fn store_replaces_outer_definition() {
        let stack = run(
            b"/x 1 def
              5 dict begin
              /x 2 store
              end
              x",
        );

        assert_eq!(stack, vec![Object::integer(2)]);
    }

    #[test]
    fn load_without_executing() {
        let stack = run(b"/p { 1 2 add } def /p load");

        assert_eq!(stack.len(), 1);
        assert!(stack[0].is_procedure());
    }

    #[test]
    fn undef_removes_entry() {
        let stack = run(b"/d 4 dict def d /a 1 put d /a undef d /a known");

        assert_eq!(stack, vec![Object::boolean(false)]);
    }

    #[test]
    fn countdictstack_starts_at_bootstrap_depth() {
        assert_eq!(run(b"countdictstack"), vec![Object::integer(3)]);
    }

    #[test]
    fn maxlength_reports_capacity() {
        assert_eq!(run(b"7 dict maxlength"), vec![Object::integer(7)]);
    }

    #[test]
    fn oversized_dict_is_limitcheck() {
        assert_eq!(run_err(b"100000 dict"), "limitcheck");
    }

    #[test]
    fn def_into_readonly_systemdict_fails() {
        assert_eq!(run_err(b"systemdict /x 1 put"), "invalidaccess");
    }
}
