//! String operators: construction, matching, and tokenization.

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    lexer::Lexer,
    object::{Object, Value},
    scanner,
};

const MAX_STRING_LENGTH: usize = 65535;

pub(crate) fn string(interp: &mut Interpreter) -> PsResult<()> {
    let len = interp.pop_usize()?;

    if len > MAX_STRING_LENGTH {
        anyhow::bail!(PostScriptError::LimitCheck);
    }

    let slice = interp.new_string(vec![0; len]);
    interp.push(Object::literal(Value::String(slice)));

    Ok(())
}

/// `string seek anchorsearch`: prefix match splitting into `post match true`,
/// or the original string and `false`
pub(crate) fn anchorsearch(interp: &mut Interpreter) -> PsResult<()> {
    let seek_slice = interp.pop_string()?;
    let obj = interp.pop()?;
    let Value::String(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    let haystack = interp.string_bytes(slice)?;
    let seek = interp.string_bytes(seek_slice)?;

    if haystack.starts_with(&seek) {
        interp.push(Object::literal(Value::String(
            slice.subslice(seek.len(), slice.len - seek.len()),
        )));
        interp.push(Object::literal(Value::String(slice.subslice(0, seek.len()))));
        interp.push(Object::boolean(true));
    } else {
        interp.push(obj);
        interp.push(Object::boolean(false));
    }

    Ok(())
}

/// `string seek search`: first substring match splitting into
/// `post match pre true`, or the original string and `false`
pub(crate) fn search(interp: &mut Interpreter) -> PsResult<()> {
    let seek_slice = interp.pop_string()?;
    let obj = interp.pop()?;
    let Value::String(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    let haystack = interp.string_bytes(slice)?;
    let seek = interp.string_bytes(seek_slice)?;

    let found = if seek.is_empty() {
        Some(0)
    } else if seek.len() > haystack.len() {
        None
    } else {
        haystack
            .windows(seek.len())
            .position(|window| window == seek)
    };

    match found {
        Some(at) => {
            let end = at + seek.len();

            interp.push(Object::literal(Value::String(
                slice.subslice(end, slice.len - end),
            )));
            interp.push(Object::literal(Value::String(slice.subslice(at, seek.len()))));
            interp.push(Object::literal(Value::String(slice.subslice(0, at))));
            interp.push(Object::boolean(true));
        }
        None => {
            interp.push(obj);
            interp.push(Object::boolean(false));
        }
    }

    Ok(())
}

/// `string token`: scan one object off the front; pushes
/// `post object true`, or `false` when only whitespace remains
pub(crate) fn token_string(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let bytes = interp.string_bytes(slice)?;

    let mut lexer = Lexer::new(bytes);

    match scanner::scan_object(interp, &mut lexer)? {
        Some(obj) => {
            let consumed = usize::min(lexer.pos(), slice.len);

            interp.push(Object::literal(Value::String(
                slice.subslice(consumed, slice.len - consumed),
            )));
            interp.push(obj);
            interp.push(Object::boolean(true));
        }
        None => interp.push(Object::boolean(false)),
    }

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

    fn run_stdout(source: &[u8]) -> Vec<u8> {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        interp.run().unwrap();

        interp.stdout().to_vec()
    }

    #[test]
    fn fresh_string_is_zeroed() {
        assert_eq!(run(b"3 string 0 get"), vec![Object::integer(0)]);
        assert_eq!(run(b"3 string length"), vec![Object::integer(3)]);
    }

    #[test]
    fn anchorsearch_prefix_hit() {
        assert_eq!(
            run_stdout(b"(abcdef) (abc) anchorsearch pop print print"),
            b"abcdef"
        );
    }

    #[test]
    fn anchorsearch_miss_keeps_string() {
        let stack = run(b"(abcdef) (xyz) anchorsearch");

        assert_eq!(stack.len(), 2);
        assert_eq!(stack[1], Object::boolean(false));
    }

    #[test]
    fn search_splits_around_match() {
        // (abcdef) (cd) search -> (ef) (cd) (ab) true
        assert_eq!(
            run_stdout(b"(abcdef) (cd) search pop print print print"),
            b"abcdef"
        );

        let stack = run(b"(abcdef) (cd) search");
        assert_eq!(stack.len(), 4);
        assert_eq!(stack[3], Object::boolean(true));
    }

    #[test]
    fn search_miss() {
        let stack = run(b"(abc) (zz) search");

        assert_eq!(stack[1], Object::boolean(false));
    }

    #[test]
    fn token_reads_one_object() {
        let stack = run(b"(12 34) token");

        assert_eq!(stack.len(), 3);
        assert_eq!(stack[1], Object::integer(12));
        assert_eq!(stack[2], Object::boolean(true));
    }

    #[test]
    fn token_on_blank_string_reports_false() {
        assert_eq!(run(b"(   ) token"), vec![Object::boolean(false)]);
    }

    #[test]
    fn token_scans_procedures() {
        let stack = run(b"({1 2 add} rest) token");

        assert_eq!(stack.len(), 3);
        assert!(stack[1].is_procedure());
    }
}
